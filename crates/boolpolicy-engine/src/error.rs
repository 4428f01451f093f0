use thiserror::Error;

/// Errors from parsing, preparing or executing a rule program.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A character outside the token set.
    #[error("line {line}: unexpected character {ch:?}")]
    UnexpectedChar { line: usize, ch: char },

    /// A string literal still open at end of line.
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    /// A string literal with an escape JSON does not accept.
    #[error("line {line}: invalid string literal: {message}")]
    InvalidString { line: usize, message: String },

    /// Syntax error.
    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// The program ended mid-construct.
    #[error("unexpected end of program, expected {0}")]
    UnexpectedEof(String),

    /// Name resolution, arity or literal checks failed.
    #[error("prepare failed in {scope}: {message}")]
    Prepare { scope: String, message: String },

    /// Bad input, or an exhausted frame budget.
    #[error("execution failed: {0}")]
    Execution(String),
}

impl EngineError {
    pub(crate) fn prepare(scope: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Prepare {
            scope: scope.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
