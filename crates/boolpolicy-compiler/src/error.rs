use boolpolicy_engine::EngineError;
use boolpolicy_mapeval::MapQueryError;
use thiserror::Error;

/// Errors raised while compiling a query. All of them are deterministic.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Nothing to compile.
    #[error("query has no field queries")]
    EmptyQuery,

    /// The resolver does not know the field label.
    #[error("field {0:?} not found in schema")]
    FieldNotFound(String),

    /// A field query with neither values nor match-all.
    #[error("field {0:?} has no values and is not match-all")]
    NoValuesForField(String),

    /// A value or option combination the compiler cannot express.
    #[error("field {field:?}: not yet supported: {reason}")]
    Unsupported { field: String, reason: String },

    /// A value that does not parse for its leaf kind.
    #[error("field {field:?}: invalid value {value:?}: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// A map leaf value that is not a valid map query.
    #[error("field {field:?}: {source}")]
    MalformedMapConstraint {
        field: String,
        #[source]
        source: MapQueryError,
    },

    /// The cross product of alternatives exceeds `max_rules`.
    #[error("query expands to {count} rules, limit is {limit}")]
    TooManyRules { count: usize, limit: usize },

    /// Writing program text failed.
    #[error("failed to render program: {0}")]
    TemplateRender(#[from] std::fmt::Error),

    /// The backend rejected the rendered program.
    #[error("failed to prepare program: {0}")]
    ProgramPrepare(#[from] EngineError),
}

impl CompileError {
    pub(crate) fn unsupported(field: &str, reason: impl Into<String>) -> Self {
        CompileError::Unsupported {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(field: &str, value: &str, reason: impl ToString) -> Self {
        CompileError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// An internal inconsistency observed while evaluating a compiled program.
///
/// Never returned to callers: the evaluator logs it and reports no match.
#[derive(Debug, Error)]
pub enum InvariantViolation {
    /// The candidate object has no JSON form.
    #[error("object could not be serialized: {0}")]
    Serialize(String),

    /// The backend failed, including when a frame budget ran out.
    #[error("backend execution failed: {0}")]
    Execution(#[source] EngineError),

    /// The backend returned other than one result set.
    #[error("expected exactly one result set, got {0}")]
    ResultSetCount(usize),

    /// A result entry that is not a label map.
    #[error("binding is not an object: {0}")]
    BindingNotObject(String),

    /// A label whose values are not a list.
    #[error("binding entry {label:?} is not an array")]
    EntryNotArray { label: String },

    /// A bound value with no string form, such as a nested array.
    #[error("binding entry {label:?} holds an undecodable value: {value}")]
    UndecodableValue { label: String, value: String },
}
