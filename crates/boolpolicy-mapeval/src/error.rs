use thiserror::Error;

/// Errors compiling a map query string.
#[derive(Debug, Error)]
pub enum MapQueryError {
    /// A constraint without a `key=value` shape.
    #[error("malformed map constraint {0:?}: expected key=value")]
    MalformedConstraint(String),

    /// A key or value pattern that does not compile.
    #[error("invalid regex {pattern:?} in map constraint: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, MapQueryError>;
