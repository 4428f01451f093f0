use thiserror::Error;

/// Returned by [`crate::parse_bool`] for values that are not a prefix of
/// `true` or `false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid boolean value: {0:?}")]
pub struct ParseBoolError(pub String);

/// Errors loading a [`crate::SchemaTable`].
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema file could not be read.
    #[error("schema io error: {0}")]
    Io(#[from] std::io::Error),

    /// The schema is not valid YAML for the table shape.
    #[error("schema yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The schema is not valid JSON for the table shape.
    #[error("schema json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field maps to a path without segments.
    #[error("empty path for field: {0}")]
    EmptyPath(String),
}
