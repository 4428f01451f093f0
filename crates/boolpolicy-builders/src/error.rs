use crate::policy::EventSource;
use thiserror::Error;

/// Errors turning a policy group into field queries.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A value that must be a boolean is not one.
    #[error("field {field:?}: {value:?} is not a boolean")]
    InvalidBoolean { field: String, value: String },

    /// The builder takes a fixed number of values.
    #[error("field {field:?}: expected exactly {expected} value(s), got {got}")]
    WrongValueCount {
        field: String,
        expected: usize,
        got: usize,
    },

    /// A compound value does not split into the expected number of parts.
    #[error("field {field:?}: value {value:?} has {got} part(s), expected {expected}")]
    CompoundArity {
        field: String,
        value: String,
        expected: usize,
        got: usize,
    },
}

/// Errors upgrading a legacy policy to sections.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The policy version is neither legacy nor current.
    #[error("unknown policy version {0:?}")]
    UnknownVersion(String),

    /// A current-version policy without sections.
    #[error("policy {0:?} has the current version but no sections")]
    EmptySections(String),

    /// A legacy policy with neither fields nor sections.
    #[error("legacy policy {0:?} has no fields and no sections")]
    EmptyPolicy(String),
}

/// Errors validating a policy before building queries from it.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The policy has nothing to evaluate.
    #[error("policy {0:?} has no sections")]
    NoSections(String),

    /// A section without groups would match everything.
    #[error("section {0:?} has no policy groups")]
    NoGroups(String),

    /// The field name is not in the registry.
    #[error("unknown policy field {0:?}")]
    UnknownField(String),

    /// A field may appear at most once per section.
    #[error("field {0:?} appears more than once in section")]
    DuplicateField(String),

    /// The field cannot be used by policies for this event source.
    #[error("field {field:?} is not applicable to event source {event_source}")]
    NotApplicable {
        field: String,
        event_source: EventSource,
    },

    /// The field refuses `negate`.
    #[error("field {0:?} does not support negation")]
    NegationForbidden(String),

    /// The field refuses the `AND` operator.
    #[error("field {0:?} does not support the AND operator")]
    OperatorsForbidden(String),

    /// A group without values.
    #[error("field {0:?} has no values")]
    NoValues(String),

    /// A value does not have the shape the field requires.
    #[error("field {field:?}: invalid value {value:?}")]
    InvalidValue { field: String, value: String },

    /// A builder rejected the group.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// A legacy policy could not be upgraded.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The policy document is not valid JSON or YAML for the model.
    #[error("failed to parse policy: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ValidationError>;
