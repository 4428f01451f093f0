//! Field queries: the compiler's input IR.

use serde::{Deserialize, Serialize};

/// How multiple values of one field query combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[default]
    Unset,
    And,
    Or,
}

/// Match criteria for a single field.
///
/// `values` must be non-empty unless `match_all` is set; the compiler rejects
/// the query otherwise rather than matching every object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldQuery {
    pub field: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub match_all: bool,
}

impl FieldQuery {
    /// Create a field query with OR semantics across `values`.
    pub fn new<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            operator: Operator::Unset,
            negate: false,
            match_all: false,
        }
    }

    /// A field query that matches any value of the field.
    pub fn match_all(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            values: Vec::new(),
            operator: Operator::Unset,
            negate: false,
            match_all: true,
        }
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    pub fn negated(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }
}

/// A conjunction of field queries, compiled into one evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    pub field_queries: Vec<FieldQuery>,
}

impl Query {
    pub fn new(field_queries: Vec<FieldQuery>) -> Self {
        Self { field_queries }
    }

    pub fn with_field(mut self, field_query: FieldQuery) -> Self {
        self.field_queries.push(field_query);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.field_queries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.field_queries.len()
    }
}
