//! Evaluation results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One satisfied rule instance: field label -> matched values.
pub type Binding = BTreeMap<String, Vec<String>>;

/// Every distinct binding produced for a matching object, in rule order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub bindings: Vec<Binding>,
}

impl QueryResult {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Self { bindings }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// All values matched for `label` across bindings, in order.
    pub fn values_for(&self, label: &str) -> Vec<&str> {
        self.bindings
            .iter()
            .filter_map(|b| b.get(label))
            .flatten()
            .map(String::as_str)
            .collect()
    }
}
