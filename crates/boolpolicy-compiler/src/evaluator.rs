//! Compiled evaluators.

use crate::error::InvariantViolation;
use crate::matchers::NULL_MARKER;
use boolpolicy_engine::{EvaluatorBackend, RuleEngine};
use boolpolicy_types::{Binding, QueryResult};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// Log target for invariant violations.
pub const INVARIANT_TARGET: &str = "boolpolicy::invariant";

/// A prepared program for one query.
///
/// Immutable once built; `evaluate` only touches local state, so one evaluator
/// can be shared across threads behind an `Arc`.
pub struct Evaluator<B: EvaluatorBackend = RuleEngine> {
    backend: Arc<B>,
    prepared: B::Prepared,
    source: String,
    rule_count: usize,
}

impl<B: EvaluatorBackend> Evaluator<B> {
    pub(crate) fn new(backend: Arc<B>, prepared: B::Prepared, source: String, rule_count: usize) -> Self {
        Self {
            backend,
            prepared,
            source,
            rule_count,
        }
    }

    /// The rendered program text.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// Evaluate any serializable object.
    ///
    /// Returns `Some` with every distinct binding when the object matches and
    /// `None` otherwise. Internal failures are logged and reported as no match.
    pub fn evaluate<T: Serialize + ?Sized>(&self, object: &T) -> Option<QueryResult> {
        match serde_json::to_value(object) {
            Ok(value) => self.evaluate_value(&value),
            Err(e) => {
                report(InvariantViolation::Serialize(e.to_string()));
                None
            }
        }
    }

    /// Evaluate an object already in JSON form.
    pub fn evaluate_value(&self, input: &Value) -> Option<QueryResult> {
        match self.try_evaluate(input) {
            Ok(result) => result,
            Err(violation) => {
                report(violation);
                None
            }
        }
    }

    fn try_evaluate(&self, input: &Value) -> Result<Option<QueryResult>, InvariantViolation> {
        let sets = self
            .backend
            .execute(&self.prepared, input)
            .map_err(InvariantViolation::Execution)?;
        if sets.len() != 1 {
            return Err(InvariantViolation::ResultSetCount(sets.len()));
        }

        let mut bindings = Vec::new();
        for set in sets {
            for entry in set {
                bindings.push(decode_binding(entry)?);
            }
        }

        if bindings.is_empty() {
            Ok(None)
        } else {
            Ok(Some(QueryResult::new(bindings)))
        }
    }
}

impl<B: EvaluatorBackend> fmt::Debug for Evaluator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("rule_count", &self.rule_count)
            .field("source_len", &self.source.len())
            .finish()
    }
}

fn report(violation: InvariantViolation) {
    error!(target: INVARIANT_TARGET, violation = %violation, "Invariant violation during evaluation");
}

fn decode_binding(entry: Value) -> Result<Binding, InvariantViolation> {
    let map = match entry {
        Value::Object(map) => map,
        other => return Err(InvariantViolation::BindingNotObject(other.to_string())),
    };

    let mut binding = Binding::new();
    for (label, values) in map {
        let Value::Array(values) = values else {
            return Err(InvariantViolation::EntryNotArray { label });
        };
        let mut decoded = Vec::with_capacity(values.len());
        for value in values {
            match value {
                // Array leaves: one entry per element.
                Value::Array(items) => {
                    for item in items {
                        if item.is_array() {
                            return Err(InvariantViolation::UndecodableValue {
                                label,
                                value: item.to_string(),
                            });
                        }
                        decode_scalar(item, &mut decoded);
                    }
                }
                other => decode_scalar(other, &mut decoded),
            }
        }
        binding.insert(label, decoded);
    }
    Ok(binding)
}

fn decode_scalar(value: Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Null => out.push(NULL_MARKER.to_string()),
        Value::Object(entries) => {
            // Map leaves: one `key=value` entry per pair, sorted by key.
            let mut pairs: Vec<(String, Value)> = entries.into_iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            for (k, v) in pairs {
                match v {
                    Value::String(s) => out.push(format!("{}={}", k, s)),
                    other => out.push(format!("{}={}", k, other)),
                }
            }
        }
        other => out.push(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boolpolicy_engine::{EngineError, Result as EngineResult};
    use serde_json::json;

    /// Backend returning canned output, for exercising decode anomalies.
    struct Canned(fn() -> EngineResult<Vec<Vec<Value>>>);

    impl EvaluatorBackend for Canned {
        type Prepared = ();

        fn prepare(&self, _source: &str) -> EngineResult<()> {
            Ok(())
        }

        fn execute(&self, _prepared: &(), _input: &Value) -> EngineResult<Vec<Vec<Value>>> {
            (self.0)()
        }
    }

    fn canned(f: fn() -> EngineResult<Vec<Vec<Value>>>) -> Evaluator<Canned> {
        Evaluator::new(Arc::new(Canned(f)), (), String::new(), 1)
    }

    #[test]
    fn test_decodes_scalars_and_maps() {
        let ev = canned(|| {
            Ok(vec![vec![json!({
                "Image": ["nginx"],
                "Privileged": [true],
                "Replicas": [3],
                "Labels": [{"team": "pay", "app": "web"}],
            })]])
        });
        let result = ev.evaluate(&json!({})).unwrap();
        assert_eq!(result.len(), 1);
        let b = &result.bindings[0];
        assert_eq!(b["Image"], vec!["nginx"]);
        assert_eq!(b["Privileged"], vec!["true"]);
        assert_eq!(b["Replicas"], vec!["3"]);
        assert_eq!(b["Labels"], vec!["app=web", "team=pay"]);
    }

    #[test]
    fn test_decodes_arrays_per_element_and_null_as_absent() {
        let ev = canned(|| {
            Ok(vec![vec![json!({
                "Args": [["--a", "--b"]],
                "Ports": [[80, 443]],
                "Empty": [[]],
                "Image Scan": [null],
            })]])
        });
        let result = ev.evaluate(&json!({})).unwrap();
        let b = &result.bindings[0];
        assert_eq!(b["Args"], vec!["--a", "--b"]);
        assert_eq!(b["Ports"], vec!["80", "443"]);
        assert!(b["Empty"].is_empty());
        assert_eq!(b["Image Scan"], vec!["-"]);
    }

    #[test]
    fn test_empty_result_set_is_no_match() {
        assert!(canned(|| Ok(vec![vec![]])).evaluate(&json!({})).is_none());
    }

    #[test]
    fn test_anomalies_fail_closed() {
        let cases: [fn() -> EngineResult<Vec<Vec<Value>>>; 6] = [
            || Err(EngineError::Execution("boom".into())),
            || Ok(vec![]),
            || Ok(vec![vec![json!({"A": ["x"]})], vec![json!({"A": ["y"]})]]),
            || Ok(vec![vec![json!(["not", "an", "object"])]]),
            || Ok(vec![vec![json!({"A": "x"})]]),
            || Ok(vec![vec![json!({"A": [[["nested"]]]})]]),
        ];
        for case in cases {
            assert!(canned(case).evaluate(&json!({})).is_none());
        }
    }

    #[test]
    fn test_unserializable_object_fails_closed() {
        use std::collections::HashMap;
        // Non-string map keys cannot become JSON object keys.
        let mut object = HashMap::new();
        object.insert(vec![1u8], "x");
        assert!(canned(|| Ok(vec![vec![json!({})]])).evaluate(&object).is_none());
    }
}
