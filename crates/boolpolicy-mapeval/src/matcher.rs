//! Map query compilation and evaluation.

use crate::error::{MapQueryError, Result};
use crate::query::{CONJUNCTION_MARKER, DISJUNCTION_MARKER, SHOULD_NOT_MATCH_MARKER};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// A compiled map query.
///
/// Immutable after compilation; evaluation keeps its bookkeeping on the stack,
/// so one matcher can be shared across threads.
#[derive(Debug, Clone)]
pub struct MapMatcher {
    groups: Vec<Group>,
}

#[derive(Debug, Clone)]
struct Group {
    constraints: Vec<Constraint>,
}

#[derive(Debug, Clone)]
struct Constraint {
    key: Option<Regex>,
    value: Option<Regex>,
    should_not_match: bool,
}

impl Constraint {
    fn parse(raw: &str) -> Result<Self> {
        let (should_not_match, body) = match raw.strip_prefix(SHOULD_NOT_MATCH_MARKER) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let (key, value) = body
            .split_once('=')
            .ok_or_else(|| MapQueryError::MalformedConstraint(raw.to_string()))?;
        Ok(Self {
            key: compile_side(key)?,
            value: compile_side(value)?,
            should_not_match,
        })
    }

    fn test(&self, key: &str, value: &str) -> bool {
        self.key.as_ref().map_or(true, |re| re.is_match(key))
            && self.value.as_ref().map_or(true, |re| re.is_match(value))
    }
}

fn compile_side(pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(&format!("^(?:{})$", pattern))
        .map(Some)
        .map_err(|source| MapQueryError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })
}

impl MapMatcher {
    /// Compile a query string built from the [`crate::query`] builders.
    ///
    /// Empty segments between separators are ignored; a query with no
    /// constraints at all compiles to a matcher that never matches.
    pub fn compile(query: &str) -> Result<Self> {
        let mut groups = Vec::new();
        for raw_group in query.split(DISJUNCTION_MARKER) {
            let constraints = raw_group
                .split(CONJUNCTION_MARKER)
                .filter(|c| !c.is_empty())
                .map(Constraint::parse)
                .collect::<Result<Vec<_>>>()?;
            if !constraints.is_empty() {
                groups.push(Group { constraints });
            }
        }
        debug!(groups = groups.len(), "Compiled map query");
        Ok(Self { groups })
    }

    /// Number of disjunctive groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Evaluate against any iterable of string pairs.
    pub fn matches<I, K, V>(&self, entries: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if self.groups.is_empty() {
            return false;
        }
        let mut observed = self.unobserved();
        for (k, v) in entries {
            self.observe(&mut observed, k.as_ref(), v.as_ref());
        }
        self.decide(&observed)
    }

    /// Evaluate against a JSON value.
    ///
    /// Only objects whose values are all strings are maps in this sense; any
    /// other shape evaluates to `false`. `null` is treated as an empty map.
    pub fn matches_json(&self, value: &Value) -> bool {
        if self.groups.is_empty() {
            return false;
        }
        let mut observed = self.unobserved();
        match value {
            Value::Null => {}
            Value::Object(map) => {
                for (k, v) in map {
                    let Some(v) = v.as_str() else {
                        return false;
                    };
                    self.observe(&mut observed, k, v);
                }
            }
            _ => return false,
        }
        self.decide(&observed)
    }

    fn unobserved(&self) -> Vec<Vec<bool>> {
        self.groups
            .iter()
            .map(|g| vec![false; g.constraints.len()])
            .collect()
    }

    fn observe(&self, observed: &mut [Vec<bool>], key: &str, value: &str) {
        for (group, seen) in self.groups.iter().zip(observed.iter_mut()) {
            for (constraint, hit) in group.constraints.iter().zip(seen.iter_mut()) {
                if !*hit && constraint.test(key, value) {
                    *hit = true;
                }
            }
        }
    }

    fn decide(&self, observed: &[Vec<bool>]) -> bool {
        self.groups.iter().zip(observed).any(|(group, seen)| {
            group
                .constraints
                .iter()
                .zip(seen)
                .all(|(constraint, hit)| *hit != constraint.should_not_match)
        })
    }
}

/// Compile a map query into a reusable matcher.
pub fn build_map_matcher(query: &str) -> Result<MapMatcher> {
    MapMatcher::compile(query)
}
