//! Access paths with shared index variables.
//!
//! Every repeated segment (`Slice` or `Map`) gets an index variable. Variables
//! are keyed by the path prefix up to and including that segment, so two fields
//! under the same repeated container are looked up in the same element.

use boolpolicy_engine::is_plain_identifier;
use boolpolicy_types::{LeafKind, MetaPath, PathSegment};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Field(String),
    Index(String),
}

/// A rendered-ready path from `input` to one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AccessPath {
    pub steps: Vec<Step>,
}

impl AccessPath {
    pub fn index_vars(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|s| match s {
            Step::Index(v) => Some(v.as_str()),
            Step::Field(_) => None,
        })
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("input")?;
        for step in &self.steps {
            match step {
                Step::Field(name) if is_plain_identifier(name) => write!(f, ".{}", name)?,
                Step::Field(name) => write!(f, "[{}]", crate::render::quote(name))?,
                Step::Index(var) => write!(f, "[{}]", var)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct IndexAllocator {
    by_prefix: HashMap<Vec<PathSegment>, String>,
}

impl IndexAllocator {
    pub fn access_path(&mut self, meta: &MetaPath) -> AccessPath {
        let last = meta.segments.len().saturating_sub(1);
        let mut steps = Vec::with_capacity(meta.segments.len() * 2);

        for (i, segment) in meta.segments.iter().enumerate() {
            steps.push(Step::Field(segment.name.clone()));

            // A map leaf is handed to the matcher whole.
            let whole_map = i == last && meta.leaf == LeafKind::Map;
            if segment.kind.is_repeated() && !whole_map {
                let next = format!("idx{}", self.by_prefix.len());
                let var = self
                    .by_prefix
                    .entry(meta.segments[..=i].to_vec())
                    .or_insert(next);
                steps.push(Step::Index(var.clone()));
            }
        }

        AccessPath { steps }
    }
}
