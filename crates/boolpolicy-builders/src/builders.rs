//! Policy group -> field query builders.

use crate::error::BuildError;
use crate::labels::{
    COMPOUND_SEPARATOR, CVE_SUPPRESSED, HOST_PATH_VOLUME_TYPE, NULL_MARKER, VOLUME_READ_ONLY,
    VOLUME_TYPE,
};
use crate::policy::{BooleanOperator, PolicyGroup};
use boolpolicy_mapeval::{conjunction, disjunction, should_contain, should_not_contain};
use boolpolicy_types::{parse_bool, FieldQuery, Operator};

/// Translates one policy group into the field queries it stands for.
pub trait QueryBuilder: Send + Sync {
    fn field_queries_for_group(&self, group: &PolicyGroup) -> Result<Vec<FieldQuery>, BuildError>;
}

/// Per-value transformation applied before a value reaches the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMapper {
    Identity,
    /// `"value"`: exact match.
    Exact,
    /// `r/value`: regex match.
    Regex,
    Upper,
    /// `>=value`, for day thresholds.
    Days,
    /// `>=value`, for permission levels.
    Rbac,
    /// Parse as a boolean, optionally invert, render as `true`/`false`.
    Boolean { invert: bool },
    /// Split on `=` into exactly N parts and match them as one regex.
    Compound(usize),
}

impl ValueMapper {
    pub fn map(self, field: &str, raw: &str) -> Result<String, BuildError> {
        Ok(match self {
            ValueMapper::Identity => raw.to_string(),
            ValueMapper::Exact => format!("\"{}\"", raw),
            ValueMapper::Regex => format!("r/{}", raw),
            ValueMapper::Upper => raw.to_uppercase(),
            ValueMapper::Days | ValueMapper::Rbac => format!(">={}", raw),
            ValueMapper::Boolean { invert } => {
                let b = parse_boolean(field, raw)?;
                (b != invert).to_string()
            }
            ValueMapper::Compound(parts) => compound_regex(field, raw, parts)?,
        })
    }
}

fn parse_boolean(field: &str, raw: &str) -> Result<bool, BuildError> {
    parse_bool(raw).map_err(|_| BuildError::InvalidBoolean {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn compound_regex(field: &str, raw: &str, expected: usize) -> Result<String, BuildError> {
    let parts: Vec<&str> = raw.splitn(expected, '=').collect();
    if parts.len() != expected {
        return Err(BuildError::CompoundArity {
            field: field.to_string(),
            value: raw.to_string(),
            expected,
            got: parts.len(),
        });
    }
    let escaped: Vec<String> = parts
        .iter()
        .map(|p| if p.is_empty() { ".*".to_string() } else { regex::escape(p) })
        .collect();
    Ok(format!("r/{}", escaped.join(COMPOUND_SEPARATOR)))
}

fn operator_of(group: &PolicyGroup) -> Operator {
    match group.boolean_operator {
        BooleanOperator::Or => Operator::Or,
        BooleanOperator::And => Operator::And,
    }
}

fn map_values(
    field: &str,
    group: &PolicyGroup,
    mapper: ValueMapper,
) -> Result<Vec<String>, BuildError> {
    group.raw_values().map(|raw| mapper.map(field, raw)).collect()
}

fn single_value<'a>(group: &'a PolicyGroup) -> Result<&'a str, BuildError> {
    match group.values.as_slice() {
        [only] => Ok(only.value.as_str()),
        values => Err(BuildError::WrongValueCount {
            field: group.field_name.clone(),
            expected: 1,
            got: values.len(),
        }),
    }
}

/// Maps every value and emits one field query under `label`.
#[derive(Debug, Clone, Copy)]
pub struct FieldLabel {
    pub label: &'static str,
    pub mapper: ValueMapper,
}

impl FieldLabel {
    pub const fn new(label: &'static str, mapper: ValueMapper) -> Self {
        Self { label, mapper }
    }

    fn field_query(&self, group: &PolicyGroup) -> Result<FieldQuery, BuildError> {
        Ok(FieldQuery {
            field: self.label.to_string(),
            values: map_values(&group.field_name, group, self.mapper)?,
            operator: operator_of(group),
            negate: group.negate,
            match_all: false,
        })
    }
}

impl QueryBuilder for FieldLabel {
    fn field_queries_for_group(&self, group: &PolicyGroup) -> Result<Vec<FieldQuery>, BuildError> {
        Ok(vec![self.field_query(group)?])
    }
}

/// Which constraint a map value turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapPredicate {
    ShouldContain,
    ShouldNotContain,
}

/// Turns `key=value` entries into one map query. `OR` groups become one
/// disjunct per value, `AND` groups a single conjunction.
#[derive(Debug, Clone, Copy)]
pub struct MapLabel {
    pub label: &'static str,
    pub predicate: MapPredicate,
}

impl MapLabel {
    pub const fn new(label: &'static str, predicate: MapPredicate) -> Self {
        Self { label, predicate }
    }
}

impl QueryBuilder for MapLabel {
    fn field_queries_for_group(&self, group: &PolicyGroup) -> Result<Vec<FieldQuery>, BuildError> {
        let constraints: Vec<String> = group
            .raw_values()
            .map(|raw| {
                let (key, value) = raw.split_once('=').unwrap_or((raw, ""));
                match self.predicate {
                    MapPredicate::ShouldContain => should_contain(key, value),
                    MapPredicate::ShouldNotContain => should_not_contain(key, value),
                }
            })
            .collect();
        let combined = match group.boolean_operator {
            BooleanOperator::Or => disjunction(&constraints),
            BooleanOperator::And => conjunction(&constraints),
        };
        Ok(vec![FieldQuery::new(self.label, [combined]).negated(group.negate)])
    }
}

/// Absence check: one boolean value, matched against the null marker.
///
/// `true` asks for the label to be absent or null, `false` for it to be
/// present.
#[derive(Debug, Clone, Copy)]
pub struct NilCheck {
    pub label: &'static str,
}

impl QueryBuilder for NilCheck {
    fn field_queries_for_group(&self, group: &PolicyGroup) -> Result<Vec<FieldQuery>, BuildError> {
        let raw = single_value(group)?;
        let wants_absent = parse_boolean(&group.field_name, raw)? != group.negate;
        Ok(vec![FieldQuery::new(self.label, [NULL_MARKER]).negated(!wants_absent)])
    }
}

/// Capabilities that must be dropped: a violation is a container that does
/// not drop them, so the query is always negated.
#[derive(Debug, Clone, Copy)]
pub struct DropCaps {
    pub label: &'static str,
}

impl QueryBuilder for DropCaps {
    fn field_queries_for_group(&self, group: &PolicyGroup) -> Result<Vec<FieldQuery>, BuildError> {
        let mut query = FieldLabel::new(self.label, ValueMapper::Identity).field_query(group)?;
        query.negate = true;
        Ok(vec![query])
    }
}

/// Vulnerability fields only match findings that are not suppressed.
#[derive(Debug, Clone, Copy)]
pub struct Vulnerability {
    pub field: FieldLabel,
}

impl QueryBuilder for Vulnerability {
    fn field_queries_for_group(&self, group: &PolicyGroup) -> Result<Vec<FieldQuery>, BuildError> {
        Ok(vec![
            self.field.field_query(group)?,
            FieldQuery::new(CVE_SUPPRESSED, ["false"]),
        ])
    }
}

/// A host path volume mounted writable (or read-only, for `false`).
#[derive(Debug, Clone, Copy)]
pub struct WritableHostMount;

impl QueryBuilder for WritableHostMount {
    fn field_queries_for_group(&self, group: &PolicyGroup) -> Result<Vec<FieldQuery>, BuildError> {
        let writable = parse_boolean(&group.field_name, single_value(group)?)?;
        Ok(vec![
            FieldQuery::new(VOLUME_READ_ONLY, [(!writable).to_string()]),
            FieldQuery::new(VOLUME_TYPE, [format!("\"{}\"", HOST_PATH_VOLUME_TYPE)]),
        ])
    }
}
