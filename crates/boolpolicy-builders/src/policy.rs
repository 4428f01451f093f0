//! Persisted policy model.
//!
//! Field names follow the camelCase JSON the policies are stored as.

use crate::convert::{clone_and_ensure_converted, PolicyFields, POLICY_VERSION};
use crate::error::{Result, ValidationError};
use crate::section::{section_to_query, ValidationOptions};
use boolpolicy_types::Query;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the values of one policy group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BooleanOperator {
    #[default]
    Or,
    And,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicyValue {
    pub value: String,
}

impl From<&str> for PolicyValue {
    fn from(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

/// One criterion of a section: a policy field and the values it is checked
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyGroup {
    pub field_name: String,
    #[serde(default)]
    pub boolean_operator: BooleanOperator,
    #[serde(default)]
    pub negate: bool,
    #[serde(default)]
    pub values: Vec<PolicyValue>,
}

impl PolicyGroup {
    pub fn new<I, S>(field_name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            field_name: field_name.into(),
            boolean_operator: BooleanOperator::Or,
            negate: false,
            values: values.into_iter().map(|v| PolicyValue::from(v.as_ref())).collect(),
        }
    }

    pub fn with_operator(mut self, operator: BooleanOperator) -> Self {
        self.boolean_operator = operator;
        self
    }

    pub fn negated(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    /// Raw value strings, in order.
    pub fn raw_values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.value.as_str())
    }
}

/// A conjunction of policy groups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySection {
    #[serde(default)]
    pub section_name: String,
    #[serde(default)]
    pub policy_groups: Vec<PolicyGroup>,
}

impl PolicySection {
    pub fn new(section_name: impl Into<String>, policy_groups: Vec<PolicyGroup>) -> Self {
        Self {
            section_name: section_name.into(),
            policy_groups,
        }
    }
}

/// The kind of event a policy is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventSource {
    /// Build and deploy time checks.
    #[default]
    NotApplicable,
    DeploymentEvent,
    AuditLogEvent,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventSource::NotApplicable => "NOT_APPLICABLE",
            EventSource::DeploymentEvent => "DEPLOYMENT_EVENT",
            EventSource::AuditLogEvent => "AUDIT_LOG_EVENT",
        })
    }
}

/// A policy: a disjunction of sections.
///
/// Policies stored before sections existed carry an empty `policyVersion` and
/// their criteria in `fields`; they are upgraded on the way to queries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub name: String,
    #[serde(default)]
    pub policy_version: String,
    #[serde(default)]
    pub event_source: EventSource,
    #[serde(default)]
    pub policy_sections: Vec<PolicySection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<PolicyFields>,
}

impl Policy {
    /// A current-version policy.
    pub fn new(name: impl Into<String>, policy_sections: Vec<PolicySection>) -> Self {
        Self {
            name: name.into(),
            policy_version: POLICY_VERSION.to_string(),
            policy_sections,
            ..Default::default()
        }
    }

    pub fn with_event_source(mut self, event_source: EventSource) -> Self {
        self.event_source = event_source;
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| ValidationError::Parse(e.to_string()))
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| ValidationError::Parse(e.to_string()))
    }

    /// Check every section with default options.
    pub fn validate(&self) -> Result<()> {
        self.validate_with(&ValidationOptions::default())
    }

    pub fn validate_with(&self, options: &ValidationOptions) -> Result<()> {
        self.queries_with(options).map(|_| ())
    }

    /// One query per section. A policy is violated when any of them matches.
    pub fn queries(&self) -> Result<Vec<Query>> {
        self.queries_with(&ValidationOptions::default())
    }

    /// Fields are validated against the policy's own event source.
    pub fn queries_with(&self, options: &ValidationOptions) -> Result<Vec<Query>> {
        let policy = clone_and_ensure_converted(self)?;
        if policy.policy_sections.is_empty() {
            return Err(ValidationError::NoSections(policy.name.clone()));
        }
        let options = ValidationOptions {
            event_source: policy.event_source,
            ..*options
        };
        policy
            .policy_sections
            .iter()
            .map(|section| section_to_query(section, &options))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;

    const POLICY_JSON: &str = r#"{
        "name": "Latest tag",
        "policyVersion": "2.0",
        "policySections": [{
            "sectionName": "images",
            "policyGroups": [{
                "fieldName": "Image Tag",
                "booleanOperator": "OR",
                "values": [{"value": "latest"}, {"value": "dev"}]
            }]
        }]
    }"#;

    #[test]
    fn test_policy_json_shape() {
        let policy = Policy::from_json_str(POLICY_JSON).unwrap();
        assert_eq!(policy.name, "Latest tag");
        let group = &policy.policy_sections[0].policy_groups[0];
        assert_eq!(group.field_name, "Image Tag");
        assert_eq!(policy.policy_version, POLICY_VERSION);
        assert_eq!(policy.event_source, EventSource::NotApplicable);
        assert_eq!(group.boolean_operator, BooleanOperator::Or);
        assert!(!group.negate);
        assert_eq!(group.raw_values().collect::<Vec<_>>(), vec!["latest", "dev"]);
    }

    #[test]
    fn test_policy_yaml_defaults() {
        let policy = Policy::from_yaml_str(
            "name: privileged\npolicySections:\n  - policyGroups:\n      - fieldName: Privileged Container\n        values:\n          - value: \"true\"\n",
        )
        .unwrap();
        let group = &policy.policy_sections[0].policy_groups[0];
        assert_eq!(group.boolean_operator, BooleanOperator::Or);
        assert_eq!(policy.policy_sections[0].section_name, "");
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_policy() {
        let current = Policy::new("empty", vec![]);
        assert!(matches!(
            current.validate(),
            Err(ValidationError::Conversion(ConversionError::EmptySections(_)))
        ));
        let legacy = Policy {
            name: "empty".into(),
            ..Default::default()
        };
        assert!(matches!(
            legacy.validate(),
            Err(ValidationError::Conversion(ConversionError::EmptyPolicy(_)))
        ));
        let no_criteria = Policy {
            name: "empty".into(),
            fields: Some(PolicyFields::default()),
            ..Default::default()
        };
        assert!(matches!(no_criteria.validate(), Err(ValidationError::NoSections(_))));
        assert!(matches!(
            Policy::from_json_str("{"),
            Err(ValidationError::Parse(_))
        ));
    }

    #[test]
    fn test_queries_one_per_section() {
        let mut policy = Policy::from_json_str(POLICY_JSON).unwrap();
        policy.policy_sections.push(PolicySection::new(
            "privileged",
            vec![PolicyGroup::new("Privileged Container", ["true"])],
        ));
        let queries = policy.queries().unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].field_queries[0].field, "Image Tag");
        assert_eq!(queries[1].field_queries[0].field, "Privileged");
    }

    #[test]
    fn test_event_source_comes_from_policy() {
        let runtime = Policy::from_yaml_str(
            "name: shell\npolicyVersion: \"2.0\"\neventSource: DEPLOYMENT_EVENT\npolicySections:\n  - policyGroups:\n      - fieldName: Process Name\n        values:\n          - value: bash\n",
        )
        .unwrap();
        assert_eq!(runtime.event_source, EventSource::DeploymentEvent);
        assert!(runtime.validate().is_ok());

        let deploy = runtime.clone().with_event_source(EventSource::NotApplicable);
        assert!(matches!(deploy.validate(), Err(ValidationError::NotApplicable { .. })));
    }

    #[test]
    fn test_legacy_policy_is_upgraded_for_queries() {
        let legacy = Policy::from_json_str(
            r#"{"name": "legacy", "fields": {"imageName": {"tag": "latest"}, "privileged": true}}"#,
        )
        .unwrap();
        assert_eq!(legacy.policy_version, "");
        let queries = legacy.queries().unwrap();
        assert_eq!(queries.len(), 1);
        let fields: Vec<&str> = queries[0].field_queries.iter().map(|q| q.field.as_str()).collect();
        assert_eq!(fields, vec!["Image Tag", "Privileged"]);
        // The stored policy is left untouched.
        assert!(legacy.fields.is_some());
    }
}
