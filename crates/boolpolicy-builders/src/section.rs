//! Section validation and translation into a compiler query.

use crate::error::{Result, ValidationError};
use crate::metadata::field_metadata;
use crate::policy::{BooleanOperator, EventSource, PolicySection};
use boolpolicy_types::Query;
use std::collections::HashSet;
use tracing::debug;

/// Options that tighten validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Reject values for environment variable sources that reference other
    /// objects, like secrets and config maps.
    pub strict_env_var_sources: bool,
    /// Fields not applicable to this source are rejected.
    pub event_source: EventSource,
}

impl ValidationOptions {
    pub fn strict() -> Self {
        Self {
            strict_env_var_sources: true,
            ..Default::default()
        }
    }
}

/// Validate a section and build the conjunction of field queries it stands
/// for. Identical field queries from different groups appear once.
pub fn section_to_query(section: &PolicySection, options: &ValidationOptions) -> Result<Query> {
    if section.policy_groups.is_empty() {
        return Err(ValidationError::NoGroups(section.section_name.clone()));
    }

    let mut seen = HashSet::new();
    let mut field_queries = Vec::new();
    for group in &section.policy_groups {
        let name = group.field_name.as_str();
        let metadata =
            field_metadata(name).ok_or_else(|| ValidationError::UnknownField(name.to_string()))?;
        if !seen.insert(name) {
            return Err(ValidationError::DuplicateField(name.to_string()));
        }
        if !metadata.is_applicable_to(options.event_source) {
            return Err(ValidationError::NotApplicable {
                field: name.to_string(),
                event_source: options.event_source,
            });
        }
        if group.negate && metadata.negation_forbidden {
            return Err(ValidationError::NegationForbidden(name.to_string()));
        }
        if group.boolean_operator == BooleanOperator::And && metadata.operators_forbidden {
            return Err(ValidationError::OperatorsForbidden(name.to_string()));
        }
        if group.values.is_empty() {
            return Err(ValidationError::NoValues(name.to_string()));
        }
        if let Some(bad) = group
            .raw_values()
            .find(|v| !metadata.value_kind.accepts(v, options))
        {
            return Err(ValidationError::InvalidValue {
                field: name.to_string(),
                value: bad.to_string(),
            });
        }

        let built = metadata.builder.field_queries_for_group(group)?;
        debug!(field = name, queries = built.len(), "built field queries");
        for query in built {
            if !field_queries.contains(&query) {
                field_queries.push(query);
            }
        }
    }

    Ok(Query::new(field_queries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldnames as f;
    use crate::policy::PolicyGroup;

    fn section(groups: Vec<PolicyGroup>) -> PolicySection {
        PolicySection::new("s", groups)
    }

    fn build(groups: Vec<PolicyGroup>) -> Result<Query> {
        section_to_query(&section(groups), &ValidationOptions::default())
    }

    #[test]
    fn test_groups_concatenate_in_order() {
        let query = build(vec![
            PolicyGroup::new(f::IMAGE_TAG, ["latest"]),
            PolicyGroup::new(f::CVSS, [">=7"]),
        ])
        .unwrap();
        let fields: Vec<&str> = query.field_queries.iter().map(|q| q.field.as_str()).collect();
        assert_eq!(fields, vec!["Image Tag", "CVSS", "CVE Suppressed"]);
    }

    #[test]
    fn test_shared_suppression_check_appears_once() {
        let query = build(vec![
            PolicyGroup::new(f::CVE, ["CVE-2021-44228"]),
            PolicyGroup::new(f::CVSS, [">= 7"]),
            PolicyGroup::new(f::SEVERITY, ["CRITICAL"]),
        ])
        .unwrap();
        let fields: Vec<&str> = query.field_queries.iter().map(|q| q.field.as_str()).collect();
        assert_eq!(fields, vec!["CVE", "CVE Suppressed", "CVSS", "Severity"]);
    }

    #[test]
    fn test_fields_checked_against_event_source() {
        let runtime = ValidationOptions {
            event_source: EventSource::DeploymentEvent,
            ..Default::default()
        };
        let process = vec![PolicyGroup::new(f::PROCESS_NAME, ["bash"])];
        assert!(section_to_query(&section(process.clone()), &runtime).is_ok());
        match build(process) {
            Err(ValidationError::NotApplicable { field, event_source }) => {
                assert_eq!(field, "Process Name");
                assert_eq!(event_source, EventSource::NotApplicable);
            }
            other => panic!("expected not applicable, got {:?}", other),
        }

        let audit = ValidationOptions {
            event_source: EventSource::AuditLogEvent,
            ..Default::default()
        };
        let verb = vec![
            PolicyGroup::new(f::KUBE_API_VERB, ["GET"]),
            PolicyGroup::new(f::KUBE_RESOURCE, ["SECRETS"]),
        ];
        assert!(section_to_query(&section(verb.clone()), &audit).is_ok());
        assert!(matches!(
            section_to_query(&section(verb), &runtime),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            section_to_query(&section(vec![PolicyGroup::new(f::IMAGE_TAG, ["x"])]), &audit),
            Err(ValidationError::NotApplicable { .. })
        ));
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(build(vec![]), Err(ValidationError::NoGroups(_))));
        assert!(matches!(
            build(vec![PolicyGroup::new("Mystery", ["x"])]),
            Err(ValidationError::UnknownField(_))
        ));
        assert!(matches!(
            build(vec![
                PolicyGroup::new(f::IMAGE_TAG, ["a"]),
                PolicyGroup::new(f::IMAGE_TAG, ["b"]),
            ]),
            Err(ValidationError::DuplicateField(_))
        ));
        assert!(matches!(
            build(vec![PolicyGroup::new(f::IMAGE_TAG, Vec::<&str>::new())]),
            Err(ValidationError::NoValues(_))
        ));
    }

    #[test]
    fn test_group_option_restrictions() {
        assert!(matches!(
            build(vec![PolicyGroup::new(f::PRIVILEGED_CONTAINER, ["true"]).negated(true)]),
            Err(ValidationError::NegationForbidden(_))
        ));
        assert!(matches!(
            build(vec![PolicyGroup::new(f::HOST_PID, ["true"])
                .with_operator(BooleanOperator::And)]),
            Err(ValidationError::OperatorsForbidden(_))
        ));
        assert!(build(vec![PolicyGroup::new(f::IMAGE_TAG, ["a", "b"])
            .with_operator(BooleanOperator::And)
            .negated(true)])
        .is_ok());
    }

    #[test]
    fn test_value_validation() {
        match build(vec![PolicyGroup::new(f::EXPOSED_PORT, ["22", "port"])]) {
            Err(ValidationError::InvalidValue { field, value }) => {
                assert_eq!(field, "Exposed Port");
                assert_eq!(value, "port");
            }
            other => panic!("expected invalid value, got {:?}", other),
        }

        let secret = vec![PolicyGroup::new(f::ENVIRONMENT_VARIABLE, ["SECRET_KEY=key=value"])];
        assert!(section_to_query(&section(secret.clone()), &ValidationOptions::default()).is_ok());
        assert!(matches!(
            section_to_query(&section(secret), &ValidationOptions::strict()),
            Err(ValidationError::InvalidValue { .. })
        ));
    }
}
