//! Upgrade of legacy field-based policies to sections.
//!
//! Before sections existed a policy carried one flat [`PolicyFields`] record
//! whose criteria were implicitly ANDed. Conversion turns every set criterion
//! into a policy group of one section. Container resource criteria were ORed
//! with each other, so each of them gets its own section that repeats all
//! the ANDed groups.

use crate::error::ConversionError;
use crate::fieldnames as f;
use crate::policy::{BooleanOperator, Policy, PolicyGroup, PolicySection, PolicyValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Version of policies stored as [`PolicyFields`].
pub const LEGACY_VERSION: &str = "";

/// Version of section-based policies.
pub const POLICY_VERSION: &str = "2.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparator {
    #[default]
    LessThan,
    LessThanOrEquals,
    Equals,
    GreaterThanOrEquals,
    GreaterThan,
}

impl Comparator {
    fn prefix(self) -> &'static str {
        match self {
            Comparator::LessThan => "< ",
            Comparator::LessThanOrEquals => "<= ",
            Comparator::Equals => "",
            Comparator::GreaterThanOrEquals => ">= ",
            Comparator::GreaterThan => "> ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericalPolicy {
    pub op: Comparator,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageNamePolicy {
    pub registry: String,
    pub remote: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerfileLineRule {
    pub instruction: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Component {
    pub name: String,
    pub version: String,
}

/// Where a container environment variable takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvVarSource {
    #[default]
    Unset,
    Raw,
    SecretKey,
    ConfigMapKey,
    Field,
    ResourceField,
    Unknown,
}

impl fmt::Display for EnvVarSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EnvVarSource::Unset => "UNSET",
            EnvVarSource::Raw => "RAW",
            EnvVarSource::SecretKey => "SECRET_KEY",
            EnvVarSource::ConfigMapKey => "CONFIG_MAP_KEY",
            EnvVarSource::Field => "FIELD",
            EnvVarSource::ResourceField => "RESOURCE_FIELD",
            EnvVarSource::Unknown => "UNKNOWN",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyValuePolicy {
    pub key: String,
    pub value: String,
    /// Only meaningful for environment variables.
    pub env_var_source: EnvVarSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumePolicy {
    pub name: String,
    pub source: String,
    pub destination: String,
    pub read_only: Option<bool>,
    #[serde(rename = "type")]
    pub volume_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortPolicy {
    pub port: i32,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessPolicy {
    pub name: String,
    pub args: String,
    pub ancestor: String,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HostMountPolicy {
    pub read_only: Option<bool>,
}

/// Container resource criteria. Each set one is an alternative.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourcePolicy {
    pub cpu_resource_request: Option<NumericalPolicy>,
    pub cpu_resource_limit: Option<NumericalPolicy>,
    pub memory_resource_request: Option<NumericalPolicy>,
    pub memory_resource_limit: Option<NumericalPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    #[default]
    Unset,
    None,
    Default,
    ElevatedInNamespace,
    ElevatedClusterWide,
    ClusterAdmin,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PermissionLevel::Unset => "UNSET",
            PermissionLevel::None => "NONE",
            PermissionLevel::Default => "DEFAULT",
            PermissionLevel::ElevatedInNamespace => "ELEVATED_IN_NAMESPACE",
            PermissionLevel::ElevatedClusterWide => "ELEVATED_CLUSTER_WIDE",
            PermissionLevel::ClusterAdmin => "CLUSTER_ADMIN",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PermissionPolicy {
    pub permission_level: PermissionLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExposureLevel {
    Unset,
    External,
    Node,
    Internal,
    Host,
}

impl fmt::Display for ExposureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExposureLevel::Unset => "UNSET",
            ExposureLevel::External => "EXTERNAL",
            ExposureLevel::Node => "NODE",
            ExposureLevel::Internal => "INTERNAL",
            ExposureLevel::Host => "HOST",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortExposurePolicy {
    pub exposure_levels: Vec<ExposureLevel>,
}

/// The criteria of a legacy policy. Unset criteria are `None` or empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyFields {
    pub image_name: Option<ImageNamePolicy>,
    pub image_age_days: Option<i64>,
    pub line_rule: Option<DockerfileLineRule>,
    pub cvss: Option<NumericalPolicy>,
    pub cve: String,
    pub component: Option<Component>,
    pub scan_age_days: Option<i64>,
    pub no_scan_exists: Option<bool>,
    pub env: Option<KeyValuePolicy>,
    pub volume_policy: Option<VolumePolicy>,
    pub port_policy: Option<PortPolicy>,
    pub required_label: Option<KeyValuePolicy>,
    pub required_annotation: Option<KeyValuePolicy>,
    pub disallowed_annotation: Option<KeyValuePolicy>,
    pub required_image_label: Option<KeyValuePolicy>,
    pub disallowed_image_label: Option<KeyValuePolicy>,
    pub privileged: Option<bool>,
    pub process_policy: Option<ProcessPolicy>,
    pub host_mount_policy: Option<HostMountPolicy>,
    pub whitelist_enabled: Option<bool>,
    pub fixed_by: String,
    pub read_only_root_fs: Option<bool>,
    pub drop_capabilities: Vec<String>,
    pub add_capabilities: Vec<String>,
    pub container_resource_policy: Option<ResourcePolicy>,
    pub permission_policy: Option<PermissionPolicy>,
    pub port_exposure_policy: Option<PortExposurePolicy>,
}

type Converter = fn(&PolicyFields) -> Vec<PolicyGroup>;

/// ANDed criteria, in the order their groups appear in a section.
const AND_CONVERTERS: &[Converter] = &[
    convert_image_name,
    convert_image_age_days,
    convert_line_rule,
    convert_cve,
    convert_component,
    convert_scan_age_days,
    convert_no_scan_exists,
    convert_env,
    convert_volume_policy,
    convert_port_policy,
    convert_required_label,
    convert_required_annotation,
    convert_disallowed_annotation,
    convert_required_image_label,
    convert_disallowed_image_label,
    convert_privileged,
    convert_process_policy,
    convert_host_mount_policy,
    convert_whitelist_enabled,
    convert_fixed_by,
    convert_read_only_root_fs,
    convert_cvss,
    convert_drop_capabilities,
    convert_add_capabilities,
    convert_permission_policy,
    convert_port_exposure_policy,
];

/// Upgrade `policy` in place if it is a legacy policy.
///
/// A legacy policy that already has sections keeps them, and the sections
/// converted from its fields are appended.
pub fn ensure_converted(policy: &mut Policy) -> Result<(), ConversionError> {
    let version = policy.policy_version.clone();
    match version.as_str() {
        POLICY_VERSION if policy.policy_sections.is_empty() => {
            Err(ConversionError::EmptySections(policy.name.clone()))
        }
        POLICY_VERSION => Ok(()),
        LEGACY_VERSION => {
            if policy.fields.is_none() && policy.policy_sections.is_empty() {
                return Err(ConversionError::EmptyPolicy(policy.name.clone()));
            }
            if let Some(fields) = policy.fields.take() {
                let sections = convert_policy_fields_to_sections(&fields);
                debug!(policy = %policy.name, sections = sections.len(), "Converted legacy policy fields");
                policy.policy_sections.extend(sections);
            }
            policy.policy_version = POLICY_VERSION.to_string();
            Ok(())
        }
        other => Err(ConversionError::UnknownVersion(other.to_string())),
    }
}

/// An upgraded copy of `policy`; the original is left untouched.
pub fn clone_and_ensure_converted(policy: &Policy) -> Result<Policy, ConversionError> {
    let mut cloned = policy.clone();
    ensure_converted(&mut cloned)?;
    Ok(cloned)
}

/// Sections equivalent to `fields`. Empty when no criterion is set.
pub fn convert_policy_fields_to_sections(fields: &PolicyFields) -> Vec<PolicySection> {
    let and_groups: Vec<PolicyGroup> = AND_CONVERTERS.iter().flat_map(|convert| convert(fields)).collect();
    let or_groups = convert_container_resource_policy(fields);

    if or_groups.is_empty() {
        if and_groups.is_empty() {
            return Vec::new();
        }
        return vec![PolicySection::new("", and_groups)];
    }

    // A AND (B OR C) becomes (A AND B) OR (A AND C).
    or_groups
        .into_iter()
        .map(|or_group| {
            let mut groups = and_groups.clone();
            groups.push(or_group);
            PolicySection::new("", groups)
        })
        .collect()
}

fn group(field_name: &str, values: Vec<String>) -> PolicyGroup {
    PolicyGroup {
        field_name: field_name.to_string(),
        boolean_operator: BooleanOperator::Or,
        negate: false,
        values: values.into_iter().map(|value| PolicyValue { value }).collect(),
    }
}

fn single(field_name: &str, value: impl ToString) -> Vec<PolicyGroup> {
    vec![group(field_name, vec![value.to_string()])]
}

fn non_empty(field_name: &str, value: &str) -> Option<PolicyGroup> {
    (!value.is_empty()).then(|| group(field_name, vec![value.to_string()]))
}

fn numerical(field_name: &str, policy: &NumericalPolicy) -> PolicyGroup {
    group(field_name, vec![format!("{}{:.6}", policy.op.prefix(), policy.value)])
}

fn key_value(field_name: &str, policy: Option<&KeyValuePolicy>) -> Vec<PolicyGroup> {
    policy
        .map(|p| single(field_name, format!("{}={}", p.key, p.value)))
        .unwrap_or_default()
}

fn convert_image_name(fields: &PolicyFields) -> Vec<PolicyGroup> {
    let Some(p) = &fields.image_name else {
        return Vec::new();
    };
    let remote = (!p.remote.is_empty()).then(|| format!("r/.*{}.*", p.remote));
    [
        non_empty(f::IMAGE_REGISTRY, &p.registry),
        remote.map(|value| group(f::IMAGE_REMOTE, vec![value])),
        non_empty(f::IMAGE_TAG, &p.tag),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn convert_image_age_days(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields.image_age_days.map(|days| single(f::IMAGE_AGE, days)).unwrap_or_default()
}

fn convert_line_rule(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields
        .line_rule
        .as_ref()
        .map(|rule| single(f::DOCKERFILE_LINE, format!("{}={}", rule.instruction, rule.value)))
        .unwrap_or_default()
}

fn convert_cve(fields: &PolicyFields) -> Vec<PolicyGroup> {
    non_empty(f::CVE, &fields.cve).into_iter().collect()
}

fn convert_component(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields
        .component
        .as_ref()
        .map(|c| single(f::IMAGE_COMPONENT, format!("{}={}", c.name, c.version)))
        .unwrap_or_default()
}

fn convert_scan_age_days(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields.scan_age_days.map(|days| single(f::IMAGE_SCAN_AGE, days)).unwrap_or_default()
}

fn convert_no_scan_exists(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields.no_scan_exists.map(|b| single(f::UNSCANNED_IMAGE, b)).unwrap_or_default()
}

fn convert_env(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields
        .env
        .as_ref()
        .map(|p| single(f::ENVIRONMENT_VARIABLE, format!("{}={}={}", p.env_var_source, p.key, p.value)))
        .unwrap_or_default()
}

fn convert_volume_policy(fields: &PolicyFields) -> Vec<PolicyGroup> {
    let Some(p) = &fields.volume_policy else {
        return Vec::new();
    };
    [
        non_empty(f::VOLUME_NAME, &p.name),
        non_empty(f::VOLUME_TYPE, &p.volume_type),
        non_empty(f::VOLUME_DESTINATION, &p.destination),
        non_empty(f::VOLUME_SOURCE, &p.source),
        p.read_only
            .map(|read_only| group(f::WRITABLE_MOUNTED_VOLUME, vec![(!read_only).to_string()])),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn convert_port_policy(fields: &PolicyFields) -> Vec<PolicyGroup> {
    let Some(p) = &fields.port_policy else {
        return Vec::new();
    };
    let port = (p.port != 0).then(|| group(f::EXPOSED_PORT, vec![p.port.to_string()]));
    [port, non_empty(f::EXPOSED_PORT_PROTOCOL, &p.protocol)]
        .into_iter()
        .flatten()
        .collect()
}

fn convert_required_label(fields: &PolicyFields) -> Vec<PolicyGroup> {
    key_value(f::REQUIRED_LABEL, fields.required_label.as_ref())
}

fn convert_required_annotation(fields: &PolicyFields) -> Vec<PolicyGroup> {
    key_value(f::REQUIRED_ANNOTATION, fields.required_annotation.as_ref())
}

fn convert_disallowed_annotation(fields: &PolicyFields) -> Vec<PolicyGroup> {
    key_value(f::DISALLOWED_ANNOTATION, fields.disallowed_annotation.as_ref())
}

fn convert_required_image_label(fields: &PolicyFields) -> Vec<PolicyGroup> {
    key_value(f::REQUIRED_IMAGE_LABEL, fields.required_image_label.as_ref())
}

fn convert_disallowed_image_label(fields: &PolicyFields) -> Vec<PolicyGroup> {
    key_value(f::DISALLOWED_IMAGE_LABEL, fields.disallowed_image_label.as_ref())
}

fn convert_privileged(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields.privileged.map(|b| single(f::PRIVILEGED_CONTAINER, b)).unwrap_or_default()
}

fn convert_process_policy(fields: &PolicyFields) -> Vec<PolicyGroup> {
    let Some(p) = &fields.process_policy else {
        return Vec::new();
    };
    [
        non_empty(f::PROCESS_NAME, &p.name),
        non_empty(f::PROCESS_ANCESTOR, &p.ancestor),
        non_empty(f::PROCESS_ARGUMENTS, &p.args),
        non_empty(f::PROCESS_UID, &p.uid),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn convert_host_mount_policy(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields
        .host_mount_policy
        .as_ref()
        .and_then(|p| p.read_only)
        .map(|read_only| single(f::WRITABLE_HOST_MOUNT, !read_only))
        .unwrap_or_default()
}

// Baseline whitelists became the unexpected process field.
fn convert_whitelist_enabled(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields
        .whitelist_enabled
        .map(|b| single(f::UNEXPECTED_PROCESS_EXECUTED, b))
        .unwrap_or_default()
}

fn convert_fixed_by(fields: &PolicyFields) -> Vec<PolicyGroup> {
    non_empty(f::FIXED_BY, &fields.fixed_by).into_iter().collect()
}

fn convert_read_only_root_fs(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields.read_only_root_fs.map(|b| single(f::READ_ONLY_ROOT_FS, b)).unwrap_or_default()
}

fn convert_cvss(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields.cvss.iter().map(|p| numerical(f::CVSS, p)).collect()
}

fn convert_drop_capabilities(fields: &PolicyFields) -> Vec<PolicyGroup> {
    if fields.drop_capabilities.is_empty() {
        return Vec::new();
    }
    vec![group(f::DROP_CAPS, fields.drop_capabilities.clone())]
}

fn convert_add_capabilities(fields: &PolicyFields) -> Vec<PolicyGroup> {
    if fields.add_capabilities.is_empty() {
        return Vec::new();
    }
    vec![group(f::ADD_CAPS, fields.add_capabilities.clone())]
}

fn convert_permission_policy(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields
        .permission_policy
        .as_ref()
        .map(|p| single(f::MINIMUM_RBAC_PERMISSIONS, p.permission_level))
        .unwrap_or_default()
}

fn convert_port_exposure_policy(fields: &PolicyFields) -> Vec<PolicyGroup> {
    fields
        .port_exposure_policy
        .as_ref()
        .map(|p| {
            let levels = p.exposure_levels.iter().map(ToString::to_string).collect();
            vec![group(f::PORT_EXPOSURE, levels)]
        })
        .unwrap_or_default()
}

fn convert_container_resource_policy(fields: &PolicyFields) -> Vec<PolicyGroup> {
    let Some(p) = &fields.container_resource_policy else {
        return Vec::new();
    };
    [
        (f::CONTAINER_CPU_LIMIT, &p.cpu_resource_limit),
        (f::CONTAINER_CPU_REQUEST, &p.cpu_resource_request),
        (f::CONTAINER_MEM_LIMIT, &p.memory_resource_limit),
        (f::CONTAINER_MEM_REQUEST, &p.memory_resource_request),
    ]
    .into_iter()
    .filter_map(|(field_name, policy)| policy.as_ref().map(|p| numerical(field_name, p)))
    .collect()
}
