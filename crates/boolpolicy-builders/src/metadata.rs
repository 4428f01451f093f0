//! Registry of known policy fields.
//!
//! Every policy field name maps to the builder that turns its groups into
//! field queries, the shape its values must have, the group options it
//! refuses and the event sources it applies to.

use crate::builders::{
    DropCaps, FieldLabel, MapLabel, MapPredicate, NilCheck, QueryBuilder, ValueMapper,
    Vulnerability, WritableHostMount,
};
use crate::fieldnames as f;
use crate::labels as l;
use crate::policy::EventSource;
use crate::section::ValidationOptions;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

const COMPARATOR_DECIMAL: &str = r"^(<|>|<=|>=)?\s*(\d*\.)?\d+$";
const INTEGER: &str = r"^\d+$";
const BOOLEAN: &str = r"(?i)^(true|false)$";
const STRING: &str = r"(?s)^.*\S.*$";
const KEY_VALUE: &str = r"^[^=]+=.*$";
const DOCKERFILE_LINE: &str = r"^(?i:ADD|ARG|CMD|COPY|ENTRYPOINT|ENV|EXPOSE|FROM|LABEL|MAINTAINER|ONBUILD|RUN|STOPSIGNAL|USER|VOLUME|WORKDIR)?=.*$";
const ENV_VAR: &str =
    r"^(UNSET|RAW|UNKNOWN|SECRET_KEY|CONFIG_MAP_KEY|FIELD|RESOURCE_FIELD)?=[^=]*=.*$";
const ENV_VAR_STRICT: &str =
    r"^(((UNSET|RAW|UNKNOWN)?=[^=]*=.*)|((SECRET_KEY|CONFIG_MAP_KEY|FIELD|RESOURCE_FIELD)=[^=]*=))$";
const CAPABILITIES: &str = "AUDIT_CONTROL|AUDIT_READ|AUDIT_WRITE|BLOCK_SUSPEND|BPF|CHECKPOINT_RESTORE|CHOWN|DAC_OVERRIDE|DAC_READ_SEARCH|FOWNER|FSETID|IPC_LOCK|IPC_OWNER|KILL|LEASE|LINUX_IMMUTABLE|MAC_ADMIN|MAC_OVERRIDE|MKNOD|NET_ADMIN|NET_BIND_SERVICE|NET_BROADCAST|NET_RAW|PERFMON|SETFCAP|SETGID|SETPCAP|SETUID|SYSLOG|SYS_ADMIN|SYS_BOOT|SYS_CHROOT|SYS_MODULE|SYS_NICE|SYS_PACCT|SYS_PTRACE|SYS_RAWIO|SYS_RESOURCE|SYS_TIME|SYS_TTY_CONFIG|WAKE_ALARM";
const RBAC_PERMISSION: &str =
    r"(?i)^(DEFAULT|ELEVATED_IN_NAMESPACE|ELEVATED_CLUSTER_WIDE|CLUSTER_ADMIN)$";
const PORT_EXPOSURE: &str = r"(?i)^(UNSET|EXTERNAL|NODE|HOST|INTERNAL|ROUTE)$";
const MOUNT_PROPAGATION: &str = r"(?i)^(NONE|HOSTTOCONTAINER|BIDIRECTIONAL)$";
const SEVERITY: &str = r"(?i)^(<|>|<=|>=)?\s*(UNKNOWN|LOW|MODERATE|IMPORTANT|CRITICAL)$";
const SECCOMP_PROFILE_TYPE: &str = r"(?i)^(UNCONFINED|RUNTIME_DEFAULT|LOCALHOST)$";
const KUBE_API_VERB: &str = r"(?i)^CREATE$";
const KUBE_RESOURCE: &str = r"(?i)^(PODS_EXEC|PODS_PORTFORWARD)$";
const AUDIT_API_VERB: &str = r"(?i)^(CREATE|DELETE|GET|PATCH|UPDATE)$";
const AUDIT_RESOURCE: &str = r"(?i)^(SECRETS|CONFIGMAPS)$";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("field value pattern is valid")
}

static COMPARATOR_DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| compile(COMPARATOR_DECIMAL));
static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| compile(INTEGER));
static BOOLEAN_RE: LazyLock<Regex> = LazyLock::new(|| compile(BOOLEAN));
static STRING_RE: LazyLock<Regex> = LazyLock::new(|| compile(STRING));
static KEY_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| compile(KEY_VALUE));
static DOCKERFILE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| compile(DOCKERFILE_LINE));
static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| compile(ENV_VAR));
static ENV_VAR_STRICT_RE: LazyLock<Regex> = LazyLock::new(|| compile(ENV_VAR_STRICT));
static ADD_CAPABILITIES_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!("(?i)^({})$", CAPABILITIES)));
static DROP_CAPABILITIES_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!("(?i)^(ALL|{})$", CAPABILITIES)));
static RBAC_PERMISSION_RE: LazyLock<Regex> = LazyLock::new(|| compile(RBAC_PERMISSION));
static PORT_EXPOSURE_RE: LazyLock<Regex> = LazyLock::new(|| compile(PORT_EXPOSURE));
static MOUNT_PROPAGATION_RE: LazyLock<Regex> = LazyLock::new(|| compile(MOUNT_PROPAGATION));
static SEVERITY_RE: LazyLock<Regex> = LazyLock::new(|| compile(SEVERITY));
static SECCOMP_PROFILE_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(SECCOMP_PROFILE_TYPE));
static KUBE_API_VERB_RE: LazyLock<Regex> = LazyLock::new(|| compile(KUBE_API_VERB));
static KUBE_RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| compile(KUBE_RESOURCE));
static AUDIT_API_VERB_RE: LazyLock<Regex> = LazyLock::new(|| compile(AUDIT_API_VERB));
static AUDIT_RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| compile(AUDIT_RESOURCE));

/// The shape a field's values must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A decimal with an optional comparator, like `>= 7.5`.
    ComparatorDecimal,
    Integer,
    Boolean,
    /// Any text with at least one non-whitespace character.
    String,
    /// `key=value` with a non-empty key.
    KeyValue,
    /// `INSTRUCTION=value`, instruction optional.
    DockerfileLine,
    /// `SOURCE=name=value`. Sources that reference other objects may not
    /// carry a value when sources are validated strictly.
    EnvironmentVariable,
    AddCapabilities,
    DropCapabilities,
    RbacPermission,
    PortExposure,
    MountPropagation,
    Severity,
    SeccompProfileType,
    /// Admission control verbs, or audit log verbs when validating for
    /// audit log events.
    KubernetesApiVerb,
    KubernetesResource,
}

impl ValueKind {
    pub fn regex(self, options: &ValidationOptions) -> &'static Regex {
        let audit = options.event_source == EventSource::AuditLogEvent;
        let re: &'static LazyLock<Regex> = match self {
            ValueKind::ComparatorDecimal => &COMPARATOR_DECIMAL_RE,
            ValueKind::Integer => &INTEGER_RE,
            ValueKind::Boolean => &BOOLEAN_RE,
            ValueKind::String => &STRING_RE,
            ValueKind::KeyValue => &KEY_VALUE_RE,
            ValueKind::DockerfileLine => &DOCKERFILE_LINE_RE,
            ValueKind::EnvironmentVariable if options.strict_env_var_sources => {
                &ENV_VAR_STRICT_RE
            }
            ValueKind::EnvironmentVariable => &ENV_VAR_RE,
            ValueKind::AddCapabilities => &ADD_CAPABILITIES_RE,
            ValueKind::DropCapabilities => &DROP_CAPABILITIES_RE,
            ValueKind::RbacPermission => &RBAC_PERMISSION_RE,
            ValueKind::PortExposure => &PORT_EXPOSURE_RE,
            ValueKind::MountPropagation => &MOUNT_PROPAGATION_RE,
            ValueKind::Severity => &SEVERITY_RE,
            ValueKind::SeccompProfileType => &SECCOMP_PROFILE_TYPE_RE,
            ValueKind::KubernetesApiVerb if audit => &AUDIT_API_VERB_RE,
            ValueKind::KubernetesApiVerb => &KUBE_API_VERB_RE,
            ValueKind::KubernetesResource if audit => &AUDIT_RESOURCE_RE,
            ValueKind::KubernetesResource => &KUBE_RESOURCE_RE,
        };
        re
    }

    pub fn accepts(self, value: &str, options: &ValidationOptions) -> bool {
        self.regex(options).is_match(value)
    }
}

/// Everything known about one policy field.
pub struct FieldMetadata {
    pub builder: Box<dyn QueryBuilder>,
    pub value_kind: ValueKind,
    pub negation_forbidden: bool,
    pub operators_forbidden: bool,
    pub event_sources: &'static [EventSource],
}

impl FieldMetadata {
    pub fn is_applicable_to(&self, source: EventSource) -> bool {
        self.event_sources.contains(&source)
    }
}

impl std::fmt::Debug for FieldMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldMetadata")
            .field("value_kind", &self.value_kind)
            .field("negation_forbidden", &self.negation_forbidden)
            .field("operators_forbidden", &self.operators_forbidden)
            .field("event_sources", &self.event_sources)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy)]
enum Restriction {
    None,
    Negation,
    Operators,
    Both,
}

/// Deploy-time fields, also usable outside any event.
const LIFECYCLE: &[EventSource] = &[EventSource::NotApplicable, EventSource::DeploymentEvent];
const RUNTIME: &[EventSource] = &[EventSource::DeploymentEvent];
const RUNTIME_AND_AUDIT: &[EventSource] = &[EventSource::DeploymentEvent, EventSource::AuditLogEvent];

/// Registrations pick up whatever `sources` is set to at the time.
struct Registry {
    fields: HashMap<&'static str, FieldMetadata>,
    sources: &'static [EventSource],
}

impl Registry {
    fn register(
        &mut self,
        name: &'static str,
        builder: impl QueryBuilder + 'static,
        value_kind: ValueKind,
        restriction: Restriction,
    ) {
        let (negation_forbidden, operators_forbidden) = match restriction {
            Restriction::None => (false, false),
            Restriction::Negation => (true, false),
            Restriction::Operators => (false, true),
            Restriction::Both => (true, true),
        };
        self.fields.insert(
            name,
            FieldMetadata {
                builder: Box::new(builder),
                value_kind,
                negation_forbidden,
                operators_forbidden,
                event_sources: self.sources,
            },
        );
    }

    fn label(
        &mut self,
        name: &'static str,
        label: &'static str,
        mapper: ValueMapper,
        value_kind: ValueKind,
        restriction: Restriction,
    ) {
        self.register(name, FieldLabel::new(label, mapper), value_kind, restriction);
    }
}

static REGISTRY: LazyLock<HashMap<&'static str, FieldMetadata>> = LazyLock::new(build_registry);

fn build_registry() -> HashMap<&'static str, FieldMetadata> {
    use Restriction::{Both, Negation, Operators};
    use ValueKind as K;
    use ValueMapper::{Days, Exact, Identity, Rbac, Upper};

    let regex = ValueMapper::Regex;
    let none = Restriction::None;
    let mut r = Registry {
        fields: HashMap::new(),
        sources: LIFECYCLE,
    };

    r.label(f::ADD_CAPS, l::ADD_CAPABILITIES, Exact, K::AddCapabilities, Negation);
    r.label(f::APP_ARMOR_PROFILE, l::APP_ARMOR_PROFILE, regex, K::String, none);
    r.register(
        f::CVE,
        Vulnerability { field: FieldLabel::new(l::CVE, regex) },
        K::String,
        none,
    );
    r.register(
        f::CVSS,
        Vulnerability { field: FieldLabel::new(l::CVSS, Identity) },
        K::ComparatorDecimal,
        Negation,
    );
    r.label(f::CONTAINER_CPU_LIMIT, l::CPU_CORES_LIMIT, Identity, K::ComparatorDecimal, Negation);
    r.label(f::CONTAINER_CPU_REQUEST, l::CPU_CORES_REQUEST, Identity, K::ComparatorDecimal, Negation);
    r.label(f::CONTAINER_MEM_LIMIT, l::MEMORY_LIMIT, Identity, K::ComparatorDecimal, Negation);
    r.label(f::CONTAINER_MEM_REQUEST, l::MEMORY_REQUEST, Identity, K::ComparatorDecimal, Negation);
    r.label(f::CONTAINER_NAME, l::CONTAINER_NAME, regex, K::String, none);
    r.register(
        f::DISALLOWED_ANNOTATION,
        MapLabel::new(l::ANNOTATION, MapPredicate::ShouldContain),
        K::KeyValue,
        Negation,
    );
    r.register(
        f::DISALLOWED_IMAGE_LABEL,
        MapLabel::new(l::IMAGE_LABEL, MapPredicate::ShouldContain),
        K::KeyValue,
        Negation,
    );
    r.label(f::DOCKERFILE_LINE, l::DOCKERFILE_LINE, ValueMapper::Compound(2), K::DockerfileLine, Negation);
    r.register(
        f::DROP_CAPS,
        DropCaps { label: l::DROP_CAPABILITIES },
        K::DropCapabilities,
        Negation,
    );
    r.label(
        f::ENVIRONMENT_VARIABLE,
        l::ENVIRONMENT_VARIABLE,
        ValueMapper::Compound(3),
        K::EnvironmentVariable,
        Negation,
    );
    r.register(
        f::FIXED_BY,
        Vulnerability { field: FieldLabel::new(l::FIXED_BY, regex) },
        K::String,
        none,
    );
    r.label(f::HOST_IPC, l::HOST_IPC, Identity, K::Boolean, Both);
    r.label(f::HOST_NETWORK, l::HOST_NETWORK, Identity, K::Boolean, Both);
    r.label(f::HOST_PID, l::HOST_PID, Identity, K::Boolean, Both);
    r.label(f::IMAGE_AGE, l::IMAGE_CREATED_TIME, Days, K::Integer, Both);
    r.label(f::IMAGE_COMPONENT, l::COMPONENT_AND_VERSION, ValueMapper::Compound(2), K::KeyValue, Negation);
    r.label(f::IMAGE_OS, l::IMAGE_OS, Identity, K::String, none);
    r.label(f::IMAGE_REGISTRY, l::IMAGE_REGISTRY, regex, K::String, none);
    r.label(f::IMAGE_REMOTE, l::IMAGE_REMOTE, regex, K::String, none);
    r.label(f::IMAGE_SCAN_AGE, l::IMAGE_SCAN_TIME, Days, K::Integer, Both);
    r.label(f::IMAGE_TAG, l::IMAGE_TAG, regex, K::String, none);
    r.label(f::IMAGE_USER, l::IMAGE_USER, regex, K::String, none);
    r.label(
        f::MINIMUM_RBAC_PERMISSIONS,
        l::SERVICE_ACCOUNT_PERMISSION_LEVEL,
        Rbac,
        K::RbacPermission,
        Operators,
    );
    r.label(f::MOUNT_PROPAGATION, l::MOUNT_PROPAGATION, Identity, K::MountPropagation, none);
    r.label(f::NAMESPACE, l::NAMESPACE, regex, K::String, none);
    r.label(f::EXPOSED_NODE_PORT, l::EXPOSED_NODE_PORT, Identity, K::ComparatorDecimal, none);
    r.label(f::EXPOSED_PORT, l::PORT, Identity, K::ComparatorDecimal, none);
    r.label(f::EXPOSED_PORT_PROTOCOL, l::PORT_PROTOCOL, Upper, K::String, none);
    r.label(f::PORT_EXPOSURE, l::EXPOSURE_LEVEL, Identity, K::PortExposure, none);
    r.label(f::PRIVILEGED_CONTAINER, l::PRIVILEGED, Identity, K::Boolean, Both);
    r.label(f::READ_ONLY_ROOT_FS, l::READ_ONLY_ROOT_FILESYSTEM, Identity, K::Boolean, Both);
    r.register(
        f::REQUIRED_ANNOTATION,
        MapLabel::new(l::ANNOTATION, MapPredicate::ShouldNotContain),
        K::KeyValue,
        Negation,
    );
    r.register(
        f::REQUIRED_IMAGE_LABEL,
        MapLabel::new(l::IMAGE_LABEL, MapPredicate::ShouldNotContain),
        K::KeyValue,
        Negation,
    );
    r.register(
        f::REQUIRED_LABEL,
        MapLabel::new(l::LABEL, MapPredicate::ShouldNotContain),
        K::KeyValue,
        Negation,
    );
    r.label(f::SECCOMP_PROFILE_TYPE, l::SECCOMP_PROFILE_TYPE, Identity, K::SeccompProfileType, Operators);
    r.label(f::SERVICE_ACCOUNT, l::SERVICE_ACCOUNT_NAME, regex, K::String, none);
    r.register(
        f::SEVERITY,
        Vulnerability { field: FieldLabel::new(l::SEVERITY, Upper) },
        K::Severity,
        Negation,
    );
    r.register(f::UNSCANNED_IMAGE, NilCheck { label: l::IMAGE_SCAN }, K::Boolean, Both);
    r.label(f::VOLUME_DESTINATION, l::VOLUME_DESTINATION, regex, K::String, none);
    r.label(f::VOLUME_NAME, l::VOLUME_NAME, regex, K::String, none);
    r.label(f::VOLUME_SOURCE, l::VOLUME_SOURCE, regex, K::String, none);
    r.label(f::VOLUME_TYPE, l::VOLUME_TYPE, regex, K::String, none);
    r.register(f::WRITABLE_HOST_MOUNT, WritableHostMount, K::Boolean, Both);
    r.label(
        f::WRITABLE_MOUNTED_VOLUME,
        l::VOLUME_READ_ONLY,
        ValueMapper::Boolean { invert: true },
        K::Boolean,
        Both,
    );

    r.sources = RUNTIME;
    r.label(f::PROCESS_ANCESTOR, l::PROCESS_ANCESTOR, regex, K::String, none);
    r.label(f::PROCESS_ARGUMENTS, l::PROCESS_ARGUMENTS, regex, K::String, none);
    r.label(f::PROCESS_NAME, l::PROCESS_NAME, regex, K::String, none);
    r.label(f::PROCESS_UID, l::PROCESS_UID, Identity, K::String, none);
    r.label(
        f::UNEXPECTED_NETWORK_FLOW_DETECTED,
        l::NOT_IN_NETWORK_BASELINE,
        Identity,
        K::Boolean,
        Both,
    );
    r.label(
        f::UNEXPECTED_PROCESS_EXECUTED,
        l::NOT_IN_PROCESS_BASELINE,
        Identity,
        K::Boolean,
        Both,
    );

    r.sources = RUNTIME_AND_AUDIT;
    r.label(f::KUBE_API_VERB, l::KUBERNETES_API_VERB, Identity, K::KubernetesApiVerb, Negation);
    r.label(f::KUBE_RESOURCE, l::KUBERNETES_RESOURCE, Identity, K::KubernetesResource, Negation);

    r.fields
}

/// Metadata for a policy field, if it is known.
pub fn field_metadata(field_name: &str) -> Option<&'static FieldMetadata> {
    REGISTRY.get(field_name)
}

/// Names of every known policy field, sorted.
pub fn known_fields() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}
