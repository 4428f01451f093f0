//! Field labels emitted into field queries. These are what a schema resolver
//! maps onto paths through the candidate object.

pub const ADD_CAPABILITIES: &str = "Add Capabilities";
pub const ANNOTATION: &str = "Annotation";
pub const APP_ARMOR_PROFILE: &str = "AppArmor Profile";
pub const COMPONENT_AND_VERSION: &str = "Component And Version";
pub const CONTAINER_NAME: &str = "Container Name";
pub const CPU_CORES_LIMIT: &str = "CPU Cores Limit";
pub const CPU_CORES_REQUEST: &str = "CPU Cores Request";
pub const CVE: &str = "CVE";
pub const CVE_SUPPRESSED: &str = "CVE Suppressed";
pub const CVSS: &str = "CVSS";
pub const DOCKERFILE_LINE: &str = "Dockerfile Line";
pub const DROP_CAPABILITIES: &str = "Drop Capabilities";
pub const ENVIRONMENT_VARIABLE: &str = "Environment Variable";
pub const EXPOSED_NODE_PORT: &str = "Exposed Node Port";
pub const EXPOSURE_LEVEL: &str = "Exposure Level";
pub const FIXED_BY: &str = "Fixed By";
pub const HOST_IPC: &str = "Host IPC";
pub const HOST_NETWORK: &str = "Host Network";
pub const HOST_PID: &str = "Host PID";
pub const IMAGE_CREATED_TIME: &str = "Image Created Time";
pub const IMAGE_LABEL: &str = "Image Label";
pub const IMAGE_OS: &str = "Image OS";
pub const IMAGE_REGISTRY: &str = "Image Registry";
pub const IMAGE_REMOTE: &str = "Image Remote";
pub const IMAGE_SCAN: &str = "Image Scan";
pub const IMAGE_SCAN_TIME: &str = "Image Scan Time";
pub const IMAGE_TAG: &str = "Image Tag";
pub const IMAGE_USER: &str = "Image User";
pub const KUBERNETES_API_VERB: &str = "Kubernetes API Verb";
pub const KUBERNETES_RESOURCE: &str = "Kubernetes Resource";
pub const LABEL: &str = "Label";
pub const MEMORY_LIMIT: &str = "Memory Limit (MB)";
pub const MEMORY_REQUEST: &str = "Memory Request (MB)";
pub const MOUNT_PROPAGATION: &str = "Mount Propagation";
pub const NAMESPACE: &str = "Namespace";
pub const NOT_IN_NETWORK_BASELINE: &str = "Not In Network Baseline";
pub const NOT_IN_PROCESS_BASELINE: &str = "Not In Process Baseline";
pub const PORT: &str = "Port";
pub const PORT_PROTOCOL: &str = "Port Protocol";
pub const PRIVILEGED: &str = "Privileged";
pub const PROCESS_ANCESTOR: &str = "Process Ancestor";
pub const PROCESS_ARGUMENTS: &str = "Process Arguments";
pub const PROCESS_NAME: &str = "Process Name";
pub const PROCESS_UID: &str = "Process UID";
pub const READ_ONLY_ROOT_FILESYSTEM: &str = "Read Only Root Filesystem";
pub const SECCOMP_PROFILE_TYPE: &str = "Seccomp Profile Type";
pub const SERVICE_ACCOUNT_NAME: &str = "Service Account";
pub const SERVICE_ACCOUNT_PERMISSION_LEVEL: &str = "Service Account Permission Level";
pub const SEVERITY: &str = "Severity";
pub const VOLUME_DESTINATION: &str = "Volume Destination";
pub const VOLUME_NAME: &str = "Volume Name";
pub const VOLUME_READ_ONLY: &str = "Volume ReadOnly";
pub const VOLUME_SOURCE: &str = "Volume Source";
pub const VOLUME_TYPE: &str = "Volume Type";

/// Value of a nil/absence check.
pub const NULL_MARKER: &str = "-";

/// Separator between the parts of a compound value.
pub const COMPOUND_SEPARATOR: &str = "\t";

/// Volume type of host path mounts.
pub const HOST_PATH_VOLUME_TYPE: &str = "HostPath";
