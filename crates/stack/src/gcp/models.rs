//! GCP API request and response models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Container API - write side
// ============================================================================

/// Create cluster request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterBody {
    /// Cluster definition.
    pub cluster: ClusterDefinition,
}

/// Cluster definition for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDefinition {
    /// Cluster name.
    pub name: String,
    /// Initial Kubernetes version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_cluster_version: Option<String>,
    /// Network name.
    pub network: String,
    /// Subnetwork name.
    pub subnetwork: String,
    /// Node pools.
    pub node_pools: Vec<NodePoolDefinition>,
    /// Private cluster settings.
    pub private_cluster_config: PrivateClusterConfigDefinition,
    /// API endpoint CIDR allowlist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_authorized_networks_config: Option<MasterAuthorizedNetworksDefinition>,
    /// VPC-native IP allocation.
    pub ip_allocation_policy: IpAllocationPolicyDefinition,
    /// Cluster labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_labels: Option<BTreeMap<String, String>>,
}

/// Node pool definition for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolDefinition {
    /// Node pool name.
    pub name: String,
    /// Node count the pool starts with.
    pub initial_node_count: i32,
    /// Node config.
    pub config: NodeConfigDefinition,
    /// Autoscaling. Absent means a fixed-size pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling: Option<NodePoolAutoscalingDefinition>,
}

/// Node config for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfigDefinition {
    /// Machine type.
    pub machine_type: String,
    /// Disk size in GB.
    pub disk_size_gb: i32,
    /// Disk type.
    pub disk_type: String,
    /// Image type.
    pub image_type: String,
    /// Preemptible VMs.
    pub preemptible: bool,
    /// Service account nodes run as.
    pub service_account: String,
    /// OAuth scopes granted to nodes.
    pub oauth_scopes: Vec<String>,
    /// Network tags.
    pub tags: Vec<String>,
    /// Accelerator attachments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub accelerators: Vec<AcceleratorConfigDefinition>,
}

/// Accelerator attachment for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorConfigDefinition {
    /// Accelerator type.
    pub accelerator_type: String,
    /// Accelerators per node.
    pub accelerator_count: i64,
}

/// Autoscaling definition for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolAutoscalingDefinition {
    /// Enabled.
    pub enabled: bool,
    /// Min node count.
    pub min_node_count: i32,
    /// Max node count.
    pub max_node_count: i32,
}

/// Private cluster settings for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateClusterConfigDefinition {
    /// Nodes get internal IPs only.
    pub enable_private_nodes: bool,
    /// Public API endpoint disabled.
    pub enable_private_endpoint: bool,
    /// Peering range for the control plane.
    pub master_ipv4_cidr_block: String,
}

/// API endpoint CIDR allowlist for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterAuthorizedNetworksDefinition {
    /// Enabled.
    pub enabled: bool,
    /// Allowed CIDR blocks.
    pub cidr_blocks: Vec<CidrBlockDefinition>,
}

/// A single allowlisted CIDR block.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CidrBlockDefinition {
    /// CIDR in slash notation.
    pub cidr_block: String,
    /// Console label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// VPC-native IP allocation for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAllocationPolicyDefinition {
    /// Use alias IPs.
    pub use_ip_aliases: bool,
    /// Secondary range for pods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_secondary_range_name: Option<String>,
    /// Secondary range for services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services_secondary_range_name: Option<String>,
}

// ============================================================================
// Container API - read side
// ============================================================================

/// GKE cluster information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GkeCluster {
    /// Cluster name.
    pub name: String,
    /// Cluster self link.
    pub self_link: Option<String>,
    /// Zone/location.
    pub location: String,
    /// Cluster status.
    pub status: String,
    /// Kubernetes master version.
    pub current_master_version: Option<String>,
    /// API server endpoint.
    pub endpoint: Option<String>,
    /// Node pools.
    #[serde(default)]
    pub node_pools: Vec<NodePool>,
    /// Create time.
    pub create_time: Option<String>,
    /// Current node count (total across all pools).
    pub current_node_count: Option<i32>,
}

/// GKE node pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    /// Node pool name.
    pub name: String,
    /// Node pool status.
    pub status: Option<String>,
    /// Node config.
    pub config: Option<NodeConfig>,
    /// Initial node count.
    pub initial_node_count: Option<i32>,
    /// Autoscaling config.
    pub autoscaling: Option<NodePoolAutoscaling>,
}

/// Node configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    /// Machine type.
    pub machine_type: String,
    /// Disk size in GB.
    pub disk_size_gb: Option<i32>,
    /// Disk type.
    pub disk_type: Option<String>,
    /// Image type.
    pub image_type: Option<String>,
    /// Service account.
    pub service_account: Option<String>,
}

/// Node pool autoscaling.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolAutoscaling {
    /// Enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Min node count.
    pub min_node_count: Option<i32>,
    /// Max node count.
    pub max_node_count: Option<i32>,
}

impl GkeCluster {
    /// Creation time, when the API reported one that parses.
    #[must_use]
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.create_time
            .as_ref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc))
    }
}

/// Cluster list response.
#[derive(Debug, Deserialize)]
pub struct ClusterListResponse {
    /// List of clusters.
    #[serde(default)]
    pub clusters: Vec<GkeCluster>,
}

/// GCP operation (async task).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation name.
    pub name: String,
    /// Status.
    pub status: String,
    /// Target link.
    pub target_link: Option<String>,
    /// Operation type.
    pub operation_type: Option<String>,
    /// Error.
    pub error: Option<OperationError>,
}

/// Operation error.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    /// Errors.
    #[serde(default)]
    pub errors: Vec<OperationErrorDetail>,
}

/// Operation error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationErrorDetail {
    /// Error code.
    pub code: Option<String>,
    /// Error message.
    pub message: Option<String>,
}

// ============================================================================
// Compute API - firewall types
// ============================================================================

/// Firewall rule for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallDefinition {
    /// Rule name.
    pub name: String,
    /// Network URL.
    pub network: String,
    /// Traffic direction.
    pub direction: String,
    /// Source CIDR ranges.
    pub source_ranges: Vec<String>,
    /// Allowed protocol/port entries.
    pub allowed: Vec<FirewallAllowedDefinition>,
    /// Network tags the rule applies to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target_tags: Vec<String>,
}

/// A single allow entry for creation.
#[derive(Debug, Serialize)]
pub struct FirewallAllowedDefinition {
    /// IP protocol.
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    /// Port list.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
}

/// Firewall rule as read back from the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Firewall {
    /// Rule name.
    pub name: String,
    /// Self link.
    pub self_link: Option<String>,
    /// Source CIDR ranges.
    #[serde(default)]
    pub source_ranges: Vec<String>,
    /// Target tags.
    #[serde(default)]
    pub target_tags: Vec<String>,
}

// ============================================================================
// IAM types
// ============================================================================

/// Create service account request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceAccountBody {
    /// Short account ID (the part before `@`).
    pub account_id: String,
    /// Account fields.
    pub service_account: ServiceAccountDefinition,
}

/// Service account fields for creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountDefinition {
    /// Console display name.
    pub display_name: String,
}

/// Service account as read back from the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    /// Full resource name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Console display name.
    pub display_name: Option<String>,
    /// Numeric unique ID.
    pub unique_id: Option<String>,
}

/// Project IAM policy. Read, modified, and written back whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Role bindings.
    #[serde(default)]
    pub bindings: Vec<Binding>,
    /// Concurrency control tag; echoed back on write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Policy format version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

/// A role and its members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    /// Role name, e.g. `"roles/logging.logWriter"`.
    pub role: String,
    /// Members, e.g. `"serviceAccount:<email>"`.
    #[serde(default)]
    pub members: Vec<String>,
}

/// Set IAM policy request.
#[derive(Debug, Serialize)]
pub struct SetIamPolicyBody {
    /// The policy to install.
    pub policy: Policy,
}
