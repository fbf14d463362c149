//! Whole-stack resolution.
//!
//! [`resolve_stack`] expands a [`StackSpec`] into every resource the stack
//! declares: the private cluster itself, the node service account (existing
//! or managed), the role set for a managed account, the firewall rules the
//! control plane needs, and the resolved node pools.

use std::collections::BTreeMap;

use crate::pool::{resolve_pools, ResolvedNodePool};
use crate::spec::{AuthorizedNetwork, NodePoolSpec, StackSpec};

/// Roles granted to a managed node service account.
///
/// Logging and monitoring writers plus registry pull access; nothing that
/// lets a node mutate project resources.
pub const NODE_SERVICE_ACCOUNT_ROLES: &[&str] = &[
    "roles/logging.logWriter",
    "roles/monitoring.metricWriter",
    "roles/monitoring.viewer",
    "roles/stackdriver.resourceMetadata.writer",
    "roles/artifactregistry.reader",
];

/// Ports the control plane must reach on nodes for admission webhooks.
const MASTER_WEBHOOK_PORTS: &[&str] = &["8443", "9443", "15017"];

/// Name of the pool declared when the spec lists none.
const DEFAULT_POOL_NAME: &str = "default-pool";

/// Cluster settings with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCluster {
    /// Cluster name.
    pub name: String,
    /// GCP project ID.
    pub project: String,
    /// Region or zone.
    pub location: String,
    /// VPC network name.
    pub network: String,
    /// Subnetwork name.
    pub subnetwork: String,
    /// Minimum control-plane version, if pinned.
    pub min_master_version: Option<String>,
    /// Nodes get internal IPs only. Always true; this crate only declares
    /// private clusters.
    pub enable_private_nodes: bool,
    /// Public API endpoint disabled.
    pub enable_private_endpoint: bool,
    /// Peering range for the control plane.
    pub master_ipv4_cidr_block: String,
    /// CIDR allowlist for the API endpoint, in spec order.
    pub master_authorized_networks: Vec<AuthorizedNetwork>,
    /// Secondary range name for pod IPs.
    pub pods_range_name: Option<String>,
    /// Secondary range name for service IPs.
    pub services_range_name: Option<String>,
    /// Cluster labels.
    pub labels: BTreeMap<String, String>,
    /// Network tag carried by every node, used as a firewall target.
    pub node_tag: String,
}

/// The service account cluster nodes run as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeServiceAccount {
    /// Operator-supplied account; declared elsewhere, not managed here.
    Existing {
        /// Account email.
        email: String,
    },
    /// Account declared and role-granted by this stack.
    Managed {
        /// Short account ID, e.g. `"edge-nodes"`.
        account_id: String,
        /// Full account email derived from the ID and project.
        email: String,
    },
}

impl NodeServiceAccount {
    /// The account email, whichever variant holds it.
    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::Existing { email } | Self::Managed { email, .. } => email,
        }
    }
}

/// A single allow entry of a firewall rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallAllow {
    /// IP protocol, e.g. `"tcp"`.
    pub protocol: String,
    /// Port list as strings, matching the Compute API shape.
    pub ports: Vec<String>,
}

/// A VPC firewall rule derived from the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRule {
    /// Rule name.
    pub name: String,
    /// Traffic direction, `"INGRESS"` here.
    pub direction: String,
    /// Source CIDR ranges.
    pub source_ranges: Vec<String>,
    /// Allowed protocol/port entries.
    pub allowed: Vec<FirewallAllow>,
    /// Network tags the rule applies to.
    pub target_tags: Vec<String>,
}

/// Every resource the stack declares, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStack {
    /// The cluster itself.
    pub cluster: ResolvedCluster,
    /// Service account nodes run as.
    pub node_service_account: NodeServiceAccount,
    /// Derived firewall rules.
    pub firewall_rules: Vec<FirewallRule>,
    /// Resolved node pools, in spec order.
    pub pools: Vec<ResolvedNodePool>,
}

impl ResolvedStack {
    /// Roles to grant the node service account. Empty for an existing
    /// account - its grants are not this stack's to manage.
    #[must_use]
    pub fn iam_roles(&self) -> &'static [&'static str] {
        match self.node_service_account {
            NodeServiceAccount::Managed { .. } => NODE_SERVICE_ACCOUNT_ROLES,
            NodeServiceAccount::Existing { .. } => &[],
        }
    }
}

/// Resolve a stack spec into its full set of resource definitions.
///
/// Pure; identifiers and CIDRs are carried through opaquely.
#[must_use]
pub fn resolve_stack(spec: &StackSpec) -> ResolvedStack {
    let node_tag = format!("gke-{}-node", spec.name);

    let node_service_account = match &spec.service_account {
        Some(email) => NodeServiceAccount::Existing {
            email: email.clone(),
        },
        None => {
            let account_id = format!("{}-nodes", spec.name);
            let email = format!("{account_id}@{}.iam.gserviceaccount.com", spec.project);
            NodeServiceAccount::Managed { account_id, email }
        }
    };

    let firewall_rules = vec![webhook_ingress_rule(spec, &node_tag)];

    let pools = if spec.node_pools.is_empty() {
        resolve_pools(&[NodePoolSpec {
            name: DEFAULT_POOL_NAME.to_string(),
            ..NodePoolSpec::default()
        }])
    } else {
        resolve_pools(&spec.node_pools)
    };

    ResolvedStack {
        cluster: ResolvedCluster {
            name: spec.name.clone(),
            project: spec.project.clone(),
            location: spec.location.clone(),
            network: spec.network.clone(),
            subnetwork: spec.subnetwork.clone(),
            min_master_version: spec.min_master_version.clone(),
            enable_private_nodes: true,
            enable_private_endpoint: spec.enable_private_endpoint.unwrap_or(false),
            master_ipv4_cidr_block: spec.master_ipv4_cidr_block.clone(),
            master_authorized_networks: spec.master_authorized_networks.clone(),
            pods_range_name: spec.pods_range_name.clone(),
            services_range_name: spec.services_range_name.clone(),
            labels: spec.labels.clone(),
            node_tag,
        },
        node_service_account,
        firewall_rules,
        pools,
    }
}

/// The control plane reaches admission webhooks over its peering range;
/// private clusters need an explicit allow for anything beyond 443.
fn webhook_ingress_rule(spec: &StackSpec, node_tag: &str) -> FirewallRule {
    FirewallRule {
        name: format!("{}-allow-master-webhooks", spec.name),
        direction: "INGRESS".to_string(),
        source_ranges: vec![spec.master_ipv4_cidr_block.clone()],
        allowed: vec![FirewallAllow {
            protocol: "tcp".to_string(),
            ports: MASTER_WEBHOOK_PORTS.iter().map(ToString::to_string).collect(),
        }],
        target_tags: vec![node_tag.to_string()],
    }
}
