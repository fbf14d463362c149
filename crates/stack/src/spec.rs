//! User-facing stack specification.
//!
//! A [`StackSpec`] is the short description an operator writes in TOML.
//! Every optional field is a true `Option`; defaults are applied later by
//! [`crate::stack::resolve_stack`], never during deserialization, so a spec
//! round-trips without gaining fields it did not declare.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::StackError;

/// A CIDR block allowed to reach the cluster's API endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorizedNetwork {
    /// CIDR in slash notation, e.g. `"203.0.113.0/24"`. Opaque here.
    pub cidr_block: String,
    /// Human-readable label shown in the cloud console.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Partially-specified node pool, as written by the operator.
///
/// Only `name` is required. Absent fields take the defaults documented on
/// [`crate::pool::resolve_pools`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodePoolSpec {
    /// Pool name, unique within the cluster.
    pub name: String,
    /// Node OS image type.
    #[serde(default)]
    pub image_type: Option<String>,
    /// Compute Engine machine type.
    #[serde(default)]
    pub machine_type: Option<String>,
    /// Boot disk size in GB.
    #[serde(default)]
    pub disk_size_gb: Option<i32>,
    /// Boot disk type.
    #[serde(default)]
    pub disk_type: Option<String>,
    /// Use preemptible VMs.
    #[serde(default)]
    pub preemptible: Option<bool>,
    /// Accelerator (GPU/TPU) type to attach.
    #[serde(default)]
    pub accelerator_type: Option<String>,
    /// Accelerators per node. A count of zero attaches nothing, even when
    /// `accelerator_type` is set.
    #[serde(default)]
    pub accelerator_count: Option<i32>,
    /// Delegate node counts to the cluster autoscaler.
    #[serde(default)]
    pub autoscaling: Option<bool>,
    /// Autoscaler lower bound.
    #[serde(default)]
    pub min_count: Option<i32>,
    /// Autoscaler upper bound.
    #[serde(default)]
    pub max_count: Option<i32>,
    /// Node count the pool starts with. Falls back to `min_count`.
    #[serde(default)]
    pub initial_node_count: Option<i32>,
}

/// The full stack description loaded from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackSpec {
    /// Cluster name.
    pub name: String,
    /// GCP project ID.
    pub project: String,
    /// Region or zone, e.g. `"us-central1"` or `"us-central1-a"`.
    pub location: String,
    /// VPC network name.
    pub network: String,
    /// Subnetwork name.
    pub subnetwork: String,
    /// Minimum control-plane Kubernetes version.
    #[serde(default)]
    pub min_master_version: Option<String>,
    /// RFC 1918 /28 block for the peered control plane.
    pub master_ipv4_cidr_block: String,
    /// Disable the public API endpoint entirely.
    #[serde(default)]
    pub enable_private_endpoint: Option<bool>,
    /// CIDR allowlist for the API endpoint.
    #[serde(default)]
    pub master_authorized_networks: Vec<AuthorizedNetwork>,
    /// Secondary range name for pod IPs (VPC-native).
    #[serde(default)]
    pub pods_range_name: Option<String>,
    /// Secondary range name for service IPs (VPC-native).
    #[serde(default)]
    pub services_range_name: Option<String>,
    /// Existing service account email for nodes. When absent, a dedicated
    /// account is declared and granted the node role set.
    #[serde(default)]
    pub service_account: Option<String>,
    /// Labels applied to the cluster.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Node pools. An empty list resolves to a single default pool.
    #[serde(default)]
    pub node_pools: Vec<NodePoolSpec>,
}

impl StackSpec {
    /// Load a stack spec from a TOML file.
    ///
    /// # Errors
    /// Returns [`StackError::Config`] if the file cannot be read or does
    /// not parse as a stack spec.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StackError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| StackError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Parse a stack spec from a TOML string.
    ///
    /// # Errors
    /// Returns [`StackError::Config`] if the input does not parse.
    pub fn from_toml_str(raw: &str) -> Result<Self, StackError> {
        toml::from_str(raw).map_err(|e| StackError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        name = "edge"
        project = "acme-prod"
        location = "us-central1"
        network = "acme-vpc"
        subnetwork = "acme-gke"
        master_ipv4_cidr_block = "172.16.0.16/28"
    "#;

    #[test]
    fn test_minimal_spec_parses() {
        let spec = StackSpec::from_toml_str(MINIMAL).unwrap();
        assert_eq!(spec.name, "edge");
        assert_eq!(spec.project, "acme-prod");
        assert!(spec.min_master_version.is_none());
        assert!(spec.enable_private_endpoint.is_none());
        assert!(spec.master_authorized_networks.is_empty());
        assert!(spec.node_pools.is_empty());
        assert!(spec.labels.is_empty());
    }

    #[test]
    fn test_partial_pool_fields_stay_absent() {
        let raw = format!(
            "{MINIMAL}\n[[node_pools]]\nname = \"workers\"\nmachine_type = \"n1-standard-4\"\n"
        );
        let spec = StackSpec::from_toml_str(&raw).unwrap();
        let pool = &spec.node_pools[0];
        assert_eq!(pool.name, "workers");
        assert_eq!(pool.machine_type.as_deref(), Some("n1-standard-4"));
        assert!(pool.image_type.is_none());
        assert!(pool.disk_size_gb.is_none());
        assert!(pool.autoscaling.is_none());
        assert!(pool.initial_node_count.is_none());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let raw = format!("{MINIMAL}\nmaster_cidr = \"10.0.0.0/28\"\n");
        let err = StackSpec::from_toml_str(&raw).unwrap_err();
        assert!(matches!(err, StackError::Config(_)));
    }

    #[test]
    fn test_authorized_networks_parse_in_order() {
        let raw = format!(
            r#"{MINIMAL}
            [[master_authorized_networks]]
            cidr_block = "203.0.113.0/24"
            display_name = "office"

            [[master_authorized_networks]]
            cidr_block = "198.51.100.7/32"
            "#
        );
        let spec = StackSpec::from_toml_str(&raw).unwrap();
        assert_eq!(spec.master_authorized_networks.len(), 2);
        assert_eq!(
            spec.master_authorized_networks[0].display_name.as_deref(),
            Some("office")
        );
        assert_eq!(
            spec.master_authorized_networks[1].cidr_block,
            "198.51.100.7/32"
        );
        assert!(spec.master_authorized_networks[1].display_name.is_none());
    }
}
