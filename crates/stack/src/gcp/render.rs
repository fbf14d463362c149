//! Rendering resolved stacks as API request bodies.
//!
//! Pure functions from the resolved model to the wire types in
//! [`super::models`]. Keeping this separate from the client lets `plan`
//! print exactly what `apply` would submit.

use crate::gcp::models::{
    AcceleratorConfigDefinition, CidrBlockDefinition, ClusterDefinition, CreateClusterBody,
    CreateServiceAccountBody, FirewallAllowedDefinition, FirewallDefinition,
    IpAllocationPolicyDefinition, MasterAuthorizedNetworksDefinition, NodeConfigDefinition,
    NodePoolAutoscalingDefinition, NodePoolDefinition, PrivateClusterConfigDefinition,
    ServiceAccountDefinition,
};
use crate::pool::{NodeCountPolicy, ResolvedNodePool};
use crate::stack::{FirewallRule, NodeServiceAccount, ResolvedStack};

/// OAuth scope granted to nodes. Broad by design of the platform; the
/// service account's IAM roles do the narrowing.
const NODE_OAUTH_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Build the Container API create-cluster body.
#[must_use]
pub fn cluster_body(stack: &ResolvedStack) -> CreateClusterBody {
    let cluster = &stack.cluster;

    let master_authorized_networks_config = if cluster.master_authorized_networks.is_empty() {
        None
    } else {
        Some(MasterAuthorizedNetworksDefinition {
            enabled: true,
            cidr_blocks: cluster
                .master_authorized_networks
                .iter()
                .map(|net| CidrBlockDefinition {
                    cidr_block: net.cidr_block.clone(),
                    display_name: net.display_name.clone(),
                })
                .collect(),
        })
    };

    CreateClusterBody {
        cluster: ClusterDefinition {
            name: cluster.name.clone(),
            initial_cluster_version: cluster.min_master_version.clone(),
            network: cluster.network.clone(),
            subnetwork: cluster.subnetwork.clone(),
            node_pools: stack
                .pools
                .iter()
                .map(|pool| node_pool_definition(pool, stack))
                .collect(),
            private_cluster_config: PrivateClusterConfigDefinition {
                enable_private_nodes: cluster.enable_private_nodes,
                enable_private_endpoint: cluster.enable_private_endpoint,
                master_ipv4_cidr_block: cluster.master_ipv4_cidr_block.clone(),
            },
            master_authorized_networks_config,
            ip_allocation_policy: IpAllocationPolicyDefinition {
                use_ip_aliases: true,
                cluster_secondary_range_name: cluster.pods_range_name.clone(),
                services_secondary_range_name: cluster.services_range_name.clone(),
            },
            resource_labels: if cluster.labels.is_empty() {
                None
            } else {
                Some(cluster.labels.clone())
            },
        },
    }
}

fn node_pool_definition(pool: &ResolvedNodePool, stack: &ResolvedStack) -> NodePoolDefinition {
    let (initial_node_count, autoscaling) = match pool.count_policy {
        NodeCountPolicy::Fixed { node_count } => (node_count, None),
        NodeCountPolicy::Autoscaled {
            min_node_count,
            max_node_count,
        } => (
            pool.initial_node_count,
            Some(NodePoolAutoscalingDefinition {
                enabled: true,
                min_node_count,
                max_node_count,
            }),
        ),
    };

    NodePoolDefinition {
        name: pool.name.clone(),
        initial_node_count,
        config: NodeConfigDefinition {
            machine_type: pool.machine_type.clone(),
            disk_size_gb: pool.disk_size_gb,
            disk_type: pool.disk_type.clone(),
            image_type: pool.image_type.clone(),
            preemptible: pool.preemptible,
            service_account: stack.node_service_account.email().to_string(),
            oauth_scopes: vec![NODE_OAUTH_SCOPE.to_string()],
            tags: vec![stack.cluster.node_tag.clone()],
            accelerators: pool
                .guest_accelerators
                .iter()
                .map(|acc| AcceleratorConfigDefinition {
                    accelerator_type: acc.accelerator_type.clone(),
                    accelerator_count: i64::from(acc.count),
                })
                .collect(),
        },
        autoscaling,
    }
}

/// Build the Compute API firewall body for a derived rule.
#[must_use]
pub fn firewall_definition(rule: &FirewallRule, stack: &ResolvedStack) -> FirewallDefinition {
    FirewallDefinition {
        name: rule.name.clone(),
        network: format!(
            "projects/{}/global/networks/{}",
            stack.cluster.project, stack.cluster.network
        ),
        direction: rule.direction.clone(),
        source_ranges: rule.source_ranges.clone(),
        allowed: rule
            .allowed
            .iter()
            .map(|allow| FirewallAllowedDefinition {
                ip_protocol: allow.protocol.clone(),
                ports: allow.ports.clone(),
            })
            .collect(),
        target_tags: rule.target_tags.clone(),
    }
}

/// Build the IAM create-service-account body. `None` when the stack uses
/// an existing account.
#[must_use]
pub fn service_account_body(stack: &ResolvedStack) -> Option<CreateServiceAccountBody> {
    match &stack.node_service_account {
        NodeServiceAccount::Existing { .. } => None,
        NodeServiceAccount::Managed { account_id, .. } => Some(CreateServiceAccountBody {
            account_id: account_id.clone(),
            service_account: ServiceAccountDefinition {
                display_name: format!("GKE nodes for {}", stack.cluster.name),
            },
        }),
    }
}

/// IAM member string for a service account.
#[must_use]
pub fn iam_member(email: &str) -> String {
    format!("serviceAccount:{email}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{NodePoolSpec, StackSpec};
    use crate::stack::resolve_stack;

    fn stack_with_pools(pools: &str) -> ResolvedStack {
        let raw = format!(
            r#"
            name = "edge"
            project = "acme-prod"
            location = "us-central1"
            network = "acme-vpc"
            subnetwork = "acme-gke"
            master_ipv4_cidr_block = "172.16.0.16/28"
            {pools}
            "#
        );
        resolve_stack(&StackSpec::from_toml_str(&raw).unwrap())
    }

    #[test]
    fn test_fixed_pool_renders_without_autoscaling() {
        let stack = stack_with_pools(
            "[[node_pools]]\nname = \"batch\"\nautoscaling = false\nmin_count = 4\n",
        );
        let body = serde_json::to_value(cluster_body(&stack)).unwrap();
        let pool = &body["cluster"]["nodePools"][0];
        assert_eq!(pool["initialNodeCount"], 4);
        assert!(pool.get("autoscaling").is_none());
    }

    #[test]
    fn test_autoscaled_pool_renders_bounds_and_initial() {
        let stack = stack_with_pools(
            "[[node_pools]]\nname = \"workers\"\nmin_count = 2\nmax_count = 9\ninitial_node_count = 5\n",
        );
        let body = serde_json::to_value(cluster_body(&stack)).unwrap();
        let pool = &body["cluster"]["nodePools"][0];
        assert_eq!(pool["initialNodeCount"], 5);
        assert_eq!(pool["autoscaling"]["enabled"], true);
        assert_eq!(pool["autoscaling"]["minNodeCount"], 2);
        assert_eq!(pool["autoscaling"]["maxNodeCount"], 9);
    }

    #[test]
    fn test_empty_accelerator_list_is_omitted() {
        let stack = stack_with_pools("");
        let body = serde_json::to_value(cluster_body(&stack)).unwrap();
        let config = &body["cluster"]["nodePools"][0]["config"];
        assert!(config.get("accelerators").is_none());
        assert_eq!(config["imageType"], "COS_CONTAINERD");
        assert_eq!(
            config["serviceAccount"],
            "edge-nodes@acme-prod.iam.gserviceaccount.com"
        );
        assert_eq!(config["tags"][0], "gke-edge-node");
    }

    #[test]
    fn test_accelerators_render_as_singleton() {
        let stack = stack_with_pools(
            "[[node_pools]]\nname = \"gpus\"\naccelerator_type = \"nvidia-tesla-t4\"\naccelerator_count = 2\n",
        );
        let body = serde_json::to_value(cluster_body(&stack)).unwrap();
        let accs = &body["cluster"]["nodePools"][0]["config"]["accelerators"];
        assert_eq!(accs.as_array().unwrap().len(), 1);
        assert_eq!(accs[0]["acceleratorType"], "nvidia-tesla-t4");
        assert_eq!(accs[0]["acceleratorCount"], 2);
    }

    #[test]
    fn test_private_config_and_absent_allowlist() {
        let stack = stack_with_pools("");
        let body = serde_json::to_value(cluster_body(&stack)).unwrap();
        let cluster = &body["cluster"];
        assert_eq!(cluster["privateClusterConfig"]["enablePrivateNodes"], true);
        assert_eq!(
            cluster["privateClusterConfig"]["masterIpv4CidrBlock"],
            "172.16.0.16/28"
        );
        assert!(cluster.get("masterAuthorizedNetworksConfig").is_none());
        assert_eq!(cluster["ipAllocationPolicy"]["useIpAliases"], true);
        assert!(cluster.get("resourceLabels").is_none());
    }

    #[test]
    fn test_firewall_body_uses_compute_field_names() {
        let stack = stack_with_pools("");
        let body =
            serde_json::to_value(firewall_definition(&stack.firewall_rules[0], &stack)).unwrap();
        assert_eq!(body["name"], "edge-allow-master-webhooks");
        assert_eq!(body["network"], "projects/acme-prod/global/networks/acme-vpc");
        assert_eq!(body["allowed"][0]["IPProtocol"], "tcp");
        assert_eq!(body["sourceRanges"][0], "172.16.0.16/28");
        assert_eq!(body["targetTags"][0], "gke-edge-node");
    }

    #[test]
    fn test_service_account_body_only_for_managed() {
        let stack = stack_with_pools("");
        let body = service_account_body(&stack).unwrap();
        assert_eq!(body.account_id, "edge-nodes");

        let mut spec = StackSpec::from_toml_str(
            r#"
            name = "edge"
            project = "acme-prod"
            location = "us-central1"
            network = "acme-vpc"
            subnetwork = "acme-gke"
            master_ipv4_cidr_block = "172.16.0.16/28"
            service_account = "nodes@elsewhere.iam.gserviceaccount.com"
            "#,
        )
        .unwrap();
        spec.node_pools = vec![NodePoolSpec {
            name: "workers".to_string(),
            ..NodePoolSpec::default()
        }];
        assert!(service_account_body(&resolve_stack(&spec)).is_none());
    }

    #[test]
    fn test_iam_member_format() {
        assert_eq!(
            iam_member("edge-nodes@acme-prod.iam.gserviceaccount.com"),
            "serviceAccount:edge-nodes@acme-prod.iam.gserviceaccount.com"
        );
    }
}
