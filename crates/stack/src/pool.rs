//! Node pool resolution.
//!
//! Turns partially-specified [`NodePoolSpec`] entries into fully resolved
//! pool definitions. Resolution is pure and per-element; it fills defaults,
//! gates accelerator attachment on the resolved count, and picks exactly one
//! scaling policy. It does not validate ranges - a pool with
//! `min_count > max_count` resolves fine and is rejected by the API instead.

use crate::spec::NodePoolSpec;

/// Default node OS image.
pub const DEFAULT_IMAGE_TYPE: &str = "COS_CONTAINERD";

/// Default Compute Engine machine type.
pub const DEFAULT_MACHINE_TYPE: &str = "n1-standard-2";

/// Default boot disk size in GB.
pub const DEFAULT_DISK_SIZE_GB: i32 = 100;

/// Default boot disk type.
pub const DEFAULT_DISK_TYPE: &str = "pd-standard";

/// Default autoscaler lower bound.
pub const DEFAULT_MIN_COUNT: i32 = 1;

/// Default autoscaler upper bound.
pub const DEFAULT_MAX_COUNT: i32 = 100;

/// An accelerator attachment on every node of a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestAccelerator {
    /// Accelerator type, e.g. `"nvidia-tesla-t4"`.
    pub accelerator_type: String,
    /// Accelerators per node.
    pub count: i32,
}

/// How a pool's node count is decided.
///
/// A pool either holds a fixed count or delegates to the cluster
/// autoscaler within bounds. The two are mutually exclusive by
/// construction; a resolved pool carries exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCountPolicy {
    /// Static pool size, no autoscaler.
    Fixed {
        /// Node count the pool is held at.
        node_count: i32,
    },
    /// Autoscaler-managed size within `[min, max]`.
    Autoscaled {
        /// Autoscaler lower bound.
        min_node_count: i32,
        /// Autoscaler upper bound.
        max_node_count: i32,
    },
}

/// A node pool with every default applied and derived fields computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNodePool {
    /// Pool name.
    pub name: String,
    /// Node OS image type.
    pub image_type: String,
    /// Compute Engine machine type.
    pub machine_type: String,
    /// Boot disk size in GB.
    pub disk_size_gb: i32,
    /// Boot disk type.
    pub disk_type: String,
    /// Preemptible VMs.
    pub preemptible: bool,
    /// Accelerator attachments. Empty, or a single entry when the resolved
    /// accelerator count is positive.
    pub guest_accelerators: Vec<GuestAccelerator>,
    /// Node count the pool starts with.
    pub initial_node_count: i32,
    /// Fixed size or autoscaler bounds.
    pub count_policy: NodeCountPolicy,
}

/// Resolve a list of node pool specs, one output per input, order
/// preserved. Each element resolves independently.
#[must_use]
pub fn resolve_pools(specs: &[NodePoolSpec]) -> Vec<ResolvedNodePool> {
    specs.iter().map(resolve_pool).collect()
}

fn resolve_pool(spec: &NodePoolSpec) -> ResolvedNodePool {
    let min_count = spec.min_count.unwrap_or(DEFAULT_MIN_COUNT);
    let max_count = spec.max_count.unwrap_or(DEFAULT_MAX_COUNT);
    let initial_node_count = spec.initial_node_count.unwrap_or(min_count);

    // The count gates attachment; a type with a zero count attaches nothing.
    let accelerator_count = spec.accelerator_count.unwrap_or(0);
    let guest_accelerators = if accelerator_count > 0 {
        vec![GuestAccelerator {
            accelerator_type: spec.accelerator_type.clone().unwrap_or_default(),
            count: accelerator_count,
        }]
    } else {
        Vec::new()
    };

    let count_policy = if spec.autoscaling.unwrap_or(true) {
        NodeCountPolicy::Autoscaled {
            min_node_count: min_count,
            max_node_count: max_count,
        }
    } else {
        NodeCountPolicy::Fixed {
            node_count: initial_node_count,
        }
    };

    ResolvedNodePool {
        name: spec.name.clone(),
        image_type: spec
            .image_type
            .clone()
            .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string()),
        machine_type: spec
            .machine_type
            .clone()
            .unwrap_or_else(|| DEFAULT_MACHINE_TYPE.to_string()),
        disk_size_gb: spec.disk_size_gb.unwrap_or(DEFAULT_DISK_SIZE_GB),
        disk_type: spec
            .disk_type
            .clone()
            .unwrap_or_else(|| DEFAULT_DISK_TYPE.to_string()),
        preemptible: spec.preemptible.unwrap_or(false),
        guest_accelerators,
        initial_node_count,
        count_policy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> NodePoolSpec {
        NodePoolSpec {
            name: name.to_string(),
            ..NodePoolSpec::default()
        }
    }

    #[test]
    fn test_bare_name_gets_all_defaults() {
        let resolved = resolve_pools(&[named("pool-a")]);
        assert_eq!(resolved.len(), 1);
        let pool = &resolved[0];
        assert_eq!(pool.name, "pool-a");
        assert_eq!(pool.image_type, "COS_CONTAINERD");
        assert_eq!(pool.machine_type, "n1-standard-2");
        assert_eq!(pool.disk_size_gb, 100);
        assert_eq!(pool.disk_type, "pd-standard");
        assert!(!pool.preemptible);
        assert!(pool.guest_accelerators.is_empty());
        assert_eq!(pool.initial_node_count, 1);
        assert_eq!(
            pool.count_policy,
            NodeCountPolicy::Autoscaled {
                min_node_count: 1,
                max_node_count: 100,
            }
        );
    }

    #[test]
    fn test_fully_specified_pool_resolves_to_itself() {
        let spec = NodePoolSpec {
            name: "gpu-pool".to_string(),
            image_type: Some("UBUNTU_CONTAINERD".to_string()),
            machine_type: Some("n1-highmem-8".to_string()),
            disk_size_gb: Some(200),
            disk_type: Some("pd-ssd".to_string()),
            preemptible: Some(true),
            accelerator_type: Some("nvidia-tesla-t4".to_string()),
            accelerator_count: Some(1),
            autoscaling: Some(true),
            min_count: Some(2),
            max_count: Some(8),
            initial_node_count: Some(3),
        };
        let pool = resolve_pools(std::slice::from_ref(&spec)).remove(0);
        assert_eq!(pool.image_type, "UBUNTU_CONTAINERD");
        assert_eq!(pool.machine_type, "n1-highmem-8");
        assert_eq!(pool.disk_size_gb, 200);
        assert_eq!(pool.disk_type, "pd-ssd");
        assert!(pool.preemptible);
        assert_eq!(
            pool.guest_accelerators,
            vec![GuestAccelerator {
                accelerator_type: "nvidia-tesla-t4".to_string(),
                count: 1,
            }]
        );
        assert_eq!(pool.initial_node_count, 3);
        assert_eq!(
            pool.count_policy,
            NodeCountPolicy::Autoscaled {
                min_node_count: 2,
                max_node_count: 8,
            }
        );
    }

    #[test]
    fn test_accelerator_count_zero_attaches_nothing() {
        let spec = NodePoolSpec {
            accelerator_type: Some("nvidia-tesla-t4".to_string()),
            accelerator_count: Some(0),
            ..named("quiet")
        };
        let pool = resolve_pools(&[spec]).remove(0);
        assert!(pool.guest_accelerators.is_empty());
    }

    #[test]
    fn test_positive_accelerator_count_attaches_one_entry() {
        let spec = NodePoolSpec {
            accelerator_type: Some("nvidia-tesla-t4".to_string()),
            accelerator_count: Some(2),
            ..named("gpus")
        };
        let pool = resolve_pools(&[spec]).remove(0);
        assert_eq!(pool.guest_accelerators.len(), 1);
        assert_eq!(pool.guest_accelerators[0].accelerator_type, "nvidia-tesla-t4");
        assert_eq!(pool.guest_accelerators[0].count, 2);
    }

    #[test]
    fn test_autoscaling_off_fixes_count_at_min() {
        let spec = NodePoolSpec {
            autoscaling: Some(false),
            min_count: Some(3),
            ..named("static")
        };
        let pool = resolve_pools(&[spec]).remove(0);
        assert_eq!(pool.count_policy, NodeCountPolicy::Fixed { node_count: 3 });
    }

    #[test]
    fn test_explicit_initial_count_beats_min_count() {
        let spec = NodePoolSpec {
            initial_node_count: Some(5),
            min_count: Some(2),
            ..named("warm")
        };
        let pool = resolve_pools(std::slice::from_ref(&spec)).remove(0);
        assert_eq!(pool.initial_node_count, 5);

        let fixed = NodePoolSpec {
            autoscaling: Some(false),
            ..spec
        };
        let pool = resolve_pools(&[fixed]).remove(0);
        assert_eq!(pool.count_policy, NodeCountPolicy::Fixed { node_count: 5 });
    }

    #[test]
    fn test_every_pool_gets_exactly_one_count_policy() {
        let specs = vec![
            named("defaulted"),
            NodePoolSpec {
                autoscaling: Some(false),
                ..named("fixed")
            },
            NodePoolSpec {
                autoscaling: Some(true),
                min_count: Some(0),
                max_count: Some(0),
                ..named("zero-bounds")
            },
        ];
        for pool in resolve_pools(&specs) {
            // Matching is total over the enum; either arm carries its data.
            match pool.count_policy {
                NodeCountPolicy::Fixed { node_count } => assert!(node_count >= 0),
                NodeCountPolicy::Autoscaled {
                    min_node_count,
                    max_node_count,
                } => {
                    let _ = (min_node_count, max_node_count);
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_bounds_pass_through() {
        let spec = NodePoolSpec {
            min_count: Some(50),
            max_count: Some(5),
            disk_size_gb: Some(-1),
            ..named("inverted")
        };
        let pool = resolve_pools(&[spec]).remove(0);
        assert_eq!(pool.disk_size_gb, -1);
        assert_eq!(
            pool.count_policy,
            NodeCountPolicy::Autoscaled {
                min_node_count: 50,
                max_node_count: 5,
            }
        );
    }

    #[test]
    fn test_order_is_preserved() {
        let specs: Vec<NodePoolSpec> = ["c", "a", "b"].iter().copied().map(named).collect();
        let resolved = resolve_pools(&specs);
        let names: Vec<&str> = resolved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);

        assert!(resolve_pools(&[]).is_empty());
    }
}
