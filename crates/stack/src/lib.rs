//! Private GKE cluster declarations for 5D Labs infrastructure.
//!
//! This crate turns a short, partially-specified stack description into
//! fully resolved Google Cloud resource definitions:
//!
//! - **Cluster** - a private GKE cluster (private nodes, peered control
//!   plane, CIDR-allowlisted API access)
//! - **IAM** - a least-privilege node service account and its role grants
//! - **Firewall** - the control-plane to node webhook ingress rule
//!
//! ## Flow
//!
//! 1. [`StackSpec`] is loaded from a TOML file.
//! 2. [`resolve_stack`] fills every default and derives dependent
//!    resources, producing a [`ResolvedStack`].
//! 3. `gcp::render` maps the resolved stack onto Container, Compute, and
//!    IAM API request bodies.
//! 4. [`gcp::Gcp`] submits those bodies as individual declarative calls.
//!
//! Resolution is pure and total; nothing here validates semantic ranges.
//! The GCP APIs are the authoritative validator for values such as
//! node-count bounds or CIDR blocks.

pub mod error;
pub mod gcp;
pub mod pool;
pub mod spec;
pub mod stack;

pub use error::StackError;
pub use gcp::Gcp;
pub use pool::{resolve_pools, GuestAccelerator, NodeCountPolicy, ResolvedNodePool};
pub use spec::{AuthorizedNetwork, NodePoolSpec, StackSpec};
pub use stack::{resolve_stack, FirewallRule, NodeServiceAccount, ResolvedCluster, ResolvedStack};
