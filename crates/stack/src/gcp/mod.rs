//! GCP API surface.
//!
//! Three Google APIs back the stack:
//!
//! - **Container** (`container.googleapis.com`) - the cluster and its pools
//! - **Compute** (`compute.googleapis.com`) - VPC firewall rules
//! - **IAM / Resource Manager** - the node service account and its grants
//!
//! `models` holds the wire types, `render` maps resolved stacks onto
//! request bodies, and `client` submits them.

pub mod client;
pub mod models;
pub mod render;

pub use client::{ClusterStatus, Gcp};
