//! caas - container provisioning service
//!
//! A caller asks for a container image to be run under a logical cluster name.
//! The service creates a Deployment, a Service and an Ingress for it, confirms
//! all three are visible, and records the application in a local shadow
//! store. Listing merges that store with live replica status from the cluster.
//!
//! # Modules
//!
//! - [`naming`] - Resource names and hostnames derived from a cluster name
//! - [`workload`] - Desired-state builders for Deployment, Service and Ingress
//! - [`gateway`] - Create/read/delete of those objects against the cluster API
//! - [`pipeline`] - Provisioning saga with reverse-order compensation
//! - [`status`] - Normalized workload status from replica counters
//! - [`store`] - Shadow store of applications and launch configurations
//! - [`listing`] - Inventory of an owner's applications with live status
//! - [`api`] - HTTP API
//! - [`config`] - Service configuration and kube client setup
//! - [`retry`] - Backoff with jitter under a deadline
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod listing;
pub mod naming;
pub mod pipeline;
pub mod retry;
pub mod status;
pub mod store;
pub mod workload;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
