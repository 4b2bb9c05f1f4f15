//! Integration tests against a real cluster
//!
//! - `gateway`: create/read/delete through the kube-rs gateway, including how
//!   API errors are classified
//! - `provisioning`: the full pipeline and listing against live objects

mod gateway;
mod helpers;
mod provisioning;
