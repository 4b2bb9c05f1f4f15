//! Step-boundary events for the provisioning pipeline
//!
//! Each step logs when it starts and how it ended, with the elapsed time. The
//! events go through `tracing`, so verbosity is a subscriber filter setting
//! (`RUST_LOG=caas::pipeline=debug`) rather than a separate code path.

use std::fmt::Display;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::gateway::ResourceKind;

/// One step of a provisioning run, timed from creation
pub(crate) struct Stage<'a> {
    step: &'static str,
    kind: Option<ResourceKind>,
    resource: &'a str,
    started: Instant,
}

impl<'a> Stage<'a> {
    /// A step acting on one cluster object
    pub(crate) fn start(step: &'static str, kind: ResourceKind, resource: &'a str) -> Self {
        debug!(stage = step, %kind, resource, "stage started");
        Self {
            step,
            kind: Some(kind),
            resource,
            started: Instant::now(),
        }
    }

    /// A step that is not about a single cluster object
    pub(crate) fn start_local(step: &'static str, resource: &'a str) -> Self {
        debug!(stage = step, resource, "stage started");
        Self {
            step,
            kind: None,
            resource,
            started: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub(crate) fn succeeded(self) {
        let elapsed_ms = self.elapsed_ms();
        match self.kind {
            Some(kind) => info!(
                stage = self.step,
                %kind,
                resource = self.resource,
                elapsed_ms,
                "stage succeeded"
            ),
            None => {
                info!(stage = self.step, resource = self.resource, elapsed_ms, "stage succeeded")
            }
        }
    }

    pub(crate) fn failed(self, error: &dyn Display) {
        let elapsed_ms = self.elapsed_ms();
        match self.kind {
            Some(kind) => warn!(
                stage = self.step,
                %kind,
                resource = self.resource,
                elapsed_ms,
                %error,
                "stage failed"
            ),
            None => warn!(
                stage = self.step,
                resource = self.resource,
                elapsed_ms,
                %error,
                "stage failed"
            ),
        }
    }
}
