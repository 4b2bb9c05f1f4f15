//! Status Reconciler
//!
//! The cluster never says "this application is running"; it reports replica
//! counters that lag behind reality. [`derive_status`] folds what was observed
//! into one of four states:
//!
//! | observation                              | status    |
//! |------------------------------------------|-----------|
//! | read failed / not found                  | `STOPPED` |
//! | readable, no status block                | `UNKNOWN` |
//! | replicas > 0, ready > 0 and available > 0 | `RUNNING` |
//! | replicas > 0, otherwise                  | `PENDING` |
//! | replicas absent or <= 0                  | `STOPPED` |

use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::gateway::{ClusterGateway, ClusterResource, ResourceKind};

/// Normalized workload state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkloadStatus {
    /// At least one replica is ready and available
    Running,
    /// Replicas requested, none serving yet
    Pending,
    /// No replicas requested, or the workload is gone
    Stopped,
    /// The workload exists but reports no status yet
    Unknown,
}

impl WorkloadStatus {
    /// Upper-case wire form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Pending => "PENDING",
            Self::Stopped => "STOPPED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "PENDING" => Ok(Self::Pending),
            "STOPPED" => Ok(Self::Stopped),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(format!("unknown workload status '{other}'")),
        }
    }
}

/// Replica counters from a Deployment's status block
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplicaCounts {
    /// Total replicas targeted
    pub replicas: Option<i32>,
    /// Replicas passing readiness
    pub ready: Option<i32>,
    /// Replicas available for at least minReadySeconds
    pub available: Option<i32>,
}

impl From<&DeploymentStatus> for ReplicaCounts {
    fn from(status: &DeploymentStatus) -> Self {
        Self {
            replicas: status.replicas,
            ready: status.ready_replicas,
            available: status.available_replicas,
        }
    }
}

/// What a read of the workload produced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// The workload could not be read
    Unreadable,
    /// The workload was read; `None` if it had no status block
    Readable(Option<ReplicaCounts>),
}

impl Observation {
    /// Observation of a Deployment that was read successfully
    pub fn of_deployment(deployment: &Deployment) -> Self {
        Self::Readable(deployment.status.as_ref().map(ReplicaCounts::from))
    }
}

/// Map an observation to a status. Pure and total.
pub fn derive_status(observation: Observation) -> WorkloadStatus {
    match observation {
        Observation::Unreadable => WorkloadStatus::Stopped,
        Observation::Readable(None) => WorkloadStatus::Unknown,
        Observation::Readable(Some(counts)) => derive_from_counts(counts),
    }
}

/// Map a status block's counters to a status
pub fn derive_from_counts(counts: ReplicaCounts) -> WorkloadStatus {
    let positive = |n: Option<i32>| n.is_some_and(|n| n > 0);

    if !positive(counts.replicas) {
        return WorkloadStatus::Stopped;
    }
    if positive(counts.ready) && positive(counts.available) {
        WorkloadStatus::Running
    } else {
        WorkloadStatus::Pending
    }
}

/// Read a workload and derive its live status.
///
/// Never fails: a read error is logged and reported as `STOPPED`.
pub async fn poll_status(
    gateway: &dyn ClusterGateway,
    namespace: &str,
    workload: &str,
) -> WorkloadStatus {
    let observation = match gateway
        .read(ResourceKind::Workload, namespace, workload)
        .await
    {
        Ok(ClusterResource::Workload(deployment)) => Observation::of_deployment(&deployment),
        Ok(other) => {
            warn!(
                %workload,
                kind = %other.kind(),
                "gateway returned unexpected kind for workload read"
            );
            Observation::Readable(None)
        }
        Err(e) => {
            warn!(%workload, %namespace, error = %e, "failed to read workload status");
            Observation::Unreadable
        }
    };

    derive_status(observation)
}
