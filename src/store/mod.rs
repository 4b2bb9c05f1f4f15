//! Shadow Store
//!
//! The local record of every provisioned application: identity, ownership and
//! the cluster coordinates needed to look it up again. Cluster state is not
//! mirrored here; live status is recomputed from the cluster on every listing.
//!
//! An application and its first launch configuration are written in one
//! transaction. Configurations are owned by their application and go away with
//! it.

mod connection;
mod model;
mod schema;
mod sqlite;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

pub use connection::{create_pool, run_migrations, DbPool};
pub use sqlite::SqliteShadowStore;

use crate::status::WorkloadStatus;

/// Errors from the local store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Could not obtain a connection
    #[error("connection error: {0}")]
    Connection(String),

    /// A query or transaction failed
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be decoded
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// One provisioned application
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationRecord {
    /// Generated identifier
    pub id: String,
    /// Caller-supplied logical cluster name (not unique)
    pub name: String,
    /// Namespace the cluster objects live in
    pub namespace: String,
    /// Deployment name
    pub workload_name: String,
    /// Service name
    pub endpoint_name: String,
    /// Owning principal
    pub owner_id: String,
    /// Status at creation time; not kept live
    pub cached_status: WorkloadStatus,
    /// When the record was persisted
    pub created_at: DateTime<Utc>,
}

/// One launch configuration of an application
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigRecord {
    /// Generated identifier
    pub id: String,
    /// Owning application
    pub application_id: String,
    /// Container image reference
    pub image: String,
    /// Port advertised to callers
    pub external_port: u16,
    /// Port the container listens on
    pub internal_port: u16,
    /// When the record was persisted
    pub created_at: DateTime<Utc>,
}

/// An application together with its configurations, oldest first
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredApplication {
    /// The application
    pub application: ApplicationRecord,
    /// Its configurations; may be empty for a partially written record
    pub configs: Vec<ConfigRecord>,
}

impl StoredApplication {
    /// The configuration the application was launched with
    pub fn active_config(&self) -> Option<&ConfigRecord> {
        self.configs.first()
    }
}

/// Persistence operations used by the pipeline and the listing
#[cfg_attr(test, automock)]
pub trait ShadowStore: Send + Sync {
    /// Insert an application and its first configuration atomically
    fn insert_application(
        &self,
        application: &ApplicationRecord,
        config: &ConfigRecord,
    ) -> Result<(), StoreError>;

    /// All applications owned by `owner_id`, oldest first
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<StoredApplication>, StoreError>;

    /// Delete an application and its configurations. Returns false if absent.
    fn delete_application(&self, id: &str) -> Result<bool, StoreError>;
}
