//! Listing Aggregator
//!
//! Merges the shadow store's records with live workload status polled from the
//! cluster. The store decides *what* is listed; the cluster only decides each
//! item's status. One unreadable workload never hides the others.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info_span, warn, Instrument};

use crate::gateway::ClusterGateway;
use crate::status::{poll_status, WorkloadStatus};
use crate::store::ShadowStore;
use crate::{Error, Result};

/// One listed application
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryItem {
    /// Application id
    pub id: String,
    /// Caller-supplied logical name
    pub cluster_name: String,
    /// Live status
    pub status: WorkloadStatus,
    /// Image of the active configuration
    pub image: String,
    /// External port of the active configuration
    pub external_port: u16,
    /// Internal port of the active configuration
    pub internal_port: u16,
    /// When the application was recorded
    pub created_at: DateTime<Utc>,
}

/// Counts over the listed items
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InventorySummary {
    /// Number of items
    pub total: usize,
    /// Items whose live status is `RUNNING`
    pub running: usize,
    /// Distinct logical cluster names among the items
    pub cluster_count: usize,
}

impl InventorySummary {
    fn of(items: &[InventoryItem]) -> Self {
        let clusters: HashSet<&str> = items.iter().map(|i| i.cluster_name.as_str()).collect();
        Self {
            total: items.len(),
            running: items
                .iter()
                .filter(|i| i.status == WorkloadStatus::Running)
                .count(),
            cluster_count: clusters.len(),
        }
    }
}

/// Summary plus items, oldest first
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    /// Aggregate counts
    pub summary: InventorySummary,
    /// Listed applications
    pub items: Vec<InventoryItem>,
}

/// Builds inventories from the store and the cluster
pub struct ListingAggregator {
    gateway: Arc<dyn ClusterGateway>,
    store: Arc<dyn ShadowStore>,
}

impl ListingAggregator {
    /// Build an aggregator
    pub fn new(gateway: Arc<dyn ClusterGateway>, store: Arc<dyn ShadowStore>) -> Self {
        Self { gateway, store }
    }

    /// List every application owned by `owner_id` with its live status.
    ///
    /// Applications without any configuration are skipped. A store failure
    /// fails the whole listing; a cluster failure only degrades that item to
    /// `STOPPED`.
    pub async fn list_owned(&self, owner_id: &str) -> Result<Inventory> {
        // Diesel blocks; keep it off the runtime's worker threads
        let store = Arc::clone(&self.store);
        let owner = owner_id.to_string();
        let records = tokio::task::spawn_blocking(move || store.list_by_owner(&owner))
            .await
            .map_err(|e| Error::internal(format!("store task failed: {e}")))??;

        async move {
            let mut items = Vec::with_capacity(records.len());
            for stored in &records {
                let app = &stored.application;
                let Some(config) = stored.active_config() else {
                    warn!(application_id = %app.id, "application has no configuration, skipping");
                    continue;
                };

                let status =
                    poll_status(self.gateway.as_ref(), &app.namespace, &app.workload_name).await;
                debug!(application_id = %app.id, %status, "polled workload status");

                items.push(InventoryItem {
                    id: app.id.clone(),
                    cluster_name: app.name.clone(),
                    status,
                    image: config.image.clone(),
                    external_port: config.external_port,
                    internal_port: config.internal_port,
                    created_at: app.created_at,
                });
            }

            Ok(Inventory {
                summary: InventorySummary::of(&items),
                items,
            })
        }
        .instrument(info_span!("list_owned", %owner_id))
        .await
    }
}
