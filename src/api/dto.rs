//! Wire types for the container API

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::listing::{Inventory, InventoryItem};
use crate::pipeline::{ProvisionRequest, ProvisionedApplication};
use crate::{Error, Result};

/// Success code for an accepted creation request
pub const CONTAINER_CREATE_SUCCESS: (u32, &str) = (20002, "container creation request accepted");
/// Success code for a listing
pub const CONTAINER_LIST_SUCCESS: (u32, &str) = (20003, "container list retrieved");

/// Envelope wrapped around every successful response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Application-level success code
    pub code: u32,
    /// Human-readable summary
    pub message: String,
    /// Payload
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wrap `data` with a `(code, message)` pair
    pub fn success((code, message): (u32, &str), data: T) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }
}

/// Body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code, repeated in the body
    pub code: u16,
    /// What went wrong
    pub message: String,
}

/// `POST /container` body.
///
/// Every field is optional on the wire so that a missing one is reported as
/// a validation error in the usual error body instead of a bare rejection.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCreateRequest {
    /// Logical cluster/application name
    pub cluster_name: Option<String>,
    /// Container image reference
    pub image_link: Option<String>,
    /// Port advertised to callers
    pub external_port: Option<i64>,
    /// Port the container listens on
    pub internal_port: Option<i64>,
}

impl TryFrom<ContainerCreateRequest> for ProvisionRequest {
    type Error = Error;

    fn try_from(body: ContainerCreateRequest) -> Result<Self> {
        let request = ProvisionRequest {
            cluster_name: required("clusterName", body.cluster_name)?,
            image: required("imageLink", body.image_link)?,
            external_port: port("externalPort", body.external_port)?,
            internal_port: port("internalPort", body.internal_port)?,
        };
        request.validate()?;
        Ok(request)
    }
}

fn required(field: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::validation(format!("{field} is required"))),
    }
}

fn port(field: &str, value: Option<i64>) -> Result<u16> {
    let value = value.ok_or_else(|| Error::validation(format!("{field} is required")))?;
    match u16::try_from(value) {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(Error::validation(format!(
            "{field} must be between 1 and 65535, got {value}"
        ))),
    }
}

/// External/internal port pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ports {
    /// Port advertised to callers
    pub external: u16,
    /// Port the container listens on
    pub internal: u16,
}

/// `POST /container` payload
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCreateResponse {
    /// Application id
    pub container_id: String,
    /// Logical cluster name
    pub cluster_name: String,
    /// Image reference
    pub image_link: String,
    /// Port pair
    pub ports: Ports,
    /// When the application was recorded
    #[serde(serialize_with = "utc_seconds")]
    pub request_time: DateTime<Utc>,
    /// Status at creation, always `PENDING`
    pub status: String,
}

impl From<ProvisionedApplication> for ContainerCreateResponse {
    fn from(created: ProvisionedApplication) -> Self {
        Self {
            container_id: created.application.id,
            cluster_name: created.application.name,
            image_link: created.config.image,
            ports: Ports {
                external: created.config.external_port,
                internal: created.config.internal_port,
            },
            request_time: created.application.created_at,
            status: created.application.cached_status.to_string(),
        }
    }
}

/// Counts section of `GET /container`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    /// Number of listed containers
    pub total_containers: usize,
    /// Containers currently running
    pub running_containers: usize,
    /// Distinct cluster names
    pub cluster_count: usize,
}

/// One container in `GET /container`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInfo {
    /// Application id
    pub container_id: String,
    /// Logical cluster name
    pub cluster_name: String,
    /// Live status
    pub status: String,
    /// Image reference
    pub image: String,
    /// Port pair
    pub ports: Ports,
    /// When the application was recorded
    #[serde(serialize_with = "utc_seconds")]
    pub created_at: DateTime<Utc>,
}

impl From<InventoryItem> for ContainerInfo {
    fn from(item: InventoryItem) -> Self {
        Self {
            container_id: item.id,
            cluster_name: item.cluster_name,
            status: item.status.to_string(),
            image: item.image,
            ports: Ports {
                external: item.external_port,
                internal: item.internal_port,
            },
            created_at: item.created_at,
        }
    }
}

/// `GET /container` payload
#[derive(Debug, Serialize, Deserialize)]
pub struct ContainerListResponse {
    /// Aggregate counts
    pub summary: ContainerSummary,
    /// Listed containers, oldest first
    pub containers: Vec<ContainerInfo>,
}

impl From<Inventory> for ContainerListResponse {
    fn from(inventory: Inventory) -> Self {
        Self {
            summary: ContainerSummary {
                total_containers: inventory.summary.total,
                running_containers: inventory.summary.running,
                cluster_count: inventory.summary.cluster_count,
            },
            containers: inventory.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// `2025-01-15T09:30:00Z`
fn utc_seconds<S: Serializer>(
    at: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Secs, true))
}
