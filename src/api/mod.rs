//! HTTP API
//!
//! - `POST /container` provisions one application
//! - `GET /container` lists the owner's applications with live status
//! - `GET /healthz` liveness
//!
//! Provisioning runs on its own task so a client that hangs up mid-request
//! does not cancel the pipeline halfway through; it still completes or
//! compensates.

pub mod dto;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, warn};

use crate::listing::ListingAggregator;
use crate::pipeline::{ProvisionRequest, Provisioner, Scope};
use crate::{Error, Result};

use dto::{
    ApiResponse, ContainerCreateRequest, ContainerCreateResponse, ContainerListResponse,
    ErrorBody, CONTAINER_CREATE_SUCCESS, CONTAINER_LIST_SUCCESS,
};

/// Shared state for the API handlers
#[derive(Clone)]
pub struct AppState {
    /// Provisioning pipeline
    pub provisioner: Arc<Provisioner>,
    /// Listing aggregator
    pub listing: Arc<ListingAggregator>,
    /// Owner and namespace every request runs under
    pub scope: Scope,
}

impl AppState {
    /// Create handler state
    pub fn new(
        provisioner: Arc<Provisioner>,
        listing: Arc<ListingAggregator>,
        scope: Scope,
    ) -> Self {
        Self {
            provisioner,
            listing,
            scope,
        }
    }
}

impl Error {
    /// HTTP status for this error.
    ///
    /// A failed cleanup does not change what the caller did wrong, so it maps
    /// by its original cause.
    pub fn status_code(&self) -> StatusCode {
        match self.root_cause() {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            e if e.is_conflict() => StatusCode::CONFLICT,
            Error::RemoteRejected { .. } => StatusCode::BAD_GATEWAY,
            Error::RemoteUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match status {
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => self.to_string(),
            StatusCode::BAD_GATEWAY => "cluster rejected the request".to_string(),
            StatusCode::SERVICE_UNAVAILABLE => "cluster unavailable".to_string(),
            _ => "container provisioning failed".to_string(),
        };
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }

        (
            status,
            Json(ErrorBody {
                code: status.as_u16(),
                message,
            }),
        )
            .into_response()
    }
}

async fn create_container(
    State(state): State<AppState>,
    body: std::result::Result<Json<ContainerCreateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ContainerCreateResponse>>> {
    let Json(body) = body.map_err(|e| Error::validation(e.body_text()))?;
    let request = ProvisionRequest::try_from(body)?;

    let provisioner = state.provisioner.clone();
    let scope = state.scope.clone();
    let created = tokio::spawn(async move { provisioner.provision(&scope, &request).await })
        .await
        .map_err(|e| Error::internal(format!("provisioning task aborted: {}", e)))??;

    Ok(Json(ApiResponse::success(
        CONTAINER_CREATE_SUCCESS,
        created.into(),
    )))
}

async fn list_containers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ContainerListResponse>>> {
    let inventory = state.listing.list_owned(&state.scope.owner_id).await?;
    Ok(Json(ApiResponse::success(
        CONTAINER_LIST_SUCCESS,
        inventory.into(),
    )))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/container", get(list_containers).post(create_container))
        .route("/healthz", get(healthz))
        .with_state(state)
}
