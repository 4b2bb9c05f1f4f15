//! Stories told through the HTTP router

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use caas::api::dto::{ApiResponse, ContainerCreateResponse, ContainerListResponse, ErrorBody};
use caas::api::{router, AppState};
use caas::gateway::{GatewayError, ResourceKind};

use super::Harness;

fn app(h: &Harness) -> Router {
    router(AppState::new(
        h.provisioner.clone(),
        h.listing.clone(),
        h.scope.clone(),
    ))
}

fn create(cluster: &str) -> Request<Body> {
    let body = serde_json::json!({
        "clusterName": cluster,
        "imageLink": "nginx:latest",
        "externalPort": 8080,
        "internalPort": 80,
    });
    Request::builder()
        .method("POST")
        .uri("/container")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn list() -> Request<Body> {
    Request::builder()
        .uri("/container")
        .body(Body::empty())
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Story: create then list over HTTP
#[tokio::test]
async fn story_create_then_list() {
    let h = Harness::new();

    let response = app(&h).oneshot(create("demo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created: ApiResponse<ContainerCreateResponse> = read_json(response).await;
    assert_eq!(created.code, 20002);
    assert_eq!(created.data.status, "PENDING");
    assert_eq!(created.data.ports.external, 8080);

    let response = app(&h).oneshot(list()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed: ApiResponse<ContainerListResponse> = read_json(response).await;
    assert_eq!(listed.code, 20003);
    assert_eq!(listed.data.summary.total_containers, 1);
    assert_eq!(listed.data.summary.cluster_count, 1);
    assert_eq!(listed.data.containers[0].container_id, created.data.container_id);
    assert_eq!(listed.data.containers[0].image, "nginx:latest");
    assert_eq!(listed.data.containers[0].ports.internal, 80);
}

/// Story: a cluster outage surfaces as 503 and nothing is left behind
#[tokio::test]
async fn story_cluster_outage_is_503() {
    let h = Harness::new();
    h.cluster.fail_create(
        ResourceKind::Endpoint,
        GatewayError::Unavailable {
            kind: ResourceKind::Endpoint,
            name: "any".to_string(),
            message: "dial tcp: i/o timeout".to_string(),
        },
    );

    let response = app(&h).oneshot(create("demo")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorBody = read_json(response).await;
    assert_eq!(body.code, 503);
    assert_eq!(h.cluster.object_count(), 0);

    let listed: ApiResponse<ContainerListResponse> =
        read_json(app(&h).oneshot(list()).await.unwrap()).await;
    assert_eq!(listed.data.summary.total_containers, 0);
}

/// Story: unusable names are rejected with 400
#[tokio::test]
async fn story_unusable_name_is_400() {
    let h = Harness::new();

    let response = app(&h).oneshot(create("---")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = read_json(response).await;
    assert!(body.message.contains("clusterName"));
    assert_eq!(h.cluster.object_count(), 0);
}
