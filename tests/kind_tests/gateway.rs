//! The kube-rs gateway against a live API server

use caas::gateway::{ClusterGateway, ClusterResource, GatewayError, KubeGateway, ResourceKind};
use caas::naming::ResourceNames;
use caas::workload::{LaunchSpec, WorkloadCompiler};
use uuid::Uuid;

use super::helpers::{client, TestNamespace};

fn objects(namespace: &str) -> (ResourceNames, caas::workload::GeneratedWorkloads) {
    let id = Uuid::new_v4();
    let names = ResourceNames::derive("gateway-test", &id, "kind.local").unwrap();
    let launch = LaunchSpec {
        image: "nginx:alpine".to_string(),
        external_port: 8080,
        internal_port: 80,
    };
    let generated = WorkloadCompiler::compile(&id.to_string(), &names, namespace, &launch);
    (names, generated)
}

/// Story: each kind can be created, read back and deleted
#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn story_create_read_delete_each_kind() {
    let client = client().await;
    let ns = TestNamespace::create(&client, "caas-gw").await;
    let gateway = KubeGateway::new(client);
    let (names, generated) = objects(&ns.name);

    let resources = [
        ClusterResource::Workload(generated.deployment),
        ClusterResource::Endpoint(generated.service),
        ClusterResource::IngressRoute(generated.ingress),
    ];
    for resource in &resources {
        let created = gateway.create(&ns.name, resource).await.unwrap();
        assert_eq!(created.name(), resource.name());
    }

    let read = gateway
        .read(ResourceKind::Endpoint, &ns.name, &names.endpoint)
        .await
        .unwrap();
    assert_eq!(read.kind(), ResourceKind::Endpoint);

    for resource in resources.iter().rev() {
        gateway
            .delete(resource.kind(), &ns.name, resource.name())
            .await
            .unwrap();
    }

    ns.delete().await;
}

/// Story: creating the same name twice is a conflict, reading a missing
/// object is not found
#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn story_api_errors_are_classified() {
    let client = client().await;
    let ns = TestNamespace::create(&client, "caas-gw").await;
    let gateway = KubeGateway::new(client);
    let (names, generated) = objects(&ns.name);
    let service = ClusterResource::Endpoint(generated.service);

    gateway.create(&ns.name, &service).await.unwrap();
    let err = gateway.create(&ns.name, &service).await.unwrap_err();
    assert!(matches!(err, GatewayError::Conflict { .. }));

    let err = gateway
        .read(ResourceKind::Workload, &ns.name, &names.workload)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = gateway
        .delete(ResourceKind::IngressRoute, &ns.name, &names.ingress)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    ns.delete().await;
}
