//! The full pipeline against a live API server

use std::sync::Arc;
use std::time::Duration;

use caas::gateway::{ClusterGateway, KubeGateway, ResourceKind};
use caas::listing::ListingAggregator;
use caas::pipeline::{PipelineConfig, ProvisionRequest, Provisioner, Scope};
use caas::retry::RetryConfig;
use caas::store::{create_pool, run_migrations, ShadowStore, SqliteShadowStore};

use super::helpers::{client, TestNamespace};

fn request() -> ProvisionRequest {
    ProvisionRequest {
        cluster_name: "kind-demo".to_string(),
        image: "nginx:alpine".to_string(),
        external_port: 8080,
        internal_port: 80,
    }
}

/// Story: provision, list, and find the objects on the cluster
#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn story_provision_and_list_on_a_real_cluster() {
    let client = client().await;
    let ns = TestNamespace::create(&client, "caas-e2e").await;
    let gateway = Arc::new(KubeGateway::new(client));

    let pool = create_pool(":memory:").unwrap();
    run_migrations(&pool).unwrap();
    let store = Arc::new(SqliteShadowStore::new(pool));

    let provisioner = Provisioner::new(
        gateway.clone(),
        store.clone(),
        PipelineConfig {
            base_domain: "kind.local".to_string(),
            verify: RetryConfig::with_deadline(Duration::from_secs(15)),
        },
    );
    let listing = ListingAggregator::new(gateway.clone(), store.clone());
    let scope = Scope::new("1", ns.name.clone());

    let created = provisioner.provision(&scope, &request()).await.unwrap();
    assert_eq!(created.names.host, "kind-demo.kind.local");

    for (kind, name) in [
        (ResourceKind::Workload, &created.names.workload),
        (ResourceKind::Endpoint, &created.names.endpoint),
        (ResourceKind::IngressRoute, &created.names.ingress),
    ] {
        gateway.read(kind, &ns.name, name).await.unwrap();
    }

    let inventory = listing.list_owned("1").await.unwrap();
    assert_eq!(inventory.summary.total, 1);
    assert_eq!(inventory.items[0].image, "nginx:alpine");
    assert_eq!(store.list_by_owner("1").unwrap().len(), 1);

    ns.delete().await;
}

/// Story: provisioning into a namespace that does not exist fails and
/// leaves no record
#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn story_missing_namespace_fails_cleanly() {
    let client = client().await;
    let gateway: Arc<dyn ClusterGateway> = Arc::new(KubeGateway::new(client));

    let pool = create_pool(":memory:").unwrap();
    run_migrations(&pool).unwrap();
    let store = Arc::new(SqliteShadowStore::new(pool));

    let provisioner = Provisioner::new(
        gateway,
        store.clone(),
        PipelineConfig {
            base_domain: "kind.local".to_string(),
            verify: RetryConfig::with_deadline(Duration::from_secs(5)),
        },
    );
    let scope = Scope::new("1", "caas-does-not-exist");

    let err = provisioner.provision(&scope, &request()).await.unwrap_err();

    assert!(matches!(err, caas::Error::RemoteRejected { code: 404, .. }));
    assert!(store.list_by_owner("1").unwrap().is_empty());
}
