//! Stories about listing an owner's applications

use caas::pipeline::{ProvisionRequest, Scope};
use caas::status::WorkloadStatus;
use caas::store::ShadowStore;

use super::{demo_request, Harness};

/// Story: what was provisioned is what gets listed
#[tokio::test]
async fn story_provisioned_application_is_listed() {
    let h = Harness::new();
    let created = h.provisioner.provision(&h.scope, &demo_request()).await.unwrap();
    // Rollout just started
    h.cluster.set_replicas("default", &created.names.workload, 1, 0, 0);

    let inventory = h.listing.list_owned("1").await.unwrap();

    assert_eq!(inventory.items.len(), 1);
    let item = &inventory.items[0];
    assert_eq!(item.id, created.application.id);
    assert_eq!(item.image, "nginx:latest");
    assert_eq!(item.external_port, 8080);
    assert_eq!(item.internal_port, 80);
    assert!(matches!(
        item.status,
        WorkloadStatus::Pending | WorkloadStatus::Running
    ));
}

/// Story: replica counters on the cluster drive the listed status
#[tokio::test]
async fn story_live_status_follows_replica_counters() {
    let h = Harness::new();
    let a = h.provisioner.provision(&h.scope, &demo_request()).await.unwrap();
    let b = h
        .provisioner
        .provision(
            &h.scope,
            &ProvisionRequest {
                cluster_name: "shop".to_string(),
                ..demo_request()
            },
        )
        .await
        .unwrap();
    h.cluster.set_replicas("default", &a.names.workload, 3, 2, 2);
    h.cluster.set_replicas("default", &b.names.workload, 1, 0, 0);

    let inventory = h.listing.list_owned("1").await.unwrap();

    let status_of = |id: &str| {
        inventory
            .items
            .iter()
            .find(|i| i.id == id)
            .map(|i| i.status)
            .unwrap()
    };
    assert_eq!(status_of(&a.application.id), WorkloadStatus::Running);
    assert_eq!(status_of(&b.application.id), WorkloadStatus::Pending);
    assert_eq!(inventory.summary.total, 2);
    assert_eq!(inventory.summary.running, 1);
    assert_eq!(inventory.summary.cluster_count, 2);
}

/// Story: one unreadable workload degrades to STOPPED, the rest still list
#[tokio::test]
async fn story_one_unreadable_workload_does_not_hide_the_others() {
    let h = Harness::new();
    let mut created = Vec::new();
    for _ in 0..3 {
        created.push(h.provisioner.provision(&h.scope, &demo_request()).await.unwrap());
    }
    for c in &created {
        h.cluster.set_replicas("default", &c.names.workload, 1, 1, 1);
    }
    h.cluster.make_unreadable(&created[1].names.workload);

    let inventory = h.listing.list_owned("1").await.unwrap();

    assert_eq!(inventory.summary.total, 3);
    assert_eq!(inventory.summary.running, 2);
    assert_eq!(inventory.summary.cluster_count, 1);
    let broken = inventory
        .items
        .iter()
        .find(|i| i.id == created[1].application.id)
        .unwrap();
    assert_eq!(broken.status, WorkloadStatus::Stopped);
}

/// Story: listing only shows the caller's own applications
#[tokio::test]
async fn story_listing_is_scoped_to_the_owner() {
    let h = Harness::new();
    h.provisioner.provision(&h.scope, &demo_request()).await.unwrap();
    let other = Scope::new("2", "default");
    h.provisioner.provision(&other, &demo_request()).await.unwrap();

    assert_eq!(h.listing.list_owned("1").await.unwrap().items.len(), 1);
    assert_eq!(h.listing.list_owned("2").await.unwrap().items.len(), 1);
    assert!(h.listing.list_owned("3").await.unwrap().items.is_empty());
}

/// Story: a record deleted from the store disappears from the listing even
/// though its objects are still on the cluster
#[tokio::test]
async fn story_store_decides_what_is_listed() {
    let h = Harness::new();
    let created = h.provisioner.provision(&h.scope, &demo_request()).await.unwrap();

    assert!(h.store.delete_application(&created.application.id).unwrap());

    assert!(h.listing.list_owned("1").await.unwrap().items.is_empty());
    assert_eq!(h.cluster.object_count(), 3);
}
