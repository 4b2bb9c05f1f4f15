//! In-memory cluster for integration tests
//!
//! Behaves like the API server for the calls the service makes: create
//! conflicts on an existing name, read and delete report missing objects as
//! not found. Failures can be injected per kind and per operation.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DeploymentStatus;

use caas::gateway::{ClusterGateway, ClusterResource, GatewayError, ResourceKind};

type Key = (ResourceKind, String, String);

#[derive(Default)]
struct State {
    objects: HashMap<Key, ClusterResource>,
    create_failures: HashMap<ResourceKind, GatewayError>,
    delete_failures: HashMap<ResourceKind, GatewayError>,
    unreadable: HashSet<String>,
    deleted: Vec<(ResourceKind, String)>,
}

fn object_key(kind: ResourceKind, namespace: &str, name: &str) -> Key {
    (kind, namespace.to_string(), name.to_string())
}

/// An in-memory stand-in for the cluster API
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every create of `kind` fail with `error`
    pub fn fail_create(&self, kind: ResourceKind, error: GatewayError) {
        self.state.lock().unwrap().create_failures.insert(kind, error);
    }

    /// Make every delete of `kind` fail with `error`
    pub fn fail_delete(&self, kind: ResourceKind, error: GatewayError) {
        self.state.lock().unwrap().delete_failures.insert(kind, error);
    }

    /// Make reads of the named object fail as if the API server were down
    pub fn make_unreadable(&self, name: &str) {
        self.state.lock().unwrap().unreadable.insert(name.to_string());
    }

    /// Put a status block on a stored Deployment
    pub fn set_replicas(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
        ready: i32,
        available: i32,
    ) {
        let mut state = self.state.lock().unwrap();
        let key = object_key(ResourceKind::Workload, namespace, name);
        if let Some(ClusterResource::Workload(d)) = state.objects.get_mut(&key) {
            d.status = Some(DeploymentStatus {
                replicas: Some(replicas),
                ready_replicas: Some(ready),
                available_replicas: Some(available),
                ..Default::default()
            });
        }
    }

    /// Whether an object exists
    pub fn contains(&self, kind: ResourceKind, namespace: &str, name: &str) -> bool {
        let key = object_key(kind, namespace, name);
        self.state.lock().unwrap().objects.contains_key(&key)
    }

    /// Names of every stored object of `kind`
    pub fn names(&self, kind: ResourceKind) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .objects
            .iter()
            .filter(|((k, _, _), _)| *k == kind)
            .map(|((_, _, name), _)| name.clone())
            .collect()
    }

    /// Total number of stored objects
    pub fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    /// Successful deletes, in the order they happened
    pub fn deleted(&self) -> Vec<(ResourceKind, String)> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// Fetch a stored object
    pub fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Option<ClusterResource> {
        let key = object_key(kind, namespace, name);
        self.state.lock().unwrap().objects.get(&key).cloned()
    }
}

#[async_trait]
impl ClusterGateway for FakeCluster {
    async fn create(
        &self,
        namespace: &str,
        resource: &ClusterResource,
    ) -> Result<ClusterResource, GatewayError> {
        let kind = resource.kind();
        let name = resource.name().to_string();
        let mut state = self.state.lock().unwrap();

        if let Some(error) = state.create_failures.get(&kind) {
            return Err(error.clone());
        }
        let key = object_key(kind, namespace, &name);
        if state.objects.contains_key(&key) {
            return Err(GatewayError::Conflict { kind, name });
        }
        state.objects.insert(key, resource.clone());
        Ok(resource.clone())
    }

    async fn read(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<ClusterResource, GatewayError> {
        let state = self.state.lock().unwrap();
        if state.unreadable.contains(name) {
            return Err(GatewayError::Unavailable {
                kind,
                name: name.to_string(),
                message: "connection refused".to_string(),
            });
        }
        let key = object_key(kind, namespace, name);
        state
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.delete_failures.get(&kind) {
            return Err(error.clone());
        }
        let key = object_key(kind, namespace, name);
        match state.objects.remove(&key) {
            Some(_) => {
                state.deleted.push((kind, name.to_string()));
                Ok(())
            }
            None => Err(GatewayError::NotFound {
                kind,
                name: name.to_string(),
            }),
        }
    }
}
