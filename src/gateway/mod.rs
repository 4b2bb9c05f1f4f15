//! Cluster Resource Gateway
//!
//! A narrow create/read/delete surface over the three object kinds an
//! application is made of. The pipeline and the status reconciler only see
//! [`ClusterGateway`]; [`KubeGateway`] is the kube-rs implementation and tests
//! substitute mocks or an in-memory cluster.
//!
//! Every call completes (or times out) before returning; nothing is left
//! running in the background. `create` is not idempotent: a retried create
//! that raced an earlier, ambiguous one surfaces as [`GatewayError::Conflict`].

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// The object kinds managed per application
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Deployment
    Workload,
    /// Service
    Endpoint,
    /// Ingress
    IngressRoute,
}

impl ResourceKind {
    /// Kubernetes kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workload => "Deployment",
            Self::Endpoint => "Service",
            Self::IngressRoute => "Ingress",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cluster object of one of the managed kinds
#[derive(Clone, Debug)]
pub enum ClusterResource {
    /// A Deployment
    Workload(Deployment),
    /// A Service
    Endpoint(Service),
    /// An Ingress
    IngressRoute(Ingress),
}

impl ClusterResource {
    /// Kind of this object
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Workload(_) => ResourceKind::Workload,
            Self::Endpoint(_) => ResourceKind::Endpoint,
            Self::IngressRoute(_) => ResourceKind::IngressRoute,
        }
    }

    /// Object name, empty if unset
    pub fn name(&self) -> &str {
        let name = match self {
            Self::Workload(d) => d.metadata.name.as_deref(),
            Self::Endpoint(s) => s.metadata.name.as_deref(),
            Self::IngressRoute(i) => i.metadata.name.as_deref(),
        };
        name.unwrap_or_default()
    }
}

/// Failures reported by the gateway
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The object does not exist
    #[error("{kind} {name} not found")]
    NotFound {
        /// Object kind
        kind: ResourceKind,
        /// Object name
        name: String,
    },

    /// An object with this name already exists
    #[error("{kind} {name} already exists")]
    Conflict {
        /// Object kind
        kind: ResourceKind,
        /// Object name
        name: String,
    },

    /// Any other 4xx from the API server
    #[error("{kind} {name} rejected ({code}): {body}")]
    Rejected {
        /// Object kind
        kind: ResourceKind,
        /// Object name
        name: String,
        /// HTTP status code
        code: u16,
        /// Server message
        body: String,
    },

    /// Network error, 5xx or timeout
    #[error("{kind} {name}: cluster API unavailable: {message}")]
    Unavailable {
        /// Object kind
        kind: ResourceKind,
        /// Object name
        name: String,
        /// Underlying error
        message: String,
    },
}

impl GatewayError {
    /// Classify a kube-rs error for the given object
    pub fn from_kube(kind: ResourceKind, name: &str, err: kube::Error) -> Self {
        let name = name.to_string();
        match err {
            kube::Error::Api(resp) => match resp.code {
                404 => Self::NotFound { kind, name },
                409 => Self::Conflict { kind, name },
                code @ 400..=499 => Self::Rejected {
                    kind,
                    name,
                    code,
                    body: resp.message,
                },
                code => Self::Unavailable {
                    kind,
                    name,
                    message: format!("{code}: {}", resp.message),
                },
            },
            other => Self::Unavailable {
                kind,
                name,
                message: other.to_string(),
            },
        }
    }

    /// True if the object was not there
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Create/read/delete operations on an application's cluster objects
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterGateway: Send + Sync {
    /// Create an object in `namespace`, returning the server's copy
    async fn create(
        &self,
        namespace: &str,
        resource: &ClusterResource,
    ) -> Result<ClusterResource, GatewayError>;

    /// Read an object by name
    async fn read(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<ClusterResource, GatewayError>;

    /// Delete an object by name
    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), GatewayError>;
}

/// Gateway backed by a kube-rs client
pub struct KubeGateway {
    client: Client,
}

impl KubeGateway {
    /// Wrap a kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn ingresses(&self, namespace: &str) -> Api<Ingress> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterGateway for KubeGateway {
    async fn create(
        &self,
        namespace: &str,
        resource: &ClusterResource,
    ) -> Result<ClusterResource, GatewayError> {
        let kind = resource.kind();
        let name = resource.name();
        let pp = PostParams::default();
        debug!(%kind, %name, %namespace, "creating object");

        let created = match resource {
            ClusterResource::Workload(d) => self
                .deployments(namespace)
                .create(&pp, d)
                .await
                .map(ClusterResource::Workload),
            ClusterResource::Endpoint(s) => self
                .services(namespace)
                .create(&pp, s)
                .await
                .map(ClusterResource::Endpoint),
            ClusterResource::IngressRoute(i) => self
                .ingresses(namespace)
                .create(&pp, i)
                .await
                .map(ClusterResource::IngressRoute),
        };

        created.map_err(|e| GatewayError::from_kube(kind, name, e))
    }

    async fn read(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<ClusterResource, GatewayError> {
        let found = match kind {
            ResourceKind::Workload => self
                .deployments(namespace)
                .get(name)
                .await
                .map(ClusterResource::Workload),
            ResourceKind::Endpoint => self
                .services(namespace)
                .get(name)
                .await
                .map(ClusterResource::Endpoint),
            ResourceKind::IngressRoute => self
                .ingresses(namespace)
                .get(name)
                .await
                .map(ClusterResource::IngressRoute),
        };

        found.map_err(|e| GatewayError::from_kube(kind, name, e))
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), GatewayError> {
        // Foreground so the Deployment's ReplicaSets and pods go with it
        let dp = DeleteParams::foreground();
        debug!(%kind, %name, %namespace, "deleting object");

        let result = match kind {
            ResourceKind::Workload => {
                self.deployments(namespace).delete(name, &dp).await.map(|_| ())
            }
            ResourceKind::Endpoint => {
                self.services(namespace).delete(name, &dp).await.map(|_| ())
            }
            ResourceKind::IngressRoute => {
                self.ingresses(namespace).delete(name, &dp).await.map(|_| ())
            }
        };

        result.map_err(|e| GatewayError::from_kube(kind, name, e))
    }
}
