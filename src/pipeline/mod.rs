//! Provisioning Pipeline
//!
//! Turns a request into a running application:
//!
//! 1. validate the request, generate an id, derive names
//! 2. create the Deployment
//! 3. create the Service
//! 4. create the Ingress
//! 5. read all three back, retrying with backoff until one shared deadline
//! 6. write the application and its launch configuration to the shadow store
//!
//! The cluster has no multi-object transaction, so steps 2-6 run as a saga:
//! every object created so far is remembered, and if any later step fails
//! (including the local write) they are deleted in reverse order before the
//! error is returned. Cleanup is best effort; objects it could not remove are
//! reported on the error next to the original cause.
//!
//! Nothing is retried automatically except the read-back in step 5.

mod stage;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::CompensationFailure;
use crate::gateway::{ClusterGateway, ClusterResource, GatewayError, ResourceKind};
use crate::naming::ResourceNames;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::status::WorkloadStatus;
use crate::store::{ApplicationRecord, ConfigRecord, ShadowStore};
use crate::workload::{LaunchSpec, WorkloadCompiler};
use crate::{Error, Result};

use stage::Stage;

/// Who a call acts for and where their objects live
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    /// Owning principal
    pub owner_id: String,
    /// Target namespace
    pub namespace: String,
}

impl Scope {
    /// Build a scope
    pub fn new(owner_id: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            namespace: namespace.into(),
        }
    }
}

/// A request to run one container image
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Logical cluster/application name
    pub cluster_name: String,
    /// Container image reference
    pub image: String,
    /// Port advertised to callers
    pub external_port: u16,
    /// Port the container listens on
    pub internal_port: u16,
}

impl ProvisionRequest {
    /// Reject malformed input before anything touches the cluster
    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.trim().is_empty() {
            return Err(Error::validation("clusterName must not be empty"));
        }
        if self.image.trim().is_empty() {
            return Err(Error::validation("imageLink must not be empty"));
        }
        if self.image.chars().any(char::is_whitespace) {
            return Err(Error::validation(format!(
                "imageLink '{}' must not contain whitespace",
                self.image
            )));
        }
        if self.external_port == 0 {
            return Err(Error::validation("externalPort must be between 1 and 65535"));
        }
        if self.internal_port == 0 {
            return Err(Error::validation("internalPort must be between 1 and 65535"));
        }
        Ok(())
    }
}

/// Result of a successful provisioning run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionedApplication {
    /// The persisted application
    pub application: ApplicationRecord,
    /// Its launch configuration
    pub config: ConfigRecord,
    /// Names of the cluster objects and the routed hostname
    pub names: ResourceNames,
}

/// Settings for the pipeline
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Domain appended to sanitized cluster names to form hostnames
    pub base_domain: String,
    /// Backoff and deadline for the read-back of created objects
    pub verify: RetryConfig,
}

/// Runs provisioning requests against a cluster and a shadow store
pub struct Provisioner {
    gateway: Arc<dyn ClusterGateway>,
    store: Arc<dyn ShadowStore>,
    config: PipelineConfig,
}

impl Provisioner {
    /// Build a provisioner
    pub fn new(
        gateway: Arc<dyn ClusterGateway>,
        store: Arc<dyn ShadowStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            gateway,
            store,
            config,
        }
    }

    /// Provision one application, all or nothing.
    ///
    /// On success the three cluster objects exist and the application is
    /// recorded with status `PENDING`. On failure nothing is recorded and the
    /// objects created along the way have been deleted (or are listed on a
    /// [`Error::CompensationFailed`]).
    pub async fn provision(
        &self,
        scope: &Scope,
        request: &ProvisionRequest,
    ) -> Result<ProvisionedApplication> {
        request.validate()?;

        let id = Uuid::new_v4();
        let names = ResourceNames::derive(&request.cluster_name, &id, &self.config.base_domain)?;
        let span = info_span!(
            "provision",
            application_id = %id,
            cluster = %request.cluster_name,
            workload = %names.workload,
            namespace = %scope.namespace,
        );

        async move {
            let mut saga = Saga::new(self.gateway.as_ref(), &scope.namespace);
            match self.run(&mut saga, scope, request, id, &names).await {
                Ok((application, config)) => {
                    info!(host = %names.host, "application provisioned");
                    Ok(ProvisionedApplication {
                        application,
                        config,
                        names,
                    })
                }
                Err(cause) => Err(saga.compensate(cause).await),
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        saga: &mut Saga<'_>,
        scope: &Scope,
        request: &ProvisionRequest,
        id: Uuid,
        names: &ResourceNames,
    ) -> Result<(ApplicationRecord, ConfigRecord)> {
        let application_id = id.to_string();
        let launch = LaunchSpec {
            image: request.image.clone(),
            external_port: request.external_port,
            internal_port: request.internal_port,
        };
        let objects =
            WorkloadCompiler::compile(&application_id, names, &scope.namespace, &launch);

        saga.create(ClusterResource::Workload(objects.deployment)).await?;
        saga.create(ClusterResource::Endpoint(objects.service)).await?;
        saga.create(ClusterResource::IngressRoute(objects.ingress)).await?;

        saga.verify(&self.config.verify).await?;

        let now = Utc::now();
        let application = ApplicationRecord {
            id: application_id.clone(),
            name: request.cluster_name.clone(),
            namespace: scope.namespace.clone(),
            workload_name: names.workload.clone(),
            endpoint_name: names.endpoint.clone(),
            owner_id: scope.owner_id.clone(),
            cached_status: WorkloadStatus::Pending,
            created_at: now,
        };
        let config = ConfigRecord {
            id: Uuid::new_v4().to_string(),
            application_id,
            image: request.image.clone(),
            external_port: request.external_port,
            internal_port: request.internal_port,
            created_at: now,
        };

        let stage = Stage::start_local("persist", &application.id);
        let store = Arc::clone(&self.store);
        let (app, cfg) = (application.clone(), config.clone());
        let persisted = tokio::task::spawn_blocking(move || store.insert_application(&app, &cfg))
            .await
            .map_err(|e| Error::internal(format!("persist task failed: {e}")));
        match persisted {
            Ok(Ok(())) => stage.succeeded(),
            Ok(Err(e)) => {
                stage.failed(&e);
                return Err(Error::Persistence(e));
            }
            Err(e) => {
                stage.failed(&e);
                return Err(e);
            }
        }

        Ok((application, config))
    }
}

/// Objects created during one run, with their undo
struct Saga<'a> {
    gateway: &'a dyn ClusterGateway,
    namespace: &'a str,
    created: Vec<(ResourceKind, String)>,
}

impl<'a> Saga<'a> {
    fn new(gateway: &'a dyn ClusterGateway, namespace: &'a str) -> Self {
        Self {
            gateway,
            namespace,
            created: Vec::new(),
        }
    }

    /// Create an object and remember it for compensation.
    ///
    /// A conflict means the name belongs to an object we did not create, so it
    /// is not remembered. An unavailable cluster leaves the outcome unknown;
    /// that object is remembered so cleanup tries to delete it.
    async fn create(&mut self, resource: ClusterResource) -> Result<()> {
        let kind = resource.kind();
        let name = resource.name().to_string();
        let stage = Stage::start("create", kind, &name);

        match self.gateway.create(self.namespace, &resource).await {
            Ok(_) => {
                stage.succeeded();
                self.created.push((kind, name));
                Ok(())
            }
            Err(e) => {
                stage.failed(&e);
                if matches!(e, GatewayError::Unavailable { .. }) {
                    self.created.push((kind, name));
                }
                Err(Error::from_gateway(e))
            }
        }
    }

    /// Read every created object back until it is visible or the deadline passes.
    ///
    /// The deadline covers all reads together, not each object on its own.
    async fn verify(&self, retry: &RetryConfig) -> Result<()> {
        let deadline = retry.deadline.map(|budget| Instant::now() + budget);

        for (kind, name) in &self.created {
            let (kind, name) = (*kind, name.as_str());
            let stage = Stage::start("verify", kind, name);

            let remaining = RetryConfig {
                deadline: deadline.map(|at| at.saturating_duration_since(Instant::now())),
                ..retry.clone()
            };
            let read = retry_with_backoff(&remaining, "verify_created_object", || {
                self.gateway.read(kind, self.namespace, name)
            })
            .await;

            match read {
                Ok(_) => stage.succeeded(),
                Err(e) => {
                    stage.failed(&e);
                    return Err(Error::VerificationFailed {
                        kind,
                        name: name.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Delete everything created so far, newest first, and fold cleanup
    /// failures into the returned error
    async fn compensate(self, cause: Error) -> Error {
        if self.created.is_empty() {
            return cause;
        }

        let mut failures = Vec::new();
        for (kind, name) in self.created.into_iter().rev() {
            let stage = Stage::start("compensate", kind, &name);
            match self.gateway.delete(kind, self.namespace, &name).await {
                Ok(()) => stage.succeeded(),
                Err(e) if e.is_not_found() => stage.succeeded(),
                Err(e) => {
                    stage.failed(&e);
                    error!(
                        %kind,
                        %name,
                        error = %e,
                        "object left behind after failed provisioning"
                    );
                    failures.push(CompensationFailure {
                        kind,
                        name: name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            cause
        } else {
            Error::CompensationFailed {
                cause: Box::new(cause),
                failures,
            }
        }
    }
}
