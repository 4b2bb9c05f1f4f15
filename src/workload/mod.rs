//! Desired-state builders for an application's cluster objects
//!
//! [`WorkloadCompiler`] turns a launch configuration and a set of
//! [`ResourceNames`] into the three objects the pipeline creates:
//! - Deployment: one replica of the requested image
//! - Service: ClusterIP endpoint in front of the Deployment's pods
//! - Ingress: routes the application's hostname to the Service

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::naming::ResourceNames;

/// Selector label linking the Service to the Deployment's pods
pub const APP_LABEL: &str = "app";

/// Label marking objects created by this service
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`]
pub const MANAGED_BY: &str = "caas";

/// Label carrying the owning application's id
pub const APPLICATION_ID_LABEL: &str = "caas.dev/application-id";

/// Ingress controller class the routes are written for
pub const INGRESS_CLASS: &str = "nginx";

/// Name of the single exposed port
const PORT_NAME: &str = "http";

/// Launch configuration for one application
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Container image reference
    pub image: String,
    /// Port advertised to callers
    pub external_port: u16,
    /// Port the container listens on
    pub internal_port: u16,
}

/// The objects generated for one application
#[derive(Clone, Debug)]
pub struct GeneratedWorkloads {
    /// Deployment running the container
    pub deployment: Deployment,
    /// ClusterIP Service selecting the Deployment's pods
    pub service: Service,
    /// Ingress binding the hostname to the Service
    pub ingress: Ingress,
}

/// Compiles launch configurations into cluster objects
pub struct WorkloadCompiler;

impl WorkloadCompiler {
    /// Build all three objects for an application
    pub fn compile(
        application_id: &str,
        names: &ResourceNames,
        namespace: &str,
        launch: &LaunchSpec,
    ) -> GeneratedWorkloads {
        GeneratedWorkloads {
            deployment: Self::compile_deployment(application_id, names, namespace, launch),
            service: Self::compile_service(application_id, names, namespace, launch),
            ingress: Self::compile_ingress(application_id, names, namespace, launch),
        }
    }

    fn labels(application_id: &str, app: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (APP_LABEL.to_string(), app.to_string()),
            (MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string()),
            (APPLICATION_ID_LABEL.to_string(), application_id.to_string()),
        ])
    }

    fn selector(workload: &str) -> BTreeMap<String, String> {
        BTreeMap::from([(APP_LABEL.to_string(), workload.to_string())])
    }

    fn compile_deployment(
        application_id: &str,
        names: &ResourceNames,
        namespace: &str,
        launch: &LaunchSpec,
    ) -> Deployment {
        let labels = Self::labels(application_id, &names.workload);

        Deployment {
            metadata: ObjectMeta {
                name: Some(names.workload.clone()),
                namespace: Some(namespace.to_string()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(Self::selector(&names.workload)),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: names.workload.clone(),
                            image: Some(launch.image.clone()),
                            image_pull_policy: Some("IfNotPresent".to_string()),
                            ports: Some(vec![ContainerPort {
                                name: Some(PORT_NAME.to_string()),
                                container_port: i32::from(launch.internal_port),
                                ..Default::default()
                            }]),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            status: None,
        }
    }

    fn compile_service(
        application_id: &str,
        names: &ResourceNames,
        namespace: &str,
        launch: &LaunchSpec,
    ) -> Service {
        let port = i32::from(launch.internal_port);

        Service {
            metadata: ObjectMeta {
                name: Some(names.endpoint.clone()),
                namespace: Some(namespace.to_string()),
                labels: Some(Self::labels(application_id, &names.workload)),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                type_: Some("ClusterIP".to_string()),
                selector: Some(Self::selector(&names.workload)),
                ports: Some(vec![ServicePort {
                    name: Some(PORT_NAME.to_string()),
                    port,
                    target_port: Some(IntOrString::Int(port)),
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            status: None,
        }
    }

    fn compile_ingress(
        application_id: &str,
        names: &ResourceNames,
        namespace: &str,
        launch: &LaunchSpec,
    ) -> Ingress {
        let annotations = BTreeMap::from([
            (
                "nginx.ingress.kubernetes.io/rewrite-target".to_string(),
                "/".to_string(),
            ),
            (
                "nginx.ingress.kubernetes.io/ssl-redirect".to_string(),
                "false".to_string(),
            ),
        ]);

        Ingress {
            metadata: ObjectMeta {
                name: Some(names.ingress.clone()),
                namespace: Some(namespace.to_string()),
                labels: Some(Self::labels(application_id, &names.endpoint)),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec: Some(IngressSpec {
                ingress_class_name: Some(INGRESS_CLASS.to_string()),
                rules: Some(vec![IngressRule {
                    host: Some(names.host.clone()),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some("/".to_string()),
                            path_type: "Prefix".to_string(),
                            backend: IngressBackend {
                                service: Some(IngressServiceBackend {
                                    name: names.endpoint.clone(),
                                    port: Some(ServiceBackendPort {
                                        number: Some(i32::from(launch.internal_port)),
                                        ..Default::default()
                                    }),
                                }),
                                ..Default::default()
                            },
                        }],
                    }),
                }]),
                ..Default::default()
            }),
            status: None,
        }
    }
}
