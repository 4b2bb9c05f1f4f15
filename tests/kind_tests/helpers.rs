//! Shared setup for cluster tests

use std::sync::Once;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;

use caas::config::{create_client, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};

static CRYPTO: Once = Once::new();

/// Client from the ambient kubeconfig
pub async fn client() -> Client {
    CRYPTO.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
    create_client(None, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
        .await
        .expect("a reachable cluster is required for kind tests")
}

/// A throwaway namespace; call [`TestNamespace::delete`] when done
pub struct TestNamespace {
    client: Client,
    pub name: String,
}

impl TestNamespace {
    pub async fn create(client: &Client, prefix: &str) -> Self {
        let name = format!("{}-{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..6]);
        let namespaces: Api<Namespace> = Api::all(client.clone());
        namespaces
            .create(
                &PostParams::default(),
                &Namespace {
                    metadata: ObjectMeta {
                        name: Some(name.clone()),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .await
            .expect("failed to create test namespace");
        Self {
            client: client.clone(),
            name,
        }
    }

    pub async fn delete(self) {
        let namespaces: Api<Namespace> = Api::all(self.client);
        let _ = namespaces
            .delete(&self.name, &DeleteParams::background())
            .await;
    }
}
