//! Service configuration and cluster connection setup
//!
//! The binary parses flags into a [`ServiceConfig`]; library code only ever
//! sees this struct.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::pipeline::{PipelineConfig, Scope};
use crate::retry::RetryConfig;
use crate::{Error, Result};

/// Default connection timeout for the kube client
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for the kube client
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Default hard deadline for reading back created objects
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(10);
/// Default first backoff step when reading back created objects
pub const DEFAULT_VERIFY_INITIAL_DELAY: Duration = Duration::from_millis(200);

/// Everything the service needs at startup
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Address the HTTP API binds to
    pub listen: SocketAddr,
    /// SQLite database path, or `:memory:`
    pub database_url: String,
    /// Domain appended to cluster names to form hostnames
    pub base_domain: String,
    /// Namespace every object is created in
    pub namespace: String,
    /// Owner all records are attributed to
    pub owner_id: String,
    /// Explicit kubeconfig; falls back to discovery when unset
    pub kubeconfig: Option<PathBuf>,
    /// kube client connect timeout
    pub connect_timeout: Duration,
    /// kube client read timeout
    pub read_timeout: Duration,
    /// Deadline for the post-create read-back
    pub verify_timeout: Duration,
    /// First backoff step of the post-create read-back
    pub verify_initial_delay: Duration,
}

impl ServiceConfig {
    /// Owner and namespace every request runs under
    pub fn scope(&self) -> Scope {
        Scope::new(self.owner_id.clone(), self.namespace.clone())
    }

    /// Pipeline settings derived from this configuration
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            base_domain: self.base_domain.clone(),
            verify: RetryConfig {
                initial_delay: self.verify_initial_delay,
                ..RetryConfig::with_deadline(self.verify_timeout)
            },
        }
    }
}

/// Create a kube client.
///
/// An explicit kubeconfig path wins. Without one, kube-rs inference tries
/// `$KUBECONFIG` / `~/.kube/config` and then the in-cluster service account.
pub async fn create_client(
    kubeconfig: Option<&Path>,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client> {
    let mut config = match kubeconfig {
        Some(path) => {
            debug!(path = %path.display(), "loading explicit kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path)
                .map_err(|e| Error::internal(format!("failed to read kubeconfig: {}", e)))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| Error::internal(format!("failed to load kubeconfig: {}", e)))?
        }
        None => Config::infer()
            .await
            .map_err(|e| Error::internal(format!("failed to infer config: {}", e)))?,
    };

    config.connect_timeout = Some(connect_timeout);
    config.read_timeout = Some(read_timeout);
    Client::try_from(config).map_err(|e| Error::internal(format!("failed to create client: {}", e)))
}
