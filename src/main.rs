//! caas - container provisioning service

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use caas::api::{router, AppState};
use caas::config::{
    create_client, ServiceConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT,
    DEFAULT_VERIFY_INITIAL_DELAY, DEFAULT_VERIFY_TIMEOUT,
};
use caas::gateway::KubeGateway;
use caas::listing::ListingAggregator;
use caas::pipeline::Provisioner;
use caas::store::{create_pool, run_migrations, SqliteShadowStore};

/// caas - run container images on a cluster behind an ingress hostname
#[derive(Parser, Debug)]
#[command(name = "caas", version, about, long_about = None)]
struct Cli {
    /// Address the HTTP API listens on
    #[arg(long, env = "CAAS_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// SQLite database file (or `:memory:`)
    #[arg(long, env = "DATABASE_URL", default_value = "caas.db")]
    database_url: String,

    /// Domain appended to cluster names to build ingress hostnames
    #[arg(long, env = "CAAS_BASE_DOMAIN", default_value = "localhost")]
    base_domain: String,

    /// Namespace all objects are created in
    #[arg(long, env = "CAAS_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Owner all applications are recorded under
    #[arg(long, env = "CAAS_OWNER_ID", default_value = "1")]
    owner_id: String,

    /// Path to a single kubeconfig file. Without it the client is inferred
    /// from $KUBECONFIG or ~/.kube/config, then the in-cluster service account
    #[arg(long, env = "CAAS_KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Deadline for reading back created objects, in seconds
    #[arg(long, default_value_t = DEFAULT_VERIFY_TIMEOUT.as_secs())]
    verify_timeout_secs: u64,

    /// First backoff step when reading back created objects, in milliseconds
    #[arg(long, default_value_t = DEFAULT_VERIFY_INITIAL_DELAY.as_millis() as u64)]
    verify_initial_delay_ms: u64,

    /// kube client connect timeout, in seconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs())]
    connect_timeout_secs: u64,

    /// kube client read timeout, in seconds
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT.as_secs())]
    read_timeout_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "CAAS_LOG_JSON")]
    log_json: bool,
}

impl From<Cli> for ServiceConfig {
    fn from(cli: Cli) -> Self {
        Self {
            listen: cli.listen,
            database_url: cli.database_url,
            base_domain: cli.base_domain,
            namespace: cli.namespace,
            owner_id: cli.owner_id,
            kubeconfig: cli.kubeconfig,
            connect_timeout: Duration::from_secs(cli.connect_timeout_secs),
            read_timeout: Duration::from_secs(cli.read_timeout_secs),
            verify_timeout: Duration::from_secs(cli.verify_timeout_secs),
            verify_initial_delay: Duration::from_millis(cli.verify_initial_delay_ms),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // kube's rustls client needs a process-wide crypto provider
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(cli.log_json.then(|| fmt::layer().json()))
        .with((!cli.log_json).then(|| fmt::layer()))
        .with(filter)
        .init();

    let config = ServiceConfig::from(cli);
    run(config).await
}

async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let pool = create_pool(&config.database_url)
        .map_err(|e| anyhow::anyhow!("failed to open database {}: {}", config.database_url, e))?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!("failed to run migrations: {}", e))?;
    let store = Arc::new(SqliteShadowStore::new(pool));

    let client = create_client(
        config.kubeconfig.as_deref(),
        config.connect_timeout,
        config.read_timeout,
    )
    .await?;
    let gateway = Arc::new(KubeGateway::new(client));

    let provisioner = Arc::new(Provisioner::new(
        gateway.clone(),
        store.clone(),
        config.pipeline(),
    ));
    let listing = Arc::new(ListingAggregator::new(gateway, store));
    let app = router(AppState::new(provisioner, listing, config.scope()));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", config.listen, e))?;
    info!(
        listen = %config.listen,
        namespace = %config.namespace,
        base_domain = %config.base_domain,
        "caas listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("caas stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
