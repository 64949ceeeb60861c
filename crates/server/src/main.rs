use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use assetsync_core::{
    create_authenticator, load_config, validate_config, Authenticator, Config, FsTarget,
    HttpUpstreamClient, LoggingConfig, SqliteStateStore, SyncCollaborators, SyncOrchestrator,
    SyncService,
};
use assetsync_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let config_path = std::env::var("ASSETSYNC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Logging is configured from the file, so a config that cannot be loaded
    // is reported through the default subscriber
    let config = match load_config(&config_path) {
        Ok(config) => {
            init_logging(&config.logging);
            config
        }
        Err(e) => {
            init_logging(&LoggingConfig::default());
            error!("Fatal error: Failed to load config from {:?}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config, config_path).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Install the global subscriber. Output goes to stderr.
fn init_logging(logging: &LoggingConfig) {
    let default_filter = logging
        .filter
        .clone()
        .unwrap_or_else(|| "info,tower_http=debug".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if logging.json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
}

async fn run(config: Config, config_path: PathBuf) -> Result<()> {
    validate_config(&config).context("Configuration validation failed")?;

    info!(version = VERSION, "Starting assetsync");
    info!("Configuration loaded from {:?}", config_path);
    info!("Tenant: {}", config.settings.tenant_id);
    info!("Database path: {:?}", config.database.path);

    let service = Arc::new(build_service(&config)?);
    let key = service.start().context("Failed to schedule sync runs")?;
    info!(
        key = %key,
        interval_secs = config.sync.interval_secs,
        "Scheduled sync registered"
    );

    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&service)));
    info!("Config hash: {}", state.config_hash());

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    service.shutdown();

    Ok(())
}

/// Wire the production collaborators into a sync service.
fn build_service(config: &Config) -> Result<SyncService> {
    let state_store = Arc::new(
        SqliteStateStore::new(&config.database.path).context("Failed to open sync state store")?,
    );
    info!("Sync state store initialized");

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.settings, &config.upstream)
            .context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let upstream = Arc::new(
        HttpUpstreamClient::new(&config.upstream, &config.settings.tenant_id)
            .context("Failed to create upstream client")?,
    );
    info!("Upstream: {}", config.upstream.base_url);

    let target = Arc::new(FsTarget::new(config.target.clone()));
    info!("Target root: {:?}", config.target.root_dir);

    let collaborators = SyncCollaborators {
        settings: config.settings.clone(),
        upstream,
        authenticator,
        token_storage: Arc::clone(&state_store) as _,
        target,
        continuation: state_store,
    };

    let orchestrator = SyncOrchestrator::new(
        collaborators,
        config.sync.clone(),
        config.upstream.retry_policy(),
    );
    Ok(SyncService::new(orchestrator))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
