//! Catalog Cache server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_cache::store::seed;
use catalog_cache::{
    create_router, spawn_cleanup_task, AppState, Config, MemoryProductStore, PgProductStore,
    ProductStore,
};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the record store, seeding it when asked to
/// 4. Build the cache handle (Redis connects lazily in the background)
/// 5. Start the TTL cleanup task for the in-memory backend
/// 6. Serve HTTP until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Catalog Cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, cache_enabled={}, cache_backend={:?}, record_ttl={}s, collection_ttl={}s",
        config.server_port,
        config.cache.enabled,
        config.cache.backend,
        config.cache.policy.record_ttl.as_secs(),
        config.cache.policy.collection_ttl.as_secs()
    );

    let store = open_store(&config).await?;

    if config.seed_data {
        if let Err(e) = seed(store.as_ref()).await {
            warn!(error = %e, "Seeding failed");
        }
    }

    let (state, memory_backend) = match AppState::from_config(&config, Arc::clone(&store)) {
        Ok(built) => built,
        Err(e) => {
            warn!(error = %e, "Cache backend unusable, continuing without cache");
            let mut fallback = config.clone();
            fallback.cache.enabled = false;
            AppState::from_config(&fallback, store)?
        }
    };
    info!(
        backend = state.catalog.cache().handle().name(),
        "Cache layer initialized"
    );

    let cleanup_handle =
        memory_backend.map(|backend| spawn_cleanup_task(backend, config.cache.cleanup_interval));

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Postgres when `DATABASE_URL` is set, otherwise the in-memory store.
///
/// The pool is lazy, so an unreachable database still lets the server start
/// and report unhealthy.
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ProductStore>> {
    let Some(url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not set, using in-memory product store");
        return Ok(Arc::new(MemoryProductStore::new()));
    };

    let store = PgProductStore::connect_lazy(
        url,
        config.database_max_connections,
        Duration::from_secs(5),
    )
    .context("invalid DATABASE_URL")?;

    if let Err(e) = store.ensure_schema().await {
        warn!(error = %e, "Could not prepare products table");
    }

    info!("Using Postgres product store");
    Ok(Arc::new(store))
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}
