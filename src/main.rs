//! Cache Aside - HTTP server entry point
//!
//! Serves the product API through the cache-aside layer plus the cache
//! administration endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_aside::api::create_router;
use cache_aside::config::BackendKind;
use cache_aside::products::{seed_products, InMemoryProductSource};
use cache_aside::store::RedisSettings;
use cache_aside::{spawn_cleanup_task, AppState, Config, KeyPrefix, KvStore, MemoryStore, RedisStore};

/// Main entry point for the cache-aside server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Seed the product source of truth
/// 4. Connect the cache store (Redis, or in-memory with a cleanup task)
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_aside=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cache-aside server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_enabled={}, backend={:?}, ttl={}m, prefix={:?}, single_flight={}, port={}",
        config.cache_enabled,
        config.backend,
        config.cache_duration_minutes,
        config.instance_name,
        config.single_flight,
        config.server_port
    );

    let products = Arc::new(InMemoryProductSource::with_products(seed_products(
        config.seed_count,
    )));
    info!("Seeded {} products", config.seed_count);

    let prefix = KeyPrefix::new(config.instance_name.clone());
    let (store, cleanup_handle): (Arc<dyn KvStore>, Option<JoinHandle<()>>) = match config.backend
    {
        BackendKind::Redis => {
            let store = RedisStore::connect(RedisSettings::from_config(&config), prefix)
                .await
                .context("invalid Redis configuration")?;
            let store: Arc<dyn KvStore> = Arc::new(store);
            (store, None)
        }
        BackendKind::Memory => {
            let memory = Arc::new(MemoryStore::new(prefix));
            let handle = spawn_cleanup_task(Arc::clone(&memory), config.cleanup_interval);
            info!("In-memory cache store with background cleanup started");
            let store: Arc<dyn KvStore> = memory;
            (store, Some(handle))
        }
    };

    let state = AppState::from_config(&config, store, products);
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

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops background work.
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
