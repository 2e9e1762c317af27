//! Fallback Cache - cache administration server
//!
//! Serves the cache over HTTP and runs its maintenance tasks.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fallback_cache::api::create_router;
use fallback_cache::{spawn_cleanup_task, spawn_reconnect_task, AppState, CacheService, Config};

/// Startup sequence:
/// 1. Initialize tracing
/// 2. Load configuration from environment variables
/// 3. Build the cache (one Redis connection attempt when enabled)
/// 4. Start the cleanup and reconnect tasks
/// 5. Serve the router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fallback_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Fallback Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: redis_enabled={}, redis={}:{}, max_entries={}, port={}, cleanup_interval={}s",
        config.redis_enabled,
        config.redis_host,
        config.redis_port,
        config.max_entries,
        config.server_port,
        config.cleanup_interval
    );

    let cache = Arc::new(
        CacheService::from_config(&config)
            .await
            .context("failed to build cache")?,
    );
    info!(
        "Cache initialized (durable backend active: {})",
        cache.is_durable_active()
    );

    let mut handles = vec![spawn_cleanup_task(cache.clone(), config.cleanup_interval)];
    handles.extend(spawn_reconnect_task(cache.clone(), config.reconnect_interval));
    info!("Background tasks started");

    let app = create_router(AppState::new(cache.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(handles))
        .await
        .context("server error")?;

    cache.disconnect().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then stops the background tasks.
async fn shutdown_signal(handles: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

    for handle in &handles {
        handle.abort();
    }
    warn!("Background tasks aborted");
}
