//! Parlayer - projection line-movement cache
//!
//! HTTP service that fetches the projections board, tracks line movement
//! against a persisted snapshot, and expires stale projections.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parlayer::api::{create_router, AppState};
use parlayer::cache::{FileBackend, KvBackend, MemoryBackend};
use parlayer::config::Config;
use parlayer::feed::{HttpFeed, ProjectionFeed};
use parlayer::tasks::{spawn_refresh_task, spawn_sweep_task};

/// Main entry point for the Parlayer service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the snapshot backend (file or in-memory)
/// 4. Start background sweep and refresh tasks
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlayer=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Parlayer projection service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, key={}, snapshot_ttl={}s, retention={}s, sweep_interval={}s, refresh_interval={}s",
        config.server_port,
        config.cache_key,
        config.snapshot_ttl,
        config.projection_retention,
        config.sweep_interval,
        config.refresh_interval
    );

    let backend: Arc<dyn KvBackend> = match &config.snapshot_dir {
        Some(dir) => {
            let backend = FileBackend::open(dir.clone())
                .await
                .with_context(|| format!("opening snapshot directory {}", dir.display()))?;
            info!("Snapshot backend: files in {}", backend.dir().display());
            Arc::new(backend)
        }
        None => {
            info!("Snapshot backend: in-memory");
            Arc::new(MemoryBackend::new())
        }
    };

    let feed: Arc<dyn ProjectionFeed> = Arc::new(HttpFeed::from_config(&config));
    let state = AppState::from_config(&config, backend, feed.clone());

    let mut tasks = vec![spawn_sweep_task(state.tracker.clone(), config.sweep_interval)];
    if let Some(handle) = spawn_refresh_task(feed, state.tracker.clone(), config.refresh_interval) {
        tasks.push(handle);
    }
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts background tasks.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
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

    for task in tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
