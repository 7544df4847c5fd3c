//! EZ Cache - A small blob cache server with a live event stream
//!
//! Stores named blobs in a bounded in-memory cache with idle-TTL expiration
//! and LRU eviction, and pushes periodic server-sent events to subscribers.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::{signal, task::JoinHandle};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ez_cache::{
    api::create_router, events::EventStream, spawn_cleanup_task, spawn_event_producer, AppState,
    Config,
};

/// Main entry point for the EZ Cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache store and event stream
/// 4. Start background TTL cleanup task and event producer
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ez_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EZ Cache Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, entry_ttl={}s, max_blob_size={}, port={}, cleanup_interval={}s, event_interval={}ms",
        config.max_entries,
        config.entry_ttl,
        config.max_blob_size,
        config.server_port,
        config.cleanup_interval,
        config.event_interval_ms
    );

    let state = AppState::from_config(&config);
    info!("Cache store and event stream initialized");

    let background = vec![
        spawn_cleanup_task(
            state.cache.clone(),
            Duration::from_secs(config.cleanup_interval.max(1)),
        ),
        spawn_event_producer(
            state.events.clone(),
            Duration::from_millis(config.event_interval_ms.max(1)),
        ),
    ];
    info!("Background tasks started");

    let events = state.events.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(events, background))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and closes the event
/// stream so open subscriber connections finish and shutdown can complete.
async fn shutdown_signal(events: EventStream, background: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
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

    for handle in background {
        handle.abort();
    }
    warn!("Background tasks aborted");

    events.close();
    info!("Event stream closed");
}
