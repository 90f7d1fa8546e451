//! fc-server: HTTP surface and process wiring.
//!
//! This crate ties the ingest pipeline to a running server application. It
//! provides:
//!
//! - Axum-based HTTP routes for MJPEG streams, JPEG snapshots and device status
//! - Startup of the multicast receiver, keepalive responder and statistics sampler
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use fc_core::config::Config;
use fc_ingest::{keepalive, receiver, stats, DeviceRegistry, Reassembler};

use crate::context::AppContext;

/// Start the framecast server.
///
/// Binds the multicast group and the keepalive port (either failing is
/// fatal), spawns the background tasks, and serves HTTP until a shutdown
/// signal is received.
pub async fn start(config: Config) -> fc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let registry = Arc::new(DeviceRegistry::new());
    let reassembler = Arc::new(
        Reassembler::new(Arc::clone(&registry), &config.ingest)
            .with_retention(config.stream.retained_frames()),
    );

    let ingest_socket = receiver::bind_multicast(&config.ingest).map_err(|e| {
        fc_core::Error::Internal(format!(
            "Failed to join multicast group {}:{}: {e}",
            config.ingest.group, config.ingest.port
        ))
    })?;

    let keepalive_socket = if config.keepalive.enabled {
        let socket = keepalive::bind_keepalive(config.keepalive.port)
            .await
            .map_err(|e| {
                fc_core::Error::Internal(format!(
                    "Failed to bind keepalive port {}: {e}",
                    config.keepalive.port
                ))
            })?;
        Some(socket)
    } else {
        tracing::info!("Keepalive responder disabled");
        None
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| fc_core::Error::Internal(format!("Invalid server address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| fc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    // Cancellation token for graceful shutdown.
    let cancel = CancellationToken::new();
    let mut tasks = Vec::new();

    tasks.push(tokio::spawn(receiver::run_receiver(
        ingest_socket,
        reassembler,
        config.ingest.max_datagram_size,
        cancel.clone(),
    )));

    if let Some(socket) = keepalive_socket {
        tasks.push(tokio::spawn(keepalive::run_keepalive(
            socket,
            keepalive::control_blob(config.keepalive.blob),
            cancel.clone(),
        )));
    }

    match config.stats.interval() {
        Some(interval) => tasks.push(tokio::spawn(stats::run_stats(
            Arc::clone(&registry),
            interval,
            cancel.clone(),
        ))),
        None => tracing::info!("Statistics sampling disabled"),
    }

    let ctx = AppContext::new(Arc::new(config), registry).with_shutdown(cancel.clone());
    let app = router::build_router(ctx);

    tracing::info!("Starting server on {addr}");

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await;

    // Signal all background tasks to stop.
    cancel.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!("Background task failed: {e}");
        }
    }

    serve_result.map_err(|e| fc_core::Error::Internal(format!("HTTP server error: {e}")))?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
