//! Sloth Relayer binary.

use sloth_relayer::{create_router, AppState, Config};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const NOTIFY_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sloth Relayer");

    // Every field has a default, so only malformed values land here.
    let config = Config::load().unwrap_or_else(|e| {
        error!(error = %e, "FATAL: Config error, fix env vars or relayer.toml");
        std::process::exit(1);
    });

    info!(
        rpc = %config.rpc_url,
        factory = %config.factory_address,
        indexer = %config.indexer_api_url,
        "Configuration loaded"
    );

    let bind_address = config.bind_address.clone();
    let cancel = CancellationToken::new();
    let state = Arc::new(AppState::new(config, cancel.clone()).await?);

    info!(
        relayer = %state.relayer.relayer_address(),
        chain_id = state.chain_id,
        "Relayer ready"
    );

    let app = create_router(Arc::clone(&state));

    info!(address = %bind_address, "Listening");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    info!("HTTP server stopped, draining indexer notifications...");
    state.forwarder.drain(NOTIFY_DRAIN_TIMEOUT).await;

    info!("Relayer shut down gracefully");
    Ok(())
}

/// Resolves on SIGINT/SIGTERM after cancelling pending inclusion waits.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }

    // In-flight relays see a transport fault instead of holding the drain.
    cancel.cancel();
}
