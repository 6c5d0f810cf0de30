//! Venue Service
//!
//! Entry point for the venue discovery web application.

use common::clock::SystemClock;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use venue_service::config::Config;
use venue_service::observability::metrics::init_metrics_recorder;
use venue_service::routes::{self, AppState};
use venue_service::tasks::start_key_refresh;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "venue_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Venue Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        project_id = %config.project_id,
        keys_url = %config.keys_url,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        anyhow::anyhow!(e)
    })?;

    let bind_address = config.bind_address.clone();
    let drain_seconds = config.drain_seconds;
    let key_refresh_interval = config.key_refresh_interval;

    let state = Arc::new(AppState::new(config, Arc::new(SystemClock)));

    let cancel_token = CancellationToken::new();
    let key_refresh_handle = key_refresh_interval.map(|interval| {
        tokio::spawn(start_key_refresh(
            state.verifier.key_cache().clone(),
            interval,
            cancel_token.clone(),
        ))
    });
    if key_refresh_handle.is_none() {
        info!("Background key refresh disabled; keys are fetched on demand");
    }

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Venue Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(drain_seconds))
    .await?;

    cancel_token.cancel();
    if let Some(handle) = key_refresh_handle {
        if let Err(e) = handle.await {
            warn!("Key refresh task ended abnormally: {}", e);
        }
    }

    info!("Venue Service shutdown complete");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM, after the drain period.
async fn shutdown_signal(drain_seconds: u64) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    if drain_seconds > 0 {
        warn!("Draining connections for {} seconds...", drain_seconds);
        tokio::time::sleep(Duration::from_secs(drain_seconds)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (DRAIN_SECONDS=0)");
    }
}
