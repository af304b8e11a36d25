use anyhow::{anyhow, Context, Result};
use geoallot::api::{create_app, AppState};
use geoallot::catalog::PlotCatalog;
use geoallot::config::{load_config, GeoAllotConfig};
use geoallot::store;
use geoallot::sync::SyncBroadcaster;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "geoallot.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geoallot=info".into()),
        )
        .init();

    info!("GeoAllot starting...");

    // File config (optional), then environment overrides
    let config_path =
        std::env::var("GEOALLOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = if Path::new(&config_path).exists() {
        load_config(&config_path)
            .map_err(|e| anyhow!("Failed to load config from {}: {}", config_path, e))?
    } else {
        GeoAllotConfig::default()
    };
    config.apply_env();

    info!(
        bind = %config.server.bind_addr(),
        backend = ?config.store.backend,
        cors_origin = %config.server.cors_origin,
        fanout = ?config.sync.fanout,
        "Configuration loaded"
    );

    // Store pool is opened once, before any request is served
    let store = store::open(&config.store)
        .await
        .context("Failed to open plot store")?;
    let broadcaster = Arc::new(SyncBroadcaster::with_policy(
        config.sync.session_queue_capacity,
        config.sync.fanout,
    ));
    let catalog = Arc::new(PlotCatalog::new(store, broadcaster));

    let app = create_app(
        AppState {
            catalog: Arc::clone(&catalog),
            max_body_bytes: config.server.max_body_bytes,
        },
        &config.server.cors_origin,
    );

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr())
        .await
        .context("Failed to bind HTTP port")?;
    info!(addr = %config.server.bind_addr(), "GeoAllot listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    // Graceful shutdown
    catalog.shutdown().await;
    info!("GeoAllot stopped");

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
