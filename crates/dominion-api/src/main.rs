//! Dominion Server Binary
//!
//! Planetary conquest game server.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! dominion --config config.yaml
//!
//! # With environment variables only
//! DOMINION_STORAGE__BACKEND=memory dominion
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

use dominion_api::http::{create_router_with_observability, AppState};
use dominion_api::middleware::{cors_layer, RequestIdLayer, RequestLoggingLayer};
use dominion_api::observability::{init_logging, init_metrics, LoggingConfig, MetricsState};
use dominion_domain::AuthConfig;
use dominion_server::ServerConfig;
use dominion_storage::{DataStore, MemoryDataStore, PostgresConfig, PostgresDataStore};

/// Dominion - Planetary Conquest Game Server
#[derive(Parser, Debug)]
#[command(name = "dominion")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    // Initialize logging
    init_logging(LoggingConfig::from_settings(
        &config.logging.level,
        config.logging.json,
    ));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Dominion server"
    );

    // Initialize metrics (always enabled - config.metrics.enabled reserved for future use)
    // Note: metrics.path is currently hardcoded to /metrics in the router
    let metrics_state = init_metrics()?;
    if config.metrics.enabled {
        info!("Metrics enabled at /metrics");
    }

    let auth = AuthConfig::new(&config.auth.access_secret, &config.auth.refresh_secret);
    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create storage backend based on configuration
    match config.storage.backend.as_str() {
        "memory" => {
            info!("Using in-memory storage backend");
            let storage = Arc::new(MemoryDataStore::new());
            run_server(storage, addr, auth, request_timeout, metrics_state).await
        }
        "postgres" => {
            let database_url = config.storage.database_url.as_ref().ok_or_else(|| {
                anyhow::anyhow!("storage.database_url is required for the postgres backend")
            })?;

            info!("Connecting to PostgreSQL database");
            let pg_config = PostgresConfig {
                database_url: database_url.clone(),
                max_connections: config.storage.pool_size,
                min_connections: 1,
                connect_timeout_secs: config.storage.connection_timeout_secs,
                ..Default::default()
            };

            let storage = PostgresDataStore::from_config(&pg_config).await?;
            info!("PostgreSQL connection established");

            // Run database migrations
            info!("Running database migrations");
            storage.run_migrations().await?;
            info!("Database migrations complete");

            let storage = Arc::new(storage);
            run_server(storage, addr, auth, request_timeout, metrics_state).await
        }
        _ => {
            error!("Unknown storage backend: {}", config.storage.backend);
            anyhow::bail!("Unknown storage backend: {}", config.storage.backend);
        }
    }
}

/// Run the HTTP server with graceful shutdown.
async fn run_server<S>(
    storage: Arc<S>,
    addr: SocketAddr,
    auth: AuthConfig,
    request_timeout: Duration,
    metrics_state: MetricsState,
) -> anyhow::Result<()>
where
    S: DataStore + Send + Sync + 'static,
{
    let state = AppState::new(storage, auth);
    let router = create_router_with_observability(state, metrics_state)
        // Innermost first: the timeout bounds handler time, the logging
        // middleware reads the request id header the id layer injects.
        .layer(TimeoutLayer::new(request_timeout))
        .layer(RequestLoggingLayer)
        .layer(RequestIdLayer)
        .layer(cors_layer());

    info!(%addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args_parsing() {
        // Test with no args
        let args = Args::try_parse_from(["dominion"]).unwrap();
        assert!(args.config.is_none());

        // Test with config
        let args = Args::try_parse_from(["dominion", "--config", "config.yaml"]).unwrap();
        assert_eq!(args.config, Some("config.yaml".to_string()));

        // Test with short flag
        let args = Args::try_parse_from(["dominion", "-c", "test.yaml"]).unwrap();
        assert_eq!(args.config, Some("test.yaml".to_string()));
    }
}
