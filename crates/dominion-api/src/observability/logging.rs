//! Structured logging configuration.
//!
//! Configures `tracing-subscriber` for either JSON output (production) or
//! pretty text output (development).
//!
//! # Log Format
//!
//! When JSON formatting is enabled, log entries are output as JSON objects:
//!
//! ```json
//! {"timestamp":"2026-01-15T10:30:00.000Z","level":"INFO","target":"dominion","message":"Server started","fields":{}}
//! ```

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration for structured logging.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Whether to use JSON format (true) or text format (false)
    pub json_format: bool,
    /// The default log level if RUST_LOG is not set
    pub default_level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            default_level: Level::INFO,
        }
    }
}

impl LoggingConfig {
    /// Builds a logging configuration from the server's logging settings.
    ///
    /// The level arrives as a string from the config layer. Unknown names
    /// fall back to `info`; config validation rejects them before startup
    /// reaches this point, so the fallback only covers direct callers.
    pub fn from_settings(level: &str, json_format: bool) -> Self {
        Self {
            json_format,
            default_level: Level::from_str(level).unwrap_or(Level::INFO),
        }
    }
}

/// Initialize the logging subsystem with the given configuration.
///
/// Call once at application startup. The subscriber is global, so repeated
/// calls after the first have no effect.
pub fn init_logging(config: LoggingConfig) {
    // RUST_LOG wins over the configured default level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()));

    if config.json_format {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        );
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_target(true));
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Creates a JSON-formatted subscriber writing to the given writer.
///
/// Lets tests capture and assert on JSON log output.
pub fn create_json_layer<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(EnvFilter::new("trace"))
        .with(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(true),
        )
}
