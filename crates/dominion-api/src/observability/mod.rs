//! Observability infrastructure for the Dominion server.
//!
//! This module provides:
//! - Prometheus metrics endpoint
//! - Structured logging configuration

mod logging;
mod metrics;

pub use logging::{create_json_layer, init_logging, LoggingConfig};
pub use metrics::{init_metrics, metrics_handler, MetricsError, MetricsState};
