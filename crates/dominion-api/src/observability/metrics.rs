//! Prometheus metrics infrastructure.
//!
//! Uses the `metrics` facade with `metrics-exporter-prometheus` for
//! exposition.
//!
//! # Metrics Exposed
//!
//! - `dominion_http_requests_total` - Total HTTP requests by method, route, status class
//! - `dominion_http_request_duration_seconds` - Request duration histogram
//! - `dominion_logins_total` - Login attempts by outcome
//! - `dominion_registrations_total` - Registration attempts by outcome
//! - `dominion_battles_total` - Resolved battles by outcome
//! - `dominion_storage_query_duration_seconds` - Storage query latency (from dominion-storage)
//! - `dominion_storage_query_timeout_total` - Storage query timeouts (from dominion-storage)

use std::sync::Arc;

use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Shared state containing the Prometheus handle for metrics rendering.
#[derive(Clone)]
pub struct MetricsState {
    handle: Arc<PrometheusHandle>,
}

impl MetricsState {
    /// Creates a new metrics state with the given Prometheus handle.
    pub fn new(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Renders the current metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Error type for metrics initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus recorder: recorder already installed")]
    AlreadyInstalled,
}

/// Initializes the Prometheus metrics recorder.
///
/// Must be called once at application startup before any metrics are
/// recorded. Returns a handle that renders the scrape output.
///
/// # Errors
///
/// Returns an error if the recorder is already installed.
pub fn init_metrics() -> Result<MetricsState, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|_| MetricsError::AlreadyInstalled)?;

    register_default_metrics();

    Ok(MetricsState::new(handle))
}

/// Describes the metrics this process emits.
///
/// Recording happens in the telemetry middleware, the HTTP handlers, and
/// the storage backends.
fn register_default_metrics() {
    metrics::describe_counter!(
        "dominion_http_requests_total",
        "Total number of HTTP requests"
    );
    metrics::describe_histogram!(
        "dominion_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "dominion_logins_total",
        "Total number of login attempts by outcome"
    );
    metrics::describe_counter!(
        "dominion_registrations_total",
        "Total number of registration attempts by outcome"
    );
    metrics::describe_counter!(
        "dominion_battles_total",
        "Total number of resolved battles by outcome"
    );

    metrics::describe_histogram!(
        "dominion_storage_query_duration_seconds",
        "Storage query duration in seconds by operation, backend, and status"
    );
    metrics::describe_counter!(
        "dominion_storage_query_timeout_total",
        "Total number of storage query timeouts by operation and backend"
    );
}

/// Prometheus exposition format content type.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handler for the `/metrics` endpoint.
///
/// Returns Prometheus metrics in text format with proper content-type header.
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], state.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests build a detached recorder instead of installing the
    // global one, so they can run alongside tests that install it.

    #[test]
    fn test_metrics_state_can_be_cloned() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let state = MetricsState::new(handle);
        let _cloned = state.clone();
    }

    /// Test: Recorded counters show up in the rendered scrape output
    #[test]
    fn test_render_includes_recorded_counter() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = MetricsState::new(recorder.handle());

        metrics::with_local_recorder(&recorder, || {
            metrics::counter!("dominion_battles_total", "outcome" => "attacker").increment(1);
        });

        let output = state.render();
        assert!(output.contains("dominion_battles_total"));
        assert!(output.contains("outcome=\"attacker\""));
    }
}
