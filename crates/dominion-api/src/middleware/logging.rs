//! Request telemetry middleware.
//!
//! Logs every request and records Prometheus counters and latency
//! histograms through the `metrics` facade. Metric labels use the matched
//! route pattern rather than the raw path, so `/planets/:planet_id` stays
//! one series no matter how many planets exist.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::{
    extract::MatchedPath,
    http::{Request, Response},
};
use tower::{Layer, Service};
use tracing::info;

/// Layer that logs requests and records request metrics.
#[derive(Clone, Default)]
pub struct RequestLoggingLayer;

impl RequestLoggingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLoggingLayer {
    type Service = RequestLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLoggingService { inner }
    }
}

/// Service that logs request/response details and emits request metrics.
#[derive(Clone)]
pub struct RequestLoggingService<S> {
    inner: S,
}

fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLoggingService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let version = request.version();

        // Matched route pattern keeps label cardinality bounded; requests
        // that matched no route (404s) fall back to the raw path.
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());

        let request_id = request
            .headers()
            .get(super::REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();

        let start = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            info!(
                target: "dominion::http",
                request_id = %request_id,
                method = %method,
                uri = %uri,
                version = ?version,
                "request started"
            );

            let response = inner.call(request).await?;
            let duration = start.elapsed();
            let status = response.status().as_u16();

            info!(
                target: "dominion::http",
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status = %status,
                duration_ms = duration.as_millis() as u64,
                "request completed"
            );

            let labels = [
                ("method", method.to_string()),
                ("route", route),
                ("status_class", status_class(status).to_string()),
            ];
            metrics::counter!("dominion_http_requests_total", &labels).increment(1);
            metrics::histogram!("dominion_http_request_duration_seconds", &labels)
                .record(duration.as_secs_f64());

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class_buckets() {
        assert_eq!(status_class(200), "2xx");
        assert_eq!(status_class(204), "2xx");
        assert_eq!(status_class(308), "3xx");
        assert_eq!(status_class(404), "4xx");
        assert_eq!(status_class(503), "5xx");
        assert_eq!(status_class(101), "other");
    }

    /// Test: Metrics emission is a no-op without an installed recorder
    #[test]
    fn test_metrics_emit_without_recorder() {
        let labels = [
            ("method", "GET".to_string()),
            ("route", "/health".to_string()),
            ("status_class", "2xx".to_string()),
        ];
        metrics::counter!("dominion_http_requests_total", &labels).increment(1);
        metrics::histogram!("dominion_http_request_duration_seconds", &labels).record(0.001);
    }
}
