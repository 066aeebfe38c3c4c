//! Prometheus Metrics Definitions
//!
//! Defines all Handy metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once on first use
pub static METRICS: Lazy<ApiResult<HandyMetrics>> = Lazy::new(HandyMetrics::new);

/// The registered metrics, or `None` if registration failed at startup.
pub fn metrics() -> Option<&'static HandyMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all Handy metrics.
#[derive(Clone)]
pub struct HandyMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Current active WebSocket connections
    pub websocket_connections: Gauge,

    /// Marketplace operations - labels: operation, outcome
    pub domain_operations_total: CounterVec,
}

impl HandyMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "handy_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "handy_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            websocket_connections: register_gauge!(
                "handy_websocket_connections",
                "Current number of active WebSocket connections"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register websocket_connections: {}", e)))?,

            domain_operations_total: register_counter_vec!(
                "handy_domain_operations_total",
                "Marketplace operations by outcome",
                &["operation", "outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register domain_operations_total: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a marketplace operation. `outcome` is `ok` or the error code name.
    pub fn record_operation(&self, operation: &str, outcome: &str) {
        self.domain_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn ws_connected(&self) {
        self.websocket_connections.inc();
    }

    pub fn ws_disconnected(&self) {
        self.websocket_connections.dec();
    }
}

/// Count one domain operation by outcome and pass the result through.
pub fn track<T, E: Into<ApiError>>(operation: &str, result: Result<T, E>) -> ApiResult<T> {
    let result = result.map_err(Into::into);
    if let Some(m) = metrics() {
        let outcome = match &result {
            Ok(_) => "ok".to_string(),
            Err(e) => e.code.to_string(),
        };
        m.record_operation(operation, &outcome);
    }
    result
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // Touch the lazy so a fresh process still reports the Handy families.
    let _ = metrics();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
