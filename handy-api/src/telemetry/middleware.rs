//! Axum Middleware for HTTP Request Tracing and Metrics

use axum::{extract::Request, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::metrics;

/// 8-4-4-4-12 hex UUIDs.
static UUID_SEGMENT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}").ok()
});

/// 64-char conversation digests.
static DIGEST_SEGMENT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"/[0-9a-f]{64}(/|$)").ok());

/// Replace ids with `{id}` so metric labels stay low-cardinality.
pub fn normalize_path(path: &str) -> String {
    let mut result = path.to_string();
    if let Some(re) = UUID_SEGMENT.as_ref() {
        result = re.replace_all(&result, "{id}").into_owned();
    }
    if let Some(re) = DIGEST_SEGMENT.as_ref() {
        result = re.replace_all(&result, "/{id}$1").into_owned();
    }
    result
}

/// Wrap every request in a span, record Prometheus metrics, and log completion.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.route = %normalized_path,
    );
    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();
    if let Some(m) = metrics() {
        m.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );
    response
}
