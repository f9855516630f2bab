//! Metrics collection and exposition.
//!
//! # Metrics
//! - `formsflow_requests_total` (counter): requests by method, route, status
//! - `formsflow_request_duration_seconds` (histogram): request latency
//! - `formsflow_keycloak_calls_total` (counter): admin API calls by operation, status
//! - `formsflow_keycloak_call_duration_seconds` (histogram): admin API latency
//! - `formsflow_sentiment_classifications_total` (counter): classifications by label

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("route", route.to_string()),
        Label::new("status", status.to_string()),
    ];
    counter!("formsflow_requests_total", labels.clone()).increment(1);
    histogram!("formsflow_request_duration_seconds", labels).record(start.elapsed().as_secs_f64());
}

/// Status `0` marks a transport failure.
pub fn record_keycloak_call(operation: &'static str, status: u16, start: Instant) {
    let labels = vec![Label::new("operation", operation), Label::new("status", status.to_string())];
    counter!("formsflow_keycloak_calls_total", labels.clone()).increment(1);
    histogram!("formsflow_keycloak_call_duration_seconds", labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_classification(label: &str) {
    counter!("formsflow_sentiment_classifications_total", "label" => label.to_string())
        .increment(1);
}
