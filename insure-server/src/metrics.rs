//! Prometheus metrics for the policy service

use axum::{extract::Request, middleware::Next, response::Response};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;

/// Initialize all metric descriptions
pub fn init_metrics() {
    // Counters
    describe_counter!("insure_http_requests_total", "Total number of HTTP requests by route and status");
    describe_counter!("insure_auth_failures_total", "Total number of rejected API keys by reason");
    describe_counter!("insure_policy_mutations_total", "Total number of successful policy mutations");
    describe_counter!("insure_validation_failures_total", "Total number of request bodies that failed validation");
    describe_counter!("insure_errors_total", "Total number of error responses by type");

    // Histograms
    describe_histogram!("insure_request_latency_seconds", "HTTP request latency in seconds");

    // Gauges
    describe_gauge!("insure_policies_count", "Number of stored policies");
    describe_gauge!("insure_products_count", "Number of catalog products");
}

/// Record a completed HTTP request
pub fn record_request(route: &str, status: u16, latency_seconds: f64) {
    counter!(
        "insure_http_requests_total",
        1,
        "route" => route.to_string(),
        "status" => status.to_string()
    );
    histogram!("insure_request_latency_seconds", latency_seconds, "route" => route.to_string());
}

/// Record a rejected API key
pub fn record_auth_failure(reason: &str) {
    counter!("insure_auth_failures_total", 1, "reason" => reason.to_string());
}

/// Record a successful create, update or delete
pub fn record_mutation(operation: &'static str) {
    counter!("insure_policy_mutations_total", 1, "operation" => operation);
}

/// Record a body that failed validation
pub fn record_validation_failure() {
    counter!("insure_validation_failures_total", 1);
}

/// Record an error response
pub fn record_error(error_type: &'static str) {
    counter!("insure_errors_total", 1, "type" => error_type);
}

/// Update store size gauges
pub fn update_store_metrics(policies: usize, products: usize) {
    gauge!("insure_policies_count", policies as f64);
    gauge!("insure_products_count", products as f64);
}

/// Middleware recording request count and latency per matched route
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    record_request(&route, response.status().as_u16(), start.elapsed().as_secs_f64());
    response
}

/// Storage for Prometheus handle
static PROMETHEUS_HANDLE: std::sync::OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
    std::sync::OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_prometheus() -> anyhow::Result<()> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.install_recorder()?;
    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("Failed to set Prometheus handle"))?;
    Ok(())
}

/// Get Prometheus metrics string
pub fn get_prometheus_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Prometheus metrics not initialized\n".to_string())
}
