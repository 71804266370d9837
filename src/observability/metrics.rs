//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by app, method, status
//! - `gateway_request_duration_seconds` (histogram): latency by app
//! - `gateway_upstream_retries_total` (counter): repeated upstream attempts
//! - `gateway_cache_events_total` (counter): hit / miss / store / flush by app
//! - `gateway_rate_limited_total` (counter): rejected requests by app
//! - `gateway_auth_denied_total` (counter): denied requests by app

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(app: &str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "app" => app.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "app" => app.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_retry() {
    metrics::counter!("gateway_upstream_retries_total").increment(1);
}

pub fn record_cache_event(app: &str, event: &'static str) {
    metrics::counter!("gateway_cache_events_total", "app" => app.to_string(), "event" => event)
        .increment(1);
}

pub fn record_rate_limited(app: &str) {
    metrics::counter!("gateway_rate_limited_total", "app" => app.to_string()).increment(1);
}

pub fn record_auth_denied(app: &str) {
    metrics::counter!("gateway_auth_denied_total", "app" => app.to_string()).increment(1);
}
