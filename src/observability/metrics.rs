//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency, queue wait included
//! - `proxy_unauthorized_total` (counter): requests rejected by the gate
//! - `proxy_queue_rejected_total` (counter): requests rejected with 503
//! - `proxy_upstream_failures_total` (counter): jobs resolved with 502
//! - `proxy_queue_pending` / `proxy_queue_in_flight` (gauges)
//! - `proxy_queue_wait_seconds` (histogram): time from admission to dispatch

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_unauthorized() {
    counter!("proxy_unauthorized_total").increment(1);
}

pub fn record_rejected() {
    counter!("proxy_queue_rejected_total").increment(1);
}

pub fn record_upstream_failure() {
    counter!("proxy_upstream_failures_total").increment(1);
}

pub fn record_queue_depth(pending: usize, in_flight: usize) {
    gauge!("proxy_queue_pending").set(pending as f64);
    gauge!("proxy_queue_in_flight").set(in_flight as f64);
}

pub fn record_queue_wait(waited: Duration) {
    histogram!("proxy_queue_wait_seconds").record(waited.as_secs_f64());
}
