//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_renders_total` (counter): render dispatches by outcome
//! - `gateway_render_duration_seconds` (histogram): render latency
//! - `gateway_rate_limited_total` (counter): rejected requests
//!
//! # Design Decisions
//! - Updates are atomic increments; recording never blocks a request
//! - The Prometheus exporter runs on its own listener, away from the
//!   public surface

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one render dispatch and its latency.
pub fn record_render(outcome: &'static str, start: Instant) {
    counter!("gateway_renders_total", "outcome" => outcome).increment(1);
    histogram!("gateway_render_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record a rate-limit rejection.
pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}
