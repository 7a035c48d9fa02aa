//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define registry metrics (builds, routes, matches)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `edge_registry_builds_total` (counter): builds by outcome
//! - `edge_registry_build_duration_seconds` (histogram): build latency
//! - `edge_registry_routes` (gauge): routes in the installed table
//! - `edge_registry_matches_total` (counter): route lookups by matched/unmatched
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Outcome label is `success` or `failure`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_build(success: bool, start: Instant) {
    let outcome = if success { "success" } else { "failure" };
    counter!("edge_registry_builds_total", "outcome" => outcome).increment(1);
    histogram!("edge_registry_build_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn set_routes(count: usize) {
    gauge!("edge_registry_routes").set(count as f64);
}

pub fn record_match(matched: bool) {
    let matched = if matched { "true" } else { "false" };
    counter!("edge_registry_matches_total", "matched" => matched).increment(1);
}
