//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hotdev_reload_cycles_total` (counter): reload cycles by outcome
//! - `hotdev_reload_duration_seconds` (histogram): shutdown→restart latency
//! - `hotdev_routes` (gauge): routes mounted on the current listener
//! - `hotdev_module_cache_entries` (gauge): modules currently cached
//! - `hotdev_handler_misses_total` (counter): actions bound to the stub handler
//! - `hotdev_rpc_calls_total` (counter): RPC invocations by feature and status
//!
//! Recording is a no-op until a recorder is installed, so unit tests never
//! need the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_reload(outcome: &'static str, started: Instant) {
    metrics::counter!("hotdev_reload_cycles_total", "outcome" => outcome).increment(1);
    metrics::histogram!("hotdev_reload_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Failed builds never start a cycle, so they carry no duration.
pub fn record_build_failure() {
    metrics::counter!("hotdev_reload_cycles_total", "outcome" => "build_failed").increment(1);
}

pub fn record_route_table(routes: usize) {
    metrics::gauge!("hotdev_routes").set(routes as f64);
}

pub fn record_module_cache(entries: usize) {
    metrics::gauge!("hotdev_module_cache_entries").set(entries as f64);
}

pub fn record_handler_miss(feature: &str, action: &str) {
    metrics::counter!(
        "hotdev_handler_misses_total",
        "feature" => feature.to_string(),
        "action" => action.to_string()
    )
    .increment(1);
}

pub fn record_rpc_call(feature: &str, status: u16) {
    metrics::counter!(
        "hotdev_rpc_calls_total",
        "feature" => feature.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
