//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): proxied requests by service, status
//! - `gateway_request_duration_seconds` (histogram): latency by service
//! - `gateway_upstream_failures_total` (counter): by service, failure kind
//! - `gateway_route_misses_total` (counter): requests owned by no service
//! - `gateway_service_health` (gauge): 1=healthy, 0=unhealthy, per service
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(service: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "service" => service.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_failure(service: &str, kind: &'static str) {
    counter!(
        "gateway_upstream_failures_total",
        "service" => service.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_route_miss() {
    counter!("gateway_route_misses_total").increment(1);
}

pub fn record_service_health(service: &str, healthy: bool) {
    gauge!("gateway_service_health", "service" => service.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
