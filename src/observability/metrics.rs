//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_routers_started_total` (counter): routers whose serve task began
//! - `edge_routers_active` (gauge): routers currently serving
//! - `edge_routers_stopped_total` (counter): router tasks that ended, by reason
//!   (`completed` or the serve error kind)
//! - `edge_connections_total` (counter): accepted passthrough connections
//! - `edge_connections_active` (gauge): passthrough connections in flight
//! - `edge_relayed_bytes_total` (counter): passthrough bytes, by direction
//! - `edge_upstream_errors_total` (counter): failed upstream dials/requests
//! - `edge_mux_requests_total` (counter): multiplexed requests, by status
//! - `edge_memory_reclaims_total` (counter): allocator release passes
//!
//! # Design Decisions
//! - Recording is always on; without an installed recorder the macros are no-ops
//! - The Prometheus recorder is installed only with the diagnostic endpoint

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const ROUTERS_STARTED_TOTAL: &str = "edge_routers_started_total";
pub const ROUTERS_ACTIVE: &str = "edge_routers_active";
pub const ROUTERS_STOPPED_TOTAL: &str = "edge_routers_stopped_total";
pub const CONNECTIONS_TOTAL: &str = "edge_connections_total";
pub const CONNECTIONS_ACTIVE: &str = "edge_connections_active";
pub const RELAYED_BYTES_TOTAL: &str = "edge_relayed_bytes_total";
pub const UPSTREAM_ERRORS_TOTAL: &str = "edge_upstream_errors_total";
pub const MUX_REQUESTS_TOTAL: &str = "edge_mux_requests_total";
pub const MEMORY_RECLAIMS_TOTAL: &str = "edge_memory_reclaims_total";

/// Install the process-wide Prometheus recorder.
///
/// Fails if a recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

#[inline]
pub fn record_router_started() {
    counter!(ROUTERS_STARTED_TOTAL).increment(1);
    gauge!(ROUTERS_ACTIVE).increment(1.0);
}

/// Record a router task ending (reason: "completed", "unsupported", "bind", ...).
#[inline]
pub fn record_router_stopped(reason: &'static str) {
    gauge!(ROUTERS_ACTIVE).decrement(1.0);
    counter!(ROUTERS_STOPPED_TOTAL, "reason" => reason).increment(1);
}

#[inline]
pub fn record_connection_opened() {
    counter!(CONNECTIONS_TOTAL).increment(1);
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Record a passthrough connection closing with its byte counts.
#[inline]
pub fn record_connection_closed(sent: u64, received: u64) {
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
    counter!(RELAYED_BYTES_TOTAL, "direction" => "upstream").increment(sent);
    counter!(RELAYED_BYTES_TOTAL, "direction" => "downstream").increment(received);
}

#[inline]
pub fn record_upstream_error() {
    counter!(UPSTREAM_ERRORS_TOTAL).increment(1);
}

#[inline]
pub fn record_mux_request(status: u16) {
    counter!(MUX_REQUESTS_TOTAL, "status" => status.to_string()).increment(1);
}

#[inline]
pub fn record_memory_reclaim() {
    counter!(MEMORY_RECLAIMS_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_stop_reasons_share_one_counter() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_router_started();
            record_router_stopped("completed");
            record_router_stopped("bind");
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"edge_routers_stopped_total{reason="completed"} 1"#));
        assert!(rendered.contains(r#"edge_routers_stopped_total{reason="bind"} 1"#));
        assert!(!rendered.contains("failures"));
    }
}
