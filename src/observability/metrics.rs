//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_sessions_opened_total` (counter)
//! - `gateway_sessions_closed_total` (counter)
//! - `gateway_events_dropped_total` (counter): stream-write failures
//! - `gateway_rpc_messages_total` (counter): by outcome label
//!
//! # Design Decisions
//! - Low-overhead updates (atomic increments behind the `metrics` facade)
//! - Recording works with or without an installed exporter

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "failed to install metrics exporter"),
    }
}

pub fn record_session_opened() {
    counter!("gateway_sessions_opened_total").increment(1);
}

pub fn record_session_closed() {
    counter!("gateway_sessions_closed_total").increment(1);
}

pub fn record_event_dropped() {
    counter!("gateway_events_dropped_total").increment(1);
}

/// Record one dispatched message by outcome
/// (`ok` | `failed` | `parse_error` | `unknown_operation`).
pub fn record_rpc(outcome: &'static str) {
    counter!("gateway_rpc_messages_total", "outcome" => outcome).increment(1);
}
