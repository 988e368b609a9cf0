//! Prometheus recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus recorder.
///
/// Call once at startup before anything is recorded. The returned handle
/// renders `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Handshakes completed (counter, labels: role).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Open connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Handshakes refused before upgrade (counter, labels: reason).
pub const WS_REJECTED_HANDSHAKES_TOTAL: &str = "ws_rejected_handshakes_total";
/// Outbound frames dropped on a full or closed queue (counter, labels: role).
pub const WS_DROPPED_FRAMES_TOTAL: &str = "ws_dropped_frames_total";
/// Inbound frames that failed to decode (counter).
pub const WS_MALFORMED_FRAMES_TOTAL: &str = "ws_malformed_frames_total";
/// Distributed tool calls by terminal outcome (counter, labels: outcome).
pub const RPC_CALLS_TOTAL: &str = "rpc_calls_total";
/// Distributed tool calls in flight (gauge).
pub const RPC_CALLS_PENDING: &str = "rpc_calls_pending";
/// Frames queued by broadcast fan-out (counter).
pub const BROADCAST_DELIVERIES_TOTAL: &str = "broadcast_deliveries_total";
/// Bridge commands relayed to an observer (counter).
pub const BRIDGE_COMMANDS_TOTAL: &str = "bridge_commands_total";
