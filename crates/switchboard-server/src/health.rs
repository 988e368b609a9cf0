//! `/health` endpoint.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;

use crate::hub::Hub;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server runs.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Total open connections.
    pub connections: usize,
    /// Open connections per role.
    pub roles: BTreeMap<String, usize>,
    /// Connected distributed servers.
    pub distributed_servers: usize,
    /// Distributed tool calls awaiting a result.
    pub pending_calls: usize,
    /// Bridge control clients waiting for a page snapshot.
    pub waiting_bridge_clients: usize,
}

/// Build a health response from the hub's live state.
pub fn health_check(start_time: Instant, hub: &Hub) -> HealthResponse {
    let roles: BTreeMap<String, usize> = hub
        .role_counts()
        .into_iter()
        .map(|(role, n)| (role.as_str().to_owned(), n))
        .collect();
    HealthResponse {
        status: "ok".into(),
        version: switchboard_core::constants::VERSION.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections: roles.values().sum(),
        distributed_servers: hub.distributed_servers().len(),
        pending_calls: hub.pending_calls(),
        waiting_bridge_clients: hub.waiting_bridge_clients(),
        roles,
    }
}
