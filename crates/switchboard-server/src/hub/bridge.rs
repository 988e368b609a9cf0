//! Browser-bridge relay state.
//!
//! Commands and their results are routed by the source connection id the
//! hub writes into each forwarded command, so only the page-snapshot path
//! needs state here: control clients that asked for the next snapshot.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use switchboard_core::{ConnectionId, RequestId, Role};
use switchboard_protocol::outbound;
use tracing::debug;

use super::registry::ClientRegistry;

/// Control clients waiting for a page snapshot, keyed by connection.
#[derive(Default)]
pub struct BridgeRelay {
    waiting: BTreeMap<ConnectionId, Option<RequestId>>,
}

impl BridgeRelay {
    /// Empty waiting list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `connection` wants the next snapshot. A later command
    /// from the same connection replaces its request id.
    pub fn wait(&mut self, connection: ConnectionId, request_id: Option<RequestId>) {
        let _ = self.waiting.insert(connection, request_id);
    }

    /// Drop a waiter without delivering anything.
    pub fn forget(&mut self, connection: &str) -> bool {
        self.waiting.remove(connection).is_some()
    }

    /// Whether `connection` is waiting.
    pub fn is_waiting(&self, connection: &str) -> bool {
        self.waiting.contains_key(connection)
    }

    /// Push `snapshot` to every waiter. Waiters whose frame was queued are
    /// removed; a waiter whose queue is full stays for the next snapshot.
    /// Returns the number delivered.
    pub fn deliver(&mut self, clients: &ClientRegistry, snapshot: &Map<String, Value>) -> usize {
        let mut delivered = 0;
        self.waiting.retain(|conn_id, request_id| {
            let Some(conn) = clients.get_in(Role::BridgeControl, conn_id) else {
                return false;
            };
            let frame = outbound::page_info_update(request_id.as_ref(), snapshot);
            if conn.send_envelope(&frame) {
                debug!(conn_id = %conn_id, request_id = ?request_id, "page_info_update pushed");
                delivered += 1;
                false
            } else {
                true
            }
        });
        delivered
    }

    /// Number of waiters.
    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    /// Whether nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
