//! The hub aggregate.
//!
//! [`Hub`] owns every piece of shared state (client registry, tool
//! directory, pending calls, bridge waiting list) behind one lock, so a
//! disconnect cascades through all of them before any other frame can
//! observe the connection. Plugin-runtime callbacks run after the lock is
//! released.

pub mod bridge;
pub mod broadcast;
pub mod correlator;
pub mod directory;
pub mod registry;
pub mod router;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::Mutex;
use switchboard_core::constants::BRIDGE_SERVICE_MODULE;
use switchboard_core::{ConnectionId, Role};
use switchboard_protocol::outbound;
use tracing::{info, warn};

use self::bridge::BridgeRelay;
use self::correlator::PendingCalls;
use self::directory::{DistributedServerRecord, ToolDirectory};
use self::registry::ClientRegistry;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL};
use crate::runtime::PluginRuntime;
use crate::websocket::connection::ClientConnection;

/// State guarded by the hub lock.
pub(crate) struct HubState {
    pub(crate) clients: ClientRegistry,
    pub(crate) directory: ToolDirectory,
    pub(crate) calls: PendingCalls,
    pub(crate) bridge: BridgeRelay,
}

/// Shared state for every connection, plus the plugin-runtime collaborator.
pub struct Hub {
    state: Mutex<HubState>,
    runtime: Arc<dyn PluginRuntime>,
}

impl Hub {
    /// Create an empty hub. `internal_tools` are never exposed in the
    /// shared directory.
    pub fn new(
        runtime: Arc<dyn PluginRuntime>,
        internal_tools: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            state: Mutex::new(HubState {
                clients: ClientRegistry::new(),
                directory: ToolDirectory::new(internal_tools),
                calls: PendingCalls::new(),
                bridge: BridgeRelay::new(),
            }),
            runtime,
        }
    }

    /// The plugin-runtime collaborator.
    pub fn runtime(&self) -> &Arc<dyn PluginRuntime> {
        &self.runtime
    }

    /// Register a connection that just completed its handshake.
    pub fn connect(&self, connection: Arc<ClientConnection>) {
        let role = connection.role;
        {
            let mut state = self.state.lock();
            if role == Role::DistributedServer {
                state.directory.create(connection.id.clone());
            }
            state.clients.insert(Arc::clone(&connection));
        }
        counter!(WS_CONNECTIONS_TOTAL, "role" => role.as_str()).increment(1);
        gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
        info!(conn_id = %connection.id, role = %role, "client connected");

        if role.receives_ack() && !connection.send_envelope(&outbound::connection_ack(role)) {
            warn!(conn_id = %connection.id, "failed to queue connection_ack");
        }
        if role == Role::BridgeObserver {
            if let Some(module) = self.runtime.service_module(BRIDGE_SERVICE_MODULE) {
                module.handle_new_client(&connection);
            }
        }
    }

    /// Remove a connection and everything that references it.
    ///
    /// Idempotent: returns `false` if the id was not registered.
    pub fn disconnect(&self, id: &str) -> bool {
        let (connection, record, rejected) = {
            let mut state = self.state.lock();
            let Some(connection) = state.clients.remove(id) else {
                return false;
            };
            let mut record = None;
            let mut rejected = 0;
            match connection.role {
                Role::DistributedServer => {
                    record = state.directory.unregister_all(id);
                    rejected = state.calls.reject_server(id);
                }
                Role::BridgeControl => {
                    let _ = state.bridge.forget(id);
                }
                _ => {}
            }
            (connection, record, rejected)
        };

        gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
        if connection.role == Role::BridgeObserver {
            if let Some(module) = self.runtime.service_module(BRIDGE_SERVICE_MODULE) {
                module.handle_client_closed(&connection.id);
            }
        }
        if let Some(record) = record {
            self.runtime.unregister_all_distributed_tools(&connection.id);
            info!(
                server_id = %connection.id,
                server_name = record.server_name.as_deref().unwrap_or(""),
                tools = record.tools.len(),
                rejected_calls = rejected,
                "distributed server removed"
            );
        }
        info!(
            conn_id = %connection.id,
            role = %connection.role,
            dropped_frames = connection.drop_count(),
            "client disconnected"
        );
        true
    }

    /// Total registered connections.
    pub fn connection_count(&self) -> usize {
        self.state.lock().clients.len()
    }

    /// Connection count per role.
    pub fn role_counts(&self) -> BTreeMap<Role, usize> {
        self.state.lock().clients.counts()
    }

    /// Snapshot of every distributed server record.
    pub fn distributed_servers(&self) -> Vec<DistributedServerRecord> {
        self.state.lock().directory.snapshot()
    }

    /// Record for one distributed server.
    pub fn distributed_server(&self, server_id: &str) -> Option<DistributedServerRecord> {
        self.state.lock().directory.get(server_id).cloned()
    }

    /// Display name (or id) of the node that reported `ip`.
    pub fn server_for_ip(&self, ip: &str) -> Option<String> {
        self.state.lock().directory.server_for_ip(ip)
    }

    /// Union of every connected node's advertised tools.
    pub fn exposed_tools(&self) -> BTreeSet<String> {
        self.state.lock().directory.exposed_tools()
    }

    /// Calls waiting for a result.
    pub fn pending_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Control clients waiting for a page snapshot.
    pub fn waiting_bridge_clients(&self) -> usize {
        self.state.lock().bridge.len()
    }

    /// Whether `id` is registered.
    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.state.lock().clients.get(id).is_some()
    }
}


// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
