//! The plugin-runtime collaborator.
//!
//! The hub never executes tools itself. It reports the distributed tool set
//! and forwarded metadata to a [`PluginRuntime`], asks it for per-tool
//! deadlines, and hands bridge page-state traffic to a named
//! [`ServiceModule`]. [`LocalRuntime`] is the in-process implementation used
//! by the daemon and the tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use switchboard_core::ConnectionId;
use switchboard_protocol::{Envelope, ToolManifest};
use switchboard_settings::ToolSettings;
use tracing::debug;

use crate::websocket::connection::ClientConnection;

/// A named handler for one class of client traffic.
pub trait ServiceModule: Send + Sync {
    /// A client this module cares about has connected.
    fn handle_new_client(&self, connection: &Arc<ClientConnection>);

    /// A frame from one of those clients.
    fn handle_client_message(&self, connection_id: &ConnectionId, frame: &Envelope);

    /// One of those clients has disconnected.
    fn handle_client_closed(&self, connection_id: &ConnectionId);
}

/// Capabilities the hub consumes from the plugin runtime.
///
/// Methods are called without the hub's state lock held, so an
/// implementation may call back into the hub.
pub trait PluginRuntime: Send + Sync {
    /// Replace the tool set contributed by `server_id`.
    fn register_distributed_tools(&self, server_id: &ConnectionId, tools: &[ToolManifest]);

    /// Drop every tool contributed by `server_id`.
    fn unregister_all_distributed_tools(&self, server_id: &ConnectionId);

    /// Store static placeholder values reported by a node.
    fn update_distributed_static_placeholders(
        &self,
        server_id: &ConnectionId,
        server_name: Option<&str>,
        placeholders: &Map<String, Value>,
    );

    /// Deadline for a call to `tool` when the caller gives none.
    fn tool_timeout(&self, tool: &str) -> Duration;

    /// Look up a service module by name.
    fn service_module(&self, name: &str) -> Option<Arc<dyn ServiceModule>>;
}

/// Placeholders reported by one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePlaceholders {
    /// Node name at the time of the report.
    pub server_name: Option<String>,
    /// The reported map.
    pub values: Map<String, Value>,
}

/// In-memory [`PluginRuntime`].
pub struct LocalRuntime {
    tools: ToolSettings,
    distributed: Mutex<BTreeMap<ConnectionId, Vec<ToolManifest>>>,
    placeholders: Mutex<BTreeMap<ConnectionId, NodePlaceholders>>,
    modules: RwLock<HashMap<String, Arc<dyn ServiceModule>>>,
}

impl LocalRuntime {
    /// Create a runtime with the given tool settings and no modules.
    pub fn new(tools: ToolSettings) -> Self {
        Self {
            tools,
            distributed: Mutex::new(BTreeMap::new()),
            placeholders: Mutex::new(BTreeMap::new()),
            modules: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) a service module.
    pub fn register_module(&self, name: impl Into<String>, module: Arc<dyn ServiceModule>) {
        let _ = self.modules.write().insert(name.into(), module);
    }

    /// Union of every node's tool names.
    pub fn distributed_tool_names(&self) -> BTreeSet<String> {
        self.distributed
            .lock()
            .values()
            .flatten()
            .map(|t| t.name.clone())
            .collect()
    }

    /// Tools contributed by one node.
    pub fn tools_for(&self, server_id: &ConnectionId) -> Vec<ToolManifest> {
        self.distributed
            .lock()
            .get(server_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Placeholders last reported by one node.
    pub fn placeholders_for(&self, server_id: &ConnectionId) -> Option<NodePlaceholders> {
        self.placeholders.lock().get(server_id).cloned()
    }
}

impl PluginRuntime for LocalRuntime {
    fn register_distributed_tools(&self, server_id: &ConnectionId, tools: &[ToolManifest]) {
        debug!(server_id = %server_id, count = tools.len(), "runtime: distributed tools registered");
        let _ = self
            .distributed
            .lock()
            .insert(server_id.clone(), tools.to_vec());
    }

    fn unregister_all_distributed_tools(&self, server_id: &ConnectionId) {
        let removed = self.distributed.lock().remove(server_id);
        let _ = self.placeholders.lock().remove(server_id);
        debug!(
            server_id = %server_id,
            count = removed.map_or(0, |t| t.len()),
            "runtime: distributed tools unregistered"
        );
    }

    fn update_distributed_static_placeholders(
        &self,
        server_id: &ConnectionId,
        server_name: Option<&str>,
        placeholders: &Map<String, Value>,
    ) {
        let _ = self.placeholders.lock().insert(
            server_id.clone(),
            NodePlaceholders {
                server_name: server_name.map(str::to_owned),
                values: placeholders.clone(),
            },
        );
    }

    fn tool_timeout(&self, tool: &str) -> Duration {
        self.tools.timeout_for(tool)
    }

    fn service_module(&self, name: &str) -> Option<Arc<dyn ServiceModule>> {
        self.modules.read().get(name).cloned()
    }
}

/// Tracks browser page state reported by bridge observers.
#[derive(Default)]
pub struct PageStateModule {
    observers: Mutex<BTreeSet<ConnectionId>>,
    latest: Mutex<Option<(ConnectionId, Envelope)>>,
}

impl PageStateModule {
    /// Create an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observers currently connected.
    pub fn observers(&self) -> Vec<ConnectionId> {
        self.observers.lock().iter().cloned().collect()
    }

    /// The most recent page-state frame and the observer that sent it.
    pub fn latest(&self) -> Option<(ConnectionId, Envelope)> {
        self.latest.lock().clone()
    }
}

impl ServiceModule for PageStateModule {
    fn handle_new_client(&self, connection: &Arc<ClientConnection>) {
        let _ = self.observers.lock().insert(connection.id.clone());
    }

    fn handle_client_message(&self, connection_id: &ConnectionId, frame: &Envelope) {
        debug!(conn_id = %connection_id, frame_type = %frame.frame_type, "page state update");
        *self.latest.lock() = Some((connection_id.clone(), frame.clone()));
    }

    fn handle_client_closed(&self, connection_id: &ConnectionId) {
        let _ = self.observers.lock().remove(connection_id);
    }
}
