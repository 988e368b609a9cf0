//! Live connections partitioned by role.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use switchboard_core::{ConnectionId, Role};

use crate::websocket::connection::ClientConnection;

/// Per-role storage of live connections.
///
/// Partitions are ordered by connection id, and ids are time-ordered, so
/// iteration within a role follows connect order.
#[derive(Default)]
pub struct ClientRegistry {
    partitions: HashMap<Role, BTreeMap<ConnectionId, Arc<ClientConnection>>>,
}

impl ClientRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under the connection's role.
    pub fn insert(&mut self, connection: Arc<ClientConnection>) {
        let _ = self
            .partitions
            .entry(connection.role)
            .or_default()
            .insert(connection.id.clone(), connection);
    }

    /// Remove from whichever partition holds `id`. Idempotent.
    pub fn remove(&mut self, id: &str) -> Option<Arc<ClientConnection>> {
        self.partitions
            .values_mut()
            .find_map(|partition| partition.remove(id))
    }

    /// Look `id` up across every partition.
    pub fn get(&self, id: &str) -> Option<&Arc<ClientConnection>> {
        self.partitions
            .values()
            .find_map(|partition| partition.get(id))
    }

    /// Look `id` up within one role.
    pub fn get_in(&self, role: Role, id: &str) -> Option<&Arc<ClientConnection>> {
        self.partitions.get(&role)?.get(id)
    }

    /// Connections of `role` in connect order.
    pub fn by_role(&self, role: Role) -> impl Iterator<Item = &Arc<ClientConnection>> {
        self.partitions
            .get(&role)
            .into_iter()
            .flat_map(BTreeMap::values)
    }

    /// Earliest-connected open connection of `role`.
    pub fn first_open(&self, role: Role) -> Option<&Arc<ClientConnection>> {
        self.by_role(role).find(|c| c.is_open())
    }

    /// Number of connections of `role`.
    pub fn count(&self, role: Role) -> usize {
        self.partitions.get(&role).map_or(0, BTreeMap::len)
    }

    /// Total connections.
    pub fn len(&self) -> usize {
        self.partitions.values().map(BTreeMap::len).sum()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Connection count for every role, including empty ones.
    pub fn counts(&self) -> BTreeMap<Role, usize> {
        Role::ALL.into_iter().map(|r| (r, self.count(r))).collect()
    }
}
