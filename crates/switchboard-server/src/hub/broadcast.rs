//! Fan-out and direct sends.

use metrics::counter;
use switchboard_core::Role;
use switchboard_protocol::Envelope;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Hub;
use crate::metrics::BROADCAST_DELIVERIES_TOTAL;

const BROADCAST_ROLES: [Role; 3] = [
    Role::LogSubscriber,
    Role::InfoSubscriber,
    Role::DistributedServer,
];

impl Hub {
    /// Send `frame` to every open log/info subscriber and distributed
    /// server, or only those of `role` when given.
    ///
    /// `cancel` is checked once, before anything is sent. Returns the
    /// number of connections the frame was queued to.
    pub fn broadcast(
        &self,
        frame: &Envelope,
        role: Option<Role>,
        cancel: Option<&CancellationToken>,
    ) -> usize {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            debug!(frame_type = %frame.frame_type, "broadcast cancelled before send");
            return 0;
        }
        let text = frame.to_json();
        let state = self.state.lock();
        let clients = &state.clients;
        let delivered = BROADCAST_ROLES
            .into_iter()
            .filter(|r| role.is_none_or(|wanted| wanted == *r))
            .flat_map(|r| clients.by_role(r))
            .filter(|conn| conn.is_open() && conn.send(text.clone()))
            .count();
        drop(state);

        counter!(BROADCAST_DELIVERIES_TOTAL).increment(delivered as u64);
        debug!(frame_type = %frame.frame_type, ?role, delivered, "broadcast");
        delivered
    }

    /// Send `frame` to one connection of any role.
    ///
    /// Returns `false` when the id is unknown, the connection is closed, or
    /// its queue is full.
    pub fn send_to(&self, id: &str, frame: &Envelope) -> bool {
        let state = self.state.lock();
        state
            .clients
            .get(id)
            .is_some_and(|conn| conn.is_open() && conn.send_envelope(frame))
    }

    /// Send `frame` to every open dashboard.
    pub fn notify_dashboards(&self, frame: &Envelope) -> usize {
        let text = frame.to_json();
        let state = self.state.lock();
        state
            .clients
            .by_role(Role::Dashboard)
            .filter(|conn| conn.is_open() && conn.send(text.clone()))
            .count()
    }
}
