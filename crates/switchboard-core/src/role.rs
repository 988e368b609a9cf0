//! Connection roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed category assigned to a connection at handshake.
///
/// A role never changes for the lifetime of a connection; it determines
/// which frame types the connection may send and which fan-outs reach it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Receives the hub's log stream.
    LogSubscriber,
    /// Receives the hub's informational stream.
    InfoSubscriber,
    /// A remote node hosting tools on behalf of its own plugin runtime.
    DistributedServer,
    /// Issues browser-automation commands.
    BridgeControl,
    /// Executes commands in-browser and reports results and page state.
    BridgeObserver,
    /// Administrative dashboard.
    Dashboard,
}

impl Role {
    /// Every role, in gateway matching priority order.
    pub const ALL: [Role; 6] = [
        Role::LogSubscriber,
        Role::InfoSubscriber,
        Role::DistributedServer,
        Role::BridgeControl,
        Role::BridgeObserver,
        Role::Dashboard,
    ];

    /// URL path segment that selects this role at handshake.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::LogSubscriber => "log-subscriber",
            Self::InfoSubscriber => "info-subscriber",
            Self::DistributedServer => "distributed-server",
            Self::BridgeControl => "bridge-control",
            Self::BridgeObserver => "bridge-observer",
            Self::Dashboard => "dashboard",
        }
    }

    /// Short label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LogSubscriber => "log_subscriber",
            Self::InfoSubscriber => "info_subscriber",
            Self::DistributedServer => "distributed_server",
            Self::BridgeControl => "bridge_control",
            Self::BridgeObserver => "bridge_observer",
            Self::Dashboard => "dashboard",
        }
    }

    /// Plain clients and distributed servers are the only broadcast targets.
    pub fn is_broadcast_target(self) -> bool {
        matches!(
            self,
            Self::LogSubscriber | Self::InfoSubscriber | Self::DistributedServer
        )
    }

    /// Roles that receive a `connection_ack` right after the handshake.
    pub fn receives_ack(self) -> bool {
        matches!(self, Self::LogSubscriber | Self::InfoSubscriber)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
