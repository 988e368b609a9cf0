//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchboard_settings::SwitchboardSettings;

/// Runtime configuration for [`SwitchboardServer`](crate::server::SwitchboardServer).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Interval between pings.
    pub heartbeat_interval_ms: u64,
    /// Disconnect after this long without inbound traffic.
    pub heartbeat_timeout_ms: u64,
    /// Largest accepted inbound frame in bytes.
    pub max_message_size: usize,
    /// Outbound queue depth per connection.
    pub send_queue_size: usize,
    /// Shared secret every handshake must present.
    pub shared_secret: String,
    /// Marker in the `<marker>=<secret>` path segment.
    pub credential_marker: String,
    /// Tool names never exposed in the shared directory.
    pub internal_tools: Vec<String>,
}

impl ServerConfig {
    /// Ping interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Inactivity limit as a `Duration`.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            max_message_size: 16 * 1024 * 1024,
            send_queue_size: 1024,
            shared_secret: String::new(),
            credential_marker: "key".into(),
            internal_tools: switchboard_core::constants::DEFAULT_INTERNAL_TOOLS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl From<&SwitchboardSettings> for ServerConfig {
    fn from(settings: &SwitchboardSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            heartbeat_interval_ms: settings.server.heartbeat_interval_ms,
            heartbeat_timeout_ms: settings.server.heartbeat_timeout_ms,
            max_message_size: settings.server.max_message_size,
            send_queue_size: settings.server.send_queue_size,
            shared_secret: settings.auth.shared_secret.clone(),
            credential_marker: settings.auth.credential_marker.clone(),
            internal_tools: settings.tools.internal.clone(),
        }
    }
}
