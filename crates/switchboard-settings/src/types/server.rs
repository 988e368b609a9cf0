//! Listener, authentication, and logging settings.

use serde::{Deserialize, Serialize};

/// Listener and per-connection transport settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port (`0` picks an ephemeral port).
    pub port: u16,
    /// Interval between transport pings in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Disconnect after this long without a pong or any inbound frame.
    pub heartbeat_timeout_ms: u64,
    /// Largest accepted inbound frame in bytes.
    pub max_message_size: usize,
    /// Outbound queue depth per connection. Frames beyond it are dropped.
    pub send_queue_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6005,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            max_message_size: 16 * 1024 * 1024,
            send_queue_size: 1024,
        }
    }
}

/// Handshake credential settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// The single process-wide secret. Empty rejects every handshake.
    pub shared_secret: String,
    /// Marker preceding `=` in the credential path segment.
    pub credential_marker: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            shared_secret: String::new(),
            credential_marker: "key".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit one JSON object per line instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
