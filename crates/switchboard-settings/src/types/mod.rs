//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial JSON file fills in the rest from [`Default`].

mod server;
mod tools;

pub use server::*;
pub use tools::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the hub.
///
/// ```json
/// {
///   "server": { "port": 6005 },
///   "auth": { "sharedSecret": "s3cret" },
///   "tools": { "timeouts": { "render": 120000 } }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwitchboardSettings {
    /// Listener settings.
    pub server: ServerSettings,
    /// Handshake credential settings.
    pub auth: AuthSettings,
    /// Distributed tool settings.
    pub tools: ToolSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl SwitchboardSettings {
    /// Reject combinations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let marker = &self.auth.credential_marker;
        if marker.is_empty() || marker.contains(['/', '=']) {
            return Err(SettingsError::InvalidValue(format!(
                "credentialMarker must be non-empty without '/' or '=' (got {marker:?})"
            )));
        }
        if self.server.send_queue_size == 0 {
            return Err(SettingsError::InvalidValue(
                "sendQueueSize must be at least 1".into(),
            ));
        }
        if self.server.heartbeat_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "heartbeatIntervalMs must be at least 1".into(),
            ));
        }
        if self.server.heartbeat_timeout_ms < self.server.heartbeat_interval_ms {
            return Err(SettingsError::InvalidValue(format!(
                "heartbeatTimeoutMs ({}) is shorter than heartbeatIntervalMs ({})",
                self.server.heartbeat_timeout_ms, self.server.heartbeat_interval_ms
            )));
        }
        Ok(())
    }
}
