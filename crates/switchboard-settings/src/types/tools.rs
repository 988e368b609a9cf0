//! Distributed tool call settings.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts and visibility rules for tools hosted on distributed servers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolSettings {
    /// Deadline for a call when neither the caller nor `timeouts` names one.
    pub default_timeout_ms: u64,
    /// Per-tool deadlines in milliseconds.
    pub timeouts: BTreeMap<String, u64>,
    /// Names reserved for the hub's own collaborators, never exposed in the
    /// shared directory.
    pub internal: Vec<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: 60_000,
            timeouts: BTreeMap::new(),
            internal: vec!["internal_request_file".to_string()],
        }
    }
}

impl ToolSettings {
    /// Effective deadline for `tool`.
    pub fn timeout_for(&self, tool: &str) -> Duration {
        let ms = self
            .timeouts
            .get(tool)
            .copied()
            .unwrap_or(self.default_timeout_ms);
        Duration::from_millis(ms)
    }
}
