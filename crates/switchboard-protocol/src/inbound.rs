//! Typed inbound messages, one enum per sending role.
//!
//! Decoding happens in two steps: [`Envelope::parse`] for the wire shape, then
//! `from_envelope` on the role's enum. Frame types a role is not expected to
//! send decode to an explicit `Unknown` variant so the router can log and drop
//! them instead of guessing.

use serde::Deserialize;
use serde_json::{Map, Value};
use switchboard_core::{ConnectionId, RequestId};

use crate::envelope::{Envelope, FrameError};
use crate::types;

// ─────────────────────────────────────────────────────────────────────────────
// Distributed server
// ─────────────────────────────────────────────────────────────────────────────

/// A capability advertised by a distributed server.
///
/// Nodes may advertise bare names or full manifests; the hub only needs the
/// name and forwards the manifest untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolManifest {
    /// Tool name.
    pub name: String,
    /// The advertised entry as received.
    pub manifest: Value,
}

impl ToolManifest {
    /// A manifest carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let manifest = serde_json::json!({ "name": name });
        Self { name, manifest }
    }

    fn from_value(value: Value) -> Option<Self> {
        let name = match &value {
            Value::String(s) => s.clone(),
            Value::Object(map) => map.get("name")?.as_str()?.to_owned(),
            _ => return None,
        };
        if name.is_empty() {
            return None;
        }
        let manifest = match value {
            Value::String(_) => serde_json::json!({ "name": name }),
            other => other,
        };
        Some(Self { name, manifest })
    }
}

/// `report_ip` payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ReportIp {
    /// Addresses on the node's local interfaces. `Some(vec![])` clears them.
    #[serde(rename = "localIPs", default)]
    pub local_ips: Option<Vec<String>>,
    /// Address the node is reachable at from outside.
    #[serde(rename = "publicIP", default)]
    pub public_ip: Option<String>,
    /// Human-readable node name.
    #[serde(rename = "serverName", default)]
    pub server_name: Option<String>,
}

/// `tool_result` payload.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    /// Correlation id from the matching `execute_tool`.
    pub request_id: RequestId,
    /// `"success"` or anything else (treated as an error).
    #[serde(default)]
    pub status: String,
    /// Result payload on success.
    #[serde(default)]
    pub result: Option<Value>,
    /// Error text on failure.
    #[serde(default)]
    pub error: Option<Value>,
}

impl ToolResult {
    /// Whether the node reported success.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Error text, flattening non-string error payloads.
    pub fn error_message(&self) -> Option<String> {
        match &self.error {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .or_else(|| Some(Value::Object(map.clone()).to_string())),
            Some(other) => Some(other.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct RegisterToolsPayload {
    #[serde(default)]
    tools: Vec<Value>,
}

#[derive(Deserialize)]
struct PlaceholdersPayload {
    #[serde(default)]
    placeholders: Map<String, Value>,
}

/// Frames a distributed server may send.
#[derive(Clone, Debug, PartialEq)]
pub enum DistributedMessage {
    /// Replace the node's advertised tool set.
    RegisterTools(Vec<ToolManifest>),
    /// Merge network identity metadata.
    ReportIp(ReportIp),
    /// Forward an opaque map to the plugin runtime.
    UpdateStaticPlaceholders(Map<String, Value>),
    /// Resolve a pending call.
    ToolResult(ToolResult),
    /// Any other frame type.
    Unknown(String),
}

impl DistributedMessage {
    /// Decode an envelope received from a distributed server.
    pub fn from_envelope(env: &Envelope) -> Result<Self, FrameError> {
        Ok(match env.frame_type.as_str() {
            types::REGISTER_TOOLS => {
                let payload: RegisterToolsPayload = env.decode()?;
                Self::RegisterTools(
                    payload
                        .tools
                        .into_iter()
                        .filter_map(ToolManifest::from_value)
                        .collect(),
                )
            }
            types::REPORT_IP => Self::ReportIp(env.decode()?),
            types::UPDATE_STATIC_PLACEHOLDERS => {
                let payload: PlaceholdersPayload = env.decode()?;
                Self::UpdateStaticPlaceholders(payload.placeholders)
            }
            types::TOOL_RESULT => Self::ToolResult(env.decode()?),
            other => Self::Unknown(other.to_owned()),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bridge control
// ─────────────────────────────────────────────────────────────────────────────

/// An automation command. The payload is opaque apart from a few routing keys.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    /// The command payload as received (plus hub annotations).
    pub data: Map<String, Value>,
}

impl Command {
    /// Key the hub writes so results can be routed back.
    pub const SOURCE_KEY: &'static str = "sourceClientId";

    /// Correlation id chosen by the control client.
    pub fn request_id(&self) -> Option<RequestId> {
        self.data
            .get("requestId")
            .and_then(Value::as_str)
            .map(RequestId::from)
    }

    /// Whether the sender wants the next page snapshot pushed to it.
    pub fn wants_page_info(&self) -> bool {
        self.data
            .get("wait_for_page_info")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Record the sending connection on the payload.
    pub fn annotate_source(&mut self, source: &ConnectionId) {
        let _ = self
            .data
            .insert(Self::SOURCE_KEY.to_owned(), Value::String(source.to_string()));
    }
}

/// Frames a bridge control client may send.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlMessage {
    /// Forward to the active observer.
    Command(Command),
    /// Anything else; not accepted from this role.
    Unknown(String),
}

impl ControlMessage {
    /// Decode an envelope received from a bridge control client.
    pub fn from_envelope(env: &Envelope) -> Result<Self, FrameError> {
        Ok(match env.frame_type.as_str() {
            types::COMMAND => Self::Command(Command {
                data: env.data_object()?,
            }),
            other => Self::Unknown(other.to_owned()),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bridge observer
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a relayed command, addressed to the control client that sent it.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandResult {
    /// The result payload as received.
    pub data: Map<String, Value>,
}

impl CommandResult {
    /// Connection the originating command came from.
    pub fn source(&self) -> Option<ConnectionId> {
        self.data
            .get(Command::SOURCE_KEY)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(ConnectionId::from)
    }
}

/// Frames a bridge observer may send.
#[derive(Clone, Debug, PartialEq)]
pub enum ObserverMessage {
    /// Liveness ping.
    Heartbeat,
    /// Result for a control client.
    CommandResult(CommandResult),
    /// Page snapshot.
    PageInfoUpdate(Map<String, Value>),
    /// Page-state traffic for the plugin runtime's bridge module.
    Other(Envelope),
}

impl ObserverMessage {
    /// Decode an envelope received from a bridge observer.
    pub fn from_envelope(env: &Envelope) -> Result<Self, FrameError> {
        Ok(match env.frame_type.as_str() {
            types::HEARTBEAT => Self::Heartbeat,
            types::COMMAND_RESULT => Self::CommandResult(CommandResult {
                data: env.data_object()?,
            }),
            types::PAGE_INFO_UPDATE_IN => Self::PageInfoUpdate(env.data_object()?),
            _ => Self::Other(env.clone()),
        })
    }
}
