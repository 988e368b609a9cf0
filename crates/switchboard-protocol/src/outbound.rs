//! Builders for frames the hub sends.

use serde_json::{Map, Value, json};
use switchboard_core::{RequestId, Role};

use crate::envelope::Envelope;
use crate::types;

/// Handshake confirmation for log/info subscribers.
pub fn connection_ack(role: Role) -> Envelope {
    Envelope::new(
        types::CONNECTION_ACK,
        json!({ "message": format!("connection established for {role}") }),
    )
}

/// Invoke `tool` on a distributed server.
pub fn execute_tool(request_id: &RequestId, tool: &str, args: Value) -> Envelope {
    Envelope::new(
        types::EXECUTE_TOOL,
        json!({
            "requestId": request_id,
            "toolName": tool,
            "toolArgs": args,
        }),
    )
}

/// Reply to an observer heartbeat.
pub fn heartbeat_ack(timestamp_ms: i64) -> Envelope {
    Envelope::new(types::HEARTBEAT_ACK, json!({ "timestamp": timestamp_ms }))
}

/// Forward a command payload to the observer.
pub fn command(data: Map<String, Value>) -> Envelope {
    Envelope::new(types::COMMAND, Value::Object(data))
}

/// Relay a command result to the control client.
pub fn command_result(data: Map<String, Value>) -> Envelope {
    Envelope::new(types::COMMAND_RESULT, Value::Object(data))
}

/// Immediate error result for a command that could not be relayed.
pub fn command_error(request_id: Option<&RequestId>, message: &str) -> Envelope {
    Envelope::new(
        types::COMMAND_RESULT,
        json!({
            "requestId": request_id,
            "status": "error",
            "error": message,
        }),
    )
}

/// Page snapshot pushed to a waiting control client, tagged with the id of
/// the command that asked for it.
pub fn page_info_update(request_id: Option<&RequestId>, snapshot: &Map<String, Value>) -> Envelope {
    let mut data = snapshot.clone();
    let _ = data.insert("requestId".to_owned(), json!(request_id));
    Envelope::new(types::PAGE_INFO_UPDATE_OUT, Value::Object(data))
}
