//! Frame `type` strings observed at the boundary.

/// Hub → log/info subscriber: handshake confirmation.
pub const CONNECTION_ACK: &str = "connection_ack";

/// Distributed server → hub: advertise capability names.
pub const REGISTER_TOOLS: &str = "register_tools";
/// Distributed server → hub: advertise network identity.
pub const REPORT_IP: &str = "report_ip";
/// Distributed server → hub: opaque key/value map for the plugin runtime.
pub const UPDATE_STATIC_PLACEHOLDERS: &str = "update_static_placeholders";
/// Distributed server → hub: resolve a pending call.
pub const TOOL_RESULT: &str = "tool_result";
/// Hub → distributed server: invoke a named capability.
pub const EXECUTE_TOOL: &str = "execute_tool";

/// Bridge control → hub → bridge observer: automation command.
pub const COMMAND: &str = "command";
/// Bridge observer → hub → bridge control: result of a relayed command.
pub const COMMAND_RESULT: &str = "command_result";
/// Bridge observer → hub: liveness ping.
pub const HEARTBEAT: &str = "heartbeat";
/// Hub → bridge observer: liveness reply.
pub const HEARTBEAT_ACK: &str = "heartbeat_ack";
/// Bridge observer → hub: asynchronous page snapshot.
pub const PAGE_INFO_UPDATE_IN: &str = "pageInfoUpdate";
/// Hub → bridge control: pushed snapshot carrying the initiating request id.
pub const PAGE_INFO_UPDATE_OUT: &str = "page_info_update";
