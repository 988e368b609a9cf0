//! Per-role dispatch of inbound frames.
//!
//! Malformed frames and frame types a role may not send are logged and
//! dropped; the connection stays open.

use std::sync::Arc;

use metrics::counter;
use serde_json::{Map, Value};
use switchboard_core::Role;
use switchboard_core::constants::BRIDGE_SERVICE_MODULE;
use switchboard_protocol::inbound::{Command, CommandResult};
use switchboard_protocol::{
    ControlMessage, DistributedMessage, Envelope, FrameError, ObserverMessage, outbound,
};
use tracing::{debug, info, warn};

use super::Hub;
use crate::metrics::{BRIDGE_COMMANDS_TOTAL, WS_MALFORMED_FRAMES_TOTAL};
use crate::websocket::connection::ClientConnection;

const NO_OBSERVER: &str = "No active browser observer connected.";

impl Hub {
    /// Decode a text frame from `conn` and act on it according to the
    /// sender's role.
    pub fn handle_frame(&self, conn: &Arc<ClientConnection>, text: &str) {
        let env = match Envelope::parse(text) {
            Ok(env) => env,
            Err(e) => return malformed(conn, &e),
        };
        let result = match conn.role {
            Role::DistributedServer => {
                DistributedMessage::from_envelope(&env).map(|msg| self.on_distributed(conn, msg))
            }
            Role::BridgeObserver => {
                ObserverMessage::from_envelope(&env).map(|msg| self.on_observer(conn, &env, msg))
            }
            Role::BridgeControl => {
                ControlMessage::from_envelope(&env).map(|msg| self.on_control(conn, msg))
            }
            Role::LogSubscriber | Role::InfoSubscriber | Role::Dashboard => {
                debug!(conn_id = %conn.id, frame_type = %env.frame_type, "inbound frame from receive-only role, dropped");
                Ok(())
            }
        };
        if let Err(e) = result {
            malformed(conn, &e);
        }
    }

    fn on_distributed(&self, conn: &ClientConnection, msg: DistributedMessage) {
        match msg {
            DistributedMessage::RegisterTools(tools) => {
                let accepted = self.state.lock().directory.register_tools(&conn.id, tools);
                if let Some(accepted) = accepted {
                    self.runtime.register_distributed_tools(&conn.id, &accepted);
                    let names: Vec<&str> = accepted.iter().map(|t| t.name.as_str()).collect();
                    info!(server_id = %conn.id, tools = ?names, "distributed tools registered");
                }
            }
            DistributedMessage::ReportIp(report) => {
                debug!(server_id = %conn.id, ?report, "identity reported");
                let _ = self.state.lock().directory.report_identity(&conn.id, report);
            }
            DistributedMessage::UpdateStaticPlaceholders(placeholders) => {
                let name = self
                    .state
                    .lock()
                    .directory
                    .get(&conn.id)
                    .and_then(|r| r.server_name.clone());
                debug!(server_id = %conn.id, count = placeholders.len(), "static placeholders forwarded");
                self.runtime.update_distributed_static_placeholders(
                    &conn.id,
                    name.as_deref(),
                    &placeholders,
                );
            }
            DistributedMessage::ToolResult(result) => self.on_tool_result(&conn.id, result),
            DistributedMessage::Unknown(frame_type) => {
                warn!(server_id = %conn.id, frame_type, "frame type not accepted from distributed server");
            }
        }
    }

    fn on_observer(&self, conn: &ClientConnection, env: &Envelope, msg: ObserverMessage) {
        match msg {
            ObserverMessage::Heartbeat => {
                let ack = outbound::heartbeat_ack(chrono::Utc::now().timestamp_millis());
                if !conn.send_envelope(&ack) {
                    debug!(conn_id = %conn.id, "heartbeat_ack not queued");
                }
            }
            ObserverMessage::CommandResult(result) => self.relay_result(result),
            ObserverMessage::PageInfoUpdate(snapshot) => {
                self.push_page_info(&snapshot);
                self.to_bridge_module(conn, env);
            }
            ObserverMessage::Other(_) => self.to_bridge_module(conn, env),
        }
    }

    fn on_control(&self, conn: &ClientConnection, msg: ControlMessage) {
        match msg {
            ControlMessage::Command(command) => self.relay_command(conn, command),
            ControlMessage::Unknown(frame_type) => {
                warn!(conn_id = %conn.id, frame_type, "frame type not accepted from bridge control");
            }
        }
    }

    fn relay_command(&self, conn: &ClientConnection, mut command: Command) {
        let request_id = command.request_id();
        let wants_page_info = command.wants_page_info();
        command.annotate_source(&conn.id);
        let frame = outbound::command(command.data);

        let forwarded = {
            let mut state = self.state.lock();
            let sent = state
                .clients
                .first_open(Role::BridgeObserver)
                .is_some_and(|observer| observer.send_envelope(&frame));
            if sent && wants_page_info {
                state.bridge.wait(conn.id.clone(), request_id.clone());
            }
            sent
        };

        if forwarded {
            counter!(BRIDGE_COMMANDS_TOTAL).increment(1);
            debug!(conn_id = %conn.id, request_id = ?request_id, wants_page_info, "command forwarded to observer");
        } else {
            warn!(conn_id = %conn.id, request_id = ?request_id, "no observer for command");
            let _ = conn.send_envelope(&outbound::command_error(request_id.as_ref(), NO_OBSERVER));
        }
    }

    fn relay_result(&self, result: CommandResult) {
        let Some(source) = result.source() else {
            warn!("command_result without sourceClientId, dropped");
            return;
        };
        let sent = {
            let state = self.state.lock();
            state
                .clients
                .get_in(Role::BridgeControl, &source)
                .is_some_and(|ctl| ctl.send_envelope(&outbound::command_result(result.data)))
        };
        if !sent {
            debug!(source = %source, "command_result target gone, dropped");
        }
    }

    fn push_page_info(&self, snapshot: &Map<String, Value>) {
        let mut state = self.state.lock();
        if state.bridge.is_empty() {
            return;
        }
        let state = &mut *state;
        let delivered = state.bridge.deliver(&state.clients, snapshot);
        debug!(delivered, still_waiting = state.bridge.len(), "page snapshot pushed");
    }

    fn to_bridge_module(&self, conn: &ClientConnection, env: &Envelope) {
        match self.runtime.service_module(BRIDGE_SERVICE_MODULE) {
            Some(module) => module.handle_client_message(&conn.id, env),
            None => debug!(frame_type = %env.frame_type, "no bridge service module, observer frame dropped"),
        }
    }
}

fn malformed(conn: &ClientConnection, err: &FrameError) {
    counter!(WS_MALFORMED_FRAMES_TOTAL).increment(1);
    warn!(conn_id = %conn.id, role = %conn.role, error = %err, "malformed frame dropped");
}
