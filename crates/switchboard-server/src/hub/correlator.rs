//! Request/response correlation for distributed tool calls.
//!
//! Every call is a small state machine: `Pending` until exactly one of
//! a result frame, the deadline, or the target's disconnect takes its entry
//! out of [`PendingCalls`]. Whoever removes the entry owns the outcome;
//! later arrivals find nothing and are dropped.

use std::collections::HashMap;
use std::time::Duration;

use metrics::{counter, gauge};
use serde_json::Value;
use switchboard_core::{ConnectionId, HubError, RequestId, Role};
use switchboard_protocol::{ToolResult, outbound};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::Hub;
use crate::metrics::{RPC_CALLS_PENDING, RPC_CALLS_TOTAL};

const DEFAULT_REMOTE_ERROR: &str = "distributed tool execution failed";

/// Outcome delivered to a waiting caller.
pub type CallOutcome = Result<Value, HubError>;

/// One in-flight call.
pub struct PendingCall {
    /// Connection the call was sent to.
    pub server_id: ConnectionId,
    /// Id or name the caller asked for.
    pub target: String,
    /// Tool being invoked.
    pub tool: String,
    responder: oneshot::Sender<CallOutcome>,
}

impl PendingCall {
    fn settle(self, outcome: CallOutcome) {
        // The caller may already be gone; nothing to do then.
        let _ = self.responder.send(outcome);
    }
}

/// In-flight calls keyed by request id.
#[derive(Default)]
pub struct PendingCalls {
    entries: HashMap<RequestId, PendingCall>,
}

#[allow(clippy::cast_precision_loss)]
impl PendingCalls {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(
        &mut self,
        request_id: RequestId,
        server_id: ConnectionId,
        target: &str,
        tool: &str,
    ) -> oneshot::Receiver<CallOutcome> {
        let (responder, rx) = oneshot::channel();
        let _ = self.entries.insert(
            request_id,
            PendingCall {
                server_id,
                target: target.to_owned(),
                tool: tool.to_owned(),
                responder,
            },
        );
        gauge!(RPC_CALLS_PENDING).set(self.entries.len() as f64);
        rx
    }

    /// Remove an entry without settling it.
    pub fn take(&mut self, request_id: &str) -> Option<PendingCall> {
        let call = self.entries.remove(request_id);
        gauge!(RPC_CALLS_PENDING).set(self.entries.len() as f64);
        call
    }

    /// Settle the call a `tool_result` from `from` answers. Returns `false`
    /// when no entry matches (unknown id or already settled) or the entry
    /// was sent to a different server; such an entry stays pending.
    pub fn resolve(&mut self, from: &str, result: ToolResult) -> bool {
        match self.entries.get(result.request_id.as_str()) {
            Some(call) if call.server_id.as_str() == from => {}
            _ => return false,
        }
        let Some(call) = self.take(&result.request_id) else {
            return false;
        };
        let outcome = if result.is_success() {
            counter!(RPC_CALLS_TOTAL, "outcome" => "success").increment(1);
            Ok(result.result.unwrap_or(Value::Null))
        } else {
            counter!(RPC_CALLS_TOTAL, "outcome" => "remote_error").increment(1);
            Err(HubError::Remote {
                message: result
                    .error_message()
                    .unwrap_or_else(|| DEFAULT_REMOTE_ERROR.to_owned()),
                tool: call.tool.clone(),
                target: call.target.clone(),
            })
        };
        call.settle(outcome);
        true
    }

    /// Reject every call sent to `server_id`. Returns how many were rejected.
    pub fn reject_server(&mut self, server_id: &str) -> usize {
        let ids: Vec<RequestId> = self
            .entries
            .iter()
            .filter(|(_, call)| call.server_id.as_str() == server_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            if let Some(call) = self.take(id) {
                counter!(RPC_CALLS_TOTAL, "outcome" => "disconnected").increment(1);
                let err = HubError::Disconnected {
                    tool: call.tool.clone(),
                    target: call.target.clone(),
                };
                call.settle(Err(err));
            }
        }
        ids.len()
    }

    /// Number of in-flight calls.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Hub {
    /// Invoke `tool` on the distributed server named by `target` (connection
    /// id first, then reported server name) and wait for its result.
    ///
    /// `timeout` defaults to the plugin runtime's per-tool deadline. Fails
    /// immediately with [`HubError::Routing`] when no open server matches;
    /// no entry is created in that case.
    pub async fn call(
        &self,
        target: &str,
        tool: &str,
        args: Value,
        timeout: Option<Duration>,
    ) -> CallOutcome {
        let timeout = timeout.unwrap_or_else(|| self.runtime.tool_timeout(tool));
        let request_id = RequestId::new();

        let mut rx = {
            let mut state = self.state.lock();
            let Some(server) = state.resolve_server(target).cloned() else {
                counter!(RPC_CALLS_TOTAL, "outcome" => "routing").increment(1);
                return Err(HubError::Routing {
                    target: target.to_owned(),
                });
            };
            let rx = state
                .calls
                .insert(request_id.clone(), server.id.clone(), target, tool);
            if !server.send_envelope(&outbound::execute_tool(&request_id, tool, args)) {
                let _ = state.calls.take(&request_id);
                counter!(RPC_CALLS_TOTAL, "outcome" => "routing").increment(1);
                return Err(HubError::Routing {
                    target: target.to_owned(),
                });
            }
            rx
        };
        let _abandon = AbandonOnDrop {
            hub: self,
            request_id: &request_id,
        };
        debug!(request_id = %request_id, tool, target, ?timeout, "execute_tool sent");

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(outcome)) => outcome,
            // Responder dropped without settling.
            Ok(Err(_)) => Err(HubError::Disconnected {
                tool: tool.to_owned(),
                target: target.to_owned(),
            }),
            Err(_elapsed) => {
                let removed = self.state.lock().calls.take(&request_id).is_some();
                if removed {
                    counter!(RPC_CALLS_TOTAL, "outcome" => "timeout").increment(1);
                    warn!(request_id = %request_id, tool, target, ?timeout, "distributed call timed out");
                    Err(HubError::Timeout {
                        tool: tool.to_owned(),
                        target: target.to_owned(),
                        timeout,
                    })
                } else {
                    // Settled between the deadline firing and the lock.
                    rx.try_recv().unwrap_or_else(|_| {
                        Err(HubError::Disconnected {
                            tool: tool.to_owned(),
                            target: target.to_owned(),
                        })
                    })
                }
            }
        }
    }

    pub(crate) fn on_tool_result(&self, from: &ConnectionId, result: ToolResult) {
        let request_id = result.request_id.clone();
        if self.state.lock().calls.resolve(from, result) {
            info!(request_id = %request_id, server_id = %from, "distributed call settled");
        } else {
            debug!(request_id = %request_id, server_id = %from, "tool_result with no pending call from this server, dropped");
        }
    }
}

/// Clears the entry when a caller drops its `call` future before settling.
struct AbandonOnDrop<'a> {
    hub: &'a Hub,
    request_id: &'a RequestId,
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        let _ = self.hub.state.lock().calls.take(self.request_id);
    }
}

impl super::HubState {
    /// Open distributed-server connection for an id or reported name.
    pub(crate) fn resolve_server(
        &self,
        target: &str,
    ) -> Option<&std::sync::Arc<crate::websocket::connection::ClientConnection>> {
        let by_id = self
            .clients
            .get_in(Role::DistributedServer, target)
            .filter(|c| c.is_open());
        by_id.or_else(|| {
            let id = self.directory.find_by_name(target)?;
            self.clients
                .get_in(Role::DistributedServer, id)
                .filter(|c| c.is_open())
        })
    }
}
