//! One connected client, from upgrade through disconnect.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use switchboard_core::{ConnectionId, Role};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use crate::config::ServerConfig;
use crate::hub::Hub;

/// Run a WebSocket session.
///
/// 1. Registers the connection with the hub (which sends any handshake ack)
/// 2. Forwards queued outbound frames and sends periodic pings
/// 3. Dispatches inbound text (and UTF-8 binary) frames to the hub
/// 4. Ends on close, transport error, inactivity, or `shutdown`
/// 5. Runs the hub's disconnect cascade
#[instrument(skip_all, fields(conn_id = %conn_id, role = %role))]
pub async fn run_session(
    ws: WebSocket,
    conn_id: ConnectionId,
    role: Role,
    hub: Arc<Hub>,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<String>(config.send_queue_size.max(1));
    let connection = Arc::new(ClientConnection::new(conn_id, role, send_tx));

    hub.connect(Arc::clone(&connection));

    let closed = shutdown.child_token();
    let outbound_conn = Arc::clone(&connection);
    let outbound_closed = closed.clone();
    let heartbeat_interval = config.heartbeat_interval();
    let heartbeat_timeout = config.heartbeat_timeout();
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat_interval);
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                () = outbound_closed.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_seen_elapsed() > heartbeat_timeout
                    {
                        warn!(timeout = ?heartbeat_timeout, "client unresponsive, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        // Closing the queue marks the connection not open for routing.
        send_rx.close();
        outbound_closed.cancel();
    });

    loop {
        let msg = tokio::select! {
            () = closed.cancelled() => break,
            msg = ws_rx.next() => msg,
        };
        let msg = match msg {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                debug!(error = %e, "transport error");
                break;
            }
            None => break,
        };
        connection.mark_alive();
        match msg {
            Message::Text(text) => hub.handle_frame(&connection, text.as_str()),
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => hub.handle_frame(&connection, text),
                Err(_) => debug!(len = data.len(), "non-UTF-8 binary frame dropped"),
            },
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    closed.cancel();
    let _ = outbound.await;
    let _ = hub.disconnect(&connection.id);
    info!(
        duration_secs = connection.connected_at.elapsed().as_secs(),
        "session ended"
    );
}
