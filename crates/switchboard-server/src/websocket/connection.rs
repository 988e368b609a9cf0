//! Per-connection state shared between the session task and the hub.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::counter;
use parking_lot::Mutex;
use switchboard_core::{ConnectionId, Role};
use switchboard_protocol::Envelope;
use tokio::sync::mpsc;

use crate::metrics::WS_DROPPED_FRAMES_TOTAL;

/// A live WebSocket connection with a fixed role.
///
/// Outbound frames go through a bounded queue drained by the session's
/// writer task. When the writer exits the queue closes and [`is_open`]
/// turns false.
///
/// [`is_open`]: ClientConnection::is_open
pub struct ClientConnection {
    /// Generated at handshake.
    pub id: ConnectionId,
    /// Assigned at handshake, never changes.
    pub role: Role,
    tx: mpsc::Sender<String>,
    /// When this connection was established.
    pub connected_at: Instant,
    is_alive: AtomicBool,
    last_seen: Mutex<Instant>,
    dropped_frames: AtomicU64,
}

impl ClientConnection {
    /// Create a connection around the writer queue.
    pub fn new(id: ConnectionId, role: Role, tx: mpsc::Sender<String>) -> Self {
        let now = Instant::now();
        Self {
            id,
            role,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_seen: Mutex::new(now),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Whether the writer side is still running.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a serialized frame.
    ///
    /// Returns `false` if the queue is full or closed; the frame is dropped
    /// and counted.
    pub fn send(&self, text: String) -> bool {
        if self.tx.try_send(text).is_ok() {
            true
        } else {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            counter!(WS_DROPPED_FRAMES_TOTAL, "role" => self.role.as_str()).increment(1);
            false
        }
    }

    /// Serialize and queue an envelope.
    pub fn send_envelope(&self, frame: &Envelope) -> bool {
        self.send(frame.to_json())
    }

    /// Frames dropped so far.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Record inbound traffic (any frame, including pongs).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound frame (or since connect).
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Check and reset the alive flag. `true` if traffic arrived since the
    /// previous check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection(cap: usize) -> (ClientConnection, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(cap);
        let conn = ClientConnection::new(ConnectionId::from("conn_1"), Role::Dashboard, tx);
        (conn, rx)
    }

    #[tokio::test]
    async fn send_envelope_serializes() {
        let (conn, mut rx) = make_connection(8);
        assert!(conn.send_envelope(&Envelope::bare("heartbeat_ack")));
        assert_eq!(rx.recv().await.unwrap(), r#"{"type":"heartbeat_ack"}"#);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let (conn, _rx) = make_connection(1);
        assert!(conn.send("a".into()));
        assert!(!conn.send("b".into()));
        assert!(!conn.send("c".into()));
        assert_eq!(conn.drop_count(), 2);
        assert!(conn.is_open());
    }

    #[test]
    fn connected_at_is_set_on_creation() {
        let before = Instant::now();
        let (conn, _rx) = make_connection(1);
        assert!(conn.connected_at >= before);
        assert!(conn.connected_at.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn closed_when_writer_gone() {
        let (conn, rx) = make_connection(4);
        assert!(conn.is_open());
        drop(rx);
        assert!(!conn.is_open());
        assert!(!conn.send("x".into()));
    }

    #[test]
    fn alive_flag_resets_on_check() {
        let (conn, _rx) = make_connection(1);
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[test]
    fn debug_shows_role() {
        let (conn, _rx) = make_connection(1);
        let s = format!("{conn:?}");
        assert!(s.contains("Dashboard"));
        assert!(s.contains("conn_1"));
    }
}
