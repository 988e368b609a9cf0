//! WebSocket handshake gateway, per-connection state, and session loop.

pub mod connection;
pub mod gateway;
pub mod session;
