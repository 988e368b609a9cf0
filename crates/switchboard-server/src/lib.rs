//! # switchboard-server
//!
//! Axum WebSocket hub for heterogeneous agents sharing one authenticated,
//! path-multiplexed channel.
//!
//! - Handshake gateway: `/<role-path>/<marker>=<secret>` selects one of six roles
//! - [`hub::Hub`]: client registry, distributed tool directory, RPC
//!   correlator, broadcast, and browser-bridge relay behind one lock
//! - [`runtime::PluginRuntime`]: the collaborator that owns tool logic
//! - HTTP endpoints: `/health` and `/metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod runtime;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use hub::Hub;
pub use runtime::{LocalRuntime, PageStateModule, PluginRuntime, ServiceModule};
pub use server::SwitchboardServer;
