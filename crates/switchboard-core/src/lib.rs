//! # switchboard-core
//!
//! Foundation types shared by every switchboard crate:
//!
//! - **Branded IDs**: [`ConnectionId`] and [`RequestId`] as newtypes over time-ordered UUIDs
//! - **Roles**: the fixed [`Role`] a connection is assigned at handshake
//! - **Errors**: the [`HubError`] taxonomy surfaced by hub operations
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod role;

pub use errors::HubError;
pub use ids::{ConnectionId, RequestId};
pub use role::Role;
