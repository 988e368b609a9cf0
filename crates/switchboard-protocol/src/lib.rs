//! # switchboard-protocol
//!
//! Every frame on the wire is a JSON object `{ "type": string, "data"?: object }`.
//!
//! - [`Envelope`] is the untyped wire shape
//! - [`inbound`] turns an envelope into a typed message for the sender's role,
//!   with an explicit unknown variant instead of a generic object
//! - [`outbound`] builds the frames the hub sends

#![deny(unsafe_code)]

pub mod envelope;
pub mod inbound;
pub mod outbound;
pub mod types;

pub use envelope::{Envelope, FrameError};
pub use inbound::{
    Command, CommandResult, ControlMessage, DistributedMessage, ObserverMessage, ReportIp,
    ToolManifest, ToolResult,
};
