//! Error taxonomy for hub operations.
//!
//! None of these are fatal to the process. The worst outcome is a single
//! terminated connection; everything else is reported back to the caller as
//! a value it is expected to handle.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by hub operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HubError {
    /// Missing or incorrect shared secret at handshake.
    #[error("authentication failed for {path}")]
    Authentication {
        /// The path the attempt was made on.
        path: String,
    },

    /// Unmatched path, malformed frame, or frame not accepted for the sender's role.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Target server or connection not found or not open.
    #[error("no open connection for {target}")]
    Routing {
        /// The id or name the caller asked for.
        target: String,
    },

    /// The call's deadline elapsed before a result arrived.
    #[error("call to tool {tool} on {target} timed out after {timeout:?}")]
    Timeout {
        /// Tool that was invoked.
        tool: String,
        /// Server id or name the call targeted.
        target: String,
        /// Effective deadline for the call.
        timeout: Duration,
    },

    /// The remote node reported an error result.
    #[error("tool {tool} on {target} failed: {message}")]
    Remote {
        /// Tool that was invoked.
        tool: String,
        /// Server the call targeted.
        target: String,
        /// Error text reported by the node.
        message: String,
    },

    /// The target connection closed while the call was in flight.
    #[error("{target} disconnected before tool {tool} returned")]
    Disconnected {
        /// Tool that was invoked.
        tool: String,
        /// Server the call targeted.
        target: String,
    },
}

impl HubError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "authentication",
            Self::Protocol(_) => "protocol",
            Self::Routing { .. } => "routing",
            Self::Timeout { .. } => "timeout",
            Self::Remote { .. } => "remote",
            Self::Disconnected { .. } => "disconnected",
        }
    }

    /// Wire-format error code (`UPPER_SNAKE`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "AUTHENTICATION_FAILED",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::Routing { .. } => "NOT_CONNECTED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Remote { .. } => "REMOTE_ERROR",
            Self::Disconnected { .. } => "DISCONNECTED",
        }
    }

    /// Whether the call was never delivered to a node.
    pub fn is_routing(&self) -> bool {
        matches!(self, Self::Routing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn timeout_message_names_tool_and_target() {
        let err = HubError::Timeout {
            tool: "search".into(),
            target: "srv1".into(),
            timeout: Duration::from_millis(50),
        };
        let msg = err.to_string();
        assert!(msg.contains("search"), "got: {msg}");
        assert!(msg.contains("srv1"), "got: {msg}");
        assert!(msg.contains("50ms"), "got: {msg}");
    }

    #[test]
    fn routing_display() {
        let err = HubError::Routing {
            target: "ghost".into(),
        };
        assert_eq!(err.to_string(), "no open connection for ghost");
        assert!(err.is_routing());
    }

    #[test]
    fn remote_carries_message() {
        let err = HubError::Remote {
            tool: "search".into(),
            target: "srv1".into(),
            message: "index offline".into(),
        };
        assert!(err.to_string().ends_with("index offline"));
        assert_matches!(err, HubError::Remote { ref message, .. } if message == "index offline");
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(HubError::Protocol("x".into()).error_kind(), "protocol");
        assert_eq!(
            HubError::Authentication { path: "/x".into() }.error_kind(),
            "authentication"
        );
        assert_eq!(
            HubError::Disconnected {
                tool: "t".into(),
                target: "s".into()
            }
            .error_kind(),
            "disconnected"
        );
    }

    #[test]
    fn codes_are_upper_snake() {
        let errs = [
            HubError::Protocol("x".into()),
            HubError::Routing { target: "s".into() },
            HubError::Timeout {
                tool: "t".into(),
                target: "s".into(),
                timeout: Duration::from_secs(1),
            },
        ];
        for err in errs {
            let code = err.code();
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c == '_'), "{code}");
        }
    }
}
