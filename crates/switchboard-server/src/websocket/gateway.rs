//! Handshake gateway: path → role, credential check, upgrade.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use metrics::counter;
use switchboard_core::{ConnectionId, Role};
use thiserror::Error;
use tracing::{info, warn};

use super::session;
use crate::metrics::WS_REJECTED_HANDSHAKES_TOTAL;
use crate::server::AppState;

/// Why a handshake was refused before upgrading.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// No role route matches the path.
    #[error("no route for {path}")]
    UnmatchedPath {
        /// Request path.
        path: String,
    },
    /// A route matched but the credential is missing or wrong.
    #[error("bad credential for {role}")]
    BadCredential {
        /// Role the path selected.
        role: Role,
    },
}

impl GatewayError {
    /// Label for the rejection metric.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnmatchedPath { .. } => "unmatched_path",
            Self::BadCredential { .. } => "bad_credential",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::UnmatchedPath { .. } => StatusCode::NOT_FOUND,
            Self::BadCredential { .. } => StatusCode::UNAUTHORIZED,
        };
        (status, self.to_string()).into_response()
    }
}

/// Maps handshake paths of the form `/<role-segment>/<marker>=<secret>` to
/// roles, checked in [`Role::ALL`] order.
#[derive(Clone, Debug)]
pub struct RouteTable {
    marker: String,
    secret: String,
}

impl RouteTable {
    /// Build a table for one credential marker and shared secret.
    pub fn new(marker: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            secret: secret.into(),
        }
    }

    /// The role a path selects and the credential it carries.
    pub fn match_path<'p>(&self, path: &'p str) -> Option<(Role, &'p str)> {
        Role::ALL.into_iter().find_map(|role| {
            let credential = path
                .strip_prefix('/')?
                .strip_prefix(role.path_segment())?
                .strip_prefix('/')?
                .strip_prefix(self.marker.as_str())?
                .strip_prefix('=')?;
            Some((role, credential))
        })
    }

    /// Resolve the role for `path`, or explain why the handshake is refused.
    ///
    /// An empty secret (unconfigured) refuses every handshake.
    pub fn authorize(&self, path: &str) -> Result<Role, GatewayError> {
        let (role, credential) = self.match_path(path).ok_or_else(|| GatewayError::UnmatchedPath {
            path: path.to_owned(),
        })?;
        if self.secret.is_empty() || !constant_time_eq(credential.as_bytes(), self.secret.as_bytes()) {
            return Err(GatewayError::BadCredential { role });
        }
        Ok(role)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Fallback handler: every path that is not an HTTP route is a handshake
/// attempt.
pub async fn upgrade(
    State(state): State<AppState>,
    uri: Uri,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let role = match state.routes.authorize(uri.path()) {
        Ok(role) => role,
        Err(e) => {
            counter!(WS_REJECTED_HANDSHAKES_TOTAL, "reason" => e.reason()).increment(1);
            // The path carries the credential; log only the role segment.
            let segment = uri.path().split('/').nth(1).unwrap_or("");
            warn!(segment, reason = e.reason(), "handshake refused");
            return e.into_response();
        }
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            counter!(WS_REJECTED_HANDSHAKES_TOTAL, "reason" => "not_upgrade").increment(1);
            return rejection.into_response();
        }
    };

    let conn_id = ConnectionId::new();
    info!(conn_id = %conn_id, role = %role, "handshake accepted");
    let hub = state.hub.clone();
    let config = state.config.clone();
    let shutdown = state.shutdown.child_token();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| session::run_session(socket, conn_id, role, hub, config, shutdown))
}
