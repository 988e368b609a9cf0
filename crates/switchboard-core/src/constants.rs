//! Package-level constants.

/// Current version of the hub (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "switchboard";

/// Tool names reserved for the hub's own collaborators. Never exposed in the
/// shared tool directory even when a node advertises them.
pub const DEFAULT_INTERNAL_TOOLS: &[&str] = &["internal_request_file"];

/// Name of the plugin-runtime service module that tracks browser page state.
pub const BRIDGE_SERVICE_MODULE: &str = "BrowserObserver";
