//! # switchboard-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SwitchboardSettings::default()`]
//! 2. **Settings file**: `~/.switchboard/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `SWITCHBOARD_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the daemon.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_settings_from_path, settings_path};
pub use types::*;
