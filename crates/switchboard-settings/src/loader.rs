//! Settings loading: compiled defaults, then the JSON file, then env vars.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::SwitchboardSettings;

/// Resolve the default settings file (`~/.switchboard/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".switchboard").join("settings.json")
}

/// Load settings from `path` with env var overrides, then validate.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<SwitchboardSettings> {
    let defaults = serde_json::to_value(SwitchboardSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: SwitchboardSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SWITCHBOARD_*` environment variable overrides.
///
/// Invalid values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut SwitchboardSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
pub fn apply_overrides(
    settings: &mut SwitchboardSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = string("SWITCHBOARD_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = string("SWITCHBOARD_PORT") {
        match parse_u16_range(&v, 0, 65535) {
            Some(port) => settings.server.port = port,
            None => warn!(key = "SWITCHBOARD_PORT", value = %v, "invalid port env var, ignoring"),
        }
    }
    if let Some(v) = string("SWITCHBOARD_SECRET") {
        settings.auth.shared_secret = v;
    }
    if let Some(v) = string("SWITCHBOARD_CREDENTIAL_MARKER") {
        settings.auth.credential_marker = v;
    }
    if let Some(v) = string("SWITCHBOARD_TOOL_TIMEOUT_MS") {
        match parse_u64_range(&v, 1, 3_600_000) {
            Some(ms) => settings.tools.default_timeout_ms = ms,
            None => {
                warn!(key = "SWITCHBOARD_TOOL_TIMEOUT_MS", value = %v, "invalid timeout env var, ignoring");
            }
        }
    }
    if let Some(v) = string("SWITCHBOARD_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = string("SWITCHBOARD_LOG_JSON") {
        match parse_bool(&v) {
            Some(json) => settings.logging.json = json,
            None => warn!(key = "SWITCHBOARD_LOG_JSON", value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::errors::SettingsError;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let merged = deep_merge(
            json!({"server": {"port": 6005, "host": "0.0.0.0"}}),
            json!({"server": {"port": 7000}}),
        );
        assert_eq!(merged["server"]["port"], 7000);
        assert_eq!(merged["server"]["host"], "0.0.0.0");
    }

    #[test]
    fn merge_array_replaces() {
        let merged = deep_merge(
            json!({"internal": ["a", "b"]}),
            json!({"internal": ["c"]}),
        );
        assert_eq!(merged["internal"], json!(["c"]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null, "b": 2}));
        assert_eq!(merged, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let merged = deep_merge(json!({"a": {"nested": true}}), json!({"a": 42}));
        assert_eq!(merged["a"], 42);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_settings_from_path(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.server.port, 6005);
        assert_eq!(settings.auth.credential_marker, "key");
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"auth": {"sharedSecret": "s3cret"}, "tools": {"timeouts": {"render": 120000}}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.auth.shared_secret, "s3cret");
        assert_eq!(settings.auth.credential_marker, "key");
        assert_eq!(settings.tools.timeout_for("render"), Duration::from_secs(120));
        assert_eq!(settings.tools.internal, vec!["internal_request_file"]);
    }

    #[test]
    fn internal_list_is_replaced_not_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"tools": {"internal": ["secret_helper"]}}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.tools.internal, vec!["secret_helper"]);
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn wrong_type_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": "six"}}"#).unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn invalid_value_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"auth": {"credentialMarker": "k=y"}}"#).unwrap();
        assert_matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        );
    }

    // ── apply_overrides ─────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = SwitchboardSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("SWITCHBOARD_HOST", "127.0.0.1"),
                ("SWITCHBOARD_PORT", "7007"),
                ("SWITCHBOARD_SECRET", "hunter2"),
                ("SWITCHBOARD_CREDENTIAL_MARKER", "token"),
                ("SWITCHBOARD_TOOL_TIMEOUT_MS", "5000"),
                ("SWITCHBOARD_LOG_LEVEL", "debug"),
                ("SWITCHBOARD_LOG_JSON", "yes"),
            ]),
        );
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 7007);
        assert_eq!(settings.auth.shared_secret, "hunter2");
        assert_eq!(settings.auth.credential_marker, "token");
        assert_eq!(settings.tools.default_timeout_ms, 5000);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
    }

    #[test]
    fn invalid_env_values_ignored() {
        let mut settings = SwitchboardSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("SWITCHBOARD_PORT", "99999"),
                ("SWITCHBOARD_TOOL_TIMEOUT_MS", "0"),
                ("SWITCHBOARD_LOG_JSON", "maybe"),
                ("SWITCHBOARD_HOST", ""),
            ]),
        );
        assert_eq!(settings, SwitchboardSettings::default());
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for val in ["true", "1", "YES", "on"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in ["false", "0", "No", "OFF"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("0", 0, 65535), Some(0));
        assert_eq!(parse_u16_range("70000", 0, 65535), None);
        assert_eq!(parse_u64_range("500", 1000, 600_000), None);
        assert_eq!(parse_u64_range("abc", 1, 10), None);
    }
}
