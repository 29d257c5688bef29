//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TaskdeckSettings::default()`]
//! 2. If `~/.taskdeck/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::TaskdeckSettings;

/// Env var overriding `store.baseUrl`.
pub const ENV_BASE_URL: &str = "TASKDECK_BASE_URL";
/// Env var overriding `store.timeoutMs`.
pub const ENV_TIMEOUT_MS: &str = "TASKDECK_TIMEOUT_MS";
/// Env var overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "TASKDECK_LOG_LEVEL";
/// Env var overriding `dashboard.recentLimit`.
pub const ENV_RECENT_LIMIT: &str = "TASKDECK_RECENT_LIMIT";

/// Resolve the path to the settings file (`~/.taskdeck/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".taskdeck").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TaskdeckSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<TaskdeckSettings> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Load settings from `path`, reading overrides through `lookup`.
pub fn load_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<TaskdeckSettings> {
    let defaults = serde_json::to_value(TaskdeckSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: TaskdeckSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
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
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `TASKDECK_*` overrides read through `lookup`.
///
/// Empty values are ignored; out-of-range numbers are ignored with a warning.
pub fn apply_overrides(settings: &mut TaskdeckSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = read(ENV_BASE_URL) {
        settings.store.base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = read(ENV_TIMEOUT_MS) {
        match parse_u64_range(&v, 1000, 3_600_000) {
            Some(ms) => settings.store.timeout_ms = Some(ms),
            None => warn!(key = ENV_TIMEOUT_MS, value = %v, "invalid timeout env var, ignoring"),
        }
    }
    if let Some(v) = read(ENV_LOG_LEVEL) {
        settings.logging.level = v;
    }
    if let Some(v) = read(ENV_RECENT_LIMIT) {
        match parse_usize_range(&v, 1, 100) {
            Some(n) => settings.dashboard.recent_limit = n,
            None => warn!(key = ENV_RECENT_LIMIT, value = %v, "invalid limit env var, ignoring"),
        }
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within an inclusive range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ── deep_merge ───────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let merged = deep_merge(
            json!({"store": {"baseUrl": "a", "userAgent": "x"}}),
            json!({"store": {"baseUrl": "b"}}),
        );
        assert_eq!(merged, json!({"store": {"baseUrl": "b", "userAgent": "x"}}));
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn merge_array_replace() {
        let merged = deep_merge(json!({"a": [1, 2]}), json!({"a": [3]}));
        assert_eq!(merged, json!({"a": [3]}));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let merged = deep_merge(json!({"a": {"b": 1}}), json!({"a": 5}));
        assert_eq!(merged, json!({"a": 5}));
    }

    // ── Loading ──────────────────────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_with(&dir.path().join("nope.json"), no_env).unwrap();
        assert_eq!(settings, TaskdeckSettings::default());
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"store": {"baseUrl": "http://tasks.internal:8080"}, "dashboard": {"recentLimit": 10}}"#,
        )
        .unwrap();
        let settings = load_with(&path, no_env).unwrap();
        assert_eq!(settings.store.base_url, "http://tasks.internal:8080");
        assert_eq!(settings.dashboard.recent_limit, 10);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_with(&path, no_env).is_err());
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"store": {"baseUrl": "ftp://x"}}"#).unwrap();
        assert!(load_with(&path, no_env).is_err());
    }

    // ── Overrides ────────────────────────────────────────────────────

    #[test]
    fn env_overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"logging": {"level": "info"}}"#).unwrap();
        let settings = load_with(
            &path,
            env(&[
                (ENV_BASE_URL, "http://127.0.0.1:4000/"),
                (ENV_LOG_LEVEL, "debug"),
                (ENV_TIMEOUT_MS, "2500"),
                (ENV_RECENT_LIMIT, "8"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.store.base_url, "http://127.0.0.1:4000");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.store.timeout_ms, Some(2500));
        assert_eq!(settings.dashboard.recent_limit, 8);
    }

    #[test]
    fn invalid_numbers_are_ignored() {
        let mut settings = TaskdeckSettings::default();
        apply_overrides(
            &mut settings,
            env(&[(ENV_TIMEOUT_MS, "10"), (ENV_RECENT_LIMIT, "lots")]),
        );
        assert!(settings.store.timeout_ms.is_none());
        assert_eq!(settings.dashboard.recent_limit, 4);
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut settings = TaskdeckSettings::default();
        apply_overrides(&mut settings, env(&[(ENV_BASE_URL, "  ")]));
        assert_eq!(settings.store.base_url, "http://localhost:3001");
    }

    #[test]
    fn parse_range() {
        assert_eq!(parse_u64_range("5", 1, 10), Some(5));
        assert_eq!(parse_u64_range("0", 1, 10), None);
        assert_eq!(parse_u64_range("11", 1, 10), None);
        assert_eq!(parse_u64_range("x", 1, 10), None);
    }

    #[test]
    fn settings_path_under_home() {
        assert!(settings_path().ends_with(".taskdeck/settings.json"));
    }
}
