//! Settings type definitions.
//!
//! All types use `camelCase` JSON and `#[serde(default)]`, so a partial
//! settings file only needs the keys it changes.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskdeckSettings {
    /// Settings schema version.
    pub version: String,
    /// Remote store connection.
    pub store: StoreSettings,
    /// Log output.
    pub logging: LoggingSettings,
    /// Dashboard view.
    pub dashboard: DashboardSettings,
}

impl Default for TaskdeckSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            store: StoreSettings::default(),
            logging: LoggingSettings::default(),
            dashboard: DashboardSettings::default(),
        }
    }
}

impl TaskdeckSettings {
    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        if self.store.base_url.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "store.baseUrl must not be empty".to_string(),
            ));
        }
        if !self.store.base_url.starts_with("http://") && !self.store.base_url.starts_with("https://")
        {
            return Err(SettingsError::InvalidValue(format!(
                "store.baseUrl must be an http(s) URL, got {}",
                self.store.base_url
            )));
        }
        if self.dashboard.recent_limit == 0 {
            return Err(SettingsError::InvalidValue(
                "dashboard.recentLimit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Remote store connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Base URL of the JSON store.
    pub base_url: String,
    /// Per-request timeout. `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            timeout_ms: None,
            user_agent: "taskdeck/0.1".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`error`, `warn`, `info`, `debug`, `trace`) or an
    /// `EnvFilter` directive.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Dashboard view settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
    /// How many tasks the "recent" list shows.
    pub recent_limit: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self { recent_limit: 4 }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
