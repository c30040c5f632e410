use serde::{Deserialize, Serialize};

/// Connection settings for the hosted database backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the project, e.g. `https://xyz.supabase.co`. Change feeds
    /// and the table API are disabled while it is unset.
    pub url: Option<String>,
    /// Public (anonymous) API key of the project.
    pub anon_key: Option<String>,
    /// Database schema of the watched table.
    pub schema: String,
    /// Table holding the work entries.
    pub table: String,
    /// How often to ping the database so the hosted project stays awake.
    /// Disabled when unset.
    pub keep_alive_interval_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            schema: "public".to_string(),
            table: "work_entries".to_string(),
            keep_alive_interval_secs: Some(6 * 60 * 60),
        }
    }
}

impl BackendConfig {
    /// Returns the url and key pair if both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.url.as_deref(), self.anon_key.as_deref()) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some((url, key)),
            _ => None,
        }
    }
}

/// Settings for in-app and native notifications.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Whether the host supports native notifications at all. Resolved once
    /// at startup.
    pub native_enabled: bool,
    /// Seconds before a native alert for a data change closes itself.
    pub event_dismiss_secs: u64,
    /// Seconds before the "notifications enabled" confirmation closes itself.
    pub confirmation_dismiss_secs: u64,
    /// Icon shown with native alerts.
    pub icon: Option<String>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            native_enabled: true,
            event_dismiss_secs: 5,
            confirmation_dismiss_secs: 4,
            icon: Some("kbs-earthmovers-logo.png".to_string()),
        }
    }
}

/// Global application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub notifications: NotificationsConfig,
}
