//! User preferences store.
//!
//! Manages user settings with persistence and change notification.

use hirelink_fetch::TransportSettings;
use hirelink_fetch::transports::public_relay::DEFAULT_PUBLIC_RELAY_URL;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::info;

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json_or_default, save_json};

/// Default liveness endpoint, relative to the base API URL.
pub const DEFAULT_LIVENESS_PATH: &str = "/ping";

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ========================================================================
    // Backend
    // ========================================================================
    /// Preferred base API URL. Environment and command line take precedence.
    pub api_base_url: Option<String>,

    /// Liveness endpoint probed by health checks.
    pub liveness_path: String,

    // ========================================================================
    // Health Monitoring
    // ========================================================================
    /// Window during which a previous check result is reused.
    pub debounce_window_secs: u64,

    /// Interval between background checks.
    pub monitor_interval_secs: u64,

    // ========================================================================
    // Transports
    // ========================================================================
    /// Timeout for direct and public relay requests.
    pub request_timeout_secs: u64,

    /// Deadline of a script relay call.
    pub relay_timeout_secs: u64,

    /// Deadline of a cross-origin probe.
    pub probe_timeout_secs: u64,

    /// Endpoint of the third-party relay.
    pub public_relay_url: String,

    /// Whether reads may fall back to the third-party relay.
    pub public_relay_enabled: bool,

    // ========================================================================
    // Diagnostics
    // ========================================================================
    /// Log level used when not running verbose.
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        let transport = TransportSettings::default();
        Self {
            api_base_url: None,
            liveness_path: DEFAULT_LIVENESS_PATH.to_string(),
            debounce_window_secs: 30,
            monitor_interval_secs: 30,
            request_timeout_secs: transport.request_timeout.as_secs(),
            relay_timeout_secs: transport.relay_timeout.as_secs(),
            probe_timeout_secs: transport.probe_timeout.as_secs(),
            public_relay_url: DEFAULT_PUBLIC_RELAY_URL.to_string(),
            public_relay_enabled: transport.public_relay_enabled,
            log_level: LogLevel::Warn,
        }
    }
}

impl Settings {
    /// Window during which a previous check result is reused.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs(self.debounce_window_secs)
    }

    /// Interval between background checks.
    ///
    /// Never zero; a zero setting is treated as one second.
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs.max(1))
    }

    /// Transport configuration derived from these settings.
    pub fn to_transport_settings(&self) -> TransportSettings {
        TransportSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            relay_timeout: Duration::from_secs(self.relay_timeout_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            public_relay_url: self.public_relay_url.clone(),
            public_relay_enabled: self.public_relay_enabled,
        }
    }

    /// Names of every settable field.
    pub fn keys() -> Vec<String> {
        match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Sets one field from its textual form.
    ///
    /// The value is read as JSON first (`true`, `45`, `null`) and as a plain
    /// string otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for an unknown key or a value of the
    /// wrong type.
    pub fn set_field(&mut self, key: &str, raw: &str) -> Result<(), StoreError> {
        let mut map = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => return Err(StoreError::Config("settings are not an object".to_string())),
        };
        if !map.contains_key(key) {
            return Err(StoreError::Config(format!(
                "unknown setting '{key}' (expected one of: {})",
                Self::keys().join(", ")
            )));
        }

        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);

        *self = serde_json::from_value(Value::Object(map))
            .map_err(|e| StoreError::Config(format!("invalid value for '{key}': {e}")))?;
        Ok(())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Settings store with persistence and change notification.
#[derive(Debug)]
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
    version: Arc<RwLock<u64>>,
}

impl SettingsStore {
    /// Creates a store holding defaults, backed by `path`.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, Settings::default())
    }

    fn with_settings(path: PathBuf, settings: Settings) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            notify,
            version: Arc::new(RwLock::new(0)),
        }
    }

    /// Loads settings from the default path.
    pub async fn load_default() -> Self {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path.
    ///
    /// A missing file yields defaults. A corrupt file yields defaults with a
    /// warning and is left untouched until the next save.
    pub async fn load(path: PathBuf) -> Self {
        info!(path = %path.display(), "Loading settings");
        let settings: Settings = load_json_or_default(&path).await;
        Self::with_settings(path, settings)
    }

    /// Path the store saves to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut settings = self.settings.write().await;
            f(&mut settings);
        }
        self.notify_change().await;
    }

    /// Updates settings with a fallible edit; nothing changes on error.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns.
    pub async fn try_update<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Settings) -> Result<(), StoreError>,
    {
        {
            let mut settings = self.settings.write().await;
            let mut edited = settings.clone();
            f(&mut edited)?;
            *settings = edited;
        }
        self.notify_change().await;
        Ok(())
    }

    /// Restores every field to its default.
    pub async fn reset(&self) {
        self.update(|s| *s = Settings::default()).await;
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to settings changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        self.notify.send_replace(*version);
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Gets the preferred base API URL.
    pub async fn api_base_url(&self) -> Option<String> {
        self.settings.read().await.api_base_url.clone()
    }

    /// Sets or clears the preferred base API URL.
    pub async fn set_api_base_url(&self, url: Option<String>) {
        self.update(|s| s.api_base_url = url).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
