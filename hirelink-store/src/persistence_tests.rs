//! Persistence round-trip and edge case tests.
//!
//! Tests file I/O, settings persistence and the settings store lifecycle.

use std::path::PathBuf;
use tempfile::TempDir;

use crate::config::{ConfigSource, ResolvedConfig};
use crate::persistence::{load_json, load_json_or_default, save_json};
use crate::settings_store::{LogLevel, Settings, SettingsStore};

// ============================================================================
// JSON Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_settings_full_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    let settings = Settings {
        api_base_url: Some("https://jobs.example.com/api".to_string()),
        liveness_path: "/health".to_string(),
        debounce_window_secs: 5,
        monitor_interval_secs: 15,
        public_relay_enabled: false,
        log_level: LogLevel::Debug,
        ..Default::default()
    };

    save_json(&file_path, &settings).await.unwrap();
    let loaded: Settings = load_json(&file_path).await.unwrap();

    assert_eq!(loaded, settings);
}

#[tokio::test]
async fn test_save_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested_path = temp_dir.path().join("deeply").join("nested").join("settings.json");

    save_json(&nested_path, &Settings::default()).await.unwrap();
    assert!(nested_path.exists());
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let file_path = PathBuf::from("/nonexistent/path/settings.json");

    let result: Result<Settings, _> = load_json(&file_path).await;
    assert!(result.is_err());

    let settings: Settings = load_json_or_default(&file_path).await;
    assert_eq!(settings, Settings::default());
}

#[tokio::test]
async fn test_atomic_write() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("settings.json");

    save_json(&file_path, &Settings::default()).await.unwrap();

    assert!(!file_path.with_extension("json.tmp").exists());
    assert!(file_path.exists());
}

// ============================================================================
// Backward Compatibility Tests
// ============================================================================

#[tokio::test]
async fn test_load_minimal_json_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("minimal.json");
    tokio::fs::write(&file_path, r#"{"api_base_url": "http://10.0.0.5/api"}"#)
        .await
        .unwrap();

    let loaded: Settings = load_json(&file_path).await.unwrap();

    assert_eq!(loaded.api_base_url.as_deref(), Some("http://10.0.0.5/api"));
    assert_eq!(loaded.liveness_path, "/ping");
    assert_eq!(loaded.relay_timeout_secs, 10);
}

#[tokio::test]
async fn test_load_json_with_unknown_fields() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("extra_fields.json");
    let json = r#"{
        "debounce_window_secs": 12,
        "theme": "dark",
        "nested_unknown": {"key": "value"}
    }"#;
    tokio::fs::write(&file_path, json).await.unwrap();

    let loaded: Settings = load_json(&file_path).await.unwrap();
    assert_eq!(loaded.debounce_window_secs, 12);
}

// ============================================================================
// Settings Store Lifecycle
// ============================================================================

#[tokio::test]
async fn test_store_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("hirelink").join("settings.json");

    let store = SettingsStore::load(path.clone()).await;
    assert_eq!(store.get().await, Settings::default());

    store
        .set_api_base_url(Some("https://jobs.example.com/api".to_string()))
        .await;
    store.save().await.unwrap();

    let reloaded = SettingsStore::load(path).await;
    assert_eq!(
        reloaded.api_base_url().await.as_deref(),
        Some("https://jobs.example.com/api")
    );
}

#[tokio::test]
async fn test_corrupt_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    tokio::fs::write(&path, "{ not json").await.unwrap();

    let store = SettingsStore::load(path.clone()).await;

    assert_eq!(store.get().await, Settings::default());
    assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{ not json");
}

#[tokio::test]
async fn test_saved_preference_feeds_url_resolution() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");

    let store = SettingsStore::load(path.clone()).await;
    store
        .set_api_base_url(Some("https://prefs.example.com/api".to_string()))
        .await;
    store.save().await.unwrap();

    let settings = SettingsStore::load(path).await.get().await;
    let config = ResolvedConfig::resolve_from(None, None, &settings).unwrap();
    assert_eq!(config.source, ConfigSource::UserPreference);
    assert_eq!(config.base_url.as_str(), "https://prefs.example.com/api");
}

#[tokio::test]
async fn test_unicode_in_settings() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("unicode.json");
    let settings = Settings {
        liveness_path: "/santé/ping".to_string(),
        ..Default::default()
    };

    save_json(&file_path, &settings).await.unwrap();
    let loaded: Settings = load_json(&file_path).await.unwrap();

    assert_eq!(loaded.liveness_path, "/santé/ping");
}
