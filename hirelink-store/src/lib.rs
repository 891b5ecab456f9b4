// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Hirelink Store
//!
//! Connectivity state and configuration for the Hirelink API client.
//!
//! This crate provides:
//!
//! - **ApiClient**: Composition root wiring the dispatcher to the monitor
//! - **HealthMonitor**: Shared connectivity state, debounced checks, background ticker
//! - **SubscriberRegistry**: Status callbacks with panic isolation
//! - **SettingsStore**: User preferences with persistence
//! - **ResolvedConfig**: Layered base URL resolution
//!
//! ## Usage
//!
//! ```ignore
//! use hirelink_store::{ApiClient, ResolvedConfig, SettingsStore};
//!
//! let settings = SettingsStore::load_default().await.get().await;
//! let config = ResolvedConfig::resolve(None, &settings)?;
//! let client = ApiClient::new(config, &settings)?;
//!
//! let _listener = client.on_connection_status_change(|connected| {
//!     println!("backend reachable: {connected}");
//! })?;
//!
//! let jobs = client.get("/jobs").await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod monitor;
pub mod persistence;
pub mod settings_store;
pub mod subscribers;

pub use client::{ApiClient, ConnectionSubscription};
pub use config::{API_URL_ENV, ConfigSource, FALLBACK_API_URL, ResolvedConfig};
pub use error::StoreError;
pub use monitor::{HealthMonitor, MonitorLease};
pub use persistence::{default_config_dir, default_settings_path, load_json, load_json_or_default, save_json};
pub use settings_store::{LogLevel, Settings, SettingsStore};
pub use subscribers::{StatusCallback, SubscriberRegistry, Subscription, SubscriptionId};

#[cfg(test)]
mod persistence_tests;
#[cfg(test)]
mod test_support;
