//! Base API URL resolution.
//!
//! The base URL is resolved once at startup from four layers, first match
//! wins: explicit override, environment, persisted preference, fallback.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info};
use url::Url;

use crate::error::StoreError;
use crate::settings_store::Settings;

/// Environment variable carrying the deployment's API URL.
pub const API_URL_ENV: &str = "HIRELINK_API_URL";

/// URL used when no layer provides one.
pub const FALLBACK_API_URL: &str = "http://localhost:8000/api";

// ============================================================================
// Config Source
// ============================================================================

/// The layer a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Command line flag or builder argument.
    Override,
    /// Deployment environment variable.
    Environment,
    /// Persisted user preference.
    UserPreference,
    /// Hardcoded default.
    Fallback,
}

impl ConfigSource {
    /// Returns a human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Override => "command line",
            Self::Environment => API_URL_ENV,
            Self::UserPreference => "settings file",
            Self::Fallback => "built-in default",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Resolved Config
// ============================================================================

/// Connection settings fixed for the life of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Base API URL.
    pub base_url: Url,
    /// Where the base URL came from.
    pub source: ConfigSource,
}

impl ResolvedConfig {
    /// Resolves the base URL from the process environment and `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the winning layer's value is not a
    /// valid `http(s)` URL.
    pub fn resolve(override_url: Option<&str>, settings: &Settings) -> Result<Self, StoreError> {
        let env = std::env::var(API_URL_ENV).ok();
        Self::resolve_from(override_url, env.as_deref(), settings)
    }

    /// Resolves the base URL from explicit layers.
    ///
    /// Blank values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the winning layer's value is not a
    /// valid `http(s)` URL.
    pub fn resolve_from(
        override_url: Option<&str>,
        env_url: Option<&str>,
        settings: &Settings,
    ) -> Result<Self, StoreError> {
        let layers = [
            (override_url, ConfigSource::Override),
            (env_url, ConfigSource::Environment),
            (settings.api_base_url.as_deref(), ConfigSource::UserPreference),
        ];

        let (raw, source) = layers
            .into_iter()
            .find_map(|(value, source)| {
                value
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (v, source))
            })
            .unwrap_or((FALLBACK_API_URL, ConfigSource::Fallback));

        debug!(source = %source, url = %raw, "Resolving base API URL");
        let base_url = parse_base_url(raw)?;
        info!(source = %source, url = %base_url, "Base API URL resolved");

        Ok(Self { base_url, source })
    }

    /// A config pinned to `base_url`, as if passed on the command line.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if `base_url` is invalid.
    pub fn with_base_url(base_url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            source: ConfigSource::Override,
        })
    }
}

/// Parses and checks a base API URL.
///
/// # Errors
///
/// Returns [`StoreError::Config`] if the value is not an absolute `http(s)`
/// URL.
pub fn parse_base_url(raw: &str) -> Result<Url, StoreError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| StoreError::Config(format!("invalid API URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(StoreError::Config(format!(
            "API URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
