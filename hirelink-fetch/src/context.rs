//! Transport context providing shared host resources.
//!
//! The context owns what the transports share (the HTTP client and the
//! relay callback registry) and builds the transport chains used by the
//! dispatcher and the health monitor.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::error::ApiError;
use crate::host::http::HttpClient;
use crate::relay::RelayCallbackRegistry;
use crate::transport::Transport;
use crate::transports::public_relay::DEFAULT_PUBLIC_RELAY_URL;
use crate::transports::{
    CrossOriginProbe, DirectTransport, PublicRelayTransport, ScriptLoader, ScriptRelayTransport,
    probe::DEFAULT_PROBE_TIMEOUT, script_relay::DEFAULT_RELAY_TIMEOUT,
};

// ============================================================================
// Transport Settings
// ============================================================================

/// Settings for the transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    /// Timeout for direct and public relay requests.
    pub request_timeout: Duration,
    /// Deadline of a script relay call.
    pub relay_timeout: Duration,
    /// Deadline of a cross-origin probe.
    pub probe_timeout: Duration,
    /// Endpoint of the third-party relay.
    pub public_relay_url: String,
    /// Whether reads may fall back to the third-party relay.
    pub public_relay_enabled: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            relay_timeout: DEFAULT_RELAY_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            public_relay_url: DEFAULT_PUBLIC_RELAY_URL.to_string(),
            public_relay_enabled: true,
        }
    }
}

impl TransportSettings {
    /// Creates settings with a custom request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Creates settings with the public relay disabled.
    pub fn without_public_relay(mut self) -> Self {
        self.public_relay_enabled = false;
        self
    }
}

// ============================================================================
// Transport Context
// ============================================================================

/// Shared resources and chain construction for the transports.
pub struct TransportContext {
    /// HTTP client shared by every network transport.
    pub http: Arc<HttpClient>,
    /// Loader used by the script relay.
    pub script_loader: Arc<dyn ScriptLoader>,
    /// Pending relay callbacks.
    pub relay_registry: Arc<RelayCallbackRegistry>,
    /// Transport settings.
    pub settings: TransportSettings,
}

impl TransportContext {
    /// Creates a context with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_settings(TransportSettings::default())
    }

    /// Creates a context with custom settings.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn with_settings(settings: TransportSettings) -> Result<Self, ApiError> {
        TransportContextBuilder::new().settings(settings).build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> TransportContextBuilder {
        TransportContextBuilder::new()
    }

    /// The direct transport.
    pub fn direct(&self) -> Arc<dyn Transport> {
        Arc::new(DirectTransport::new(Arc::clone(&self.http)))
    }

    /// The script relay transport.
    pub fn script_relay(&self) -> Arc<dyn Transport> {
        Arc::new(
            ScriptRelayTransport::new(
                Arc::clone(&self.script_loader),
                Arc::clone(&self.relay_registry),
            )
            .with_deadline(self.settings.relay_timeout),
        )
    }

    /// The cross-origin probe.
    pub fn probe(&self) -> Arc<dyn Transport> {
        Arc::new(CrossOriginProbe::new(Arc::clone(&self.http)).with_timeout(self.settings.probe_timeout))
    }

    /// The public relay, or `None` when disabled.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the relay URL does not parse.
    pub fn public_relay(&self) -> Result<Option<Arc<dyn Transport>>, ApiError> {
        if !self.settings.public_relay_enabled {
            return Ok(None);
        }
        let relay_url = Url::parse(&self.settings.public_relay_url)?;
        Ok(Some(Arc::new(PublicRelayTransport::new(
            Arc::clone(&self.http),
            relay_url,
        ))))
    }

    /// Fallbacks tried after the direct transport for reads, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the relay URL does not parse.
    pub fn read_fallbacks(&self) -> Result<Vec<Arc<dyn Transport>>, ApiError> {
        let mut chain = vec![self.script_relay()];
        chain.extend(self.public_relay()?);
        Ok(chain)
    }

    /// Chain run by a health check, in order.
    pub fn health_chain(&self) -> Vec<Arc<dyn Transport>> {
        vec![self.direct(), self.script_relay(), self.probe()]
    }
}

impl std::fmt::Debug for TransportContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Transport Context Builder
// ============================================================================

/// Builder for constructing a `TransportContext`.
#[derive(Default)]
pub struct TransportContextBuilder {
    http: Option<Arc<HttpClient>>,
    script_loader: Option<Arc<dyn ScriptLoader>>,
    relay_registry: Option<Arc<RelayCallbackRegistry>>,
    settings: TransportSettings,
}

impl TransportContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP client.
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the script loader used by the relay.
    pub fn script_loader(mut self, loader: Arc<dyn ScriptLoader>) -> Self {
        self.script_loader = Some(loader);
        self
    }

    /// Sets the relay callback registry.
    pub fn relay_registry(mut self, registry: Arc<RelayCallbackRegistry>) -> Self {
        self.relay_registry = Some(registry);
        self
    }

    /// Sets the transport settings.
    pub fn settings(mut self, settings: TransportSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.settings.request_timeout = timeout;
        self
    }

    /// Builds the context.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if no client was supplied and one cannot
    /// be built.
    pub fn build(self) -> Result<TransportContext, ApiError> {
        if self.settings.public_relay_enabled {
            warn!(
                relay = %self.settings.public_relay_url,
                "Public relay fallback enabled - read URLs may be disclosed to a third party"
            );
        }

        let http = match self.http {
            Some(http) => http,
            None => Arc::new(HttpClient::with_timeout(self.settings.request_timeout)?),
        };
        let script_loader = self
            .script_loader
            .unwrap_or_else(|| Arc::clone(&http) as Arc<dyn ScriptLoader>);

        Ok(TransportContext {
            http,
            script_loader,
            relay_registry: self.relay_registry.unwrap_or_default(),
            settings: self.settings,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
