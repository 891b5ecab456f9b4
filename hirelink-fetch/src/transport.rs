//! Transport trait and types.
//!
//! A transport is one way of moving a request's result from the server to
//! the client. The dispatcher and the health monitor try transports in a
//! fixed order without knowing their internals.

use async_trait::async_trait;
use hirelink_core::HttpMethod;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

use crate::error::ApiError;
use crate::response::TransportResponse;

// ============================================================================
// Transport Kind
// ============================================================================

/// The mechanism a transport uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Plain HTTP request with credentials and JSON headers.
    Direct,
    /// Response delivered by invoking a caller-named callback.
    ScriptRelay,
    /// Reachability check only, never carries data.
    CrossOriginProbe,
    /// Third-party relay fetching the URL server-side.
    PublicRelay,
}

impl TransportKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Direct => "Direct Request",
            Self::ScriptRelay => "Script-Tag Relay",
            Self::CrossOriginProbe => "Cross-Origin Probe",
            Self::PublicRelay => "Public Relay Proxy",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Transport Request
// ============================================================================

/// A fully resolved request handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Absolute target URL.
    pub url: Url,
    /// Optional JSON body.
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Creates a request.
    pub fn new(method: HttpMethod, url: Url, body: Option<Value>) -> Self {
        Self { method, url, body }
    }

    /// Creates a body-less GET request.
    pub fn get(url: Url) -> Self {
        Self::new(HttpMethod::Get, url, None)
    }

    /// Returns true if only the direct transport may carry this request.
    ///
    /// Anything with a body, or any verb other than GET, is a write.
    pub fn is_write(&self) -> bool {
        self.body.is_some() || !self.method.is_read()
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// One technique for reaching the backend.
///
/// ## Implementing a Transport
///
/// ```ignore
/// struct LoopbackTransport;
///
/// #[async_trait]
/// impl Transport for LoopbackTransport {
///     fn id(&self) -> &str {
///         "loopback"
///     }
///
///     fn kind(&self) -> TransportKind {
///         TransportKind::Direct
///     }
///
///     async fn attempt(&self, request: &TransportRequest) -> Result<TransportResponse, ApiError> {
///         Ok(TransportResponse::from_payload(serde_json::json!({"url": request.url.as_str()})))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Unique identifier for this transport (e.g. "direct", "script_relay").
    fn id(&self) -> &str;

    /// The mechanism this transport uses.
    fn kind(&self) -> TransportKind;

    /// Human-readable name for this transport.
    fn display_name(&self) -> String {
        format!("{} ({})", self.id(), self.kind().display_name())
    }

    /// Whether a successful attempt yields a readable body.
    ///
    /// Reachability-only transports return false and are kept out of the
    /// data-returning fallback chain.
    fn delivers_data(&self) -> bool {
        true
    }

    /// Attempts the request.
    ///
    /// Returns a normalized response on success, or a classified failure.
    async fn attempt(&self, request: &TransportRequest) -> Result<TransportResponse, ApiError>;
}

/// Rejects writes on transports that can only carry reads.
pub(crate) fn ensure_read_only(transport: &str, request: &TransportRequest) -> Result<(), ApiError> {
    if request.is_write() {
        return Err(ApiError::Unsupported {
            transport: transport.to_string(),
            reason: format!("{} requests cannot be relayed", request.method),
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
