//! Public relay proxy transport.
//!
//! Routes a GET through a third-party relay that fetches the target URL
//! server-side and answers with an envelope:
//!
//! ```json
//! { "contents": "<target body>", "status": { "http_code": 200 } }
//! ```
//!
//! The relay sees the full target URL, query string included. Every use is
//! logged at warn level and the transport can be switched off through
//! configuration.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{instrument, warn};
use url::Url;

use crate::error::ApiError;
use crate::host::http::HttpClient;
use crate::response::TransportResponse;
use crate::transport::{ensure_read_only, Transport, TransportKind, TransportRequest};

/// Default relay endpoint.
pub const DEFAULT_PUBLIC_RELAY_URL: &str = "https://api.allorigins.win/get";

#[derive(Debug, Deserialize)]
struct RelayEnvelope {
    contents: Option<String>,
    #[serde(default)]
    status: Option<RelayStatus>,
}

#[derive(Debug, Deserialize)]
struct RelayStatus {
    http_code: Option<u16>,
}

/// Fetches reads through a third-party relay service.
#[derive(Debug, Clone)]
pub struct PublicRelayTransport {
    http: Arc<HttpClient>,
    relay_url: Url,
}

impl PublicRelayTransport {
    /// Creates a transport using the given relay endpoint.
    pub fn new(http: Arc<HttpClient>, relay_url: Url) -> Self {
        Self { http, relay_url }
    }

    /// The relay endpoint.
    pub fn relay_url(&self) -> &Url {
        &self.relay_url
    }

    fn relayed(&self, target: &Url) -> Url {
        let mut url = self.relay_url.clone();
        url.query_pairs_mut().append_pair("url", target.as_str());
        url
    }
}

#[async_trait]
impl Transport for PublicRelayTransport {
    fn id(&self) -> &str {
        "public_relay"
    }

    fn kind(&self) -> TransportKind {
        TransportKind::PublicRelay
    }

    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn attempt(&self, request: &TransportRequest) -> Result<TransportResponse, ApiError> {
        ensure_read_only(self.id(), request)?;
        warn!(
            relay = %self.relay_url,
            "Disclosing request URL to third-party relay"
        );

        let response = self.http.get(&self.relayed(&request.url)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: format!("relay answered {status}"),
            });
        }

        let text = self.http.read_text(response).await?;
        unwrap_envelope(&text).map(TransportResponse::from_payload)
    }
}

/// Extracts the target body from a relay envelope.
///
/// Contents that parse as JSON are returned as such; anything else is
/// returned as a JSON string holding the raw text.
///
/// # Errors
///
/// - [`ApiError::Parse`] if the envelope itself is malformed
/// - [`ApiError::Http`] if the envelope reports a non-2xx target status
/// - [`ApiError::Network`] if the relay could not fetch the target
pub fn unwrap_envelope(text: &str) -> Result<Value, ApiError> {
    let envelope: RelayEnvelope = serde_json::from_str(text)?;

    if let Some(code) = envelope.status.and_then(|s| s.http_code) {
        if !(200..300).contains(&code) {
            return Err(ApiError::Http {
                status: code,
                message: "target failed behind relay".to_string(),
            });
        }
    }

    let contents = envelope
        .contents
        .ok_or_else(|| ApiError::Network("relay returned no contents".to_string()))?;

    Ok(serde_json::from_str(&contents).unwrap_or(Value::String(contents)))
}
