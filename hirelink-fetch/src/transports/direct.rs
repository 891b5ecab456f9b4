//! Direct request transport.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::host::http::HttpClient;
use crate::response::TransportResponse;
use crate::transport::{Transport, TransportKind, TransportRequest};

/// Longest error body quoted back in an [`ApiError::Http`] message.
const MAX_MESSAGE_LEN: usize = 200;

/// Plain HTTP request with credentials and JSON headers.
///
/// The only transport that carries writes. Succeeds only when the response
/// is readable and its status is 2xx.
#[derive(Debug, Clone)]
pub struct DirectTransport {
    http: Arc<HttpClient>,
}

impl DirectTransport {
    /// Creates a direct transport over the shared client.
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn id(&self) -> &str {
        "direct"
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Direct
    }

    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn attempt(&self, request: &TransportRequest) -> Result<TransportResponse, ApiError> {
        let response = self
            .http
            .send_json(request.method, &request.url, request.body.as_ref())
            .await?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(&e, self.http.timeout()))?;

        if !status.is_success() {
            let message = server_message(&bytes)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            debug!(status = status.as_u16(), %message, "Non-success status");
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(TransportResponse::from_http(status.as_u16(), bytes.to_vec()))
    }
}

/// Extracts a human-readable message from an error body.
///
/// Looks for the usual `message` / `error` / `detail` fields of a JSON body
/// and falls back to the (truncated) text itself.
fn server_message(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        for key in ["message", "error", "detail"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
    }

    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_MESSAGE_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hirelink_core::HttpMethod;
    use std::time::Duration;
    use url::Url;

    #[test]
    fn test_message_from_json_fields() {
        assert_eq!(
            server_message(br#"{"message":"Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(
            server_message(br#"{"detail":"Not found"}"#).as_deref(),
            Some("Not found")
        );
    }

    #[test]
    fn test_message_from_text_is_truncated() {
        let long = "x".repeat(500);
        let message = server_message(long.as_bytes()).unwrap();
        assert_eq!(message.len(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn test_empty_body_has_no_message() {
        assert_eq!(server_message(b""), None);
        assert_eq!(server_message(b"   "), None);
    }

    #[tokio::test]
    async fn test_unreachable_host_fails() {
        let http = Arc::new(HttpClient::with_timeout(Duration::from_secs(5)).unwrap());
        let transport = DirectTransport::new(http);
        let request = TransportRequest::new(
            HttpMethod::Post,
            Url::parse("http://127.0.0.1:9/auth/login").unwrap(),
            Some(serde_json::json!({"email": "a@b.c"})),
        );

        let err = transport.attempt(&request).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_) | ApiError::Timeout(_)));
    }
}
