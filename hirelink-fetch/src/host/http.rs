//! HTTP client with tracing and a shared cookie store.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - A cookie store, so session cookies travel with every request
//! - JSON request helpers
//! - Error classification into [`ApiError`]

use reqwest::{header, Client, Method, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::ApiError;
use hirelink_core::HttpMethod;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for Hirelink.
const USER_AGENT: &str = concat!("Hirelink/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper shared by all transports.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the TLS backend cannot be initialised.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ApiError> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self { inner, timeout })
    }

    /// Returns the client-wide timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Performs a request with JSON `Accept` and `Content-Type` headers.
    #[instrument(skip(self, body), fields(method = %method, url = %url))]
    pub async fn send_json(
        &self,
        method: HttpMethod,
        url: &Url,
        body: Option<&Value>,
    ) -> Result<Response, ApiError> {
        debug!("JSON request");

        let mut request = self
            .inner
            .request(to_reqwest_method(method), url.clone())
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e, self.timeout))?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a plain GET request.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &Url) -> Result<Response, ApiError> {
        self.get_with_timeout(url, self.timeout).await
    }

    /// Performs a plain GET request with a per-request deadline.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_with_timeout(&self, url: &Url, timeout: Duration) -> Result<Response, ApiError> {
        debug!("GET request");

        let response = self
            .inner
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e, timeout))?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Reads a response body as text, classifying read failures.
    pub async fn read_text(&self, response: Response) -> Result<String, ApiError> {
        response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(&e, self.timeout))
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

// ============================================================================
// Tests
// ============================================================================
