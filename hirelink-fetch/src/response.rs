//! Uniform transport response.
//!
//! Every transport hands back a [`TransportResponse`] regardless of how the
//! data travelled, so the dispatcher's fallback loop never needs to know
//! which transport satisfied a request.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Status reported when a transport has no real HTTP status to offer.
pub const SYNTHETIC_STATUS: u16 = 200;

// ============================================================================
// Response Body
// ============================================================================

/// Body of a transport response, parsed lazily.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Raw bytes straight off the wire.
    Raw(Vec<u8>),
    /// Data already decoded by the transport (relay payloads).
    Json(Value),
    /// No body at all.
    Empty,
}

// ============================================================================
// Transport Response
// ============================================================================

/// Normalized result of a transport attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    status: u16,
    body: ResponseBody,
}

impl TransportResponse {
    /// Wraps a real HTTP response.
    pub fn from_http(status: u16, bytes: Vec<u8>) -> Self {
        let body = if bytes.is_empty() {
            ResponseBody::Empty
        } else {
            ResponseBody::Raw(bytes)
        };
        Self { status, body }
    }

    /// Wraps data delivered by a relay, which carries no status of its own.
    pub fn from_payload(payload: Value) -> Self {
        Self {
            status: SYNTHETIC_STATUS,
            body: ResponseBody::Json(payload),
        }
    }

    /// A reachability-only result: success, but nothing to read.
    pub fn reachable() -> Self {
        Self {
            status: SYNTHETIC_STATUS,
            body: ResponseBody::Empty,
        }
    }

    /// Numeric status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body as received.
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Returns true if there is something to parse.
    pub fn has_body(&self) -> bool {
        !matches!(self.body, ResponseBody::Empty)
    }

    /// Parses the body as JSON.
    ///
    /// An empty body with a success status parses as `null` (e.g. `204 No
    /// Content`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Parse`] if the body is not valid JSON.
    pub fn json(&self) -> Result<Value, ApiError> {
        match &self.body {
            ResponseBody::Json(value) => Ok(value.clone()),
            ResponseBody::Raw(bytes) => Ok(serde_json::from_slice(bytes)?),
            ResponseBody::Empty => Ok(Value::Null),
        }
    }

    /// Parses the body into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Parse`] if the body does not match `T`.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_value(self.json()?)?)
    }

    /// Returns the body as lossy UTF-8 text.
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Raw(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            ResponseBody::Json(Value::String(s)) => s.clone(),
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Empty => String::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
