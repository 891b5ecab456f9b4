//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use hirelink_core::{ConnectionSnapshot, ConnectionStatus, HttpMethod};
use hirelink_fetch::{ApiError, DispatchOutcome, TransportAttempt};
use hirelink_store::ResolvedConfig;
use serde::{Serialize, Serializer};
use serde_json::Value;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutput {
    pub method: HttpMethod,
    pub endpoint: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    pub duration_ms: u128,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<AttemptOutput>,
}

/// A request failure.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// One transport attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutput {
    pub transport: String,
    pub kind: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u128,
}

/// Result of a connectivity check.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutput {
    pub base_url: String,
    pub source: String,
    pub liveness_url: String,
    pub connected: bool,
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub checked_at: Option<DateTime<Utc>>,
}

/// One connectivity notification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEventOutput {
    pub connected: bool,
    #[serde(serialize_with = "serialize_datetime")]
    pub at: DateTime<Utc>,
}

impl From<&TransportAttempt> for AttemptOutput {
    fn from(attempt: &TransportAttempt) -> Self {
        Self {
            transport: attempt.transport_id.clone(),
            kind: attempt.kind.display_name().to_string(),
            success: attempt.success,
            error: attempt.error.clone(),
            duration_ms: attempt.duration.as_millis(),
        }
    }
}

impl From<&ApiError> for ErrorOutput {
    fn from(error: &ApiError) -> Self {
        let kind = match error {
            ApiError::Network(_) => "network",
            ApiError::Http { .. } => "http",
            ApiError::Timeout(_) => "timeout",
            ApiError::Parse(_) => "parse",
            ApiError::AllTransportsExhausted { .. } => "all_transports_exhausted",
            ApiError::InvalidUrl(_) => "invalid_url",
            ApiError::Unsupported { .. } => "unsupported",
            ApiError::Client(_) => "client",
        };
        Self {
            kind,
            message: error.to_string(),
            status: error.status(),
        }
    }
}

impl CheckOutput {
    /// Builds the output of a finished check.
    pub fn new(config: &ResolvedConfig, liveness_url: &str, snapshot: &ConnectionSnapshot) -> Self {
        Self {
            base_url: config.base_url.to_string(),
            source: config.source.description().to_string(),
            liveness_url: liveness_url.to_string(),
            connected: snapshot.status.is_connected(),
            status: snapshot.status,
            checked_at: snapshot.last_checked_at,
        }
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}

#[allow(clippy::ref_option)]
fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a dispatch outcome. The attempt log is included with `trace`.
    pub fn format_outcome(
        &self,
        method: HttpMethod,
        endpoint: &str,
        outcome: &DispatchOutcome,
        trace: bool,
    ) -> Result<String> {
        self.format(&request_output(method, endpoint, outcome, trace))
    }

    /// Formats one connectivity notification.
    pub fn format_status_event(&self, connected: bool, at: DateTime<Utc>) -> Result<String> {
        // One event per line regardless of --pretty.
        Ok(serde_json::to_string(&StatusEventOutput { connected, at })?)
    }
}

/// Converts a dispatch outcome to output.
pub fn request_output(
    method: HttpMethod,
    endpoint: &str,
    outcome: &DispatchOutcome,
    trace: bool,
) -> RequestOutput {
    let (data, error) = match &outcome.result {
        Ok(value) => (Some(value.clone()), None),
        Err(e) => (None, Some(ErrorOutput::from(e))),
    };

    RequestOutput {
        method,
        endpoint: endpoint.to_string(),
        ok: outcome.is_success(),
        data,
        error,
        transport: outcome.successful_transport().map(str::to_string),
        duration_ms: outcome.duration.as_millis(),
        attempts: if trace {
            outcome.attempts.iter().map(AttemptOutput::from).collect()
        } else {
            Vec::new()
        },
    }
}
