//! API error types.

use std::time::Duration;
use thiserror::Error;

use crate::dispatcher::TransportAttempt;

// ============================================================================
// API Error
// ============================================================================

/// Classified failure of a transport attempt or a whole dispatch.
///
/// Variants carry owned strings rather than the underlying client errors so
/// an error can be logged, stored in an attempt record and still returned
/// to the caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The transport could not complete (connection refused, DNS failure,
    /// blocked response, script load error).
    #[error("Network failure: {0}")]
    Network(String),

    /// A response arrived but its status indicates failure.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// Server-supplied message, or the status reason.
        message: String,
    },

    /// The transport exceeded its deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body is not valid structured data.
    #[error("Parse failure: {0}")]
    Parse(String),

    /// Every transport of a read fallback chain failed.
    #[error("All transports exhausted ({} attempts): {primary}", attempts.len())]
    AllTransportsExhausted {
        /// The Direct Request failure, the most diagnostic of the chain.
        #[source]
        primary: Box<ApiError>,
        /// Every attempt made, in order.
        attempts: Vec<TransportAttempt>,
    },

    /// The endpoint could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The transport cannot carry this kind of request.
    #[error("Unsupported by {transport}: {reason}")]
    Unsupported {
        /// Transport identifier.
        transport: String,
        /// Why the request was refused.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl ApiError {
    /// Returns the HTTP status carried by this error, looking through an
    /// exhausted chain to its primary cause.
    pub fn status(&self) -> Option<u16> {
        match self.primary_cause() {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the primary cause of an exhausted chain, or `self`.
    pub fn primary_cause(&self) -> &ApiError {
        match self {
            Self::AllTransportsExhausted { primary, .. } => primary.primary_cause(),
            other => other,
        }
    }

    /// Returns true if this is (or wraps) a network failure.
    pub fn is_network(&self) -> bool {
        matches!(self.primary_cause(), Self::Network(_))
    }

    /// Returns true if this is (or wraps) a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.primary_cause(), Self::Timeout(_))
    }

    /// Returns true if the error says nothing about reachability.
    ///
    /// Caller mistakes must not flip the connectivity signal.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidUrl(_) | Self::Client(_))
    }

    /// Classifies a `reqwest` error raised while sending or reading.
    pub(crate) fn from_reqwest(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else if error.is_builder() {
            Self::InvalidUrl(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn exhausted(primary: ApiError) -> ApiError {
        ApiError::AllTransportsExhausted {
            primary: Box::new(primary),
            attempts: Vec::new(),
        }
    }

    #[test]
    fn test_primary_cause_unwraps_exhaustion() {
        let err = exhausted(ApiError::Network("connection refused".into()));
        assert!(err.is_network());
        assert!(matches!(err.primary_cause(), ApiError::Network(_)));
    }

    #[test]
    fn test_status_of_http_failure() {
        let err = exhausted(ApiError::Http {
            status: 503,
            message: "maintenance".into(),
        });
        assert_eq!(err.status(), Some(503));
        assert_eq!(ApiError::Network("x".into()).status(), None);
    }

    #[test]
    fn test_exhaustion_exposes_source() {
        use std::error::Error as _;

        let err = exhausted(ApiError::Timeout(Duration::from_secs(10)));
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Request timed out after 10s"));
    }

    #[test]
    fn test_caller_errors() {
        assert!(ApiError::InvalidUrl("nope".into()).is_caller_error());
        assert!(!ApiError::Network("down".into()).is_caller_error());
    }
}
