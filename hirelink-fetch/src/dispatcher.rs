//! Request dispatcher.
//!
//! Reads go through an ordered fallback chain until one transport delivers
//! data. Writes go to the direct transport only and their failures are
//! returned unchanged.

use hirelink_core::{ConnectivitySink, HttpMethod};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::context::TransportContext;
use crate::error::ApiError;
use crate::transport::{Transport, TransportKind, TransportRequest};

// ============================================================================
// Transport Attempt
// ============================================================================

/// Record of a single transport attempt.
#[derive(Debug, Clone)]
pub struct TransportAttempt {
    /// The transport that was attempted.
    pub transport_id: String,
    /// The kind of transport used.
    pub kind: TransportKind,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Error if the attempt failed.
    pub error: Option<String>,
    /// How long the attempt took.
    pub duration: Duration,
}

impl TransportAttempt {
    /// Creates a successful attempt record.
    pub fn success(transport_id: impl Into<String>, kind: TransportKind, duration: Duration) -> Self {
        Self {
            transport_id: transport_id.into(),
            kind,
            success: true,
            error: None,
            duration,
        }
    }

    /// Creates a failed attempt record.
    pub fn failure(
        transport_id: impl Into<String>,
        kind: TransportKind,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            transport_id: transport_id.into(),
            kind,
            success: false,
            error: Some(error.into()),
            duration,
        }
    }
}

// ============================================================================
// Dispatch Outcome
// ============================================================================

/// The outcome of one dispatch, with its attempt log.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Parsed data, or the final error.
    pub result: Result<Value, ApiError>,
    /// All attempts made, in order.
    pub attempts: Vec<TransportAttempt>,
    /// Total duration of all attempts.
    pub duration: Duration,
}

impl DispatchOutcome {
    /// Returns true if the dispatch produced data.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Returns the number of transports that were tried.
    pub fn attempts_count(&self) -> usize {
        self.attempts.len()
    }

    /// Returns the transport that delivered the data, if any.
    pub fn successful_transport(&self) -> Option<&str> {
        self.attempts
            .iter()
            .find(|a| a.success)
            .map(|a| a.transport_id.as_str())
    }

    /// Returns all errors that occurred.
    pub fn errors(&self) -> Vec<&str> {
        self.attempts
            .iter()
            .filter_map(|a| a.error.as_deref())
            .collect()
    }
}

// ============================================================================
// Request Dispatcher
// ============================================================================

/// Resolves endpoints against the base URL and runs the transport chain.
pub struct RequestDispatcher {
    base_url: Url,
    direct: Arc<dyn Transport>,
    read_fallbacks: Vec<Arc<dyn Transport>>,
    sink: Option<Arc<dyn ConnectivitySink>>,
}

impl RequestDispatcher {
    /// Creates a dispatcher with an explicit chain.
    ///
    /// Fallbacks that cannot deliver data are dropped from the chain.
    pub fn new(
        base_url: Url,
        direct: Arc<dyn Transport>,
        read_fallbacks: Vec<Arc<dyn Transport>>,
    ) -> Self {
        let read_fallbacks = read_fallbacks
            .into_iter()
            .filter(|t| {
                let keep = t.delivers_data();
                if !keep {
                    warn!(transport = %t.id(), "Transport carries no data, left out of read chain");
                }
                keep
            })
            .collect();

        Self {
            base_url,
            direct,
            read_fallbacks,
            sink: None,
        }
    }

    /// Creates a dispatcher using the standard chain of a context.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the public relay URL is invalid.
    pub fn from_context(base_url: Url, ctx: &TransportContext) -> Result<Self, ApiError> {
        Ok(Self::new(base_url, ctx.direct(), ctx.read_fallbacks()?))
    }

    /// Reports every dispatch outcome to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ConnectivitySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The base API URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Identifiers of the read chain, in order.
    pub fn read_chain(&self) -> Vec<&str> {
        std::iter::once(&self.direct)
            .chain(&self.read_fallbacks)
            .map(|t| t.id())
            .collect()
    }

    /// Resolves an endpoint to an absolute URL.
    ///
    /// Absolute `http(s)` endpoints are used as given; anything else is
    /// appended to the base URL with exactly one `/` between them.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the result does not parse.
    pub fn resolve(&self, endpoint: &str) -> Result<Url, ApiError> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(Url::parse(endpoint)?);
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        let path = endpoint.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Dispatches a request and returns the parsed data.
    ///
    /// # Errors
    ///
    /// - Writes: the direct transport's error, unchanged
    /// - Reads: [`ApiError::AllTransportsExhausted`] once every transport failed
    /// - [`ApiError::InvalidUrl`] if the endpoint cannot be resolved
    pub async fn dispatch(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.dispatch_logged(method, endpoint, body).await.result
    }

    /// Dispatches a request and returns the full attempt log.
    #[instrument(skip(self, body), fields(method = %method, endpoint = %endpoint))]
    pub async fn dispatch_logged(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Value>,
    ) -> DispatchOutcome {
        let start = Instant::now();
        let mut attempts = Vec::new();

        let url = match self.resolve(endpoint) {
            Ok(url) => url,
            Err(error) => {
                warn!(error = %error, "Endpoint does not resolve");
                return DispatchOutcome {
                    result: Err(error),
                    attempts,
                    duration: start.elapsed(),
                };
            }
        };
        let request = TransportRequest::new(method, url, body);

        if request.is_write() {
            let result = self
                .try_transport(self.direct.as_ref(), &request, &mut attempts)
                .await;
            match &result {
                Ok(_) => self.record(true),
                Err(error) => {
                    debug!(error = %error, "Write failed, no fallback for writes");
                    if !error.is_caller_error() {
                        self.record(false);
                    }
                }
            }
            return DispatchOutcome {
                result,
                attempts,
                duration: start.elapsed(),
            };
        }

        info!(chain = self.read_fallbacks.len() + 1, "Dispatching read");

        let mut primary = None;
        for transport in std::iter::once(&self.direct).chain(&self.read_fallbacks) {
            match self
                .try_transport(transport.as_ref(), &request, &mut attempts)
                .await
            {
                Ok(value) => {
                    self.record(true);
                    return DispatchOutcome {
                        result: Ok(value),
                        attempts,
                        duration: start.elapsed(),
                    };
                }
                Err(error) => {
                    primary.get_or_insert(error);
                }
            }
        }

        warn!(attempts = attempts.len(), "All transports exhausted");
        self.record(false);

        let primary =
            primary.unwrap_or_else(|| ApiError::Network("no transport attempted".to_string()));
        DispatchOutcome {
            result: Err(ApiError::AllTransportsExhausted {
                primary: Box::new(primary),
                attempts: attempts.clone(),
            }),
            attempts,
            duration: start.elapsed(),
        }
    }

    async fn try_transport(
        &self,
        transport: &dyn Transport,
        request: &TransportRequest,
        attempts: &mut Vec<TransportAttempt>,
    ) -> Result<Value, ApiError> {
        let id = transport.id();
        let kind = transport.kind();
        let started = Instant::now();
        debug!(transport = %id, kind = %kind, "Attempting transport");

        let result = transport
            .attempt(request)
            .await
            .and_then(|response| response.json());
        let duration = started.elapsed();

        match &result {
            Ok(_) => {
                info!(transport = %id, duration = ?duration, "Transport succeeded");
                attempts.push(TransportAttempt::success(id, kind, duration));
            }
            Err(error) => {
                warn!(transport = %id, error = %error, duration = ?duration, "Transport failed");
                attempts.push(TransportAttempt::failure(id, kind, error.to_string(), duration));
            }
        }
        result
    }

    fn record(&self, connected: bool) {
        if let Some(sink) = &self.sink {
            sink.record_outcome(connected);
        }
    }
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("base_url", &self.base_url.as_str())
            .field("read_chain", &self.read_chain())
            .finish_non_exhaustive()
    }
}
