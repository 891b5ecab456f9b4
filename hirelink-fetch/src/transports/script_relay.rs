//! Script-tag relay transport.
//!
//! The endpoint is loaded as an executable script with a `callback` query
//! parameter naming a function. A cooperating backend answers with a script
//! that invokes that function with the payload as its only argument:
//!
//! ```text
//! hirelink_relay_1718000000000_3([{"id":7}]);
//! ```
//!
//! Loading and invocation are separated by the [`ScriptLoader`] seam and the
//! [`RelayCallbackRegistry`], so a load that never calls back simply runs
//! into the deadline.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::ApiError;
use crate::host::http::HttpClient;
use crate::relay::{PendingRelayCall, RelayCallbackRegistry};
use crate::response::TransportResponse;
use crate::transport::{ensure_read_only, Transport, TransportKind, TransportRequest};

/// Default deadline for a relay call.
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Query parameter carrying the callback name.
pub const CALLBACK_PARAM: &str = "callback";

// ============================================================================
// Script Loader
// ============================================================================

/// Loads a relay script.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    /// Fetches the script text.
    ///
    /// A failed load (connection error or non-2xx response) is a
    /// [`ApiError::Network`].
    async fn load(&self, url: &Url) -> Result<String, ApiError>;
}

#[async_trait]
impl ScriptLoader for HttpClient {
    async fn load(&self, url: &Url) -> Result<String, ApiError> {
        let response = self.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Network(format!(
                "script load failed with HTTP {}",
                status.as_u16()
            )));
        }
        self.read_text(response).await
    }
}

// ============================================================================
// Script Relay Transport
// ============================================================================

/// Delivers GET results through a caller-named callback.
pub struct ScriptRelayTransport {
    loader: Arc<dyn ScriptLoader>,
    registry: Arc<RelayCallbackRegistry>,
    deadline: Duration,
}

impl ScriptRelayTransport {
    /// Creates a relay transport with the default 10 second deadline.
    pub fn new(loader: Arc<dyn ScriptLoader>, registry: Arc<RelayCallbackRegistry>) -> Self {
        Self {
            loader,
            registry,
            deadline: DEFAULT_RELAY_TIMEOUT,
        }
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// The registry this transport allocates callbacks from.
    pub fn registry(&self) -> &Arc<RelayCallbackRegistry> {
        &self.registry
    }

    async fn run(&self, url: &Url, call: &mut PendingRelayCall) -> Result<TransportResponse, ApiError> {
        let script = self.loader.load(url).await?;

        match extract_invocation(&script, call.name())? {
            Some(payload) => {
                self.registry.deliver(call.name(), payload);
            }
            None => debug!(callback = %call.name(), "Script loaded without invoking callback"),
        }

        call.payload()
            .await
            .map(TransportResponse::from_payload)
            .ok_or_else(|| ApiError::Network("relay callback released without payload".to_string()))
    }
}

impl std::fmt::Debug for ScriptRelayTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRelayTransport")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for ScriptRelayTransport {
    fn id(&self) -> &str {
        "script_relay"
    }

    fn kind(&self) -> TransportKind {
        TransportKind::ScriptRelay
    }

    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn attempt(&self, request: &TransportRequest) -> Result<TransportResponse, ApiError> {
        ensure_read_only(self.id(), request)?;

        let mut call = self.registry.allocate();
        let url = with_callback(&request.url, call.name());

        let outcome = tokio::time::timeout(self.deadline, self.run(&url, &mut call)).await;
        drop(call);

        outcome.unwrap_or_else(|_| {
            warn!(deadline = ?self.deadline, "Relay call timed out");
            Err(ApiError::Timeout(self.deadline))
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns `url` with its `callback` parameter set to `name`.
pub fn with_callback(url: &Url, name: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != CALLBACK_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = url.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(CALLBACK_PARAM, name);
    url
}

/// Finds the first `name(<payload>)` call in a relay script and parses the
/// payload.
///
/// Anything after the call (a source map comment, further statements) is
/// ignored. Returns `Ok(None)` if the script never invokes `name`. A call
/// with no argument yields `null`.
///
/// # Errors
///
/// Returns [`ApiError::Parse`] if the argument is not valid JSON or the call
/// is never closed.
pub fn extract_invocation(script: &str, name: &str) -> Result<Option<Value>, ApiError> {
    let pattern = format!(r"\b{}\s*\(", regex::escape(name));
    let re = Regex::new(&pattern).map_err(|e| ApiError::Parse(e.to_string()))?;

    let Some(call) = re.find(script) else {
        return Ok(None);
    };
    let argument = call_argument(&script[call.end()..])
        .ok_or_else(|| ApiError::Parse(format!("unterminated call to {name}")))?
        .trim();
    if argument.is_empty() {
        return Ok(Some(Value::Null));
    }
    Ok(Some(serde_json::from_str(argument)?))
}

/// Returns the text up to the `)` closing a call, skipping brackets and
/// string literals in between.
fn call_argument(rest: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in rest.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => return Some(&rest[..i]),
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
