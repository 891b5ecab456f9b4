//! Cross-origin reachability probe.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};
use url::Url;

use crate::error::ApiError;
use crate::host::http::HttpClient;
use crate::response::TransportResponse;
use crate::transport::{Transport, TransportKind, TransportRequest};

/// Default deadline for a probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Cache-busting query parameter.
const CACHE_BUST_PARAM: &str = "_probe";

/// Confirms that the origin responds without reading any payload.
///
/// Any HTTP response counts as reachable, including error statuses: an
/// origin that answers 404 or 500 is still up. Only a failure to get any
/// response at all (refused connection, DNS failure, deadline) counts as
/// unreachable. A successful probe carries no body.
#[derive(Debug, Clone)]
pub struct CrossOriginProbe {
    http: Arc<HttpClient>,
    timeout: Duration,
}

impl CrossOriginProbe {
    /// Creates a probe with the default deadline.
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Sets the deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Transport for CrossOriginProbe {
    fn id(&self) -> &str {
        "cross_origin_probe"
    }

    fn kind(&self) -> TransportKind {
        TransportKind::CrossOriginProbe
    }

    fn delivers_data(&self) -> bool {
        false
    }

    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn attempt(&self, request: &TransportRequest) -> Result<TransportResponse, ApiError> {
        let url = cache_busted(&request.url);
        let response = self.http.get_with_timeout(&url, self.timeout).await?;
        debug!(status = %response.status(), "Origin responded");
        Ok(TransportResponse::reachable())
    }
}

fn cache_busted(url: &Url) -> Url {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut url = url.clone();
    url.query_pairs_mut()
        .append_pair(CACHE_BUST_PARAM, &millis.to_string());
    url
}
