//! Fallback chain scenarios for the request dispatcher.
//!
//! Transports are replaced by scripted fakes so each scenario controls
//! exactly which link of the chain fails and how.

use async_trait::async_trait;
use hirelink_core::{ConnectivitySink, HttpMethod};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

use crate::dispatcher::RequestDispatcher;
use crate::error::ApiError;
use crate::response::TransportResponse;
use crate::transport::{Transport, TransportKind, TransportRequest};

// ============================================================================
// Fakes
// ============================================================================

struct ScriptedTransport {
    id: &'static str,
    kind: TransportKind,
    delivers_data: bool,
    replies: Mutex<VecDeque<Result<TransportResponse, ApiError>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    fn new(id: &'static str, kind: TransportKind) -> Self {
        Self {
            id,
            kind,
            delivers_data: true,
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn direct() -> Self {
        Self::new("direct", TransportKind::Direct)
    }

    fn relay() -> Self {
        Self::new("script_relay", TransportKind::ScriptRelay)
    }

    fn public() -> Self {
        Self::new("public_relay", TransportKind::PublicRelay)
    }

    fn reply(self, reply: Result<TransportResponse, ApiError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn id(&self) -> &str {
        self.id
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn delivers_data(&self) -> bool {
        self.delivers_data
    }

    async fn attempt(&self, request: &TransportRequest) -> Result<TransportResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network(format!("{} has no scripted reply", self.id))))
    }
}

#[derive(Default)]
struct RecordingSink {
    outcomes: Mutex<Vec<bool>>,
}

impl RecordingSink {
    fn outcomes(&self) -> Vec<bool> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl ConnectivitySink for RecordingSink {
    fn record_outcome(&self, connected: bool) {
        self.outcomes.lock().unwrap().push(connected);
    }
}

struct Harness {
    dispatcher: RequestDispatcher,
    direct: Arc<ScriptedTransport>,
    relay: Arc<ScriptedTransport>,
    public: Arc<ScriptedTransport>,
    sink: Arc<RecordingSink>,
}

fn harness(direct: ScriptedTransport, relay: ScriptedTransport, public: ScriptedTransport) -> Harness {
    let direct = Arc::new(direct);
    let relay = Arc::new(relay);
    let public = Arc::new(public);
    let sink = Arc::new(RecordingSink::default());

    let dispatcher = RequestDispatcher::new(
        Url::parse("http://localhost:8000/api").unwrap(),
        direct.clone(),
        vec![relay.clone() as Arc<dyn Transport>, public.clone() as Arc<dyn Transport>],
    )
    .with_sink(sink.clone());

    Harness {
        dispatcher,
        direct,
        relay,
        public,
        sink,
    }
}

fn http_json(status: u16, body: &Value) -> Result<TransportResponse, ApiError> {
    Ok(TransportResponse::from_http(status, body.to_string().into_bytes()))
}

fn refused() -> ApiError {
    ApiError::Network("connection refused".to_string())
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_direct_success_skips_fallbacks() {
    let jobs = json!([{"id": 1}, {"id": 2}]);
    let h = harness(
        ScriptedTransport::direct().reply(http_json(200, &jobs)),
        ScriptedTransport::relay(),
        ScriptedTransport::public(),
    );

    let outcome = h.dispatcher.dispatch_logged(HttpMethod::Get, "/jobs", None).await;

    assert_eq!(outcome.result.unwrap(), jobs);
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(h.relay.calls(), 0);
    assert_eq!(h.public.calls(), 0);
    assert_eq!(h.sink.outcomes(), vec![true]);
}

#[tokio::test]
async fn test_relay_payload_after_direct_network_failure() {
    let h = harness(
        ScriptedTransport::direct().reply(Err(refused())),
        ScriptedTransport::relay().reply(Ok(TransportResponse::from_payload(json!([{"id": 7}])))),
        ScriptedTransport::public(),
    );

    let outcome = h.dispatcher.dispatch_logged(HttpMethod::Get, "/jobs", None).await;

    assert_eq!(outcome.result.as_ref().unwrap(), &json!([{"id": 7}]));
    assert_eq!(outcome.successful_transport(), Some("script_relay"));
    assert_eq!(outcome.attempts_count(), 2);
    assert_eq!(h.public.calls(), 0);
    assert_eq!(h.sink.outcomes(), vec![true]);
}

#[tokio::test]
async fn test_public_relay_is_last_resort() {
    let h = harness(
        ScriptedTransport::direct().reply(Err(refused())),
        ScriptedTransport::relay().reply(Err(ApiError::Timeout(std::time::Duration::from_secs(10)))),
        ScriptedTransport::public().reply(Ok(TransportResponse::from_payload(json!("pong")))),
    );

    let value = h.dispatcher.dispatch(HttpMethod::Get, "ping", None).await.unwrap();

    assert_eq!(value, json!("pong"));
    assert_eq!(h.direct.calls(), 1);
    assert_eq!(h.relay.calls(), 1);
    assert_eq!(h.public.calls(), 1);
}

#[tokio::test]
async fn test_exhaustion_wraps_direct_error() {
    let h = harness(
        ScriptedTransport::direct().reply(Err(refused())),
        ScriptedTransport::relay().reply(Err(ApiError::Timeout(std::time::Duration::from_secs(10)))),
        ScriptedTransport::public().reply(Err(ApiError::Http {
            status: 502,
            message: "bad gateway".into(),
        })),
    );

    let outcome = h.dispatcher.dispatch_logged(HttpMethod::Get, "/jobs", None).await;
    assert_eq!(outcome.errors().len(), 3);

    let Err(ApiError::AllTransportsExhausted { primary, attempts }) = outcome.result else {
        panic!("expected exhaustion");
    };
    assert!(matches!(*primary, ApiError::Network(ref m) if m == "connection refused"));
    assert_eq!(attempts.len(), 3);
    assert_eq!(h.sink.outcomes(), vec![false]);
}

#[tokio::test]
async fn test_unparsable_direct_body_falls_back() {
    let h = harness(
        ScriptedTransport::direct().reply(Ok(TransportResponse::from_http(200, b"<html/>".to_vec()))),
        ScriptedTransport::relay().reply(Ok(TransportResponse::from_payload(json!({"ok": true})))),
        ScriptedTransport::public(),
    );

    let outcome = h.dispatcher.dispatch_logged(HttpMethod::Get, "/jobs", None).await;

    assert_eq!(outcome.result.unwrap(), json!({"ok": true}));
    assert!(outcome.attempts[0].error.as_deref().unwrap().starts_with("Parse failure"));
}

#[tokio::test]
async fn test_reachability_only_fallbacks_are_dropped() {
    let mut probe = ScriptedTransport::new("cross_origin_probe", TransportKind::CrossOriginProbe)
        .reply(Ok(TransportResponse::reachable()));
    probe.delivers_data = false;
    let probe = Arc::new(probe);

    let dispatcher = RequestDispatcher::new(
        Url::parse("http://localhost:8000/api").unwrap(),
        Arc::new(ScriptedTransport::direct().reply(Err(refused()))),
        vec![probe.clone() as Arc<dyn Transport>],
    );

    assert_eq!(dispatcher.read_chain(), vec!["direct"]);
    assert!(dispatcher.dispatch(HttpMethod::Get, "/jobs", None).await.is_err());
    assert_eq!(probe.calls(), 0);
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_write_failure_is_returned_unchanged() {
    let h = harness(
        ScriptedTransport::direct().reply(Err(refused())),
        ScriptedTransport::relay(),
        ScriptedTransport::public(),
    );
    let credentials = json!({"email": "dev@example.com", "password": "hunter2"});

    let outcome = h
        .dispatcher
        .dispatch_logged(HttpMethod::Post, "/auth/login", Some(credentials.clone()))
        .await;

    assert!(matches!(outcome.result, Err(ApiError::Network(ref m)) if m == "connection refused"));
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(h.relay.calls(), 0);
    assert_eq!(h.public.calls(), 0);
    assert_eq!(h.sink.outcomes(), vec![false]);

    let seen = h.direct.seen.lock().unwrap();
    assert_eq!(seen[0].body.as_ref(), Some(&credentials));
    assert_eq!(seen[0].url.as_str(), "http://localhost:8000/api/auth/login");
}

#[tokio::test]
async fn test_write_rejected_by_server_records_disconnected() {
    let h = harness(
        ScriptedTransport::direct().reply(Err(ApiError::Http {
            status: 401,
            message: "Invalid credentials".into(),
        })),
        ScriptedTransport::relay(),
        ScriptedTransport::public(),
    );

    let err = h
        .dispatcher
        .dispatch(HttpMethod::Post, "/auth/login", Some(json!({})))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(h.relay.calls(), 0);
    assert_eq!(h.sink.outcomes(), vec![false]);
}

#[tokio::test]
async fn test_write_with_unreadable_reply_records_disconnected() {
    let h = harness(
        ScriptedTransport::direct().reply(Ok(TransportResponse::from_http(
            200,
            b"<html>Saved</html>".to_vec(),
        ))),
        ScriptedTransport::relay(),
        ScriptedTransport::public(),
    );

    let outcome = h
        .dispatcher
        .dispatch_logged(HttpMethod::Put, "/profile", Some(json!({"name": "Ada"})))
        .await;

    assert!(matches!(outcome.result, Err(ApiError::Parse(_))));
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(h.sink.outcomes(), vec![false]);
}

#[tokio::test]
async fn test_get_with_body_is_a_write() {
    let h = harness(
        ScriptedTransport::direct().reply(Err(refused())),
        ScriptedTransport::relay(),
        ScriptedTransport::public(),
    );

    let result = h
        .dispatcher
        .dispatch(HttpMethod::Get, "/search", Some(json!({"q": "rust"})))
        .await;

    assert!(matches!(result, Err(ApiError::Network(_))));
    assert_eq!(h.relay.calls(), 0);
}

#[tokio::test]
async fn test_delete_success_with_empty_body() {
    let h = harness(
        ScriptedTransport::direct().reply(Ok(TransportResponse::from_http(204, Vec::new()))),
        ScriptedTransport::relay(),
        ScriptedTransport::public(),
    );

    let value = h
        .dispatcher
        .dispatch(HttpMethod::Delete, "/applications/9", None)
        .await
        .unwrap();

    assert_eq!(value, Value::Null);
    assert_eq!(h.sink.outcomes(), vec![true]);
}

// ============================================================================
// Endpoint resolution
// ============================================================================

#[test]
fn test_resolve_joins_with_single_slash() {
    for base in ["http://localhost:8000/api", "http://localhost:8000/api/"] {
        let dispatcher = RequestDispatcher::new(
            Url::parse(base).unwrap(),
            Arc::new(ScriptedTransport::direct()),
            Vec::new(),
        );
        for endpoint in ["/jobs?page=2", "jobs?page=2"] {
            assert_eq!(
                dispatcher.resolve(endpoint).unwrap().as_str(),
                "http://localhost:8000/api/jobs?page=2"
            );
        }
    }
}

#[test]
fn test_resolve_keeps_absolute_endpoints() {
    let dispatcher = RequestDispatcher::new(
        Url::parse("http://localhost:8000/api").unwrap(),
        Arc::new(ScriptedTransport::direct()),
        Vec::new(),
    );
    assert_eq!(
        dispatcher.resolve("https://status.example.com/ping").unwrap().as_str(),
        "https://status.example.com/ping"
    );
}

#[tokio::test]
async fn test_invalid_endpoint_leaves_state_alone() {
    let h = harness(
        ScriptedTransport::direct(),
        ScriptedTransport::relay(),
        ScriptedTransport::public(),
    );

    let result = h.dispatcher.dispatch(HttpMethod::Get, "http://[::1", None).await;

    assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    assert_eq!(h.direct.calls(), 0);
    assert!(h.sink.outcomes().is_empty());
}
