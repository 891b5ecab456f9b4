//! Fakes shared by the store tests.

use async_trait::async_trait;
use hirelink_fetch::{ApiError, Transport, TransportKind, TransportRequest, TransportResponse};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Transport answering every attempt with the same configurable reply.
pub(crate) struct FakeTransport {
    id: &'static str,
    kind: TransportKind,
    reply: Mutex<Result<Value, ApiError>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<TransportRequest>>,
}

impl FakeTransport {
    /// A transport that fails with a network error until told otherwise.
    pub(crate) fn new(id: &'static str, kind: TransportKind) -> Arc<Self> {
        Arc::new(Self {
            id,
            kind,
            reply: Mutex::new(Err(ApiError::Network(format!("{id} unreachable")))),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn set_reply(&self, reply: Result<Value, ApiError>) {
        *self.reply.lock().unwrap() = reply;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> Vec<TransportRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn id(&self) -> &str {
        self.id
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn delivers_data(&self) -> bool {
        self.kind != TransportKind::CrossOriginProbe
    }

    async fn attempt(&self, request: &TransportRequest) -> Result<TransportResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());
        self.reply.lock().unwrap().clone().map(TransportResponse::from_payload)
    }
}
