//! API client.
//!
//! The composition root of the connectivity layer: one dispatcher for
//! requests and one health monitor for the shared connectivity state, wired
//! so that every request outcome lands in the monitor.

use hirelink_core::{ConnectionSnapshot, ConnectivitySink, HttpMethod};
use hirelink_fetch::{ApiError, DispatchOutcome, RequestDispatcher, TransportContext};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::config::ResolvedConfig;
use crate::error::StoreError;
use crate::monitor::{HealthMonitor, MonitorLease};
use crate::settings_store::Settings;
use crate::subscribers::Subscription;

// ============================================================================
// Api Client
// ============================================================================

/// Entry point for talking to the backend.
#[derive(Debug)]
pub struct ApiClient {
    config: ResolvedConfig,
    dispatcher: RequestDispatcher,
    monitor: Arc<HealthMonitor>,
}

impl ApiClient {
    /// Creates a client with the standard transports.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the HTTP client cannot be built or a
    /// configured URL is invalid.
    pub fn new(config: ResolvedConfig, settings: &Settings) -> Result<Self, StoreError> {
        let ctx = TransportContext::with_settings(settings.to_transport_settings())?;
        Self::from_context(config, settings, &ctx)
    }

    /// Creates a client using the transports of `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if a configured URL is invalid.
    pub fn from_context(
        config: ResolvedConfig,
        settings: &Settings,
        ctx: &TransportContext,
    ) -> Result<Self, StoreError> {
        let dispatcher = RequestDispatcher::from_context(config.base_url.clone(), ctx)?;
        let liveness_url = dispatcher.resolve(&settings.liveness_path)?;
        let monitor = HealthMonitor::new(liveness_url, ctx.health_chain())
            .with_debounce_window(settings.debounce_window())
            .with_interval(settings.monitor_interval());

        Ok(Self::with_parts(config, dispatcher, monitor))
    }

    /// Assembles a client from prebuilt parts.
    ///
    /// The dispatcher's outcomes are routed into `monitor`.
    pub fn with_parts(
        config: ResolvedConfig,
        dispatcher: RequestDispatcher,
        monitor: HealthMonitor,
    ) -> Self {
        let monitor = Arc::new(monitor);
        let dispatcher = dispatcher.with_sink(Arc::clone(&monitor) as Arc<dyn ConnectivitySink>);
        Self {
            config,
            dispatcher,
            monitor,
        }
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// The base API URL.
    pub fn base_url(&self) -> &Url {
        self.dispatcher.base_url()
    }

    /// The request dispatcher.
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// The health monitor.
    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Sends a request and returns the parsed response.
    ///
    /// # Errors
    ///
    /// - Writes: the direct transport's error, unchanged
    /// - Reads: [`ApiError::AllTransportsExhausted`] once every transport failed
    pub async fn api_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        self.dispatcher.dispatch(method, endpoint, body).await
    }

    /// Sends a request and returns the attempt log along with the result.
    pub async fn api_request_logged(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Value>,
    ) -> DispatchOutcome {
        self.dispatcher.dispatch_logged(method, endpoint, body).await
    }

    /// Sends a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AllTransportsExhausted`] once every transport
    /// failed.
    pub async fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.api_request(HttpMethod::Get, endpoint, None).await
    }

    // ========================================================================
    // Connectivity
    // ========================================================================

    /// Checks whether the backend is reachable, reusing a recent result.
    pub async fn check_api_connection(&self) -> bool {
        self.monitor.check_connection().await
    }

    /// The last known connectivity flag, `None` before the first outcome.
    pub fn connection_status(&self) -> Option<bool> {
        self.monitor.connection_status()
    }

    /// Status and time of the last health check.
    pub fn connection_snapshot(&self) -> ConnectionSnapshot {
        self.monitor.snapshot()
    }

    /// Calls `callback` after every recorded connectivity outcome.
    ///
    /// Background monitoring runs while at least one returned handle is
    /// alive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] if monitoring has to start and no
    /// Tokio runtime is available.
    pub fn on_connection_status_change<F>(
        &self,
        callback: F,
    ) -> Result<ConnectionSubscription, StoreError>
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let subscription = self.monitor.subscribe(callback);
        let lease = match self.monitor.acquire() {
            Ok(lease) => lease,
            Err(e) => {
                subscription.unsubscribe();
                return Err(e);
            }
        };
        debug!(subscribers = self.monitor.subscribers().len(), "Connection listener added");

        Ok(ConnectionSubscription {
            subscription,
            lease,
        })
    }
}

// ============================================================================
// Connection Subscription
// ============================================================================

/// A status callback together with its share of background monitoring.
///
/// Dropping the handle unsubscribes and releases the share.
#[derive(Debug)]
pub struct ConnectionSubscription {
    subscription: Subscription,
    lease: MonitorLease,
}

impl ConnectionSubscription {
    /// Returns true until the first `unsubscribe`.
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Removes the callback and releases monitoring. Later calls do nothing.
    pub fn unsubscribe(&self) {
        self.subscription.unsubscribe();
        self.lease.release();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTransport;
    use hirelink_fetch::{Transport, TransportKind};
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Harness {
        client: ApiClient,
        direct: Arc<FakeTransport>,
        relay: Arc<FakeTransport>,
        public: Arc<FakeTransport>,
        health_direct: Arc<FakeTransport>,
    }

    fn harness() -> Harness {
        let direct = FakeTransport::new("direct", TransportKind::Direct);
        let relay = FakeTransport::new("script_relay", TransportKind::ScriptRelay);
        let public = FakeTransport::new("public_relay", TransportKind::PublicRelay);
        let health_direct = FakeTransport::new("direct", TransportKind::Direct);
        let health_probe = FakeTransport::new("cross_origin_probe", TransportKind::CrossOriginProbe);

        let config = ResolvedConfig::with_base_url("http://localhost:8000/api").unwrap();
        let dispatcher = RequestDispatcher::new(
            config.base_url.clone(),
            Arc::clone(&direct) as Arc<dyn Transport>,
            vec![
                Arc::clone(&relay) as Arc<dyn Transport>,
                Arc::clone(&public) as Arc<dyn Transport>,
            ],
        );
        let liveness = dispatcher.resolve("/ping").unwrap();
        let monitor = HealthMonitor::new(
            liveness,
            vec![
                Arc::clone(&health_direct) as Arc<dyn Transport>,
                health_probe as Arc<dyn Transport>,
            ],
        );

        Harness {
            client: ApiClient::with_parts(config, dispatcher, monitor),
            direct,
            relay,
            public,
            health_direct,
        }
    }

    fn listen(client: &ApiClient) -> (Arc<Mutex<Vec<bool>>>, ConnectionSubscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = client
            .on_connection_status_change(move |c| sink.lock().unwrap().push(c))
            .unwrap();
        (seen, sub)
    }

    #[tokio::test]
    async fn test_direct_read_returns_list_unchanged() {
        let h = harness();
        h.direct.set_reply(Ok(json!([{"id": 1}, {"id": 2}])));

        let jobs = h.client.get("/jobs").await.unwrap();

        assert_eq!(jobs, json!([{"id": 1}, {"id": 2}]));
        assert_eq!(h.client.connection_status(), Some(true));
        assert_eq!(h.relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_relay_rescues_read() {
        let h = harness();
        h.relay.set_reply(Ok(json!([{"id": 7}])));

        let jobs = h.client.get("/jobs").await.unwrap();

        assert_eq!(jobs, json!([{"id": 7}]));
        assert_eq!(h.client.connection_status(), Some(true));
        assert_eq!(h.public.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_read_notifies_false() {
        let h = harness();
        let (seen, _sub) = listen(&h.client);

        let err = h.client.get("/jobs").await.unwrap_err();

        let ApiError::AllTransportsExhausted { primary, attempts } = &err else {
            panic!("expected exhaustion, got {err:?}");
        };
        assert!(matches!(**primary, ApiError::Network(_)));
        assert_eq!(attempts.len(), 3);
        assert_eq!(h.client.connection_status(), Some(false));

        let seen = seen.lock().unwrap();
        assert!(seen.contains(&false));
        assert!(seen.iter().all(|c| !c));
    }

    #[tokio::test]
    async fn test_failed_write_propagates_unchanged() {
        let h = harness();
        let body = json!({"email": "a@example.com", "password": "pw"});

        let err = h
            .client
            .api_request(HttpMethod::Post, "/auth/login", Some(body.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(h.relay.calls(), 0);
        assert_eq!(h.public.calls(), 0);
        assert_eq!(h.client.connection_status(), Some(false));

        let seen = h.direct.seen();
        assert_eq!(seen[0].url.as_str(), "http://localhost:8000/api/auth/login");
        assert_eq!(seen[0].body, Some(body));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_api_connection_debounced() {
        let h = harness();
        h.health_direct.set_reply(Ok(json!({"status": "ok"})));

        assert!(h.client.check_api_connection().await);
        tokio::time::advance(Duration::from_millis(5000)).await;
        assert!(h.client.check_api_connection().await);

        assert_eq!(h.health_direct.calls(), 1);
        assert_eq!(
            h.health_direct.seen()[0].url.as_str(),
            "http://localhost:8000/api/ping"
        );
        assert!(h.client.connection_snapshot().has_been_checked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_controls_monitoring() {
        let h = harness();
        let monitor = Arc::clone(h.client.monitor());

        let (_, first) = listen(&h.client);
        let (_, second) = listen(&h.client);
        assert!(monitor.is_monitoring());
        assert_eq!(monitor.subscribers().len(), 2);

        first.unsubscribe();
        first.unsubscribe();
        assert!(!first.is_active());
        assert!(monitor.is_monitoring());

        drop(second);
        assert!(!monitor.is_monitoring());
        assert!(monitor.subscribers().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_sees_background_checks() {
        let h = harness();
        h.health_direct.set_reply(Ok(json!({"status": "ok"})));
        let (seen, _sub) = listen(&h.client);

        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(*seen.lock().unwrap(), vec![true]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_listener_sees_first_check_on_worker_threads() {
        let h = harness();
        h.health_direct.set_reply(Ok(json!({"status": "ok"})));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let _sub = h
            .client
            .on_connection_status_change(move |c| {
                let _ = tx.send(c);
            })
            .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(first, Some(true));
        assert_eq!(h.health_direct.calls(), 1);
    }

    #[test]
    fn test_listener_needs_runtime() {
        let h = harness();
        assert!(matches!(
            h.client.on_connection_status_change(|_| {}),
            Err(StoreError::NoRuntime)
        ));
        assert!(h.client.monitor().subscribers().is_empty());
    }

    #[test]
    fn test_from_context_uses_settings() {
        let settings = Settings {
            liveness_path: "/health".to_string(),
            debounce_window_secs: 10,
            ..Default::default()
        };
        let config = ResolvedConfig::with_base_url("https://api.example.com/v1/").unwrap();
        let ctx = TransportContext::with_settings(settings.to_transport_settings()).unwrap();

        let client = ApiClient::from_context(config, &settings, &ctx).unwrap();

        assert_eq!(
            client.monitor().liveness_url().as_str(),
            "https://api.example.com/v1/health"
        );
        assert_eq!(client.monitor().debounce_window(), Duration::from_secs(10));
        assert_eq!(
            client.monitor().chain(),
            vec!["direct", "script_relay", "cross_origin_probe"]
        );
        assert_eq!(
            client.dispatcher().read_chain(),
            vec!["direct", "script_relay", "public_relay"]
        );
    }
}
