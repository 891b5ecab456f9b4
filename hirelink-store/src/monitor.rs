//! Connection health monitor.
//!
//! Owns the process-wide connectivity state. The state changes only when a
//! health check completes or when a live request reports its outcome through
//! [`ConnectivitySink`]; reading it never has side effects.
//!
//! Health checks run the chain Direct → Script Relay → Cross-Origin Probe
//! against the liveness endpoint. Repeated checks inside the debounce window
//! reuse the previous result. A background ticker re-checks periodically
//! while at least one [`MonitorLease`] is held.

use chrono::{DateTime, Utc};
use hirelink_core::{ConnectionSnapshot, ConnectionStatus, ConnectivitySink};
use hirelink_fetch::{Transport, TransportRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::StoreError;
use crate::subscribers::{SubscriberRegistry, Subscription};

/// Default debounce window.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(30);

/// Default interval between background checks.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Default)]
struct ConnectionState {
    connected: Option<bool>,
    last_checked_at: Option<Instant>,
    last_checked_wall: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct TimerState {
    leases: usize,
    handle: Option<JoinHandle<()>>,
}

// ============================================================================
// Health Monitor
// ============================================================================

/// Tracks whether the backend is reachable.
pub struct HealthMonitor {
    liveness_url: Url,
    chain: Vec<Arc<dyn Transport>>,
    debounce_window: Duration,
    interval: Duration,
    state: RwLock<ConnectionState>,
    subscribers: Arc<SubscriberRegistry>,
    status_tx: watch::Sender<Option<bool>>,
    timer: Mutex<TimerState>,
}

impl HealthMonitor {
    /// Creates a monitor probing `liveness_url` through `chain`, in order.
    pub fn new(liveness_url: Url, chain: Vec<Arc<dyn Transport>>) -> Self {
        let (status_tx, _) = watch::channel(None);
        Self {
            liveness_url,
            chain,
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            interval: DEFAULT_MONITOR_INTERVAL,
            state: RwLock::new(ConnectionState::default()),
            subscribers: Arc::new(SubscriberRegistry::new()),
            status_tx,
            timer: Mutex::new(TimerState {
                leases: 0,
                handle: None,
            }),
        }
    }

    /// Sets the debounce window.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    /// Sets the interval used when a lease starts monitoring.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The endpoint health checks probe.
    pub fn liveness_url(&self) -> &Url {
        &self.liveness_url
    }

    /// Identifiers of the health chain, in order.
    pub fn chain(&self) -> Vec<&str> {
        self.chain.iter().map(|t| t.id()).collect()
    }

    /// The debounce window.
    pub fn debounce_window(&self) -> Duration {
        self.debounce_window
    }

    // ========================================================================
    // Checks
    // ========================================================================

    /// Checks connectivity, reusing a recent result.
    ///
    /// Inside the debounce window, and once any result exists, the cached
    /// value is returned without network activity. Otherwise the check
    /// timestamp is written before probing, so overlapping callers see it.
    pub async fn check_connection(&self) -> bool {
        {
            let mut state = self.write_state();
            if let (Some(connected), Some(at)) = (state.connected, state.last_checked_at) {
                if at.elapsed() < self.debounce_window {
                    debug!(connected, age = ?at.elapsed(), "Health check debounced");
                    return connected;
                }
            }
            stamp(&mut state);
        }
        self.probe().await
    }

    /// Checks connectivity now, ignoring the debounce window.
    pub async fn check_now(&self) -> bool {
        stamp(&mut self.write_state());
        self.probe().await
    }

    #[instrument(skip(self), fields(url = %self.liveness_url))]
    async fn probe(&self) -> bool {
        let request = TransportRequest::get(self.liveness_url.clone());

        let mut connected = false;
        for transport in &self.chain {
            match transport.attempt(&request).await {
                Ok(_) => {
                    debug!(transport = %transport.id(), "Health check succeeded");
                    connected = true;
                    break;
                }
                Err(error) => {
                    debug!(transport = %transport.id(), error = %error, "Health check transport failed");
                }
            }
        }

        if !connected {
            warn!("Backend unreachable through every health check transport");
        }
        self.set_connected(connected);
        connected
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Records the connectivity flag and notifies every subscriber.
    pub fn set_connected(&self, connected: bool) {
        let previous = {
            let mut state = self.write_state();
            state.connected.replace(connected)
        };

        if previous == Some(connected) {
            debug!(connected, "Connection status confirmed");
        } else {
            info!(
                from = %ConnectionStatus::from_option(previous),
                to = %ConnectionStatus::from_option(Some(connected)),
                "Connection status changed"
            );
        }

        self.status_tx.send_replace(Some(connected));
        self.subscribers.notify(connected);
    }

    /// The last known connectivity flag, `None` before the first outcome.
    pub fn connection_status(&self) -> Option<bool> {
        self.read_state().connected
    }

    /// Status and time of the last health check.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        let state = self.read_state();
        ConnectionSnapshot::new(
            ConnectionStatus::from_option(state.connected),
            state.last_checked_wall,
        )
    }

    /// Receiver mirroring the connectivity flag.
    pub fn watch(&self) -> watch::Receiver<Option<bool>> {
        self.status_tx.subscribe()
    }

    /// Registers a status callback.
    ///
    /// This does not start monitoring; pair it with [`Self::acquire`].
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// The subscriber registry.
    pub fn subscribers(&self) -> &Arc<SubscriberRegistry> {
        &self.subscribers
    }

    // ========================================================================
    // Background Monitoring
    // ========================================================================

    /// Starts periodic checks: one right away, then one per `interval`.
    ///
    /// Any running ticker is stopped first, so at most one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] outside a Tokio runtime.
    pub fn start_monitoring(self: &Arc<Self>, interval: Duration) -> Result<(), StoreError> {
        let mut timer = self.lock_timer();
        self.spawn_ticker(&mut timer, interval)
    }

    /// Stops periodic checks. Does nothing if none are running.
    pub fn stop_monitoring(&self) {
        let handle = self.lock_timer().handle.take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Connection monitoring stopped");
        }
    }

    /// Returns true while a ticker is running.
    pub fn is_monitoring(&self) -> bool {
        self.lock_timer()
            .handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Takes a lease on background monitoring.
    ///
    /// The first lease starts the ticker; releasing the last one stops it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] if the first lease is taken outside
    /// a Tokio runtime.
    pub fn acquire(self: &Arc<Self>) -> Result<MonitorLease, StoreError> {
        let mut timer = self.lock_timer();
        if timer.leases == 0 {
            self.spawn_ticker(&mut timer, self.interval)?;
        }
        timer.leases += 1;
        debug!(leases = timer.leases, "Monitor lease acquired");

        Ok(MonitorLease {
            monitor: Arc::downgrade(self),
            active: AtomicBool::new(true),
        })
    }

    /// Number of outstanding leases.
    pub fn lease_count(&self) -> usize {
        self.lock_timer().leases
    }

    fn release_lease(&self) {
        let handle = {
            let mut timer = self.lock_timer();
            timer.leases = timer.leases.saturating_sub(1);
            debug!(leases = timer.leases, "Monitor lease released");
            if timer.leases == 0 {
                timer.handle.take()
            } else {
                None
            }
        };
        if let Some(handle) = handle {
            handle.abort();
            info!("Last monitor lease released, monitoring stopped");
        }
    }

    fn spawn_ticker(
        self: &Arc<Self>,
        timer: &mut TimerState,
        interval: Duration,
    ) -> Result<(), StoreError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        let interval = interval.max(Duration::from_millis(1));

        if let Some(previous) = timer.handle.take() {
            previous.abort();
            debug!("Replaced running monitor");
        }

        let monitor = Arc::downgrade(self);
        timer.handle = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut first = true;
            loop {
                ticker.tick().await;
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                if first {
                    monitor.check_connection().await;
                    first = false;
                } else {
                    monitor.check_now().await;
                }
            }
        }));

        info!(interval = ?interval, "Connection monitoring started");
        Ok(())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, ConnectionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, ConnectionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timer(&self) -> MutexGuard<'_, TimerState> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn stamp(state: &mut ConnectionState) {
    state.last_checked_at = Some(Instant::now());
    state.last_checked_wall = Some(Utc::now());
}

impl ConnectivitySink for HealthMonitor {
    fn record_outcome(&self, connected: bool) {
        self.set_connected(connected);
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.handle.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("liveness_url", &self.liveness_url.as_str())
            .field("chain", &self.chain())
            .field("debounce_window", &self.debounce_window)
            .field("connected", &self.connection_status())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Monitor Lease
// ============================================================================

/// Keeps background monitoring alive while held.
///
/// Dropping the lease releases it.
#[derive(Debug)]
pub struct MonitorLease {
    monitor: Weak<HealthMonitor>,
    active: AtomicBool,
}

impl MonitorLease {
    /// Releases the lease. Later calls do nothing.
    pub fn release(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(monitor) = self.monitor.upgrade() {
            monitor.release_lease();
        }
    }
}

impl Drop for MonitorLease {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Tests
// ============================================================================
