//! Callback registry for the script relay transport.
//!
//! A script relay response invokes a caller-named function with its payload.
//! The registry hands out unique callback names, maps each name to the
//! receiver waiting for the payload, and guarantees that every allocated
//! name is released exactly once, whether the call succeeds, fails to load,
//! or runs out of time.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use tracing::debug;

/// Prefix of every allocated callback name.
pub const CALLBACK_PREFIX: &str = "hirelink_relay";

// ============================================================================
// Registry
// ============================================================================

/// Allocates and tracks pending relay callbacks.
#[derive(Debug, Default)]
pub struct RelayCallbackRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<String, oneshot::Sender<Value>>>,
}

impl RelayCallbackRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a uniquely named callback.
    ///
    /// The returned guard releases the name when dropped.
    pub fn allocate(self: &Arc<Self>) -> PendingRelayCall {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let name = format!("{CALLBACK_PREFIX}_{millis}_{id}");

        let (tx, rx) = oneshot::channel();
        self.lock().insert(name.clone(), tx);
        debug!(callback = %name, "Allocated relay callback");

        PendingRelayCall {
            name,
            receiver: rx,
            registry: Arc::clone(self),
        }
    }

    /// Delivers a payload to the named callback.
    ///
    /// Returns false if no such callback is pending (already released or
    /// never allocated).
    pub fn deliver(&self, name: &str, payload: Value) -> bool {
        let Some(sender) = self.lock().remove(name) else {
            debug!(callback = %name, "Payload for unknown relay callback dropped");
            return false;
        };
        sender.send(payload).is_ok()
    }

    /// Returns true if the named callback is still pending.
    pub fn is_pending(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Number of callbacks currently allocated.
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, name: &str) {
        if self.lock().remove(name).is_some() {
            debug!(callback = %name, "Released relay callback");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<Value>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Pending Call
// ============================================================================

/// One in-flight relay call.
///
/// Dropping the guard is the single cleanup path: the callback name is
/// removed from the registry on success, load error and timeout alike.
#[derive(Debug)]
pub struct PendingRelayCall {
    name: String,
    receiver: oneshot::Receiver<Value>,
    registry: Arc<RelayCallbackRegistry>,
}

impl PendingRelayCall {
    /// The callback name the remote script must invoke.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the payload.
    ///
    /// Returns `None` if the callback was released without a payload.
    pub async fn payload(&mut self) -> Option<Value> {
        (&mut self.receiver).await.ok()
    }
}

impl Drop for PendingRelayCall {
    fn drop(&mut self) {
        self.registry.release(&self.name);
    }
}

// ============================================================================
// Tests
// ============================================================================
