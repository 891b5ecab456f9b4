//! Connection status subscribers.
//!
//! Callbacks receive the connectivity flag after every recorded outcome.
//! A callback that panics is logged and does not stop the others.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, error};

/// Callback invoked with the connectivity flag.
pub type StatusCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Identifier of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

// ============================================================================
// Registry
// ============================================================================

/// The live list of status callbacks.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriptionId, StatusCallback)>>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback.
    ///
    /// The callback stays registered until the returned handle is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(callback)));
        debug!(id = id.0, "Status subscriber added");

        Subscription {
            id,
            registry: Arc::downgrade(self),
            active: AtomicBool::new(true),
        }
    }

    /// Invokes every registered callback with `connected`.
    ///
    /// The list is snapshotted first, so callbacks may subscribe or
    /// unsubscribe freely. One removed during this round is skipped.
    pub fn notify(&self, connected: bool) {
        let snapshot: Vec<(SubscriptionId, StatusCallback)> = self.lock().clone();

        for (id, callback) in snapshot {
            if !self.contains(id) {
                continue;
            }
            if catch_unwind(AssertUnwindSafe(|| callback(connected))).is_err() {
                error!(id = id.0, connected, "Status subscriber panicked");
            }
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn contains(&self, id: SubscriptionId) -> bool {
        self.lock().iter().any(|(entry, _)| *entry == id)
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        before != entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, StatusCallback)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}

// ============================================================================
// Subscription Handle
// ============================================================================

/// Handle to one registered callback.
///
/// Dropping the handle unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<SubscriberRegistry>,
    active: AtomicBool,
}

impl Subscription {
    /// The registration's identifier.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns true until the first `unsubscribe`.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Removes the callback. Later calls do nothing.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let removed = self
            .registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id));
        if removed {
            debug!(id = self.id.0, "Status subscriber removed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<bool>>>, impl Fn(bool) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |connected| sink.lock().unwrap().push(connected))
    }

    #[test]
    fn test_every_subscriber_notified() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (a, cb_a) = recorder();
        let (b, cb_b) = recorder();
        let _sa = registry.subscribe(cb_a);
        let _sb = registry.subscribe(cb_b);

        registry.notify(false);

        assert_eq!(*a.lock().unwrap(), vec![false]);
        assert_eq!(*b.lock().unwrap(), vec![false]);
    }

    #[test]
    fn test_unsubscribed_callback_not_invoked() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (a, cb_a) = recorder();
        let (b, cb_b) = recorder();
        let sa = registry.subscribe(cb_a);
        let _sb = registry.subscribe(cb_b);

        registry.notify(true);
        sa.unsubscribe();
        registry.notify(false);

        assert_eq!(*a.lock().unwrap(), vec![true]);
        assert_eq!(*b.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let registry = Arc::new(SubscriberRegistry::new());
        let sub = registry.subscribe(|_| {});
        let _other = registry.subscribe(|_| {});

        sub.unsubscribe();
        sub.unsubscribe();

        assert!(!sub.is_active());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry = Arc::new(SubscriberRegistry::new());
        {
            let _sub = registry.subscribe(|_| {});
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_panicking_callback_isolated() {
        let registry = Arc::new(SubscriberRegistry::new());
        let _bad = registry.subscribe(|_| panic!("subscriber failure"));
        let (seen, cb) = recorder();
        let _good = registry.subscribe(cb);

        registry.notify(true);

        assert_eq!(*seen.lock().unwrap(), vec![true]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_callback_removed_mid_round_is_skipped() {
        let registry = Arc::new(SubscriberRegistry::new());
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&victim);
        let _first = registry.subscribe(move |_| {
            if let Some(sub) = slot.lock().unwrap().take() {
                sub.unsubscribe();
            }
        });
        let (seen, cb) = recorder();
        *victim.lock().unwrap() = Some(registry.subscribe(cb));

        registry.notify(true);

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_handle_outlives_registry() {
        let registry = Arc::new(SubscriberRegistry::new());
        let sub = registry.subscribe(|_| {});
        drop(registry);
        sub.unsubscribe();
        assert!(!sub.is_active());
    }
}
