//! Trait definitions for Hirelink.

/// Receives the outcome of live API requests.
///
/// The request dispatcher reports every completed dispatch here so the
/// connectivity signal stays accurate even when nobody polls for it.
/// The health monitor is the production implementation.
pub trait ConnectivitySink: Send + Sync {
    /// Records whether the backend was reachable for the last request.
    fn record_outcome(&self, connected: bool);
}
