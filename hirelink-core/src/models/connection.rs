//! Connectivity status types.
//!
//! - [`ConnectionStatus`] - Whether the backend is currently reachable
//! - [`ConnectionSnapshot`] - Status plus when it was last checked

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Connection Status
// ============================================================================

/// Last-known reachability of the backend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No check or request has completed yet.
    #[default]
    Unknown,
    /// The backend answered the last check or request.
    Connected,
    /// Every transport failed on the last check or request.
    Disconnected,
}

impl ConnectionStatus {
    /// Converts the cached tri-state boolean into a status.
    pub fn from_option(connected: Option<bool>) -> Self {
        match connected {
            None => Self::Unknown,
            Some(true) => Self::Connected,
            Some(false) => Self::Disconnected,
        }
    }

    /// Returns the boolean form, `None` while unknown.
    pub fn as_option(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Connected => Some(true),
            Self::Disconnected => Some(false),
        }
    }

    /// Returns true if the backend is known to be reachable.
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    /// Returns the display name for this status.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
        }
    }
}

impl From<Option<bool>> for ConnectionStatus {
    fn from(connected: Option<bool>) -> Self {
        Self::from_option(connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Connection Snapshot
// ============================================================================

/// Point-in-time view of the connectivity state, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    /// Current status.
    pub status: ConnectionStatus,
    /// Wall-clock time of the last health check, if any ran.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl ConnectionSnapshot {
    /// Creates a snapshot.
    pub fn new(status: ConnectionStatus, last_checked_at: Option<DateTime<Utc>>) -> Self {
        Self {
            status,
            last_checked_at,
        }
    }

    /// Returns true if a health check has completed at least once.
    pub fn has_been_checked(&self) -> bool {
        self.last_checked_at.is_some()
    }
}
