//! Text output formatting with colors.

use chrono::{DateTime, Local, Utc};
use hirelink_core::{ConnectionSnapshot, ConnectionStatus};
use hirelink_fetch::{ApiError, DispatchOutcome, TransportAttempt};
use hirelink_store::{ResolvedConfig, Settings};
use serde_json::Value;
use std::time::Duration;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Formats response data.
    ///
    /// Strings print bare; everything else prints as indented JSON.
    pub fn format_data(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Null => self.dim("(no content)"),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    /// Formats a request failure, including the cause of an exhausted chain.
    pub fn format_error(&self, error: &ApiError) -> String {
        let mut lines = vec![format!("{} {}", self.red("✗"), self.bold(&error.to_string()))];

        if let ApiError::AllTransportsExhausted { primary, .. } = error {
            lines.push(format!("  Direct request: {}", primary));
        }
        if error.is_network() || error.is_timeout() {
            lines.push(self.dim("  Is the backend running? Check with `hirelink check`."));
        }

        lines.join("\n")
    }

    /// Formats the attempt log of a dispatch.
    pub fn format_attempts(&self, outcome: &DispatchOutcome) -> String {
        let mut lines = vec![format!(
            "{} ({} attempt{}, {})",
            self.bold("Transport trace"),
            outcome.attempts_count(),
            if outcome.attempts_count() == 1 { "" } else { "s" },
            format_duration(outcome.duration)
        )];

        for attempt in &outcome.attempts {
            lines.push(self.format_attempt(attempt));
        }

        lines.join("\n")
    }

    fn format_attempt(&self, attempt: &TransportAttempt) -> String {
        let mark = if attempt.success {
            self.green("✓")
        } else {
            self.red("✗")
        };
        let mut line = format!(
            "  {} {:<20} {:>8}",
            mark,
            attempt.kind.display_name(),
            format_duration(attempt.duration)
        );
        if let Some(error) = &attempt.error {
            line.push_str(&format!("  {}", self.dim(error)));
        }
        line
    }

    // ========================================================================
    // Connectivity
    // ========================================================================

    /// Formats the result of a connectivity check.
    pub fn format_check(
        &self,
        config: &ResolvedConfig,
        liveness_url: &str,
        snapshot: &ConnectionSnapshot,
    ) -> String {
        let mut lines = vec![
            format!(
                "Backend:  {} {}",
                self.cyan(config.base_url.as_str()),
                self.dim(&format!("(from {})", config.source))
            ),
            format!("Liveness: {liveness_url}"),
            format!("Status:   {}", self.format_status(snapshot.status)),
        ];
        if let Some(at) = snapshot.last_checked_at {
            lines.push(format!("Checked:  {}", self.dim(&format_time(at))));
        }
        lines.join("\n")
    }

    /// Formats a connection status with a marker.
    pub fn format_status(&self, status: ConnectionStatus) -> String {
        match status {
            ConnectionStatus::Connected => self.green(&format!("✓ {}", status.display_name())),
            ConnectionStatus::Disconnected => self.red(&format!("✗ {}", status.display_name())),
            ConnectionStatus::Unknown => self.yellow(&format!("? {}", status.display_name())),
        }
    }

    /// Formats one connectivity notification.
    pub fn format_status_event(&self, connected: bool, at: DateTime<Utc>) -> String {
        format!(
            "{}  {}",
            self.dim(&format_time(at)),
            self.format_status(ConnectionStatus::from(Some(connected)))
        )
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Formats the settings together with the effective base URL.
    pub fn format_settings(&self, settings: &Settings, effective: Option<&ResolvedConfig>) -> String {
        let mut lines = vec![self.bold("Hirelink Configuration"), "─".repeat(40), String::new()];

        match effective {
            Some(config) => lines.push(format!(
                "Effective API URL:   {} {}",
                self.cyan(config.base_url.as_str()),
                self.dim(&format!("(from {})", config.source))
            )),
            None => lines.push(format!("Effective API URL:   {}", self.red("invalid"))),
        }
        lines.push(format!(
            "Saved API URL:       {}",
            settings.api_base_url.as_deref().unwrap_or("(none)")
        ));
        lines.push(format!("Liveness path:       {}", settings.liveness_path));
        lines.push(String::new());
        lines.push(format!("Debounce window:     {}s", settings.debounce_window_secs));
        lines.push(format!("Monitor interval:    {}s", settings.monitor_interval_secs));
        lines.push(format!("Request timeout:     {}s", settings.request_timeout_secs));
        lines.push(format!("Relay timeout:       {}s", settings.relay_timeout_secs));
        lines.push(format!("Probe timeout:       {}s", settings.probe_timeout_secs));
        lines.push(String::new());

        let relay = if settings.public_relay_enabled {
            self.yellow("enabled")
        } else {
            "disabled".to_string()
        };
        lines.push(format!("Public relay:        {relay}"));
        lines.push(format!("Public relay URL:    {}", settings.public_relay_url));
        lines.push(format!("Log level:           {}", settings.log_level));

        lines.join("\n")
    }

    // ========================================================================
    // Color helpers
    // ========================================================================

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

/// Formats a duration compactly (`850ms`, `2.3s`).
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}
