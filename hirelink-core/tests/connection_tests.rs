//! Integration tests for core connection and request types.

use hirelink_core::{ConnectionSnapshot, ConnectionStatus, ConnectivitySink, HttpMethod};
use std::sync::Mutex;

struct LastOutcome(Mutex<Option<bool>>);

impl ConnectivitySink for LastOutcome {
    fn record_outcome(&self, connected: bool) {
        *self.0.lock().unwrap() = Some(connected);
    }
}

#[test]
fn test_sink_as_trait_object() {
    let sink = LastOutcome(Mutex::new(None));
    let dyn_sink: &dyn ConnectivitySink = &sink;

    dyn_sink.record_outcome(false);

    let status = ConnectionStatus::from(*sink.0.lock().unwrap());
    assert_eq!(status, ConnectionStatus::Disconnected);
}

#[test]
fn test_snapshot_serialization() {
    let snapshot = ConnectionSnapshot::new(ConnectionStatus::Connected, None);
    let json = serde_json::to_value(snapshot).unwrap();
    assert_eq!(json["status"], "connected");

    let parsed: ConnectionSnapshot = serde_json::from_value(json).unwrap();
    assert!(!parsed.has_been_checked());
}

#[test]
fn test_method_parse_matches_wire_form() {
    for method in [HttpMethod::Get, HttpMethod::Post, HttpMethod::Delete] {
        let wire = serde_json::to_value(method).unwrap();
        let parsed: HttpMethod = wire.as_str().unwrap().parse().unwrap();
        assert_eq!(parsed, method);
    }
}
