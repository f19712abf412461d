//! Tests for the transport-boundary payloads

use prometheus_waiting_room::core::AdmissionError;
use prometheus_waiting_room::infra::channel;
use prometheus_waiting_room::runtime::{
    health, rejection_status, ProgressUpdate, RejectionBody,
};
use prometheus_waiting_room::{AdmissionConfig, ClientId, Scheduler};

#[test]
fn test_progress_update_wire_format() {
    let update = ProgressUpdate::from(3);
    assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"queuePosition":3}"#);
    assert_eq!(update.to_json_line().unwrap(), "{\"queuePosition\":3}\n");
    assert!(!update.is_admitted());
    assert!(ProgressUpdate::new(0).is_admitted());
}

#[test]
fn test_progress_update_parses() {
    let update: ProgressUpdate = serde_json::from_str(r#"{"queuePosition":0}"#).unwrap();
    assert!(update.is_admitted());
}

#[test]
fn test_rejection_status() {
    let waiting = AdmissionError::WaitingLimitExceeded { limit: 1 };
    let client = AdmissionError::ClientLimitExceeded {
        client: ClientId::from("a"),
        limit: 1,
    };
    let config = AdmissionError::InvalidConfig("bad".into());
    assert_eq!(rejection_status(&waiting), 429);
    assert_eq!(rejection_status(&client), 429);
    assert_eq!(rejection_status(&config), 500);
    assert_eq!(
        RejectionBody::from(&waiting).error,
        "waiting queue full (limit 1)"
    );
}

#[tokio::test]
async fn test_health_reports_snapshot() {
    let scheduler = Scheduler::new(AdmissionConfig::default()).unwrap();
    let (transport, _stream) = channel();
    let _held = scheduler
        .submit(ClientId::from("10.0.0.9"), transport)
        .await
        .unwrap();

    let report = health(&scheduler);
    assert!(report.ok);
    assert_eq!(report.snapshot.processing, 1);
    assert_eq!(report.snapshot.clients.get(&ClientId::from("10.0.0.9")), Some(&1));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["snapshot"]["processing"], 1);
}
