//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_waiting_room::config::AdmissionConfig;

#[test]
fn test_admission_config_validation() {
    let valid = AdmissionConfig {
        max_client_requests: 2,
        max_processing: 4,
        max_waiting: 16,
        poll_interval_ms: 250,
    };
    assert!(valid.validate().is_ok());
}

#[test]
fn test_admission_config_invalid_processing() {
    let invalid = AdmissionConfig::default().with_max_processing(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_admission_config_invalid_poll_interval() {
    let invalid = AdmissionConfig::default().with_poll_interval_ms(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_admission_config_from_json() {
    let json = r#"{
        "max_client_requests": 1,
        "max_processing": 2,
        "max_waiting": 5,
        "poll_interval_ms": 50
    }"#;

    let config = AdmissionConfig::from_json_str(json).unwrap();
    assert_eq!(config.max_client_requests, 1);
    assert_eq!(config.max_processing, 2);
    assert_eq!(config.max_waiting, 5);
    assert_eq!(config.poll_interval_ms, 50);
}

#[test]
fn test_admission_config_from_partial_json() {
    let config = AdmissionConfig::from_json_str(r#"{"max_processing": 3}"#).unwrap();
    assert_eq!(config.max_processing, 3);
    assert_eq!(config.max_waiting, AdmissionConfig::default().max_waiting);
}

#[test]
fn test_admission_config_from_json_rejects_invalid_values() {
    assert!(AdmissionConfig::from_json_str(r#"{"max_waiting": 0}"#).is_err());
    assert!(AdmissionConfig::from_json_str("not json").is_err());
}

#[test]
fn test_admission_config_from_lookup() {
    let vars = HashMap::from([
        ("WAITING_ROOM_MAX_PROCESSING", "2"),
        ("WAITING_ROOM_POLL_INTERVAL_MS", " 20 "),
    ]);
    let config =
        AdmissionConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap();
    assert_eq!(config.max_processing, 2);
    assert_eq!(config.poll_interval_ms, 20);
    assert_eq!(config.max_client_requests, 3);
}

#[test]
fn test_admission_config_from_lookup_bad_number() {
    let err = AdmissionConfig::from_lookup(|key| {
        (key == "WAITING_ROOM_MAX_WAITING").then(|| "lots".to_string())
    })
    .unwrap_err();
    assert!(err.contains("WAITING_ROOM_MAX_WAITING"));
}
