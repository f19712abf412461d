//! Tests for error types

use prometheus_waiting_room::core::{AdmissionError, TransportError};
use prometheus_waiting_room::ClientId;

#[test]
fn test_client_limit_error() {
    let err = AdmissionError::ClientLimitExceeded {
        client: ClientId::from("10.0.0.1"),
        limit: 3,
    };
    assert_eq!(
        format!("{err}"),
        "client `10.0.0.1` exceeded its limit of 3 concurrent requests"
    );
    assert!(err.is_capacity());
}

#[test]
fn test_waiting_limit_error() {
    let err = AdmissionError::WaitingLimitExceeded { limit: 10 };
    assert_eq!(format!("{err}"), "waiting queue full (limit 10)");
    assert!(err.is_capacity());
}

#[test]
fn test_invalid_config_error() {
    let err = AdmissionError::InvalidConfig("max_processing must be greater than 0".into());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: max_processing must be greater than 0"
    );
    assert!(!err.is_capacity());
}

#[test]
fn test_transport_error() {
    assert_eq!(format!("{}", TransportError::Closed), "transport closed");
    assert_eq!(
        format!("{}", TransportError::Other("broken pipe".into())),
        "transport error: broken pipe"
    );
}
