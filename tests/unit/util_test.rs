//! Tests for utility functions

use std::net::SocketAddr;

use prometheus_waiting_room::util::{now_ms, ClientId, RequestId};

#[test]
fn test_client_id_display() {
    let id = ClientId::new("tenant-a");
    assert_eq!(id.to_string(), "tenant-a");
    assert_eq!(id, ClientId::from("tenant-a".to_string()));
}

#[test]
fn test_client_id_from_ipv6_addr() {
    let addr: SocketAddr = "[::1]:8080".parse().unwrap();
    assert_eq!(ClientId::from(addr).as_str(), "::1");
}

#[test]
fn test_request_id_serializes_as_uuid_string() {
    let id = RequestId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    let back: RequestId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn test_now_ms() {
    assert!(now_ms() > 1_600_000_000_000);
}
