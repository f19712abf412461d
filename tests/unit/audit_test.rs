//! Tests for audit sink

use prometheus_waiting_room::core::{
    build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink, JsonLinesAuditSink,
    TracingAuditSink,
};

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        "evt1",
        "req1",
        "10.0.0.1",
        "waiting",
        Some("2".to_string()),
    );

    sink.record(event);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_id, "evt1");
    assert_eq!(events[0].request_id, "req1");
    assert_eq!(events[0].action, "waiting");
    assert_eq!(events[0].payload.as_deref(), Some("2"));
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event("evt1", "req1", "c", "pending", None));
    sink.record(build_audit_event("evt2", "req1", "c", "admitted", None));
    sink.record(build_audit_event("evt3", "req1", "c", "completed", None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_id, "evt2"); // First one popped
    assert_eq!(events[1].event_id, "evt3");
}

#[test]
fn test_zero_capacity_sink_keeps_nothing() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event("evt1", "req1", "c", "pending", None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_tracing_sink_accepts_events() {
    let mut sink = TracingAuditSink;
    sink.record(build_audit_event("evt1", "req1", "c", "abandoned", None));
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event("evt1", "req1", "client-7", "rejected", None);

    assert_eq!(event.client, "client-7");
    assert_eq!(event.action, "rejected");
    assert!(event.payload.is_none());
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_actions_for_request() {
    let mut sink = InMemoryAuditSink::new(8);
    sink.record(build_audit_event("e1", "req1", "c", "pending", None));
    sink.record(build_audit_event("e2", "req2", "c", "pending", None));
    sink.record(build_audit_event("e3", "req1", "c", "admitted", None));

    assert_eq!(sink.len(), 3);
    assert_eq!(sink.actions_for("req1"), vec!["pending", "admitted"]);
}

#[test]
fn test_json_lines_sink() {
    let mut sink = JsonLinesAuditSink::new(Vec::new());
    sink.record(build_audit_event("e1", "req1", "c", "waiting", Some("3".into())));
    sink.record(build_audit_event("e2", "req1", "c", "abandoned", None));

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let events: Vec<AuditEvent> = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].payload.as_deref(), Some("3"));
    assert_eq!(events[1].action, "abandoned");
    assert!(!out.lines().nth(1).unwrap().contains("payload"));
}
