//! Lifecycle audit trail.
//!
//! The scheduler emits one [`AuditEvent`] per state a request enters. Sinks
//! decide where they go: a bounded buffer, the log, or any `io::Write` as
//! JSON lines.

use std::collections::VecDeque;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;

/// One recorded lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique per event.
    pub event_id: String,
    /// Request that moved.
    pub request_id: String,
    /// Client owning the request.
    pub client: String,
    /// State entered: `pending`, `waiting`, `admitted`, `completed`,
    /// `abandoned` or `rejected`.
    pub action: String,
    /// Milliseconds since epoch.
    pub created_at_ms: u128,
    /// Queue position, rejection reason, or `promoted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Destination for audit events.
///
/// Called with the sink's own lock held, never the scheduler's.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Keeps the most recent events in memory. A zero capacity keeps nothing.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Buffer holding at most `max_events`; older events are evicted first.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(4096)),
            max_events,
        }
    }

    /// Copy of the buffered events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Actions recorded for one request, oldest first.
    #[must_use]
    pub fn actions_for(&self, request_id: &str) -> Vec<String> {
        self.events
            .iter()
            .filter(|e| e.request_id == request_id)
            .map(|e| e.action.clone())
            .collect()
    }

    /// Buffered event count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        while self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Emits events through `tracing` under the `waiting_room::audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            target: "waiting_room::audit",
            event_id = %event.event_id,
            request_id = %event.request_id,
            client = %event.client,
            action = %event.action,
            payload = event.payload.as_deref().unwrap_or(""),
            "audit"
        );
    }
}

/// Writes each event as one JSON document per line.
///
/// Write failures are logged and the event is dropped.
#[derive(Debug)]
pub struct JsonLinesAuditSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesAuditSink<W> {
    /// Sink appending to `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> AuditSink for JsonLinesAuditSink<W> {
    fn record(&mut self, event: AuditEvent) {
        let written = serde_json::to_writer(&mut self.writer, &event)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        if let Err(e) = written {
            tracing::warn!(event_id = %event.event_id, error = %e, "audit event dropped");
        }
    }
}

/// Assemble an event stamped with the current time.
pub fn build_audit_event(
    event_id: impl Into<String>,
    request_id: impl Into<String>,
    client: impl Into<String>,
    action: impl Into<String>,
    payload: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: event_id.into(),
        request_id: request_id.into(),
        client: client.into(),
        action: action.into(),
        created_at_ms: now_ms(),
        payload,
    }
}
