//! Core admission state machine and its collaborators.

pub mod audit;
pub mod error;
pub mod ledger;
pub mod notifier;
pub mod registry;
pub mod scheduler;
pub mod transport;

pub use audit::{
    build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink, JsonLinesAuditSink,
    TracingAuditSink,
};
pub use error::{AdmissionError, AppResult};
pub use ledger::{AdmissionLedger, AdmitDecision};
pub use notifier::{ProgressNotifier, ADMITTED_POSITION};
pub use registry::ClientRegistry;
pub use scheduler::{
    AdmissionPermit, RequestState, Scheduler, SchedulerSnapshot, SubmissionOutcome,
};
pub use transport::{ClientIdFn, Transport, TransportError};
