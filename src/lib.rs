//! # Prometheus Waiting Room
//!
//! Admission control for a resource with bounded concurrency, fed by many
//! clients at once.
//!
//! Every incoming request is admitted immediately, parked in a FIFO waiting
//! room, or rejected because a global or per-client limit is saturated. While
//! parked, the caller is streamed its live queue position, and a caller that
//! disconnects is noticed and its place reclaimed.
//!
//! ## Core Problem Solved
//!
//! Inference backends (a single GPU, a licensed model server) can serve only a
//! handful of requests at a time, while callers arrive in bursts:
//!
//! - **Bounded Concurrency**: at most `max_processing` requests hold the resource
//! - **Bounded Queueing**: at most `max_waiting` requests wait; the rest get 429
//! - **Per-Client Fairness**: one client cannot hold more than `max_client_requests`
//! - **Live Feedback**: waiters see `{"queuePosition": n}` updates, then `0` on admission
//! - **Disconnected Clients**: abandoned waiters are dropped within one poll interval
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use prometheus_waiting_room::builders::SchedulerBuilder;
//! use prometheus_waiting_room::config::AdmissionConfig;
//! use prometheus_waiting_room::core::{InMemoryAuditSink, SubmissionOutcome};
//! use prometheus_waiting_room::infra::channel;
//!
//! let scheduler = SchedulerBuilder::new(AdmissionConfig::default().with_max_processing(2))
//!     .with_audit(Box::new(InMemoryAuditSink::new(1024)))
//!     .build()?;
//!
//! let (transport, mut progress) = channel();
//! tokio::spawn(async move {
//!     while let Some(event) = progress.next().await {
//!         // write the event to the caller's streaming response
//!     }
//! });
//!
//! match scheduler.submit_request(&peer_addr, transport).await {
//!     Ok(SubmissionOutcome::Admitted(permit)) => {
//!         generate().await;
//!         permit.complete(); // also released on drop
//!     }
//!     Ok(SubmissionOutcome::Abandoned(_)) => {}
//!     Err(rejected) => { /* 429 */ }
//! }
//! ```
//!
//! For complete examples, see:
//! - `tests/waiting_room_test.rs` - End-to-end lifecycle tests
//! - `tests/invariants_test.rs` - Randomized capacity invariants

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission state machine and its collaborators.
pub mod core;
/// Configuration models for admission limits and polling cadence.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters connecting the scheduler to request transports.
pub mod infra;
/// Transport-boundary API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::SchedulerBuilder;
pub use crate::config::AdmissionConfig;
pub use crate::core::{
    AdmissionError, AdmissionPermit, RequestState, Scheduler, SubmissionOutcome, Transport,
};
pub use crate::util::ids::{ClientId, RequestId};
