//! Transport-boundary API surface: wire payloads and status mapping.

pub mod api;

pub use api::{health, rejection_status, Health, ProgressUpdate, RejectionBody};
