//! Error types for admission decisions.

use thiserror::Error;

use crate::util::ids::ClientId;

/// Errors produced by the admission scheduler.
///
/// The two capacity variants are the only ones a submitting caller sees at
/// runtime; both conventionally map to "too many requests" at the transport
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The client already holds its maximum number of concurrent requests.
    #[error("client `{client}` exceeded its limit of {limit} concurrent requests")]
    ClientLimitExceeded {
        /// Offending client.
        client: ClientId,
        /// Configured per-client limit.
        limit: usize,
    },
    /// The waiting queue is full.
    #[error("waiting queue full (limit {limit})")]
    WaitingLimitExceeded {
        /// Configured waiting-queue depth.
        limit: usize,
    },
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AdmissionError {
    /// True for the capacity rejections surfaced to submitting callers.
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(
            self,
            Self::ClientLimitExceeded { .. } | Self::WaitingLimitExceeded { .. }
        )
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
