//! Seam between the scheduler and whatever carries requests to it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::AdmissionError;
use crate::util::ids::ClientId;

/// Failure to deliver something to a request's connection.
///
/// The scheduler logs and swallows these; the peer may already be gone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection is closed.
    #[error("transport closed")]
    Closed,
    /// Any other delivery failure.
    #[error("transport error: {0}")]
    Other(String),
}

/// Per-request connection handle supplied by the transport layer.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_waiting_room::core::{AdmissionError, Transport, TransportError};
/// use prometheus_waiting_room::runtime::ProgressUpdate;
///
/// struct SseResponse { /* writer half of a streaming HTTP response */ }
///
/// #[async_trait]
/// impl Transport for SseResponse {
///     async fn push_progress(&self, position: usize) -> Result<(), TransportError> {
///         let line = ProgressUpdate::new(position)
///             .to_json_line()
///             .map_err(|e| TransportError::Other(e.to_string()))?;
///         self.write_event(&line).await
///     }
///     fn is_abandoned(&self) -> bool {
///         self.peer_closed()
///     }
///     async fn proceed(&self) -> Result<(), TransportError> { Ok(()) }
///     async fn reject(&self, _reason: &AdmissionError) -> Result<(), TransportError> {
///         self.write_status(429).await
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Push a queue position to the waiting caller. `0` means "admitted".
    async fn push_progress(&self, position: usize) -> Result<(), TransportError>;

    /// Whether the caller has gone away.
    ///
    /// Called while the scheduler holds its state lock; must not block.
    fn is_abandoned(&self) -> bool;

    /// Tell the caller it may use the protected resource.
    async fn proceed(&self) -> Result<(), TransportError>;

    /// Tell the caller its submission was refused.
    async fn reject(&self, reason: &AdmissionError) -> Result<(), TransportError>;
}

/// Pluggable mapping from a transport-level request context to a client.
pub type ClientIdFn<R> = Arc<dyn Fn(&R) -> ClientId + Send + Sync>;
