//! In-process transport backed by a tokio channel.
//!
//! The [`ProgressStream`] half plays the role of a long-lived streaming
//! response: whoever serves the caller drains it, and dropping it marks the
//! request as abandoned.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::{AdmissionError, Transport, TransportError};
use crate::runtime::api::ProgressUpdate;
use crate::util::clock::now_ms;

/// Message delivered to the caller side of a [`ChannelTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Queue position update; `0` means admitted.
    Position {
        /// Wire payload, `{"queuePosition": n}`.
        update: ProgressUpdate,
        /// Send time in milliseconds since epoch.
        at_ms: u128,
    },
    /// The request may use the resource.
    Proceed,
    /// The request was refused.
    Rejected(AdmissionError),
}

impl ProgressEvent {
    /// Queue position carried by this event, if any.
    #[must_use]
    pub const fn queue_position(&self) -> Option<usize> {
        match self {
            Self::Position { update, .. } => Some(update.queue_position),
            _ => None,
        }
    }
}

/// Sending half handed to the scheduler.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

/// Receiving half held by whoever serves the caller.
#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
}

/// Create a connected transport/stream pair.
#[must_use]
pub fn channel() -> (ChannelTransport, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelTransport { tx }, ProgressStream { rx })
}

impl ChannelTransport {
    fn send(&self, event: ProgressEvent) -> Result<(), TransportError> {
        self.tx.send(event).map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn push_progress(&self, position: usize) -> Result<(), TransportError> {
        self.send(ProgressEvent::Position {
            update: ProgressUpdate::new(position),
            at_ms: now_ms(),
        })
    }

    fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }

    async fn proceed(&self) -> Result<(), TransportError> {
        self.send(ProgressEvent::Proceed)
    }

    async fn reject(&self, reason: &AdmissionError) -> Result<(), TransportError> {
        self.send(ProgressEvent::Rejected(reason.clone()))
    }
}

impl ProgressStream {
    /// Wait for the next event. `None` once the scheduler side is gone and
    /// everything has been drained.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }

    /// Take an already-delivered event without waiting.
    pub fn try_next(&mut self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain every delivered event.
    pub fn drain(&mut self) -> Vec<ProgressEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Queue positions among the delivered events, in order.
    pub fn positions(&mut self) -> Vec<usize> {
        self.drain()
            .iter()
            .filter_map(ProgressEvent::queue_position)
            .collect()
    }
}
