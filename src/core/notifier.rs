//! Queue position publishing.
//!
//! Each waiting request gets a `watch` channel holding its latest position.
//! The scheduler writes positions under its state lock; the request's own wait
//! loop reads them and forwards each new value to its transport, so pushes for
//! one request are never reordered and never block the lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;

use crate::core::ledger::AdmissionLedger;
use crate::core::transport::Transport;
use crate::util::ids::RequestId;

/// Position value that tells a waiter it has been admitted.
pub const ADMITTED_POSITION: usize = 0;

struct Subscriber {
    position: watch::Sender<usize>,
    transport: Arc<dyn Transport>,
}

/// Tracks the last published position of every waiting request.
#[derive(Default)]
pub struct ProgressNotifier {
    subscribers: HashMap<RequestId, Subscriber>,
}

impl ProgressNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `id` at `position`.
    pub fn subscribe(
        &mut self,
        id: RequestId,
        transport: Arc<dyn Transport>,
        position: usize,
    ) -> watch::Receiver<usize> {
        let (tx, rx) = watch::channel(position);
        self.subscribers.insert(
            id,
            Subscriber {
                position: tx,
                transport,
            },
        );
        rx
    }

    /// Publish positions for every waiting request whose position changed.
    /// Returns how many were updated.
    pub fn rebroadcast(&self, ledger: &AdmissionLedger) -> usize {
        ledger
            .positions()
            .filter(|(id, position)| self.publish(*id, *position))
            .count()
    }

    /// Publish the admitted sentinel to `id`.
    pub fn admit(&self, id: RequestId) -> bool {
        self.publish(id, ADMITTED_POSITION)
    }

    /// Liveness probe for a tracked request. Untracked requests have nobody
    /// listening and count as abandoned.
    #[must_use]
    pub fn is_abandoned(&self, id: RequestId) -> bool {
        self.subscribers
            .get(&id)
            .is_none_or(|s| s.transport.is_abandoned())
    }

    /// Stop tracking `id`. Its wait loop sees the channel close.
    pub fn forget(&mut self, id: RequestId) {
        self.subscribers.remove(&id);
    }

    /// Number of tracked requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// True when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    fn publish(&self, id: RequestId, position: usize) -> bool {
        let Some(sub) = self.subscribers.get(&id) else {
            return false;
        };
        sub.position.send_if_modified(|current| {
            if *current == position {
                false
            } else {
                *current = position;
                true
            }
        })
    }
}

/// Push `position` to `transport`, swallowing failures.
pub(crate) async fn deliver(transport: &dyn Transport, id: RequestId, position: usize) {
    if let Err(e) = transport.push_progress(position).await {
        tracing::debug!(request_id = %id, position, error = %e, "progress push dropped");
    }
}
