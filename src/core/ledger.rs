//! Processing slots and the FIFO waiting queue.

use std::collections::{HashSet, VecDeque};

use crate::core::AdmissionError;
use crate::util::ids::RequestId;

/// Result of offering a request to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitDecision {
    /// The request took a processing slot.
    Admitted,
    /// The request joined the waiting queue at this 1-based position.
    Enqueued(usize),
    /// The waiting queue was full; nothing changed.
    Rejected(AdmissionError),
}

/// The `processing` set and the `waiting` queue.
///
/// A request id lives in at most one of the two. Queue order is the only
/// source of truth for positions.
#[derive(Debug)]
pub struct AdmissionLedger {
    max_processing: usize,
    max_waiting: usize,
    processing: HashSet<RequestId>,
    waiting: VecDeque<RequestId>,
}

impl AdmissionLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new(max_processing: usize, max_waiting: usize) -> Self {
        Self {
            max_processing,
            max_waiting,
            processing: HashSet::with_capacity(max_processing),
            waiting: VecDeque::with_capacity(max_waiting.min(1024)),
        }
    }

    /// True when no more requests may wait.
    #[must_use]
    pub fn waiting_full(&self) -> bool {
        self.waiting.len() >= self.max_waiting
    }

    /// Fail with [`AdmissionError::WaitingLimitExceeded`] when the queue is full.
    ///
    /// # Errors
    ///
    /// Returns the rejection a submitter would see.
    pub fn check_waiting_capacity(&self) -> Result<(), AdmissionError> {
        if self.waiting.len() >= self.max_waiting {
            return Err(AdmissionError::WaitingLimitExceeded {
                limit: self.max_waiting,
            });
        }
        Ok(())
    }

    /// True when a processing slot is open.
    #[must_use]
    pub fn has_free_slot(&self) -> bool {
        self.processing.len() < self.max_processing
    }

    /// Admit `id` if a slot is open, otherwise queue it.
    ///
    /// A full queue rejects even when a slot is open.
    pub fn try_admit_or_enqueue(&mut self, id: RequestId) -> AdmitDecision {
        if let Err(e) = self.check_waiting_capacity() {
            return AdmitDecision::Rejected(e);
        }
        if self.has_free_slot() {
            self.processing.insert(id);
            return AdmitDecision::Admitted;
        }
        self.waiting.push_back(id);
        AdmitDecision::Enqueued(self.waiting.len())
    }

    /// Release `id`'s processing slot. Returns false if it held none.
    pub fn complete(&mut self, id: RequestId) -> bool {
        self.processing.remove(&id)
    }

    /// Pop the head of the queue without admitting it.
    pub fn promote_next(&mut self) -> Option<RequestId> {
        self.waiting.pop_front()
    }

    /// Give a popped request its processing slot.
    pub fn admit_promoted(&mut self, id: RequestId) {
        self.processing.insert(id);
    }

    /// Remove `id` from anywhere in the queue. Returns false if it was not waiting.
    pub fn remove_waiting(&mut self, id: RequestId) -> bool {
        match self.waiting.iter().position(|w| *w == id) {
            Some(idx) => {
                self.waiting.remove(idx);
                true
            }
            None => false,
        }
    }

    /// 1-based queue position of `id`, if waiting.
    #[must_use]
    pub fn position_of(&self, id: RequestId) -> Option<usize> {
        self.waiting.iter().position(|w| *w == id).map(|i| i + 1)
    }

    /// Whether `id` currently holds a processing slot.
    #[must_use]
    pub fn is_processing(&self, id: RequestId) -> bool {
        self.processing.contains(&id)
    }

    /// Waiting ids paired with their 1-based positions, head first.
    pub fn positions(&self) -> impl Iterator<Item = (RequestId, usize)> + '_ {
        self.waiting.iter().enumerate().map(|(i, id)| (*id, i + 1))
    }

    /// Waiting ids, head first.
    #[must_use]
    pub fn waiting_ids(&self) -> Vec<RequestId> {
        self.waiting.iter().copied().collect()
    }

    /// Processing slots in use.
    #[must_use]
    pub fn processing_len(&self) -> usize {
        self.processing.len()
    }

    /// Requests waiting.
    #[must_use]
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }
}
