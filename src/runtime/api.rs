//! API-facing payloads shared by transport implementations.

use serde::{Deserialize, Serialize};

use crate::core::{AdmissionError, Scheduler, SchedulerSnapshot, ADMITTED_POSITION};

/// Position update pushed to a waiting caller.
///
/// Serialized as `{"queuePosition": n}`; `0` means "admitted, stop polling".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// 1-based queue position, or `0` when admitted.
    pub queue_position: usize,
}

impl ProgressUpdate {
    /// Update for a queue position.
    #[must_use]
    pub const fn new(queue_position: usize) -> Self {
        Self { queue_position }
    }

    /// True for the "admitted" sentinel.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        self.queue_position == ADMITTED_POSITION
    }

    /// Serialize as one newline-terminated JSON document, ready to append to a
    /// streaming response body.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

impl From<usize> for ProgressUpdate {
    fn from(queue_position: usize) -> Self {
        Self::new(queue_position)
    }
}

/// Body returned alongside a rejection status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionBody {
    /// Human-readable reason.
    pub error: String,
}

impl From<&AdmissionError> for RejectionBody {
    fn from(err: &AdmissionError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// HTTP status for an admission error: 429 for capacity rejections, 500
/// otherwise.
#[must_use]
pub const fn rejection_status(err: &AdmissionError) -> u16 {
    if err.is_capacity() {
        429
    } else {
        500
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Current scheduler view.
    pub snapshot: SchedulerSnapshot,
}

/// Health payload for a scheduler.
pub fn health<R: ?Sized>(scheduler: &Scheduler<R>) -> Health {
    Health {
        ok: true,
        snapshot: scheduler.snapshot(),
    }
}
