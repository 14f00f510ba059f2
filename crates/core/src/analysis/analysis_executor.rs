use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::shared::constants::DEFAULT_MAX_IN_FLIGHT;
use crate::shared::frame::Frame;

/// How many frame analyses may run at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Fixed worker pool; frames arriving while `max_in_flight` analyses are
    /// queued or running are dropped.
    DropIfBusy { max_in_flight: usize },
    /// One thread per accepted frame, no cap.
    Unbounded,
}

impl Default for ConcurrencyPolicy {
    fn default() -> Self {
        ConcurrencyPolicy::DropIfBusy {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl ConcurrencyPolicy {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        match self {
            ConcurrencyPolicy::DropIfBusy { max_in_flight: 0 } => Err(
                AnalysisError::InvalidConfig("max in-flight analyses must be at least 1".into()),
            ),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Queued,
    /// The in-flight cap was reached; the frame was discarded.
    DroppedBusy,
    /// The executor was cancelled or shut down.
    Cancelled,
}

/// Runs frame analyses off the capture thread.
///
/// Outcomes are delivered asynchronously; `submit` never blocks on analysis.
pub trait AnalysisExecutor: Send {
    fn submit(&self, frame: Frame) -> SubmitOutcome;

    /// Analyses queued or running.
    fn in_flight(&self) -> usize;

    /// Rejects further submissions and skips queued work. Running detector
    /// calls finish normally.
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;

    /// Stops accepting work and waits for in-flight analyses to finish.
    fn shutdown(&mut self);
}
