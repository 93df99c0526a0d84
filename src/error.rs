//! Engine error type.
//!
//! Input problems (`InvalidAssignment`, `InvalidGrid`, `InvalidParams`) fail
//! fast before any search begins. `PlacementExhausted` is reported next to
//! the partial schedule in [`ScheduleOutcome`](crate::scheduler::ScheduleOutcome)
//! rather than replacing it.

use thiserror::Error;

/// Errors surfaced by the timetabling engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A subject assignment is malformed (non-positive quota, unknown kind, empty id).
    #[error("invalid assignment '{subject}' for section '{section}': {reason}")]
    InvalidAssignment {
        subject: String,
        section: String,
        reason: String,
    },

    /// The time grid cannot host any schedule.
    #[error("invalid time grid: {0}")]
    InvalidGrid(String),

    /// Evolution parameters are out of range.
    #[error("invalid evolution parameters: {0}")]
    InvalidParams(String),

    /// Sessions could not be placed even by forced fallback.
    #[error("{} session(s) could not be placed: {}", unplaced.len(), unplaced.join(", "))]
    PlacementExhausted { unplaced: Vec<String> },
}

impl EngineError {
    pub(crate) fn invalid_assignment(
        subject: impl Into<String>,
        section: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidAssignment {
            subject: subject.into(),
            section: section.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is caused by caller input rather than search outcome.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::PlacementExhausted { .. })
    }
}
