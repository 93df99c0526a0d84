//! Session model.
//!
//! A session is the atomic placement unit derived from a
//! [`SubjectAssignment`](super::SubjectAssignment): a one-period theory
//! session or a two-period lab session. Sessions are produced by
//! [`decompose`](crate::ga::decompose) and never change during a run.

use serde::{Deserialize, Serialize};

use super::SessionKind;

/// One atomic unit of instruction to be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Dense id, equal to the session's position in the decomposed list.
    pub id: usize,
    /// Index of the originating assignment in the input list.
    pub assignment: usize,
    /// Subject identifier.
    pub subject: String,
    /// Instructor identifier.
    pub instructor: String,
    /// Section identifier.
    pub section: String,
    /// `Theory` (one period) or `Lab` (two contiguous periods).
    pub kind: SessionKind,
    /// 1-based position among the sessions of the same assignment.
    pub ordinal: usize,
}

impl Session {
    /// Periods occupied by this session.
    #[inline]
    pub fn span(&self) -> usize {
        self.kind.span()
    }

    #[inline]
    pub fn is_lab(&self) -> bool {
        self.kind.is_lab()
    }

    /// `section/subject#ordinal` label.
    pub fn label(&self) -> String {
        format!("{}/{}#{}", self.section, self.subject, self.ordinal)
    }
}
