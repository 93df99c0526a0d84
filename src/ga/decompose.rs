//! Session decomposition.
//!
//! Turns subject assignments into atomic placement units:
//! - theory: one single-period session per weekly hour
//! - lab: ⌊h/2⌋ two-period sessions, plus one single-period session when
//!   the quota is odd (the remainder hour is taught theory-style)
//!
//! A section can never hold more hours than it has open cells, so hours
//! beyond that capacity are not materialized. They are reported as
//! [`Overflow`] and later surface as unplaced.
//!
//! Decomposition is deterministic.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::models::{Session, SessionKind, SubjectAssignment};

/// Hours of one assignment left out because its section was full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    /// Index of the assignment in the input list.
    pub assignment: usize,
    /// Hours that were not materialized.
    pub hours: usize,
}

/// Output of [`decompose`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decomposition {
    pub sessions: Vec<Session>,
    /// Per-assignment hours beyond section capacity, in input order.
    pub overflow: Vec<Overflow>,
}

impl Decomposition {
    /// Total hours not materialized.
    pub fn overflow_hours(&self) -> usize {
        self.overflow.iter().map(|o| o.hours).sum()
    }
}

/// Decomposes assignments into sessions, in input order.
///
/// At most `section_capacity` hours are materialized per section; earlier
/// assignments of a section are served first.
///
/// # Errors
/// [`EngineError::InvalidAssignment`] if a quota is non-positive, the kind
/// is unrecognized, or an identifier is empty. Fails on the first bad row.
pub fn decompose(
    assignments: &[SubjectAssignment],
    section_capacity: usize,
) -> Result<Decomposition, EngineError> {
    for a in assignments {
        check_assignment(a)?;
    }

    let mut out = Decomposition::default();
    let mut used: HashMap<&str, usize> = HashMap::new();

    for (index, a) in assignments.iter().enumerate() {
        let hours = a.weekly_hours as usize;
        let taken = used.entry(a.section.as_str()).or_insert(0);
        let granted = hours.min(section_capacity.saturating_sub(*taken));
        *taken += granted;
        if granted < hours {
            out.overflow.push(Overflow {
                assignment: index,
                hours: hours - granted,
            });
        }

        let (labs, singles) = match a.kind {
            SessionKind::Lab => (granted / 2, granted % 2),
            _ => (0, granted),
        };

        let mut ordinal = 0;
        let mut push = |kind: SessionKind, sessions: &mut Vec<Session>| {
            ordinal += 1;
            sessions.push(Session {
                id: sessions.len(),
                assignment: index,
                subject: a.subject.clone(),
                instructor: a.instructor.clone(),
                section: a.section.clone(),
                kind,
                ordinal,
            });
        };
        for _ in 0..labs {
            push(SessionKind::Lab, &mut out.sessions);
        }
        for _ in 0..singles {
            push(SessionKind::Theory, &mut out.sessions);
        }
    }

    Ok(out)
}

fn check_assignment(a: &SubjectAssignment) -> Result<(), EngineError> {
    let fail = |reason: String| EngineError::invalid_assignment(&a.subject, &a.section, reason);

    if a.subject.trim().is_empty() {
        return Err(fail("subject id is empty".into()));
    }
    if a.instructor.trim().is_empty() {
        return Err(fail("instructor id is empty".into()));
    }
    if a.section.trim().is_empty() {
        return Err(fail("section id is empty".into()));
    }
    if a.weekly_hours <= 0 {
        return Err(fail(format!(
            "weekly hours must be positive, got {}",
            a.weekly_hours
        )));
    }
    if let SessionKind::Custom(kind) = &a.kind {
        return Err(fail(format!("unrecognized session kind '{kind}'")));
    }
    Ok(())
}

/// Total hours represented by sessions (lab = 2, single = 1).
pub fn total_hours(sessions: &[Session]) -> usize {
    sessions.iter().map(Session::span).sum()
}
