//! Subject assignment model.
//!
//! A subject assignment is one row of the teaching plan: a subject taught
//! to a section by an instructor for a fixed number of hours per week.
//! Assignments are immutable input for a scheduling run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a subject is taught.
///
/// Serialized as a plain lowercase string. Kinds that are neither theory
/// nor lab are kept as [`SessionKind::Custom`] so that decomposition can
/// reject them explicitly instead of failing at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionKind {
    /// One-period lecture sessions.
    Theory,
    /// Two-period contiguous lab sessions.
    Lab,
    /// Unrecognized kind from external data.
    Custom(String),
}

impl SessionKind {
    /// Number of consecutive periods one session of this kind occupies.
    ///
    /// Custom kinds have no span.
    pub fn span(&self) -> usize {
        match self {
            Self::Theory => 1,
            Self::Lab => 2,
            Self::Custom(_) => 0,
        }
    }

    /// Whether this is a lab.
    #[inline]
    pub fn is_lab(&self) -> bool {
        matches!(self, Self::Lab)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Theory => "theory",
            Self::Lab => "lab",
            Self::Custom(s) => s,
        }
    }
}

impl FromStr for SessionKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "theory" | "lecture" => Self::Theory,
            "lab" | "practical" => Self::Lab,
            _ => Self::Custom(s.to_string()),
        })
    }
}

impl From<String> for SessionKind {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<SessionKind> for String {
    fn from(kind: SessionKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One subject taught to one section by one instructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectAssignment {
    /// Subject identifier (course code).
    pub subject: String,
    /// Instructor identifier.
    pub instructor: String,
    /// Section identifier.
    pub section: String,
    /// Required hours per week. Must be positive.
    pub weekly_hours: i32,
    /// Theory or lab.
    pub kind: SessionKind,
}

impl SubjectAssignment {
    /// Creates a theory assignment.
    pub fn theory(
        subject: impl Into<String>,
        instructor: impl Into<String>,
        section: impl Into<String>,
        weekly_hours: i32,
    ) -> Self {
        Self {
            subject: subject.into(),
            instructor: instructor.into(),
            section: section.into(),
            weekly_hours,
            kind: SessionKind::Theory,
        }
    }

    /// Creates a lab assignment.
    pub fn lab(
        subject: impl Into<String>,
        instructor: impl Into<String>,
        section: impl Into<String>,
        weekly_hours: i32,
    ) -> Self {
        Self {
            kind: SessionKind::Lab,
            ..Self::theory(subject, instructor, section, weekly_hours)
        }
    }

    /// Overrides the session kind.
    pub fn with_kind(mut self, kind: SessionKind) -> Self {
        self.kind = kind;
        self
    }

    /// `section/subject` label used in logs and reports.
    pub fn label(&self) -> String {
        format!("{}/{}", self.section, self.subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Theory".parse::<SessionKind>().unwrap(), SessionKind::Theory);
        assert_eq!(" LAB ".parse::<SessionKind>().unwrap(), SessionKind::Lab);
        assert_eq!("practical".parse::<SessionKind>().unwrap(), SessionKind::Lab);
        assert_eq!(
            "seminar".parse::<SessionKind>().unwrap(),
            SessionKind::Custom("seminar".into())
        );
    }

    #[test]
    fn test_kind_span() {
        assert_eq!(SessionKind::Theory.span(), 1);
        assert_eq!(SessionKind::Lab.span(), 2);
        assert_eq!(SessionKind::Custom("x".into()).span(), 0);
    }

    #[test]
    fn test_assignment_from_json() {
        let json = r#"{
            "subject": "CS301L",
            "instructor": "Dr. Rao",
            "section": "A",
            "weekly_hours": 2,
            "kind": "lab"
        }"#;
        let a: SubjectAssignment = serde_json::from_str(json).unwrap();
        assert_eq!(a, SubjectAssignment::lab("CS301L", "Dr. Rao", "A", 2));
        assert_eq!(a.label(), "A/CS301L");

        let out = serde_json::to_value(&a).unwrap();
        assert_eq!(out["kind"], "lab");
    }

    #[test]
    fn test_unknown_kind_survives_deserialization() {
        let json = r#"{"subject":"S","instructor":"I","section":"A",
            "weekly_hours":1,"kind":"workshop"}"#;
        let a: SubjectAssignment = serde_json::from_str(json).unwrap();
        assert_eq!(a.kind, SessionKind::Custom("workshop".into()));
    }
}
