//! Timetable (solution) model.
//!
//! A timetable is the decoded form of the best individual: every placed
//! session cell as a (section, slot) entry. It may still carry
//! violations when the search could not reach a feasible schedule.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ExternalBooking, SessionKind, Slot};

/// A complete weekly timetable for one or more sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timetable {
    /// Working-day names, copied from the grid.
    pub days: Vec<String>,
    /// Periods per day, copied from the grid.
    pub periods_per_day: usize,
    /// One entry per occupied cell. Lab sessions produce two entries.
    pub entries: Vec<TimetableEntry>,
}

/// One occupied cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    /// Section identifier.
    pub section: String,
    /// Occupied slot.
    pub slot: Slot,
    /// Subject identifier.
    pub subject: String,
    /// Instructor identifier.
    pub instructor: String,
    /// Session kind.
    pub kind: SessionKind,
    /// Id of the session occupying the cell.
    pub session_id: usize,
}

/// A rule violation found in a timetable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity (section, instructor, or `section/subject`).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of timetable violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    /// Two sessions of one section share a slot.
    SlotCollision,
    /// An instructor teaches two sections at once.
    InstructorDoubleBooked,
    /// An instructor collides with an external booking.
    ExternalClash,
    /// Placed hours differ from the weekly quota.
    QuotaMismatch,
    /// A lab does not occupy two contiguous same-day periods.
    BrokenLab,
    /// A session sits in a blocked slot.
    BlockedSlotUsed,
    /// A subject appears more often in a day than allowed.
    SubjectRepeated,
    /// More labs in a section-day than allowed.
    LabsPerDayExceeded,
    /// A reserved free period is occupied.
    ReservedPeriodUsed,
    /// Busiest and lightest days differ by more than the threshold.
    LoadImbalance,
    /// An instructor teaches more than the weekly cap.
    InstructorOverloaded,
}

impl ViolationType {
    /// Hard violations make a timetable infeasible.
    pub fn is_hard(self) -> bool {
        matches!(
            self,
            Self::SlotCollision
                | Self::InstructorDoubleBooked
                | Self::ExternalClash
                | Self::QuotaMismatch
                | Self::BrokenLab
                | Self::BlockedSlotUsed
        )
    }

    /// Default severity for reports.
    pub fn severity(self) -> i32 {
        match self {
            Self::ExternalClash => 100,
            Self::SlotCollision | Self::InstructorDoubleBooked => 95,
            Self::QuotaMismatch | Self::BlockedSlotUsed => 90,
            Self::BrokenLab => 85,
            Self::ReservedPeriodUsed => 40,
            Self::SubjectRepeated | Self::LabsPerDayExceeded => 30,
            Self::InstructorOverloaded => 25,
            Self::LoadImbalance => 15,
        }
    }
}

impl Violation {
    /// Creates a violation with the type's default severity.
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
            severity: violation_type.severity(),
        }
    }

    #[inline]
    pub fn is_hard(&self) -> bool {
        self.violation_type.is_hard()
    }
}

impl Timetable {
    /// Creates an empty timetable shaped like a grid.
    pub fn new(days: Vec<String>, periods_per_day: usize) -> Self {
        Self {
            days,
            periods_per_day,
            entries: Vec::new(),
        }
    }

    /// Adds an entry.
    pub fn add_entry(&mut self, entry: TimetableEntry) {
        self.entries.push(entry);
    }

    /// Number of occupied cells.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Distinct section identifiers, sorted.
    pub fn sections(&self) -> Vec<&str> {
        let mut sections: Vec<&str> = self.entries.iter().map(|e| e.section.as_str()).collect();
        sections.sort_unstable();
        sections.dedup();
        sections
    }

    /// Entries of one section, in slot order.
    pub fn entries_for_section(&self, section: &str) -> Vec<&TimetableEntry> {
        let mut entries: Vec<_> = self.entries.iter().filter(|e| e.section == section).collect();
        entries.sort_by_key(|e| e.slot);
        entries
    }

    /// Entries of one instructor across sections, in slot order.
    pub fn entries_for_instructor(&self, instructor: &str) -> Vec<&TimetableEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.instructor == instructor)
            .collect();
        entries.sort_by_key(|e| (e.slot, e.section.clone()));
        entries
    }

    /// The entry of a section at a slot, if any.
    pub fn entry_at(&self, section: &str, slot: Slot) -> Option<&TimetableEntry> {
        self.entries
            .iter()
            .find(|e| e.section == section && e.slot == slot)
    }

    /// Placed hours per (section, subject).
    pub fn hours_by_subject(&self) -> BTreeMap<(String, String), usize> {
        let mut hours = BTreeMap::new();
        for e in &self.entries {
            *hours
                .entry((e.section.clone(), e.subject.clone()))
                .or_insert(0) += 1;
        }
        hours
    }

    /// Section grid as `days × periods` of subject ids (`None` = free).
    pub fn section_grid(&self, section: &str) -> Vec<Vec<Option<&str>>> {
        let mut grid = vec![vec![None; self.periods_per_day]; self.days.len()];
        for e in self.entries.iter().filter(|e| e.section == section) {
            if let Some(cell) = grid
                .get_mut(e.slot.day)
                .and_then(|row| row.get_mut(e.slot.period))
            {
                *cell = Some(e.subject.as_str());
            }
        }
        grid
    }

    /// Converts the timetable into bookings for future runs.
    ///
    /// Each instructor/slot pair appears once even if several sections
    /// share it.
    pub fn to_bookings(&self) -> Vec<ExternalBooking> {
        let mut seen = std::collections::HashSet::new();
        let mut bookings = Vec::new();
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|e| e.slot);
        for e in entries {
            if seen.insert((e.instructor.as_str(), e.slot)) {
                let booking = ExternalBooking::new(e.instructor.clone(), e.slot);
                bookings.push(booking.with_origin(e.section.clone()));
            }
        }
        bookings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        section: &str,
        day: usize,
        period: usize,
        subject: &str,
        instructor: &str,
    ) -> TimetableEntry {
        TimetableEntry {
            section: section.into(),
            slot: Slot::new(day, period),
            subject: subject.into(),
            instructor: instructor.into(),
            kind: SessionKind::Theory,
            session_id: 0,
        }
    }

    fn sample_timetable() -> Timetable {
        let mut t = Timetable::new(vec!["Mon".into(), "Tue".into()], 3);
        t.add_entry(entry("A", 0, 0, "Math", "Rao"));
        t.add_entry(entry("A", 1, 2, "Math", "Rao"));
        t.add_entry(entry("B", 0, 0, "Physics", "Iyer"));
        t.add_entry(entry("B", 0, 1, "Math", "Rao"));
        t
    }

    #[test]
    fn test_sections_and_views() {
        let t = sample_timetable();
        assert_eq!(t.sections(), vec!["A", "B"]);
        assert_eq!(t.entries_for_section("A").len(), 2);
        assert_eq!(t.entries_for_instructor("Rao").len(), 3);
        assert_eq!(t.entry_at("B", Slot::new(0, 1)).unwrap().subject, "Math");
        assert!(t.entry_at("A", Slot::new(0, 1)).is_none());
    }

    #[test]
    fn test_hours_by_subject() {
        let hours = sample_timetable().hours_by_subject();
        assert_eq!(hours[&("A".to_string(), "Math".to_string())], 2);
        assert_eq!(hours[&("B".to_string(), "Math".to_string())], 1);
    }

    #[test]
    fn test_section_grid() {
        let tt = sample_timetable();
        let grid = tt.section_grid("B");
        assert_eq!(grid[0], vec![Some("Physics"), Some("Math"), None]);
        assert_eq!(grid[1], vec![None, None, None]);
    }

    #[test]
    fn test_to_bookings_dedups_instructor_slots() {
        let mut t = sample_timetable();
        t.add_entry(entry("C", 0, 0, "Physics", "Iyer"));
        let bookings = t.to_bookings();
        assert_eq!(bookings.len(), 4);
        assert_eq!(bookings[0].slot, Slot::new(0, 0));
        assert!(bookings.iter().all(|b| b.origin.is_some()));
    }

    #[test]
    fn test_violation_classes() {
        let v = Violation::new(ViolationType::ExternalClash, "Rao", "busy");
        assert!(v.is_hard());
        assert_eq!(v.severity, 100);
        assert!(!ViolationType::LoadImbalance.is_hard());
        assert!(ViolationType::BrokenLab.severity() > ViolationType::SubjectRepeated.severity());
    }
}
