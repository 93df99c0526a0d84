//! Timetabling GA problem definition.
//!
//! Bridges domain models (assignments, grid, bookings, rules) to the GA.
//! Identifiers are interned to dense indices and the clash oracle is
//! queried once per (instructor, slot) up front, so the hot loops of
//! initialization, repair and evaluation only touch plain vectors.
//!
//! # Cell layout
//! A chromosome stores one cell per (section, slot):
//! `cell = section * slot_count + day * periods_per_day + period`.

use std::collections::HashMap;

use super::chromosome::TimetableChromosome;
use super::decompose::{decompose, Overflow};
use super::fitness::{FitnessBreakdown, FitnessEvaluator};
use crate::error::EngineError;
use crate::models::{
    ClashOracle, InstitutionalRules, Session, Slot, SubjectAssignment, TimeGrid, Timetable,
    TimetableEntry,
};

/// Default cap on randomized placement attempts per session.
pub const DEFAULT_MAX_PLACEMENT_ATTEMPTS: usize = 100;

/// GA problem definition for weekly timetabling.
///
/// Immutable for the duration of a run and safe to share across threads.
#[derive(Debug, Clone)]
pub struct TimetableProblem {
    /// Grid with the rules' extra blocked slots applied.
    pub grid: TimeGrid,
    /// Institutional rules.
    pub rules: InstitutionalRules,
    /// Input assignments, in caller order.
    pub assignments: Vec<SubjectAssignment>,
    /// Decomposed sessions (`sessions[i].id == i`).
    pub sessions: Vec<Session>,
    /// Interned section ids.
    pub sections: Vec<String>,
    /// Interned instructor ids.
    pub instructors: Vec<String>,
    /// Hours left out because their section had no room, in input order.
    pub overflow: Vec<Overflow>,
    /// Randomized attempts per session before force placement.
    pub max_placement_attempts: usize,
    session_section: Vec<usize>,
    session_instructor: Vec<usize>,
    assignment_section: Vec<usize>,
    /// `instructor * slot_count + slot_index` → externally booked.
    external: Vec<bool>,
}

impl TimetableProblem {
    /// Builds a problem from domain inputs.
    ///
    /// Hours beyond a section's open cells are not turned into sessions;
    /// they are kept in [`overflow`](Self::overflow).
    ///
    /// # Errors
    /// `InvalidGrid` if the grid (with rule blocks applied) is malformed,
    /// `InvalidAssignment` if any assignment is malformed.
    pub fn new(
        assignments: &[SubjectAssignment],
        grid: &TimeGrid,
        oracle: &dyn ClashOracle,
        rules: InstitutionalRules,
    ) -> Result<Self, EngineError> {
        let grid = rules.apply_to(grid);
        grid.validate()?;
        let decomposition = decompose(assignments, grid.open_slot_count())?;
        for o in &decomposition.overflow {
            tracing::warn!(
                assignment = %assignments[o.assignment].label(),
                hours = o.hours,
                "quota exceeds section capacity"
            );
        }
        let sessions = decomposition.sessions;

        let mut sections = Interner::default();
        let mut instructors = Interner::default();
        let assignment_section: Vec<usize> = assignments
            .iter()
            .map(|a| sections.intern(&a.section))
            .collect();
        let assignment_instructor: Vec<usize> = assignments
            .iter()
            .map(|a| instructors.intern(&a.instructor))
            .collect();

        let session_section = sessions
            .iter()
            .map(|s| assignment_section[s.assignment])
            .collect();
        let session_instructor = sessions
            .iter()
            .map(|s| assignment_instructor[s.assignment])
            .collect();

        let instructors = instructors.into_names();
        let mut external = vec![false; instructors.len() * grid.slot_count()];
        for (i, name) in instructors.iter().enumerate() {
            for slot in grid.slots() {
                external[i * grid.slot_count() + grid.slot_index(slot)] =
                    oracle.is_booked(name, slot);
            }
        }

        Ok(Self {
            grid,
            rules,
            assignments: assignments.to_vec(),
            sessions,
            sections: sections.into_names(),
            instructors,
            overflow: decomposition.overflow,
            max_placement_attempts: DEFAULT_MAX_PLACEMENT_ATTEMPTS,
            session_section,
            session_instructor,
            assignment_section,
            external,
        })
    }

    /// Sets the randomized placement attempt cap (at least one).
    pub fn with_max_placement_attempts(mut self, attempts: usize) -> Self {
        self.max_placement_attempts = attempts.max(1);
        self
    }

    /// Number of cells in a chromosome.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.sections.len() * self.grid.slot_count()
    }

    /// Cell index of (section, slot).
    #[inline]
    pub fn cell(&self, section: usize, slot: Slot) -> usize {
        section * self.grid.slot_count() + self.grid.slot_index(slot)
    }

    /// Inverse of [`cell`](Self::cell).
    #[inline]
    pub fn cell_position(&self, cell: usize) -> (usize, Slot) {
        let n = self.grid.slot_count();
        (cell / n, self.grid.slot_at(cell % n))
    }

    /// Section index of a session.
    #[inline]
    pub fn section_of(&self, session: usize) -> usize {
        self.session_section[session]
    }

    /// Instructor index of a session.
    #[inline]
    pub fn instructor_of(&self, session: usize) -> usize {
        self.session_instructor[session]
    }

    /// Section index of an assignment.
    #[inline]
    pub fn assignment_section(&self, assignment: usize) -> usize {
        self.assignment_section[assignment]
    }

    /// Whether the oracle reported the instructor booked at the slot.
    #[inline]
    pub fn is_externally_booked(&self, instructor: usize, slot: Slot) -> bool {
        self.external[instructor * self.grid.slot_count() + self.grid.slot_index(slot)]
    }

    /// Total sessions to place.
    #[inline]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Scores a chromosome.
    pub fn evaluate(&self, chromosome: &TimetableChromosome) -> f64 {
        self.breakdown(chromosome).score()
    }

    /// Per-rule tallies behind the score.
    pub fn breakdown(&self, chromosome: &TimetableChromosome) -> FitnessBreakdown {
        FitnessEvaluator::new(self).evaluate(chromosome)
    }

    /// Decodes a chromosome into a timetable.
    pub fn decode(&self, chromosome: &TimetableChromosome) -> Timetable {
        let mut timetable = Timetable::new(self.grid.days.clone(), self.grid.periods_per_day);
        for (cell, content) in chromosome.cells.iter().enumerate() {
            let Some(id) = *content else { continue };
            let (section, slot) = self.cell_position(cell);
            let session = &self.sessions[id];
            timetable.add_entry(TimetableEntry {
                section: self.sections[section].clone(),
                slot,
                subject: session.subject.clone(),
                instructor: session.instructor.clone(),
                kind: session.kind.clone(),
                session_id: id,
            });
        }
        timetable
    }

    /// Whether every weekly hour was turned into a session.
    #[inline]
    pub fn fits_capacity(&self) -> bool {
        self.overflow.is_empty()
    }

    /// Labels of what a chromosome failed to place: each unplaced session,
    /// then one entry per assignment with hours beyond section capacity.
    pub fn unplaced_labels(&self, chromosome: &TimetableChromosome) -> Vec<String> {
        let sessions = chromosome.unplaced.iter().map(|&id| self.sessions[id].label());
        let overflow = self.overflow.iter().map(|o| {
            format!(
                "{} (+{} h over capacity)",
                self.assignments[o.assignment].label(),
                o.hours
            )
        });
        sessions.chain(overflow).collect()
    }
}

/// Maps string ids to dense indices in first-seen order.
#[derive(Default)]
struct Interner {
    index: HashMap<String, usize>,
    names: Vec<String>,
}

impl Interner {
    fn intern(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.index.insert(name.to_string(), i);
        self.names.push(name.to_string());
        i
    }

    fn into_names(self) -> Vec<String> {
        self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingSnapshot, ExternalBooking};

    fn sample_assignments() -> Vec<SubjectAssignment> {
        vec![
            SubjectAssignment::theory("Math", "Rao", "A", 3),
            SubjectAssignment::lab("Chem-L", "Das", "A", 2),
            SubjectAssignment::theory("Math", "Rao", "B", 2),
        ]
    }

    #[test]
    fn test_interning() {
        let p = TimetableProblem::new(
            &sample_assignments(),
            &TimeGrid::standard(),
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap();
        assert_eq!(p.sections, vec!["A", "B"]);
        assert_eq!(p.instructors, vec!["Rao", "Das"]);
        assert_eq!(p.session_count(), 3 + 1 + 2);
        assert_eq!(p.section_of(5), 1);
        assert_eq!(p.instructor_of(3), 1);
        assert_eq!(p.assignment_section(2), 1);
        assert_eq!(p.cell_count(), 60);
    }

    #[test]
    fn test_cell_layout_roundtrip() {
        let p = TimetableProblem::new(
            &sample_assignments(),
            &TimeGrid::standard(),
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap();
        let slot = Slot::new(4, 3);
        let cell = p.cell(1, slot);
        assert_eq!(cell, 30 + 4 * 6 + 3);
        assert_eq!(p.cell_position(cell), (1, slot));
    }

    #[test]
    fn test_oracle_is_precomputed() {
        let bookings =
            BookingSnapshot::from_bookings([ExternalBooking::new("Das", Slot::new(2, 0))]);
        let p = TimetableProblem::new(
            &sample_assignments(),
            &TimeGrid::standard(),
            &bookings,
            InstitutionalRules::default(),
        )
        .unwrap();
        assert!(p.is_externally_booked(1, Slot::new(2, 0)));
        assert!(!p.is_externally_booked(0, Slot::new(2, 0)));
        assert!(!p.is_externally_booked(1, Slot::new(2, 1)));
    }

    #[test]
    fn test_rule_blocks_are_applied() {
        let rules = InstitutionalRules::default().with_blocked(Slot::new(0, 0));
        let p = TimetableProblem::new(
            &sample_assignments(),
            &TimeGrid::standard(),
            &BookingSnapshot::new(),
            rules,
        )
        .unwrap();
        assert!(!p.grid.is_assignable(Slot::new(0, 0)));
    }

    #[test]
    fn test_invalid_input_fails_fast() {
        let bad = vec![SubjectAssignment::theory("Math", "Rao", "A", 0)];
        let err = TimetableProblem::new(
            &bad,
            &TimeGrid::standard(),
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAssignment { .. }));

        let err = TimetableProblem::new(
            &sample_assignments(),
            &TimeGrid::new(["Mon"], 0),
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidGrid(_)));
    }

    #[test]
    fn test_over_capacity_quota_is_bounded() {
        let assignments = vec![
            SubjectAssignment::theory("Math", "Rao", "A", i32::MAX),
            SubjectAssignment::theory("Math", "Rao", "B", 2),
        ];
        let grid = TimeGrid::standard().with_blocked_period(5);
        let p = TimetableProblem::new(
            &assignments,
            &grid,
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap();
        assert_eq!(p.session_count(), 25 + 2);
        assert!(!p.fits_capacity());
        assert_eq!(p.overflow[0].hours, i32::MAX as usize - 25);

        let ch = TimetableChromosome::empty(&p);
        assert_eq!(
            p.unplaced_labels(&ch),
            vec![format!("A/Math (+{} h over capacity)", i32::MAX as usize - 25)]
        );
    }

    #[test]
    fn test_decode_lists_every_cell() {
        let p = TimetableProblem::new(
            &sample_assignments(),
            &TimeGrid::standard(),
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap();
        let mut ch = TimetableChromosome::empty(&p);
        ch.cells[p.cell(0, Slot::new(0, 0))] = Some(3);
        ch.cells[p.cell(0, Slot::new(0, 1))] = Some(3);
        ch.cells[p.cell(1, Slot::new(2, 4))] = Some(4);
        let t = p.decode(&ch);
        assert_eq!(t.entry_count(), 3);
        let e = t.entry_at("B", Slot::new(2, 4)).unwrap();
        assert_eq!(e.subject, "Math");
        assert_eq!(e.instructor, "Rao");
        assert!(t.entry_at("A", Slot::new(0, 1)).unwrap().kind.is_lab());
    }
}
