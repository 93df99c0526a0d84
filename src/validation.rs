//! Input and result validation for timetabling problems.
//!
//! Two independent checks:
//!
//! - [`validate_input`]: structural integrity of assignments and grid before
//!   scheduling. Detects empty ids, non-positive quotas, unknown session
//!   kinds, duplicate (section, subject) rows, and sections or instructors
//!   asking for more hours than the grid has open slots.
//! - [`validate_timetable`]: rule violations of a produced timetable,
//!   computed from the timetable alone (never from the engine's fitness
//!   tallies). Re-running it on an unchanged timetable yields the same
//!   report.
//!
//! A timetable is feasible when it has no hard violations.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::models::{
    ClashOracle, InstitutionalRules, SessionKind, Slot, SubjectAssignment, TimeGrid, Timetable,
    Violation, ViolationType,
};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// An input validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of input validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A subject, instructor or section id is blank.
    EmptyId,
    /// Weekly hours are zero or negative.
    NonPositiveQuota,
    /// Session kind is neither theory nor lab.
    UnknownKind,
    /// The same subject is assigned twice to one section.
    DuplicateAssignment,
    /// A section needs more hours than the grid has open slots.
    SectionOverCapacity,
    /// An instructor needs more hours than the grid has open slots.
    InstructorOverCapacity,
    /// A lab is requested but no day has two adjacent open periods.
    NoLabCapacity,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates assignments against a grid.
///
/// Checks:
/// 1. No blank subject, instructor or section ids
/// 2. Positive weekly hours
/// 3. Recognized session kinds
/// 4. No duplicate (section, subject) rows
/// 5. Per-section and per-instructor hours fit the open slots
/// 6. Labs have at least one adjacent open pair somewhere
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(assignments: &[SubjectAssignment], grid: &TimeGrid) -> ValidationResult {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut section_hours: BTreeMap<&str, i64> = BTreeMap::new();
    let mut instructor_hours: BTreeMap<&str, i64> = BTreeMap::new();
    let mut needs_lab = false;

    for a in assignments {
        if [&a.subject, &a.instructor, &a.section]
            .iter()
            .any(|id| id.trim().is_empty())
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyId,
                format!("Assignment '{}' has a blank id", a.label()),
            ));
        }
        if a.weekly_hours <= 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveQuota,
                format!(
                    "Assignment '{}' has non-positive weekly hours {}",
                    a.label(),
                    a.weekly_hours
                ),
            ));
        }
        if let SessionKind::Custom(kind) = &a.kind {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownKind,
                format!("Assignment '{}' has unknown kind '{}'", a.label(), kind),
            ));
        }
        if !seen.insert((a.section.as_str(), a.subject.as_str())) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateAssignment,
                format!("Duplicate assignment '{}'", a.label()),
            ));
        }

        let hours = i64::from(a.weekly_hours.max(0));
        *section_hours.entry(a.section.as_str()).or_default() += hours;
        *instructor_hours.entry(a.instructor.as_str()).or_default() += hours;
        needs_lab |= a.kind.is_lab() && a.weekly_hours >= 2;
    }

    let open = grid.open_slot_count() as i64;
    for (section, hours) in section_hours {
        if hours > open {
            errors.push(ValidationError::new(
                ValidationErrorKind::SectionOverCapacity,
                format!("Section '{section}' needs {hours} periods, grid has {open} open"),
            ));
        }
    }
    for (instructor, hours) in instructor_hours {
        if hours > open {
            errors.push(ValidationError::new(
                ValidationErrorKind::InstructorOverCapacity,
                format!("Instructor '{instructor}' needs {hours} periods, grid has {open} open"),
            ));
        }
    }

    if needs_lab && !has_adjacent_pair(grid) {
        errors.push(ValidationError::new(
            ValidationErrorKind::NoLabCapacity,
            "Labs requested but no day has two adjacent open periods",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn has_adjacent_pair(grid: &TimeGrid) -> bool {
    grid.open_slots().any(|s| grid.is_assignable(Slot::new(s.day, s.period + 1)))
}

/// Violations found in a timetable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// All violations, hard first.
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// No hard violations.
    pub fn is_feasible(&self) -> bool {
        !self.violations.iter().any(Violation::is_hard)
    }

    pub fn hard_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_hard()).count()
    }

    pub fn soft_count(&self) -> usize {
        self.violations.len() - self.hard_count()
    }

    /// Violations of one type.
    pub fn of_type(&self, violation_type: ViolationType) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.violation_type == violation_type)
            .collect()
    }
}

/// Validates a timetable against its inputs.
///
/// Hard checks:
/// 1. At most one entry per (section, slot)
/// 2. No instructor in two sections at one slot
/// 3. No instructor at an externally booked slot
/// 4. No entry in a blocked slot (grid or rules)
/// 5. Placed hours per (section, subject) equal the quota
/// 6. Every lab session holds two contiguous same-day periods
///
/// Soft checks: subject repeats, labs per day, reserved periods, daily
/// load spread and instructor weekly load, per `rules`.
pub fn validate_timetable(
    timetable: &Timetable,
    assignments: &[SubjectAssignment],
    grid: &TimeGrid,
    bookings: &dyn ClashOracle,
    rules: &InstitutionalRules,
) -> ValidationReport {
    let grid = rules.apply_to(grid);
    let mut violations = Vec::new();

    // Per-cell and per-instructor occupancy.
    let mut cells: BTreeMap<(&str, Slot), usize> = BTreeMap::new();
    let mut teaching: BTreeMap<(&str, Slot), BTreeSet<&str>> = BTreeMap::new();
    for e in &timetable.entries {
        *cells.entry((e.section.as_str(), e.slot)).or_default() += 1;
        teaching
            .entry((e.instructor.as_str(), e.slot))
            .or_default()
            .insert(e.section.as_str());

        if bookings.is_booked(&e.instructor, e.slot) {
            violations.push(Violation::new(
                ViolationType::ExternalClash,
                &e.instructor,
                format!("{} is booked elsewhere at {} ({})", e.instructor, e.slot, e.section),
            ));
        }
        if !grid.is_assignable(e.slot) {
            violations.push(Violation::new(
                ViolationType::BlockedSlotUsed,
                &e.section,
                format!("{} placed in blocked slot {}", e.subject, e.slot),
            ));
        }
        if rules.is_reserved(e.slot) {
            violations.push(Violation::new(
                ViolationType::ReservedPeriodUsed,
                &e.section,
                format!("{} occupies reserved period {}", e.subject, e.slot),
            ));
        }
    }

    for ((section, slot), n) in &cells {
        if *n > 1 {
            violations.push(Violation::new(
                ViolationType::SlotCollision,
                *section,
                format!("{n} sessions share {slot}"),
            ));
        }
    }
    for ((instructor, slot), sections) in &teaching {
        if sections.len() > 1 {
            let list: Vec<&str> = sections.iter().copied().collect();
            violations.push(Violation::new(
                ViolationType::InstructorDoubleBooked,
                *instructor,
                format!("{instructor} teaches {} at {slot}", list.join(" and ")),
            ));
        }
    }

    check_quotas(timetable, assignments, &mut violations);
    check_labs(timetable, rules, &mut violations);
    check_daily_rules(timetable, rules, &mut violations);
    check_instructor_load(timetable, rules, &mut violations);

    violations.sort_by_key(|v| (!v.is_hard(), -v.severity));
    ValidationReport { violations }
}

fn check_quotas(
    timetable: &Timetable,
    assignments: &[SubjectAssignment],
    violations: &mut Vec<Violation>,
) {
    let placed = timetable.hours_by_subject();
    let mut expected: BTreeMap<(String, String), i64> = BTreeMap::new();
    for a in assignments {
        *expected
            .entry((a.section.clone(), a.subject.clone()))
            .or_default() += i64::from(a.weekly_hours);
    }

    for ((section, subject), quota) in &expected {
        let hours = placed.get(&(section.clone(), subject.clone())).copied().unwrap_or(0) as i64;
        if hours != *quota {
            violations.push(Violation::new(
                ViolationType::QuotaMismatch,
                format!("{section}/{subject}"),
                format!("{hours} of {quota} weekly hours placed"),
            ));
        }
    }
    for ((section, subject), hours) in &placed {
        if !expected.contains_key(&(section.clone(), subject.clone())) {
            violations.push(Violation::new(
                ViolationType::QuotaMismatch,
                format!("{section}/{subject}"),
                format!("{hours} hours placed without an assignment"),
            ));
        }
    }
}

fn check_labs(timetable: &Timetable, rules: &InstitutionalRules, violations: &mut Vec<Violation>) {
    let mut labs: BTreeMap<(&str, usize), Vec<Slot>> = BTreeMap::new();
    let mut subjects: HashMap<(&str, usize), &str> = HashMap::new();
    for e in timetable.entries.iter().filter(|e| e.kind.is_lab()) {
        labs.entry((e.section.as_str(), e.session_id)).or_default().push(e.slot);
        subjects.insert((e.section.as_str(), e.session_id), e.subject.as_str());
    }

    let mut labs_per_day: BTreeMap<(&str, usize), usize> = BTreeMap::new();
    for ((section, id), mut slots) in labs {
        slots.sort_unstable();
        let subject = subjects.get(&(section, id)).copied().unwrap_or_default();
        let contiguous = slots.len() == 2
            && slots[0].day == slots[1].day
            && slots[0].period + 1 == slots[1].period;
        if contiguous {
            *labs_per_day.entry((section, slots[0].day)).or_default() += 1;
        } else {
            violations.push(Violation::new(
                ViolationType::BrokenLab,
                format!("{section}/{subject}"),
                format!("lab session {id} is not two contiguous periods"),
            ));
        }
    }

    for ((section, day), n) in labs_per_day {
        if n > rules.max_labs_per_day {
            violations.push(Violation::new(
                ViolationType::LabsPerDayExceeded,
                section,
                format!("{n} labs on day {day} (max {})", rules.max_labs_per_day),
            ));
        }
    }
}

fn check_daily_rules(
    timetable: &Timetable,
    rules: &InstitutionalRules,
    violations: &mut Vec<Violation>,
) {
    let days = timetable.days.len();
    let mut theory: BTreeMap<(&str, &str, usize), usize> = BTreeMap::new();
    let mut loads: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

    for e in &timetable.entries {
        if !e.kind.is_lab() {
            *theory
                .entry((e.section.as_str(), e.subject.as_str(), e.slot.day))
                .or_default() += 1;
        }
        let row = loads.entry(e.section.as_str()).or_insert_with(|| vec![0; days]);
        if let Some(load) = row.get_mut(e.slot.day) {
            *load += 1;
        }
    }

    for ((section, subject, day), n) in theory {
        if n > rules.max_same_subject_per_day {
            violations.push(Violation::new(
                ViolationType::SubjectRepeated,
                format!("{section}/{subject}"),
                format!("{n} periods on day {day} (max {})", rules.max_same_subject_per_day),
            ));
        }
    }

    for (section, row) in loads {
        let max = row.iter().copied().max().unwrap_or(0);
        let min = row.iter().copied().min().unwrap_or(0);
        if max - min > rules.load_imbalance_threshold {
            violations.push(Violation::new(
                ViolationType::LoadImbalance,
                section,
                format!(
                    "daily load spread {} exceeds {}",
                    max - min,
                    rules.load_imbalance_threshold
                ),
            ));
        }
    }
}

fn check_instructor_load(
    timetable: &Timetable,
    rules: &InstitutionalRules,
    violations: &mut Vec<Violation>,
) {
    let mut load: BTreeMap<&str, usize> = BTreeMap::new();
    for e in &timetable.entries {
        *load.entry(e.instructor.as_str()).or_default() += 1;
    }
    for (instructor, n) in load {
        if n > rules.max_instructor_weekly_load {
            violations.push(Violation::new(
                ViolationType::InstructorOverloaded,
                instructor,
                format!(
                    "{n} periods per week (max {})",
                    rules.max_instructor_weekly_load
                ),
            ));
        }
    }
}
