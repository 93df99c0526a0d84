//! Timetable fitness evaluation.
//!
//! # Score
//!
//! ```text
//! score = max(0, BASELINE − hard
//!                − BONUS_BAND + BONUS_BAND · bonus / (bonus + BONUS_SCALE)
//!                − SOFT_BAND · penalty / (penalty + SOFT_SCALE))
//! ```
//!
//! Hard penalties are subtracted linearly. Soft bonuses and soft penalties
//! are squashed separately into bounded bands below the baseline:
//!
//! - A hard-clean individual scores above `BASELINE − BONUS_BAND − SOFT_BAND`
//!   (890) and any hard violation costs at least [`MIN_HARD_PENALTY`] (200),
//!   so soft credit never lifts a hard-violating individual over a clean one.
//! - A hard-clean individual with no soft penalty scores at least
//!   `BASELINE − BONUS_BAND` (980).
//! - A single preference violation (repeat, excess lab, reserved period,
//!   load imbalance, overload) costs more than 50 points, which keeps the
//!   score under [`DEFAULT_SUCCESS_THRESHOLD`] whatever the bonuses.
//!
//! | Hard rule | Penalty |
//! |-----------|---------|
//! | Session occupying more cells than its span | [`SLOT_COLLISION`] per extra cell |
//! | Instructor in two sections at one slot | [`INSTRUCTOR_DOUBLE_BOOKING`] per extra section |
//! | Instructor clashes with an external booking | [`EXTERNAL_CLASH`] per cell |
//! | Placed hours ≠ weekly quota | [`QUOTA_MISMATCH`] × \|diff\| |
//! | Lab not two contiguous same-day cells | [`BROKEN_LAB`] per lab |
//! | Blocked cell occupied | [`BLOCKED_SLOT`] per cell |
//!
//! | Soft rule | Adjustment |
//! |-----------|------------|
//! | Lab contiguous | +[`CONTIGUOUS_LAB_BONUS`] |
//! | Instructor done before the day's last open period | +[`END_OF_DAY_GAP_BONUS`] × gap |
//! | Theory subject over the per-day cap | −[`SUBJECT_REPEAT`] × excess |
//! | Section-day over the lab cap | −[`EXCESS_LABS`] × excess |
//! | Reserved free period occupied | −[`RESERVED_PERIOD`] per cell |
//! | Daily load spread over threshold | −[`LOAD_IMBALANCE`] × excess |
//! | Instructor over the weekly cap | −[`INSTRUCTOR_OVERLOAD`] × excess |
//! | Idle period between a section's classes | −[`IDLE_GAP`] per period |
//!
//! # Reference
//! Burke, E.K. & Petrovic, S. (2002). "Recent research directions in
//! automated timetabling", *European Journal of Operational Research* 140(2).

use super::chromosome::TimetableChromosome;
use super::problem::TimetableProblem;
use crate::models::Slot;

/// Score of a perfect timetable.
pub const BASELINE: f64 = 1000.0;
/// Width of the band soft bonuses are squashed into.
pub const BONUS_BAND: f64 = 20.0;
/// Bonus at which half of [`BONUS_BAND`] is earned.
pub const BONUS_SCALE: f64 = 100.0;
/// Width of the band soft penalties are squashed into.
pub const SOFT_BAND: f64 = 90.0;
/// Soft penalty at which half of [`SOFT_BAND`] is lost.
pub const SOFT_SCALE: f64 = 50.0;

/// Default stopping score: above any individual with a preference
/// violation, below any hard-clean individual without soft penalties.
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 950.0;

pub const SLOT_COLLISION: f64 = 200.0;
pub const INSTRUCTOR_DOUBLE_BOOKING: f64 = 200.0;
pub const EXTERNAL_CLASH: f64 = 300.0;
pub const QUOTA_MISMATCH: f64 = 200.0;
pub const BROKEN_LAB: f64 = 200.0;
pub const BLOCKED_SLOT: f64 = 200.0;

pub const CONTIGUOUS_LAB_BONUS: f64 = 50.0;
pub const END_OF_DAY_GAP_BONUS: f64 = 2.0;
pub const SUBJECT_REPEAT: f64 = 75.0;
pub const EXCESS_LABS: f64 = 75.0;
pub const RESERVED_PERIOD: f64 = 100.0;
pub const LOAD_IMBALANCE: f64 = 75.0;
pub const INSTRUCTOR_OVERLOAD: f64 = 75.0;
pub const IDLE_GAP: f64 = 2.0;

/// Smallest penalty any single hard violation costs.
pub const MIN_HARD_PENALTY: f64 = 200.0;

/// Per-rule tallies of one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FitnessBreakdown {
    pub slot_collisions: usize,
    pub instructor_double_bookings: usize,
    pub external_clashes: usize,
    pub quota_deviation: usize,
    pub broken_labs: usize,
    pub blocked_cells_used: usize,
    pub contiguous_labs: usize,
    pub subject_repeats: usize,
    pub excess_labs: usize,
    pub reserved_used: usize,
    pub end_of_day_gap: usize,
    pub load_imbalance_excess: usize,
    pub idle_gaps: usize,
    pub instructor_overload: usize,
}

impl FitnessBreakdown {
    /// Total hard penalty.
    pub fn hard_penalty(&self) -> f64 {
        self.slot_collisions as f64 * SLOT_COLLISION
            + self.instructor_double_bookings as f64 * INSTRUCTOR_DOUBLE_BOOKING
            + self.external_clashes as f64 * EXTERNAL_CLASH
            + self.quota_deviation as f64 * QUOTA_MISMATCH
            + self.broken_labs as f64 * BROKEN_LAB
            + self.blocked_cells_used as f64 * BLOCKED_SLOT
    }

    /// Raw soft bonus.
    pub fn soft_bonus(&self) -> f64 {
        self.contiguous_labs as f64 * CONTIGUOUS_LAB_BONUS
            + self.end_of_day_gap as f64 * END_OF_DAY_GAP_BONUS
    }

    /// Raw soft penalty.
    pub fn soft_penalty(&self) -> f64 {
        self.subject_repeats as f64 * SUBJECT_REPEAT
            + self.excess_labs as f64 * EXCESS_LABS
            + self.reserved_used as f64 * RESERVED_PERIOD
            + self.load_imbalance_excess as f64 * LOAD_IMBALANCE
            + self.instructor_overload as f64 * INSTRUCTOR_OVERLOAD
            + self.idle_gaps as f64 * IDLE_GAP
    }

    /// Final score in `[0, BASELINE)`.
    pub fn score(&self) -> f64 {
        let bonus = self.soft_bonus();
        let penalty = self.soft_penalty();
        let soft = BONUS_BAND * bonus / (bonus + BONUS_SCALE)
            - BONUS_BAND
            - SOFT_BAND * penalty / (penalty + SOFT_SCALE);
        (BASELINE - self.hard_penalty() + soft).max(0.0)
    }

    /// No hard rule is violated.
    pub fn is_feasible(&self) -> bool {
        self.slot_collisions == 0
            && self.instructor_double_bookings == 0
            && self.external_clashes == 0
            && self.quota_deviation == 0
            && self.broken_labs == 0
            && self.blocked_cells_used == 0
    }

    /// Institutional preference violations (idle gaps excluded).
    pub fn preference_violations(&self) -> usize {
        self.subject_repeats
            + self.excess_labs
            + self.reserved_used
            + self.load_imbalance_excess
            + self.instructor_overload
    }
}

/// Evaluates chromosomes against one problem.
pub struct FitnessEvaluator<'a> {
    problem: &'a TimetableProblem,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(problem: &'a TimetableProblem) -> Self {
        Self { problem }
    }

    /// Tallies every rule for a chromosome.
    pub fn evaluate(&self, chromosome: &TimetableChromosome) -> FitnessBreakdown {
        let p = self.problem;
        let grid = &p.grid;
        let rules = &p.rules;
        let days = grid.day_count();
        let ppd = grid.periods_per_day;
        let slot_count = grid.slot_count();
        let mut b = FitnessBreakdown::default();

        // Cells held by each session, in cell order.
        let mut cells_of: Vec<Vec<usize>> = vec![Vec::new(); p.session_count()];
        let mut instructor_cells = vec![0usize; p.instructors.len() * slot_count];
        for (cell, content) in chromosome.cells.iter().enumerate() {
            let Some(id) = *content else { continue };
            cells_of[id].push(cell);

            let (_, slot) = p.cell_position(cell);
            let instructor = p.instructor_of(id);
            instructor_cells[instructor * slot_count + grid.slot_index(slot)] += 1;
            if p.is_externally_booked(instructor, slot) {
                b.external_clashes += 1;
            }
            if !grid.is_assignable(slot) {
                b.blocked_cells_used += 1;
            }
            if rules.is_reserved(slot) {
                b.reserved_used += 1;
            }
        }

        // Per-session structure and per-assignment hours.
        let mut placed_hours = vec![0usize; p.assignments.len()];
        let mut theory_day = vec![0usize; p.assignments.len() * days];
        let mut labs_day = vec![0usize; p.sections.len() * days];
        for (id, cells) in cells_of.iter().enumerate() {
            let session = &p.sessions[id];
            let span = session.span();
            placed_hours[session.assignment] += cells.len();
            b.slot_collisions += cells.len().saturating_sub(span);

            if session.is_lab() {
                if cells.is_empty() {
                    continue;
                }
                if self.is_contiguous_pair(id, cells) {
                    b.contiguous_labs += 1;
                    let (_, slot) = p.cell_position(cells[0]);
                    labs_day[p.section_of(id) * days + slot.day] += 1;
                } else {
                    b.broken_labs += 1;
                }
            } else {
                for &cell in cells {
                    let (_, slot) = p.cell_position(cell);
                    theory_day[session.assignment * days + slot.day] += 1;
                }
            }
        }

        b.quota_deviation = p
            .assignments
            .iter()
            .zip(&placed_hours)
            .map(|(a, &placed)| (a.weekly_hours.max(0) as usize).abs_diff(placed))
            .sum();
        b.subject_repeats = theory_day
            .iter()
            .map(|&n| n.saturating_sub(rules.max_same_subject_per_day))
            .sum();
        b.excess_labs = labs_day
            .iter()
            .map(|&n| n.saturating_sub(rules.max_labs_per_day))
            .sum();

        // Instructor exclusivity, end-of-day gaps and weekly load.
        let last_open: Vec<Option<usize>> = (0..days)
            .map(|day| (0..ppd).rev().find(|&q| grid.is_assignable(Slot::new(day, q))))
            .collect();
        for instructor in 0..p.instructors.len() {
            let row = &instructor_cells[instructor * slot_count..(instructor + 1) * slot_count];
            b.instructor_double_bookings +=
                row.iter().map(|&n| n.saturating_sub(1)).sum::<usize>();

            for (day, open) in last_open.iter().enumerate() {
                let last = (0..ppd).rev().find(|&q| row[day * ppd + q] > 0);
                if let (Some(last), Some(open)) = (last, *open) {
                    b.end_of_day_gap += open.saturating_sub(last);
                }
            }

            let load: usize = row.iter().sum();
            b.instructor_overload += load.saturating_sub(rules.max_instructor_weekly_load);
        }

        // Section load balance and idle gaps.
        for section in 0..p.sections.len() {
            let mut loads = Vec::with_capacity(days);
            for day in 0..days {
                let occupied: Vec<usize> = (0..ppd)
                    .filter(|&q| chromosome.cells[p.cell(section, Slot::new(day, q))].is_some())
                    .collect();
                loads.push(occupied.len());
                if let (Some(&first), Some(&last)) = (occupied.first(), occupied.last()) {
                    b.idle_gaps += (first..=last)
                        .filter(|&q| {
                            let slot = Slot::new(day, q);
                            grid.is_assignable(slot)
                                && chromosome.cells[p.cell(section, slot)].is_none()
                        })
                        .count();
                }
            }
            let max = loads.iter().copied().max().unwrap_or(0);
            let min = loads.iter().copied().min().unwrap_or(0);
            b.load_imbalance_excess += (max - min).saturating_sub(rules.load_imbalance_threshold);
        }

        b
    }

    fn is_contiguous_pair(&self, id: usize, cells: &[usize]) -> bool {
        let p = self.problem;
        if cells.len() != 2 {
            return false;
        }
        let (s0, a) = p.cell_position(cells[0]);
        let (s1, b) = p.cell_position(cells[1]);
        s0 == p.section_of(id) && s1 == s0 && a.day == b.day && a.period + 1 == b.period
    }
}
