//! Cell-grid chromosome for timetabling.
//!
//! # Encoding
//!
//! One cell per (section, slot), each holding at most one session id.
//! A lab session occupies two adjacent cells on the same day. Because a
//! cell can hold only one session, two sessions of one section can never
//! share a slot; what recombination *can* produce is a session appearing
//! twice (inherited from both parents on different days) or not at all.
//! [`TimetableChromosome::repair`] removes both.
//!
//! # Initialization
//!
//! Sessions are shuffled, labs go first, and each gets a bounded number of
//! randomized placements under hard and soft rules. After that, force
//! placement takes the first empty clash-free position ignoring soft rules.
//! A session that still does not fit is recorded in `unplaced`.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use super::problem::TimetableProblem;
use super::selection::Individual;
use crate::models::Slot;

/// Fitness of a chromosome that has not been evaluated yet.
pub const UNSCORED: f64 = f64::NEG_INFINITY;

/// Cell-grid chromosome. Higher fitness = better timetable.
#[derive(Debug, Clone, PartialEq)]
pub struct TimetableChromosome {
    /// `(section, slot)` cells, laid out by [`TimetableProblem::cell`].
    pub cells: Vec<Option<usize>>,
    /// Ids of sessions that could not be placed, ascending.
    pub unplaced: Vec<usize>,
    /// Fitness value ([`UNSCORED`] until evaluated).
    pub fitness: f64,
}

impl Individual for TimetableChromosome {
    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }
}

/// Incremental occupancy counters used while placing sessions.
struct Occupancy {
    /// `instructor * slot_count + slot_index` → cells taught.
    instructor_busy: Vec<u16>,
    /// `assignment * days + day` → sessions of the subject that day.
    subject_day: Vec<u16>,
    /// `section * days + day` → lab sessions that day.
    labs_day: Vec<u16>,
}

impl Occupancy {
    fn new(problem: &TimetableProblem) -> Self {
        let days = problem.grid.day_count();
        Self {
            instructor_busy: vec![0; problem.instructors.len() * problem.grid.slot_count()],
            subject_day: vec![0; problem.assignments.len() * days],
            labs_day: vec![0; problem.sections.len() * days],
        }
    }

    fn from_cells(problem: &TimetableProblem, cells: &[Option<usize>]) -> Self {
        let mut occ = Self::new(problem);
        for (cell, content) in cells.iter().enumerate() {
            let Some(id) = *content else { continue };
            let (_, slot) = problem.cell_position(cell);
            let continues = slot.period > 0 && cells[cell - 1] == Some(id);
            occ.count_cell(problem, id, slot, !continues);
        }
        occ
    }

    fn record(&mut self, problem: &TimetableProblem, id: usize, start: Slot) {
        for k in 0..problem.sessions[id].span() {
            self.count_cell(problem, id, Slot::new(start.day, start.period + k), k == 0);
        }
    }

    fn count_cell(&mut self, problem: &TimetableProblem, id: usize, slot: Slot, first: bool) {
        let days = problem.grid.day_count();
        let instructor = problem.instructor_of(id);
        self.instructor_busy[busy_index(problem, instructor, slot)] += 1;
        if first {
            let session = &problem.sessions[id];
            self.subject_day[session.assignment * days + slot.day] += 1;
            if session.is_lab() {
                self.labs_day[problem.section_of(id) * days + slot.day] += 1;
            }
        }
    }

    #[inline]
    fn instructor_free(&self, problem: &TimetableProblem, instructor: usize, slot: Slot) -> bool {
        self.instructor_busy[busy_index(problem, instructor, slot)] == 0
    }
}

#[inline]
fn busy_index(problem: &TimetableProblem, instructor: usize, slot: Slot) -> usize {
    instructor * problem.grid.slot_count() + problem.grid.slot_index(slot)
}

impl TimetableChromosome {
    /// Creates a chromosome with every cell free and nothing unplaced.
    pub fn empty(problem: &TimetableProblem) -> Self {
        Self {
            cells: vec![None; problem.cell_count()],
            unplaced: Vec::new(),
            fitness: UNSCORED,
        }
    }

    /// Builds a random, structurally complete chromosome.
    pub fn random<R: Rng>(problem: &TimetableProblem, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..problem.session_count()).collect();
        order.shuffle(rng);
        order.sort_by_key(|&id| !problem.sessions[id].is_lab());

        let mut chromosome = Self::empty(problem);
        let mut occ = Occupancy::new(problem);
        for id in order {
            if !chromosome.place(problem, &mut occ, id, rng) {
                chromosome.unplaced.push(id);
            }
        }
        chromosome.unplaced.sort_unstable();
        chromosome
    }

    /// Whether every session is placed.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Session occupying a (section, slot), if any.
    pub fn session_at(
        &self,
        problem: &TimetableProblem,
        section: usize,
        slot: Slot,
    ) -> Option<usize> {
        self.cells[problem.cell(section, slot)]
    }

    /// Places one session: randomized attempts first, then forced fallback.
    fn place<R: Rng>(
        &mut self,
        problem: &TimetableProblem,
        occ: &mut Occupancy,
        id: usize,
        rng: &mut R,
    ) -> bool {
        for _ in 0..problem.max_placement_attempts {
            if let Some(start) = self.propose(problem, occ, id, rng) {
                self.put(problem, occ, id, start);
                return true;
            }
        }
        match self.force_position(problem, occ, id) {
            Some(start) => {
                self.put(problem, occ, id, start);
                true
            }
            None => false,
        }
    }

    fn propose<R: Rng>(
        &self,
        problem: &TimetableProblem,
        occ: &Occupancy,
        id: usize,
        rng: &mut R,
    ) -> Option<Slot> {
        let day = rng.random_range(0..problem.grid.day_count());
        let start = if problem.sessions[id].is_lab() {
            let block = problem.grid.lab_blocks.choose(rng)?;
            Slot::new(day, block.start)
        } else {
            Slot::new(day, rng.random_range(0..problem.grid.periods_per_day))
        };
        self.fits(problem, occ, id, start, true).then_some(start)
    }

    /// First empty, clash-free position scanning days then periods.
    /// Labs prefer predefined lab blocks, then any adjacent pair.
    fn force_position(
        &self,
        problem: &TimetableProblem,
        occ: &Occupancy,
        id: usize,
    ) -> Option<Slot> {
        let grid = &problem.grid;
        if !problem.sessions[id].is_lab() {
            return grid.open_slots().find(|&s| self.fits(problem, occ, id, s, false));
        }
        (0..grid.day_count())
            .flat_map(move |day| grid.open_lab_blocks(day).map(move |b| Slot::new(day, b.start)))
            .chain(grid.open_slots())
            .find(|&s| self.fits(problem, occ, id, s, false))
    }

    /// Whether the session may start at `start`.
    ///
    /// Hard checks always apply: assignable, empty for the section, no
    /// external booking, instructor not already teaching. `strict` adds the
    /// soft rules: reserved periods, subject-per-day and labs-per-day caps.
    fn fits(
        &self,
        problem: &TimetableProblem,
        occ: &Occupancy,
        id: usize,
        start: Slot,
        strict: bool,
    ) -> bool {
        let session = &problem.sessions[id];
        let section = problem.section_of(id);
        let instructor = problem.instructor_of(id);

        for k in 0..session.span() {
            let slot = Slot::new(start.day, start.period + k);
            if !problem.grid.is_assignable(slot)
                || self.cells[problem.cell(section, slot)].is_some()
                || problem.is_externally_booked(instructor, slot)
                || !occ.instructor_free(problem, instructor, slot)
            {
                return false;
            }
            if strict && problem.rules.is_reserved(slot) {
                return false;
            }
        }

        if strict {
            let days = problem.grid.day_count();
            let rules = &problem.rules;
            if occ.subject_day[session.assignment * days + start.day] as usize
                >= rules.max_same_subject_per_day
            {
                return false;
            }
            if session.is_lab()
                && occ.labs_day[section * days + start.day] as usize >= rules.max_labs_per_day
            {
                return false;
            }
        }
        true
    }

    fn put(&mut self, problem: &TimetableProblem, occ: &mut Occupancy, id: usize, start: Slot) {
        let section = problem.section_of(id);
        for k in 0..problem.sessions[id].span() {
            let cell = problem.cell(section, Slot::new(start.day, start.period + k));
            self.cells[cell] = Some(id);
        }
        occ.record(problem, id, start);
    }

    /// Restores structural completeness after crossover or mutation.
    ///
    /// 1. Scans cells in (section, day, period) order and keeps the first
    ///    whole copy of every session; later copies, lab fragments and
    ///    sessions sitting in blocked or foreign-section cells are cleared.
    /// 2. Relocates every session that is now missing through the
    ///    initializer's placement path.
    ///
    /// Resets fitness to [`UNSCORED`].
    pub fn repair<R: Rng>(&mut self, problem: &TimetableProblem, rng: &mut R) {
        let ppd = problem.grid.periods_per_day;
        let mut seen = vec![false; problem.session_count()];

        let mut cell = 0;
        while cell < self.cells.len() {
            let Some(id) = self.cells[cell] else {
                cell += 1;
                continue;
            };
            let (section, slot) = problem.cell_position(cell);
            let foreign = problem.section_of(id) != section || !problem.grid.is_assignable(slot);

            if seen[id] || foreign {
                self.cells[cell] = None;
                cell += 1;
            } else if problem.sessions[id].is_lab() {
                let next = Slot::new(slot.day, slot.period + 1);
                let whole = slot.period + 1 < ppd
                    && problem.grid.is_assignable(next)
                    && self.cells[cell + 1] == Some(id);
                if whole {
                    seen[id] = true;
                    cell += 2;
                } else {
                    self.cells[cell] = None;
                    cell += 1;
                }
            } else {
                seen[id] = true;
                cell += 1;
            }
        }

        let mut missing: Vec<usize> = (0..problem.session_count())
            .filter(|&id| !seen[id])
            .collect();
        missing.shuffle(rng);
        missing.sort_by_key(|&id| !problem.sessions[id].is_lab());

        let mut occ = Occupancy::from_cells(problem, &self.cells);
        self.unplaced.clear();
        for id in missing {
            if !self.place(problem, &mut occ, id, rng) {
                self.unplaced.push(id);
            }
        }
        self.unplaced.sort_unstable();
        self.fitness = UNSCORED;
    }

    /// Checks the structural invariants: every session is either placed
    /// exactly once (labs on two adjacent same-day cells of their own
    /// section, never in blocked cells) or listed as unplaced.
    pub fn is_valid(&self, problem: &TimetableProblem) -> bool {
        if self.cells.len() != problem.cell_count() {
            return false;
        }
        let mut cells_of: Vec<Vec<usize>> = vec![Vec::new(); problem.session_count()];
        for (cell, content) in self.cells.iter().enumerate() {
            if let Some(id) = *content {
                if id >= problem.session_count() {
                    return false;
                }
                cells_of[id].push(cell);
            }
        }

        (0..problem.session_count()).all(|id| {
            let cells = &cells_of[id];
            if self.unplaced.contains(&id) {
                return cells.is_empty();
            }
            if cells.len() != problem.sessions[id].span() {
                return false;
            }
            let positions: Vec<(usize, Slot)> =
                cells.iter().map(|&c| problem.cell_position(c)).collect();
            let own_section = positions
                .iter()
                .all(|(s, slot)| *s == problem.section_of(id) && problem.grid.is_assignable(*slot));
            let contiguous = positions
                .windows(2)
                .all(|w| w[0].1.day == w[1].1.day && w[0].1.period + 1 == w[1].1.period);
            own_section && contiguous
        })
    }

    /// Cells whose instructor collides with a booking or another section.
    pub fn clash_cells(&self, problem: &TimetableProblem) -> Vec<usize> {
        let occ = Occupancy::from_cells(problem, &self.cells);
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(cell, content)| {
                let id = (*content)?;
                let (_, slot) = problem.cell_position(cell);
                let instructor = problem.instructor_of(id);
                let busy = occ.instructor_busy[busy_index(problem, instructor, slot)];
                (busy > 1 || problem.is_externally_booked(instructor, slot)).then_some(cell)
            })
            .collect()
    }
}

// ======================== Crossover operators ========================

/// Day-wise crossover: each day of the child (all sections) is inherited
/// whole from a parent chosen by a fair coin. Never blends within a day.
///
/// The child is unrepaired and unscored.
pub fn day_crossover<R: Rng>(
    p1: &TimetableChromosome,
    p2: &TimetableChromosome,
    problem: &TimetableProblem,
    rng: &mut R,
) -> TimetableChromosome {
    let mut child = p1.clone();
    for day in 0..problem.grid.day_count() {
        if rng.random_bool(0.5) {
            copy_day(&mut child.cells, &p2.cells, problem, day);
        }
    }
    child.fitness = UNSCORED;
    child
}

/// Single-cut crossover: days before a random cut come from `p1`, the
/// rest from `p2`. With a single-day grid the child copies `p1`.
///
/// The child is unrepaired and unscored.
pub fn single_cut_crossover<R: Rng>(
    p1: &TimetableChromosome,
    p2: &TimetableChromosome,
    problem: &TimetableProblem,
    rng: &mut R,
) -> TimetableChromosome {
    let mut child = p1.clone();
    let days = problem.grid.day_count();
    if days > 1 {
        let cut = rng.random_range(1..days);
        for day in cut..days {
            copy_day(&mut child.cells, &p2.cells, problem, day);
        }
    }
    child.fitness = UNSCORED;
    child
}

fn copy_day(
    dst: &mut [Option<usize>],
    src: &[Option<usize>],
    problem: &TimetableProblem,
    day: usize,
) {
    let ppd = problem.grid.periods_per_day;
    for section in 0..problem.sections.len() {
        let start = problem.cell(section, Slot::new(day, 0));
        dst[start..start + ppd].copy_from_slice(&src[start..start + ppd]);
    }
}

// ======================== Mutation operators ========================

/// Swap mutation: within a random section, exchanges two single-period
/// cells (neither holding a lab) or two whole lab blocks, possibly on
/// different days. Lab pairs are never split.
///
/// Returns whether a swap happened.
pub fn swap_mutation<R: Rng>(
    chromosome: &mut TimetableChromosome,
    problem: &TimetableProblem,
    rng: &mut R,
) -> bool {
    if problem.sections.is_empty() {
        return false;
    }
    let section = rng.random_range(0..problem.sections.len());
    let swapped = if rng.random_bool(0.5) {
        swap_lab_blocks(chromosome, problem, section, None, rng)
    } else {
        false
    };
    swapped || swap_single_cells(chromosome, problem, section, None, rng)
}

/// Conflict-directed swap: the first cell is drawn from cells involved in
/// an instructor clash, so moves concentrate where hard violations are.
/// Falls back to [`swap_mutation`] when there are no clashes.
pub fn conflict_swap_mutation<R: Rng>(
    chromosome: &mut TimetableChromosome,
    problem: &TimetableProblem,
    rng: &mut R,
) -> bool {
    let clashes = chromosome.clash_cells(problem);
    let Some(&cell) = clashes.choose(rng) else {
        return swap_mutation(chromosome, problem, rng);
    };
    let (section, slot) = problem.cell_position(cell);
    let is_lab = chromosome.cells[cell].is_some_and(|id| problem.sessions[id].is_lab());

    if is_lab {
        // Start cell of the lab containing `cell`.
        let start = if slot.period > 0 && chromosome.cells[cell - 1] == chromosome.cells[cell] {
            cell - 1
        } else {
            cell
        };
        swap_lab_blocks(chromosome, problem, section, Some(start), rng)
    } else {
        swap_single_cells(chromosome, problem, section, Some(cell), rng)
    }
}

fn swap_single_cells<R: Rng>(
    chromosome: &mut TimetableChromosome,
    problem: &TimetableProblem,
    section: usize,
    first: Option<usize>,
    rng: &mut R,
) -> bool {
    let candidates: Vec<usize> = problem
        .grid
        .open_slots()
        .map(|slot| problem.cell(section, slot))
        .filter(|&c| !chromosome.cells[c].is_some_and(|id| problem.sessions[id].is_lab()))
        .collect();
    if candidates.len() < 2 {
        return false;
    }

    let Some(a) = first
        .filter(|c| candidates.contains(c))
        .or_else(|| candidates.choose(rng).copied())
    else {
        return false;
    };
    let others: Vec<usize> = candidates.into_iter().filter(|&c| c != a).collect();
    let Some(&b) = others.choose(rng) else {
        return false;
    };
    chromosome.cells.swap(a, b);
    chromosome.fitness = UNSCORED;
    true
}

fn swap_lab_blocks<R: Rng>(
    chromosome: &mut TimetableChromosome,
    problem: &TimetableProblem,
    section: usize,
    first: Option<usize>,
    rng: &mut R,
) -> bool {
    let grid = &problem.grid;
    let is_lab = |c: usize| chromosome.cells[c].is_some_and(|id| problem.sessions[id].is_lab());

    // A block is swappable when it holds one whole lab or no lab content.
    let candidates: Vec<usize> = (0..grid.day_count())
        .flat_map(move |day| grid.open_lab_blocks(day).map(move |b| Slot::new(day, b.start)))
        .map(|slot| problem.cell(section, slot))
        .filter(|&c| {
            let whole_lab = is_lab(c) && chromosome.cells[c] == chromosome.cells[c + 1];
            whole_lab || (!is_lab(c) && !is_lab(c + 1))
        })
        .collect();
    if candidates.len() < 2 {
        return false;
    }

    let Some(a) = first
        .filter(|c| candidates.contains(c))
        .or_else(|| candidates.choose(rng).copied())
    else {
        return false;
    };
    let others: Vec<usize> = candidates.into_iter().filter(|&c| c != a).collect();
    let Some(&b) = others.choose(rng) else {
        return false;
    };
    chromosome.cells.swap(a, b);
    chromosome.cells.swap(a + 1, b + 1);
    chromosome.fitness = UNSCORED;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BookingSnapshot, ExternalBooking, InstitutionalRules, SubjectAssignment, TimeGrid,
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_problem() -> TimetableProblem {
        let assignments = vec![
            SubjectAssignment::theory("Math", "Rao", "A", 4),
            SubjectAssignment::theory("Physics", "Iyer", "A", 3),
            SubjectAssignment::lab("Chem-L", "Das", "A", 4),
            SubjectAssignment::theory("Math", "Rao", "B", 4),
            SubjectAssignment::lab("CS-L", "Das", "B", 2),
        ];
        TimetableProblem::new(
            &assignments,
            &TimeGrid::standard(),
            &BookingSnapshot::new(),
            InstitutionalRules::standard_for(&TimeGrid::standard()),
        )
        .unwrap()
    }

    #[test]
    fn test_random_chromosome_is_complete_and_valid() {
        let p = sample_problem();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..20 {
            let ch = TimetableChromosome::random(&p, &mut rng);
            assert!(ch.is_complete());
            assert!(ch.is_valid(&p));
            assert_eq!(ch.fitness, UNSCORED);
            let occupied = ch.cells.iter().filter(|c| c.is_some()).count();
            assert_eq!(occupied, 4 + 3 + 4 + 4 + 2);
        }
    }

    #[test]
    fn test_random_respects_external_bookings() {
        let assignments = vec![SubjectAssignment::theory("Math", "Rao", "A", 5)];
        let grid = TimeGrid::new(["Mon", "Tue"], 3);
        let bookings = BookingSnapshot::from_bookings(
            (0..3).map(|p| ExternalBooking::new("Rao", Slot::new(0, p))),
        );
        let p = TimetableProblem::new(&assignments, &grid, &bookings, InstitutionalRules::default())
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let ch = TimetableChromosome::random(&p, &mut rng);
        // Only Tuesday is free for Rao: three placed, two unplaced.
        assert_eq!(ch.unplaced.len(), 2);
        for period in 0..3 {
            assert!(ch.session_at(&p, 0, Slot::new(0, period)).is_none());
            assert!(ch.session_at(&p, 0, Slot::new(1, period)).is_some());
        }
        assert!(ch.is_valid(&p));
    }

    #[test]
    fn test_force_placement_ignores_soft_rules() {
        // One day, three theory hours of one subject: the same-subject rule
        // would reject every random attempt after the first.
        let assignments = vec![SubjectAssignment::theory("Math", "Rao", "A", 3)];
        let p = TimetableProblem::new(
            &assignments,
            &TimeGrid::new(["Mon"], 3),
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap()
        .with_max_placement_attempts(5);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ch = TimetableChromosome::random(&p, &mut rng);
        assert!(ch.is_complete());
        assert!(ch.cells.iter().all(Option::is_some));
    }

    #[test]
    fn test_lab_force_placement_uses_any_adjacent_pair() {
        let assignments = vec![SubjectAssignment::lab("Chem-L", "Das", "A", 2)];
        let grid = TimeGrid::new(["Mon"], 3)
            .with_lab_blocks([0])
            .with_blocked(Slot::new(0, 0));
        let p = TimetableProblem::new(
            &assignments,
            &grid,
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let ch = TimetableChromosome::random(&p, &mut rng);
        assert!(ch.is_complete());
        assert_eq!(ch.session_at(&p, 0, Slot::new(0, 1)), Some(0));
        assert_eq!(ch.session_at(&p, 0, Slot::new(0, 2)), Some(0));
    }

    #[test]
    fn test_day_crossover_then_repair_restores_invariants() {
        let p = sample_problem();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..30 {
            let p1 = TimetableChromosome::random(&p, &mut rng);
            let p2 = TimetableChromosome::random(&p, &mut rng);
            let mut child = day_crossover(&p1, &p2, &p, &mut rng);
            child.repair(&p, &mut rng);
            assert!(child.is_valid(&p));
            assert!(child.is_complete());
        }
    }

    #[test]
    fn test_day_crossover_never_blends_a_day() {
        let p = sample_problem();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let p1 = TimetableChromosome::random(&p, &mut rng);
        let p2 = TimetableChromosome::random(&p, &mut rng);
        let child = day_crossover(&p1, &p2, &p, &mut rng);
        for day in 0..p.grid.day_count() {
            let day_cells = |ch: &TimetableChromosome| -> Vec<Option<usize>> {
                (0..p.sections.len())
                    .flat_map(|s| (0..6).map(move |q| (s, q)))
                    .map(|(s, q)| ch.session_at(&p, s, Slot::new(day, q)))
                    .collect()
            };
            let c = day_cells(&child);
            assert!(c == day_cells(&p1) || c == day_cells(&p2));
        }
    }

    #[test]
    fn test_single_cut_crossover_then_repair() {
        let p = sample_problem();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let p1 = TimetableChromosome::random(&p, &mut rng);
        let p2 = TimetableChromosome::random(&p, &mut rng);
        let mut child = single_cut_crossover(&p1, &p2, &p, &mut rng);
        // Monday always comes from p1.
        for q in 0..6 {
            let slot = Slot::new(0, q);
            assert_eq!(child.session_at(&p, 0, slot), p1.session_at(&p, 0, slot));
        }
        child.repair(&p, &mut rng);
        assert!(child.is_valid(&p));
    }

    #[test]
    fn test_repair_drops_duplicates_and_fragments() {
        let p = sample_problem();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut ch = TimetableChromosome::random(&p, &mut rng);

        // Duplicate a theory session into a free cell of its own section.
        let theory = (0..p.session_count()).find(|&id| !p.sessions[id].is_lab()).unwrap();
        let section = p.section_of(theory);
        let free = p
            .grid
            .open_slots()
            .map(|s| p.cell(section, s))
            .find(|&c| ch.cells[c].is_none())
            .unwrap();
        ch.cells[free] = Some(theory);

        // Break a lab: clear its second cell.
        let lab = (0..p.session_count()).find(|&id| p.sessions[id].is_lab()).unwrap();
        let lab_cells: Vec<usize> = (0..ch.cells.len())
            .filter(|&c| ch.cells[c] == Some(lab))
            .collect();
        ch.cells[lab_cells[1]] = None;
        assert!(!ch.is_valid(&p));

        ch.repair(&p, &mut rng);
        assert!(ch.is_valid(&p));
        assert!(ch.is_complete());
        assert_eq!(ch.cells.iter().filter(|c| **c == Some(theory)).count(), 1);
        assert_eq!(ch.cells.iter().filter(|c| **c == Some(lab)).count(), 2);
    }

    #[test]
    fn test_swap_mutation_preserves_structure() {
        let p = sample_problem();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut ch = TimetableChromosome::random(&p, &mut rng);
        let mut swapped = 0;
        for _ in 0..200 {
            if swap_mutation(&mut ch, &p, &mut rng) {
                swapped += 1;
            }
            assert!(ch.is_valid(&p));
        }
        assert!(swapped > 0);
    }

    #[test]
    fn test_conflict_swap_targets_clashes() {
        let assignments = vec![
            SubjectAssignment::theory("Math", "Rao", "A", 1),
            SubjectAssignment::theory("Math", "Rao", "B", 1),
        ];
        let p = TimetableProblem::new(
            &assignments,
            &TimeGrid::new(["Mon"], 3),
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap();
        let mut ch = TimetableChromosome::empty(&p);
        ch.cells[p.cell(0, Slot::new(0, 0))] = Some(0);
        ch.cells[p.cell(1, Slot::new(0, 0))] = Some(1);
        assert_eq!(ch.clash_cells(&p).len(), 2);

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert!(conflict_swap_mutation(&mut ch, &p, &mut rng));
        assert!(ch.clash_cells(&p).is_empty());
        assert!(ch.is_valid(&p));
    }

    #[test]
    fn test_unplaceable_sessions_are_recorded() {
        // Two sessions, one open slot.
        let assignments = vec![
            SubjectAssignment::theory("Math", "Rao", "A", 1),
            SubjectAssignment::theory("Physics", "Rao", "A", 1),
        ];
        let grid = TimeGrid::new(["Mon"], 2).with_blocked(Slot::new(0, 1));
        let p = TimetableProblem::new(
            &assignments,
            &grid,
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let ch = TimetableChromosome::random(&p, &mut rng);
        assert_eq!(ch.unplaced.len(), 1);
        assert!(ch.is_valid(&p));
    }
}
