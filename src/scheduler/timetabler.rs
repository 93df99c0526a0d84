//! Timetable scheduling entry points.
//!
//! # Flow
//!
//! 1. Validate parameters and build a [`TimetableProblem`] (fails fast on
//!    malformed assignments or grid).
//! 2. Run the evolution controller with a resolved seed.
//! 3. Decode the best-ever chromosome and validate the timetable
//!    independently of the engine's fitness.
//!
//! Infeasibility is never an error: it is reported through
//! [`ScheduleOutcome::feasible`] and its violations. Sessions that could not
//! be placed are reported in [`ScheduleOutcome::placement_error`] next to
//! the partial timetable.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::ga::{
    CancellationToken, EvolutionController, EvolutionParams, GenerationStats, TerminationReason,
    TimetableChromosome, TimetableProblem,
};
use crate::models::{
    BookingSnapshot, ClashOracle, ExternalBooking, SubjectAssignment, TimeGrid, Timetable,
    Violation,
};
use crate::validation::validate_timetable;

/// Multiplier decorrelating retry seeds (golden-ratio increment).
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Input container for scheduling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Assignments to place.
    pub assignments: Vec<SubjectAssignment>,
    /// Weekly time grid.
    #[serde(default)]
    pub grid: TimeGrid,
    /// Commitments already made outside this run.
    #[serde(default)]
    pub bookings: Vec<ExternalBooking>,
}

impl ScheduleRequest {
    /// Creates a request on the given grid with no external bookings.
    pub fn new(assignments: Vec<SubjectAssignment>, grid: TimeGrid) -> Self {
        Self {
            assignments,
            grid,
            bookings: Vec::new(),
        }
    }

    /// Adds external bookings.
    pub fn with_bookings(mut self, bookings: impl IntoIterator<Item = ExternalBooking>) -> Self {
        self.bookings.extend(bookings);
        self
    }

    /// Snapshot of the request's bookings for the clash oracle.
    pub fn snapshot(&self) -> BookingSnapshot {
        BookingSnapshot::from_bookings(self.bookings.iter().cloned())
    }
}

/// Result of one scheduling call.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    /// Decoded best-ever timetable (possibly partial).
    pub timetable: Timetable,
    /// Best-ever chromosome.
    pub chromosome: TimetableChromosome,
    /// Its fitness.
    pub fitness: f64,
    /// No hard violations and every session placed.
    pub feasible: bool,
    /// Violations found by independent validation, hard first.
    pub violations: Vec<Violation>,
    /// Set when some sessions could not be placed.
    pub placement_error: Option<EngineError>,
    /// Generations run.
    pub generations: usize,
    pub termination: TerminationReason,
    /// Seed of the reported run.
    pub seed: u64,
    /// Runs performed (more than one only with retries).
    pub attempts: usize,
    /// Per-generation fitness history of the reported run.
    pub history: Vec<GenerationStats>,
}

impl ScheduleOutcome {
    /// Hard violations only.
    pub fn hard_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_hard())
    }

    /// Whether `self` is a better result than `other`: feasible first,
    /// then higher fitness.
    fn better_than(&self, other: &Self) -> bool {
        (self.feasible, self.fitness) > (other.feasible, other.fitness)
    }
}

/// Schedules assignments on a grid around external bookings.
///
/// # Errors
/// `InvalidAssignment`, `InvalidGrid` or `InvalidParams` on malformed input.
/// Search outcomes (including infeasibility) are never errors.
///
/// # Example
///
/// ```
/// use u_timetable::{schedule, EvolutionParams, SubjectAssignment, TimeGrid};
///
/// let assignments = vec![SubjectAssignment::theory("Math", "Rao", "A", 3)];
/// let params = EvolutionParams::default().with_seed(7);
/// let outcome = schedule(&assignments, &TimeGrid::standard(), &[], &params).unwrap();
/// assert!(outcome.feasible);
/// assert_eq!(outcome.timetable.entry_count(), 3);
/// ```
pub fn schedule(
    assignments: &[SubjectAssignment],
    grid: &TimeGrid,
    bookings: &[ExternalBooking],
    params: &EvolutionParams,
) -> Result<ScheduleOutcome, EngineError> {
    let snapshot = BookingSnapshot::from_bookings(bookings.iter().cloned());
    Timetabler::new(params.clone()).schedule(assignments, grid, &snapshot)
}

/// Reusable scheduler holding parameters and an optional cancellation token.
///
/// Holds no state between calls; every call builds its own problem from
/// the inputs it receives.
#[derive(Debug, Clone, Default)]
pub struct Timetabler {
    params: EvolutionParams,
    cancel: Option<CancellationToken>,
}

impl Timetabler {
    pub fn new(params: EvolutionParams) -> Self {
        Self {
            params,
            cancel: None,
        }
    }

    /// Attaches a cancellation token checked at generation boundaries.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn params(&self) -> &EvolutionParams {
        &self.params
    }

    /// Schedules against any clash oracle.
    pub fn schedule(
        &self,
        assignments: &[SubjectAssignment],
        grid: &TimeGrid,
        oracle: &dyn ClashOracle,
    ) -> Result<ScheduleOutcome, EngineError> {
        let problem = self.build_problem(assignments, grid, oracle)?;
        self.run(&problem, oracle, self.params.resolve_seed())
    }

    /// Schedules a request.
    pub fn schedule_request(
        &self,
        request: &ScheduleRequest,
    ) -> Result<ScheduleOutcome, EngineError> {
        self.schedule(&request.assignments, &request.grid, &request.snapshot())
    }

    /// Reruns with derived seeds until a feasible timetable is found or
    /// `attempts` runs are spent, returning the best outcome.
    ///
    /// Attempt 0 uses the configured (or drawn) seed unchanged.
    pub fn schedule_with_retries(
        &self,
        request: &ScheduleRequest,
        attempts: usize,
    ) -> Result<ScheduleOutcome, EngineError> {
        let oracle = request.snapshot();
        let problem = self.build_problem(&request.assignments, &request.grid, &oracle)?;
        let base = self.params.resolve_seed();
        let attempts = attempts.max(1);

        let mut best: Option<ScheduleOutcome> = None;
        for attempt in 0..attempts {
            if attempt > 0 && self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                break;
            }
            let seed = base ^ (attempt as u64).wrapping_mul(SEED_STRIDE);
            let outcome = self.run(&problem, &oracle, seed)?;
            tracing::info!(
                attempt = attempt + 1,
                attempts,
                seed,
                fitness = outcome.fitness,
                feasible = outcome.feasible,
                "scheduling attempt finished"
            );

            let done = outcome.feasible;
            best = match best {
                Some(prev) if !outcome.better_than(&prev) => Some(prev),
                _ => Some(outcome),
            };
            if let Some(b) = best.as_mut() {
                b.attempts = attempt + 1;
            }
            if done {
                break;
            }
        }

        best.ok_or_else(|| EngineError::InvalidParams("no scheduling attempt was run".into()))
    }

    fn build_problem(
        &self,
        assignments: &[SubjectAssignment],
        grid: &TimeGrid,
        oracle: &dyn ClashOracle,
    ) -> Result<TimetableProblem, EngineError> {
        self.params.validate()?;
        Ok(
            TimetableProblem::new(assignments, grid, oracle, self.params.rules.clone())?
                .with_max_placement_attempts(self.params.max_placement_attempts),
        )
    }

    fn run(
        &self,
        problem: &TimetableProblem,
        oracle: &dyn ClashOracle,
        seed: u64,
    ) -> Result<ScheduleOutcome, EngineError> {
        let mut controller = EvolutionController::new(problem, &self.params);
        if let Some(token) = &self.cancel {
            controller = controller.with_cancellation(token.clone());
        }
        let result = controller.run(seed)?;

        let timetable = problem.decode(&result.best);
        let report = validate_timetable(
            &timetable,
            &problem.assignments,
            &problem.grid,
            oracle,
            &problem.rules,
        );

        let complete = result.best.is_complete() && problem.fits_capacity();
        let placement_error = (!complete).then(|| EngineError::PlacementExhausted {
            unplaced: problem.unplaced_labels(&result.best),
        });
        if let Some(err) = &placement_error {
            tracing::warn!(%err, "placement exhausted");
        }

        let feasible = report.is_feasible() && complete;
        if !feasible {
            tracing::warn!(
                fitness = result.best_fitness,
                hard_violations = report.hard_count(),
                "no feasible timetable found"
            );
        }

        Ok(ScheduleOutcome {
            timetable,
            fitness: result.best_fitness,
            chromosome: result.best,
            feasible,
            violations: report.violations,
            placement_error,
            generations: result.generations,
            termination: result.termination,
            seed,
            attempts: 1,
            history: result.history,
        })
    }
}
