//! Generational evolution controller.
//!
//! ```text
//! INIT → EVALUATE → CHECK_TERMINATION ─┬─→ DONE
//!                        ↑             │
//!                        └── EVALUATE ← SELECT → VARY → REPAIR
//! ```
//!
//! The controller keeps the best individual ever evaluated, since the
//! generational best can regress after variation. It stops when the
//! best-ever fitness reaches the success threshold or the generation cap
//! is hit, and also on cancellation or time limit. All four are checked at
//! generation boundaries only. It never fails on infeasibility.
//!
//! All randomness comes from one seeded [`ChaCha8Rng`] on the calling
//! thread. Parallel evaluation is pure, so a seed reproduces the same run
//! with or without `parallel`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::chromosome::{TimetableChromosome, UNSCORED};
use super::fitness::DEFAULT_SUCCESS_THRESHOLD;
use super::operators::GeneticOperators;
use super::problem::{TimetableProblem, DEFAULT_MAX_PLACEMENT_ATTEMPTS};
use super::selection::{best_index, elite_count, elites, tournament_select, Individual};
use crate::error::EngineError;
use crate::models::InstitutionalRules;

/// Generations between periodic progress logs.
const LOG_EVERY: usize = 20;

/// Parameters of one evolutionary run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionParams {
    /// Individuals per generation.
    pub population_size: usize,
    /// Generation cap.
    pub max_generations: usize,
    /// Best-ever fitness at which the run stops early.
    pub success_threshold: f64,
    /// Probability an offspring is produced by crossover (else cloned).
    pub crossover_probability: f64,
    /// Probability an offspring receives one mutation move.
    pub mutation_probability: f64,
    /// Fraction of the population carried over unchanged.
    pub elite_fraction: f64,
    /// Individuals per tournament.
    pub tournament_size: usize,
    /// Randomized placement attempts per session before forcing.
    pub max_placement_attempts: usize,
    /// Institutional rules.
    pub rules: InstitutionalRules,
    /// Crossover and mutation strategies.
    pub operators: GeneticOperators,
    /// RNG seed. `None` draws a fresh seed per run.
    pub seed: Option<u64>,
    /// Evaluate each generation on the rayon pool.
    pub parallel: bool,
    /// Wall-clock budget for the generation loop.
    pub time_limit: Option<Duration>,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 200,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            crossover_probability: 0.8,
            mutation_probability: 0.1,
            elite_fraction: 0.3,
            tournament_size: 3,
            max_placement_attempts: DEFAULT_MAX_PLACEMENT_ATTEMPTS,
            rules: InstitutionalRules::default(),
            operators: GeneticOperators::default(),
            seed: None,
            parallel: true,
            time_limit: None,
        }
    }
}

impl EvolutionParams {
    /// Creates default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_max_generations(mut self, generations: usize) -> Self {
        self.max_generations = generations;
        self
    }

    pub fn with_success_threshold(mut self, threshold: f64) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_crossover_probability(mut self, p: f64) -> Self {
        self.crossover_probability = p;
        self
    }

    pub fn with_mutation_probability(mut self, p: f64) -> Self {
        self.mutation_probability = p;
        self
    }

    pub fn with_elite_fraction(mut self, fraction: f64) -> Self {
        self.elite_fraction = fraction;
        self
    }

    pub fn with_tournament_size(mut self, size: usize) -> Self {
        self.tournament_size = size;
        self
    }

    pub fn with_max_placement_attempts(mut self, attempts: usize) -> Self {
        self.max_placement_attempts = attempts;
        self
    }

    pub fn with_rules(mut self, rules: InstitutionalRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    /// Fixes the RNG seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Checks ranges.
    ///
    /// # Errors
    /// [`EngineError::InvalidParams`] naming the first offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fail = |msg: String| Err(EngineError::InvalidParams(msg));
        let unit = |p: f64| (0.0..=1.0).contains(&p);

        if self.population_size == 0 {
            return fail("population_size must be at least 1".into());
        }
        if self.tournament_size == 0 {
            return fail("tournament_size must be at least 1".into());
        }
        if self.max_placement_attempts == 0 {
            return fail("max_placement_attempts must be at least 1".into());
        }
        if !unit(self.crossover_probability) {
            return fail(format!(
                "crossover_probability must be in [0, 1], got {}",
                self.crossover_probability
            ));
        }
        if !unit(self.mutation_probability) {
            return fail(format!(
                "mutation_probability must be in [0, 1], got {}",
                self.mutation_probability
            ));
        }
        if !unit(self.elite_fraction) {
            return fail(format!(
                "elite_fraction must be in [0, 1], got {}",
                self.elite_fraction
            ));
        }
        if !self.success_threshold.is_finite() {
            return fail("success_threshold must be finite".into());
        }
        Ok(())
    }

    /// The configured seed, or a fresh one from the thread RNG.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

/// Cooperative cancellation flag shared with a running controller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the run to stop at the next generation boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Why the generation loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Best-ever fitness reached the success threshold.
    ThresholdReached,
    /// The generation cap was hit.
    GenerationCap,
    /// The cancellation token was set.
    Cancelled,
    /// The time limit elapsed.
    TimedOut,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ThresholdReached => "threshold reached",
            Self::GenerationCap => "generation cap",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed out",
        };
        f.write_str(s)
    }
}

/// Fitness summary of one evaluated generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub best: f64,
    pub mean: f64,
    pub worst: f64,
    pub best_ever: f64,
}

impl GenerationStats {
    fn collect(generation: usize, population: &[TimetableChromosome], best_ever: f64) -> Self {
        let n = population.len().max(1) as f64;
        let (best, worst, sum) = population.iter().fold(
            (f64::NEG_INFINITY, f64::INFINITY, 0.0),
            |(best, worst, sum), ch| {
                (best.max(ch.fitness), worst.min(ch.fitness), sum + ch.fitness)
            },
        );
        Self {
            generation,
            best,
            mean: sum / n,
            worst,
            best_ever,
        }
    }
}

/// Output of one evolutionary run.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    /// Best individual ever evaluated.
    pub best: TimetableChromosome,
    /// Its fitness.
    pub best_fitness: f64,
    /// Generations completed after the initial population.
    pub generations: usize,
    pub termination: TerminationReason,
    /// One entry per evaluated generation, starting with the initial one.
    pub history: Vec<GenerationStats>,
    /// Seed the run used.
    pub seed: u64,
    pub elapsed: Duration,
}

/// Drives the generation loop for one problem.
pub struct EvolutionController<'a> {
    problem: &'a TimetableProblem,
    params: &'a EvolutionParams,
    cancel: Option<CancellationToken>,
}

impl<'a> EvolutionController<'a> {
    pub fn new(problem: &'a TimetableProblem, params: &'a EvolutionParams) -> Self {
        Self {
            problem,
            params,
            cancel: None,
        }
    }

    /// Attaches a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Runs evolution with the given seed.
    ///
    /// # Errors
    /// [`EngineError::InvalidParams`] if the parameters are out of range.
    #[tracing::instrument(level = "debug", name = "evolve", skip(self))]
    pub fn run(&self, seed: u64) -> Result<EvolutionResult, EngineError> {
        self.params.validate()?;
        let params = self.params;
        let problem = self.problem;
        let started = Instant::now();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        tracing::info!(
            sessions = problem.session_count(),
            sections = problem.sections.len(),
            population = params.population_size,
            max_generations = params.max_generations,
            seed,
            "starting evolution"
        );

        let mut population: Vec<TimetableChromosome> = (0..params.population_size)
            .map(|_| TimetableChromosome::random(problem, &mut rng))
            .collect();
        self.evaluate(&mut population);

        let mut best = best_index(&population)
            .map(|i| population[i].clone())
            .unwrap_or_else(|| TimetableChromosome::empty(problem));
        let mut history = vec![GenerationStats::collect(0, &population, best.fitness)];
        let n_elites = elite_count(params.population_size, params.elite_fraction);
        let mut generation = 0;

        let termination = loop {
            if let Some(reason) = self.check_termination(best.fitness, generation, started) {
                break reason;
            }

            let mut next = elites(&population, n_elites);
            while next.len() < params.population_size {
                let a = tournament_select(&population, params.tournament_size, &mut rng);
                let b = tournament_select(&population, params.tournament_size, &mut rng);
                next.push(params.operators.offspring(
                    &population[a],
                    &population[b],
                    problem,
                    params.crossover_probability,
                    params.mutation_probability,
                    &mut rng,
                ));
            }
            population = next;
            self.evaluate(&mut population);
            generation += 1;

            if let Some(i) = best_index(&population) {
                if population[i].fitness > best.fitness {
                    best = population[i].clone();
                    tracing::debug!(generation, best = best.fitness, "new best-ever");
                }
            }
            let stats = GenerationStats::collect(generation, &population, best.fitness);
            if generation % LOG_EVERY == 0 {
                tracing::debug!(
                    generation,
                    best = stats.best,
                    mean = stats.mean,
                    best_ever = stats.best_ever,
                    "generation"
                );
            }
            history.push(stats);
        };

        let elapsed = started.elapsed();
        tracing::info!(
            generations = generation,
            best = best.fitness,
            %termination,
            elapsed_ms = elapsed.as_millis() as u64,
            "evolution finished"
        );

        Ok(EvolutionResult {
            best_fitness: best.fitness,
            best,
            generations: generation,
            termination,
            history,
            seed,
            elapsed,
        })
    }

    fn check_termination(
        &self,
        best: f64,
        generation: usize,
        started: Instant,
    ) -> Option<TerminationReason> {
        if best >= self.params.success_threshold {
            return Some(TerminationReason::ThresholdReached);
        }
        if generation >= self.params.max_generations {
            return Some(TerminationReason::GenerationCap);
        }
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(TerminationReason::Cancelled);
        }
        if self.params.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
            return Some(TerminationReason::TimedOut);
        }
        None
    }

    /// Scores every unscored individual; elites keep their fitness.
    fn evaluate(&self, population: &mut [TimetableChromosome]) {
        let problem = self.problem;
        let score = |ch: &mut TimetableChromosome| {
            if ch.fitness == UNSCORED {
                ch.set_fitness(problem.evaluate(ch));
            }
        };
        if self.params.parallel {
            population.par_iter_mut().for_each(score);
        } else {
            population.iter_mut().for_each(score);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingSnapshot, SubjectAssignment, TimeGrid};

    fn sample_problem() -> TimetableProblem {
        let assignments = vec![
            SubjectAssignment::theory("Math", "Rao", "A", 4),
            SubjectAssignment::theory("Physics", "Iyer", "A", 3),
            SubjectAssignment::lab("Chem-L", "Das", "A", 2),
            SubjectAssignment::theory("Math", "Rao", "B", 4),
            SubjectAssignment::theory("English", "Nair", "B", 3),
        ];
        TimetableProblem::new(
            &assignments,
            &TimeGrid::standard(),
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap()
    }

    fn small_params() -> EvolutionParams {
        EvolutionParams::default()
            .with_population_size(12)
            .with_max_generations(15)
    }

    #[test]
    fn test_default_params_are_valid() {
        let params = EvolutionParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.population_size, 50);
        assert_eq!(params.success_threshold, 950.0);
        assert_eq!(params.elite_fraction, 0.3);
    }

    #[test]
    fn test_invalid_params() {
        let cases = [
            EvolutionParams::default().with_population_size(0),
            EvolutionParams::default().with_tournament_size(0),
            EvolutionParams::default().with_crossover_probability(1.5),
            EvolutionParams::default().with_mutation_probability(-0.1),
            EvolutionParams::default().with_elite_fraction(2.0),
            EvolutionParams::default().with_max_placement_attempts(0),
            EvolutionParams::default().with_success_threshold(f64::NAN),
        ];
        for params in cases {
            assert!(matches!(params.validate(), Err(EngineError::InvalidParams(_))));
        }
    }

    #[test]
    fn test_params_from_partial_json() {
        let params: EvolutionParams =
            serde_json::from_str(r#"{"population_size": 20, "seed": 7}"#).unwrap();
        assert_eq!(params.population_size, 20);
        assert_eq!(params.seed, Some(7));
        assert_eq!(params.max_generations, 200);
    }

    #[test]
    fn test_run_reaches_threshold_on_easy_problem() {
        let problem = sample_problem();
        let params = small_params().with_max_generations(100);
        let result = EvolutionController::new(&problem, &params).run(42).unwrap();
        assert_eq!(result.termination, TerminationReason::ThresholdReached);
        assert!(result.best_fitness >= 950.0);
        assert!(problem.breakdown(&result.best).is_feasible());
    }

    #[test]
    fn test_threshold_waits_for_soft_clean_schedule() {
        // Three subjects × five hours fit one per day, so a repeat-free week
        // exists. Single placement attempts force repeats into the initial
        // population; the run must not stop on those.
        let assignments = vec![
            SubjectAssignment::theory("Math", "Rao", "A", 5),
            SubjectAssignment::theory("Physics", "Iyer", "A", 5),
            SubjectAssignment::theory("English", "Nair", "A", 5),
        ];
        let problem = TimetableProblem::new(
            &assignments,
            &TimeGrid::standard(),
            &BookingSnapshot::new(),
            InstitutionalRules::default(),
        )
        .unwrap()
        .with_max_placement_attempts(1);
        let params = EvolutionParams::default().with_population_size(20);

        for seed in 0..5 {
            let result = EvolutionController::new(&problem, &params).run(seed).unwrap();
            let b = problem.breakdown(&result.best);
            assert!(b.is_feasible());
            if result.termination == TerminationReason::ThresholdReached {
                assert_eq!(b.preference_violations(), 0, "seed {seed}: {b:?}");
            }
            if b.preference_violations() > 0 {
                assert!(result.best_fitness < params.success_threshold);
                assert_eq!(result.termination, TerminationReason::GenerationCap);
            }
        }
    }

    #[test]
    fn test_best_ever_is_monotone() {
        let problem = sample_problem();
        let params = small_params().with_success_threshold(1_000.0);
        let result = EvolutionController::new(&problem, &params).run(3).unwrap();
        assert_eq!(result.termination, TerminationReason::GenerationCap);
        assert_eq!(result.generations, 15);
        assert_eq!(result.history.len(), 16);
        for w in result.history.windows(2) {
            assert!(w[1].best_ever >= w[0].best_ever);
        }
        assert_eq!(result.history.last().unwrap().best_ever, result.best_fitness);
    }

    #[test]
    fn test_same_seed_same_result_serial_and_parallel() {
        let problem = sample_problem();
        let serial = small_params().with_parallel(false).with_success_threshold(1_000.0);
        let parallel = serial.clone().with_parallel(true);
        let a = EvolutionController::new(&problem, &serial).run(11).unwrap();
        let b = EvolutionController::new(&problem, &parallel).run(11).unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.best_fitness, b.best_fitness);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_zero_generations_returns_initial_best() {
        let problem = sample_problem();
        let params = small_params()
            .with_max_generations(0)
            .with_success_threshold(1_000.0);
        let result = EvolutionController::new(&problem, &params).run(5).unwrap();
        assert_eq!(result.generations, 0);
        assert_eq!(result.termination, TerminationReason::GenerationCap);
        assert!(result.best_fitness > 0.0);
    }

    #[test]
    fn test_cancelled_before_first_generation() {
        let problem = sample_problem();
        let params = small_params().with_success_threshold(1_000.0);
        let token = CancellationToken::new();
        token.cancel();
        let result = EvolutionController::new(&problem, &params)
            .with_cancellation(token)
            .run(1)
            .unwrap();
        assert_eq!(result.termination, TerminationReason::Cancelled);
        assert_eq!(result.generations, 0);
        assert!(result.best.is_valid(&problem));
    }

    #[test]
    fn test_time_limit() {
        let problem = sample_problem();
        let params = small_params()
            .with_max_generations(1_000_000)
            .with_success_threshold(1_000.0)
            .with_time_limit(Duration::ZERO);
        let result = EvolutionController::new(&problem, &params).run(1).unwrap();
        assert_eq!(result.termination, TerminationReason::TimedOut);
    }

    #[test]
    fn test_elites_are_structurally_valid() {
        let problem = sample_problem();
        let params = small_params().with_success_threshold(1_000.0);
        let result = EvolutionController::new(&problem, &params).run(8).unwrap();
        assert!(result.best.is_valid(&problem));
        assert!(result.best.is_complete());
    }
}
