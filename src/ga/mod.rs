//! GA-based timetable optimization.
//!
//! # Encoding
//!
//! One cell per (section, slot), each holding at most one session id; labs
//! occupy two adjacent same-day cells. See [`chromosome`] for the
//! initializer, variation operators and repair.
//!
//! # Submodules
//!
//! - [`decompose`]: assignments → atomic sessions
//! - [`problem`]: interned problem definition and decoding
//! - [`fitness`]: weighted hard/soft evaluation
//! - [`selection`]: tournament selection and elitism
//! - [`operators`]: runtime-selectable crossover and mutation strategies
//! - [`engine`]: generational controller
//!
//! # Reference
//! - Colorni, Dorigo & Maniezzo (1992), "A genetic algorithm to solve the
//!   timetable problem"
//! - Burke, Elliman & Weare (1994), "A genetic algorithm based university
//!   timetabling system"

pub mod chromosome;
pub mod decompose;
pub mod engine;
pub mod fitness;
pub mod operators;
pub mod problem;
pub mod selection;

pub use chromosome::{
    conflict_swap_mutation, day_crossover, single_cut_crossover, swap_mutation,
    TimetableChromosome, UNSCORED,
};
pub use decompose::{decompose, total_hours, Decomposition, Overflow};
pub use engine::{
    CancellationToken, EvolutionController, EvolutionParams, EvolutionResult, GenerationStats,
    TerminationReason,
};
pub use fitness::{FitnessBreakdown, FitnessEvaluator, DEFAULT_SUCCESS_THRESHOLD};
pub use operators::{CrossoverType, GeneticOperators, MutationType};
pub use problem::TimetableProblem;
pub use selection::{elite_count, tournament_select, Individual};
