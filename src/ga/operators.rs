//! Configurable genetic operators for timetabling.
//!
//! Provides runtime-selectable crossover and mutation strategies
//! via [`GeneticOperators`].
//!
//! # Usage
//!
//! ```
//! use u_timetable::ga::operators::{GeneticOperators, CrossoverType, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.crossover_type, CrossoverType::DayWise);
//! assert_eq!(ops.mutation_type, MutationType::Swap);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chromosome::{
    conflict_swap_mutation, day_crossover, single_cut_crossover, swap_mutation,
    TimetableChromosome,
};
use super::problem::TimetableProblem;

/// Crossover strategy for timetable chromosomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossoverType {
    /// Each day inherited whole from a randomly chosen parent.
    DayWise,
    /// Days before a random cut from parent 1, the rest from parent 2.
    SingleCut,
}

/// Mutation strategy for timetable chromosomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationType {
    /// Swap two equal-span cells chosen uniformly.
    Swap,
    /// Swap starting from a cell involved in an instructor clash.
    ConflictSwap,
}

/// Runtime-selectable genetic operators for the timetabling GA.
///
/// # Example
///
/// ```
/// use u_timetable::ga::operators::{GeneticOperators, CrossoverType, MutationType};
///
/// let ops = GeneticOperators {
///     crossover_type: CrossoverType::SingleCut,
///     mutation_type: MutationType::ConflictSwap,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticOperators {
    /// Crossover strategy.
    pub crossover_type: CrossoverType,
    /// Mutation strategy.
    pub mutation_type: MutationType,
}

impl Default for GeneticOperators {
    fn default() -> Self {
        Self {
            crossover_type: CrossoverType::DayWise,
            mutation_type: MutationType::Swap,
        }
    }
}

impl GeneticOperators {
    /// Performs crossover using the configured strategy.
    ///
    /// The child is unrepaired; see [`TimetableChromosome::repair`].
    pub fn crossover<R: Rng>(
        &self,
        p1: &TimetableChromosome,
        p2: &TimetableChromosome,
        problem: &TimetableProblem,
        rng: &mut R,
    ) -> TimetableChromosome {
        match self.crossover_type {
            CrossoverType::DayWise => day_crossover(p1, p2, problem, rng),
            CrossoverType::SingleCut => single_cut_crossover(p1, p2, problem, rng),
        }
    }

    /// Performs one mutation move using the configured strategy.
    pub fn mutate<R: Rng>(
        &self,
        chromosome: &mut TimetableChromosome,
        problem: &TimetableProblem,
        rng: &mut R,
    ) -> bool {
        match self.mutation_type {
            MutationType::Swap => swap_mutation(chromosome, problem, rng),
            MutationType::ConflictSwap => conflict_swap_mutation(chromosome, problem, rng),
        }
    }

    /// Produces one offspring: crossover with probability `p_c` (otherwise
    /// a copy of `p1`), mutation with probability `p_m`, then repair.
    pub fn offspring<R: Rng>(
        &self,
        p1: &TimetableChromosome,
        p2: &TimetableChromosome,
        problem: &TimetableProblem,
        crossover_probability: f64,
        mutation_probability: f64,
        rng: &mut R,
    ) -> TimetableChromosome {
        let mut child = if rng.random_bool(crossover_probability) {
            self.crossover(p1, p2, problem, rng)
        } else {
            p1.clone()
        };
        if rng.random_bool(mutation_probability) {
            self.mutate(&mut child, problem, rng);
        }
        child.repair(problem, rng);
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingSnapshot, InstitutionalRules, SubjectAssignment, TimeGrid};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_problem() -> TimetableProblem {
        let assignments = vec![
            SubjectAssignment::theory("Math", "Rao", "A", 4),
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

    #[test]
    fn test_default_operators() {
        let ops = GeneticOperators::default();
        assert_eq!(ops.crossover_type, CrossoverType::DayWise);
        assert_eq!(ops.mutation_type, MutationType::Swap);
    }

    #[test]
    fn test_crossover_day_wise() {
        let p = sample_problem();
        let ops = GeneticOperators::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let p1 = TimetableChromosome::random(&p, &mut rng);
        let p2 = TimetableChromosome::random(&p, &mut rng);
        let child = ops.crossover(&p1, &p2, &p, &mut rng);
        assert_eq!(child.cells.len(), p.cell_count());
    }

    #[test]
    fn test_crossover_single_cut() {
        let p = sample_problem();
        let ops = GeneticOperators {
            crossover_type: CrossoverType::SingleCut,
            mutation_type: MutationType::Swap,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let p1 = TimetableChromosome::random(&p, &mut rng);
        let p2 = TimetableChromosome::random(&p, &mut rng);
        let child = ops.crossover(&p1, &p2, &p, &mut rng);
        assert_eq!(child.cells.len(), p.cell_count());
    }

    #[test]
    fn test_offspring_always_repaired() {
        let p = sample_problem();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for ops in [
            GeneticOperators::default(),
            GeneticOperators {
                crossover_type: CrossoverType::SingleCut,
                mutation_type: MutationType::ConflictSwap,
            },
        ] {
            for _ in 0..20 {
                let p1 = TimetableChromosome::random(&p, &mut rng);
                let p2 = TimetableChromosome::random(&p, &mut rng);
                let child = ops.offspring(&p1, &p2, &p, 0.9, 0.5, &mut rng);
                assert!(child.is_valid(&p));
                assert!(child.is_complete());
            }
        }
    }

    #[test]
    fn test_mutation_conflict_swap() {
        let p = sample_problem();
        let ops = GeneticOperators {
            crossover_type: CrossoverType::DayWise,
            mutation_type: MutationType::ConflictSwap,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut ch = TimetableChromosome::random(&p, &mut rng);
        for _ in 0..50 {
            ops.mutate(&mut ch, &p, &mut rng);
        }
        assert!(ch.is_valid(&p));
    }

    #[test]
    fn test_operators_from_json() {
        let ops: GeneticOperators =
            serde_json::from_str(r#"{"mutation_type": "ConflictSwap"}"#).unwrap();
        assert_eq!(ops.crossover_type, CrossoverType::DayWise);
        assert_eq!(ops.mutation_type, MutationType::ConflictSwap);
    }
}
