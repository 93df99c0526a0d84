//! Parent selection and elitism.
//!
//! # Tournament
//!
//! Draws `k` distinct individuals uniformly and returns the fittest. Larger
//! `k` raises selection pressure; `k = 1` is uniform random selection.
//!
//! # Reference
//! Goldberg, D.E. & Deb, K. (1991). "A comparative analysis of selection
//! schemes used in genetic algorithms", *Foundations of Genetic Algorithms*.

use std::cmp::Ordering;

use rand::seq::index::sample;
use rand::Rng;

/// Something with a fitness (higher = better).
pub trait Individual: Clone + Send + Sync {
    /// Current fitness value.
    fn fitness(&self) -> f64;

    /// Stores a computed fitness value.
    fn set_fitness(&mut self, fitness: f64);
}

/// Descending fitness order; NaN sorts last.
pub fn by_fitness_desc<I: Individual>(a: &I, b: &I) -> Ordering {
    b.fitness()
        .partial_cmp(&a.fitness())
        .unwrap_or_else(|| a.fitness().is_nan().cmp(&b.fitness().is_nan()))
}

/// Index of the tournament winner among `tournament_size` distinct draws.
///
/// `tournament_size` is clamped to `[1, population.len()]`.
///
/// # Panics
/// Panics if `population` is empty.
pub fn tournament_select<I: Individual, R: Rng>(
    population: &[I],
    tournament_size: usize,
    rng: &mut R,
) -> usize {
    assert!(!population.is_empty(), "tournament on an empty population");
    let k = tournament_size.clamp(1, population.len());
    sample(rng, population.len(), k)
        .into_iter()
        .reduce(|best, idx| {
            if population[idx].fitness() > population[best].fitness() {
                idx
            } else {
                best
            }
        })
        .unwrap_or(0)
}

/// Number of elites carried over for a population size and fraction.
///
/// At least one when the fraction is positive, never the whole population
/// unless the fraction is one.
pub fn elite_count(population_size: usize, elite_fraction: f64) -> usize {
    if population_size == 0 || elite_fraction <= 0.0 {
        return 0;
    }
    let n = (population_size as f64 * elite_fraction).floor() as usize;
    n.clamp(1, population_size)
}

/// Clones of the `count` fittest individuals, best first.
pub fn elites<I: Individual>(population: &[I], count: usize) -> Vec<I> {
    let mut ranked: Vec<&I> = population.iter().collect();
    ranked.sort_by(|a, b| by_fitness_desc(*a, *b));
    ranked.into_iter().take(count).cloned().collect()
}

/// Index of the fittest individual, if any.
pub fn best_index<I: Individual>(population: &[I]) -> Option<usize> {
    (0..population.len()).min_by(|&a, &b| by_fitness_desc(&population[a], &population[b]))
}
