//! Batch distribution for parallel simulation.
//!
//! Splits the requested runs into batches, each with its own random stream
//! derived from the base seed, and merges the batch histograms.

use rayon::prelude::*;
use tracing::debug;

use crate::aggregate::histogram::Histogram;
use crate::combat::{DiceRng, Target, WeaponProfile};
use crate::parallel::pool::WorkerPool;
use crate::processors::SimulationProcessor;

/// Runs per batch when splitting a simulation request.
pub const DEFAULT_BATCH_SIZE: usize = 250;

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
///
/// # Example
/// ```
/// # use statshammer::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + if i < remainder { 1 } else { 0 };
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// One full-unit run: every profile resolved once, damage summed.
pub fn simulate_unit(profiles: &[WeaponProfile], target: &Target, rng: &mut DiceRng) -> u32 {
    profiles
        .iter()
        .map(|profile| SimulationProcessor::new(profile, target).simulate(rng))
        .sum()
}

/// Runs `runs` full-unit simulations on `pool` and returns the merged histogram.
/// The result depends only on `seed` and `runs`, not on the worker count.
pub fn run_simulation_batches(
    profiles: &[WeaponProfile],
    target: &Target,
    runs: usize,
    seed: u64,
    pool: &WorkerPool,
) -> Histogram {
    let num_batches = runs.div_ceil(DEFAULT_BATCH_SIZE);
    let ranges = batch_ranges(runs, num_batches);
    debug!(runs, batches = ranges.len(), seed, "running simulation batches");

    pool.install(|| {
        ranges
            .par_iter()
            .enumerate()
            .map(|(index, &(start, end))| {
                let mut rng = DiceRng::for_batch(seed, index);
                (start..end)
                    .map(|_| simulate_unit(profiles, target, &mut rng))
                    .collect::<Histogram>()
            })
            .reduce(Histogram::new, |mut merged, batch| {
                merged.merge(batch);
                merged
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_ranges_even_split() {
        let r = batch_ranges(100, 4);
        assert_eq!(r, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
    }

    #[test]
    fn batch_ranges_with_remainder() {
        let r = batch_ranges(10, 3);
        assert_eq!(r, vec![(0, 4), (4, 7), (7, 10)]);
    }

    #[test]
    fn batch_ranges_more_batches_than_items() {
        let r = batch_ranges(3, 10);
        assert_eq!(r.len(), 3);
        assert_eq!(r, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn batch_ranges_empty() {
        assert!(batch_ranges(0, 5).is_empty());
        assert!(batch_ranges(10, 0).is_empty());
    }

    #[test]
    fn batches_are_independent_of_worker_count() {
        let profiles = vec![WeaponProfile::new(5, 2, 4, 4, 0, 1)];
        let target = Target::new(4, vec![]);
        let single = run_simulation_batches(&profiles, &target, 1_000, 7, &WorkerPool::with_workers(1));
        let many = run_simulation_batches(&profiles, &target, 1_000, 7, &WorkerPool::with_workers(4));
        assert_eq!(single, many);
        assert_eq!(single.runs(), 1_000);
    }

    #[test]
    fn zero_runs_give_empty_histogram() {
        let profiles = vec![WeaponProfile::new(5, 2, 4, 4, 0, 1)];
        let histogram =
            run_simulation_batches(&profiles, &Target::no_save(), 0, 1, &WorkerPool::default());
        assert_eq!(histogram.runs(), 0);
    }
}
