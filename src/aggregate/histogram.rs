//! Damage frequency accumulator and the bucketed result built from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One histogram entry: damage value, times it was observed, and share of runs in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub damage: u32,
    pub count: u64,
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Theoretical ceiling, not the largest observed value.
    pub max: u32,
    pub mean: f64,
    pub variance: f64,
    pub standard_deviation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub buckets: Vec<Bucket>,
    pub metrics: Metrics,
}

impl SimulationResult {
    pub fn bucket(&self, damage: u32) -> Option<&Bucket> {
        self.buckets.iter().find(|bucket| bucket.damage == damage)
    }

    pub fn runs(&self) -> u64 {
        self.buckets.iter().map(|bucket| bucket.count).sum()
    }
}

/// Counts of simulated damage totals. Batches are merged before metrics are read,
/// so the result does not depend on how runs were split across workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    counts: BTreeMap<u32, u64>,
    runs: u64,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, damage: u32) {
        *self.counts.entry(damage).or_insert(0) += 1;
        self.runs += 1;
    }

    pub fn merge(&mut self, other: Histogram) {
        for (damage, count) in other.counts {
            *self.counts.entry(damage).or_insert(0) += count;
        }
        self.runs += other.runs;
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn count(&self, damage: u32) -> u64 {
        self.counts.get(&damage).copied().unwrap_or(0)
    }

    pub fn observed_max(&self) -> Option<u32> {
        self.counts.keys().next_back().copied()
    }

    pub fn mean(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        let total: f64 = self
            .counts
            .iter()
            .map(|(&damage, &count)| damage as f64 * count as f64)
            .sum();
        total / self.runs as f64
    }

    /// Population variance over the recorded runs.
    pub fn variance(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let squares: f64 = self
            .counts
            .iter()
            .map(|(&damage, &count)| (damage as f64 - mean).powi(2) * count as f64)
            .sum();
        squares / self.runs as f64
    }

    /// Buckets for every damage value from 0 through `max + 1`, plus summary metrics.
    pub fn into_result(self, max: u32) -> SimulationResult {
        let variance = self.variance();
        let metrics = Metrics {
            max,
            mean: round2(self.mean()),
            variance: round2(variance),
            standard_deviation: round2(variance.sqrt()),
        };

        let upper = max.max(self.observed_max().unwrap_or(0)) + 1;
        let buckets = (0..=upper)
            .map(|damage| {
                let count = self.count(damage);
                let probability = if self.runs == 0 {
                    0.0
                } else {
                    round2(count as f64 * 100.0 / self.runs as f64)
                };
                Bucket {
                    damage,
                    count,
                    probability,
                }
            })
            .collect();

        SimulationResult { buckets, metrics }
    }
}

impl FromIterator<u32> for Histogram {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut histogram = Histogram::new();
        for damage in iter {
            histogram.record(damage);
        }
        histogram
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
