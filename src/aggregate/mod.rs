//! Unit-level aggregation: sums every weapon profile of a unit and turns
//! repeated simulations into a damage histogram with summary metrics.

pub mod export_csv;
pub mod histogram;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combat::{Characteristic, DiceRng, Modifier, Target, TargetModifier, WeaponProfile};
use crate::parallel::{run_simulation_batches, simulate_unit, WorkerPool};
use crate::processors::{AverageDamageProcessor, MaxDamageProcessor};

pub use histogram::{Bucket, Histogram, Metrics, SimulationResult};

pub const DEFAULT_SIMULATIONS: usize = 1000;

/// Largest theoretical maximum a unit may have before its histogram is built.
pub const MAX_HISTOGRAM_DAMAGE: u32 = 100_000;

/// Saves compared in the stats table: none, then 6+ down to 2+.
pub const COMPARED_SAVES: [u8; 6] = [0, 6, 5, 4, 3, 2];

/// Expected damage of all profiles against `target`, per 100 points when `points` is given.
pub fn compute_average_damage(
    profiles: &[WeaponProfile],
    target: &Target,
    points: Option<u32>,
) -> f64 {
    let total: f64 = profiles
        .iter()
        .map(|profile| AverageDamageProcessor::new(profile, target).average_damage())
        .sum();
    match points {
        Some(points) => scale_per_100_points(total, points),
        None => total,
    }
}

pub fn compute_max_damage(profiles: &[WeaponProfile]) -> u32 {
    profiles
        .iter()
        .map(|profile| MaxDamageProcessor::new(profile).max_damage())
        .fold(0, u32::saturating_add)
}

/// Runs `num_simulations` (default 1000) full-unit simulations on the calling thread.
pub fn compute_simulation(
    profiles: &[WeaponProfile],
    target: &Target,
    num_simulations: Option<usize>,
    rng: &mut DiceRng,
) -> SimulationResult {
    let runs = num_simulations.unwrap_or(DEFAULT_SIMULATIONS);
    let histogram: Histogram = (0..runs)
        .map(|_| simulate_unit(profiles, target, &mut *rng))
        .collect();
    histogram.into_result(compute_max_damage(profiles))
}

pub fn scale_per_100_points(value: f64, points: u32) -> f64 {
    value * 100.0 / points.max(1) as f64
}

/// Incoming attack used to rate a unit's durability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomingDamage {
    Rend(u32),
    Mortal,
}

impl IncomingDamage {
    /// An attack that deals exactly 1 expected damage when nothing is saved.
    pub fn reference_profile(self) -> WeaponProfile {
        match self {
            Self::Rend(rend) => WeaponProfile::new(1, 4, 4, 4, rend, 1),
            Self::Mortal => WeaponProfile::new(1, 2, 4, 4, 0, 1).with_modifiers(vec![
                Modifier::mortal_wounds(Characteristic::ToHit, 4, true, 1, false),
            ]),
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::Rend(0) => "-".to_string(),
            Self::Rend(rend) => format!("-{rend}"),
            Self::Mortal => "MW".to_string(),
        }
    }
}

/// Average damage against one save value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaveResult {
    pub save: u8,
    pub average_damage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub name: String,
    pub points: u32,
    pub models: u32,
    /// Wounds per model.
    pub health: u32,
    pub save: u8,
    /// Rules that apply when this unit is the target.
    pub modifiers: Vec<TargetModifier>,
    pub weapon_profiles: Vec<WeaponProfile>,
}

impl Unit {
    pub fn new(name: impl Into<String>, weapon_profiles: Vec<WeaponProfile>) -> Self {
        Self {
            name: name.into(),
            points: 100,
            models: 1,
            health: 1,
            save: 4,
            modifiers: Vec::new(),
            weapon_profiles,
        }
    }

    pub fn average_damage(&self, target: &Target, per_100_points: bool) -> f64 {
        let points = per_100_points.then_some(self.points);
        compute_average_damage(&self.weapon_profiles, target, points)
    }

    pub fn max_damage(&self) -> u32 {
        compute_max_damage(&self.weapon_profiles)
    }

    pub fn run_simulations(
        &self,
        target: &Target,
        num_simulations: usize,
        rng: &mut DiceRng,
    ) -> SimulationResult {
        debug!(unit = %self.name, num_simulations, "simulating unit");
        compute_simulation(&self.weapon_profiles, target, Some(num_simulations), rng)
    }

    /// Same as [`Unit::run_simulations`] with runs spread across `pool`; reproducible for a given `seed`.
    pub fn run_simulations_parallel(
        &self,
        target: &Target,
        num_simulations: usize,
        seed: u64,
        pool: &WorkerPool,
    ) -> SimulationResult {
        debug!(unit = %self.name, num_simulations, seed, "simulating unit in parallel");
        run_simulation_batches(&self.weapon_profiles, target, num_simulations, seed, pool)
            .into_result(self.max_damage())
    }

    /// This unit on the receiving end.
    pub fn as_target(&self) -> Target {
        Target::new(self.save, self.modifiers.clone())
    }

    /// Hit points worth of reference attacks needed to wipe the unit; infinite when nothing gets through.
    pub fn effective_health(&self, incoming: IncomingDamage, per_100_points: bool) -> f64 {
        let mut health = self.models as f64 * self.health as f64;
        if per_100_points {
            health = scale_per_100_points(health, self.points);
        }
        let reference = incoming.reference_profile();
        let damage = AverageDamageProcessor::new(&reference, &self.as_target()).average_damage();
        if damage <= 0.0 {
            return f64::INFINITY;
        }
        health / damage
    }

    /// Average damage against each of [`COMPARED_SAVES`], with `target_modifiers` on every target.
    pub fn save_comparison(
        &self,
        target_modifiers: &[TargetModifier],
        per_100_points: bool,
    ) -> Vec<SaveResult> {
        COMPARED_SAVES
            .iter()
            .map(|&save| {
                let target = Target::new(save, target_modifiers.to_vec());
                SaveResult {
                    save,
                    average_damage: self.average_damage(&target, per_100_points),
                }
            })
            .collect()
    }
}
