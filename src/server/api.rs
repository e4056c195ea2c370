//! JSON payloads behind the HTTP routes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{IncomingDamage, SaveResult, SimulationResult, Unit, MAX_HISTOGRAM_DAMAGE};
use crate::combat::{catalog, DiceRng, Target};
use crate::config::EngineConfig;
use crate::data::{active_units, TargetInput, UnitInput};
use crate::parallel::WorkerPool;

/// Incoming attacks rated in the effective-health table.
pub const EFFECTIVE_HEALTH_ATTACKS: [IncomingDamage; 5] = [
    IncomingDamage::Rend(0),
    IncomingDamage::Rend(1),
    IncomingDamage::Rend(2),
    IncomingDamage::Rend(3),
    IncomingDamage::Mortal,
];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Model(#[from] crate::error::Error),
}

pub fn health_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "service": "statshammer-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn modifiers_payload() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({ "modifiers": catalog() }))
}

fn parse_units(inputs: &[UnitInput]) -> Result<Vec<Unit>, ApiError> {
    let units = active_units(inputs)?;
    if units.is_empty() {
        return Err(ApiError::Validation(
            "at least one active unit with an active weapon profile is required".to_string(),
        ));
    }
    Ok(units)
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsRequest {
    pub units: Vec<UnitInput>,
    /// Only the rules are used; the save is varied across the comparison.
    #[serde(default)]
    pub target: TargetInput,
    #[serde(default, alias = "per100Points")]
    pub per_100_points: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveHealth {
    pub incoming: String,
    /// `None` when the reference attack cannot damage the unit.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitStats {
    pub name: String,
    pub points: u32,
    pub max_damage: u32,
    pub average_damage: Vec<SaveResult>,
    pub effective_health: Vec<EffectiveHealth>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub per_100_points: bool,
    pub units: Vec<UnitStats>,
}

pub fn stats_payload(body: &str) -> Result<String, ApiError> {
    let request: StatsRequest = serde_json::from_str(body)?;
    let units = parse_units(&request.units)?;
    let target_modifiers = request.target.to_target_modifiers()?;
    let per_100_points = request.per_100_points;

    let units = units
        .iter()
        .map(|unit| UnitStats {
            name: unit.name.clone(),
            points: unit.points,
            max_damage: unit.max_damage(),
            average_damage: unit.save_comparison(&target_modifiers, per_100_points),
            effective_health: EFFECTIVE_HEALTH_ATTACKS
                .iter()
                .map(|&incoming| {
                    let value = unit.effective_health(incoming, per_100_points);
                    EffectiveHealth {
                        incoming: incoming.label(),
                        value: value.is_finite().then_some(value),
                    }
                })
                .collect(),
        })
        .collect();

    Ok(serde_json::to_string_pretty(&StatsResponse {
        per_100_points,
        units,
    })?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulateRequest {
    pub units: Vec<UnitInput>,
    #[serde(default)]
    pub target: TargetInput,
    #[serde(default, alias = "numSimulations")]
    pub num_simulations: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitSimulation {
    pub name: String,
    pub average_damage: f64,
    #[serde(flatten)]
    pub result: SimulationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulateResponse {
    pub num_simulations: usize,
    pub seed: u64,
    pub target_save: u8,
    pub results: Vec<UnitSimulation>,
}

/// Simulates every unit; each unit gets its own stream derived from the request seed.
pub fn simulate_units(
    units: &[Unit],
    target: &Target,
    num_simulations: usize,
    seed: u64,
    pool: &WorkerPool,
) -> Vec<UnitSimulation> {
    units
        .iter()
        .enumerate()
        .map(|(index, unit)| UnitSimulation {
            name: unit.name.clone(),
            average_damage: unit.average_damage(target, false),
            result: unit.run_simulations_parallel(
                target,
                num_simulations,
                DiceRng::for_batch(seed, index).next_u64(),
                pool,
            ),
        })
        .collect()
}

/// Rejects units whose histogram would exceed [`MAX_HISTOGRAM_DAMAGE`] buckets.
pub fn check_histogram_size(units: &[Unit]) -> Result<(), ApiError> {
    match units
        .iter()
        .find(|unit| unit.max_damage() > MAX_HISTOGRAM_DAMAGE)
    {
        Some(unit) => Err(ApiError::Validation(format!(
            "{} can deal up to {} damage; simulation supports at most {MAX_HISTOGRAM_DAMAGE}",
            unit.name,
            unit.max_damage()
        ))),
        None => Ok(()),
    }
}

pub fn resolve_seed(requested: Option<u64>, config: &EngineConfig) -> u64 {
    requested
        .or(config.seed)
        .unwrap_or_else(|| DiceRng::from_entropy().next_u64())
}

pub fn simulate_payload(
    body: &str,
    config: &EngineConfig,
    pool: &WorkerPool,
) -> Result<String, ApiError> {
    let request: SimulateRequest = serde_json::from_str(body)?;
    let units = parse_units(&request.units)?;
    check_histogram_size(&units)?;
    let target = request.target.to_target()?;
    let num_simulations = config.simulations(request.num_simulations);
    if num_simulations == 0 {
        return Err(ApiError::Validation(
            "num_simulations must be at least 1".to_string(),
        ));
    }
    let seed = resolve_seed(request.seed, config);
    let results = simulate_units(&units, &target, num_simulations, seed, pool);

    Ok(serde_json::to_string_pretty(&SimulateResponse {
        num_simulations,
        seed,
        target_save: target.save,
        results,
    })?)
}
