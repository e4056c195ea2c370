//! Runtime configuration, read once from the environment.
//!
//! Every knob has a documented default; a value that fails to parse is
//! reported and replaced by its default rather than aborting startup.

use std::env;
use std::str::FromStr;

use tracing::warn;

pub const BIND_VAR: &str = "STATSHAMMER_BIND";
pub const SIMULATIONS_VAR: &str = "STATSHAMMER_SIMULATIONS";
pub const MAX_SIMULATIONS_VAR: &str = "STATSHAMMER_MAX_SIMULATIONS";
pub const WORKERS_VAR: &str = "STATSHAMMER_WORKERS";
pub const SEED_VAR: &str = "STATSHAMMER_SEED";

/// Upper bound on `STATSHAMMER_WORKERS`.
pub const MAX_WORKERS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Address the HTTP server listens on.
    pub bind_addr: String,

    /// Simulation runs when a request does not name a count.
    ///
    /// 1000 runs keep a single-unit request well under a second while the
    /// sample mean stays within a few percent of the expectation.
    pub default_simulations: usize,

    /// Upper bound on runs for one request; larger requests are clamped.
    pub max_simulations: usize,

    /// Simulation worker threads; 0 uses one per core. Capped at [`MAX_WORKERS`].
    pub workers: usize,

    /// Fixed base seed. `None` draws a fresh seed per request.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            default_simulations: 1000,
            max_simulations: 100_000,
            workers: 0,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: lookup(BIND_VAR)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.bind_addr),
            default_simulations: parse_or(&lookup, SIMULATIONS_VAR, defaults.default_simulations),
            max_simulations: parse_or(&lookup, MAX_SIMULATIONS_VAR, defaults.max_simulations),
            workers: capped_workers(parse_or(&lookup, WORKERS_VAR, defaults.workers)),
            seed: lookup(SEED_VAR).and_then(|raw| match raw.trim().parse() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    warn!(key = SEED_VAR, value = %raw, "ignoring invalid seed");
                    None
                }
            }),
        }
    }

    /// Requested run count, defaulted and capped.
    pub fn simulations(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_simulations)
            .min(self.max_simulations)
    }
}

fn capped_workers(workers: usize) -> usize {
    if workers > MAX_WORKERS {
        warn!(key = WORKERS_VAR, workers, max = MAX_WORKERS, "worker count capped");
    }
    workers.min(MAX_WORKERS)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, %default, "invalid value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> EngineConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn unset_environment_gives_defaults() {
        assert_eq!(config(&[]), EngineConfig::default());
    }

    #[test]
    fn values_are_parsed() {
        let cfg = config(&[
            (BIND_VAR, "0.0.0.0:8080"),
            (SIMULATIONS_VAR, "500"),
            (WORKERS_VAR, "4"),
            (SEED_VAR, "99"),
        ]);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.default_simulations, 500);
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.seed, Some(99));
    }

    #[test]
    fn invalid_values_fall_back() {
        let cfg = config(&[(SIMULATIONS_VAR, "lots"), (SEED_VAR, "-1")]);
        assert_eq!(cfg.default_simulations, 1000);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn requested_runs_are_capped() {
        let cfg = config(&[(MAX_SIMULATIONS_VAR, "2000")]);
        assert_eq!(cfg.simulations(None), 1000);
        assert_eq!(cfg.simulations(Some(50_000)), 2000);
        assert_eq!(cfg.simulations(Some(0)), 0);
    }

    #[test]
    fn worker_count_is_capped() {
        let cfg = config(&[(WORKERS_VAR, "18446744073709551615")]);
        assert_eq!(cfg.workers, MAX_WORKERS);
        assert_eq!(config(&[(WORKERS_VAR, "8")]).workers, 8);
    }
}
