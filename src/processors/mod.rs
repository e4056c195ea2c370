//! Per-profile damage processors: closed-form average, dice simulation, and maximum.

pub mod average;
pub mod max;
pub mod simulation;

pub use average::AverageDamageProcessor;
pub use max::MaxDamageProcessor;
pub use simulation::SimulationProcessor;
