pub mod input;
pub mod loader;

pub use input::{
    active_units, ModifierInput, ModifierOptions, ProfileInput, Scenario, TargetInput, UnitInput,
};
pub use loader::{load_scenario, parse_scenario, ScenarioFormat};
