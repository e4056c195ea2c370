//! Load scenario files. The format follows the extension: `.json`, `.yaml`, or `.yml`.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::data::input::Scenario;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioFormat {
    Json,
    Yaml,
}

impl ScenarioFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub fn parse_scenario(raw: &str, format: ScenarioFormat) -> Result<Scenario> {
    let scenario = match format {
        ScenarioFormat::Json => serde_json::from_str(raw)?,
        ScenarioFormat::Yaml => serde_yaml::from_str(raw)?,
    };
    Ok(scenario)
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let format = ScenarioFormat::from_path(path)?;
    let raw = fs::read_to_string(path)?;
    let scenario = parse_scenario(&raw, format)?;
    debug!(path = %path.display(), units = scenario.units.len(), "loaded scenario");
    Ok(scenario)
}
