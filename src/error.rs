use thiserror::Error;

use crate::combat::Characteristic;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown modifier: {0}")]
    UnknownModifier(String),

    #[error("Modifier {modifier} cannot be attached to {characteristic}")]
    InvalidCharacteristic {
        modifier: String,
        characteristic: Characteristic,
    },

    #[error("Modifier {modifier} cannot be used on a {side}")]
    MisplacedModifier {
        modifier: String,
        side: &'static str,
    },

    #[error("Unknown characteristic: {0}")]
    UnknownCharacteristic(String),

    #[error("Invalid dice expression: {0}")]
    InvalidDice(String),

    #[error("Unsupported scenario format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
