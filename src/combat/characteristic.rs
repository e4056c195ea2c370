use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Characteristic {
    Attacks,
    ToHit,
    ToWound,
    Rend,
    Damage,
    Save,
}

impl Characteristic {
    pub const ALL: [Characteristic; 6] = [
        Self::Attacks,
        Self::ToHit,
        Self::ToWound,
        Self::Rend,
        Self::Damage,
        Self::Save,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attacks => "attacks",
            Self::ToHit => "to_hit",
            Self::ToWound => "to_wound",
            Self::Rend => "rend",
            Self::Damage => "damage",
            Self::Save => "save",
        }
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Characteristic {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .flat_map(|ch| ch.to_lowercase())
            .collect();
        match key.as_str() {
            "attacks" => Ok(Self::Attacks),
            "tohit" => Ok(Self::ToHit),
            "towound" => Ok(Self::ToWound),
            "rend" => Ok(Self::Rend),
            "damage" => Ok(Self::Damage),
            "save" => Ok(Self::Save),
            _ => Err(Error::UnknownCharacteristic(raw.to_string())),
        }
    }
}
