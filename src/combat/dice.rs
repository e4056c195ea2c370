//! Dice primitives: sided dice with closed-form success probabilities and
//! fixed-or-rolled amounts used for attacks, damage, and rule payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::combat::rng::DiceRng;
use crate::error::Error;

/// Natural rolls below this always fail, whatever the modifiers.
pub const MIN_THRESHOLD: i32 = 2;

/// Largest dice count a parsed expression may roll, as in `100D6`.
pub const MAX_DICE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Die {
    D3,
    D6,
}

impl Die {
    pub const fn sides(self) -> u32 {
        match self {
            Self::D3 => 3,
            Self::D6 => 6,
        }
    }

    /// Probability that one roll of this die is at least `threshold`.
    pub fn probability_at_least(self, threshold: i32) -> f64 {
        let sides = self.sides() as i32;
        if threshold > sides {
            return 0.0;
        }
        let threshold = threshold.max(MIN_THRESHOLD);
        (((sides + 1 - threshold) as f64) / sides as f64).clamp(0.0, 1.0)
    }

    /// Probability that one roll lands in `low..high` (natural faces).
    pub fn probability_between(self, low: i32, high: i32) -> f64 {
        (self.probability_at_least(low) - self.probability_at_least(high.max(low))).max(0.0)
    }

    pub fn roll(self, rng: &mut DiceRng) -> u32 {
        rng.roll(self.sides())
    }

    pub fn average(self) -> f64 {
        (self.sides() as f64 + 1.0) / 2.0
    }

    pub const fn max(self) -> u32 {
        self.sides()
    }
}

impl fmt::Display for Die {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.sides())
    }
}

/// A characteristic value or rule payload: either a constant or `count`D`die` + `modifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AmountRepr", into = "AmountRepr")]
pub enum Amount {
    Fixed(i32),
    Dice { count: u32, die: Die, modifier: i32 },
}

impl Default for Amount {
    fn default() -> Self {
        Self::Fixed(0)
    }
}

impl From<i32> for Amount {
    fn from(value: i32) -> Self {
        Self::Fixed(value)
    }
}

impl From<Die> for Amount {
    fn from(die: Die) -> Self {
        Self::Dice {
            count: 1,
            die,
            modifier: 0,
        }
    }
}

impl Amount {
    pub fn average(&self) -> f64 {
        match *self {
            Self::Fixed(value) => value as f64,
            Self::Dice {
                count,
                die,
                modifier,
            } => count as f64 * die.average() + modifier as f64,
        }
    }

    pub fn max(&self) -> i64 {
        match *self {
            Self::Fixed(value) => value as i64,
            Self::Dice {
                count,
                die,
                modifier,
            } => count as i64 * die.max() as i64 + modifier as i64,
        }
    }

    pub fn roll(&self, rng: &mut DiceRng) -> i32 {
        match *self {
            Self::Fixed(value) => value,
            Self::Dice {
                count,
                die,
                modifier,
            } => {
                let total = (0..count).map(|_| die.roll(rng) as i64).sum::<i64>() + modifier as i64;
                total.clamp(i32::MIN as i64, i32::MAX as i64) as i32
            }
        }
    }

    /// Sampled value when a random source is supplied, expected value otherwise.
    pub fn resolve(&self, rng: Option<&mut DiceRng>) -> f64 {
        match rng {
            Some(rng) => self.roll(rng) as f64,
            None => self.average(),
        }
    }

}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Fixed(value) => write!(f, "{value}"),
            Self::Dice {
                count,
                die,
                modifier,
            } => {
                if count != 1 {
                    write!(f, "{count}")?;
                }
                write!(f, "{die}")?;
                match modifier {
                    0 => Ok(()),
                    m if m > 0 => write!(f, "+{m}"),
                    m => write!(f, "{m}"),
                }
            }
        }
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text: String = raw
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect();
        if text.is_empty() {
            return Err(Error::InvalidDice(raw.to_string()));
        }
        if let Ok(value) = text.parse::<i32>() {
            return Ok(Self::Fixed(value));
        }

        let invalid = || Error::InvalidDice(raw.to_string());
        let (count, rest) = text.split_once('D').ok_or_else(invalid)?;
        let count = if count.is_empty() {
            1
        } else {
            count.parse::<u32>().map_err(|_| invalid())?
        };
        if count > MAX_DICE {
            return Err(invalid());
        }

        let (sides, modifier) = match rest.find(|ch: char| ch == '+' || ch == '-') {
            Some(at) => {
                let modifier = rest[at..]
                    .trim_start_matches('+')
                    .parse::<i32>()
                    .map_err(|_| invalid())?;
                (&rest[..at], modifier)
            }
            None => (rest, 0),
        };
        let die = match sides {
            "3" => Die::D3,
            "6" => Die::D6,
            _ => return Err(invalid()),
        };

        Ok(Self::Dice {
            count,
            die,
            modifier,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl TryFrom<AmountRepr> for Amount {
    type Error = Error;

    fn try_from(repr: AmountRepr) -> Result<Self, Self::Error> {
        match repr {
            AmountRepr::Integer(value) => Ok(Self::Fixed(
                value.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            )),
            AmountRepr::Float(value) if value.is_finite() => Ok(Self::Fixed(value.round() as i32)),
            AmountRepr::Float(_) => Ok(Self::Fixed(0)),
            AmountRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Amount> for AmountRepr {
    fn from(amount: Amount) -> Self {
        match amount {
            Amount::Fixed(value) => Self::Integer(value as i64),
            dice => Self::Text(dice.to_string()),
        }
    }
}
