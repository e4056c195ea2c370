//! Damage statistics for tabletop wargame units.
//!
//! Weapon profiles roll through hit, wound, save, and damage stages. Each stage
//! can be modified, bypassed, or split by special rules. [`processors`]
//! resolves one profile against one target in closed form, by simulation, or
//! as a theoretical maximum; [`aggregate`] sums a unit's profiles and builds
//! damage histograms.

pub mod aggregate;
pub mod cli;
pub mod combat;
pub mod config;
pub mod data;
pub mod error;
pub mod parallel;
pub mod processors;
pub mod server;

pub use error::{Error, Result};
