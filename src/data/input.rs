//! Plain-data shapes for units, weapon profiles, rules, and targets.
//!
//! Inputs are forgiving: missing or non-numeric values take defaults, numbers
//! are clamped to their domain, and inactive entries are dropped. Unknown rule
//! ids and characteristics a rule cannot attach to are errors.

use serde::{Deserialize, Deserializer, Serialize};

use crate::aggregate::Unit;
use crate::combat::{
    Amount, Characteristic, Modifier, ModifierId, Target, TargetModifier, WeaponProfile,
};
use crate::error::{Error, Result};

pub const DEFAULT_UNIT_NAME: &str = "Unnamed Unit";
/// Largest model count a weapon profile or leader rule accepts.
pub const MAX_MODELS: u32 = 10_000;

fn default_true() -> bool {
    true
}

/// Accepts numbers, numeric strings, or null; anything non-finite reads as missing.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let value = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(number)) => Some(number),
        Some(Raw::Text(text)) => text.trim().parse::<f64>().ok(),
        Some(Raw::Other(_)) | None => None,
    };
    Ok(value.filter(|number| number.is_finite()))
}

fn clamped(value: Option<f64>, default: f64, min: f64, max: f64) -> f64 {
    value.unwrap_or(default).round().clamp(min, max)
}

/// Rule parameters, accepted in snake_case or camelCase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifierOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristic: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", skip_serializing_if = "Option::is_none")]
    pub on: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmodified: Option<bool>,
    #[serde(default, alias = "extraHits", skip_serializing_if = "Option::is_none")]
    pub extra_hits: Option<Amount>,
    #[serde(default, alias = "mortalWounds", skip_serializing_if = "Option::is_none")]
    pub mortal_wounds: Option<Amount>,
    #[serde(default, alias = "inAddition", skip_serializing_if = "Option::is_none")]
    pub in_addition: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<Amount>,
    #[serde(default, alias = "bonusTo", skip_serializing_if = "Option::is_none")]
    pub bonus_to: Option<String>,
    #[serde(
        default,
        alias = "numLeaders",
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub num_leaders: Option<f64>,
}

impl ModifierOptions {
    /// Field-wise fallback: values set here win over `other`.
    pub fn or(self, other: ModifierOptions) -> ModifierOptions {
        ModifierOptions {
            characteristic: self.characteristic.or(other.characteristic),
            on: self.on.or(other.on),
            unmodified: self.unmodified.or(other.unmodified),
            extra_hits: self.extra_hits.or(other.extra_hits),
            mortal_wounds: self.mortal_wounds.or(other.mortal_wounds),
            in_addition: self.in_addition.or(other.in_addition),
            bonus: self.bonus.or(other.bonus),
            bonus_to: self.bonus_to.or(other.bonus_to),
            num_leaders: self.num_leaders.or(other.num_leaders),
        }
    }

    fn on(&self) -> u8 {
        clamped(self.on, 6.0, 2.0, 6.0) as u8
    }

    fn unmodified(&self) -> bool {
        self.unmodified.unwrap_or(true)
    }

    fn num_leaders(&self) -> u32 {
        clamped(self.num_leaders, 1.0, 0.0, MAX_MODELS as f64) as u32
    }
}

/// One rule: `{ "id": ..., "active": ..., "options": {...} }`, or with the options inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierInput {
    #[serde(alias = "kind")]
    pub id: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub options: ModifierOptions,
    #[serde(flatten)]
    pub inline: ModifierOptions,
}

impl ModifierInput {
    pub fn new(id: impl Into<String>, options: ModifierOptions) -> Self {
        Self {
            id: id.into(),
            active: true,
            options,
            inline: ModifierOptions::default(),
        }
    }

    fn resolved_options(&self) -> ModifierOptions {
        self.inline.clone().or(self.options.clone())
    }

    fn characteristic(&self, id: ModifierId, options: &ModifierOptions) -> Result<Characteristic> {
        let allowed = id.characteristics();
        let Some(raw) = options.characteristic.as_deref() else {
            return Ok(allowed[0]);
        };
        let characteristic: Characteristic = raw.parse()?;
        if !allowed.contains(&characteristic) {
            return Err(Error::InvalidCharacteristic {
                modifier: id.to_string(),
                characteristic,
            });
        }
        Ok(characteristic)
    }

    pub fn to_modifier(&self) -> Result<Modifier> {
        let id: ModifierId = self.id.parse()?;
        let options = self.resolved_options();
        let characteristic = self.characteristic(id, &options)?;
        let (on, unmodified) = (options.on(), options.unmodified());
        let bonus = options.bonus.unwrap_or(Amount::Fixed(1));

        let modifier = match id {
            ModifierId::Bonus => Modifier::bonus(characteristic, bonus),
            ModifierId::Reroll => Modifier::reroll(characteristic),
            ModifierId::RerollOnes => Modifier::reroll_ones(characteristic),
            ModifierId::Exploding => Modifier::exploding(
                characteristic,
                on,
                unmodified,
                options.extra_hits.unwrap_or(Amount::Fixed(1)),
            ),
            ModifierId::AutoWound => Modifier::auto_wound(on, unmodified),
            ModifierId::MortalWounds => Modifier::mortal_wounds(
                characteristic,
                on,
                unmodified,
                options.mortal_wounds.unwrap_or(Amount::Fixed(1)),
                options.in_addition.unwrap_or(false),
            ),
            ModifierId::ConditionalBonus => {
                let bonus_to = match options.bonus_to.as_deref() {
                    Some(raw) => raw.parse()?,
                    None => Characteristic::Damage,
                };
                Modifier::conditional_bonus(characteristic, on, unmodified, bonus, bonus_to)
            }
            ModifierId::LeaderExtraAttacks => {
                Modifier::leader_extra_attacks(bonus, options.num_leaders())
            }
            ModifierId::LeaderBonus => {
                Modifier::leader_bonus(characteristic, bonus, options.num_leaders())
            }
            ModifierId::TargetReroll
            | ModifierId::TargetRerollOnes
            | ModifierId::TargetMortalNegate
            | ModifierId::TargetFeelNoPain
            | ModifierId::TargetEthereal => {
                return Err(Error::MisplacedModifier {
                    modifier: id.to_string(),
                    side: "weapon profile",
                })
            }
        };
        Ok(modifier.with_active(self.active))
    }

    pub fn to_target_modifier(&self) -> Result<TargetModifier> {
        let id: ModifierId = self.id.parse()?;
        let options = self.resolved_options();
        let modifier = match id {
            ModifierId::TargetReroll => TargetModifier::reroll(),
            ModifierId::TargetRerollOnes => TargetModifier::reroll_ones(),
            ModifierId::TargetMortalNegate => TargetModifier::mortal_negate(options.on()),
            ModifierId::TargetFeelNoPain => TargetModifier::feel_no_pain(options.on()),
            ModifierId::TargetEthereal => TargetModifier::ethereal(),
            _ => {
                return Err(Error::MisplacedModifier {
                    modifier: id.to_string(),
                    side: "target",
                })
            }
        };
        Ok(modifier.with_active(self.active))
    }
}

fn active_modifiers(inputs: &[ModifierInput]) -> Result<Vec<Modifier>> {
    inputs
        .iter()
        .filter(|input| input.active)
        .map(ModifierInput::to_modifier)
        .collect()
}

fn active_target_modifiers(inputs: &[ModifierInput]) -> Result<Vec<TargetModifier>> {
    inputs
        .iter()
        .filter(|input| input.active)
        .map(ModifierInput::to_target_modifier)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default, alias = "numModels", deserialize_with = "lenient_number")]
    pub num_models: Option<f64>,
    #[serde(default)]
    pub attacks: Option<Amount>,
    #[serde(default, alias = "toHit", deserialize_with = "lenient_number")]
    pub to_hit: Option<f64>,
    #[serde(default, alias = "toWound", deserialize_with = "lenient_number")]
    pub to_wound: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rend: Option<f64>,
    #[serde(default)]
    pub damage: Option<Amount>,
    #[serde(default)]
    pub modifiers: Vec<ModifierInput>,
}

impl ProfileInput {
    pub fn to_profile(&self) -> Result<WeaponProfile> {
        let profile = WeaponProfile::new(
            clamped(self.num_models, 1.0, 0.0, MAX_MODELS as f64) as u32,
            self.attacks.unwrap_or(Amount::Fixed(1)),
            clamped(self.to_hit, 4.0, 1.0, 7.0) as u8,
            clamped(self.to_wound, 4.0, 1.0, 7.0) as u8,
            clamped(self.rend, 0.0, 0.0, 6.0) as u32,
            self.damage.unwrap_or(Amount::Fixed(1)),
        );
        Ok(profile.with_modifiers(active_modifiers(&self.modifiers)?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default, deserialize_with = "lenient_number")]
    pub points: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub health: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub models: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub save: Option<f64>,
    /// Rules that apply when the unit is targeted.
    #[serde(default)]
    pub modifiers: Vec<ModifierInput>,
    #[serde(default, alias = "weaponProfiles")]
    pub weapon_profiles: Vec<ProfileInput>,
}

impl UnitInput {
    pub fn name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_UNIT_NAME)
    }

    pub fn to_unit(&self) -> Result<Unit> {
        let weapon_profiles = self
            .weapon_profiles
            .iter()
            .filter(|profile| profile.active)
            .map(ProfileInput::to_profile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Unit {
            name: self.name().to_string(),
            points: clamped(self.points, 100.0, 0.0, u32::MAX as f64) as u32,
            models: clamped(self.models, 1.0, 0.0, u32::MAX as f64) as u32,
            health: clamped(self.health, 1.0, 0.0, u32::MAX as f64) as u32,
            save: sanitize_save(self.save.or(Some(4.0))),
            modifiers: active_target_modifiers(&self.modifiers)?,
            weapon_profiles,
        })
    }
}

/// Save values outside 1..=6 mean no save.
fn sanitize_save(save: Option<f64>) -> u8 {
    match save.map(f64::round) {
        Some(save) if (1.0..=6.0).contains(&save) => save as u8,
        _ => 0,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetInput {
    #[serde(default, deserialize_with = "lenient_number")]
    pub save: Option<f64>,
    #[serde(default)]
    pub modifiers: Vec<ModifierInput>,
}

impl TargetInput {
    pub fn to_target(&self) -> Result<Target> {
        Ok(Target::new(
            sanitize_save(self.save),
            active_target_modifiers(&self.modifiers)?,
        ))
    }

    /// Only the target rules; used when the save is varied across a comparison.
    pub fn to_target_modifiers(&self) -> Result<Vec<TargetModifier>> {
        active_target_modifiers(&self.modifiers)
    }
}

/// A batch request: attacking units, one target, and simulation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub units: Vec<UnitInput>,
    #[serde(default)]
    pub target: TargetInput,
    #[serde(default, alias = "numSimulations", skip_serializing_if = "Option::is_none")]
    pub num_simulations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Active units that still have at least one active weapon profile.
pub fn active_units(inputs: &[UnitInput]) -> Result<Vec<Unit>> {
    let mut units = Vec::new();
    for input in inputs.iter().filter(|unit| unit.active) {
        let unit = input.to_unit()?;
        if !unit.weapon_profiles.is_empty() {
            units.push(unit);
        }
    }
    Ok(units)
}

impl Scenario {
    pub fn active_units(&self) -> Result<Vec<Unit>> {
        active_units(&self.units)
    }

    pub fn target(&self) -> Result<Target> {
        self.target.to_target()
    }
}
