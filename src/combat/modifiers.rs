//! Special rules attachable to weapon profiles and targets.
//!
//! Every rule is one case of a closed enum so both processors match on it
//! exhaustively. Profile rules hang off a [`Characteristic`]; target rules
//! always act on the save roll or on damage after it.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::combat::characteristic::Characteristic;
use crate::combat::dice::{Amount, Die};
use crate::error::Error;

/// Which failed rolls a reroll rule is allowed to pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerollScope {
    Failed,
    Ones,
}

impl RerollScope {
    /// Whether a failed natural roll may be rerolled.
    pub fn allows(self, natural: u32) -> bool {
        match self {
            Self::Failed => true,
            Self::Ones => natural == 1,
        }
    }

    /// Share of rolls that get a second attempt when a roll succeeds with probability `success`.
    pub fn rate(self, success: f64) -> f64 {
        match self {
            Self::Failed => (1.0 - success).clamp(0.0, 1.0),
            Self::Ones => 1.0 / Die::D6.sides() as f64,
        }
    }
}

/// The roll that fires a rule: `on`+, read from the natural die when `unmodified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub on: u8,
    pub unmodified: bool,
}

impl Trigger {
    pub fn new(on: u8, unmodified: bool) -> Self {
        Self {
            on: on.clamp(2, 6),
            unmodified,
        }
    }

    /// Natural roll needed to fire, given the bonus added to the stage's rolls.
    pub fn natural_threshold(self, roll_bonus: i32) -> i32 {
        if self.unmodified {
            self.on as i32
        } else {
            self.on as i32 - roll_bonus
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exploding {
    pub trigger: Trigger,
    pub extra_hits: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MortalWounds {
    pub trigger: Trigger,
    pub mortal_wounds: Amount,
    pub in_addition: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalBonus {
    pub trigger: Trigger,
    pub bonus: Amount,
    pub bonus_to: Characteristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leader {
    pub bonus: Amount,
    pub num_leaders: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierEffect {
    Bonus(Amount),
    Reroll(RerollScope),
    Exploding(Exploding),
    AutoWound(Trigger),
    MortalWounds(MortalWounds),
    ConditionalBonus(ConditionalBonus),
    LeaderExtraAttacks(Leader),
    LeaderBonus(Leader),
}

/// One rule instance owned by a weapon profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifier {
    pub characteristic: Characteristic,
    pub active: bool,
    pub effect: ModifierEffect,
}

impl Modifier {
    pub fn new(characteristic: Characteristic, effect: ModifierEffect) -> Self {
        Self {
            characteristic,
            active: true,
            effect,
        }
    }

    pub fn bonus(characteristic: Characteristic, bonus: impl Into<Amount>) -> Self {
        Self::new(characteristic, ModifierEffect::Bonus(bonus.into()))
    }

    pub fn reroll(characteristic: Characteristic) -> Self {
        Self::new(characteristic, ModifierEffect::Reroll(RerollScope::Failed))
    }

    pub fn reroll_ones(characteristic: Characteristic) -> Self {
        Self::new(characteristic, ModifierEffect::Reroll(RerollScope::Ones))
    }

    pub fn exploding(
        characteristic: Characteristic,
        on: u8,
        unmodified: bool,
        extra_hits: impl Into<Amount>,
    ) -> Self {
        Self::new(
            characteristic,
            ModifierEffect::Exploding(Exploding {
                trigger: Trigger::new(on, unmodified),
                extra_hits: extra_hits.into(),
            }),
        )
    }

    pub fn auto_wound(on: u8, unmodified: bool) -> Self {
        Self::new(
            Characteristic::ToHit,
            ModifierEffect::AutoWound(Trigger::new(on, unmodified)),
        )
    }

    pub fn mortal_wounds(
        characteristic: Characteristic,
        on: u8,
        unmodified: bool,
        mortal_wounds: impl Into<Amount>,
        in_addition: bool,
    ) -> Self {
        Self::new(
            characteristic,
            ModifierEffect::MortalWounds(MortalWounds {
                trigger: Trigger::new(on, unmodified),
                mortal_wounds: mortal_wounds.into(),
                in_addition,
            }),
        )
    }

    pub fn conditional_bonus(
        characteristic: Characteristic,
        on: u8,
        unmodified: bool,
        bonus: impl Into<Amount>,
        bonus_to: Characteristic,
    ) -> Self {
        Self::new(
            characteristic,
            ModifierEffect::ConditionalBonus(ConditionalBonus {
                trigger: Trigger::new(on, unmodified),
                bonus: bonus.into(),
                bonus_to,
            }),
        )
    }

    pub fn leader_extra_attacks(bonus: impl Into<Amount>, num_leaders: u32) -> Self {
        Self::new(
            Characteristic::Attacks,
            ModifierEffect::LeaderExtraAttacks(Leader {
                bonus: bonus.into(),
                num_leaders,
            }),
        )
    }

    pub fn leader_bonus(
        characteristic: Characteristic,
        bonus: impl Into<Amount>,
        num_leaders: u32,
    ) -> Self {
        Self::new(
            characteristic,
            ModifierEffect::LeaderBonus(Leader {
                bonus: bonus.into(),
                num_leaders,
            }),
        )
    }

    pub fn with_active(self, active: bool) -> Self {
        Self { active, ..self }
    }

    pub fn id(&self) -> ModifierId {
        match self.effect {
            ModifierEffect::Bonus(_) => ModifierId::Bonus,
            ModifierEffect::Reroll(RerollScope::Failed) => ModifierId::Reroll,
            ModifierEffect::Reroll(RerollScope::Ones) => ModifierId::RerollOnes,
            ModifierEffect::Exploding(_) => ModifierId::Exploding,
            ModifierEffect::AutoWound(_) => ModifierId::AutoWound,
            ModifierEffect::MortalWounds(_) => ModifierId::MortalWounds,
            ModifierEffect::ConditionalBonus(_) => ModifierId::ConditionalBonus,
            ModifierEffect::LeaderExtraAttacks(_) => ModifierId::LeaderExtraAttacks,
            ModifierEffect::LeaderBonus(_) => ModifierId::LeaderBonus,
        }
    }

    pub fn leader(&self) -> Option<Leader> {
        match self.effect {
            ModifierEffect::LeaderExtraAttacks(leader) | ModifierEffect::LeaderBonus(leader) => {
                Some(leader)
            }
            _ => None,
        }
    }

    /// The flat bonus a branching rule grants to the models or rolls it singles out.
    pub fn as_bonus(&self) -> Option<Modifier> {
        match self.effect {
            ModifierEffect::ConditionalBonus(cb) => Some(Modifier::bonus(cb.bonus_to, cb.bonus)),
            ModifierEffect::LeaderExtraAttacks(leader) | ModifierEffect::LeaderBonus(leader) => {
                Some(Modifier::bonus(self.characteristic, leader.bonus))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEffect {
    Reroll(RerollScope),
    /// Save-after-save rolled per point of mortal-wound damage.
    MortalNegate { on: u8 },
    /// Save-after-save rolled per point of any damage.
    FeelNoPain { on: u8 },
    /// Rend is ignored.
    Ethereal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetModifier {
    pub active: bool,
    pub effect: TargetEffect,
}

impl TargetModifier {
    pub fn new(effect: TargetEffect) -> Self {
        Self {
            active: true,
            effect,
        }
    }

    pub fn reroll() -> Self {
        Self::new(TargetEffect::Reroll(RerollScope::Failed))
    }

    pub fn reroll_ones() -> Self {
        Self::new(TargetEffect::Reroll(RerollScope::Ones))
    }

    pub fn mortal_negate(on: u8) -> Self {
        Self::new(TargetEffect::MortalNegate { on: on.clamp(2, 6) })
    }

    pub fn feel_no_pain(on: u8) -> Self {
        Self::new(TargetEffect::FeelNoPain { on: on.clamp(2, 6) })
    }

    pub fn ethereal() -> Self {
        Self::new(TargetEffect::Ethereal)
    }

    pub fn with_active(self, active: bool) -> Self {
        Self { active, ..self }
    }

    pub fn id(&self) -> ModifierId {
        match self.effect {
            TargetEffect::Reroll(RerollScope::Failed) => ModifierId::TargetReroll,
            TargetEffect::Reroll(RerollScope::Ones) => ModifierId::TargetRerollOnes,
            TargetEffect::MortalNegate { .. } => ModifierId::TargetMortalNegate,
            TargetEffect::FeelNoPain { .. } => ModifierId::TargetFeelNoPain,
            TargetEffect::Ethereal => ModifierId::TargetEthereal,
        }
    }
}

/// Identifiers of every rule in the catalog, as used in plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierId {
    Bonus,
    Reroll,
    RerollOnes,
    Exploding,
    AutoWound,
    MortalWounds,
    ConditionalBonus,
    LeaderExtraAttacks,
    LeaderBonus,
    TargetReroll,
    TargetRerollOnes,
    TargetMortalNegate,
    TargetFeelNoPain,
    TargetEthereal,
}

impl ModifierId {
    pub const ALL: [ModifierId; 14] = [
        Self::Bonus,
        Self::Reroll,
        Self::RerollOnes,
        Self::Exploding,
        Self::AutoWound,
        Self::MortalWounds,
        Self::ConditionalBonus,
        Self::LeaderExtraAttacks,
        Self::LeaderBonus,
        Self::TargetReroll,
        Self::TargetRerollOnes,
        Self::TargetMortalNegate,
        Self::TargetFeelNoPain,
        Self::TargetEthereal,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bonus => "BONUS",
            Self::Reroll => "REROLL",
            Self::RerollOnes => "REROLL_ONES",
            Self::Exploding => "EXPLODING",
            Self::AutoWound => "AUTO_WOUND",
            Self::MortalWounds => "MORTAL_WOUNDS",
            Self::ConditionalBonus => "CONDITIONAL_BONUS",
            Self::LeaderExtraAttacks => "LEADER_EXTRA_ATTACKS",
            Self::LeaderBonus => "LEADER_BONUS",
            Self::TargetReroll => "TARGET_REROLL",
            Self::TargetRerollOnes => "TARGET_REROLL_ONES",
            Self::TargetMortalNegate => "TARGET_MORTAL_NEGATE",
            Self::TargetFeelNoPain => "TARGET_FEEL_NO_PAIN",
            Self::TargetEthereal => "TARGET_ETHEREAL",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Bonus => "Bonus",
            Self::Reroll => "Reroll Failed",
            Self::RerollOnes => "Reroll Ones",
            Self::Exploding => "Exploding",
            Self::AutoWound => "Auto Wound",
            Self::MortalWounds => "Mortal Wounds",
            Self::ConditionalBonus => "Conditional Bonus",
            Self::LeaderExtraAttacks => "Leader Extra Attacks",
            Self::LeaderBonus => "Leader Bonus",
            Self::TargetReroll => "Reroll Failed Saves",
            Self::TargetRerollOnes => "Reroll Save Rolls of One",
            Self::TargetMortalNegate => "Negate Mortal Wounds",
            Self::TargetFeelNoPain => "Feel No Pain",
            Self::TargetEthereal => "Ethereal",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Bonus => "Add a bonus to a characteristic.",
            Self::Reroll => "Reroll failed rolls for a characteristic.",
            Self::RerollOnes => "Reroll rolls of 1 for a characteristic.",
            Self::Exploding => "Rolls of `on`+ score extra successes for the next step.",
            Self::AutoWound => "Hit rolls of `on`+ wound automatically.",
            Self::MortalWounds => "Rolls of `on`+ inflict mortal wounds.",
            Self::ConditionalBonus => {
                "Rolls of `on`+ grant a bonus to another characteristic for that attack."
            }
            Self::LeaderExtraAttacks => "The unit leader makes extra attacks.",
            Self::LeaderBonus => "The unit leader gets a bonus to a characteristic.",
            Self::TargetReroll => "The target rerolls failed save rolls.",
            Self::TargetRerollOnes => "The target rerolls save rolls of 1.",
            Self::TargetMortalNegate => "Each mortal wound is negated on a roll of `on`+.",
            Self::TargetFeelNoPain => "Each wound or mortal wound is negated on a roll of `on`+.",
            Self::TargetEthereal => "The target ignores rend.",
        }
    }

    /// Characteristics the rule may attach to; the first one is the default.
    pub const fn characteristics(self) -> &'static [Characteristic] {
        use Characteristic::*;
        match self {
            Self::Bonus | Self::LeaderBonus => &[Attacks, ToHit, ToWound, Rend, Damage],
            Self::Reroll | Self::RerollOnes => &[ToHit, ToWound],
            Self::Exploding | Self::MortalWounds | Self::ConditionalBonus => &[ToHit, ToWound],
            Self::AutoWound => &[ToHit],
            Self::LeaderExtraAttacks => &[Attacks],
            Self::TargetReroll
            | Self::TargetRerollOnes
            | Self::TargetMortalNegate
            | Self::TargetFeelNoPain
            | Self::TargetEthereal => &[Save],
        }
    }

    pub const fn is_target(self) -> bool {
        matches!(
            self,
            Self::TargetReroll
                | Self::TargetRerollOnes
                | Self::TargetMortalNegate
                | Self::TargetFeelNoPain
                | Self::TargetEthereal
        )
    }

    pub fn metadata(self) -> ModifierMetadata {
        ModifierMetadata {
            id: self.as_str(),
            name: self.display_name(),
            description: self.description(),
            characteristics: self.characteristics().to_vec(),
            target: self.is_target(),
        }
    }
}

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModifierId {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        let id = match key.as_str() {
            "REROLL_FAILED" => Self::Reroll,
            "TARGET_REROLL_FAILED" => Self::TargetReroll,
            "TARGET_FNP" => Self::TargetFeelNoPain,
            other => Self::ALL
                .into_iter()
                .find(|id| id.as_str() == other)
                .ok_or_else(|| Error::UnknownModifier(raw.to_string()))?,
        };
        Ok(id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModifierMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub characteristics: Vec<Characteristic>,
    pub target: bool,
}

/// Metadata for every rule, in catalog order.
pub fn catalog() -> Vec<ModifierMetadata> {
    ModifierId::ALL.into_iter().map(ModifierId::metadata).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_and_accept_aliases() {
        for id in ModifierId::ALL {
            assert_eq!(id.as_str().parse::<ModifierId>().unwrap(), id);
        }
        assert_eq!("reroll failed".parse::<ModifierId>().unwrap(), ModifierId::Reroll);
        assert_eq!("TARGET_FNP".parse::<ModifierId>().unwrap(), ModifierId::TargetFeelNoPain);
        assert!(matches!(
            "RANDOM_RULE".parse::<ModifierId>(),
            Err(Error::UnknownModifier(_))
        ));
    }

    #[test]
    fn modifier_reports_its_catalog_id() {
        assert_eq!(Modifier::reroll_ones(Characteristic::ToHit).id(), ModifierId::RerollOnes);
        assert_eq!(Modifier::auto_wound(6, true).id(), ModifierId::AutoWound);
        assert_eq!(TargetModifier::feel_no_pain(5).id(), ModifierId::TargetFeelNoPain);
    }

    #[test]
    fn branching_rules_convert_to_bonus() {
        let leader = Modifier::leader_bonus(Characteristic::Damage, 1, 1);
        assert_eq!(leader.as_bonus(), Some(Modifier::bonus(Characteristic::Damage, 1)));

        let cb = Modifier::conditional_bonus(Characteristic::ToHit, 6, true, 1, Characteristic::Rend);
        assert_eq!(cb.as_bonus(), Some(Modifier::bonus(Characteristic::Rend, 1)));

        assert_eq!(Modifier::reroll(Characteristic::ToHit).as_bonus(), None);
    }

    #[test]
    fn trigger_thresholds_follow_roll_bonus_unless_unmodified() {
        assert_eq!(Trigger::new(6, true).natural_threshold(1), 6);
        assert_eq!(Trigger::new(6, false).natural_threshold(1), 5);
        assert_eq!(Trigger::new(6, false).natural_threshold(-1), 7);
        assert_eq!(Trigger::new(9, true).on, 6);
    }

    #[test]
    fn reroll_rates() {
        assert!((RerollScope::Failed.rate(2.0 / 3.0) - 1.0 / 3.0).abs() < 1e-12);
        assert!((RerollScope::Ones.rate(0.5) - 1.0 / 6.0).abs() < 1e-12);
        assert!(RerollScope::Ones.allows(1));
        assert!(!RerollScope::Ones.allows(2));
    }

    #[test]
    fn catalog_lists_every_rule() {
        let entries = catalog();
        assert_eq!(entries.len(), ModifierId::ALL.len());
        assert!(entries.iter().all(|entry| !entry.characteristics.is_empty()));
    }
}
