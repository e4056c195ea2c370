//! Defending side: a save characteristic plus the rules that mitigate damage.

use crate::combat::dice::{Die, MIN_THRESHOLD};
use crate::combat::modifiers::{RerollScope, TargetEffect, TargetModifier};
use crate::combat::profile::WeaponProfile;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Target {
    /// Save roll needed; 0 means no save.
    pub save: u8,
    pub modifiers: Vec<TargetModifier>,
}

impl Target {
    pub fn new(save: u8, modifiers: Vec<TargetModifier>) -> Self {
        Self { save, modifiers }
    }

    pub fn no_save() -> Self {
        Self::default()
    }

    pub fn active_modifiers(&self) -> impl Iterator<Item = &TargetModifier> {
        self.modifiers.iter().filter(|modifier| modifier.active)
    }

    fn is_ethereal(&self) -> bool {
        self.active_modifiers()
            .any(|modifier| modifier.effect == TargetEffect::Ethereal)
    }

    pub fn reroll(&self) -> Option<RerollScope> {
        self.active_modifiers().find_map(|modifier| match modifier.effect {
            TargetEffect::Reroll(scope) => Some(scope),
            _ => None,
        })
    }

    /// Save-after-save threshold; `mortal` selects the mortal-wound-only rule.
    pub fn save_after_save(&self, mortal: bool) -> Option<u8> {
        self.active_modifiers().find_map(|modifier| match modifier.effect {
            TargetEffect::MortalNegate { on } if mortal => Some(on),
            TargetEffect::FeelNoPain { on } if !mortal => Some(on),
            _ => None,
        })
    }

    /// Natural save roll needed against `rend`, or `None` when no save is possible.
    pub fn save_threshold(&self, rend: i32) -> Option<i32> {
        if self.save == 0 {
            return None;
        }
        let rend = if self.is_ethereal() { 0 } else { rend.max(0) };
        let threshold = (self.save as i32 + rend).max(MIN_THRESHOLD);
        (threshold <= Die::D6.sides() as i32).then_some(threshold)
    }

    /// Chance a wound from `profile` is saved, rerolls included.
    pub fn resolve_save(&self, profile: &WeaponProfile) -> f64 {
        let Some(threshold) = self.save_threshold(profile.rend(None)) else {
            return 0.0;
        };
        let success = Die::D6.probability_at_least(threshold);
        let rate = self.reroll().map_or(0.0, |scope| scope.rate(success));
        (success * (1.0 + rate)).clamp(0.0, 1.0)
    }

    /// Share of mortal-wound damage negated: the mortal-only rule, then feel-no-pain.
    pub fn resolve_mortal_save(&self) -> f64 {
        let mortal = self
            .save_after_save(true)
            .map_or(0.0, |on| Die::D6.probability_at_least(on as i32));
        1.0 - (1.0 - mortal) * (1.0 - self.resolve_fnp())
    }

    /// Share of damage negated by feel-no-pain.
    pub fn resolve_fnp(&self) -> f64 {
        self.save_after_save(false)
            .map_or(0.0, |on| Die::D6.probability_at_least(on as i32))
    }
}
