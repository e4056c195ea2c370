//! Upper bound on damage: every attack lands on its best achievable natural
//! roll, every die shows its top face, and nothing is saved or negated.
//!
//! Paths are summed in saturating `u64`; the result saturates at `u32::MAX`,
//! which still bounds every simulated total.

use crate::combat::{Characteristic, Die, Trigger, WeaponProfile};

#[derive(Debug, Clone, Copy)]
pub struct MaxDamageProcessor<'a> {
    profile: &'a WeaponProfile,
}

impl<'a> MaxDamageProcessor<'a> {
    pub fn new(profile: &'a WeaponProfile) -> Self {
        Self { profile }
    }

    pub fn max_damage(&self) -> u32 {
        u32::try_from(self.ceiling()).unwrap_or(u32::MAX)
    }

    fn ceiling(&self) -> u64 {
        if let Some((remainder, leaders)) = self.profile.leader_split() {
            return MaxDamageProcessor::new(&remainder)
                .ceiling()
                .saturating_add(MaxDamageProcessor::new(&leaders).ceiling());
        }
        let attacks = self.profile.max_value(Characteristic::Attacks);
        (self.profile.num_models as u64)
            .saturating_mul(attacks)
            .saturating_mul(self.hit_path())
    }

    fn natural_rolls(&self, characteristic: Characteristic) -> impl Iterator<Item = u32> {
        let low = self.profile.threshold(characteristic).max(1) as u32;
        low..=Die::D6.sides()
    }

    fn fires(&self, characteristic: Characteristic, trigger: Trigger, roll: u32) -> bool {
        roll as i32 >= self.profile.trigger_threshold(characteristic, trigger)
    }

    fn hit_path(&self) -> u64 {
        self.natural_rolls(Characteristic::ToHit)
            .map(|roll| self.hit_outcome(roll))
            .max()
            .unwrap_or(0)
    }

    fn hit_outcome(&self, roll: u32) -> u64 {
        let stage = Characteristic::ToHit;
        let profile = self.profile;

        let mut damage: u64 = 0;
        if let Some(exploding) = profile.exploding(stage) {
            if self.fires(stage, exploding.trigger, roll) {
                let extra = exploding.extra_hits.max().max(0) as u64;
                damage = damage.saturating_add(extra.saturating_mul(self.wound_path()));
            }
        }
        if let Some(mortal) = profile.mortal_wounds(stage) {
            if self.fires(stage, mortal.trigger, roll) {
                damage = damage.saturating_add(mortal.mortal_wounds.max().max(0) as u64);
                if !mortal.in_addition {
                    return damage;
                }
            }
        }
        if let Some(trigger) = profile.auto_wound() {
            if self.fires(stage, trigger, roll) {
                return damage.saturating_add(self.save_path());
            }
        }
        if let Some((modifier, cb)) = profile.conditional_bonus(stage) {
            if self.fires(stage, cb.trigger, roll) {
                let split = profile.split_profile(&[*modifier], modifier.as_bonus());
                return damage.saturating_add(MaxDamageProcessor::new(&split).wound_path());
            }
        }
        damage.saturating_add(self.wound_path())
    }

    fn wound_path(&self) -> u64 {
        self.natural_rolls(Characteristic::ToWound)
            .map(|roll| self.wound_outcome(roll))
            .max()
            .unwrap_or(0)
    }

    fn wound_outcome(&self, roll: u32) -> u64 {
        let stage = Characteristic::ToWound;
        let profile = self.profile;

        let mut damage: u64 = 0;
        if let Some(exploding) = profile.exploding(stage) {
            if self.fires(stage, exploding.trigger, roll) {
                let extra = exploding.extra_hits.max().max(0) as u64;
                damage = damage.saturating_add(extra.saturating_mul(self.save_path()));
            }
        }
        if let Some(mortal) = profile.mortal_wounds(stage) {
            if self.fires(stage, mortal.trigger, roll) {
                damage = damage.saturating_add(mortal.mortal_wounds.max().max(0) as u64);
                if !mortal.in_addition {
                    return damage;
                }
            }
        }
        if let Some((modifier, cb)) = profile.conditional_bonus(stage) {
            if self.fires(stage, cb.trigger, roll) {
                let split = profile.split_profile(&[*modifier], modifier.as_bonus());
                return damage.saturating_add(MaxDamageProcessor::new(&split).save_path());
            }
        }
        damage.saturating_add(self.save_path())
    }

    fn save_path(&self) -> u64 {
        self.profile.max_value(Characteristic::Damage)
    }
}
