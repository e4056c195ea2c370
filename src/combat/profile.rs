//! Attacking weapon profile: base characteristics plus the rules attached to them.

use crate::combat::characteristic::Characteristic;
use crate::combat::dice::{Amount, Die, MIN_THRESHOLD};
use crate::combat::modifiers::{
    ConditionalBonus, Exploding, Modifier, ModifierEffect, MortalWounds, RerollScope, Trigger,
};
use crate::combat::rng::DiceRng;

#[derive(Debug, Clone, PartialEq)]
pub struct WeaponProfile {
    pub num_models: u32,
    pub attacks: Amount,
    pub to_hit: u8,
    pub to_wound: u8,
    pub rend: u32,
    pub damage: Amount,
    pub modifiers: Vec<Modifier>,
}

impl WeaponProfile {
    pub fn new(
        num_models: u32,
        attacks: impl Into<Amount>,
        to_hit: u8,
        to_wound: u8,
        rend: u32,
        damage: impl Into<Amount>,
    ) -> Self {
        Self {
            num_models,
            attacks: attacks.into(),
            to_hit,
            to_wound,
            rend,
            damage: damage.into(),
            modifiers: Vec::new(),
        }
    }

    pub fn with_modifiers(self, modifiers: Vec<Modifier>) -> Self {
        Self { modifiers, ..self }
    }

    pub fn with_models(self, num_models: u32) -> Self {
        Self { num_models, ..self }
    }

    pub fn active_modifiers(&self) -> impl Iterator<Item = &Modifier> {
        self.modifiers.iter().filter(|modifier| modifier.active)
    }

    fn find_effect<T>(
        &self,
        characteristic: Characteristic,
        pick: impl Fn(&ModifierEffect) -> Option<T>,
    ) -> Option<T> {
        self.active_modifiers()
            .filter(|modifier| modifier.characteristic == characteristic)
            .find_map(|modifier| pick(&modifier.effect))
    }

    /// Sum of active flat bonuses on `characteristic`; sampled when `rng` is supplied.
    pub fn bonus(&self, characteristic: Characteristic, mut rng: Option<&mut DiceRng>) -> f64 {
        let mut total = 0.0;
        for modifier in self.active_modifiers() {
            if modifier.characteristic != characteristic {
                continue;
            }
            if let ModifierEffect::Bonus(amount) = modifier.effect {
                total += amount.resolve(rng.as_deref_mut());
            }
        }
        total
    }

    /// Bonus added to the dice rolled for a threshold characteristic.
    pub fn roll_bonus(&self, characteristic: Characteristic) -> i32 {
        self.bonus(characteristic, None).round() as i32
    }

    /// Natural roll needed to pass a hit or wound roll. Never below 2; above 6 means impossible.
    pub fn threshold(&self, characteristic: Characteristic) -> i32 {
        let base = match characteristic {
            Characteristic::ToHit => self.to_hit as i32,
            Characteristic::ToWound => self.to_wound as i32,
            _ => return MIN_THRESHOLD,
        };
        (base - self.roll_bonus(characteristic)).max(MIN_THRESHOLD)
    }

    /// Effective value of a characteristic: expected when `rng` is `None`, sampled otherwise.
    pub fn characteristic(&self, characteristic: Characteristic, mut rng: Option<&mut DiceRng>) -> f64 {
        match characteristic {
            Characteristic::Attacks => (self.attacks.resolve(rng.as_deref_mut())
                + self.bonus(characteristic, rng))
            .max(0.0),
            Characteristic::ToHit | Characteristic::ToWound => self.threshold(characteristic) as f64,
            Characteristic::Rend => (self.rend as f64 + self.bonus(characteristic, rng)).max(0.0),
            Characteristic::Damage => (self.damage.resolve(rng.as_deref_mut())
                + self.bonus(characteristic, rng))
            .max(0.0),
            Characteristic::Save => 0.0,
        }
    }

    pub fn attacks(&self, rng: Option<&mut DiceRng>) -> f64 {
        self.characteristic(Characteristic::Attacks, rng)
    }

    pub fn rend(&self, rng: Option<&mut DiceRng>) -> i32 {
        self.characteristic(Characteristic::Rend, rng).round() as i32
    }

    pub fn damage(&self, rng: Option<&mut DiceRng>) -> f64 {
        self.characteristic(Characteristic::Damage, rng)
    }

    /// Highest value attacks or damage can reach, every die showing its top face.
    pub fn max_value(&self, characteristic: Characteristic) -> u64 {
        let base = match characteristic {
            Characteristic::Attacks => self.attacks.max(),
            Characteristic::Damage => self.damage.max(),
            _ => return 0,
        };
        let bonus: i64 = self
            .active_modifiers()
            .filter(|modifier| modifier.characteristic == characteristic)
            .filter_map(|modifier| match modifier.effect {
                ModifierEffect::Bonus(amount) => Some(amount.max()),
                _ => None,
            })
            .sum();
        base.saturating_add(bonus).max(0) as u64
    }

    pub fn reroll(&self, characteristic: Characteristic) -> Option<RerollScope> {
        self.find_effect(characteristic, |effect| match *effect {
            ModifierEffect::Reroll(scope) => Some(scope),
            _ => None,
        })
    }

    pub fn exploding(&self, characteristic: Characteristic) -> Option<Exploding> {
        self.find_effect(characteristic, |effect| match *effect {
            ModifierEffect::Exploding(exploding) => Some(exploding),
            _ => None,
        })
    }

    pub fn mortal_wounds(&self, characteristic: Characteristic) -> Option<MortalWounds> {
        self.find_effect(characteristic, |effect| match *effect {
            ModifierEffect::MortalWounds(mortal) => Some(mortal),
            _ => None,
        })
    }

    pub fn auto_wound(&self) -> Option<Trigger> {
        self.find_effect(Characteristic::ToHit, |effect| match *effect {
            ModifierEffect::AutoWound(trigger) => Some(trigger),
            _ => None,
        })
    }

    pub fn conditional_bonus(
        &self,
        characteristic: Characteristic,
    ) -> Option<(&Modifier, ConditionalBonus)> {
        self.active_modifiers()
            .filter(|modifier| modifier.characteristic == characteristic)
            .find_map(|modifier| match modifier.effect {
                ModifierEffect::ConditionalBonus(cb) => Some((modifier, cb)),
                _ => None,
            })
    }

    pub fn leader_modifiers(&self) -> Vec<&Modifier> {
        self.active_modifiers()
            .filter(|modifier| modifier.leader().is_some())
            .collect()
    }

    /// Natural roll that fires `trigger` on the hit or wound roll; it must also pass the roll.
    pub fn trigger_threshold(&self, characteristic: Characteristic, trigger: Trigger) -> i32 {
        trigger
            .natural_threshold(self.roll_bonus(characteristic))
            .max(self.threshold(characteristic))
    }

    fn reroll_rate(&self, characteristic: Characteristic) -> f64 {
        let success = Die::D6.probability_at_least(self.threshold(characteristic));
        self.reroll(characteristic)
            .map_or(0.0, |scope| scope.rate(success))
    }

    /// Chance a hit or wound roll passes, rerolls included.
    pub fn success_probability(&self, characteristic: Characteristic) -> f64 {
        self.band_probability(characteristic, self.threshold(characteristic), i32::MAX)
    }

    /// Chance the final natural roll lands in `low..high`, rerolls included.
    ///
    /// Only meaningful for bands at or above the stage threshold: rerolls only pick up failures.
    pub fn band_probability(&self, characteristic: Characteristic, low: i32, high: i32) -> f64 {
        let first = Die::D6.probability_between(low, high.min(Die::D6.sides() as i32 + 1));
        (first * (1.0 + self.reroll_rate(characteristic))).clamp(0.0, 1.0)
    }

    /// Transient copy without `excluded` rules and with `extra` appended.
    pub fn split_profile(
        &self,
        excluded: &[Modifier],
        extra: impl IntoIterator<Item = Modifier>,
    ) -> WeaponProfile {
        let mut modifiers: Vec<Modifier> = self
            .modifiers
            .iter()
            .filter(|modifier| !excluded.contains(modifier))
            .copied()
            .collect();
        modifiers.extend(extra);
        WeaponProfile {
            modifiers,
            ..self.clone()
        }
    }

    /// Splits off the leader models: `(remainder, leaders)`, both without leader rules.
    pub fn leader_split(&self) -> Option<(WeaponProfile, WeaponProfile)> {
        let leader_modifiers: Vec<Modifier> = self.leader_modifiers().into_iter().copied().collect();
        let num_leaders = leader_modifiers.first()?.leader()?.num_leaders.min(self.num_models);

        let remainder = self
            .split_profile(&leader_modifiers, [])
            .with_models(self.num_models - num_leaders);
        let leaders = self
            .split_profile(
                &leader_modifiers,
                leader_modifiers.iter().filter_map(Modifier::as_bonus),
            )
            .with_models(num_leaders);
        Some((remainder, leaders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "expected {b}, got {a}");
    }

    #[test]
    fn bonuses_improve_thresholds_and_raise_values() {
        let profile = WeaponProfile::new(1, 2, 4, 4, 1, 1).with_modifiers(vec![
            Modifier::bonus(Characteristic::ToHit, 1),
            Modifier::bonus(Characteristic::Rend, 1),
            Modifier::bonus(Characteristic::Damage, 1),
            Modifier::bonus(Characteristic::Attacks, 1).with_active(false),
        ]);
        assert_eq!(profile.threshold(Characteristic::ToHit), 3);
        assert_eq!(profile.threshold(Characteristic::ToWound), 4);
        assert_eq!(profile.rend(None), 2);
        approx_eq(profile.damage(None), 2.0);
        approx_eq(profile.attacks(None), 2.0);
    }

    #[test]
    fn thresholds_never_drop_below_two() {
        let profile = WeaponProfile::new(1, 1, 2, 3, 0, 1)
            .with_modifiers(vec![Modifier::bonus(Characteristic::ToHit, 2)]);
        assert_eq!(profile.threshold(Characteristic::ToHit), 2);
    }

    #[test]
    fn negative_bonus_can_make_a_roll_impossible() {
        let profile = WeaponProfile::new(1, 1, 6, 4, 0, 1)
            .with_modifiers(vec![Modifier::bonus(Characteristic::ToHit, -1)]);
        assert_eq!(profile.threshold(Characteristic::ToHit), 7);
        approx_eq(profile.success_probability(Characteristic::ToHit), 0.0);
    }

    #[test]
    fn reroll_adds_fail_times_success() {
        let profile = WeaponProfile::new(1, 1, 3, 4, 0, 1)
            .with_modifiers(vec![Modifier::reroll(Characteristic::ToHit)]);
        approx_eq(profile.success_probability(Characteristic::ToHit), 8.0 / 9.0);

        let ones = WeaponProfile::new(1, 1, 4, 4, 0, 1)
            .with_modifiers(vec![Modifier::reroll_ones(Characteristic::ToWound)]);
        approx_eq(
            ones.success_probability(Characteristic::ToWound),
            0.5 + 0.5 / 6.0,
        );
    }

    #[test]
    fn modified_trigger_moves_with_roll_bonus() {
        let profile = WeaponProfile::new(1, 1, 4, 4, 0, 1)
            .with_modifiers(vec![Modifier::bonus(Characteristic::ToHit, 1)]);
        assert_eq!(profile.trigger_threshold(Characteristic::ToHit, Trigger::new(6, false)), 5);
        assert_eq!(profile.trigger_threshold(Characteristic::ToHit, Trigger::new(6, true)), 6);
        // A trigger below the stage threshold still needs the roll to succeed.
        assert_eq!(profile.trigger_threshold(Characteristic::ToWound, Trigger::new(2, true)), 4);
    }

    #[test]
    fn split_profile_swaps_modifiers_without_touching_original() {
        let cb = Modifier::conditional_bonus(Characteristic::ToHit, 6, true, 1, Characteristic::Rend);
        let profile = WeaponProfile::new(3, 2, 3, 3, 0, 1).with_modifiers(vec![cb]);
        let split = profile.split_profile(&[cb], cb.as_bonus());

        assert_eq!(profile.modifiers, vec![cb]);
        assert_eq!(split.modifiers, vec![Modifier::bonus(Characteristic::Rend, 1)]);
        assert_eq!(split.num_models, 3);
        assert_eq!(split.rend(None), 1);
    }

    #[test]
    fn leader_split_partitions_models() {
        let profile = WeaponProfile::new(10, 2, 4, 4, 0, 1).with_modifiers(vec![
            Modifier::leader_extra_attacks(1, 1),
            Modifier::reroll(Characteristic::ToHit),
        ]);
        let (remainder, leaders) = profile.leader_split().unwrap();
        assert_eq!(remainder.num_models, 9);
        assert_eq!(leaders.num_models, 1);
        approx_eq(remainder.attacks(None), 2.0);
        approx_eq(leaders.attacks(None), 3.0);
        assert!(remainder.leader_modifiers().is_empty());
        assert!(leaders.reroll(Characteristic::ToHit).is_some());
    }

    #[test]
    fn leader_count_is_capped_by_models() {
        let profile = WeaponProfile::new(1, 2, 4, 4, 0, 1)
            .with_modifiers(vec![Modifier::leader_extra_attacks(1, 3)]);
        let (remainder, leaders) = profile.leader_split().unwrap();
        assert_eq!(remainder.num_models, 0);
        assert_eq!(leaders.num_models, 1);
        assert!(WeaponProfile::new(1, 1, 4, 4, 0, 1).leader_split().is_none());
    }
}
