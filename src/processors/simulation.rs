//! Dice-by-dice resolution of one weapon profile against one target.
//!
//! Rolls follow the same routing as the closed-form processor: a natural roll
//! that fires a diverting rule leaves the normal stream at that stage.

use crate::combat::{Characteristic, DiceRng, Die, MortalWounds, Target, Trigger, WeaponProfile};

#[derive(Debug, Clone, Copy)]
pub struct SimulationProcessor<'a> {
    profile: &'a WeaponProfile,
    target: &'a Target,
}

impl<'a> SimulationProcessor<'a> {
    pub fn new(profile: &'a WeaponProfile, target: &'a Target) -> Self {
        Self { profile, target }
    }

    /// Total damage dealt by one activation of every model in the profile.
    pub fn simulate(&self, rng: &mut DiceRng) -> u32 {
        if let Some((remainder, leaders)) = self.profile.leader_split() {
            return SimulationProcessor::new(&remainder, self.target)
                .simulate(rng)
                .saturating_add(SimulationProcessor::new(&leaders, self.target).simulate(rng));
        }

        let mut total: u32 = 0;
        for _ in 0..self.profile.num_models {
            let attacks = self.profile.attacks(Some(&mut *rng)).round() as u32;
            for _ in 0..attacks {
                total = total.saturating_add(self.resolve_hit_roll(rng));
            }
        }
        total
    }

    fn fires(&self, characteristic: Characteristic, trigger: Trigger, roll: u32) -> bool {
        roll as i32 >= self.profile.trigger_threshold(characteristic, trigger)
    }

    /// Rolls a hit or wound die, rerolling once if a rule allows it. Returns the final natural roll.
    pub fn perform_reroll(&self, characteristic: Characteristic, rng: &mut DiceRng) -> u32 {
        let roll = Die::D6.roll(rng);
        if (roll as i32) >= self.profile.threshold(characteristic) {
            return roll;
        }
        match self.profile.reroll(characteristic) {
            Some(scope) if scope.allows(roll) => Die::D6.roll(rng),
            _ => roll,
        }
    }

    /// Rolls a save die against `threshold`, rerolling once if the target allows it.
    pub fn perform_reroll_saves(&self, threshold: i32, rng: &mut DiceRng) -> u32 {
        let roll = Die::D6.roll(rng);
        if (roll as i32) >= threshold {
            return roll;
        }
        match self.target.reroll() {
            Some(scope) if scope.allows(roll) => Die::D6.roll(rng),
            _ => roll,
        }
    }

    pub fn resolve_hit_roll(&self, rng: &mut DiceRng) -> u32 {
        let stage = Characteristic::ToHit;
        let profile = self.profile;

        let roll = self.perform_reroll(stage, rng);
        if (roll as i32) < profile.threshold(stage) {
            return 0;
        }

        let mut damage: u32 = 0;
        if let Some(exploding) = profile.exploding(stage) {
            if self.fires(stage, exploding.trigger, roll) {
                let extra = exploding.extra_hits.roll(rng).max(0);
                for _ in 0..extra {
                    damage = damage.saturating_add(self.resolve_wound_roll(rng));
                }
            }
        }
        if let Some(mortal) = profile.mortal_wounds(stage) {
            if self.fires(stage, mortal.trigger, roll) {
                damage = damage.saturating_add(self.resolve_mortal_wounds(&mortal, rng));
                if !mortal.in_addition {
                    return damage;
                }
            }
        }
        if let Some(trigger) = profile.auto_wound() {
            if self.fires(stage, trigger, roll) {
                return damage.saturating_add(self.resolve_save_roll(rng));
            }
        }
        if let Some((modifier, cb)) = profile.conditional_bonus(stage) {
            if self.fires(stage, cb.trigger, roll) {
                let split = profile.split_profile(&[*modifier], modifier.as_bonus());
                let bonus_damage = SimulationProcessor::new(&split, self.target).resolve_wound_roll(rng);
                return damage.saturating_add(bonus_damage);
            }
        }
        damage.saturating_add(self.resolve_wound_roll(rng))
    }

    pub fn resolve_wound_roll(&self, rng: &mut DiceRng) -> u32 {
        let stage = Characteristic::ToWound;
        let profile = self.profile;

        let roll = self.perform_reroll(stage, rng);
        if (roll as i32) < profile.threshold(stage) {
            return 0;
        }

        let mut damage: u32 = 0;
        if let Some(exploding) = profile.exploding(stage) {
            if self.fires(stage, exploding.trigger, roll) {
                let extra = exploding.extra_hits.roll(rng).max(0);
                for _ in 0..extra {
                    damage = damage.saturating_add(self.resolve_save_roll(rng));
                }
            }
        }
        if let Some(mortal) = profile.mortal_wounds(stage) {
            if self.fires(stage, mortal.trigger, roll) {
                damage = damage.saturating_add(self.resolve_mortal_wounds(&mortal, rng));
                if !mortal.in_addition {
                    return damage;
                }
            }
        }
        if let Some((modifier, cb)) = profile.conditional_bonus(stage) {
            if self.fires(stage, cb.trigger, roll) {
                let split = profile.split_profile(&[*modifier], modifier.as_bonus());
                let bonus_damage = SimulationProcessor::new(&split, self.target).resolve_save_roll(rng);
                return damage.saturating_add(bonus_damage);
            }
        }
        damage.saturating_add(self.resolve_save_roll(rng))
    }

    pub fn resolve_save_roll(&self, rng: &mut DiceRng) -> u32 {
        let rend = self.profile.rend(Some(&mut *rng));
        if let Some(threshold) = self.target.save_threshold(rend) {
            if (self.perform_reroll_saves(threshold, rng) as i32) >= threshold {
                return 0;
            }
        }
        self.resolve_damage(rng)
    }

    pub fn resolve_damage(&self, rng: &mut DiceRng) -> u32 {
        let damage = self.profile.damage(Some(&mut *rng)).round() as u32;
        self.negate(damage, false, rng)
    }

    fn resolve_mortal_wounds(&self, mortal: &MortalWounds, rng: &mut DiceRng) -> u32 {
        let amount = mortal.mortal_wounds.roll(rng).max(0) as u32;
        let amount = self.negate(amount, true, rng);
        self.negate(amount, false, rng)
    }

    /// Rolls a save-after-save for every point of damage; `mortal` selects the mortal-only rule.
    fn negate(&self, damage: u32, mortal: bool, rng: &mut DiceRng) -> u32 {
        let Some(on) = self.target.save_after_save(mortal) else {
            return damage;
        };
        (0..damage)
            .filter(|_| (Die::D6.roll(rng) as i32) < on as i32)
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{Modifier, TargetModifier};

    fn mean(profile: &WeaponProfile, target: &Target, runs: u32) -> f64 {
        let mut rng = DiceRng::new(0x5eed);
        let processor = SimulationProcessor::new(profile, target);
        let total: u64 = (0..runs).map(|_| processor.simulate(&mut rng) as u64).sum();
        total as f64 / runs as f64
    }

    #[test]
    fn certain_attacks_always_land() {
        let profile = WeaponProfile::new(2, 3, 2, 2, 0, 2)
            .with_modifiers(vec![
                Modifier::bonus(Characteristic::ToHit, 5),
                Modifier::bonus(Characteristic::ToWound, 5),
            ]);
        let mut rng = DiceRng::new(1);
        // Natural ones still fail, so the result stays within the maximum.
        let damage = SimulationProcessor::new(&profile, &Target::no_save()).simulate(&mut rng);
        assert!(damage <= 12);
    }

    #[test]
    fn impossible_hit_roll_deals_nothing() {
        let profile = WeaponProfile::new(5, 4, 6, 4, 0, 1)
            .with_modifiers(vec![Modifier::bonus(Characteristic::ToHit, -1)]);
        let mut rng = DiceRng::new(9);
        let target = Target::no_save();
        let processor = SimulationProcessor::new(&profile, &target);
        assert!((0..200).all(|_| processor.simulate(&mut rng) == 0));
    }

    #[test]
    fn same_seed_gives_same_damage() {
        let profile = WeaponProfile::new(10, 2, 4, 4, 0, 1);
        let target = Target::new(4, vec![]);
        let processor = SimulationProcessor::new(&profile, &target);
        let mut a = DiceRng::new(42);
        let mut b = DiceRng::new(42);
        for _ in 0..50 {
            assert_eq!(processor.simulate(&mut a), processor.simulate(&mut b));
        }
    }

    #[test]
    fn simulated_mean_tracks_expectation() {
        let profile = WeaponProfile::new(1, 1, 4, 4, 0, 1);
        let observed = mean(&profile, &Target::new(4, vec![]), 40_000);
        assert!((observed - 0.125).abs() < 0.01, "observed {observed}");
    }

    #[test]
    fn feel_no_pain_removes_damage() {
        let profile = WeaponProfile::new(10, 2, 2, 2, 0, 1);
        let unprotected = mean(&profile, &Target::no_save(), 5_000);
        let protected = mean(
            &profile,
            &Target::new(0, vec![TargetModifier::feel_no_pain(2)]),
            5_000,
        );
        assert!(protected < unprotected * 0.3, "{protected} vs {unprotected}");
    }
}
