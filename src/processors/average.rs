//! Closed-form expected damage for one weapon profile against one target.
//!
//! Each stage turns an expected count into the next one. Rules that divert
//! rolls out of the normal stream (mortal wounds instead of the attack,
//! auto-wounds, conditional bonuses) each take only the band of natural rolls
//! that the simulation would route to them, so the two processors agree.

use crate::combat::{Characteristic, MortalWounds, Target, Trigger, WeaponProfile};

/// Natural rolls at or above the cutoff have already left the normal stream.
const NO_CUTOFF: i32 = i32::MAX;

#[derive(Debug, Clone, Copy)]
pub struct AverageDamageProcessor<'a> {
    profile: &'a WeaponProfile,
    target: &'a Target,
}

impl<'a> AverageDamageProcessor<'a> {
    pub fn new(profile: &'a WeaponProfile, target: &'a Target) -> Self {
        Self { profile, target }
    }

    pub fn average_damage(&self) -> f64 {
        if let Some((remainder, leaders)) = self.profile.leader_split() {
            return AverageDamageProcessor::new(&remainder, self.target).average_damage()
                + AverageDamageProcessor::new(&leaders, self.target).average_damage();
        }

        let attacks = self.profile.num_models as f64 * self.profile.attacks(None);
        self.resolve_hits(attacks)
    }

    fn trigger_probability(&self, characteristic: Characteristic, trigger: Trigger) -> f64 {
        let threshold = self.profile.trigger_threshold(characteristic, trigger);
        self.profile
            .band_probability(characteristic, threshold, NO_CUTOFF)
    }

    fn mortal_damage(&self, triggered: f64, mortal: &MortalWounds) -> f64 {
        let damage = triggered * mortal.mortal_wounds.average().max(0.0);
        (damage * (1.0 - self.target.resolve_mortal_save())).max(0.0)
    }

    pub fn resolve_hits(&self, attacks: f64) -> f64 {
        let stage = Characteristic::ToHit;
        let profile = self.profile;

        let mut hits = attacks * profile.success_probability(stage);
        if let Some(exploding) = profile.exploding(stage) {
            hits += attacks
                * self.trigger_probability(stage, exploding.trigger)
                * exploding.extra_hits.average().max(0.0);
        }

        let mut cutoff = NO_CUTOFF;
        let mut mortal_damage = 0.0;
        if let Some(mortal) = profile.mortal_wounds(stage) {
            let threshold = profile.trigger_threshold(stage, mortal.trigger);
            let mortal_hits = attacks * profile.band_probability(stage, threshold, cutoff);
            mortal_damage = self.mortal_damage(mortal_hits, &mortal);
            if !mortal.in_addition {
                hits -= mortal_hits;
                cutoff = threshold;
            }
        }

        let mut auto_wounds = 0.0;
        if let Some(trigger) = profile.auto_wound() {
            let threshold = profile.trigger_threshold(stage, trigger);
            auto_wounds = attacks * profile.band_probability(stage, threshold, cutoff);
            hits -= auto_wounds;
            cutoff = cutoff.min(threshold);
        }

        let mut split_damage = 0.0;
        if let Some((modifier, cb)) = profile.conditional_bonus(stage) {
            let threshold = profile.trigger_threshold(stage, cb.trigger);
            let split_hits = attacks * profile.band_probability(stage, threshold, cutoff);
            let split = profile.split_profile(&[*modifier], modifier.as_bonus());
            split_damage =
                AverageDamageProcessor::new(&split, self.target).resolve_wounds(split_hits, 0.0);
            hits -= split_hits;
        }

        self.resolve_wounds(hits.max(0.0), auto_wounds) + mortal_damage + split_damage
    }

    pub fn resolve_wounds(&self, hits: f64, auto_wounds: f64) -> f64 {
        let stage = Characteristic::ToWound;
        let profile = self.profile;

        let mut wounds = hits * profile.success_probability(stage);
        if let Some(exploding) = profile.exploding(stage) {
            wounds += hits
                * self.trigger_probability(stage, exploding.trigger)
                * exploding.extra_hits.average().max(0.0);
        }

        let mut cutoff = NO_CUTOFF;
        let mut mortal_damage = 0.0;
        if let Some(mortal) = profile.mortal_wounds(stage) {
            let threshold = profile.trigger_threshold(stage, mortal.trigger);
            let mortal_wounds = hits * profile.band_probability(stage, threshold, cutoff);
            mortal_damage = self.mortal_damage(mortal_wounds, &mortal);
            if !mortal.in_addition {
                wounds -= mortal_wounds;
                cutoff = threshold;
            }
        }

        let mut split_damage = 0.0;
        if let Some((modifier, cb)) = profile.conditional_bonus(stage) {
            let threshold = profile.trigger_threshold(stage, cb.trigger);
            let split_wounds = hits * profile.band_probability(stage, threshold, cutoff);
            let split = profile.split_profile(&[*modifier], modifier.as_bonus());
            split_damage = AverageDamageProcessor::new(&split, self.target).resolve_saves(split_wounds);
            wounds -= split_wounds;
        }

        self.resolve_saves(wounds.max(0.0) + auto_wounds) + mortal_damage + split_damage
    }

    pub fn resolve_saves(&self, wounds: f64) -> f64 {
        let saved = wounds * self.target.resolve_save(self.profile);
        self.resolve_damage(wounds - saved)
    }

    pub fn resolve_damage(&self, unsaved: f64) -> f64 {
        let damage = unsaved * self.profile.damage(None);
        (damage - damage * self.target.resolve_fnp()).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{Modifier, TargetModifier};

    fn approx_eq(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "expected {b}, got {a}");
    }

    fn average(profile: &WeaponProfile, target: &Target) -> f64 {
        AverageDamageProcessor::new(profile, target).average_damage()
    }

    #[test]
    fn plain_profile_multiplies_stage_probabilities() {
        let profile = WeaponProfile::new(1, 1, 4, 4, 0, 1);
        approx_eq(average(&profile, &Target::new(4, vec![])), 0.125, 1e-12);
    }

    #[test]
    fn zero_models_deal_nothing() {
        let profile = WeaponProfile::new(0, 3, 3, 3, 1, 2);
        approx_eq(average(&profile, &Target::no_save()), 0.0, 1e-12);
    }

    #[test]
    fn mortal_wounds_instead_of_hit_divert_the_sixes() {
        let profile = WeaponProfile::new(1, 1, 4, 4, 0, 1).with_modifiers(vec![
            Modifier::mortal_wounds(Characteristic::ToHit, 6, true, 1, false),
        ]);
        let target = Target::no_save();
        let processor = AverageDamageProcessor::new(&profile, &target);
        // 2/6 of rolls hit normally, 1/6 becomes one mortal wound.
        approx_eq(processor.resolve_hits(1.0), (2.0 / 6.0) * 0.5 + 1.0 / 6.0, 1e-12);
    }

    #[test]
    fn auto_wound_skips_the_wound_roll() {
        let profile = WeaponProfile::new(1, 6, 4, 4, 0, 1)
            .with_modifiers(vec![Modifier::auto_wound(6, true)]);
        // 2 normal hits wound on 4+, 1 automatic wound.
        approx_eq(average(&profile, &Target::no_save()), 2.0, 1e-12);
    }

    #[test]
    fn conditional_bonus_only_improves_the_triggering_rolls() {
        let profile = WeaponProfile::new(1, 6, 4, 4, 0, 1).with_modifiers(vec![
            Modifier::conditional_bonus(Characteristic::ToHit, 6, true, 1, Characteristic::Damage),
        ]);
        // 2 normal hits at damage 1, 1 bonus hit at damage 2, each wounding on 4+.
        approx_eq(average(&profile, &Target::no_save()), 2.0, 1e-12);
    }

    #[test]
    fn exploding_feeds_the_next_stage() {
        let profile = WeaponProfile::new(1, 6, 4, 4, 0, 1)
            .with_modifiers(vec![Modifier::exploding(Characteristic::ToHit, 6, true, 1)]);
        approx_eq(average(&profile, &Target::no_save()), 2.0, 1e-12);
    }

    #[test]
    fn feel_no_pain_scales_damage() {
        let profile = WeaponProfile::new(1, 6, 2, 2, 0, 1);
        let target = Target::new(0, vec![TargetModifier::feel_no_pain(4)]);
        approx_eq(
            average(&profile, &target),
            6.0 * (5.0 / 6.0) * (5.0 / 6.0) * 0.5,
            1e-12,
        );
    }
}
