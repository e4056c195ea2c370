use statshammer::aggregate::export_csv::write_buckets;
use statshammer::aggregate::{
    compute_average_damage, compute_max_damage, compute_simulation, IncomingDamage,
    SimulationResult, Unit, DEFAULT_SIMULATIONS,
};
use statshammer::combat::{
    Characteristic, DiceRng, Die, Modifier, Target, TargetModifier, WeaponProfile,
};
use statshammer::parallel::WorkerPool;

fn hearthguard_poleaxes() -> Vec<WeaponProfile> {
    vec![WeaponProfile::new(20, 2, 3, 3, 0, 1).with_modifiers(vec![
        Modifier::leader_extra_attacks(1, 1),
        Modifier::mortal_wounds(Characteristic::ToHit, 6, true, 2, true),
    ])]
}

fn mixed_profiles() -> Vec<WeaponProfile> {
    vec![
        WeaponProfile::new(3, 2, 3, 4, 1, Die::D3).with_modifiers(vec![
            Modifier::exploding(Characteristic::ToHit, 6, true, 1),
            Modifier::conditional_bonus(Characteristic::ToWound, 6, true, 2, Characteristic::Rend),
        ]),
        WeaponProfile::new(1, 4, 4, 3, 2, 2).with_modifiers(vec![
            Modifier::reroll(Characteristic::ToHit),
            Modifier::auto_wound(6, true),
        ]),
    ]
}

fn assert_bucket_invariants(result: &SimulationResult, runs: u64) {
    let max = result.metrics.max;
    assert!(result.buckets.len() as u32 >= max + 2);
    for (expected, bucket) in result.buckets.iter().enumerate() {
        assert_eq!(bucket.damage, expected as u32, "buckets must be contiguous from 0");
    }
    assert_eq!(result.runs(), runs);

    let total: f64 = result.buckets.iter().map(|bucket| bucket.probability).sum();
    assert!((total - 100.0).abs() <= 0.5, "probabilities sum to {total}");

    for bucket in result.buckets.iter().filter(|bucket| bucket.count > 0) {
        assert!(bucket.damage <= max, "observed {} above max {max}", bucket.damage);
    }
}

#[test]
fn simulation_buckets_cover_zero_through_max_plus_one() {
    let profiles = mixed_profiles();
    let mut rng = DiceRng::new(5);
    let result = compute_simulation(&profiles, &Target::new(4, vec![]), Some(3_000), &mut rng);

    assert_eq!(result.metrics.max, compute_max_damage(&profiles));
    assert_eq!(result.buckets.len() as u32, result.metrics.max + 2);
    assert_bucket_invariants(&result, 3_000);
}

#[test]
fn default_simulation_count_is_used_when_unspecified() {
    let mut rng = DiceRng::new(1);
    let result = compute_simulation(&hearthguard_poleaxes(), &Target::no_save(), None, &mut rng);
    assert_eq!(result.runs(), DEFAULT_SIMULATIONS as u64);
}

/// Rule combinations whose simulated mean must track the closed-form average.
fn convergence_cases() -> Vec<(&'static str, Vec<WeaponProfile>, Target)> {
    use Characteristic::{Damage, Rend, ToHit, ToWound};

    vec![
        ("leader and mortal wounds", hearthguard_poleaxes(), Target::new(4, vec![])),
        ("mixed profiles", mixed_profiles(), Target::new(3, vec![])),
        (
            "mortal wounds instead of hit beside conditional bonus",
            vec![WeaponProfile::new(10, 2, 3, 4, 0, 1).with_modifiers(vec![
                Modifier::mortal_wounds(ToHit, 6, true, Die::D3, false),
                Modifier::conditional_bonus(ToHit, 5, true, 1, Damage),
            ])],
            Target::new(4, vec![]),
        ),
        (
            "mortal wounds instead of hit beside auto wound",
            vec![WeaponProfile::new(10, 2, 4, 4, 1, 1).with_modifiers(vec![
                Modifier::mortal_wounds(ToHit, 6, true, 2, false),
                Modifier::auto_wound(5, true),
            ])],
            Target::new(4, vec![]),
        ),
        (
            "modified triggers under roll bonuses",
            vec![WeaponProfile::new(10, 2, 4, 4, 0, 1).with_modifiers(vec![
                Modifier::bonus(ToHit, 1),
                Modifier::bonus(ToWound, 1),
                Modifier::exploding(ToHit, 6, false, 1),
                Modifier::mortal_wounds(ToWound, 6, false, 1, true),
            ])],
            Target::new(5, vec![]),
        ),
        (
            "reroll ones with auto wound and exploding wounds",
            vec![WeaponProfile::new(10, 2, 3, 4, 1, 1).with_modifiers(vec![
                Modifier::reroll_ones(ToHit),
                Modifier::auto_wound(6, true),
                Modifier::exploding(ToWound, 6, true, 1),
            ])],
            Target::new(4, vec![]),
        ),
        (
            "feel no pain and mortal negation",
            vec![WeaponProfile::new(10, 2, 3, 3, 1, 2).with_modifiers(vec![
                Modifier::mortal_wounds(ToWound, 6, true, Die::D3, true),
            ])],
            Target::new(
                4,
                vec![
                    TargetModifier::feel_no_pain(5),
                    TargetModifier::mortal_negate(5),
                    TargetModifier::reroll_ones(),
                ],
            ),
        ),
        (
            "ethereal target rerolling saves",
            vec![WeaponProfile::new(10, 2, 3, 3, 2, 1)],
            Target::new(5, vec![TargetModifier::reroll(), TargetModifier::ethereal()]),
        ),
        (
            "random damage with rend and damage bonuses",
            vec![WeaponProfile::new(5, Die::D3, 3, 4, 0, Die::D3).with_modifiers(vec![
                Modifier::bonus(Rend, 1),
                Modifier::bonus(Damage, Die::D3),
                Modifier::conditional_bonus(ToWound, 6, true, Die::D3, Damage),
            ])],
            Target::new(3, vec![]),
        ),
        (
            "negative hit bonus",
            vec![WeaponProfile::new(10, 3, 3, 4, 0, 1).with_modifiers(vec![
                Modifier::bonus(ToHit, -1),
                Modifier::reroll(ToWound),
                Modifier::exploding(ToHit, 6, true, 1),
            ])],
            Target::new(6, vec![]),
        ),
    ]
}

#[test]
fn simulated_mean_converges_to_average_damage() {
    for (name, profiles, target) in convergence_cases() {
        let expected = compute_average_damage(&profiles, &target, None);
        let mut rng = DiceRng::new(2024);
        let result = compute_simulation(&profiles, &target, Some(8_000), &mut rng);

        let tolerance = expected * 0.05;
        assert!(
            (result.metrics.mean - expected).abs() <= tolerance,
            "{name}: mean {} drifted from average {expected}",
            result.metrics.mean
        );
        assert!(result.metrics.variance > 0.0, "{name}: no spread");
        assert!(
            (result.metrics.standard_deviation - result.metrics.variance.sqrt()).abs() <= 0.01
        );
        assert_bucket_invariants(&result, 8_000);
    }
}

#[test]
fn simulation_is_reproducible_for_a_seed() {
    let profiles = mixed_profiles();
    let target = Target::new(5, vec![]);
    let first = compute_simulation(&profiles, &target, Some(500), &mut DiceRng::new(77));
    let second = compute_simulation(&profiles, &target, Some(500), &mut DiceRng::new(77));
    assert_eq!(first, second);
}

#[test]
fn parallel_simulation_ignores_worker_count() {
    let unit = Unit::new("Hearthguard Berzerkers", hearthguard_poleaxes());
    let target = Target::new(4, vec![]);

    let single = unit.run_simulations_parallel(&target, 2_000, 42, &WorkerPool::with_workers(1));
    let many = unit.run_simulations_parallel(&target, 2_000, 42, &WorkerPool::with_workers(4));
    assert_eq!(single, many);
    assert_bucket_invariants(&single, 2_000);

    let other_seed = unit.run_simulations_parallel(&target, 2_000, 43, &WorkerPool::with_workers(4));
    assert_ne!(single, other_seed);
}

#[test]
fn per_100_points_scales_by_unit_cost() {
    let mut unit = Unit::new("Hearthguard Berzerkers", hearthguard_poleaxes());
    unit.points = 200;
    let target = Target::new(4, vec![]);

    let raw = unit.average_damage(&target, false);
    let scaled = unit.average_damage(&target, true);
    assert!((scaled - raw / 2.0).abs() < 1e-9);

    unit.points = 0;
    let guarded = unit.average_damage(&target, true);
    assert!((guarded - raw * 100.0).abs() < 1e-9);
}

#[test]
fn effective_health_uses_the_units_own_save() {
    let mut unit = Unit::new("Mortek Guard", vec![]);
    unit.models = 10;
    unit.health = 1;
    unit.save = 4;

    // The reference attack deals 1 damage unsaved; a 4+ save halves it.
    assert!((unit.effective_health(IncomingDamage::Rend(0), false) - 20.0).abs() < 1e-9);
    // Rend 1 worsens the save to 5+.
    assert!((unit.effective_health(IncomingDamage::Rend(1), false) - 15.0).abs() < 1e-9);

    unit.points = 200;
    assert!((unit.effective_health(IncomingDamage::Rend(0), true) - 10.0).abs() < 1e-9);
}

#[test]
fn csv_export_lists_every_bucket_per_unit() {
    let profiles = hearthguard_poleaxes();
    let mut rng = DiceRng::new(3);
    let result = compute_simulation(&profiles, &Target::new(4, vec![]), Some(200), &mut rng);

    let mut out = Vec::new();
    write_buckets(&mut out, &[("Poleaxes", &result), ("Again", &result)])
        .expect("csv should be written");
    let text = String::from_utf8(out).expect("csv should be utf-8");
    let mut lines = text.lines();

    assert_eq!(lines.next(), Some("unit,damage,count,probability"));
    assert_eq!(lines.count(), result.buckets.len() * 2);
    assert!(text.contains("Poleaxes,0,"));
}
