//! Reference and optimized engines must agree.
//!
//! Both engines draw from the generator in the same order, so for a given
//! seed their results are identical, not just statistically close.

use battle_core::prelude::*;
use battle_test_utils::determinism::strategies;
use battle_test_utils::fixtures::{
    deathstars_vs_probes, fleet, light_fighters_vs_rocket_launchers, mirror_match, mixed_assault,
    undefended_raid, Scenario,
};
use battle_test_utils::parity::{compare_exact, compare_statistically};
use battle_test_utils::proptest::prelude::*;

const SHIELD_MODELS: [ShieldModel; 2] = [ShieldModel::PerShot, ShieldModel::Depleting];
const TARGETING: [TargetSelection; 2] =
    [TargetSelection::UniformStack, TargetSelection::UnitWeighted];
const EXPLOSIONS: [ExplosionRule; 3] = [
    ExplosionRule::Disabled,
    ExplosionRule::HullThreshold {
        threshold_percent: 70,
    },
    ExplosionRule::Overkill {
        damage_multiple_percent: 150,
        chance_percent: 25,
    },
];

fn all_configs() -> Vec<BattleConfig> {
    let mut configs = Vec::new();
    for shields in SHIELD_MODELS {
        for targeting in TARGETING {
            for explosion in EXPLOSIONS {
                for rapid_fire in [true, false] {
                    configs.push(
                        BattleConfig::default()
                            .with_shield_model(shields)
                            .with_target_selection(targeting)
                            .with_explosion(explosion)
                            .with_rapid_fire(rapid_fire),
                    );
                }
            }
        }
    }
    configs
}

fn assert_identical_everywhere(scenario: &Scenario, seeds: &[u64]) {
    for config in all_configs() {
        for &seed in seeds {
            compare_exact(
                &ReferenceEngine,
                &OptimizedEngine,
                &scenario.input(),
                &config,
                seed,
            )
            .unwrap()
            .assert_identical();
        }
    }
}

// =============================================================================
// Same seed, same result
// =============================================================================

mod exact {
    use super::*;

    #[test]
    fn test_mixed_assault() {
        assert_identical_everywhere(&mixed_assault(), &[0, 1, 2]);
    }

    #[test]
    fn test_light_fighters_vs_rocket_launchers() {
        assert_identical_everywhere(&light_fighters_vs_rocket_launchers(), &[7]);
    }

    #[test]
    fn test_rapid_fire_heavy() {
        assert_identical_everywhere(&deathstars_vs_probes(), &[3, 4]);
    }

    #[test]
    fn test_mirror_match() {
        assert_identical_everywhere(&mirror_match("battlecruiser", 80, 10), &[11, 12]);
    }

    #[test]
    fn test_undefended_raid() {
        assert_identical_everywhere(&undefended_raid(), &[0]);
    }

    #[test]
    fn test_high_shields() {
        let scenario = Scenario::new(
            "high_shields",
            fleet(&[("light_fighter", 300), ("bomber", 20), ("destroyer", 5)]),
            fleet(&[
                ("small_shield_dome", 1),
                ("large_shield_dome", 1),
                ("ion_cannon", 50),
            ]),
        );
        assert_identical_everywhere(&scenario, &[5, 6]);
    }

    #[test]
    fn test_single_unit_stacks() {
        let scenario = Scenario::new(
            "singles",
            fleet(&[("reaper", 1), ("pathfinder", 1), ("crawler", 1)]),
            fleet(&[("solar_satellite", 1), ("heavy_laser", 1), ("colony_ship", 1)]),
        );
        assert_identical_everywhere(&scenario, &[0, 1, 2, 3]);
    }
}

// =============================================================================
// Many seeds, same means
// =============================================================================

mod statistical {
    use super::*;

    #[test]
    fn test_mean_outcomes_agree() {
        let scenario = mixed_assault();
        let comparison = compare_statistically(
            &ReferenceEngine,
            &OptimizedEngine,
            &scenario.input(),
            &BattleConfig::default(),
            0..50,
        )
        .unwrap();
        assert!(
            comparison.within_tolerance(0.01),
            "relative difference {}",
            comparison.max_relative_difference()
        );
        assert_eq!(comparison.left.total_battles, 50);
    }

    #[test]
    fn test_mean_outcomes_agree_with_unit_weighting() {
        let scenario = mirror_match("cruiser", 150, 3);
        let config = BattleConfig::default().with_target_selection(TargetSelection::UnitWeighted);
        let comparison = compare_statistically(
            &ReferenceEngine,
            &OptimizedEngine,
            &scenario.input(),
            &config,
            100..200,
        )
        .unwrap();
        assert!(comparison.within_tolerance(0.01));
    }
}

// =============================================================================
// Random fleets
// =============================================================================

mod properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_engines_agree_on_random_battles(
            attacker in strategies::arb_attacker_fleet(4, 50),
            defender in strategies::arb_defender_fleet(4, 50),
            attacker_ctx in strategies::arb_context(),
            defender_ctx in strategies::arb_context(),
            resources in strategies::arb_resources(),
            config in strategies::arb_config(),
            seed in any::<u64>(),
        ) {
            let input = BattleInput::new(
                UnitCatalog::standard(),
                &attacker,
                &attacker_ctx,
                &defender,
                &defender_ctx,
            )
            .with_defender_resources(resources);

            let report = compare_exact(&ReferenceEngine, &OptimizedEngine, &input, &config, seed)
                .unwrap();
            prop_assert!(report.is_identical(), "{:?}", report.differences);
        }
    }
}
