//! Determinism testing utilities.
//!
//! Provides a harness for verifying that battles produce identical
//! results given identical inputs and seeds.
//!
//! # Testing Strategy
//!
//! Engines must be fully reproducible so that two implementations can be
//! compared seed for seed. Sources of non-determinism include:
//!
//! - **Floating-point math**: property values use fixed-point arithmetic via
//!   [`battle_core::math::Fixed`], battle arithmetic is integer only.
//!
//! - **HashMap iteration order**: fleets keep insertion order and research
//!   is stored in a `BTreeMap`.
//!
//! - **System randomness**: engines only draw from the generator they are
//!   handed. Every test builds its own seeded `ChaCha8Rng`.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual rules (bounce, rapid fire, explosions)
//! 2. **Property tests**: random fleets must still give repeatable outcomes
//! 3. **Integration tests**: full scenarios are reproducible
//! 4. **Parallel tests**: running N battles on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use battle_core::battle::{BattleConfig, BattleEngine, BattleInput, BattleResult};
use battle_core::error::Result;

use crate::fixtures::seeded_rng;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Seed every run used.
    pub seed: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Seed: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.seed,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Outcome hash from each battle.
    pub hashes: Vec<u64>,
    /// Seed every battle used.
    pub seed: u64,
    /// Number of battles run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Seed: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.seed,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run something multiple times with the same seed and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `seed` - Seed handed to every run
/// * `run` - Function producing an outcome hash for a seed
///
/// # Example
///
/// ```ignore
/// use battle_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(5, 42, |seed| {
///     scenario.simulate(&ReferenceEngine, &config, seed).unwrap().outcome_hash()
/// });
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<Run>(runs: usize, seed: u64, run: Run) -> DeterminismResult
where
    Run: Fn(u64) -> u64,
{
    let hashes: Vec<u64> = (0..runs).map(|_| run(seed)).collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        seed,
    }
}

/// Simplified determinism verification for one engine and input.
///
/// # Errors
///
/// Returns the engine's configuration error, if any.
pub fn verify_battle_determinism(
    engine: &dyn BattleEngine,
    input: &BattleInput<'_>,
    config: &BattleConfig,
    seed: u64,
    runs: usize,
) -> Result<DeterminismResult> {
    // Surface configuration errors once instead of hashing them.
    engine.simulate(input, config, &mut seeded_rng(seed))?;

    Ok(verify_determinism(runs, seed, |seed| {
        engine
            .simulate(input, config, &mut seeded_rng(seed))
            .map_or(0, |result| result.outcome_hash())
    }))
}

/// Run N battles on scoped threads and collect their outcome hashes.
///
/// Catches non-determinism that only manifests under thread scheduling
/// variations. The input is borrowed by every thread; each thread owns
/// its generator.
///
/// # Panics
///
/// Panics if a battle thread panics.
pub fn run_parallel_battles_scoped(
    engine: &dyn BattleEngine,
    input: &BattleInput<'_>,
    config: &BattleConfig,
    seed: u64,
    num_sims: usize,
) -> ParallelSimResult {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    engine
                        .simulate(input, config, &mut seeded_rng(seed))
                        .map_or(0, |result| result.outcome_hash())
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        seed,
        num_sims,
    }
}

/// Compare two results round by round, finding the first divergence.
///
/// # Returns
///
/// `None` if the results are identical, `Some(round)` for the first round
/// that differs (1-based), or `Some(0)` if only the concluded figures
/// differ.
#[must_use]
pub fn find_first_divergence(a: &BattleResult, b: &BattleResult) -> Option<usize> {
    if let Some(index) = a
        .rounds()
        .iter()
        .zip(b.rounds())
        .position(|(x, y)| x != y)
    {
        return Some(index + 1);
    }
    if a.round_count() != b.round_count() {
        return Some(a.round_count().min(b.round_count()) + 1);
    }
    (a != b).then_some(0)
}

/// Verify that a RON round trip preserves a result exactly.
#[must_use]
pub fn verify_serialization_determinism(result: &BattleResult) -> bool {
    let Ok(text) = ron::to_string(result) else {
        return false;
    };
    let Ok(restored) = ron::from_str::<BattleResult>(&text) else {
        return false;
    };
    restored.outcome_hash() == result.outcome_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle testing.
///
/// Fleets stay small so that the per-shot reference engine keeps
/// property runs fast.
pub mod strategies {
    use battle_core::battle::{BattleConfig, ExplosionRule, ShieldModel, TargetSelection};
    use battle_core::catalog::{UnitCatalog, UnitId};
    use battle_core::data::Technology;
    use battle_core::fleet::UnitCollection;
    use battle_core::player::{PlayerClass, PlayerContext};
    use battle_core::resources::ResourceBundle;
    use proptest::prelude::*;

    fn unit_ids(ships_only: bool) -> Vec<UnitId> {
        UnitCatalog::standard()
            .iter()
            .filter(|(_, unit)| !ships_only || unit.is_ship())
            .map(|(id, _)| id)
            .collect()
    }

    /// Generate one stack of any catalog unit.
    pub fn arb_stack(max_amount: u64) -> impl Strategy<Value = (UnitId, u64)> {
        (
            proptest::sample::select(unit_ids(false)),
            1..=max_amount,
        )
    }

    /// Generate a ship-only stack.
    pub fn arb_ship_stack(max_amount: u64) -> impl Strategy<Value = (UnitId, u64)> {
        (proptest::sample::select(unit_ids(true)), 1..=max_amount)
    }

    /// Generate a non-empty attacking fleet (ships only).
    pub fn arb_attacker_fleet(
        max_stacks: usize,
        max_amount: u64,
    ) -> impl Strategy<Value = UnitCollection> {
        proptest::collection::vec(arb_ship_stack(max_amount), 1..=max_stacks)
            .prop_map(|stacks| collect(&stacks))
    }

    /// Generate a defending fleet of ships and defenses, possibly empty.
    pub fn arb_defender_fleet(
        max_stacks: usize,
        max_amount: u64,
    ) -> impl Strategy<Value = UnitCollection> {
        proptest::collection::vec(arb_stack(max_amount), 0..=max_stacks)
            .prop_map(|stacks| collect(&stacks))
    }

    fn collect(stacks: &[(UnitId, u64)]) -> UnitCollection {
        stacks
            .iter()
            .fold(UnitCollection::new(), |fleet, (id, amount)| {
                fleet.with(*id, *amount)
            })
    }

    /// Generate a player class or none.
    pub fn arb_class() -> impl Strategy<Value = Option<PlayerClass>> {
        proptest::option::of(prop_oneof![
            Just(PlayerClass::Collector),
            Just(PlayerClass::General),
            Just(PlayerClass::Discoverer),
        ])
    }

    /// Generate research levels (0-20) and a class.
    pub fn arb_context() -> impl Strategy<Value = PlayerContext> {
        (
            proptest::collection::vec(
                (proptest::sample::select(Technology::ALL.to_vec()), 0u32..=20),
                0..8,
            ),
            arb_class(),
        )
            .prop_map(|(levels, class)| {
                let ctx = levels
                    .into_iter()
                    .fold(PlayerContext::new(), |ctx, (tech, level)| {
                        ctx.with_research(tech, level)
                    });
                match class {
                    Some(class) => ctx.with_class(class),
                    None => ctx,
                }
            })
    }

    /// Generate a resource stock.
    pub fn arb_resources() -> impl Strategy<Value = ResourceBundle> {
        (0u64..2_000_000, 0u64..2_000_000, 0u64..2_000_000)
            .prop_map(|(metal, crystal, deuterium)| ResourceBundle::new(metal, crystal, deuterium))
    }

    /// Generate an explosion rule.
    pub fn arb_explosion() -> impl Strategy<Value = ExplosionRule> {
        prop_oneof![
            Just(ExplosionRule::Disabled),
            (1u32..=100).prop_map(|threshold_percent| ExplosionRule::HullThreshold {
                threshold_percent
            }),
            (100u32..=300, 1u32..=100).prop_map(|(damage_multiple_percent, chance_percent)| {
                ExplosionRule::Overkill {
                    damage_multiple_percent,
                    chance_percent,
                }
            }),
        ]
    }

    /// Generate a valid battle configuration.
    pub fn arb_config() -> impl Strategy<Value = BattleConfig> {
        (
            1u32..=8,
            prop_oneof![Just(ShieldModel::PerShot), Just(ShieldModel::Depleting)],
            prop_oneof![
                Just(TargetSelection::UniformStack),
                Just(TargetSelection::UnitWeighted)
            ],
            arb_explosion(),
            any::<bool>(),
        )
            .prop_map(|(rounds, shields, targeting, explosion, rapid_fire)| {
                BattleConfig::default()
                    .with_max_rounds(rounds)
                    .with_shield_model(shields)
                    .with_target_selection(targeting)
                    .with_explosion(explosion)
                    .with_rapid_fire(rapid_fire)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, mirror_match, mixed_assault};
    use battle_core::battle::{EngineKind, OptimizedEngine, ReferenceEngine};
    use battle_core::catalog::UnitCatalog;
    use battle_core::player::PlayerContext;
    use proptest::prelude::*;

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(5, 7, |seed| seed * 3);
        result.assert_deterministic();
        assert_eq!(result.unique_hashes(), vec![21]);
    }

    #[test]
    fn test_detects_non_determinism() {
        let counter = std::cell::Cell::new(0u64);
        let result = verify_determinism(3, 0, |_| {
            counter.set(counter.get() + 1);
            counter.get()
        });
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 3);
    }

    #[test]
    fn test_mixed_assault_is_deterministic() {
        let scenario = mixed_assault();
        let config = BattleConfig::default();
        for kind in EngineKind::ALL {
            verify_battle_determinism(kind.engine(), &scenario.input(), &config, 99, 3)
                .unwrap()
                .assert_deterministic();
        }
    }

    #[test]
    fn test_configuration_error_is_reported() {
        let empty = battle_core::fleet::UnitCollection::new();
        let ctx = PlayerContext::new();
        let input = BattleInput::new(UnitCatalog::standard(), &empty, &ctx, &empty, &ctx);
        let result =
            verify_battle_determinism(&ReferenceEngine, &input, &BattleConfig::default(), 1, 2);
        assert!(result.is_err());
    }

    #[test]
    fn test_parallel_battles_match() {
        let scenario = mirror_match("cruiser", 200, 8);
        let config = BattleConfig::default();
        run_parallel_battles_scoped(&OptimizedEngine, &scenario.input(), &config, 5, 4)
            .assert_deterministic();
    }

    #[test]
    fn test_no_divergence_between_identical_runs() {
        let scenario = mixed_assault();
        let config = BattleConfig::default();
        let a = scenario.simulate(&ReferenceEngine, &config, 3).unwrap();
        let b = scenario.simulate(&ReferenceEngine, &config, 3).unwrap();
        assert_eq!(find_first_divergence(&a, &b), None);
    }

    #[test]
    fn test_divergence_between_seeds() {
        let scenario = mixed_assault();
        let config = BattleConfig::default();
        let a = scenario.simulate(&ReferenceEngine, &config, 1).unwrap();
        let b = scenario.simulate(&ReferenceEngine, &config, 2).unwrap();
        assert_eq!(find_first_divergence(&a, &b), Some(1));
    }

    #[test]
    fn test_serialization_preserves_result() {
        let result = fixtures::undefended_raid()
            .simulate(&ReferenceEngine, &BattleConfig::default(), 0)
            .unwrap();
        assert!(verify_serialization_determinism(&result));
    }

    // =========================================================================
    // Property-based tests using proptest
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Random fleets and tunables give repeatable outcomes.
        #[test]
        fn prop_random_battles_are_deterministic(
            attacker in strategies::arb_attacker_fleet(3, 40),
            defender in strategies::arb_defender_fleet(3, 40),
            attacker_ctx in strategies::arb_context(),
            defender_ctx in strategies::arb_context(),
            config in strategies::arb_config(),
            seed in any::<u64>(),
        ) {
            let input = BattleInput::new(
                UnitCatalog::standard(),
                &attacker,
                &attacker_ctx,
                &defender,
                &defender_ctx,
            );
            let result = verify_battle_determinism(&ReferenceEngine, &input, &config, seed, 2)
                .unwrap();
            prop_assert!(result.is_deterministic);
        }

        /// Serialization round trip is exact for any outcome.
        #[test]
        fn prop_serialization_roundtrip_is_exact(
            attacker in strategies::arb_attacker_fleet(2, 30),
            defender in strategies::arb_defender_fleet(2, 30),
            resources in strategies::arb_resources(),
            seed in any::<u64>(),
        ) {
            let ctx = PlayerContext::new();
            let input = BattleInput::new(UnitCatalog::standard(), &attacker, &ctx, &defender, &ctx)
                .with_defender_resources(resources);
            let result = OptimizedEngine
                .simulate(&input, &BattleConfig::default(), &mut seeded_rng(seed))
                .unwrap();
            prop_assert!(verify_serialization_determinism(&result));
        }
    }
}
