//! Engine parity harness.
//!
//! Two checks are offered: exact comparison of two engines for one seed,
//! listing every field that differs (see [`BattleResult::diff`]), and
//! statistical comparison of their mean outcomes over a range of seeds.
//!
//! [`BattleResult::diff`]: battle_core::battle::BattleResult::diff

use std::ops::Range;

use battle_core::battle::{BattleConfig, BattleEngine, BattleInput, ResultDifference};
use battle_core::error::Result;

use crate::balance::{relative_difference, run_battles, BattleStats};
use crate::determinism::find_first_divergence;
use crate::fixtures::seeded_rng;

/// Outcome of an exact same-seed comparison.
#[derive(Debug, Clone)]
pub struct ParityReport {
    /// Name of the first engine.
    pub left_engine: &'static str,
    /// Name of the second engine.
    pub right_engine: &'static str,
    /// Seed both engines used.
    pub seed: u64,
    /// First round that differs, see [`find_first_divergence`].
    pub first_divergence: Option<usize>,
    /// Every differing field.
    pub differences: Vec<ResultDifference>,
}

impl ParityReport {
    /// True if the results are identical.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.differences.is_empty() && self.first_divergence.is_none()
    }

    /// Assert identical results.
    ///
    /// # Panics
    ///
    /// Panics listing every difference.
    pub fn assert_identical(&self) {
        if !self.is_identical() {
            let lines: Vec<String> = self.differences.iter().map(ToString::to_string).collect();
            panic!(
                "{} and {} disagree for seed {} (first divergent round {:?}):\n{}",
                self.left_engine,
                self.right_engine,
                self.seed,
                self.first_divergence,
                lines.join("\n")
            );
        }
    }
}

/// Run both engines with the same seed and compare the results exactly.
///
/// # Errors
///
/// Returns the first engine's configuration error.
pub fn compare_exact(
    left: &dyn BattleEngine,
    right: &dyn BattleEngine,
    input: &BattleInput<'_>,
    config: &BattleConfig,
    seed: u64,
) -> Result<ParityReport> {
    let a = left.simulate(input, config, &mut seeded_rng(seed))?;
    let b = right.simulate(input, config, &mut seeded_rng(seed))?;
    Ok(ParityReport {
        left_engine: left.name(),
        right_engine: right.name(),
        seed,
        first_divergence: find_first_divergence(&a, &b),
        differences: a.diff(&b, input.catalog),
    })
}

/// Mean outcomes of two engines over the same seeds.
#[derive(Debug, Clone)]
pub struct StatisticalComparison {
    /// Aggregates from the first engine.
    pub left: BattleStats,
    /// Aggregates from the second engine.
    pub right: BattleStats,
}

impl StatisticalComparison {
    /// Largest relative difference between the mean losses, rounds and
    /// debris of the two engines.
    #[must_use]
    pub fn max_relative_difference(&self) -> f64 {
        [
            (self.left.avg_attacker_losses, self.right.avg_attacker_losses),
            (self.left.avg_defender_losses, self.right.avg_defender_losses),
            (self.left.avg_rounds, self.right.avg_rounds),
            (self.left.avg_debris, self.right.avg_debris),
        ]
        .into_iter()
        .map(|(a, b)| relative_difference(a, b))
        .fold(0.0, f64::max)
    }

    /// True if every compared mean is within `tolerance` (relative).
    #[must_use]
    pub fn within_tolerance(&self, tolerance: f64) -> bool {
        self.max_relative_difference() <= tolerance
    }
}

/// Run both engines over `seeds` and compare their mean outcomes.
///
/// # Errors
///
/// Returns the first configuration error.
pub fn compare_statistically(
    left: &dyn BattleEngine,
    right: &dyn BattleEngine,
    input: &BattleInput<'_>,
    config: &BattleConfig,
    seeds: Range<u64>,
) -> Result<StatisticalComparison> {
    Ok(StatisticalComparison {
        left: run_battles(left, input, config, seeds.clone())?,
        right: run_battles(right, input, config, seeds)?,
    })
}
