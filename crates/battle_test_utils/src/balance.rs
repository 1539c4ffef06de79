//! Balance testing utilities.
//!
//! Runs the same battle over many seeds and aggregates the outcomes, to
//! check matchups and to compare engines statistically.

use std::ops::Range;

use battle_core::battle::{BattleConfig, BattleEngine, BattleInput, BattleResult, Winner};
use battle_core::error::Result;
use tracing::debug;

use crate::fixtures::seeded_rng;

/// Aggregated outcomes of a set of battles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattleStats {
    /// Total battles run.
    pub total_battles: u32,
    /// Attacker victories.
    pub attacker_wins: u32,
    /// Defender victories.
    pub defender_wins: u32,
    /// Draws (round limit or mutual destruction).
    pub draws: u32,
    /// Average rounds fought.
    pub avg_rounds: f64,
    /// Average attacker losses, in total resources.
    pub avg_attacker_losses: f64,
    /// Average defender losses, in total resources.
    pub avg_defender_losses: f64,
    /// Average attacker units destroyed.
    pub avg_attacker_units_lost: f64,
    /// Average defender units destroyed.
    pub avg_defender_units_lost: f64,
    /// Average debris, in total resources.
    pub avg_debris: f64,
    /// Average loot, in total resources.
    pub avg_loot: f64,
    /// Average moon chance in percent.
    pub avg_moon_chance: f64,
}

impl BattleStats {
    /// Fold one more result into the running averages.
    pub fn record(&mut self, result: &BattleResult) {
        match result.winner() {
            Winner::Attacker => self.attacker_wins += 1,
            Winner::Defender => self.defender_wins += 1,
            Winner::Draw => self.draws += 1,
        }
        self.total_battles += 1;

        let n = f64::from(self.total_battles);
        let update = |avg: &mut f64, value: f64| *avg += (value - *avg) / n;
        update(&mut self.avg_rounds, result.round_count() as f64);
        update(
            &mut self.avg_attacker_losses,
            result.attacker_losses().total() as f64,
        );
        update(
            &mut self.avg_defender_losses,
            result.defender_losses().total() as f64,
        );
        update(
            &mut self.avg_attacker_units_lost,
            result.attacker_units_lost().total_amount() as f64,
        );
        update(
            &mut self.avg_defender_units_lost,
            result.defender_units_lost().total_amount() as f64,
        );
        update(&mut self.avg_debris, result.debris().total() as f64);
        update(&mut self.avg_loot, result.loot().total() as f64);
        update(
            &mut self.avg_moon_chance,
            f64::from(result.moon_chance_percent()),
        );
    }

    /// Attacker win rate (0.0 to 1.0).
    pub fn win_rate_attacker(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.attacker_wins) / f64::from(self.total_battles)
    }

    /// Defender win rate (0.0 to 1.0).
    pub fn win_rate_defender(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.defender_wins) / f64::from(self.total_battles)
    }

    /// Check if the attacker's win rate lies within a range.
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.win_rate_attacker();
        rate >= min_rate && rate <= max_rate
    }

    /// Check if both sides lose about the same, relative to the larger loss.
    pub fn losses_are_even(&self, tolerance: f64) -> bool {
        relative_difference(self.avg_attacker_losses, self.avg_defender_losses) <= tolerance
    }
}

/// `|a - b| / max(|a|, |b|)`, or 0 when both are 0.
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}

/// Run one battle per seed and aggregate the outcomes.
///
/// # Errors
///
/// Returns the first configuration error.
pub fn run_battles(
    engine: &dyn BattleEngine,
    input: &BattleInput<'_>,
    config: &BattleConfig,
    seeds: Range<u64>,
) -> Result<BattleStats> {
    let mut stats = BattleStats::default();
    for seed in seeds.clone() {
        let result = engine.simulate(input, config, &mut seeded_rng(seed))?;
        stats.record(&result);
    }
    debug!(
        engine = engine.name(),
        battles = stats.total_battles,
        first_seed = seeds.start,
        attacker_win_rate = stats.win_rate_attacker(),
        "Battle series finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, fleet, Scenario};
    use battle_core::battle::ReferenceEngine;

    #[test]
    fn test_battle_stats_win_rate() {
        let stats = BattleStats {
            total_battles: 100,
            attacker_wins: 45,
            defender_wins: 50,
            draws: 5,
            ..Default::default()
        };

        assert!((stats.win_rate_attacker() - 0.45).abs() < 0.001);
        assert!((stats.win_rate_defender() - 0.50).abs() < 0.001);
        assert!(stats.is_balanced(0.40, 0.60));
        assert!(!stats.is_balanced(0.50, 0.60));
    }

    #[test]
    fn test_empty_stats_are_neutral() {
        let stats = BattleStats::default();
        assert!((stats.win_rate_attacker() - 0.5).abs() < f64::EPSILON);
        assert!(stats.losses_are_even(0.0));
    }

    #[test]
    fn test_relative_difference() {
        assert!((relative_difference(100.0, 90.0) - 0.1).abs() < 1e-9);
        assert!((relative_difference(0.0, 0.0)).abs() < f64::EPSILON);
        assert!((relative_difference(0.0, 5.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_running_averages() {
        let scenario = fixtures::undefended_raid();
        let stats = run_battles(
            &ReferenceEngine,
            &scenario.input(),
            &BattleConfig::default(),
            0..10,
        )
        .unwrap();

        assert_eq!(stats.total_battles, 10);
        assert_eq!(stats.attacker_wins, 10);
        assert!((stats.avg_rounds - 1.0).abs() < f64::EPSILON);
        assert!(stats.avg_debris.abs() < f64::EPSILON);
        assert!(stats.avg_loot > 0.0);
    }

    #[test]
    fn test_overwhelming_attacker_always_wins() {
        let scenario = Scenario::new(
            "overwhelming",
            fleet(&[("deathstar", 3)]),
            fleet(&[("light_fighter", 10)]),
        );
        let stats = run_battles(
            &ReferenceEngine,
            &scenario.input(),
            &BattleConfig::default(),
            0..20,
        )
        .unwrap();
        assert!(stats.is_balanced(1.0, 1.0));
        assert!(stats.avg_attacker_losses.abs() < f64::EPSILON);
    }
}
