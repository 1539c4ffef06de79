//! Battle metrics for batch runs.
//!
//! [`BattleMetrics`] flattens one [`BattleResult`] into the numbers batch
//! output cares about; [`BatchSummary`] aggregates many of them.

use std::collections::HashSet;

use battle_core::battle::{BattleResult, EngineKind, Winner};
use battle_core::resources::ResourceBundle;
use serde::{Deserialize, Serialize};

/// Outcome of one battle in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleMetrics {
    /// Seed the battle ran with.
    pub seed: u64,
    /// Engine that resolved it.
    pub engine: EngineKind,
    /// Who won.
    pub winner: Winner,
    /// Rounds fought.
    pub rounds: u32,
    /// Attacker units before the battle.
    pub attacker_units_start: u64,
    /// Attacker units after the battle.
    pub attacker_units_end: u64,
    /// Defender units before the battle.
    pub defender_units_start: u64,
    /// Defender units after the battle.
    pub defender_units_end: u64,
    /// Value of destroyed attacker units.
    pub attacker_losses: ResourceBundle,
    /// Value of destroyed defender units.
    pub defender_losses: ResourceBundle,
    /// Debris field.
    pub debris: ResourceBundle,
    /// Resources taken by the attacker.
    pub loot: ResourceBundle,
    /// Moon chance in percent.
    pub moon_chance_percent: u32,
    /// Stable hash of the whole result.
    pub outcome_hash: u64,
}

impl BattleMetrics {
    /// Flatten a result.
    #[must_use]
    pub fn from_result(result: &BattleResult, engine: EngineKind, seed: u64) -> Self {
        Self {
            seed,
            engine,
            winner: result.winner(),
            rounds: u32::try_from(result.round_count()).unwrap_or(u32::MAX),
            attacker_units_start: result.attacker_start().total_amount(),
            attacker_units_end: result.attacker_end().total_amount(),
            defender_units_start: result.defender_start().total_amount(),
            defender_units_end: result.defender_end().total_amount(),
            attacker_losses: result.attacker_losses(),
            defender_losses: result.defender_losses(),
            debris: result.debris(),
            loot: result.loot(),
            moon_chance_percent: result.moon_chance_percent(),
            outcome_hash: result.outcome_hash(),
        }
    }
}

/// Aggregate over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Battles aggregated.
    pub total_battles: u32,
    /// Attacker victories.
    pub attacker_wins: u32,
    /// Defender victories.
    pub defender_wins: u32,
    /// Draws.
    pub draws: u32,
    /// Attacker win rate (0.0 to 1.0).
    pub attacker_win_rate: f64,
    /// Defender win rate (0.0 to 1.0).
    pub defender_win_rate: f64,
    /// Draw rate (0.0 to 1.0).
    pub draw_rate: f64,
    /// Mean rounds fought.
    pub mean_rounds: f64,
    /// Fewest rounds fought.
    pub min_rounds: u32,
    /// Most rounds fought.
    pub max_rounds: u32,
    /// Mean attacker losses, in total resources.
    pub mean_attacker_losses: f64,
    /// Mean defender losses, in total resources.
    pub mean_defender_losses: f64,
    /// Mean debris, in total resources.
    pub mean_debris: f64,
    /// Mean loot, in total resources.
    pub mean_loot: f64,
    /// Mean moon chance in percent.
    pub mean_moon_chance: f64,
    /// Number of distinct outcomes (by hash).
    pub distinct_outcomes: usize,
}

impl BatchSummary {
    /// Aggregate battle metrics.
    #[must_use]
    pub fn from_battles(battles: &[BattleMetrics]) -> Self {
        if battles.is_empty() {
            return Self::default();
        }

        let count = battles.len() as f64;
        let rate = |n: u32| f64::from(n) / count;
        let mean = |f: &dyn Fn(&BattleMetrics) -> f64| battles.iter().map(f).sum::<f64>() / count;
        let wins = |winner: Winner| {
            let n = battles.iter().filter(|b| b.winner == winner).count();
            u32::try_from(n).unwrap_or(u32::MAX)
        };

        let attacker_wins = wins(Winner::Attacker);
        let defender_wins = wins(Winner::Defender);
        let draws = wins(Winner::Draw);

        Self {
            total_battles: u32::try_from(battles.len()).unwrap_or(u32::MAX),
            attacker_wins,
            defender_wins,
            draws,
            attacker_win_rate: rate(attacker_wins),
            defender_win_rate: rate(defender_wins),
            draw_rate: rate(draws),
            mean_rounds: mean(&|b| f64::from(b.rounds)),
            min_rounds: battles.iter().map(|b| b.rounds).min().unwrap_or(0),
            max_rounds: battles.iter().map(|b| b.rounds).max().unwrap_or(0),
            mean_attacker_losses: mean(&|b| b.attacker_losses.total() as f64),
            mean_defender_losses: mean(&|b| b.defender_losses.total() as f64),
            mean_debris: mean(&|b| b.debris.total() as f64),
            mean_loot: mean(&|b| b.loot.total() as f64),
            mean_moon_chance: mean(&|b| f64::from(b.moon_chance_percent)),
            distinct_outcomes: battles
                .iter()
                .map(|b| b.outcome_hash)
                .collect::<HashSet<_>>()
                .len(),
        }
    }
}
