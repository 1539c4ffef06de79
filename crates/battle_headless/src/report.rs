//! Battle reports for the command line.
//!
//! A [`BattleReport`] is the result shaped for people: unit names instead of
//! catalog IDs, totals per side, and the per-round statistics. It renders
//! as plain text or serializes to JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use battle_core::battle::{BattleResult, EngineKind, RoundSummary, Winner};
use battle_core::catalog::UnitCatalog;
use battle_core::fleet::UnitCollection;
use battle_core::resources::ResourceBundle;
use serde::{Deserialize, Serialize};

/// Units by machine name.
pub type NamedUnits = BTreeMap<String, u64>;

fn named(units: &UnitCollection, catalog: &UnitCatalog) -> NamedUnits {
    units.to_named(catalog).into_iter().collect()
}

/// One side of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideReport {
    /// Units before the battle.
    pub initial_units: u64,
    /// Units after the battle.
    pub final_units: u64,
    /// Composition before the battle.
    pub initial: NamedUnits,
    /// Survivors.
    pub survivors: NamedUnits,
    /// Destroyed units.
    pub lost: NamedUnits,
    /// Value of destroyed units.
    pub losses: ResourceBundle,
}

/// One round of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round number, starting at 1.
    pub round: u32,
    /// Attacker units after the round.
    pub attacker_units: u64,
    /// Defender units after the round.
    pub defender_units: u64,
    /// Attacker shots that did not bounce.
    pub attacker_hits: u64,
    /// Defender shots that did not bounce.
    pub defender_hits: u64,
    /// Attacker damage soaked by defender shields.
    pub absorbed_by_defender: u64,
    /// Defender damage soaked by attacker shields.
    pub absorbed_by_attacker: u64,
}

impl From<&RoundSummary> for RoundReport {
    fn from(round: &RoundSummary) -> Self {
        Self {
            round: round.round,
            attacker_units: round.attacker_units.total_amount(),
            defender_units: round.defender_units.total_amount(),
            attacker_hits: round.attacker_hits,
            defender_hits: round.defender_hits,
            absorbed_by_defender: round.absorbed_by_defender,
            absorbed_by_attacker: round.absorbed_by_attacker,
        }
    }
}

/// A complete battle report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Scenario label.
    pub scenario: String,
    /// Engine that resolved the battle.
    pub engine: EngineKind,
    /// Seed it ran with.
    pub seed: u64,
    /// Wall-clock time of the simulation, in milliseconds.
    pub duration_ms: f64,
    /// Who won.
    pub winner: Winner,
    /// Rounds fought.
    pub rounds: usize,
    /// Attacking side.
    pub attacker: SideReport,
    /// Defending side.
    pub defender: SideReport,
    /// Debris field.
    pub debris: ResourceBundle,
    /// Resources taken by the attacker.
    pub loot: ResourceBundle,
    /// Moon chance in percent.
    pub moon_chance_percent: u32,
    /// Per-round statistics.
    pub round_details: Vec<RoundReport>,
    /// Stable hash of the result.
    pub outcome_hash: u64,
}

impl BattleReport {
    /// Shape a result for output.
    #[must_use]
    pub fn new(
        scenario: impl Into<String>,
        result: &BattleResult,
        catalog: &UnitCatalog,
        engine: EngineKind,
        seed: u64,
        duration: Duration,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            engine,
            seed,
            duration_ms: duration.as_secs_f64() * 1000.0,
            winner: result.winner(),
            rounds: result.round_count(),
            attacker: SideReport {
                initial_units: result.attacker_start().total_amount(),
                final_units: result.attacker_end().total_amount(),
                initial: named(result.attacker_start(), catalog),
                survivors: named(result.attacker_end(), catalog),
                lost: named(&result.attacker_units_lost(), catalog),
                losses: result.attacker_losses(),
            },
            defender: SideReport {
                initial_units: result.defender_start().total_amount(),
                final_units: result.defender_end().total_amount(),
                initial: named(result.defender_start(), catalog),
                survivors: named(result.defender_end(), catalog),
                lost: named(&result.defender_units_lost(), catalog),
                losses: result.defender_losses(),
            },
            debris: result.debris(),
            loot: result.loot(),
            moon_chance_percent: result.moon_chance_percent(),
            round_details: result.rounds().iter().map(RoundReport::from).collect(),
            outcome_hash: result.outcome_hash(),
        }
    }

    /// Pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn write_units(f: &mut fmt::Formatter<'_>, label: &str, units: &NamedUnits) -> fmt::Result {
    if units.is_empty() {
        return writeln!(f, "  {label:<10} -");
    }
    let list: Vec<String> = units
        .iter()
        .map(|(name, amount)| format!("{name} x{amount}"))
        .collect();
    writeln!(f, "  {label:<10} {}", list.join(", "))
}

fn write_side(f: &mut fmt::Formatter<'_>, title: &str, side: &SideReport) -> fmt::Result {
    writeln!(f, "{title}")?;
    writeln!(
        f,
        "  Units:     {} -> {}",
        side.initial_units, side.final_units
    )?;
    write_units(f, "Initial:", &side.initial)?;
    write_units(f, "Survivors:", &side.survivors)?;
    write_units(f, "Lost:", &side.lost)?;
    writeln!(f, "  Losses:    {}", side.losses)
}

impl fmt::Display for BattleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "BATTLE REPORT: {}", self.scenario)?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(
            f,
            "Engine: {}  Seed: {}  Time: {:.2} ms",
            self.engine, self.seed, self.duration_ms
        )?;
        writeln!(f)?;
        write_side(f, "Attacker", &self.attacker)?;
        writeln!(f)?;
        write_side(f, "Defender", &self.defender)?;
        writeln!(f)?;

        writeln!(
            f,
            "{:>5} {:>10} {:>10} {:>10} {:>10} {:>14} {:>14}",
            "Round", "Attackers", "Defenders", "Att hits", "Def hits", "Def absorbed", "Att absorbed"
        )?;
        for round in &self.round_details {
            writeln!(
                f,
                "{:>5} {:>10} {:>10} {:>10} {:>10} {:>14} {:>14}",
                round.round,
                round.attacker_units,
                round.defender_units,
                round.attacker_hits,
                round.defender_hits,
                round.absorbed_by_defender,
                round.absorbed_by_attacker
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Winner:      {}", self.winner)?;
        writeln!(f, "Rounds:      {}", self.rounds)?;
        writeln!(f, "Debris:      {}", self.debris)?;
        writeln!(f, "Loot:        {}", self.loot)?;
        writeln!(f, "Moon chance: {}%", self.moon_chance_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::battle::BattleConfig;
    use battle_test_utils::fixtures::{light_fighters_vs_rocket_launchers, undefended_raid};

    fn report_for(scenario: &battle_test_utils::fixtures::Scenario, seed: u64) -> BattleReport {
        let result = scenario
            .simulate(EngineKind::Reference.engine(), &BattleConfig::default(), seed)
            .unwrap();
        BattleReport::new(
            scenario.name,
            &result,
            UnitCatalog::standard(),
            EngineKind::Reference,
            seed,
            Duration::from_millis(3),
        )
    }

    #[test]
    fn test_report_totals_match_compositions() {
        let report = report_for(&light_fighters_vs_rocket_launchers(), 5);

        assert_eq!(report.attacker.initial_units, 1667);
        assert_eq!(report.attacker.initial["light_fighter"], 1667);
        assert_eq!(
            report.attacker.final_units,
            report.attacker.survivors.values().sum::<u64>()
        );
        assert_eq!(
            report.attacker.initial_units,
            report.attacker.final_units + report.attacker.lost.values().sum::<u64>()
        );
        assert_eq!(report.rounds, report.round_details.len());
        assert!((report.duration_ms - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_rendering() {
        let report = report_for(&undefended_raid(), 1);
        let text = report.to_string();

        assert!(text.contains("BATTLE REPORT: undefended_raid"));
        assert!(text.contains("Units:     15 -> 15"));
        assert!(text.contains("large_cargo x10"));
        assert!(text.contains("Winner:      attacker"));
        assert!(text.contains("Rounds:      1"));
        assert!(text.contains("Moon chance: 0%"));
    }

    #[test]
    fn test_json_output() {
        let report = report_for(&light_fighters_vs_rocket_launchers(), 2);
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["engine"], "reference");
        assert_eq!(value["seed"], 2);
        assert_eq!(value["attacker"]["initial"]["light_fighter"], 1667);
        assert!(value["round_details"].is_array());

        let back: BattleReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
