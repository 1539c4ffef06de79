//! Engine comparison.
//!
//! Runs built-in scenarios through the reference and optimized engines with
//! the same seed, times both, and lists every field where the results
//! disagree. The engines are expected to agree exactly.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use battle_core::battle::{BattleConfig, BattleResult, EngineKind, ResultDifference};
use battle_core::catalog::UnitCatalog;
use battle_core::error::Result;
use battle_core::fleet::UnitCollection;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scenario::BattleScenario;

fn units(catalog: &UnitCatalog, entries: &[(&str, i64)]) -> Result<UnitCollection> {
    UnitCollection::from_named(catalog, entries.iter().copied())
}

/// The comparison suite, smallest first.
pub fn builtin_scenarios(catalog: &UnitCatalog) -> Result<Vec<BattleScenario>> {
    let suite: [(&str, &[(&str, i64)], &[(&str, i64)]); 6] = [
        ("small", &[("light_fighter", 100)], &[("rocket_launcher", 100)]),
        ("medium", &[("light_fighter", 5_000)], &[("rocket_launcher", 5_000)]),
        ("large", &[("light_fighter", 50_000)], &[("rocket_launcher", 50_000)]),
        ("unbalanced", &[("cruiser", 10_000)], &[("rocket_launcher", 50_000)]),
        (
            "rapid_fire_heavy",
            &[("cruiser", 5_000)],
            &[("rocket_launcher", 25_000), ("espionage_probe", 1_000)],
        ),
        ("high_shield", &[("light_fighter", 10_000)], &[("large_shield_dome", 100)]),
    ];

    suite
        .into_iter()
        .map(|(name, attacker, defender)| {
            Ok(BattleScenario::new(
                name,
                units(catalog, attacker)?,
                units(catalog, defender)?,
            ))
        })
        .collect()
}

/// Both engines on one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineComparison {
    /// Scenario label.
    pub scenario: String,
    /// Units on both sides.
    pub total_units: u64,
    /// Seed both engines used.
    pub seed: u64,
    /// Reference engine time, in milliseconds.
    pub reference_ms: f64,
    /// Optimized engine time, in milliseconds.
    pub optimized_ms: f64,
    /// Reference time over optimized time.
    pub speedup: f64,
    /// Every field that differs.
    pub differences: Vec<ResultDifference>,
}

impl EngineComparison {
    /// True if the engines agreed.
    pub fn is_identical(&self) -> bool {
        self.differences.is_empty()
    }

    /// How much faster the optimized engine was, in percent. Negative on
    /// regression.
    pub fn improvement_percent(&self) -> f64 {
        if self.reference_ms <= 0.0 {
            return 0.0;
        }
        (self.reference_ms - self.optimized_ms) / self.reference_ms * 100.0
    }
}

fn timed_run(
    kind: EngineKind,
    scenario: &BattleScenario,
    catalog: &UnitCatalog,
    config: &BattleConfig,
    seed: u64,
) -> Result<(BattleResult, Duration)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let start = Instant::now();
    let result = kind
        .engine()
        .simulate(&scenario.input(catalog), config, &mut rng)?;
    Ok((result, start.elapsed()))
}

/// Run one scenario through both engines.
pub fn compare_engines(
    scenario: &BattleScenario,
    catalog: &UnitCatalog,
    config: &BattleConfig,
    seed: u64,
) -> Result<EngineComparison> {
    let (reference, reference_time) =
        timed_run(EngineKind::Reference, scenario, catalog, config, seed)?;
    let (optimized, optimized_time) =
        timed_run(EngineKind::Optimized, scenario, catalog, config, seed)?;

    let reference_ms = reference_time.as_secs_f64() * 1000.0;
    let optimized_ms = optimized_time.as_secs_f64() * 1000.0;
    let comparison = EngineComparison {
        scenario: scenario.name.clone(),
        total_units: scenario.total_units(),
        seed,
        reference_ms,
        optimized_ms,
        speedup: if optimized_ms > 0.0 {
            reference_ms / optimized_ms
        } else {
            1.0
        },
        differences: reference.diff(&optimized, catalog),
    };

    info!(
        scenario = %comparison.scenario,
        reference_ms = format!("{:.2}", reference_ms),
        optimized_ms = format!("{:.2}", optimized_ms),
        identical = comparison.is_identical(),
        "Engines compared"
    );
    Ok(comparison)
}

/// Detailed text for one comparison.
pub fn render_comparison(comparison: &EngineComparison) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(70));
    let _ = writeln!(out, "Scenario: {}", comparison.scenario);
    let _ = writeln!(out, "{}", "-".repeat(70));
    let _ = writeln!(out, "Total units: {}", comparison.total_units);
    let _ = writeln!(out, "Performance:");
    let _ = writeln!(out, "  Reference: {:>10.2} ms", comparison.reference_ms);
    let _ = writeln!(out, "  Optimized: {:>10.2} ms", comparison.optimized_ms);
    let _ = writeln!(out, "  Speedup:   {:>10.2}x", comparison.speedup);
    let improvement = comparison.improvement_percent();
    if improvement >= 0.0 {
        let _ = writeln!(out, "  Improvement: {improvement:.1}% faster");
    } else {
        let _ = writeln!(out, "  Regression: {:.1}% slower", -improvement);
    }
    let _ = writeln!(out, "Correctness:");
    if comparison.is_identical() {
        let _ = writeln!(out, "  Results match");
    } else {
        let _ = writeln!(out, "  Results differ:");
        for difference in &comparison.differences {
            let _ = writeln!(out, "    - {difference}");
        }
    }
    out
}

/// Summary table over all comparisons.
pub fn render_overview(comparisons: &[EngineComparison]) -> String {
    let mut out = String::new();
    let passed = comparisons.iter().filter(|c| c.is_identical()).count();
    let _ = writeln!(out, "{}", "=".repeat(70));
    let _ = writeln!(out, "OVERALL");
    let _ = writeln!(out, "{}", "=".repeat(70));
    let _ = writeln!(
        out,
        "Correctness: {}/{} scenarios identical",
        passed,
        comparisons.len()
    );
    let _ = writeln!(
        out,
        "{:<20} {:>12} {:>12} {:>10}",
        "Scenario", "Reference", "Optimized", "Speedup"
    );
    let _ = writeln!(out, "{}", "-".repeat(58));
    for c in comparisons {
        let _ = writeln!(
            out,
            "{:<20} {:>9.2} ms {:>9.2} ms {:>9.2}x",
            c.scenario, c.reference_ms, c.optimized_ms, c.speedup
        );
    }
    let _ = writeln!(out, "{}", "-".repeat(58));

    if !comparisons.is_empty() {
        let average = comparisons.iter().map(|c| c.speedup).sum::<f64>() / comparisons.len() as f64;
        let _ = writeln!(out, "{:<20} {:>35.2}x", "Average speedup", average);
        let by_speedup = |a: &&EngineComparison, b: &&EngineComparison| a.speedup.total_cmp(&b.speedup);
        if let (Some(best), Some(worst)) = (
            comparisons.iter().max_by(by_speedup),
            comparisons.iter().min_by(by_speedup),
        ) {
            let _ = writeln!(out, "Best case:  {} ({:.2}x)", best.scenario, best.speedup);
            let _ = writeln!(out, "Worst case: {} ({:.2}x)", worst.scenario, worst.speedup);
        }
    }
    out
}
