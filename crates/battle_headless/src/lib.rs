//! Headless battle runner.
//!
//! Command-line access to the battle engines:
//!
//! - **Fleet files**: JSON descriptions of both sides, validated and resolved
//!   against the unit catalog ([`scenario`])
//! - **Reports**: text or JSON output of a single battle ([`report`])
//! - **Batch runs**: one battle per seed, in parallel, with aggregate
//!   statistics ([`batch`], [`metrics`])
//! - **Engine comparison**: both engines on built-in scenarios, timed and
//!   checked for identical results ([`compare`])
//!
//! # Example
//!
//! ```bash
//! # One battle, text report
//! cargo run -p battle_headless -- simulate --fleet demos/fleet.json --seed 7
//!
//! # 1000 seeds on 8 threads
//! cargo run -p battle_headless -- batch --fleet demos/fleet.json --count 1000 --parallel 8
//!
//! # Reference vs optimized
//! cargo run -p battle_headless -- compare
//! ```
//!
//! Logs go to stderr; reports go to stdout.

pub mod batch;
pub mod compare;
pub mod metrics;
pub mod report;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use compare::{builtin_scenarios, compare_engines, EngineComparison};
pub use metrics::{BatchSummary, BattleMetrics};
pub use report::BattleReport;
pub use scenario::{BattleScenario, FleetFile, ScenarioError};

use std::path::Path;

use battle_core::battle::BattleSettings;
use battle_core::catalog::UnitCatalog;

/// Load battle settings from a RON file.
pub fn load_settings(path: &Path) -> Result<BattleSettings, ScenarioError> {
    let source = std::fs::read_to_string(path)?;
    Ok(BattleSettings::from_ron_str(
        &source,
        &path.display().to_string(),
    )?)
}

/// Load and validate a unit catalog from a RON file.
pub fn load_catalog(path: &Path) -> Result<UnitCatalog, ScenarioError> {
    let source = std::fs::read_to_string(path)?;
    Ok(UnitCatalog::from_ron_str(
        &source,
        &path.display().to_string(),
    )?)
}
