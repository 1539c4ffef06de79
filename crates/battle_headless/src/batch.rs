//! Batch battle runner.
//!
//! Runs one battle per seed in parallel using rayon. Every battle gets its
//! own copy of the fleets and its own generator; only the catalog and the
//! config are shared.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use battle_core::battle::{BattleConfig, EngineKind, Winner};
use battle_core::catalog::UnitCatalog;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, BattleMetrics};
use crate::scenario::BattleScenario;

/// File name batch results are written to inside the output directory.
pub const RESULTS_FILE: &str = "batch_results.json";

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario label.
    pub scenario: String,
    /// Number of battles to run.
    pub battle_count: u32,
    /// Worker threads (0 = use rayon default).
    pub parallel: u32,
    /// Output directory for results.
    pub output_dir: PathBuf,
    /// Seed of the first battle. Battle `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Engine to run.
    pub engine: EngineKind,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "fleet".to_string(),
            battle_count: 100,
            parallel: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            engine: EngineKind::Optimized,
        }
    }
}

impl BatchConfig {
    /// Create config for a scenario.
    pub fn new(scenario: &str, battle_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            battle_count,
            ..Default::default()
        }
    }

    /// Set output directory.
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the engine.
    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    /// Set the worker thread count.
    pub fn with_parallel(mut self, threads: u32) -> Self {
        self.parallel = threads;
        self
    }

    /// Where [`BatchResults::save`] writes by default.
    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(RESULTS_FILE)
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-battle metrics, in seed order.
    pub battles: Vec<BattleMetrics>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Battles that failed to start.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// A battle that could not run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Battle index.
    pub battle_index: u32,
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Progress tracking for batch runs.
#[derive(Debug)]
pub struct BatchProgress {
    /// Total battles.
    pub total: u32,
    completed: AtomicU32,
    attacker_wins: AtomicU32,
    defender_wins: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Create new progress tracker.
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            attacker_wins: AtomicU32::new(0),
            defender_wins: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished battle.
    pub fn record_completion(&self, winner: Winner) {
        let wins = match winner {
            Winner::Attacker => Some(&self.attacker_wins),
            Winner::Defender => Some(&self.defender_wins),
            Winner::Draw => None,
        };
        if let Some(wins) = wins {
            wins.fetch_add(1, Ordering::Relaxed);
        }
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Battles finished so far.
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Completion percentage.
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Estimated time remaining.
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }

        let elapsed = self.start_time.elapsed();
        let per_battle = elapsed.as_secs_f64() / f64::from(completed);
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_battle * f64::from(remaining))
    }

    /// Attacker and defender win rates so far.
    pub fn current_win_rates(&self) -> (f64, f64) {
        let completed = self.current();
        if completed == 0 {
            return (0.0, 0.0);
        }
        let completed = f64::from(completed);
        (
            f64::from(self.attacker_wins.load(Ordering::Relaxed)) / completed,
            f64::from(self.defender_wins.load(Ordering::Relaxed)) / completed,
        )
    }

    /// Log progress.
    pub fn report(&self) {
        let (attacker, defender) = self.current_win_rates();
        info!(
            completed = self.current(),
            total = self.total,
            percent = format!("{:.1}", self.percentage()),
            eta_secs = self.eta().as_secs(),
            attacker_win_rate = format!("{:.3}", attacker),
            defender_win_rate = format!("{:.3}", defender),
            "Batch progress"
        );
    }
}

/// Log every this many battles.
const PROGRESS_INTERVAL: u32 = 100;

fn run_single_battle(
    scenario: &BattleScenario,
    catalog: &UnitCatalog,
    battle_config: &BattleConfig,
    engine: EngineKind,
    seed: u64,
) -> Result<BattleMetrics, String> {
    let scenario = scenario.clone();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let result = engine
        .engine()
        .simulate(&scenario.input(catalog), battle_config, &mut rng)
        .map_err(|e| e.to_string())?;
    Ok(BattleMetrics::from_result(&result, engine, seed))
}

fn run_all(
    config: &BatchConfig,
    scenario: &BattleScenario,
    catalog: &UnitCatalog,
    battle_config: &BattleConfig,
    progress: &BatchProgress,
) -> Vec<Result<BattleMetrics, BatchError>> {
    (0..config.battle_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_single_battle(scenario, catalog, battle_config, config.engine, seed) {
                Ok(metrics) => {
                    progress.record_completion(metrics.winner);
                    let completed = progress.current();
                    if completed % 10 == 0 {
                        debug!("Progress: {}/{}", completed, config.battle_count);
                    }
                    if completed % PROGRESS_INTERVAL == 0 {
                        progress.report();
                    }
                    Ok(metrics)
                }
                Err(message) => {
                    warn!("Battle {} failed: {}", i, message);
                    Err(BatchError {
                        battle_index: i,
                        seed,
                        message,
                    })
                }
            }
        })
        .collect()
}

/// Run a batch of battles.
pub fn run_batch(
    config: BatchConfig,
    scenario: &BattleScenario,
    catalog: &UnitCatalog,
    battle_config: &BattleConfig,
) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.battle_count);

    info!(
        "Starting batch run: {} battles of '{}' on the {} engine",
        config.battle_count, config.scenario, config.engine
    );

    let pool = if config.parallel > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!("Failed to build thread pool: {}, using the global pool", e);
                None
            }
        }
    } else {
        None
    };

    let results = match &pool {
        Some(pool) => {
            pool.install(|| run_all(&config, scenario, catalog, battle_config, &progress))
        }
        None => run_all(&config, scenario, catalog, battle_config, &progress),
    };

    let (battles, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let battles: Vec<BattleMetrics> = battles.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_battles(&battles);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} battles in {:.1}s ({:.1} battles/sec)",
        battles.len(),
        duration_seconds,
        battles.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    BatchResults {
        config,
        battles,
        summary,
        duration_seconds,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::fleet::UnitCollection;
    use battle_test_utils::fixtures::fleet;

    fn skirmish() -> BattleScenario {
        BattleScenario::new(
            "skirmish",
            fleet(&[("heavy_fighter", 40), ("cruiser", 5)]),
            fleet(&[("light_laser", 60), ("rocket_launcher", 40)]),
        )
    }

    fn run(config: BatchConfig) -> BatchResults {
        run_batch(
            config,
            &skirmish(),
            UnitCatalog::standard(),
            &BattleConfig::default(),
        )
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.battle_count, 100);
        assert_eq!(config.engine, EngineKind::Optimized);
        assert_eq!(config.results_path(), PathBuf::from("results").join(RESULTS_FILE));
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("custom", 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345)
            .with_engine(EngineKind::Reference)
            .with_parallel(2);

        assert_eq!(config.scenario, "custom");
        assert_eq!(config.battle_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.engine, EngineKind::Reference);
        assert_eq!(config.parallel, 2);
    }

    #[test]
    fn test_progress_tracking() {
        let progress = BatchProgress::new(100);
        assert_eq!(progress.current(), 0);
        assert!(progress.percentage().abs() < f64::EPSILON);

        progress.record_completion(Winner::Attacker);
        progress.record_completion(Winner::Defender);
        progress.record_completion(Winner::Attacker);

        assert_eq!(progress.current(), 3);
        let (attacker, defender) = progress.current_win_rates();
        assert!((attacker - 0.666).abs() < 0.01);
        assert!((defender - 0.333).abs() < 0.01);
    }

    #[test]
    fn test_run_batch_small() {
        let results = run(BatchConfig::new("skirmish", 12).with_seed(40));

        assert_eq!(results.battles.len(), 12);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_battles, 12);
        let seeds: Vec<u64> = results.battles.iter().map(|b| b.seed).collect();
        assert_eq!(seeds, (40..52).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_is_deterministic_across_thread_counts() {
        let a = run(BatchConfig::new("skirmish", 16).with_parallel(1));
        let b = run(BatchConfig::new("skirmish", 16).with_parallel(4));
        assert_eq!(a.battles, b.battles);
    }

    #[test]
    fn test_engines_agree_in_batch() {
        let a = run(BatchConfig::new("skirmish", 8).with_engine(EngineKind::Reference));
        let b = run(BatchConfig::new("skirmish", 8).with_engine(EngineKind::Optimized));
        let hashes = |r: &BatchResults| r.battles.iter().map(|m| m.outcome_hash).collect::<Vec<_>>();
        assert_eq!(hashes(&a), hashes(&b));
    }

    #[test]
    fn test_invalid_battles_are_reported() {
        let scenario = BattleScenario::new("empty", UnitCollection::new(), fleet(&[("light_laser", 1)]));
        let results = run_batch(
            BatchConfig::new("empty", 3),
            &scenario,
            UnitCatalog::standard(),
            &BattleConfig::default(),
        );
        assert!(results.battles.is_empty());
        assert_eq!(results.errors.len(), 3);
        assert_eq!(results.summary.total_battles, 0);
    }

    #[test]
    fn test_batch_results_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig::new("skirmish", 5).with_output(dir.path().to_path_buf());
        let path = config.results_path();
        let results = run(config);

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.battles, results.battles);
        assert_eq!(loaded.config.scenario, "skirmish");
        assert_eq!(loaded.summary.total_battles, 5);
    }
}
