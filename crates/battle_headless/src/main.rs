//! Headless battle runner.
//!
//! # Usage
//!
//! ```bash
//! # Simulate one battle from a fleet file
//! cargo run -p battle_headless -- simulate --fleet demos/fleet.json --seed 7
//!
//! # Same, as JSON, with custom settings
//! cargo run -p battle_headless -- simulate --fleet demos/fleet.json --config demos/settings.ron --json
//!
//! # Many seeds in parallel
//! cargo run -p battle_headless -- batch --fleet demos/fleet.json --count 1000 --output results/
//!
//! # Reference vs optimized engine on the built-in scenarios
//! cargo run -p battle_headless -- compare --seed 42
//!
//! # Check data files
//! cargo run -p battle_headless -- validate --config demos/settings.ron
//! ```
//!
//! Reports go to stdout, logs to stderr. `RUST_LOG` overrides the log level.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Instant;

use battle_core::battle::{BattleConfig, BattleSettings, EngineKind};
use battle_core::catalog::UnitCatalog;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use battle_headless::{
    batch::{run_batch, BatchConfig},
    compare::{builtin_scenarios, compare_engines, render_comparison, render_overview},
    load_catalog, load_settings,
    report::BattleReport,
    scenario::BattleScenario,
};

#[derive(Parser)]
#[command(name = "battle_headless")]
#[command(about = "Headless fleet battle simulator")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a single battle from a fleet file
    Simulate {
        /// Fleet JSON file
        #[arg(short, long)]
        fleet: PathBuf,

        /// Engine to use (reference or optimized)
        #[arg(short, long, default_value = "optimized")]
        engine: EngineKind,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Battle settings RON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare the reference and optimized engines on built-in scenarios
    Compare {
        /// Seed both engines use
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Only run the named scenario
        #[arg(short, long)]
        scenario: Option<String>,

        /// Battle settings RON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run one battle per seed in parallel
    Batch {
        /// Fleet JSON file
        #[arg(short, long)]
        fleet: PathBuf,

        /// Number of battles to run
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Worker threads (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Engine to use (reference or optimized)
        #[arg(short, long, default_value = "optimized")]
        engine: EngineKind,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Battle settings RON file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Parse and validate data files
    Validate {
        /// Unit catalog RON file (defaults to the built-in catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Battle settings RON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fleet JSON file
        #[arg(short, long)]
        fleet: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr (stdout is for reports)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate {
            fleet,
            engine,
            seed,
            config,
            json,
        } => cmd_simulate(&fleet, engine, seed, config.as_deref(), json),
        Commands::Compare {
            seed,
            scenario,
            config,
        } => cmd_compare(seed, scenario.as_deref(), config.as_deref()),
        Commands::Batch {
            fleet,
            count,
            seed,
            parallel,
            engine,
            output,
            config,
        } => cmd_batch(&fleet, count, seed, parallel, engine, output, config.as_deref()),
        Commands::Validate {
            catalog,
            config,
            fleet,
        } => cmd_validate(catalog.as_deref(), config.as_deref(), fleet.as_deref()),
    }
}

fn fatal(what: &str, error: impl Display) -> ! {
    tracing::error!(error = %error, "{}", what);
    eprintln!("FATAL: {what}: {error}");
    std::process::exit(1);
}

/// Settings from `path`, or the defaults, checked against `catalog`.
fn battle_config(path: Option<&Path>, catalog: &UnitCatalog) -> BattleConfig {
    let settings = match path {
        Some(path) => load_settings(path)
            .unwrap_or_else(|e| fatal(&format!("Cannot load settings '{}'", path.display()), e)),
        None => BattleSettings::default(),
    };
    match settings.active_config(catalog) {
        Ok(config) => config.clone(),
        Err(e) => fatal("Battle settings rejected", e),
    }
}

fn load_fleet(path: &Path, catalog: &UnitCatalog) -> BattleScenario {
    BattleScenario::load(path, catalog)
        .unwrap_or_else(|e| fatal(&format!("Cannot load fleet '{}'", path.display()), e))
}

/// Simulate a single battle
fn cmd_simulate(fleet: &Path, engine: EngineKind, seed: u64, config: Option<&Path>, json: bool) {
    let catalog = UnitCatalog::standard();
    let battle_config = battle_config(config, catalog);
    let scenario = load_fleet(fleet, catalog);

    tracing::info!(
        scenario = %scenario.name,
        engine = %engine,
        seed = seed,
        attacker_units = scenario.attacker.total_amount(),
        defender_units = scenario.defender.total_amount(),
        "Simulating battle"
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let start = Instant::now();
    let result = engine
        .engine()
        .simulate(&scenario.input(catalog), &battle_config, &mut rng)
        .unwrap_or_else(|e| fatal("Battle rejected", e));
    let duration = start.elapsed();

    let report = BattleReport::new(&scenario.name, &result, catalog, engine, seed, duration);
    if json {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => fatal("Cannot serialize report", e),
        }
    } else {
        print!("{report}");
    }
}

/// Compare both engines on the built-in scenarios
fn cmd_compare(seed: u64, only: Option<&str>, config: Option<&Path>) {
    let catalog = UnitCatalog::standard();
    let battle_config = battle_config(config, catalog);
    let scenarios = builtin_scenarios(catalog).unwrap_or_else(|e| fatal("Bad built-in scenario", e));

    let selected: Vec<&BattleScenario> = scenarios
        .iter()
        .filter(|s| only.map_or(true, |name| s.name == name))
        .collect();
    if selected.is_empty() {
        let names: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
        fatal(
            "No such scenario",
            format!("{} (available: {})", only.unwrap_or_default(), names.join(", ")),
        );
    }

    let mut comparisons = Vec::with_capacity(selected.len());
    for scenario in selected {
        tracing::info!(scenario = %scenario.name, units = scenario.total_units(), "Running scenario");
        let comparison = compare_engines(scenario, catalog, &battle_config, seed)
            .unwrap_or_else(|e| fatal("Battle rejected", e));
        print!("{}", render_comparison(&comparison));
        comparisons.push(comparison);
    }
    print!("{}", render_overview(&comparisons));

    if comparisons.iter().any(|c| !c.is_identical()) {
        std::process::exit(1);
    }
}

/// Run a batch of battles
fn cmd_batch(
    fleet: &Path,
    count: u32,
    seed: u64,
    parallel: u32,
    engine: EngineKind,
    output: PathBuf,
    config: Option<&Path>,
) {
    let catalog = UnitCatalog::standard();
    let battle_config = battle_config(config, catalog);
    let scenario = load_fleet(fleet, catalog);

    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        scenario = %scenario.name,
        count = count,
        parallel = parallel,
        seed = seed,
        engine = %engine,
        output = %output.display(),
        cpus_available = num_cpus,
        "Batch configuration"
    );

    if let Err(e) = std::fs::create_dir_all(&output) {
        fatal(
            &format!("Cannot create output directory '{}'", output.display()),
            e,
        );
    }

    let batch_config = BatchConfig::new(&scenario.name, count)
        .with_output(output)
        .with_seed(seed)
        .with_engine(engine)
        .with_parallel(parallel);
    let results_path = batch_config.results_path();
    let results = run_batch(batch_config, &scenario, catalog, &battle_config);

    if let Err(e) = results.save(&results_path) {
        fatal("Failed to save results", e);
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Battles:       {}", summary.total_battles);
    if !results.errors.is_empty() {
        eprintln!("Failed:        {}", results.errors.len());
    }
    eprintln!(
        "Attacker wins: {} ({:.1}%)",
        summary.attacker_wins,
        summary.attacker_win_rate * 100.0
    );
    eprintln!(
        "Defender wins: {} ({:.1}%)",
        summary.defender_wins,
        summary.defender_win_rate * 100.0
    );
    eprintln!(
        "Draws:         {} ({:.1}%)",
        summary.draws,
        summary.draw_rate * 100.0
    );
    eprintln!(
        "Rounds:        {:.2} mean ({}..={})",
        summary.mean_rounds, summary.min_rounds, summary.max_rounds
    );
    eprintln!("Attacker loss: {:.0} mean", summary.mean_attacker_losses);
    eprintln!("Defender loss: {:.0} mean", summary.mean_defender_losses);
    eprintln!("Debris:        {:.0} mean", summary.mean_debris);
    eprintln!("Moon chance:   {:.2}% mean", summary.mean_moon_chance);
    eprintln!("Duration:      {:.1}s", results.duration_seconds);
    eprintln!("Results:       {}", results_path.display());

    if !results.errors.is_empty() {
        std::process::exit(1);
    }
}

/// Validate data files
fn cmd_validate(catalog_path: Option<&Path>, config: Option<&Path>, fleet: Option<&Path>) {
    let custom;
    let catalog = match catalog_path {
        Some(path) => {
            custom = load_catalog(path)
                .unwrap_or_else(|e| fatal(&format!("Invalid catalog '{}'", path.display()), e));
            &custom
        }
        None => UnitCatalog::standard(),
    };
    println!("Catalog OK: {} units", catalog.len());

    if let Some(path) = config {
        let battle_config = battle_config(Some(path), catalog);
        println!(
            "Settings OK: {} rounds max, {} rapid fire entries",
            battle_config.max_rounds,
            battle_config.rapid_fire.len()
        );
    }

    if let Some(path) = fleet {
        let scenario = load_fleet(path, catalog);
        println!(
            "Fleet OK: {} attacker units, {} defender units",
            scenario.attacker.total_amount(),
            scenario.defender.total_amount()
        );
    }
}
