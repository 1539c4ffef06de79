//! # Battle Core
//!
//! Fleet-versus-fleet battle computation for the space strategy game.
//!
//! This crate contains **only** computation:
//! - No rendering
//! - No file or network IO (catalogs and settings are parsed from caller-provided text)
//! - No process-global randomness (every battle receives its own seeded generator)
//!
//! This separation enables:
//! - Interchangeable battle engines that can be compared seed-for-seed
//! - Running many battles concurrently with zero shared mutable state
//! - Reproducible tests and benchmarks
//!
//! ## Crate Structure
//!
//! - [`resources`] - Metal/crystal/deuterium bundles
//! - [`data`] - Unit definitions and technologies
//! - [`catalog`] - Immutable, process-wide unit catalog
//! - [`player`] - Per-side research levels and player class
//! - [`properties`] - Effective stat calculation (research and class bonuses)
//! - [`fleet`] - Unit compositions
//! - [`battle`] - Battle configuration, engines and results
//! - [`math`] - Fixed-point helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battle;
pub mod catalog;
pub mod data;
pub mod error;
pub mod fleet;
pub mod math;
pub mod player;
pub mod properties;
pub mod resources;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::{
        BattleConfig, BattleEngine, BattleInput, BattleResult, BattleSettings, EngineKind,
        ExplosionRule, OptimizedEngine, ReferenceEngine, RoundSummary, ShieldModel, SideInput,
        TargetSelection, Winner,
    };
    pub use crate::catalog::{UnitCatalog, UnitId};
    pub use crate::data::{Technology, UnitCategory, UnitDefinition, UnitRole};
    pub use crate::error::{BattleError, Result};
    pub use crate::fleet::{UnitCollection, UnitStack};
    pub use crate::math::Fixed;
    pub use crate::player::{PlayerClass, PlayerContext};
    pub use crate::properties::{effective, EffectiveStats, PropertyDetails, PropertyKind};
    pub use crate::resources::ResourceBundle;
}
