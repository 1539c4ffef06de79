//! Battle resolution.
//!
//! A battle goes through three stages:
//!
//! 1. **Prepare** ([`PreparedBattle::new`]): validate input and config,
//!    compute effective stats once per unit type and side, snapshot the
//!    starting fleets.
//! 2. **Resolve** ([`BattleEngine::resolve_rounds`]): fight up to
//!    `max_rounds` rounds. This is the only stage that differs between
//!    engines.
//! 3. **Conclude**: derive survivors, losses, debris, loot and moon chance
//!    from the round log.
//!
//! ## Round rules
//!
//! - Every unit fires one shot per round. The attacker fires first, then
//!   the defender; units destroyed this round still fire.
//! - Targets are drawn from opposing stacks that had units at round start.
//! - Damage below `bounce_threshold_percent` of the target's shield is
//!   ignored entirely.
//! - Shields absorb up to the shield value of the target; the rest drains
//!   the stack's shared hit-point pool.
//! - At round end every stack keeps `ceil(pool / hull)` units and its
//!   shields recharge.
//!
//! Engines must consume the random generator identically, so the same
//! seed yields the same [`BattleResult`] from every engine.

/// Checks an internal invariant in debug builds, or in any build with the
/// `debug-validation` feature. Release builds clamp instead.
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {
        if cfg!(any(debug_assertions, feature = "debug-validation")) {
            assert!($cond, $($arg)+);
        }
    };
}

mod config;
mod optimized;
mod reference;
mod result;
mod rules;
mod setup;

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use config::{
    BattleConfig, BattleSettings, ExplosionRule, MoonChanceFormula, RapidFireEntry,
    RapidFireTable, ShieldModel, TargetSelection, MAX_RAPID_FIRE_SHOTS, MAX_ROUNDS_LIMIT,
};
pub use optimized::OptimizedEngine;
pub use reference::ReferenceEngine;
pub use result::{plunder, BattleResult, ResultDifference, RoundSummary, Winner};
pub use setup::{Combatant, FireStats, PreparedBattle, PreparedSide, RoundLog, RoundRecord, Side};

use crate::catalog::UnitCatalog;
use crate::data::UnknownName;
use crate::error::Result;
use crate::fleet::UnitCollection;
use crate::player::PlayerContext;
use crate::resources::ResourceBundle;

/// One side's fleet and research.
#[derive(Debug, Clone, Copy)]
pub struct SideInput<'a> {
    /// Units on this side. Never mutated by the engine.
    pub units: &'a UnitCollection,
    /// Research and class of this side.
    pub context: &'a PlayerContext,
}

/// Everything a battle needs besides config and randomness.
#[derive(Debug, Clone, Copy)]
pub struct BattleInput<'a> {
    /// Catalog the unit IDs refer to.
    pub catalog: &'a UnitCatalog,
    /// Attacking side. Must have at least one unit.
    pub attacker: SideInput<'a>,
    /// Defending side. May be empty.
    pub defender: SideInput<'a>,
    /// Defender's resource stock, the base for loot.
    pub defender_resources: ResourceBundle,
}

impl<'a> BattleInput<'a> {
    /// Create an input with an empty defender stock.
    #[must_use]
    pub fn new(
        catalog: &'a UnitCatalog,
        attacker_units: &'a UnitCollection,
        attacker_context: &'a PlayerContext,
        defender_units: &'a UnitCollection,
        defender_context: &'a PlayerContext,
    ) -> Self {
        Self {
            catalog,
            attacker: SideInput {
                units: attacker_units,
                context: attacker_context,
            },
            defender: SideInput {
                units: defender_units,
                context: defender_context,
            },
            defender_resources: ResourceBundle::ZERO,
        }
    }

    /// Builder: set the defender's resource stock.
    #[must_use]
    pub fn with_defender_resources(mut self, resources: ResourceBundle) -> Self {
        self.defender_resources = resources;
        self
    }
}

/// A battle engine.
///
/// Implementations only decide how rounds are resolved. Preparation and
/// conclusion are shared, so every engine reports results the same way.
pub trait BattleEngine: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Fight the rounds of a prepared battle.
    fn resolve_rounds(&self, battle: &PreparedBattle<'_>, rng: &mut dyn RngCore) -> RoundLog;

    /// Run a full battle.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any round runs if the input or
    /// config is invalid. Once rounds start the battle always completes.
    fn simulate(
        &self,
        input: &BattleInput<'_>,
        config: &BattleConfig,
        rng: &mut dyn RngCore,
    ) -> Result<BattleResult> {
        let battle = PreparedBattle::new(input, config)?;
        let log = self.resolve_rounds(&battle, rng);
        Ok(BattleResult::conclude(&battle, &log))
    }
}

/// The built-in engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Straightforward per-shot implementation.
    Reference,
    /// Struct-of-arrays implementation with precomputed shot outcomes.
    Optimized,
}

impl EngineKind {
    /// Both engines.
    pub const ALL: [Self; 2] = [Self::Reference, Self::Optimized];

    /// Engine instance.
    #[must_use]
    pub fn engine(self) -> &'static dyn BattleEngine {
        match self {
            Self::Reference => &ReferenceEngine,
            Self::Optimized => &OptimizedEngine,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Optimized => "optimized",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}
