//! Battle tunables.
//!
//! Every gameplay constant the engines use lives in [`BattleConfig`]. The
//! defaults reproduce the standard rules; everything can be overridden from
//! RON, field by field.
//!
//! # Example RON
//!
//! ```ron
//! (
//!     max_rounds: 6,
//!     shield_model: Depleting,
//!     explosion: Overkill(damage_multiple_percent: 150, chance_percent: 20),
//! )
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::catalog::UnitCatalog;
use crate::error::{BattleError, Result};
use crate::resources::ResourceBundle;

/// Hard ceiling for `max_rounds`.
pub const MAX_ROUNDS_LIMIT: u32 = 1_000;

/// Largest rapid fire value. Above it the chance of another shot would
/// round to certainty.
pub const MAX_RAPID_FIRE_SHOTS: u32 = 10_000;

/// How shields absorb incoming shots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShieldModel {
    /// Every shot is absorbed up to the full shield value.
    #[default]
    PerShot,
    /// Absorption drains a per-stack shield pool (amount × shield) that
    /// refills at the start of every round.
    Depleting,
}

/// How a shot picks its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSelection {
    /// Uniform over opposing stacks that had units at round start.
    #[default]
    UniformStack,
    /// Uniform over opposing units at round start, so large stacks draw
    /// proportionally more fire.
    UnitWeighted,
}

/// Extra destruction beyond the aggregate hit-point pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExplosionRule {
    /// Units only die when their hit points run out.
    Disabled,
    /// After a hit, if the front unit of the stack is below
    /// `threshold_percent` of its hull, it explodes with chance
    /// `100 - remaining hull percent`.
    HullThreshold {
        /// Remaining-hull percentage below which explosions can happen.
        threshold_percent: u32,
    },
    /// A shot dealing at least `damage_multiple_percent` of one unit's hull
    /// destroys the front unit outright with `chance_percent` probability.
    Overkill {
        /// Raw shot damage, in percent of a unit's hull, that qualifies.
        damage_multiple_percent: u32,
        /// Chance of the extra kill.
        chance_percent: u32,
    },
}

impl Default for ExplosionRule {
    fn default() -> Self {
        Self::HullThreshold {
            threshold_percent: 70,
        }
    }
}

/// Moon formation chance from debris volume.
///
/// One percent per `resources_per_percent` resources of debris, capped at
/// `max_percent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct MoonChanceFormula {
    /// Debris resources per percent of moon chance.
    pub resources_per_percent: u64,
    /// Maximum chance.
    pub max_percent: u32,
}

impl Default for MoonChanceFormula {
    fn default() -> Self {
        Self {
            resources_per_percent: 100_000,
            max_percent: 20,
        }
    }
}

impl MoonChanceFormula {
    /// Moon chance for a debris field, in percent.
    #[must_use]
    pub fn chance_percent(&self, debris: &ResourceBundle) -> u32 {
        if self.resources_per_percent == 0 {
            return 0;
        }
        let raw = debris.total() / self.resources_per_percent;
        u32::try_from(raw).unwrap_or(u32::MAX).min(self.max_percent)
    }
}

/// Extra shots one unit type gets against another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RapidFireEntry {
    /// Machine name of the firing unit.
    pub shooter: String,
    /// Machine name of the target unit.
    pub target: String,
    /// Rapid fire value `r`. After each shot at this target, another shot
    /// follows with chance `(r - 1) / r`.
    pub shots: u32,
}

/// Rapid fire values keyed by machine names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RapidFireTable {
    entries: Vec<RapidFireEntry>,
}

/// Standard rapid fire values as `(shooter, target, shots)`.
const STANDARD_RAPID_FIRE: &[(&str, &str, u32)] = &[
    ("small_cargo", "espionage_probe", 5),
    ("small_cargo", "solar_satellite", 5),
    ("small_cargo", "crawler", 5),
    ("large_cargo", "espionage_probe", 5),
    ("large_cargo", "solar_satellite", 5),
    ("large_cargo", "crawler", 5),
    ("light_fighter", "espionage_probe", 5),
    ("light_fighter", "solar_satellite", 5),
    ("light_fighter", "crawler", 5),
    ("heavy_fighter", "small_cargo", 3),
    ("heavy_fighter", "espionage_probe", 5),
    ("heavy_fighter", "solar_satellite", 5),
    ("heavy_fighter", "crawler", 5),
    ("cruiser", "light_fighter", 6),
    ("cruiser", "espionage_probe", 5),
    ("cruiser", "solar_satellite", 5),
    ("cruiser", "rocket_launcher", 10),
    ("cruiser", "crawler", 5),
    ("battle_ship", "espionage_probe", 5),
    ("battle_ship", "solar_satellite", 5),
    ("battle_ship", "pathfinder", 5),
    ("battle_ship", "crawler", 5),
    ("battlecruiser", "small_cargo", 3),
    ("battlecruiser", "large_cargo", 3),
    ("battlecruiser", "heavy_fighter", 4),
    ("battlecruiser", "cruiser", 4),
    ("battlecruiser", "battle_ship", 7),
    ("battlecruiser", "espionage_probe", 5),
    ("battlecruiser", "solar_satellite", 5),
    ("battlecruiser", "crawler", 5),
    ("bomber", "espionage_probe", 5),
    ("bomber", "solar_satellite", 5),
    ("bomber", "rocket_launcher", 20),
    ("bomber", "light_laser", 20),
    ("bomber", "heavy_laser", 10),
    ("bomber", "ion_cannon", 10),
    ("bomber", "gauss_cannon", 5),
    ("bomber", "plasma_turret", 5),
    ("bomber", "crawler", 5),
    ("destroyer", "espionage_probe", 5),
    ("destroyer", "solar_satellite", 5),
    ("destroyer", "light_laser", 10),
    ("destroyer", "battlecruiser", 2),
    ("destroyer", "crawler", 5),
    ("deathstar", "small_cargo", 250),
    ("deathstar", "large_cargo", 250),
    ("deathstar", "light_fighter", 200),
    ("deathstar", "heavy_fighter", 100),
    ("deathstar", "cruiser", 33),
    ("deathstar", "battle_ship", 30),
    ("deathstar", "battlecruiser", 15),
    ("deathstar", "bomber", 25),
    ("deathstar", "destroyer", 5),
    ("deathstar", "reaper", 10),
    ("deathstar", "pathfinder", 30),
    ("deathstar", "colony_ship", 250),
    ("deathstar", "recycler", 250),
    ("deathstar", "espionage_probe", 1250),
    ("deathstar", "solar_satellite", 1250),
    ("deathstar", "crawler", 1250),
    ("deathstar", "rocket_launcher", 200),
    ("deathstar", "light_laser", 200),
    ("deathstar", "heavy_laser", 100),
    ("deathstar", "gauss_cannon", 50),
    ("deathstar", "ion_cannon", 100),
    ("reaper", "espionage_probe", 5),
    ("reaper", "solar_satellite", 5),
    ("reaper", "battle_ship", 7),
    ("reaper", "bomber", 4),
    ("reaper", "destroyer", 3),
    ("reaper", "crawler", 5),
    ("pathfinder", "espionage_probe", 5),
    ("pathfinder", "solar_satellite", 5),
    ("pathfinder", "cruiser", 3),
    ("pathfinder", "light_fighter", 3),
    ("pathfinder", "heavy_fighter", 2),
    ("pathfinder", "crawler", 5),
    ("recycler", "espionage_probe", 5),
    ("recycler", "solar_satellite", 5),
    ("recycler", "crawler", 5),
    ("colony_ship", "espionage_probe", 5),
    ("colony_ship", "solar_satellite", 5),
    ("colony_ship", "crawler", 5),
];

impl RapidFireTable {
    /// Table with no rapid fire at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The standard rapid fire values.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            entries: STANDARD_RAPID_FIRE
                .iter()
                .map(|&(shooter, target, shots)| RapidFireEntry {
                    shooter: shooter.to_string(),
                    target: target.to_string(),
                    shots,
                })
                .collect(),
        }
    }

    /// Set the value for a pair, replacing any existing one.
    pub fn set(&mut self, shooter: &str, target: &str, shots: u32) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.shooter == shooter && e.target == target)
        {
            Some(entry) => entry.shots = shots,
            None => self.entries.push(RapidFireEntry {
                shooter: shooter.to_string(),
                target: target.to_string(),
                shots,
            }),
        }
    }

    /// Value for a pair, if any.
    #[must_use]
    pub fn get(&self, shooter: &str, target: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.shooter == shooter && e.target == target)
            .map(|e| e.shots)
    }

    /// All entries.
    pub fn iter(&self) -> impl Iterator<Item = &RapidFireEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RapidFireTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Gameplay tunables for one battle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Rounds before the battle ends in a draw.
    pub max_rounds: u32,
    /// Share of destroyed ships' metal and crystal that becomes debris.
    pub debris_percent: u32,
    /// Share of the defender's resources a winning attacker may take.
    pub loot_percent: u32,
    /// Moon chance formula.
    pub moon_chance: MoonChanceFormula,
    /// Shield absorption model.
    pub shield_model: ShieldModel,
    /// Shots below this percentage of the target's shield bounce off.
    pub bounce_threshold_percent: u32,
    /// Target selection policy.
    pub target_selection: TargetSelection,
    /// Explosion rule.
    pub explosion: ExplosionRule,
    /// Whether rapid fire is used at all.
    pub rapid_fire_enabled: bool,
    /// Rapid fire values.
    pub rapid_fire: RapidFireTable,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_rounds: 6,
            debris_percent: 30,
            loot_percent: 50,
            moon_chance: MoonChanceFormula::default(),
            shield_model: ShieldModel::default(),
            bounce_threshold_percent: 1,
            target_selection: TargetSelection::default(),
            explosion: ExplosionRule::default(),
            rapid_fire_enabled: true,
            rapid_fire: RapidFireTable::standard(),
        }
    }
}

fn check_percent(field: &'static str, value: u32) -> Result<()> {
    if value > 100 {
        return Err(BattleError::InvalidSetting {
            field,
            reason: format!("{value} is above 100 percent"),
        });
    }
    Ok(())
}

impl BattleConfig {
    /// Parse a config from RON. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParseError`] for malformed RON.
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| BattleError::DataParseError {
            path: label.to_string(),
            message: e.to_string(),
        })
    }

    /// Builder: set the shield model.
    #[must_use]
    pub fn with_shield_model(mut self, model: ShieldModel) -> Self {
        self.shield_model = model;
        self
    }

    /// Builder: set the target selection policy.
    #[must_use]
    pub fn with_target_selection(mut self, selection: TargetSelection) -> Self {
        self.target_selection = selection;
        self
    }

    /// Builder: set the explosion rule.
    #[must_use]
    pub fn with_explosion(mut self, rule: ExplosionRule) -> Self {
        self.explosion = rule;
        self
    }

    /// Builder: switch rapid fire on or off.
    #[must_use]
    pub fn with_rapid_fire(mut self, enabled: bool) -> Self {
        self.rapid_fire_enabled = enabled;
        self
    }

    /// Builder: set the round limit.
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Check every tunable against its range and the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidSetting`] for out-of-range values and
    /// [`BattleError::UnknownUnit`] for rapid fire entries naming units the
    /// catalog does not have.
    pub fn validate(&self, catalog: &UnitCatalog) -> Result<()> {
        if self.max_rounds == 0 || self.max_rounds > MAX_ROUNDS_LIMIT {
            return Err(BattleError::InvalidSetting {
                field: "max_rounds",
                reason: format!("{} is outside 1..={MAX_ROUNDS_LIMIT}", self.max_rounds),
            });
        }
        check_percent("debris_percent", self.debris_percent)?;
        check_percent("loot_percent", self.loot_percent)?;
        check_percent("bounce_threshold_percent", self.bounce_threshold_percent)?;
        check_percent("moon_chance.max_percent", self.moon_chance.max_percent)?;
        if self.moon_chance.resources_per_percent == 0 {
            return Err(BattleError::InvalidSetting {
                field: "moon_chance.resources_per_percent",
                reason: "must be greater than zero".to_string(),
            });
        }

        match self.explosion {
            ExplosionRule::Disabled => {}
            ExplosionRule::HullThreshold { threshold_percent } => {
                check_percent("explosion.threshold_percent", threshold_percent)?;
            }
            ExplosionRule::Overkill {
                damage_multiple_percent,
                chance_percent,
            } => {
                if damage_multiple_percent == 0 {
                    return Err(BattleError::InvalidSetting {
                        field: "explosion.damage_multiple_percent",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                check_percent("explosion.chance_percent", chance_percent)?;
            }
        }

        let mut seen = HashSet::new();
        for entry in self.rapid_fire.iter() {
            catalog.resolve(&entry.shooter)?;
            catalog.resolve(&entry.target)?;
            if entry.shots == 0 || entry.shots > MAX_RAPID_FIRE_SHOTS {
                return Err(BattleError::InvalidSetting {
                    field: "rapid_fire",
                    reason: format!(
                        "{} -> {} has {} shots, expected 1..={MAX_RAPID_FIRE_SHOTS}",
                        entry.shooter, entry.target, entry.shots
                    ),
                });
            }
            if !seen.insert((entry.shooter.as_str(), entry.target.as_str())) {
                return Err(BattleError::InvalidSetting {
                    field: "rapid_fire",
                    reason: format!("{} -> {} is listed twice", entry.shooter, entry.target),
                });
            }
        }
        Ok(())
    }
}

/// Settings provider view: a feature switch plus the tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleSettings {
    /// Whether battle simulation is available.
    pub enabled: bool,
    /// Tunables.
    pub config: BattleConfig,
}

impl Default for BattleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            config: BattleConfig::default(),
        }
    }
}

impl BattleSettings {
    /// Parse settings from RON.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParseError`] for malformed RON.
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| BattleError::DataParseError {
            path: label.to_string(),
            message: e.to_string(),
        })
    }

    /// The validated config, if the feature is on.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::Disabled`] when switched off, or any error from
    /// [`BattleConfig::validate`].
    pub fn active_config(&self, catalog: &UnitCatalog) -> Result<&BattleConfig> {
        if !self.enabled {
            return Err(BattleError::Disabled);
        }
        self.config.validate(catalog)?;
        Ok(&self.config)
    }
}
