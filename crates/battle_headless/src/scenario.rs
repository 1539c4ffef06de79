//! Fleet file loading.
//!
//! A fleet file is JSON describing both sides of a battle:
//!
//! ```json
//! {
//!   "attacker": {
//!     "units": { "light_fighter": 1667 },
//!     "research": { "weapon_technology": 15 },
//!     "class": "general"
//!   },
//!   "defender": { "rocket_launcher": 1667 },
//!   "resources": { "metal": 500000, "crystal": 250000, "deuterium": 0 }
//! }
//! ```
//!
//! A side may also be the bare units map, as the defender above is.
//! Unknown units and negative amounts are rejected. Everything else that
//! looks wrong is logged and replaced by a default so a sloppy file still
//! runs: unknown research keys are skipped, levels outside `0..=20` become
//! 10, and an unrecognised class is dropped.

use std::collections::BTreeMap;
use std::path::Path;

use battle_core::battle::BattleInput;
use battle_core::catalog::UnitCatalog;
use battle_core::data::Technology;
use battle_core::error::BattleError;
use battle_core::fleet::UnitCollection;
use battle_core::player::{PlayerClass, PlayerContext};
use battle_core::resources::ResourceBundle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Level used in place of a missing or out-of-range research level.
pub const DEFAULT_RESEARCH_LEVEL: u32 = 10;

/// Highest research level a fleet file may set.
pub const MAX_RESEARCH_LEVEL: u32 = 20;

/// Defender stock of each resource when the file gives none.
pub const DEFAULT_DEFENDER_STOCK: u64 = 1_000_000;

/// Research keys a fleet file may set. Other keys are ignored.
pub const ACCEPTED_RESEARCH: [Technology; 11] = [
    Technology::WeaponTechnology,
    Technology::ShieldingTechnology,
    Technology::ArmorTechnology,
    Technology::EnergyTechnology,
    Technology::LaserTechnology,
    Technology::IonTechnology,
    Technology::HyperspaceTechnology,
    Technology::CombustionDrive,
    Technology::ImpulseDrive,
    Technology::HyperspaceDrive,
    Technology::GravitonTechnology,
];

/// Error type for fleet file operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Fleet file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read fleet file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse JSON.
    #[error("Failed to parse fleet file: {0}")]
    ParseError(#[from] serde_json::Error),
    /// A unit name is not in the catalog.
    #[error("Unknown unit '{unit}' in {side} fleet")]
    UnknownUnit {
        /// `attacker` or `defender`.
        side: &'static str,
        /// Name as written in the file.
        unit: String,
    },
    /// A unit amount is negative.
    #[error("Invalid amount {amount} for '{unit}' in {side} fleet")]
    InvalidAmount {
        /// `attacker` or `defender`.
        side: &'static str,
        /// Name as written in the file.
        unit: String,
        /// Amount as written in the file.
        amount: i64,
    },
    /// Catalog or settings error.
    #[error(transparent)]
    Battle(#[from] BattleError),
}

/// One side as written in a fleet file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SideFile {
    /// `{"units": {..}, "research": {..}, "class": ..}`.
    Detailed {
        /// Unit machine names to amounts.
        units: BTreeMap<String, i64>,
        /// Technology machine names to levels.
        #[serde(default)]
        research: BTreeMap<String, Value>,
        /// Class name or numeric class ID.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<Value>,
    },
    /// Just the units map.
    Units(BTreeMap<String, i64>),
}

impl Default for SideFile {
    fn default() -> Self {
        Self::Units(BTreeMap::new())
    }
}

impl SideFile {
    fn units(&self) -> &BTreeMap<String, i64> {
        match self {
            Self::Detailed { units, .. } | Self::Units(units) => units,
        }
    }

    fn resolve_units(
        &self,
        side: &'static str,
        catalog: &UnitCatalog,
    ) -> Result<UnitCollection, ScenarioError> {
        let entries = self.units().iter().map(|(name, amount)| (name.as_str(), *amount));
        UnitCollection::from_named(catalog, entries).map_err(|e| match e {
            BattleError::UnknownUnit(unit) => ScenarioError::UnknownUnit { side, unit },
            BattleError::InvalidAmount { unit, amount } => {
                ScenarioError::InvalidAmount { side, unit, amount }
            }
            other => other.into(),
        })
    }

    fn context(&self, side: &'static str) -> PlayerContext {
        let mut context = PlayerContext::new();
        let Self::Detailed {
            research, class, ..
        } = self
        else {
            return context;
        };

        for (key, value) in research {
            let Some(technology) = accepted_technology(key) else {
                warn!(side, technology = %key, "Invalid research technology ignored");
                continue;
            };
            context.set_research_level(technology, research_level(side, key, value));
        }

        if let Some(class) = class {
            match parse_class(class) {
                Some(class) => context = context.with_class(class),
                None => warn!(side, class = %class, "Unknown player class ignored"),
            }
        }
        context
    }
}

fn accepted_technology(key: &str) -> Option<Technology> {
    let technology: Technology = key.parse().ok()?;
    ACCEPTED_RESEARCH.contains(&technology).then_some(technology)
}

fn research_level(side: &'static str, key: &str, value: &Value) -> u32 {
    match value.as_u64().and_then(|level| u32::try_from(level).ok()) {
        Some(level) if level <= MAX_RESEARCH_LEVEL => level,
        _ => {
            warn!(
                side,
                technology = %key,
                level = %value,
                fallback = DEFAULT_RESEARCH_LEVEL,
                "Invalid research level replaced"
            );
            DEFAULT_RESEARCH_LEVEL
        }
    }
}

fn parse_class(value: &Value) -> Option<PlayerClass> {
    match value {
        Value::String(name) => name.parse().ok(),
        Value::Number(id) => id
            .as_u64()
            .and_then(|id| u8::try_from(id).ok())
            .and_then(PlayerClass::from_id),
        _ => None,
    }
}

/// A fleet file as written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetFile {
    /// Attacking side.
    pub attacker: SideFile,
    /// Defending side.
    #[serde(default)]
    pub defender: SideFile,
    /// Defender stock. Defaults to [`DEFAULT_DEFENDER_STOCK`] of each resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceBundle>,
}

/// A fully resolved battle setup, ready to simulate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleScenario {
    /// Label used in logs and reports.
    pub name: String,
    /// Attacking units.
    pub attacker: UnitCollection,
    /// Attacker research and class.
    pub attacker_context: PlayerContext,
    /// Defending units.
    pub defender: UnitCollection,
    /// Defender research and class.
    pub defender_context: PlayerContext,
    /// Defender stock, the base for loot.
    pub defender_resources: ResourceBundle,
}

impl BattleScenario {
    /// Scenario with empty research and the default defender stock.
    #[must_use]
    pub fn new(name: impl Into<String>, attacker: UnitCollection, defender: UnitCollection) -> Self {
        Self {
            name: name.into(),
            attacker,
            attacker_context: PlayerContext::new(),
            defender,
            defender_context: PlayerContext::new(),
            defender_resources: default_defender_stock(),
        }
    }

    /// Builder: set both research contexts.
    #[must_use]
    pub fn with_contexts(mut self, attacker: PlayerContext, defender: PlayerContext) -> Self {
        self.attacker_context = attacker;
        self.defender_context = defender;
        self
    }

    /// Builder: set the defender stock.
    #[must_use]
    pub fn with_resources(mut self, resources: ResourceBundle) -> Self {
        self.defender_resources = resources;
        self
    }

    /// Load and resolve a fleet file.
    pub fn load<P: AsRef<Path>>(path: P, catalog: &UnitCatalog) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
        Self::from_json_str(&contents, name, catalog)
    }

    /// Resolve fleet JSON.
    pub fn from_json_str(
        json: &str,
        name: impl Into<String>,
        catalog: &UnitCatalog,
    ) -> Result<Self, ScenarioError> {
        let file: FleetFile = serde_json::from_str(json)?;
        Self::from_file(&file, name, catalog)
    }

    /// Resolve an already parsed fleet file.
    pub fn from_file(
        file: &FleetFile,
        name: impl Into<String>,
        catalog: &UnitCatalog,
    ) -> Result<Self, ScenarioError> {
        let scenario = Self {
            name: name.into(),
            attacker: file.attacker.resolve_units("attacker", catalog)?,
            attacker_context: file.attacker.context("attacker"),
            defender: file.defender.resolve_units("defender", catalog)?,
            defender_context: file.defender.context("defender"),
            defender_resources: file.resources.unwrap_or_else(default_defender_stock),
        };
        debug!(
            scenario = %scenario.name,
            attacker_units = scenario.attacker.total_amount(),
            defender_units = scenario.defender.total_amount(),
            "Fleet file resolved"
        );
        Ok(scenario)
    }

    /// Borrow as engine input.
    #[must_use]
    pub fn input<'a>(&'a self, catalog: &'a UnitCatalog) -> BattleInput<'a> {
        BattleInput::new(
            catalog,
            &self.attacker,
            &self.attacker_context,
            &self.defender,
            &self.defender_context,
        )
        .with_defender_resources(self.defender_resources)
    }

    /// Units on both sides.
    #[must_use]
    pub fn total_units(&self) -> u64 {
        self.attacker.total_amount() + self.defender.total_amount()
    }
}

fn default_defender_stock() -> ResourceBundle {
    ResourceBundle::new(
        DEFAULT_DEFENDER_STOCK,
        DEFAULT_DEFENDER_STOCK,
        DEFAULT_DEFENDER_STOCK,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> &'static UnitCatalog {
        UnitCatalog::standard()
    }

    fn unit(name: &str) -> battle_core::catalog::UnitId {
        catalog().resolve(name).unwrap()
    }

    #[test]
    fn test_detailed_sides() {
        let json = r#"{
            "attacker": {
                "units": {"light_fighter": 1667, "cruiser": 3},
                "research": {"weapon_technology": 15, "armor_technology": 7},
                "class": "general"
            },
            "defender": {
                "units": {"rocket_launcher": 1667},
                "research": {"shielding_technology": 12}
            }
        }"#;
        let scenario = BattleScenario::from_json_str(json, "lf_vs_rl", catalog()).unwrap();

        assert_eq!(scenario.attacker.amount_of(unit("light_fighter")), 1667);
        assert_eq!(scenario.attacker.amount_of(unit("cruiser")), 3);
        assert_eq!(scenario.defender.amount_of(unit("rocket_launcher")), 1667);
        assert_eq!(
            scenario
                .attacker_context
                .research_level(Technology::WeaponTechnology),
            15
        );
        assert_eq!(scenario.attacker_context.class(), Some(PlayerClass::General));
        assert_eq!(
            scenario
                .defender_context
                .research_level(Technology::ShieldingTechnology),
            12
        );
        assert_eq!(scenario.defender_context.class(), None);
    }

    #[test]
    fn test_bare_units_map() {
        let json = r#"{"attacker": {"bomber": 4}, "defender": {"plasma_turret": 2}}"#;
        let scenario = BattleScenario::from_json_str(json, "bare", catalog()).unwrap();
        assert_eq!(scenario.attacker.amount_of(unit("bomber")), 4);
        assert_eq!(scenario.defender.amount_of(unit("plasma_turret")), 2);
        assert_eq!(scenario.attacker_context, PlayerContext::new());
    }

    #[test]
    fn test_missing_defender_is_empty() {
        let json = r#"{"attacker": {"units": {"small_cargo": 1}}}"#;
        let scenario = BattleScenario::from_json_str(json, "raid", catalog()).unwrap();
        assert!(scenario.defender.is_empty());
    }

    #[test]
    fn test_invalid_research_keys_ignored() {
        let json = r#"{
            "attacker": {
                "units": {"light_fighter": 1},
                "research": {"weapon_technology": 3, "warp_technology": 9, "plasma_technology": 8}
            }
        }"#;
        let scenario = BattleScenario::from_json_str(json, "keys", catalog()).unwrap();
        let research: Vec<_> = scenario.attacker_context.research().collect();
        assert_eq!(research, vec![(Technology::WeaponTechnology, 3)]);
    }

    #[test]
    fn test_out_of_range_levels_replaced() {
        let json = r#"{
            "attacker": {
                "units": {"light_fighter": 1},
                "research": {
                    "weapon_technology": 21,
                    "shielding_technology": -1,
                    "armor_technology": "high",
                    "ion_technology": 2.5,
                    "laser_technology": 20,
                    "energy_technology": 0
                }
            }
        }"#;
        let ctx = BattleScenario::from_json_str(json, "levels", catalog())
            .unwrap()
            .attacker_context;
        assert_eq!(ctx.research_level(Technology::WeaponTechnology), 10);
        assert_eq!(ctx.research_level(Technology::ShieldingTechnology), 10);
        assert_eq!(ctx.research_level(Technology::ArmorTechnology), 10);
        assert_eq!(ctx.research_level(Technology::IonTechnology), 10);
        assert_eq!(ctx.research_level(Technology::LaserTechnology), 20);
        assert_eq!(ctx.research_level(Technology::EnergyTechnology), 0);
    }

    #[test]
    fn test_class_by_id_and_unknown_class() {
        let json = r#"{
            "attacker": {"units": {"light_fighter": 1}, "class": 1},
            "defender": {"units": {"light_fighter": 1}, "class": "pirate"}
        }"#;
        let scenario = BattleScenario::from_json_str(json, "classes", catalog()).unwrap();
        assert_eq!(
            scenario.attacker_context.class(),
            Some(PlayerClass::Collector)
        );
        assert_eq!(scenario.defender_context.class(), None);
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let json = r#"{"attacker": {"light_fighter": 1}, "defender": {"space_whale": 1}}"#;
        let err = BattleScenario::from_json_str(json, "bad", catalog()).unwrap_err();
        match err {
            ScenarioError::UnknownUnit { side, unit } => {
                assert_eq!(side, "defender");
                assert_eq!(unit, "space_whale");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_amount_rejected() {
        let json = r#"{"attacker": {"units": {"cruiser": -5}}}"#;
        let err = BattleScenario::from_json_str(json, "bad", catalog()).unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::InvalidAmount {
                side: "attacker",
                amount: -5,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = BattleScenario::from_json_str("{\"attacker\": ", "bad", catalog()).unwrap_err();
        assert!(matches!(err, ScenarioError::ParseError(_)));
    }

    #[test]
    fn test_resources_default_and_partial() {
        let json = r#"{"attacker": {"light_fighter": 1}}"#;
        let scenario = BattleScenario::from_json_str(json, "stock", catalog()).unwrap();
        assert_eq!(
            scenario.defender_resources,
            ResourceBundle::new(1_000_000, 1_000_000, 1_000_000)
        );

        let json = r#"{"attacker": {"light_fighter": 1}, "resources": {"metal": 40}}"#;
        let scenario = BattleScenario::from_json_str(json, "stock", catalog()).unwrap();
        assert_eq!(scenario.defender_resources, ResourceBundle::new(40, 0, 0));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skirmish.json");
        std::fs::write(
            &path,
            r#"{"attacker": {"heavy_fighter": 10}, "defender": {"light_laser": 10}}"#,
        )
        .unwrap();

        let scenario = BattleScenario::load(&path, catalog()).unwrap();
        assert_eq!(scenario.name, "skirmish");
        assert_eq!(scenario.total_units(), 20);

        let missing = BattleScenario::load(dir.path().join("nope.json"), catalog());
        assert!(matches!(missing, Err(ScenarioError::FileNotFound(_))));
    }

    #[test]
    fn test_demo_fleet_parses() {
        let json = include_str!("../../../demos/fleet.json");
        let scenario = BattleScenario::from_json_str(json, "demo", catalog()).unwrap();
        assert!(!scenario.attacker.is_empty());
        assert!(!scenario.defender.is_empty());
    }
}
