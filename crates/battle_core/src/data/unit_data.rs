//! Unit data structures for data-driven ship and defense definitions.

use serde::{Deserialize, Serialize};

use super::Technology;
use crate::resources::ResourceBundle;

/// Whether a unit flies or is built into a planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitCategory {
    /// Mobile ship. Destroyed ships leave debris.
    Ship,
    /// Planetary defense structure. Never leaves debris.
    Defense,
}

/// Play-style role of a unit.
///
/// Player class bonuses key on the role rather than on unit names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitRole {
    /// Cargo transporters.
    Cargo,
    /// Warships.
    Combat,
    /// Capital ships outside the general's speed bonus.
    Siege,
    /// Debris collectors.
    Recycler,
    /// Exploration ships.
    Pathfinder,
    /// Probes, colony ships, satellites and crawlers.
    Civil,
    /// Planetary defenses.
    Defense,
}

/// A minimum research level needed to build a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Required technology.
    pub technology: Technology,
    /// Minimum level.
    pub level: u32,
}

/// A research threshold that replaces a unit's base speed.
///
/// Small cargo ships, for example, switch to the impulse drive at
/// impulse level 5 and get a higher base speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedUpgrade {
    /// Drive technology that triggers the upgrade.
    pub technology: Technology,
    /// Minimum level of that technology.
    pub level: u32,
    /// Base speed that replaces the unit's own base speed.
    pub base_speed: u64,
}

/// Unmodified unit statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseStats {
    /// Damage per shot.
    pub attack: u64,
    /// Damage absorbed per incoming shot.
    pub shield: u64,
    /// Hit points of a single unit.
    pub structural_integrity: u64,
    /// Flight speed.
    pub speed: u64,
    /// Cargo capacity.
    pub capacity: u64,
    /// Deuterium consumption.
    pub fuel: u64,
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// (
///     machine_name: "light_fighter",
///     title: "Light Fighter",
///     category: Ship,
///     role: Combat,
///     cost: (metal: 3000, crystal: 1000, deuterium: 0),
///     stats: (
///         attack: 50,
///         shield: 10,
///         structural_integrity: 4000,
///         speed: 12500,
///         capacity: 50,
///         fuel: 20,
///     ),
///     requirements: [(technology: combustion_drive, level: 1)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDefinition {
    /// Stable unique identifier (e.g. `light_fighter`).
    pub machine_name: String,

    /// Human-readable name.
    pub title: String,

    /// Ship or defense.
    pub category: UnitCategory,

    /// Role used by class bonuses.
    pub role: UnitRole,

    /// Production cost of one unit.
    pub cost: ResourceBundle,

    /// Unmodified statistics.
    pub stats: BaseStats,

    /// Technologies required to build this unit.
    #[serde(default)]
    pub requirements: Vec<Requirement>,

    /// Speed upgrades in declared order. Later applicable entries win.
    #[serde(default)]
    pub speed_upgrades: Vec<SpeedUpgrade>,
}

impl UnitDefinition {
    /// True if this unit is a ship.
    #[must_use]
    pub fn is_ship(&self) -> bool {
        self.category == UnitCategory::Ship
    }

    /// Minimum level of `technology` needed to build this unit, if any.
    #[must_use]
    pub fn required_level(&self, technology: Technology) -> Option<u32> {
        self.requirements
            .iter()
            .find(|r| r.technology == technology)
            .map(|r| r.level)
    }

    /// The first drive technology in the requirement list.
    #[must_use]
    pub fn required_drive(&self) -> Option<Technology> {
        self.requirements
            .iter()
            .map(|r| r.technology)
            .find(|t| t.is_drive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bomber() -> UnitDefinition {
        UnitDefinition {
            machine_name: "bomber".to_string(),
            title: "Bomber".to_string(),
            category: UnitCategory::Ship,
            role: UnitRole::Combat,
            cost: ResourceBundle::new(50_000, 25_000, 15_000),
            stats: BaseStats {
                attack: 1_000,
                shield: 500,
                structural_integrity: 75_000,
                speed: 4_000,
                capacity: 500,
                fuel: 700,
            },
            requirements: vec![
                Requirement {
                    technology: Technology::ImpulseDrive,
                    level: 6,
                },
                Requirement {
                    technology: Technology::PlasmaTechnology,
                    level: 5,
                },
            ],
            speed_upgrades: vec![SpeedUpgrade {
                technology: Technology::HyperspaceDrive,
                level: 8,
                base_speed: 5_000,
            }],
        }
    }

    #[test]
    fn test_required_drive() {
        assert_eq!(bomber().required_drive(), Some(Technology::ImpulseDrive));
    }

    #[test]
    fn test_required_level() {
        let unit = bomber();
        assert_eq!(unit.required_level(Technology::PlasmaTechnology), Some(5));
        assert_eq!(unit.required_level(Technology::LaserTechnology), None);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let ron = r#"(
            machine_name: "rocket_launcher",
            title: "Rocket Launcher",
            category: Defense,
            role: Defense,
            cost: (metal: 2000),
            stats: (attack: 80, shield: 20, structural_integrity: 2000),
        )"#;

        let unit: UnitDefinition = ron::from_str(ron).unwrap();
        assert!(!unit.is_ship());
        assert_eq!(unit.cost, ResourceBundle::new(2_000, 0, 0));
        assert_eq!(unit.stats.speed, 0);
        assert!(unit.requirements.is_empty());
        assert!(unit.speed_upgrades.is_empty());
        assert_eq!(unit.required_drive(), None);
    }
}
