//! Research technologies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A name that matched no known technology or player class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown name: {0}")]
pub struct UnknownName(pub String);

/// A research technology.
///
/// Serialized with the snake_case machine name used in unit data and
/// fleet descriptions (e.g. `weapon_technology`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technology {
    /// Energy technology.
    EnergyTechnology,
    /// Laser technology.
    LaserTechnology,
    /// Ion technology.
    IonTechnology,
    /// Hyperspace technology. Raises cargo capacity.
    HyperspaceTechnology,
    /// Plasma technology.
    PlasmaTechnology,
    /// Combustion drive.
    CombustionDrive,
    /// Impulse drive.
    ImpulseDrive,
    /// Hyperspace drive.
    HyperspaceDrive,
    /// Espionage technology.
    EspionageTechnology,
    /// Computer technology.
    ComputerTechnology,
    /// Astrophysics.
    Astrophysics,
    /// Graviton technology.
    GravitonTechnology,
    /// Weapon technology. Raises attack.
    WeaponTechnology,
    /// Shielding technology. Raises shield.
    ShieldingTechnology,
    /// Armor technology. Raises structural integrity.
    ArmorTechnology,
}

impl Technology {
    /// Every technology, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::EnergyTechnology,
        Self::LaserTechnology,
        Self::IonTechnology,
        Self::HyperspaceTechnology,
        Self::PlasmaTechnology,
        Self::CombustionDrive,
        Self::ImpulseDrive,
        Self::HyperspaceDrive,
        Self::EspionageTechnology,
        Self::ComputerTechnology,
        Self::Astrophysics,
        Self::GravitonTechnology,
        Self::WeaponTechnology,
        Self::ShieldingTechnology,
        Self::ArmorTechnology,
    ];

    /// Machine name as used in data files.
    #[must_use]
    pub const fn machine_name(self) -> &'static str {
        match self {
            Self::EnergyTechnology => "energy_technology",
            Self::LaserTechnology => "laser_technology",
            Self::IonTechnology => "ion_technology",
            Self::HyperspaceTechnology => "hyperspace_technology",
            Self::PlasmaTechnology => "plasma_technology",
            Self::CombustionDrive => "combustion_drive",
            Self::ImpulseDrive => "impulse_drive",
            Self::HyperspaceDrive => "hyperspace_drive",
            Self::EspionageTechnology => "espionage_technology",
            Self::ComputerTechnology => "computer_technology",
            Self::Astrophysics => "astrophysics",
            Self::GravitonTechnology => "graviton_technology",
            Self::WeaponTechnology => "weapon_technology",
            Self::ShieldingTechnology => "shielding_technology",
            Self::ArmorTechnology => "armor_technology",
        }
    }

    /// Weapon, shielding and armor. The general class adds levels to these.
    #[must_use]
    pub const fn is_combat(self) -> bool {
        matches!(
            self,
            Self::WeaponTechnology | Self::ShieldingTechnology | Self::ArmorTechnology
        )
    }

    /// Speed bonus per research level, for drive technologies.
    #[must_use]
    pub const fn drive_bonus_per_level(self) -> Option<i64> {
        match self {
            Self::CombustionDrive => Some(10),
            Self::ImpulseDrive => Some(20),
            Self::HyperspaceDrive => Some(30),
            _ => None,
        }
    }

    /// True for combustion, impulse and hyperspace drive.
    #[must_use]
    pub const fn is_drive(self) -> bool {
        self.drive_bonus_per_level().is_some()
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.machine_name())
    }
}

impl FromStr for Technology {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tech| tech.machine_name() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}
