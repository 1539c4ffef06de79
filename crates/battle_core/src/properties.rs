//! Effective unit properties.
//!
//! Every property follows the same shape:
//!
//! ```text
//! total = raw + raw * research% / 100 + raw * class% / 100
//! ```
//!
//! Each [`PropertyKind`] variant supplies its own `raw`, research and class
//! percentages. Speed is the one property where `raw` is not the base
//! stat: a speed upgrade (e.g. small cargo on impulse drive) replaces it.
//!
//! All math is fixed point, so fractional bonuses are exact and the same
//! inputs always produce bit-identical outputs.

use serde::{Deserialize, Serialize};

use crate::data::{Technology, UnitDefinition, UnitRole};
use crate::math::{fixed_from_u64, fixed_serde, percent_of, whole_units, Fixed};
use crate::player::{PlayerClass, PlayerContext};

/// Combat research bonus per effective level, in percent.
pub const COMBAT_BONUS_PER_LEVEL: i64 = 10;
/// Hyperspace technology cargo bonus per level, in percent.
pub const CAPACITY_BONUS_PER_LEVEL: i64 = 5;
/// Cargo class bonus for collector cargo ships and general recyclers/pathfinders.
pub const CLASS_CAPACITY_BONUS: i64 = 25;
/// Speed class bonus for collector cargo ships and general warships/recyclers.
pub const CLASS_SPEED_BONUS: i64 = 100;
/// Fuel class bonus for the general. Negative, so flights get cheaper.
pub const CLASS_FUEL_BONUS: i64 = -25;

/// One of the six derived unit properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// Damage per shot.
    Attack,
    /// Damage absorbed per incoming shot.
    Shield,
    /// Hit points.
    StructuralIntegrity,
    /// Flight speed.
    Speed,
    /// Cargo capacity.
    Capacity,
    /// Deuterium consumption.
    Fuel,
}

impl PropertyKind {
    /// All properties.
    pub const ALL: [Self; 6] = [
        Self::Attack,
        Self::Shield,
        Self::StructuralIntegrity,
        Self::Speed,
        Self::Capacity,
        Self::Fuel,
    ];

    /// Value the percentages apply to.
    #[must_use]
    pub fn effective_base(self, unit: &UnitDefinition, ctx: &PlayerContext) -> u64 {
        let stats = &unit.stats;
        match self {
            Self::Attack => stats.attack,
            Self::Shield => stats.shield,
            Self::StructuralIntegrity => stats.structural_integrity,
            Self::Speed => effective_base_speed(unit, ctx),
            Self::Capacity => stats.capacity,
            Self::Fuel => stats.fuel,
        }
    }

    /// Research bonus in percent.
    #[must_use]
    pub fn research_bonus_percent(self, unit: &UnitDefinition, ctx: &PlayerContext) -> i64 {
        let combat = |tech: Technology| {
            COMBAT_BONUS_PER_LEVEL * i64::from(ctx.effective_combat_level(tech))
        };
        match self {
            Self::Attack => combat(Technology::WeaponTechnology),
            Self::Shield => combat(Technology::ShieldingTechnology),
            Self::StructuralIntegrity => combat(Technology::ArmorTechnology),
            Self::Speed => governing_drive(unit, ctx).map_or(0, |drive| {
                let per_level = drive.drive_bonus_per_level().unwrap_or(0);
                per_level * i64::from(ctx.research_level(drive))
            }),
            Self::Capacity => {
                CAPACITY_BONUS_PER_LEVEL
                    * i64::from(ctx.research_level(Technology::HyperspaceTechnology))
            }
            Self::Fuel => 0,
        }
    }

    /// Class bonus in percent.
    #[must_use]
    pub fn class_bonus_percent(self, unit: &UnitDefinition, ctx: &PlayerContext) -> i64 {
        let Some(class) = ctx.class() else {
            return 0;
        };
        match (self, class, unit.role) {
            (Self::Capacity, PlayerClass::Collector, UnitRole::Cargo)
            | (Self::Capacity, PlayerClass::General, UnitRole::Recycler | UnitRole::Pathfinder) => {
                CLASS_CAPACITY_BONUS
            }
            (Self::Speed, PlayerClass::Collector, UnitRole::Cargo)
            | (Self::Speed, PlayerClass::General, UnitRole::Combat | UnitRole::Recycler) => {
                CLASS_SPEED_BONUS
            }
            (Self::Fuel, PlayerClass::General, _) if unit.is_ship() => CLASS_FUEL_BONUS,
            _ => 0,
        }
    }

    /// Whether a zero research bonus still shows up in the breakdown.
    const fn reports_zero_research(self) -> bool {
        !matches!(self, Self::Fuel)
    }
}

/// Where a bonus comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusSource {
    /// Research levels.
    Research,
    /// Player class.
    Class,
}

/// One line of a property breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyBonus {
    /// Bonus source.
    pub source: BonusSource,
    /// Percentage of the effective base.
    pub percentage: i64,
    /// Absolute bonus value.
    #[serde(with = "fixed_serde")]
    pub value: Fixed,
}

/// An effective property value with its breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDetails {
    kind: PropertyKind,
    #[serde(with = "fixed_serde")]
    raw: Fixed,
    bonuses: Vec<PropertyBonus>,
    #[serde(with = "fixed_serde")]
    total: Fixed,
}

impl PropertyDetails {
    /// Which property this is.
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Effective base before bonuses.
    #[must_use]
    pub fn raw(&self) -> Fixed {
        self.raw
    }

    /// Sum of all bonus values.
    #[must_use]
    pub fn bonus(&self) -> Fixed {
        self.bonuses
            .iter()
            .fold(Fixed::ZERO, |acc, b| acc.saturating_add(b.value))
    }

    /// Bonus lines, research first.
    #[must_use]
    pub fn bonuses(&self) -> &[PropertyBonus] {
        &self.bonuses
    }

    /// Bonus line for one source, if reported.
    #[must_use]
    pub fn bonus_from(&self, source: BonusSource) -> Option<&PropertyBonus> {
        self.bonuses.iter().find(|b| b.source == source)
    }

    /// Final value. Never negative.
    #[must_use]
    pub fn total(&self) -> Fixed {
        self.total
    }

    /// Final value rounded down to a whole number.
    #[must_use]
    pub fn whole_total(&self) -> u64 {
        whole_units(self.total)
    }
}

/// Compute one effective property for a unit owned by `ctx`.
#[must_use]
pub fn effective(kind: PropertyKind, unit: &UnitDefinition, ctx: &PlayerContext) -> PropertyDetails {
    let raw = fixed_from_u64(kind.effective_base(unit, ctx));
    let research = kind.research_bonus_percent(unit, ctx);
    let class = kind.class_bonus_percent(unit, ctx);

    let mut bonuses = Vec::with_capacity(2);
    if research != 0 || kind.reports_zero_research() {
        bonuses.push(PropertyBonus {
            source: BonusSource::Research,
            percentage: research,
            value: percent_of(raw, research),
        });
    }
    if class != 0 {
        bonuses.push(PropertyBonus {
            source: BonusSource::Class,
            percentage: class,
            value: percent_of(raw, class),
        });
    }

    let total = bonuses
        .iter()
        .fold(raw, |acc, b| acc.saturating_add(b.value))
        .max(Fixed::ZERO);

    PropertyDetails {
        kind,
        raw,
        bonuses,
        total,
    }
}

/// Base speed after speed upgrades.
///
/// The last upgrade in declared order whose threshold is met replaces the
/// unit's own base speed.
#[must_use]
pub fn effective_base_speed(unit: &UnitDefinition, ctx: &PlayerContext) -> u64 {
    unit.speed_upgrades
        .iter()
        .rev()
        .find(|up| ctx.research_level(up.technology) >= up.level)
        .map_or(unit.stats.speed, |up| up.base_speed)
}

/// Drive technology whose level scales this unit's speed.
///
/// The last applicable speed upgrade decides; without one, the first drive
/// in the unit's requirements does. Defenses have neither.
#[must_use]
pub fn governing_drive(unit: &UnitDefinition, ctx: &PlayerContext) -> Option<Technology> {
    unit.speed_upgrades
        .iter()
        .rev()
        .find(|up| ctx.research_level(up.technology) >= up.level)
        .map(|up| up.technology)
        .filter(|tech| tech.is_drive())
        .or_else(|| unit.required_drive())
}

/// All six effective properties of one unit for one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveStats {
    /// Damage per shot.
    pub attack: PropertyDetails,
    /// Damage absorbed per incoming shot.
    pub shield: PropertyDetails,
    /// Hit points.
    pub structural_integrity: PropertyDetails,
    /// Flight speed.
    pub speed: PropertyDetails,
    /// Cargo capacity.
    pub capacity: PropertyDetails,
    /// Deuterium consumption.
    pub fuel: PropertyDetails,
}

impl EffectiveStats {
    /// Compute all properties.
    #[must_use]
    pub fn compute(unit: &UnitDefinition, ctx: &PlayerContext) -> Self {
        Self {
            attack: effective(PropertyKind::Attack, unit, ctx),
            shield: effective(PropertyKind::Shield, unit, ctx),
            structural_integrity: effective(PropertyKind::StructuralIntegrity, unit, ctx),
            speed: effective(PropertyKind::Speed, unit, ctx),
            capacity: effective(PropertyKind::Capacity, unit, ctx),
            fuel: effective(PropertyKind::Fuel, unit, ctx),
        }
    }

    /// Property by kind.
    #[must_use]
    pub fn get(&self, kind: PropertyKind) -> &PropertyDetails {
        match kind {
            PropertyKind::Attack => &self.attack,
            PropertyKind::Shield => &self.shield,
            PropertyKind::StructuralIntegrity => &self.structural_integrity,
            PropertyKind::Speed => &self.speed,
            PropertyKind::Capacity => &self.capacity,
            PropertyKind::Fuel => &self.fuel,
        }
    }
}
