//! Battle preparation and the round log engines produce.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::config::BattleConfig;
use super::{BattleInput, SideInput};
use crate::catalog::{UnitCatalog, UnitId};
use crate::error::{BattleError, Result};
use crate::fleet::UnitCollection;
use crate::properties::EffectiveStats;
use crate::resources::ResourceBundle;

/// Which side of the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The side that launched the attack. Fires first every round.
    Attacker,
    /// The side being attacked.
    Defender,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }
}

/// One unit type on one side, with battle-ready stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combatant {
    /// Unit type.
    pub unit: UnitId,
    /// Units at battle start.
    pub amount: u64,
    /// Effective damage per shot.
    pub attack: u64,
    /// Effective shield per unit.
    pub shield: u64,
    /// Effective hit points per unit. Always at least 1.
    pub hull: u64,
    /// Effective cargo capacity per unit (0 for defenses).
    pub capacity: u64,
    /// Production cost per unit.
    pub cost: ResourceBundle,
    /// Ships leave debris, defenses do not.
    pub is_ship: bool,
}

fn oversized(unit: String, amount: u64) -> BattleError {
    BattleError::InvalidAmount {
        unit,
        amount: i64::try_from(amount).unwrap_or(i64::MAX),
    }
}

/// All combatants of one side, in fleet order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedSide {
    combatants: Vec<Combatant>,
}

impl PreparedSide {
    fn new(catalog: &UnitCatalog, side: SideInput<'_>) -> Result<Self> {
        let combatants = side
            .units
            .iter()
            .filter(|stack| stack.amount > 0)
            .map(|stack| {
                let unit = catalog.definition(stack.unit)?;
                let stats = EffectiveStats::compute(unit, side.context);
                let shield = stats.shield.whole_total();
                let hull = stats.structural_integrity.whole_total().max(1);
                // Stack hull and shield pools must fit in a u64.
                if stack.amount.checked_mul(hull.max(shield)).is_none() {
                    return Err(oversized(unit.machine_name.clone(), stack.amount));
                }
                Ok(Combatant {
                    unit: stack.unit,
                    amount: stack.amount,
                    attack: stats.attack.whole_total(),
                    shield,
                    hull,
                    capacity: if unit.is_ship() {
                        stats.capacity.whole_total()
                    } else {
                        0
                    },
                    cost: unit.cost,
                    is_ship: unit.is_ship(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut total = 0u64;
        for c in &combatants {
            total = total.checked_add(c.amount).ok_or_else(|| {
                oversized(
                    catalog.machine_name(c.unit).unwrap_or_default().to_string(),
                    c.amount,
                )
            })?;
        }
        Ok(Self { combatants })
    }

    /// Combatants in fleet order.
    #[must_use]
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    /// Number of combatants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    /// Check if the side has no combatants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Units per combatant at battle start.
    #[must_use]
    pub fn starting_amounts(&self) -> Vec<u64> {
        self.combatants.iter().map(|c| c.amount).collect()
    }

    /// Collection from per-combatant amounts, skipping empty stacks.
    #[must_use]
    pub fn collection(&self, amounts: &[u64]) -> UnitCollection {
        self.combatants
            .iter()
            .zip(amounts)
            .filter(|(_, amount)| **amount > 0)
            .fold(UnitCollection::new(), |collection, (c, amount)| {
                collection.with(c.unit, *amount)
            })
    }
}

/// A validated battle, ready for an engine.
///
/// Owns everything the engines mutate-copy from; the caller's fleets are
/// only read while preparing.
#[derive(Debug, Clone)]
pub struct PreparedBattle<'a> {
    config: &'a BattleConfig,
    attacker: PreparedSide,
    defender: PreparedSide,
    defender_resources: ResourceBundle,
    // Row-major shooter x target rapid fire values, 0 for none.
    attacker_rapid_fire: Vec<u32>,
    defender_rapid_fire: Vec<u32>,
}

impl<'a> PreparedBattle<'a> {
    /// Validate input and config and compute effective stats.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid config, an empty attacker fleet, or
    /// units missing from the catalog.
    pub fn new(input: &BattleInput<'_>, config: &'a BattleConfig) -> Result<Self> {
        config.validate(input.catalog)?;
        if input.attacker.units.is_empty() {
            return Err(BattleError::EmptyAttackerFleet);
        }

        let attacker = PreparedSide::new(input.catalog, input.attacker)?;
        let defender = PreparedSide::new(input.catalog, input.defender)?;

        let table = if config.rapid_fire_enabled {
            config
                .rapid_fire
                .iter()
                .map(|entry| {
                    let shooter = input.catalog.resolve(&entry.shooter)?;
                    let target = input.catalog.resolve(&entry.target)?;
                    Ok(((shooter, target), entry.shots))
                })
                .collect::<Result<HashMap<_, _>>>()?
        } else {
            HashMap::new()
        };
        let attacker_rapid_fire = rapid_fire_matrix(&table, &attacker, &defender);
        let defender_rapid_fire = rapid_fire_matrix(&table, &defender, &attacker);

        Ok(Self {
            config,
            attacker,
            defender,
            defender_resources: input.defender_resources,
            attacker_rapid_fire,
            defender_rapid_fire,
        })
    }

    /// Battle tunables.
    #[must_use]
    pub fn config(&self) -> &BattleConfig {
        self.config
    }

    /// One side's combatants.
    #[must_use]
    pub fn side(&self, side: Side) -> &PreparedSide {
        match side {
            Side::Attacker => &self.attacker,
            Side::Defender => &self.defender,
        }
    }

    /// Rapid fire value of `side`'s combatant `shooter` against the
    /// opponent's combatant `target`. 0 means none.
    #[must_use]
    pub fn rapid_fire(&self, side: Side, shooter: usize, target: usize) -> u32 {
        let (matrix, columns) = match side {
            Side::Attacker => (&self.attacker_rapid_fire, self.defender.len()),
            Side::Defender => (&self.defender_rapid_fire, self.attacker.len()),
        };
        matrix
            .get(shooter * columns + target)
            .copied()
            .unwrap_or(0)
    }

    /// Defender's resource stock.
    #[must_use]
    pub fn defender_resources(&self) -> ResourceBundle {
        self.defender_resources
    }
}

fn rapid_fire_matrix(
    table: &HashMap<(UnitId, UnitId), u32>,
    shooters: &PreparedSide,
    targets: &PreparedSide,
) -> Vec<u32> {
    let mut matrix = Vec::with_capacity(shooters.len() * targets.len());
    for shooter in shooters.combatants() {
        for target in targets.combatants() {
            matrix.push(table.get(&(shooter.unit, target.unit)).copied().unwrap_or(0));
        }
    }
    matrix
}

/// Fire statistics of one side in one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FireStats {
    /// Shots that did not bounce.
    pub hits: u64,
    /// Full damage of those shots.
    pub damage: u64,
    /// Part of that damage absorbed by the targets' shields.
    pub absorbed: u64,
}

impl FireStats {
    /// Record `count` identical hits.
    pub(crate) fn record(&mut self, count: u64, damage: u64, absorbed: u64) {
        self.hits = self.hits.saturating_add(count);
        self.damage = self.damage.saturating_add(damage.saturating_mul(count));
        self.absorbed = self.absorbed.saturating_add(absorbed.saturating_mul(count));
    }
}

/// What happened in one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RoundRecord {
    /// Attacker fire.
    pub attacker_fire: FireStats,
    /// Defender fire.
    pub defender_fire: FireStats,
    /// Attacker units per combatant after the round.
    pub attacker_remaining: Vec<u64>,
    /// Defender units per combatant after the round.
    pub defender_remaining: Vec<u64>,
}

/// Rounds in order. Never empty for a resolved battle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RoundLog {
    /// Round records, first round first.
    pub rounds: Vec<RoundRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Technology;
    use crate::player::PlayerContext;

    fn id(name: &str) -> UnitId {
        UnitCatalog::standard().resolve(name).unwrap()
    }

    #[test]
    fn test_effective_stats_per_side() {
        let catalog = UnitCatalog::standard();
        let attacker = UnitCollection::new().with(id("light_fighter"), 10);
        let defender = UnitCollection::new()
            .with(id("rocket_launcher"), 0)
            .with(id("light_fighter"), 4);
        let strong = PlayerContext::new()
            .with_research(Technology::WeaponTechnology, 10)
            .with_research(Technology::ArmorTechnology, 5);
        let weak = PlayerContext::new();
        let input = BattleInput::new(catalog, &attacker, &strong, &defender, &weak);
        let config = BattleConfig::default();

        let battle = PreparedBattle::new(&input, &config).unwrap();
        let a = &battle.side(Side::Attacker).combatants()[0];
        let d = battle.side(Side::Defender).combatants();

        assert_eq!(a.attack, 100);
        assert_eq!(a.hull, 6_000);
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].attack, 50);
        assert_eq!(d[0].hull, 4_000);
    }

    #[test]
    fn test_oversized_stacks_rejected() {
        let catalog = UnitCatalog::standard();
        let ctx = PlayerContext::new();
        let config = BattleConfig::default();
        let defender = UnitCollection::new().with(id("rocket_launcher"), 1);

        // 4,000 hull per light fighter: the stack's hull pool overflows.
        let huge = UnitCollection::new().with(id("light_fighter"), u64::MAX / 100);
        let input = BattleInput::new(catalog, &huge, &ctx, &defender, &ctx);
        let err = PreparedBattle::new(&input, &config).unwrap_err();
        let expected = i64::try_from(u64::MAX / 100).unwrap();
        assert!(matches!(
            err,
            BattleError::InvalidAmount { ref unit, amount } if unit == "light_fighter" && amount == expected
        ));

        let fine = UnitCollection::new().with(id("light_fighter"), 1_000_000);
        let input = BattleInput::new(catalog, &fine, &ctx, &defender, &ctx);
        assert!(PreparedBattle::new(&input, &config).is_ok());
    }

    #[test]
    fn test_side_total_overflow_rejected() {
        use crate::data::{BaseStats, UnitCategory, UnitDefinition, UnitRole};

        let paper = |name: &str| UnitDefinition {
            machine_name: name.to_string(),
            title: name.to_string(),
            category: UnitCategory::Ship,
            role: UnitRole::Combat,
            cost: ResourceBundle::new(1, 0, 0),
            stats: BaseStats {
                structural_integrity: 1,
                ..BaseStats::default()
            },
            requirements: Vec::new(),
            speed_upgrades: Vec::new(),
        };
        let catalog = UnitCatalog::new(vec![paper("a"), paper("b")]).unwrap();
        let a = catalog.resolve("a").unwrap();
        let b = catalog.resolve("b").unwrap();
        let ctx = PlayerContext::new();
        let config = BattleConfig {
            rapid_fire: crate::battle::RapidFireTable::empty(),
            ..BattleConfig::default()
        };

        // Each stack fits on its own, the side total does not.
        let attacker = UnitCollection::new()
            .with(a, u64::MAX / 2 + 1)
            .with(b, u64::MAX / 2 + 1);
        let defender = UnitCollection::new().with(a, 1);
        let input = BattleInput::new(&catalog, &attacker, &ctx, &defender, &ctx);
        assert!(matches!(
            PreparedBattle::new(&input, &config),
            Err(BattleError::InvalidAmount { ref unit, .. }) if unit == "b"
        ));
    }

    #[test]
    fn test_rapid_fire_matrix() {
        let catalog = UnitCatalog::standard();
        let attacker = UnitCollection::new()
            .with(id("cruiser"), 1)
            .with(id("light_fighter"), 1);
        let defender = UnitCollection::new()
            .with(id("rocket_launcher"), 1)
            .with(id("light_fighter"), 1);
        let ctx = PlayerContext::new();
        let input = BattleInput::new(catalog, &attacker, &ctx, &defender, &ctx);

        let config = BattleConfig::default();
        let battle = PreparedBattle::new(&input, &config).unwrap();
        assert_eq!(battle.rapid_fire(Side::Attacker, 0, 0), 10);
        assert_eq!(battle.rapid_fire(Side::Attacker, 0, 1), 6);
        assert_eq!(battle.rapid_fire(Side::Attacker, 1, 0), 0);
        assert_eq!(battle.rapid_fire(Side::Defender, 1, 0), 0);

        let config = BattleConfig::default().with_rapid_fire(false);
        let battle = PreparedBattle::new(&input, &config).unwrap();
        assert_eq!(battle.rapid_fire(Side::Attacker, 0, 0), 0);
    }

    #[test]
    fn test_collection_from_amounts() {
        let catalog = UnitCatalog::standard();
        let attacker = UnitCollection::new()
            .with(id("cruiser"), 3)
            .with(id("bomber"), 2);
        let ctx = PlayerContext::new();
        let empty = UnitCollection::new();
        let input = BattleInput::new(catalog, &attacker, &ctx, &empty, &ctx);
        let config = BattleConfig::default();

        let battle = PreparedBattle::new(&input, &config).unwrap();
        let side = battle.side(Side::Attacker);
        assert_eq!(side.starting_amounts(), vec![3, 2]);

        let after = side.collection(&[0, 2]);
        assert_eq!(after.amount_of(id("cruiser")), 0);
        assert_eq!(after.stack_count(), 1);
    }
}
