//! Unit compositions.
//!
//! A [`UnitCollection`] is an ordered list of stacks, at most one per unit
//! type. Order is first-insertion order and is what battle engines iterate
//! in, so two equal collections always fight the same way.

use serde::{Deserialize, Serialize};

use crate::catalog::{UnitCatalog, UnitId};
use crate::error::{BattleError, Result};
use crate::player::PlayerContext;
use crate::properties::{effective, PropertyKind};
use crate::resources::ResourceBundle;

/// A number of units of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitStack {
    /// Unit type.
    pub unit: UnitId,
    /// Number of units.
    pub amount: u64,
}

/// Ordered stacks, unique by unit type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitCollection {
    stacks: Vec<UnitStack>,
}

impl UnitCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `(machine name, amount)` pairs against a catalog.
    ///
    /// Repeated names are merged.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnit`] for names missing from the
    /// catalog and [`BattleError::InvalidAmount`] for negative amounts.
    pub fn from_named<I, S>(catalog: &UnitCatalog, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        let mut collection = Self::new();
        for (name, amount) in entries {
            let name = name.as_ref();
            let unit = catalog.resolve(name)?;
            let amount = u64::try_from(amount).map_err(|_| BattleError::InvalidAmount {
                unit: name.to_string(),
                amount,
            })?;
            collection.add(unit, amount);
        }
        Ok(collection)
    }

    /// Builder: add units.
    #[must_use]
    pub fn with(mut self, unit: UnitId, amount: u64) -> Self {
        self.add(unit, amount);
        self
    }

    /// Add units, merging into an existing stack of the same type.
    pub fn add(&mut self, unit: UnitId, amount: u64) {
        match self.stacks.iter_mut().find(|s| s.unit == unit) {
            Some(stack) => stack.amount = stack.amount.saturating_add(amount),
            None => self.stacks.push(UnitStack { unit, amount }),
        }
    }

    /// Add every stack of `other`.
    pub fn merge(&mut self, other: &Self) {
        for stack in &other.stacks {
            self.add(stack.unit, stack.amount);
        }
    }

    /// Remove up to `amount` units of a type. Returns how many were removed.
    pub fn remove(&mut self, unit: UnitId, amount: u64) -> u64 {
        let Some(stack) = self.stacks.iter_mut().find(|s| s.unit == unit) else {
            return 0;
        };
        let removed = stack.amount.min(amount);
        stack.amount -= removed;
        removed
    }

    /// Units of one type, 0 if absent.
    #[must_use]
    pub fn amount_of(&self, unit: UnitId) -> u64 {
        self.stacks
            .iter()
            .find(|s| s.unit == unit)
            .map_or(0, |s| s.amount)
    }

    /// Total number of units.
    #[must_use]
    pub fn total_amount(&self) -> u64 {
        self.stacks
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.amount))
    }

    /// True if there are no units (empty stacks do not count).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stacks.iter().all(|s| s.amount == 0)
    }

    /// Stacks in order, including empty ones.
    pub fn iter(&self) -> impl Iterator<Item = &UnitStack> {
        self.stacks.iter()
    }

    /// Number of stacks, including empty ones.
    #[must_use]
    pub fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    /// Copy without empty stacks.
    #[must_use]
    pub fn without_empty(&self) -> Self {
        self.stacks.iter().filter(|s| s.amount > 0).copied().collect()
    }

    /// Units in `self` that are missing from `remaining`, per type.
    #[must_use]
    pub fn difference(&self, remaining: &Self) -> Self {
        self.stacks
            .iter()
            .map(|s| UnitStack {
                unit: s.unit,
                amount: s.amount.saturating_sub(remaining.amount_of(s.unit)),
            })
            .filter(|s| s.amount > 0)
            .collect()
    }

    /// Production cost of every unit.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnitId`] for units missing from the catalog.
    pub fn cost(&self, catalog: &UnitCatalog) -> Result<ResourceBundle> {
        self.stacks.iter().try_fold(ResourceBundle::ZERO, |acc, s| {
            Ok(acc + catalog.definition(s.unit)?.cost * s.amount)
        })
    }

    /// Total cargo capacity of the ships, with bonuses from `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnitId`] for units missing from the catalog.
    pub fn cargo_capacity(&self, catalog: &UnitCatalog, ctx: &PlayerContext) -> Result<u64> {
        self.stacks.iter().try_fold(0u64, |acc, s| {
            let unit = catalog.definition(s.unit)?;
            if !unit.is_ship() {
                return Ok(acc);
            }
            let per_unit = effective(PropertyKind::Capacity, unit, ctx).whole_total();
            Ok(acc.saturating_add(per_unit.saturating_mul(s.amount)))
        })
    }

    /// `(machine name, amount)` for every non-empty stack.
    #[must_use]
    pub fn to_named(&self, catalog: &UnitCatalog) -> Vec<(String, u64)> {
        self.stacks
            .iter()
            .filter(|s| s.amount > 0)
            .map(|s| {
                let name = catalog
                    .machine_name(s.unit)
                    .map_or_else(|| format!("unit_{}", s.unit.as_u16()), str::to_string);
                (name, s.amount)
            })
            .collect()
    }
}

impl FromIterator<UnitStack> for UnitCollection {
    fn from_iter<T: IntoIterator<Item = UnitStack>>(iter: T) -> Self {
        let mut collection = Self::new();
        for stack in iter {
            collection.add(stack.unit, stack.amount);
        }
        collection
    }
}

impl<'a> IntoIterator for &'a UnitCollection {
    type Item = &'a UnitStack;
    type IntoIter = std::slice::Iter<'a, UnitStack>;

    fn into_iter(self) -> Self::IntoIter {
        self.stacks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Technology;
    use crate::player::PlayerClass;

    fn id(name: &str) -> UnitId {
        UnitCatalog::standard().resolve(name).unwrap()
    }

    #[test]
    fn test_add_merges_and_keeps_order() {
        let mut fleet = UnitCollection::new();
        fleet.add(id("cruiser"), 5);
        fleet.add(id("light_fighter"), 10);
        fleet.add(id("cruiser"), 2);

        assert_eq!(fleet.stack_count(), 2);
        assert_eq!(fleet.amount_of(id("cruiser")), 7);
        assert_eq!(fleet.total_amount(), 17);
        let order: Vec<_> = fleet.iter().map(|s| s.unit).collect();
        assert_eq!(order, vec![id("cruiser"), id("light_fighter")]);
    }

    #[test]
    fn test_from_named() {
        let catalog = UnitCatalog::standard();
        let fleet =
            UnitCollection::from_named(catalog, [("light_fighter", 3), ("light_fighter", 2)])
                .unwrap();
        assert_eq!(fleet.amount_of(id("light_fighter")), 5);

        let err = UnitCollection::from_named(catalog, [("cruiser", -1)]).unwrap_err();
        assert!(matches!(err, BattleError::InvalidAmount { amount: -1, .. }));

        let err = UnitCollection::from_named(catalog, [("x_wing", 1)]).unwrap_err();
        assert!(matches!(err, BattleError::UnknownUnit(_)));
    }

    #[test]
    fn test_empty_stacks_do_not_count() {
        let fleet = UnitCollection::new().with(id("cruiser"), 0);
        assert!(fleet.is_empty());
        assert_eq!(fleet.without_empty().stack_count(), 0);
    }

    #[test]
    fn test_remove_and_difference() {
        let start = UnitCollection::new()
            .with(id("cruiser"), 10)
            .with(id("bomber"), 4);
        let mut end = start.clone();
        assert_eq!(end.remove(id("cruiser"), 3), 3);
        assert_eq!(end.remove(id("bomber"), 10), 4);
        assert_eq!(end.remove(id("recycler"), 1), 0);

        let lost = start.difference(&end);
        assert_eq!(lost.amount_of(id("cruiser")), 3);
        assert_eq!(lost.amount_of(id("bomber")), 4);
        assert_eq!(start.amount_of(id("cruiser")), 10);
    }

    #[test]
    fn test_cost() {
        let catalog = UnitCatalog::standard();
        let fleet = UnitCollection::new()
            .with(id("light_fighter"), 2)
            .with(id("rocket_launcher"), 1);
        assert_eq!(
            fleet.cost(catalog).unwrap(),
            ResourceBundle::new(8_000, 2_000, 0)
        );
    }

    #[test]
    fn test_cargo_capacity_skips_defenses() {
        let catalog = UnitCatalog::standard();
        let ctx = PlayerContext::new()
            .with_research(Technology::HyperspaceTechnology, 2)
            .with_class(PlayerClass::Collector);
        let fleet = UnitCollection::new()
            .with(id("small_cargo"), 2)
            .with(id("rocket_launcher"), 100);

        // 5000 + 10% + 25% per ship
        assert_eq!(fleet.cargo_capacity(catalog, &ctx).unwrap(), 13_500);
    }

    #[test]
    fn test_to_named() {
        let catalog = UnitCatalog::standard();
        let fleet = UnitCollection::new()
            .with(id("deathstar"), 1)
            .with(id("cruiser"), 0);
        assert_eq!(fleet.to_named(catalog), vec![("deathstar".to_string(), 1)]);
    }
}
