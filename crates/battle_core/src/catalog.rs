//! Unit catalog and numeric unit identity.
//!
//! The catalog is the single source of unit definitions:
//! - [`UnitId`]: Numeric ID for fast, deterministic runtime use
//! - [`UnitCatalog`]: Maps between IDs and machine names and owns the definitions
//!
//! The standard catalog is embedded at compile time and parsed once per
//! process. It is immutable afterwards, so any number of battles can read
//! it from any thread without locking.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::data::{UnitCategory, UnitDefinition};
use crate::error::{BattleError, Result};

const STANDARD_UNITS: &str = include_str!("../data/units.ron");

static STANDARD_CATALOG: OnceLock<UnitCatalog> = OnceLock::new();

/// Numeric identifier for a unit in a [`UnitCatalog`].
///
/// - Cheap: `Copy`, 2 bytes
/// - Deterministic: assigned from catalog declaration order
/// - Fast: array indexing for lookups, no hashing needed
///
/// # Example
///
/// ```
/// use battle_core::catalog::UnitId;
///
/// let id = UnitId::new(42);
/// assert_eq!(id.as_u16(), 42);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct UnitId(u16);

impl UnitId {
    /// Create a new unit ID.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    units: Vec<UnitDefinition>,
}

/// Immutable set of unit definitions.
#[derive(Debug, Clone)]
pub struct UnitCatalog {
    units: Vec<UnitDefinition>,
    by_name: HashMap<String, UnitId>,
}

impl UnitCatalog {
    /// Build a catalog from definitions. IDs follow the given order.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate machine names, zero structural
    /// integrity, or more units than IDs can address.
    pub fn new(units: Vec<UnitDefinition>) -> Result<Self> {
        if units.len() > usize::from(u16::MAX) {
            return Err(BattleError::InvalidSetting {
                field: "units",
                reason: format!("{} units exceeds the catalog limit", units.len()),
            });
        }

        let mut by_name = HashMap::with_capacity(units.len());
        for (index, unit) in units.iter().enumerate() {
            if unit.stats.structural_integrity == 0 {
                return Err(BattleError::InvalidUnit {
                    unit: unit.machine_name.clone(),
                    reason: "structural integrity must be greater than zero".to_string(),
                });
            }

            // Bounded by the length check above.
            #[allow(clippy::cast_possible_truncation)]
            let id = UnitId::new(index as u16);
            if by_name.insert(unit.machine_name.clone(), id).is_some() {
                return Err(BattleError::DuplicateUnit(unit.machine_name.clone()));
            }
        }

        Ok(Self { units, by_name })
    }

    /// Parse a catalog from RON text of the form `(units: [...])`.
    ///
    /// `label` names the source in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParseError`] for malformed RON and any
    /// validation error from [`UnitCatalog::new`].
    pub fn from_ron_str(source: &str, label: &str) -> Result<Self> {
        let file: CatalogFile = ron::from_str(source).map_err(|e| BattleError::DataParseError {
            path: label.to_string(),
            message: e.to_string(),
        })?;
        Self::new(file.units)
    }

    /// The standard ships and defenses, parsed on first use.
    ///
    /// # Panics
    ///
    /// Panics if the embedded catalog is invalid, which the test suite rules out.
    pub fn standard() -> &'static Self {
        STANDARD_CATALOG.get_or_init(|| {
            Self::from_ron_str(STANDARD_UNITS, "data/units.ron")
                .expect("embedded unit catalog must be valid")
        })
    }

    /// Look up a definition by ID.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&UnitDefinition> {
        self.units.get(id.index())
    }

    /// Look up a definition by ID, failing for unknown IDs.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnitId`] if the ID is out of range.
    pub fn definition(&self, id: UnitId) -> Result<&UnitDefinition> {
        self.get(id)
            .ok_or(BattleError::UnknownUnitId(id.as_u16()))
    }

    /// Find a unit ID by machine name.
    #[must_use]
    pub fn find(&self, machine_name: &str) -> Option<UnitId> {
        self.by_name.get(machine_name).copied()
    }

    /// Find a unit ID by machine name, failing for unknown names.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnit`] if no unit has this name.
    pub fn resolve(&self, machine_name: &str) -> Result<UnitId> {
        self.find(machine_name)
            .ok_or_else(|| BattleError::UnknownUnit(machine_name.to_string()))
    }

    /// Machine name for an ID.
    #[must_use]
    pub fn machine_name(&self, id: UnitId) -> Option<&str> {
        self.get(id).map(|unit| unit.machine_name.as_str())
    }

    /// All units with their IDs, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &UnitDefinition)> {
        self.units.iter().enumerate().map(|(index, unit)| {
            #[allow(clippy::cast_possible_truncation)]
            (UnitId::new(index as u16), unit)
        })
    }

    /// All units of one category, in catalog order.
    pub fn by_category(
        &self,
        category: UnitCategory,
    ) -> impl Iterator<Item = (UnitId, &UnitDefinition)> {
        self.iter().filter(move |(_, unit)| unit.category == category)
    }

    /// Number of units in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
