//! Resource bundles.
//!
//! Every cost, debris field, loot haul and planet stock is a triple of
//! metal, crystal and deuterium. Components never go below zero: plain
//! addition saturates, and subtraction is either checked or explicitly
//! saturating.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::math::scale_percent;

/// Metal, crystal and deuterium amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceBundle {
    /// Metal amount.
    pub metal: u64,
    /// Crystal amount.
    pub crystal: u64,
    /// Deuterium amount.
    pub deuterium: u64,
}

impl ResourceBundle {
    /// The empty bundle.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Create a new bundle.
    #[must_use]
    pub const fn new(metal: u64, crystal: u64, deuterium: u64) -> Self {
        Self {
            metal,
            crystal,
            deuterium,
        }
    }

    /// Sum of all three components.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.metal
            .saturating_add(self.crystal)
            .saturating_add(self.deuterium)
    }

    /// True if every component is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.metal == 0 && self.crystal == 0 && self.deuterium == 0
    }

    /// True if every component of `self` is at least the matching component of `other`.
    #[must_use]
    pub const fn covers(&self, other: &Self) -> bool {
        self.metal >= other.metal
            && self.crystal >= other.crystal
            && self.deuterium >= other.deuterium
    }

    /// Subtract `other`, failing if any component would drop below zero.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InsufficientResources`] if `self` does not cover `other`.
    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        if !self.covers(other) {
            return Err(BattleError::InsufficientResources {
                required: *other,
                available: *self,
            });
        }
        Ok(Self::new(
            self.metal - other.metal,
            self.crystal - other.crystal,
            self.deuterium - other.deuterium,
        ))
    }

    /// Subtract `other`, clamping each component at zero.
    #[must_use]
    pub const fn saturating_sub(&self, other: &Self) -> Self {
        Self::new(
            self.metal.saturating_sub(other.metal),
            self.crystal.saturating_sub(other.crystal),
            self.deuterium.saturating_sub(other.deuterium),
        )
    }

    /// `percent`% of every component, rounded down.
    #[must_use]
    pub fn scale_percent(&self, percent: u32) -> Self {
        Self::new(
            scale_percent(self.metal, percent),
            scale_percent(self.crystal, percent),
            scale_percent(self.deuterium, percent),
        )
    }

    /// Metal and crystal only. Deuterium never ends up in debris.
    #[must_use]
    pub const fn without_deuterium(&self) -> Self {
        Self::new(self.metal, self.crystal, 0)
    }
}

impl Add for ResourceBundle {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(
            self.metal.saturating_add(rhs.metal),
            self.crystal.saturating_add(rhs.crystal),
            self.deuterium.saturating_add(rhs.deuterium),
        )
    }
}

impl AddAssign for ResourceBundle {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul<u64> for ResourceBundle {
    type Output = Self;

    fn mul(self, rhs: u64) -> Self::Output {
        Self::new(
            self.metal.saturating_mul(rhs),
            self.crystal.saturating_mul(rhs),
            self.deuterium.saturating_mul(rhs),
        )
    }
}

impl Sum for ResourceBundle {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for ResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} metal / {} crystal / {} deuterium",
            self.metal, self.crystal, self.deuterium
        )
    }
}
