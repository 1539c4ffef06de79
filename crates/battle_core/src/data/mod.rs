//! Data structures for unit and technology configuration.
//!
//! This module contains pure data structures that define ships, defenses
//! and the technologies that upgrade them. Unit definitions are designed
//! to be deserialized from RON.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! The standard catalog is embedded at compile time by [`crate::catalog`].

mod technology;
mod unit_data;

pub use technology::{Technology, UnknownName};
pub use unit_data::{
    BaseStats, Requirement, SpeedUpgrade, UnitCategory, UnitDefinition, UnitRole,
};
