//! Error types for battle computation.

use thiserror::Error;

use crate::resources::ResourceBundle;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for all battle errors.
///
/// Every variant is raised before a battle starts. Once the first round
/// runs, a simulation always completes.
#[derive(Debug, Error)]
pub enum BattleError {
    /// The attacking fleet contains no units.
    #[error("Attacker fleet is empty")]
    EmptyAttackerFleet,

    /// A unit amount is negative or otherwise unusable.
    #[error("Invalid amount {amount} for unit '{unit}'")]
    InvalidAmount {
        /// Machine name of the unit.
        unit: String,
        /// Amount that was supplied.
        amount: i64,
    },

    /// A unit ID does not exist in the catalog.
    #[error("Unknown unit ID: {0}")]
    UnknownUnitId(u16),

    /// A unit machine name does not exist in the catalog.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// A tunable is missing or out of range.
    #[error("Invalid setting '{field}': {reason}")]
    InvalidSetting {
        /// Name of the offending setting.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Battle simulation is switched off in the settings.
    #[error("Battle simulation is disabled")]
    Disabled,

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Two catalog entries share a machine name.
    #[error("Duplicate unit in catalog: {0}")]
    DuplicateUnit(String),

    /// A catalog entry is unusable (e.g. zero structural integrity).
    #[error("Invalid unit definition '{unit}': {reason}")]
    InvalidUnit {
        /// Machine name of the unit.
        unit: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Stock subtraction would go below zero.
    #[error("Insufficient resources: need {required}, have {available}")]
    InsufficientResources {
        /// Amount that was requested.
        required: ResourceBundle,
        /// Amount that is in stock.
        available: ResourceBundle,
    },
}
