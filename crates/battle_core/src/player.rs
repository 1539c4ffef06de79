//! Per-side player context: research levels and class.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::{Technology, UnknownName};

/// Effective levels the general class adds to weapon, shielding and armor.
pub const GENERAL_COMBAT_LEVEL_BONUS: u32 = 2;

/// Play-style archetype granting passive bonuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerClass {
    /// Economy class. Faster and roomier cargo ships.
    Collector,
    /// Military class. Extra combat levels, faster warships, cheaper flights.
    General,
    /// Exploration class. No battle bonuses.
    Discoverer,
}

impl PlayerClass {
    /// Class from its numeric ID (1 collector, 2 general, 3 discoverer).
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Collector),
            2 => Some(Self::General),
            3 => Some(Self::Discoverer),
            _ => None,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Collector => "collector",
            Self::General => "general",
            Self::Discoverer => "discoverer",
        }
    }
}

impl fmt::Display for PlayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlayerClass {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "collector" | "1" => Ok(Self::Collector),
            "general" | "2" => Ok(Self::General),
            "discoverer" | "3" => Ok(Self::Discoverer),
            _ => Err(UnknownName(s.to_string())),
        }
    }
}

/// Research levels and class of one battle side.
///
/// Each side owns its own context. Engines only ever borrow it immutably,
/// so nothing from one side can leak into the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerContext {
    #[serde(default)]
    research: BTreeMap<Technology, u32>,
    #[serde(default)]
    class: Option<PlayerClass>,
}

impl PlayerContext {
    /// Context with no research and no class.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a research level.
    #[must_use]
    pub fn with_research(mut self, technology: Technology, level: u32) -> Self {
        self.set_research_level(technology, level);
        self
    }

    /// Builder: set the class.
    #[must_use]
    pub fn with_class(mut self, class: PlayerClass) -> Self {
        self.class = Some(class);
        self
    }

    /// Set a research level.
    pub fn set_research_level(&mut self, technology: Technology, level: u32) {
        self.research.insert(technology, level);
    }

    /// Research level, 0 if never set.
    #[must_use]
    pub fn research_level(&self, technology: Technology) -> u32 {
        self.research.get(&technology).copied().unwrap_or(0)
    }

    /// Research level with class-granted levels folded in.
    ///
    /// The general class adds two levels to weapon, shielding and armor.
    #[must_use]
    pub fn effective_combat_level(&self, technology: Technology) -> u32 {
        let level = self.research_level(technology);
        if technology.is_combat() && self.class == Some(PlayerClass::General) {
            level.saturating_add(GENERAL_COMBAT_LEVEL_BONUS)
        } else {
            level
        }
    }

    /// Active class, if any.
    #[must_use]
    pub fn class(&self) -> Option<PlayerClass> {
        self.class
    }

    /// True if the active class is `class`.
    #[must_use]
    pub fn has_class(&self, class: PlayerClass) -> bool {
        self.class == Some(class)
    }

    /// All explicitly set research levels.
    pub fn research(&self) -> impl Iterator<Item = (Technology, u32)> + '_ {
        self.research.iter().map(|(tech, level)| (*tech, *level))
    }
}
