//! Test fixtures and helpers.
//!
//! Pre-built fleets, research contexts and battle scenarios
//! for consistent testing.

use battle_core::battle::{BattleConfig, BattleEngine, BattleInput, BattleResult};
use battle_core::catalog::{UnitCatalog, UnitId};
use battle_core::data::Technology;
use battle_core::error::Result;
use battle_core::fleet::UnitCollection;
use battle_core::math::Fixed;
use battle_core::player::{PlayerClass, PlayerContext};
use battle_core::resources::ResourceBundle;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> Fixed {
    Fixed::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: property code never uses floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> Fixed {
    Fixed::from_num(n)
}

/// Seeded generator used throughout the tests.
#[must_use]
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Id of a unit in the standard catalog.
///
/// # Panics
///
/// Panics if the name is not in the standard catalog.
#[must_use]
pub fn unit(name: &str) -> UnitId {
    UnitCatalog::standard()
        .find(name)
        .unwrap_or_else(|| panic!("unknown unit in fixture: {name}"))
}

/// Fleet from `(machine name, amount)` pairs.
///
/// # Panics
///
/// Panics if a name is not in the standard catalog.
#[must_use]
pub fn fleet(units: &[(&str, u64)]) -> UnitCollection {
    units
        .iter()
        .fold(UnitCollection::new(), |fleet, (name, amount)| {
            fleet.with(unit(name), *amount)
        })
}

/// Research context from `(technology, level)` pairs.
#[must_use]
pub fn research(levels: &[(Technology, u32)]) -> PlayerContext {
    levels
        .iter()
        .fold(PlayerContext::new(), |ctx, (tech, level)| {
            ctx.with_research(*tech, *level)
        })
}

/// Same research on weapon, shielding and armor.
#[must_use]
pub fn combat_research(level: u32) -> PlayerContext {
    research(&[
        (Technology::WeaponTechnology, level),
        (Technology::ShieldingTechnology, level),
        (Technology::ArmorTechnology, level),
    ])
}

/// An owned battle setup that can hand out [`BattleInput`]s.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Short label for reports.
    pub name: &'static str,
    /// Attacking fleet.
    pub attacker: UnitCollection,
    /// Attacker research and class.
    pub attacker_context: PlayerContext,
    /// Defending fleet and defenses.
    pub defender: UnitCollection,
    /// Defender research and class.
    pub defender_context: PlayerContext,
    /// Defender resource stock.
    pub defender_resources: ResourceBundle,
}

impl Scenario {
    /// Scenario without research, classes or resources.
    #[must_use]
    pub fn new(name: &'static str, attacker: UnitCollection, defender: UnitCollection) -> Self {
        Self {
            name,
            attacker,
            attacker_context: PlayerContext::new(),
            defender,
            defender_context: PlayerContext::new(),
            defender_resources: ResourceBundle::ZERO,
        }
    }

    /// Set both research contexts.
    #[must_use]
    pub fn with_contexts(mut self, attacker: PlayerContext, defender: PlayerContext) -> Self {
        self.attacker_context = attacker;
        self.defender_context = defender;
        self
    }

    /// Set the defender's stock.
    #[must_use]
    pub fn with_resources(mut self, resources: ResourceBundle) -> Self {
        self.defender_resources = resources;
        self
    }

    /// Borrowed engine input against the standard catalog.
    #[must_use]
    pub fn input(&self) -> BattleInput<'_> {
        BattleInput::new(
            UnitCatalog::standard(),
            &self.attacker,
            &self.attacker_context,
            &self.defender,
            &self.defender_context,
        )
        .with_defender_resources(self.defender_resources)
    }

    /// Run the scenario once with a fresh generator.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors from the engine.
    pub fn simulate(
        &self,
        engine: &dyn BattleEngine,
        config: &BattleConfig,
        seed: u64,
    ) -> Result<BattleResult> {
        engine.simulate(&self.input(), config, &mut seeded_rng(seed))
    }
}

/// 1667 light fighters (weapon 15) against 1667 rocket launchers (shielding 12).
#[must_use]
pub fn light_fighters_vs_rocket_launchers() -> Scenario {
    Scenario::new(
        "light_fighters_vs_rocket_launchers",
        fleet(&[("light_fighter", 1667)]),
        fleet(&[("rocket_launcher", 1667)]),
    )
    .with_contexts(
        research(&[(Technology::WeaponTechnology, 15)]),
        research(&[(Technology::ShieldingTechnology, 12)]),
    )
}

/// Cargo fleet raiding an undefended planet holding a million of each resource.
#[must_use]
pub fn undefended_raid() -> Scenario {
    Scenario::new(
        "undefended_raid",
        fleet(&[("large_cargo", 10), ("light_fighter", 5)]),
        UnitCollection::new(),
    )
    .with_resources(ResourceBundle::new(1_000_000, 1_000_000, 1_000_000))
}

/// Identical fleets and research on both sides.
#[must_use]
pub fn mirror_match(name: &str, amount: u64, level: u32) -> Scenario {
    Scenario::new(
        "mirror_match",
        fleet(&[(name, amount)]),
        fleet(&[(name, amount)]),
    )
    .with_contexts(combat_research(level), combat_research(level))
}

/// Deathstars against espionage probes, which they rapid fire 1250 times.
#[must_use]
pub fn deathstars_vs_probes() -> Scenario {
    Scenario::new(
        "deathstars_vs_probes",
        fleet(&[("deathstar", 2)]),
        fleet(&[("espionage_probe", 5_000)]),
    )
}

/// Mixed fleet against mixed defenses, with classes on both sides.
#[must_use]
pub fn mixed_assault() -> Scenario {
    Scenario::new(
        "mixed_assault",
        fleet(&[
            ("light_fighter", 400),
            ("heavy_fighter", 150),
            ("cruiser", 120),
            ("battle_ship", 60),
            ("battlecruiser", 30),
            ("bomber", 10),
            ("large_cargo", 50),
        ]),
        fleet(&[
            ("rocket_launcher", 800),
            ("light_laser", 400),
            ("heavy_laser", 100),
            ("gauss_cannon", 30),
            ("ion_cannon", 40),
            ("plasma_turret", 5),
            ("small_shield_dome", 1),
            ("large_shield_dome", 1),
            ("cruiser", 40),
        ]),
    )
    .with_contexts(
        combat_research(12).with_class(PlayerClass::General),
        combat_research(10).with_class(PlayerClass::Collector),
    )
    .with_resources(ResourceBundle::new(2_000_000, 1_200_000, 400_000))
}
