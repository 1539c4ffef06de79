//! Battle results.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::setup::{PreparedBattle, PreparedSide, RoundLog, Side};
use crate::catalog::UnitCatalog;
use crate::fleet::UnitCollection;
use crate::resources::ResourceBundle;

/// Who won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// Defender wiped out, attacker survived.
    Attacker,
    /// Attacker wiped out, defender survived.
    Defender,
    /// Both sides survived the round limit, or both were wiped out.
    Draw,
}

impl Winner {
    /// Decide from the surviving unit counts.
    #[must_use]
    pub const fn decide(attacker_units: u64, defender_units: u64) -> Self {
        match (attacker_units > 0, defender_units > 0) {
            (true, false) => Self::Attacker,
            (false, true) => Self::Defender,
            _ => Self::Draw,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Attacker => "attacker",
            Self::Defender => "defender",
            Self::Draw => "draw",
        })
    }
}

/// Snapshot after one round.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Round number, starting at 1.
    pub round: u32,
    /// Attacker units after the round.
    pub attacker_units: UnitCollection,
    /// Defender units after the round.
    pub defender_units: UnitCollection,
    /// Attacker units destroyed this round.
    pub attacker_losses: UnitCollection,
    /// Defender units destroyed this round.
    pub defender_losses: UnitCollection,
    /// Attacker shots that did not bounce.
    pub attacker_hits: u64,
    /// Defender shots that did not bounce.
    pub defender_hits: u64,
    /// Full damage of the attacker's hits.
    pub attacker_damage: u64,
    /// Full damage of the defender's hits.
    pub defender_damage: u64,
    /// Attacker damage soaked by defender shields.
    pub absorbed_by_defender: u64,
    /// Defender damage soaked by attacker shields.
    pub absorbed_by_attacker: u64,
}

/// Outcome of a battle. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleResult {
    attacker_start: UnitCollection,
    defender_start: UnitCollection,
    attacker_end: UnitCollection,
    defender_end: UnitCollection,
    rounds: Vec<RoundSummary>,
    winner: Winner,
    debris: ResourceBundle,
    loot: ResourceBundle,
    attacker_losses: ResourceBundle,
    defender_losses: ResourceBundle,
    moon_chance_percent: u32,
}

/// Value of destroyed units, and the ship part of it.
fn destroyed_value(side: &PreparedSide, remaining: &[u64]) -> (ResourceBundle, ResourceBundle) {
    side.combatants()
        .iter()
        .zip(remaining)
        .fold((ResourceBundle::ZERO, ResourceBundle::ZERO), |(all, ships), (c, left)| {
            let value = c.cost * c.amount.saturating_sub(*left);
            let ships = if c.is_ship { ships + value } else { ships };
            (all + value, ships)
        })
}

fn losses_between(side: &PreparedSide, before: &[u64], after: &[u64]) -> UnitCollection {
    let lost: Vec<u64> = before
        .iter()
        .zip(after)
        .map(|(b, a)| b.saturating_sub(*a))
        .collect();
    side.collection(&lost)
}

impl BattleResult {
    /// Build the result from a resolved round log.
    pub(crate) fn conclude(battle: &PreparedBattle<'_>, log: &RoundLog) -> Self {
        let config = battle.config();
        let attackers = battle.side(Side::Attacker);
        let defenders = battle.side(Side::Defender);

        let mut attacker_before = attackers.starting_amounts();
        let mut defender_before = defenders.starting_amounts();
        let mut rounds = Vec::with_capacity(log.rounds.len());
        for (number, record) in (1u32..).zip(&log.rounds) {
            rounds.push(RoundSummary {
                round: number,
                attacker_units: attackers.collection(&record.attacker_remaining),
                defender_units: defenders.collection(&record.defender_remaining),
                attacker_losses: losses_between(
                    attackers,
                    &attacker_before,
                    &record.attacker_remaining,
                ),
                defender_losses: losses_between(
                    defenders,
                    &defender_before,
                    &record.defender_remaining,
                ),
                attacker_hits: record.attacker_fire.hits,
                defender_hits: record.defender_fire.hits,
                attacker_damage: record.attacker_fire.damage,
                defender_damage: record.defender_fire.damage,
                absorbed_by_defender: record.attacker_fire.absorbed,
                absorbed_by_attacker: record.defender_fire.absorbed,
            });
            attacker_before.clone_from(&record.attacker_remaining);
            defender_before.clone_from(&record.defender_remaining);
        }

        let attacker_left: u64 = attacker_before.iter().sum();
        let defender_left: u64 = defender_before.iter().sum();
        let winner = Winner::decide(attacker_left, defender_left);

        let (attacker_losses, attacker_ship_losses) = destroyed_value(attackers, &attacker_before);
        let (defender_losses, defender_ship_losses) = destroyed_value(defenders, &defender_before);
        let debris = (attacker_ship_losses + defender_ship_losses)
            .without_deuterium()
            .scale_percent(config.debris_percent);

        let loot = if winner == Winner::Attacker {
            let capacity = attackers
                .combatants()
                .iter()
                .zip(&attacker_before)
                .fold(0u64, |acc, (c, left)| {
                    acc.saturating_add(c.capacity.saturating_mul(*left))
                });
            plunder(
                battle.defender_resources().scale_percent(config.loot_percent),
                capacity,
            )
        } else {
            ResourceBundle::ZERO
        };

        let moon_chance_percent = config.moon_chance.chance_percent(&debris);

        debug!(
            rounds = rounds.len(),
            %winner,
            attacker_left,
            defender_left,
            debris = debris.total(),
            loot = loot.total(),
            moon_chance_percent,
            "Battle concluded"
        );

        Self {
            attacker_start: attackers.collection(&attackers.starting_amounts()),
            defender_start: defenders.collection(&defenders.starting_amounts()),
            attacker_end: attackers.collection(&attacker_before),
            defender_end: defenders.collection(&defender_before),
            rounds,
            winner,
            debris,
            loot,
            attacker_losses,
            defender_losses,
            moon_chance_percent,
        }
    }

    /// Attacker units at battle start.
    #[must_use]
    pub fn attacker_start(&self) -> &UnitCollection {
        &self.attacker_start
    }

    /// Defender units at battle start.
    #[must_use]
    pub fn defender_start(&self) -> &UnitCollection {
        &self.defender_start
    }

    /// Surviving attacker units.
    #[must_use]
    pub fn attacker_end(&self) -> &UnitCollection {
        &self.attacker_end
    }

    /// Surviving defender units.
    #[must_use]
    pub fn defender_end(&self) -> &UnitCollection {
        &self.defender_end
    }

    /// Round snapshots in order.
    #[must_use]
    pub fn rounds(&self) -> &[RoundSummary] {
        &self.rounds
    }

    /// Number of rounds fought.
    #[must_use]
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Who won.
    #[must_use]
    pub fn winner(&self) -> Winner {
        self.winner
    }

    /// Debris field from destroyed ships of both sides.
    #[must_use]
    pub fn debris(&self) -> ResourceBundle {
        self.debris
    }

    /// Resources taken from the defender.
    #[must_use]
    pub fn loot(&self) -> ResourceBundle {
        self.loot
    }

    /// Production cost of destroyed attacker units.
    #[must_use]
    pub fn attacker_losses(&self) -> ResourceBundle {
        self.attacker_losses
    }

    /// Production cost of destroyed defender units.
    #[must_use]
    pub fn defender_losses(&self) -> ResourceBundle {
        self.defender_losses
    }

    /// Moon formation chance in percent.
    #[must_use]
    pub fn moon_chance_percent(&self) -> u32 {
        self.moon_chance_percent
    }

    /// Attacker units destroyed over the whole battle.
    #[must_use]
    pub fn attacker_units_lost(&self) -> UnitCollection {
        self.attacker_start.difference(&self.attacker_end)
    }

    /// Defender units destroyed over the whole battle.
    #[must_use]
    pub fn defender_units_lost(&self) -> UnitCollection {
        self.defender_start.difference(&self.defender_end)
    }

    /// Stable hash of the whole outcome, for determinism checks.
    #[must_use]
    pub fn outcome_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Every reported field in which `other` differs from this result.
    ///
    /// Fleets are compared by machine name so the listing reads well in
    /// reports. Per-round fields are only compared for rounds both
    /// results have.
    #[must_use]
    pub fn diff(&self, other: &Self, catalog: &UnitCatalog) -> Vec<ResultDifference> {
        let mut out = Vec::new();
        let mut check = |field: String, left: String, right: String| {
            if left != right {
                out.push(ResultDifference { field, left, right });
            }
        };
        let named = |units: &UnitCollection| format!("{:?}", units.to_named(catalog));

        check(
            "rounds".into(),
            self.round_count().to_string(),
            other.round_count().to_string(),
        );
        check(
            "winner".into(),
            self.winner.to_string(),
            other.winner.to_string(),
        );
        check(
            "attacker survivors".into(),
            named(&self.attacker_end),
            named(&other.attacker_end),
        );
        check(
            "defender survivors".into(),
            named(&self.defender_end),
            named(&other.defender_end),
        );
        check(
            "attacker losses".into(),
            self.attacker_losses.to_string(),
            other.attacker_losses.to_string(),
        );
        check(
            "defender losses".into(),
            self.defender_losses.to_string(),
            other.defender_losses.to_string(),
        );
        check(
            "debris".into(),
            self.debris.to_string(),
            other.debris.to_string(),
        );
        check("loot".into(), self.loot.to_string(), other.loot.to_string());
        check(
            "moon chance".into(),
            self.moon_chance_percent.to_string(),
            other.moon_chance_percent.to_string(),
        );

        for (l, r) in self.rounds.iter().zip(&other.rounds) {
            let round = l.round;
            let pairs = [
                ("attacker hits", l.attacker_hits, r.attacker_hits),
                ("defender hits", l.defender_hits, r.defender_hits),
                ("absorbed by defender", l.absorbed_by_defender, r.absorbed_by_defender),
                ("absorbed by attacker", l.absorbed_by_attacker, r.absorbed_by_attacker),
            ];
            for (field, left, right) in pairs {
                check(
                    format!("round {round} {field}"),
                    left.to_string(),
                    right.to_string(),
                );
            }
            check(
                format!("round {round} attacker units"),
                named(&l.attacker_units),
                named(&r.attacker_units),
            );
            check(
                format!("round {round} defender units"),
                named(&l.defender_units),
                named(&r.defender_units),
            );
        }
        out
    }
}

/// One field in which two results differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDifference {
    /// What differs, e.g. `round 2 attacker hits`.
    pub field: String,
    /// Value in the first result.
    pub left: String,
    /// Value in the second result.
    pub right: String,
}

impl fmt::Display for ResultDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} != {}", self.field, self.left, self.right)
    }
}

/// Split available loot over cargo capacity.
///
/// Metal fills up to a third of the capacity, crystal up to half of what
/// is left, deuterium the rest. Remaining space then takes more metal (up
/// to half of it) and finally more crystal.
#[must_use]
pub fn plunder(available: ResourceBundle, capacity: u64) -> ResourceBundle {
    let mut space = capacity;

    let metal = (space / 3).min(available.metal);
    space -= metal;
    let crystal = (space / 2).min(available.crystal);
    space -= crystal;
    let deuterium = space.min(available.deuterium);
    space -= deuterium;

    let extra_metal = (space / 2).min(available.metal - metal);
    space -= extra_metal;
    let extra_crystal = space.min(available.crystal - crystal);

    ResourceBundle::new(metal + extra_metal, crystal + extra_crystal, deuterium)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::{BattleConfig, BattleEngine, BattleInput, ReferenceEngine};
    use crate::catalog::{UnitCatalog, UnitId};
    use crate::player::PlayerContext;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn id(name: &str) -> UnitId {
        UnitCatalog::standard().resolve(name).unwrap()
    }

    fn simulate(attacker: &UnitCollection, defender: &UnitCollection, seed: u64) -> BattleResult {
        let ctx = PlayerContext::new();
        let input = BattleInput::new(UnitCatalog::standard(), attacker, &ctx, defender, &ctx)
            .with_defender_resources(ResourceBundle::new(100_000, 50_000, 20_000));
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        ReferenceEngine
            .simulate(&input, &BattleConfig::default(), &mut rng)
            .unwrap()
    }

    #[test]
    fn test_winner_rules() {
        assert_eq!(Winner::decide(5, 0), Winner::Attacker);
        assert_eq!(Winner::decide(0, 5), Winner::Defender);
        assert_eq!(Winner::decide(0, 0), Winner::Draw);
        assert_eq!(Winner::decide(3, 3), Winner::Draw);
    }

    #[test]
    fn test_plunder_fits_everything() {
        let available = ResourceBundle::new(100, 50, 20);
        assert_eq!(plunder(available, 1_000_000), available);
    }

    #[test]
    fn test_plunder_order() {
        let available = ResourceBundle::new(10_000, 10_000, 10_000);
        // 900: 300 metal, 300 crystal, 300 deuterium
        assert_eq!(plunder(available, 900), ResourceBundle::new(300, 300, 300));

        // deuterium runs out, the rest goes to metal then crystal
        let available = ResourceBundle::new(10_000, 10_000, 0);
        assert_eq!(plunder(available, 900), ResourceBundle::new(450, 450, 0));
    }

    #[test]
    fn test_plunder_zero_capacity() {
        let available = ResourceBundle::new(10, 10, 10);
        assert_eq!(plunder(available, 0), ResourceBundle::ZERO);
    }

    #[test]
    fn test_debris_counts_ships_only() {
        // Deathstars wipe out the defense in one round.
        let attacker = UnitCollection::new().with(id("deathstar"), 5);
        let defender = UnitCollection::new()
            .with(id("light_fighter"), 10)
            .with(id("rocket_launcher"), 10);
        let result = simulate(&attacker, &defender, 4);

        assert_eq!(result.winner(), Winner::Attacker);
        assert_eq!(result.round_count(), 1);
        // 10 light fighters: 30000 metal, 10000 crystal, 30% of it
        assert_eq!(result.debris(), ResourceBundle::new(9_000, 3_000, 0));
        assert_eq!(result.defender_losses(), ResourceBundle::new(50_000, 10_000, 0));
        assert_eq!(result.attacker_losses(), ResourceBundle::ZERO);
        assert_eq!(result.moon_chance_percent(), 0);
    }

    #[test]
    fn test_loot_only_for_winning_attacker() {
        let attacker = UnitCollection::new()
            .with(id("deathstar"), 1)
            .with(id("large_cargo"), 10);
        let defender = UnitCollection::new().with(id("rocket_launcher"), 5);
        let result = simulate(&attacker, &defender, 8);

        assert_eq!(result.winner(), Winner::Attacker);
        // Half of the stock fits easily into 1.25M capacity.
        assert_eq!(result.loot(), ResourceBundle::new(50_000, 25_000, 10_000));

        let attacker = UnitCollection::new().with(id("solar_satellite"), 1);
        let defender = UnitCollection::new().with(id("large_shield_dome"), 1);
        let result = simulate(&attacker, &defender, 8);
        assert_eq!(result.winner(), Winner::Draw);
        assert_eq!(result.loot(), ResourceBundle::ZERO);
    }

    #[test]
    fn test_round_losses_add_up() {
        let attacker = UnitCollection::new().with(id("cruiser"), 40);
        let defender = UnitCollection::new()
            .with(id("light_fighter"), 150)
            .with(id("rocket_launcher"), 60);
        let result = simulate(&attacker, &defender, 21);

        for (start, end, side_losses) in [
            (
                result.attacker_start(),
                result.attacker_end(),
                result
                    .rounds()
                    .iter()
                    .map(|r| &r.attacker_losses)
                    .collect::<Vec<_>>(),
            ),
            (
                result.defender_start(),
                result.defender_end(),
                result
                    .rounds()
                    .iter()
                    .map(|r| &r.defender_losses)
                    .collect::<Vec<_>>(),
            ),
        ] {
            for stack in start {
                let lost: u64 = side_losses.iter().map(|l| l.amount_of(stack.unit)).sum();
                assert_eq!(stack.amount, end.amount_of(stack.unit) + lost);
            }
        }
    }

    #[test]
    fn test_outcome_hash_is_stable() {
        let attacker = UnitCollection::new().with(id("battle_ship"), 10);
        let defender = UnitCollection::new().with(id("heavy_laser"), 25);
        let a = simulate(&attacker, &defender, 99);
        let b = simulate(&attacker, &defender, 99);
        assert_eq!(a, b);
        assert_eq!(a.outcome_hash(), b.outcome_hash());
    }

    #[test]
    fn test_result_round_trips_through_ron() {
        let attacker = UnitCollection::new().with(id("bomber"), 3);
        let defender = UnitCollection::new().with(id("ion_cannon"), 4);
        let result = simulate(&attacker, &defender, 2);

        let ron = ron::to_string(&result).unwrap();
        let parsed: BattleResult = ron::from_str(&ron).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_diff_lists_changed_fields() {
        let attacker = UnitCollection::new()
            .with(id("cruiser"), 40)
            .with(id("light_fighter"), 200);
        let defender = UnitCollection::new()
            .with(id("rocket_launcher"), 300)
            .with(id("light_laser"), 100);
        let a = simulate(&attacker, &defender, 1);
        let b = simulate(&attacker, &defender, 2);
        let catalog = UnitCatalog::standard();

        assert!(a.diff(&a, catalog).is_empty());
        let diffs = a.diff(&b, catalog);
        assert!(diffs.iter().any(|d| d.field.starts_with("round 1 ")));
        assert!(diffs[0].to_string().contains(" != "));
    }
}
