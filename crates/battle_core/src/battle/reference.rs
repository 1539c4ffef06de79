//! Reference battle engine.
//!
//! Resolves every shot one by one and recomputes everything it needs on
//! the spot. Slow on large fleets, but each step maps directly onto the
//! round rules, which makes it the yardstick other engines are held to.

use rand::RngCore;
use tracing::debug;

use super::config::{ShieldModel, TargetSelection};
use super::rules;
use super::setup::{FireStats, PreparedBattle, PreparedSide, RoundLog, RoundRecord, Side};
use super::BattleEngine;

/// Straightforward per-shot engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEngine;

/// Mutable state of one stack.
#[derive(Debug, Clone, Copy)]
struct StackState {
    amount: u64,
    pool: u64,
    shield_pool: u64,
}

fn initial_states(side: &PreparedSide) -> Vec<StackState> {
    side.combatants()
        .iter()
        .map(|c| StackState {
            amount: c.amount,
            pool: c.amount.saturating_mul(c.hull),
            shield_pool: c.amount.saturating_mul(c.shield),
        })
        .collect()
}

fn total_units(states: &[StackState]) -> u64 {
    states.iter().map(|s| s.amount).sum()
}

impl BattleEngine for ReferenceEngine {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn resolve_rounds(&self, battle: &PreparedBattle<'_>, rng: &mut dyn RngCore) -> RoundLog {
        let mut attackers = initial_states(battle.side(Side::Attacker));
        let mut defenders = initial_states(battle.side(Side::Defender));
        let mut log = RoundLog::default();

        for round in 1..=battle.config().max_rounds {
            let attacker_fire = volley(battle, Side::Attacker, &attackers, &mut defenders, rng);
            let defender_fire = volley(battle, Side::Defender, &defenders, &mut attackers, rng);

            settle(battle.side(Side::Attacker), &mut attackers);
            settle(battle.side(Side::Defender), &mut defenders);

            let attacker_units = total_units(&attackers);
            let defender_units = total_units(&defenders);
            debug!(
                engine = self.name(),
                round,
                attacker_units,
                defender_units,
                attacker_hits = attacker_fire.hits,
                defender_hits = defender_fire.hits,
                "Round concluded"
            );

            log.rounds.push(RoundRecord {
                attacker_fire,
                defender_fire,
                attacker_remaining: attackers.iter().map(|s| s.amount).collect(),
                defender_remaining: defenders.iter().map(|s| s.amount).collect(),
            });

            if attacker_units == 0 || defender_units == 0 {
                break;
            }
        }

        log
    }
}

/// Pick a target among stacks alive at round start.
fn pick_target(
    selection: TargetSelection,
    live: &[usize],
    live_units: u64,
    targets: &[StackState],
    rng: &mut dyn RngCore,
) -> usize {
    match selection {
        TargetSelection::UniformStack => live[rules::draw_index(rng, live.len())],
        TargetSelection::UnitWeighted => {
            let mut remaining = rules::draw_unit(rng, live_units);
            for &index in live {
                let amount = targets[index].amount;
                if remaining < amount {
                    return index;
                }
                remaining -= amount;
            }
            // remaining < live_units, so the loop always returns
            live[live.len() - 1]
        }
    }
}

/// All shots of one side against the other.
fn volley(
    battle: &PreparedBattle<'_>,
    side: Side,
    shooters: &[StackState],
    targets: &mut [StackState],
    rng: &mut dyn RngCore,
) -> FireStats {
    let config = battle.config();
    let shooter_side = battle.side(side);
    let target_side = battle.side(side.opponent());

    let live: Vec<usize> = (0..targets.len())
        .filter(|&i| targets[i].amount > 0)
        .collect();
    let live_units = total_units(targets);
    let mut stats = FireStats::default();
    if live.is_empty() {
        return stats;
    }

    for (s, state) in shooters.iter().enumerate() {
        let shooter = &shooter_side.combatants()[s];
        for _ in 0..state.amount {
            loop {
                let t = pick_target(config.target_selection, &live, live_units, targets, rng);
                let target = &target_side.combatants()[t];
                if rules::bounces(shooter.attack, target.shield, config.bounce_threshold_percent) {
                    break;
                }

                let stack = &mut targets[t];
                let mut absorbed = shooter.attack.min(target.shield);
                if config.shield_model == ShieldModel::Depleting {
                    absorbed = absorbed.min(stack.shield_pool);
                    stack.shield_pool -= absorbed;
                }
                stack.pool = stack.pool.saturating_sub(shooter.attack - absorbed);

                let chance =
                    rules::explosion_chance_bp(config.explosion, shooter.attack, stack.pool, target.hull);
                if rules::roll(rng, chance) {
                    stack.pool -= rules::front_unit_integrity(stack.pool, target.hull);
                }

                stats.record(1, shooter.attack, absorbed);

                let rapid_fire = battle.rapid_fire(side, s, t);
                if !rules::roll(rng, rules::rapid_fire_chance_bp(rapid_fire)) {
                    break;
                }
            }
        }
    }

    stats
}

/// End of round: remove dead units and recharge shields.
fn settle(side: &PreparedSide, states: &mut [StackState]) {
    for (state, combatant) in states.iter_mut().zip(side.combatants()) {
        let survivors = rules::surviving_units(state.pool, combatant.hull);
        invariant!(
            survivors <= state.amount,
            "stack of {:?} grew from {} to {}",
            combatant.unit,
            state.amount,
            survivors
        );
        state.amount = survivors.min(state.amount);
        state.shield_pool = state.amount.saturating_mul(combatant.shield);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::{BattleConfig, BattleInput, ExplosionRule};
    use crate::catalog::{UnitCatalog, UnitId};
    use crate::fleet::UnitCollection;
    use crate::player::PlayerContext;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn id(name: &str) -> UnitId {
        UnitCatalog::standard().resolve(name).unwrap()
    }

    fn resolve(
        attacker: &UnitCollection,
        defender: &UnitCollection,
        config: &BattleConfig,
        seed: u64,
    ) -> RoundLog {
        let ctx = PlayerContext::new();
        let input = BattleInput::new(UnitCatalog::standard(), attacker, &ctx, defender, &ctx);
        let battle = PreparedBattle::new(&input, config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        ReferenceEngine.resolve_rounds(&battle, &mut rng)
    }

    #[test]
    fn test_one_shot_per_unit_without_rapid_fire() {
        let attacker = UnitCollection::new().with(id("cruiser"), 30);
        let defender = UnitCollection::new().with(id("rocket_launcher"), 1_000);
        let config = BattleConfig::default().with_rapid_fire(false);

        let log = resolve(&attacker, &defender, &config, 3);
        assert_eq!(log.rounds[0].attacker_fire.hits, 30);
        assert_eq!(log.rounds[0].defender_fire.hits, 1_000);
    }

    #[test]
    fn test_rapid_fire_adds_shots() {
        let attacker = UnitCollection::new().with(id("cruiser"), 30);
        let defender = UnitCollection::new().with(id("rocket_launcher"), 1_000);
        let config = BattleConfig::default();

        let log = resolve(&attacker, &defender, &config, 3);
        // Rapid fire 10 averages 10 shots per cruiser.
        assert!(log.rounds[0].attacker_fire.hits > 100);
    }

    #[test]
    fn test_pool_carries_partial_damage() {
        // Each heavy fighter shot deals 100 past the shield, far below one cruiser hull.
        let attacker = UnitCollection::new().with(id("heavy_fighter"), 10);
        let defender = UnitCollection::new().with(id("cruiser"), 2);
        let config = BattleConfig::default()
            .with_explosion(ExplosionRule::Disabled)
            .with_max_rounds(1);

        let log = resolve(&attacker, &defender, &config, 11);
        assert_eq!(log.rounds.len(), 1);
        assert_eq!(log.rounds[0].defender_remaining, vec![2]);
        assert_eq!(log.rounds[0].attacker_fire.absorbed, 10 * 50);
    }

    #[test]
    fn test_stops_when_a_side_is_destroyed() {
        let attacker = UnitCollection::new().with(id("deathstar"), 5);
        let defender = UnitCollection::new().with(id("light_fighter"), 3);
        let log = resolve(&attacker, &defender, &BattleConfig::default(), 5);

        assert_eq!(log.rounds.len(), 1);
        assert_eq!(log.rounds[0].defender_remaining, vec![0]);
        assert_eq!(log.rounds[0].attacker_remaining, vec![5]);
    }

    #[test]
    fn test_empty_defender_single_round() {
        let attacker = UnitCollection::new().with(id("small_cargo"), 10);
        let log = resolve(&attacker, &UnitCollection::new(), &BattleConfig::default(), 0);

        assert_eq!(log.rounds.len(), 1);
        assert_eq!(log.rounds[0].attacker_fire, FireStats::default());
        assert_eq!(log.rounds[0].attacker_remaining, vec![10]);
    }

    #[test]
    fn test_round_limit() {
        let attacker = UnitCollection::new().with(id("solar_satellite"), 1);
        let defender = UnitCollection::new().with(id("large_shield_dome"), 1);
        let log = resolve(&attacker, &defender, &BattleConfig::default(), 2);

        // Neither side can hurt the other.
        assert_eq!(log.rounds.len(), 6);
        assert_eq!(log.rounds[5].attacker_remaining, vec![1]);
        assert_eq!(log.rounds[5].defender_remaining, vec![1]);
    }
}
