//! Optimized battle engine.
//!
//! Produces exactly what [`ReferenceEngine`](super::ReferenceEngine)
//! produces for the same seed, but:
//!
//! - keeps stack state in parallel arrays instead of structs
//! - precomputes every shooter/target outcome (bounce, absorption, rapid
//!   fire chance) once per battle
//! - picks unit-weighted targets by binary search over prefix sums
//! - when a shot cannot change anything but the target's pool (per-shot
//!   shields, no explosions, no rapid fire), only counts hits per target
//!   and applies them in bulk after the shooter's volley
//!
//! The bulk path draws targets exactly as the per-shot path does, so the
//! random stream stays in lockstep with the reference engine.

use rand::RngCore;
use tracing::debug;

use super::config::{ExplosionRule, ShieldModel, TargetSelection};
use super::rules;
use super::setup::{FireStats, PreparedBattle, PreparedSide, RoundLog, RoundRecord, Side};
use super::BattleEngine;

/// Struct-of-arrays engine with precomputed shot outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizedEngine;

/// Outcome of one shooter type hitting one target type.
#[derive(Debug, Clone, Copy)]
struct ShotPlan {
    bounced: bool,
    absorbed: u64,
    hull_damage: u64,
    rapid_fire_bp: u32,
}

/// Precomputed outcomes for one firing side, row-major shooter x target.
struct FirePlan {
    columns: usize,
    plans: Vec<ShotPlan>,
    // Rows where no target triggers rapid fire.
    single_shot_rows: Vec<bool>,
}

impl FirePlan {
    fn new(battle: &PreparedBattle<'_>, side: Side) -> Self {
        let config = battle.config();
        let shooters = battle.side(side).combatants();
        let targets = battle.side(side.opponent()).combatants();

        let mut plans = Vec::with_capacity(shooters.len() * targets.len());
        let mut single_shot_rows = Vec::with_capacity(shooters.len());
        for (s, shooter) in shooters.iter().enumerate() {
            let mut single_shot = true;
            for (t, target) in targets.iter().enumerate() {
                let bounced =
                    rules::bounces(shooter.attack, target.shield, config.bounce_threshold_percent);
                let absorbed = shooter.attack.min(target.shield);
                let rapid_fire_bp = rules::rapid_fire_chance_bp(battle.rapid_fire(side, s, t));
                single_shot &= bounced || rapid_fire_bp == 0;
                plans.push(ShotPlan {
                    bounced,
                    absorbed,
                    hull_damage: shooter.attack - absorbed,
                    rapid_fire_bp,
                });
            }
            single_shot_rows.push(single_shot);
        }

        Self {
            columns: targets.len(),
            plans,
            single_shot_rows,
        }
    }

    fn row(&self, shooter: usize) -> &[ShotPlan] {
        &self.plans[shooter * self.columns..(shooter + 1) * self.columns]
    }
}

/// Stack state of one side as parallel arrays.
struct Formation {
    amounts: Vec<u64>,
    pools: Vec<u64>,
    shield_pools: Vec<u64>,
    attack: Vec<u64>,
    shield: Vec<u64>,
    hull: Vec<u64>,
}

impl Formation {
    fn new(side: &PreparedSide) -> Self {
        let combatants = side.combatants();
        Self {
            amounts: combatants.iter().map(|c| c.amount).collect(),
            pools: combatants
                .iter()
                .map(|c| c.amount.saturating_mul(c.hull))
                .collect(),
            shield_pools: combatants
                .iter()
                .map(|c| c.amount.saturating_mul(c.shield))
                .collect(),
            attack: combatants.iter().map(|c| c.attack).collect(),
            shield: combatants.iter().map(|c| c.shield).collect(),
            hull: combatants.iter().map(|c| c.hull).collect(),
        }
    }

    fn total_units(&self) -> u64 {
        self.amounts.iter().sum()
    }

    fn settle(&mut self) {
        for i in 0..self.amounts.len() {
            let survivors = rules::surviving_units(self.pools[i], self.hull[i]);
            invariant!(
                survivors <= self.amounts[i],
                "stack {} grew from {} to {}",
                i,
                self.amounts[i],
                survivors
            );
            self.amounts[i] = survivors.min(self.amounts[i]);
            self.shield_pools[i] = self.amounts[i].saturating_mul(self.shield[i]);
        }
    }
}

/// Live targets at round start.
struct TargetIndex {
    live: Vec<usize>,
    // Cumulative unit counts; prefix[k] = units in live[0..=k].
    prefix: Vec<u64>,
}

impl TargetIndex {
    fn new(targets: &Formation) -> Self {
        let mut live = Vec::with_capacity(targets.amounts.len());
        let mut prefix = Vec::with_capacity(targets.amounts.len());
        let mut running = 0u64;
        for (i, &amount) in targets.amounts.iter().enumerate() {
            if amount > 0 {
                running += amount;
                live.push(i);
                prefix.push(running);
            }
        }
        Self { live, prefix }
    }

    fn total_units(&self) -> u64 {
        self.prefix.last().copied().unwrap_or(0)
    }

    fn pick(&self, selection: TargetSelection, rng: &mut dyn RngCore) -> usize {
        match selection {
            TargetSelection::UniformStack => self.live[rules::draw_index(rng, self.live.len())],
            TargetSelection::UnitWeighted => {
                let drawn = rules::draw_unit(rng, self.total_units());
                let k = self.prefix.partition_point(|&end| end <= drawn);
                self.live[k]
            }
        }
    }
}

impl BattleEngine for OptimizedEngine {
    fn name(&self) -> &'static str {
        "optimized"
    }

    fn resolve_rounds(&self, battle: &PreparedBattle<'_>, rng: &mut dyn RngCore) -> RoundLog {
        let attacker_plan = FirePlan::new(battle, Side::Attacker);
        let defender_plan = FirePlan::new(battle, Side::Defender);
        let mut attackers = Formation::new(battle.side(Side::Attacker));
        let mut defenders = Formation::new(battle.side(Side::Defender));
        let mut tally = vec![0u64; attackers.amounts.len().max(defenders.amounts.len())];
        let mut log = RoundLog {
            rounds: Vec::with_capacity(battle.config().max_rounds as usize),
        };

        for round in 1..=battle.config().max_rounds {
            let attacker_fire = volley(
                battle,
                &attacker_plan,
                &attackers,
                &mut defenders,
                &mut tally,
                rng,
            );
            let defender_fire = volley(
                battle,
                &defender_plan,
                &defenders,
                &mut attackers,
                &mut tally,
                rng,
            );

            attackers.settle();
            defenders.settle();

            let attacker_units = attackers.total_units();
            let defender_units = defenders.total_units();
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
                attacker_remaining: attackers.amounts.clone(),
                defender_remaining: defenders.amounts.clone(),
            });

            if attacker_units == 0 || defender_units == 0 {
                break;
            }
        }

        log
    }
}

fn volley(
    battle: &PreparedBattle<'_>,
    plan: &FirePlan,
    shooters: &Formation,
    targets: &mut Formation,
    tally: &mut [u64],
    rng: &mut dyn RngCore,
) -> FireStats {
    let config = battle.config();
    let index = TargetIndex::new(targets);
    let mut stats = FireStats::default();
    if index.live.is_empty() {
        return stats;
    }

    let bulk = config.shield_model == ShieldModel::PerShot
        && config.explosion == ExplosionRule::Disabled;

    for (s, &shots) in shooters.amounts.iter().enumerate() {
        if shots == 0 {
            continue;
        }
        let row = plan.row(s);
        let attack = shooters.attack[s];

        if bulk && plan.single_shot_rows[s] {
            for _ in 0..shots {
                let t = index.pick(config.target_selection, rng);
                if !row[t].bounced {
                    tally[t] += 1;
                }
            }
            for &t in &index.live {
                let hits = std::mem::take(&mut tally[t]);
                if hits > 0 {
                    let shot = &row[t];
                    targets.pools[t] = targets.pools[t]
                        .saturating_sub(shot.hull_damage.saturating_mul(hits));
                    stats.record(hits, attack, shot.absorbed);
                }
            }
            continue;
        }

        for _ in 0..shots {
            loop {
                let t = index.pick(config.target_selection, rng);
                let shot = &row[t];
                if shot.bounced {
                    break;
                }

                let (absorbed, hull_damage) = match config.shield_model {
                    ShieldModel::PerShot => (shot.absorbed, shot.hull_damage),
                    ShieldModel::Depleting => {
                        let absorbed = shot.absorbed.min(targets.shield_pools[t]);
                        targets.shield_pools[t] -= absorbed;
                        (absorbed, attack - absorbed)
                    }
                };
                targets.pools[t] = targets.pools[t].saturating_sub(hull_damage);

                if config.explosion != ExplosionRule::Disabled {
                    let hull = targets.hull[t];
                    let chance =
                        rules::explosion_chance_bp(config.explosion, attack, targets.pools[t], hull);
                    if rules::roll(rng, chance) {
                        targets.pools[t] -= rules::front_unit_integrity(targets.pools[t], hull);
                    }
                }

                stats.record(1, attack, absorbed);

                if !rules::roll(rng, shot.rapid_fire_bp) {
                    break;
                }
            }
        }
    }

    stats
}
