//! Per-shot rules shared by every engine.
//!
//! Probabilities are integer basis points so that rolls are exact and
//! identical across engines and platforms.

use rand::{Rng, RngCore};

use super::config::ExplosionRule;

/// Basis points in 100%.
pub(crate) const ROLL_SCALE: u32 = 10_000;

/// Uniform index in `0..len`. Draws a `u64` so results do not depend on
/// pointer width.
pub(crate) fn draw_index(rng: &mut dyn RngCore, len: usize) -> usize {
    let drawn = rng.gen_range(0..len as u64);
    // drawn < len
    #[allow(clippy::cast_possible_truncation)]
    let index = drawn as usize;
    index
}

/// Uniform value in `0..total`.
pub(crate) fn draw_unit(rng: &mut dyn RngCore, total: u64) -> u64 {
    rng.gen_range(0..total)
}

/// Roll against a chance in basis points. A zero chance draws nothing.
pub(crate) fn roll(rng: &mut dyn RngCore, chance_bp: u32) -> bool {
    chance_bp > 0 && rng.gen_range(0..ROLL_SCALE) < chance_bp
}

/// True if a shot is too weak to scratch the target's shield.
pub(crate) fn bounces(damage: u64, shield: u64, threshold_percent: u32) -> bool {
    u128::from(damage) * 100 < u128::from(shield) * u128::from(threshold_percent)
}

/// Chance of another shot after a hit, for rapid fire value `shots`.
///
/// `100% - 100% / shots`: 5 gives 80%, 1250 gives 99.92%.
pub(crate) fn rapid_fire_chance_bp(shots: u32) -> u32 {
    if shots <= 1 {
        0
    } else {
        ROLL_SCALE - ROLL_SCALE / shots
    }
}

/// Hit points left on the front unit of a stack.
///
/// The pool is spread so that every unit but the front one is intact.
pub(crate) fn front_unit_integrity(pool: u64, hull: u64) -> u64 {
    if pool == 0 {
        return 0;
    }
    match pool % hull {
        0 => hull,
        rest => rest,
    }
}

/// Units still alive for a hit-point pool.
pub(crate) fn surviving_units(pool: u64, hull: u64) -> u64 {
    pool.div_ceil(hull)
}

/// Explosion chance of the front unit after a hit, in basis points.
pub(crate) fn explosion_chance_bp(rule: ExplosionRule, damage: u64, pool: u64, hull: u64) -> u32 {
    match rule {
        ExplosionRule::Disabled => 0,
        ExplosionRule::HullThreshold { threshold_percent } => {
            let front = front_unit_integrity(pool, hull);
            if front == 0 {
                return 0;
            }
            let remaining_bp = u128::from(front) * u128::from(ROLL_SCALE) / u128::from(hull);
            // front <= hull
            #[allow(clippy::cast_possible_truncation)]
            let remaining_bp = remaining_bp as u32;
            if remaining_bp < threshold_percent * 100 {
                ROLL_SCALE - remaining_bp
            } else {
                0
            }
        }
        ExplosionRule::Overkill {
            damage_multiple_percent,
            chance_percent,
        } => {
            let qualifies =
                u128::from(damage) * 100 >= u128::from(hull) * u128::from(damage_multiple_percent);
            if pool > 0 && qualifies {
                chance_percent * 100
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounce_threshold() {
        // 1% of 10000 is 100
        assert!(bounces(99, 10_000, 1));
        assert!(!bounces(100, 10_000, 1));
        assert!(!bounces(0, 0, 1));
        assert!(!bounces(5, 10_000, 0));
    }

    #[test]
    fn test_rapid_fire_chance() {
        assert_eq!(rapid_fire_chance_bp(0), 0);
        assert_eq!(rapid_fire_chance_bp(1), 0);
        assert_eq!(rapid_fire_chance_bp(5), 8_000);
        assert_eq!(rapid_fire_chance_bp(3), 6_667);
        assert_eq!(rapid_fire_chance_bp(1250), 9_992);
    }

    #[test]
    fn test_front_unit_and_survivors() {
        assert_eq!(front_unit_integrity(0, 100), 0);
        assert_eq!(front_unit_integrity(300, 100), 100);
        assert_eq!(front_unit_integrity(250, 100), 50);
        assert_eq!(surviving_units(250, 100), 3);
        assert_eq!(surviving_units(300, 100), 3);
        assert_eq!(surviving_units(0, 100), 0);
    }

    #[test]
    fn test_hull_threshold_explosions() {
        let rule = ExplosionRule::HullThreshold {
            threshold_percent: 70,
        };
        // intact front unit
        assert_eq!(explosion_chance_bp(rule, 10, 1_000, 100), 0);
        // front unit at 75%
        assert_eq!(explosion_chance_bp(rule, 10, 975, 100), 0);
        // front unit at 40%
        assert_eq!(explosion_chance_bp(rule, 10, 940, 100), 6_000);
        // stack gone
        assert_eq!(explosion_chance_bp(rule, 10, 0, 100), 0);
    }

    #[test]
    fn test_overkill_explosions() {
        let rule = ExplosionRule::Overkill {
            damage_multiple_percent: 150,
            chance_percent: 25,
        };
        assert_eq!(explosion_chance_bp(rule, 149, 1_000, 100), 0);
        assert_eq!(explosion_chance_bp(rule, 150, 1_000, 100), 2_500);
        assert_eq!(explosion_chance_bp(rule, 150, 0, 100), 0);
        assert_eq!(explosion_chance_bp(ExplosionRule::Disabled, 1_000, 1_000, 100), 0);
    }
}
