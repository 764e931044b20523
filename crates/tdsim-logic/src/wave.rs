//! Wave composition.
//!
//! Wave structure is fixed (3 + 2·w enemies); which type fills each slot is
//! drawn from the caller's generator. Exactly one uniform draw is consumed
//! per slot, boss slot included, so a seeded generator reproduces the same
//! wave and leaves the same state behind for the next one.

use rand::Rng;

use crate::kinds::enemies;

/// First wave that can contain fast enemies.
pub const FAST_FROM_WAVE: u32 = 3;
pub const FAST_CHANCE: f64 = 0.25;
/// First wave that can contain tanks.
pub const TANK_FROM_WAVE: u32 = 5;
pub const TANK_CHANCE: f64 = 0.15;

/// Number of enemies in wave `wave` (1-based).
pub fn enemy_count(wave: u32) -> usize {
    3 + 2 * wave as usize
}

/// Enemy type for one slot given its uniform draw in `[0, 1)`.
///
/// The tank check runs after the fast check, so a draw low enough for both
/// yields a tank. The last slot of the boss wave is always the boss.
pub fn slot_kind(
    wave: u32,
    slot: usize,
    count: usize,
    draw: f64,
    boss_wave: u32,
) -> &'static str {
    let mut kind = enemies::BASIC;
    if wave >= FAST_FROM_WAVE && draw < FAST_CHANCE {
        kind = enemies::FAST;
    }
    if wave >= TANK_FROM_WAVE && draw < TANK_CHANCE {
        kind = enemies::TANK;
    }
    if wave == boss_wave && slot + 1 == count {
        kind = enemies::BOSS;
    }
    kind
}

/// Ordered enemy types for `wave`, in spawn order.
pub fn compose_wave<R: Rng + ?Sized>(
    wave: u32,
    boss_wave: u32,
    rng: &mut R,
) -> Vec<&'static str> {
    let count = enemy_count(wave);
    (0..count)
        .map(|slot| {
            let draw: f64 = rng.gen();
            slot_kind(wave, slot, count, draw, boss_wave)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Generator whose every f64 draw is (approximately) `draw`.
    fn fixed_draw(draw: f64) -> StepRng {
        let bits = ((draw * (1u64 << 53) as f64) as u64) << 11;
        StepRng::new(bits, 0)
    }

    #[test]
    fn test_enemy_count() {
        assert_eq!(enemy_count(1), 5);
        assert_eq!(enemy_count(5), 13);
        assert_eq!(enemy_count(10), 23);
    }

    #[test]
    fn test_early_waves_are_all_basic() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for wave in 1..FAST_FROM_WAVE {
            let kinds = compose_wave(wave, 10, &mut rng);
            assert_eq!(kinds.len(), enemy_count(wave));
            assert!(kinds.iter().all(|k| *k == enemies::BASIC));
        }
        // Even a zero draw cannot promote an early slot
        let kinds = compose_wave(2, 10, &mut fixed_draw(0.0));
        assert!(kinds.iter().all(|k| *k == enemies::BASIC));
    }

    #[test]
    fn test_tank_check_overrides_fast() {
        // 0.1 satisfies both thresholds
        assert_eq!(slot_kind(5, 0, 13, 0.1, 10), enemies::TANK);
        // Before tanks unlock the same draw is fast
        assert_eq!(slot_kind(4, 0, 11, 0.1, 10), enemies::FAST);
        // Between the thresholds: fast only
        assert_eq!(slot_kind(7, 0, 17, 0.2, 10), enemies::FAST);
        assert_eq!(slot_kind(7, 0, 17, 0.25, 10), enemies::BASIC);
        assert_eq!(slot_kind(7, 0, 17, 0.9, 10), enemies::BASIC);

        let kinds = compose_wave(6, 10, &mut fixed_draw(0.0));
        assert!(kinds.iter().all(|k| *k == enemies::TANK));
        let kinds = compose_wave(6, 10, &mut fixed_draw(0.2));
        assert!(kinds.iter().all(|k| *k == enemies::FAST));
    }

    #[test]
    fn test_boss_forced_on_last_slot() {
        let kinds = compose_wave(10, 10, &mut fixed_draw(0.9));
        assert_eq!(kinds.len(), 23);
        assert_eq!(*kinds.last().unwrap(), enemies::BOSS);
        assert!(kinds[..22].iter().all(|k| *k == enemies::BASIC));

        // Boss wins regardless of the draw
        assert_eq!(slot_kind(10, 22, 23, 0.0, 10), enemies::BOSS);
        // No boss outside the boss wave
        let kinds = compose_wave(9, 10, &mut fixed_draw(0.9));
        assert!(!kinds.contains(&enemies::BOSS));
    }

    #[test]
    fn test_one_draw_per_slot() {
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        let _ = compose_wave(10, 10, &mut a);
        for _ in 0..enemy_count(10) {
            let _: f64 = b.gen();
        }
        // Both generators consumed the same amount
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_seeded_reproducibility() {
        let mut a = ChaCha8Rng::seed_from_u64(1234);
        let mut b = ChaCha8Rng::seed_from_u64(1234);
        for wave in 1..=10 {
            assert_eq!(
                compose_wave(wave, 10, &mut a),
                compose_wave(wave, 10, &mut b)
            );
        }
    }
}
