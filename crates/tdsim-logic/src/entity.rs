//! Runtime tower and enemy state.

use crate::catalog::{EnemySpec, TowerSpec};
use crate::path::Point;

/// Kill counts at which a tower reaches level 0, 1, 2, 3.
pub const LEVEL_THRESHOLDS: [u32; 4] = [0, 5, 15, 30];

/// Damage multiplier per level.
pub const LEVEL_DAMAGE_MULTIPLIERS: [f64; 4] = [1.0, 1.2, 1.5, 2.0];

/// Highest threshold the kill count has reached.
pub fn level_for_kills(kills: u32) -> u8 {
    LEVEL_THRESHOLDS
        .iter()
        .rposition(|&t| kills >= t)
        .unwrap_or(0) as u8
}

/// A placed tower. Created during a buy phase and kept for the rest of the
/// game; combat mutates it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Tower {
    pub kind: String,
    pub position: Point,
    /// Frames until the tower may fire again.
    pub cooldown: u32,
    pub kills: u32,
    level: u8,
}

impl Tower {
    pub fn new(kind: impl Into<String>, position: Point) -> Self {
        Self {
            kind: kind.into(),
            position,
            cooldown: 0,
            kills: 0,
            level: 0,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Base damage scaled by the current level.
    pub fn damage(&self, spec: &TowerSpec) -> f64 {
        spec.damage * LEVEL_DAMAGE_MULTIPLIERS[self.level as usize]
    }

    /// Count a kill and recompute the level.
    pub fn credit_kill(&mut self) {
        self.kills += 1;
        self.level = level_for_kills(self.kills);
    }
}

/// An enemy walking the path during one wave.
#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub kind: String,
    /// Remaining HP, floored at 0.
    pub hp: f64,
    pub max_hp: f64,
    pub position: Point,
    /// Last waypoint reached. Never decreases.
    pub path_index: usize,
    /// Frames of slow debuff remaining.
    pub slow_timer: u32,
    pub speed: f64,
    pub reward: u32,
}

impl Enemy {
    pub fn spawn(kind: impl Into<String>, spec: &EnemySpec, position: Point) -> Self {
        let hp = spec.hp as f64;
        Self {
            kind: kind.into(),
            hp,
            max_hp: hp,
            position,
            path_index: 0,
            slow_timer: 0,
            speed: spec.speed,
            reward: spec.reward,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Subtract damage, flooring HP at zero.
    pub fn take_damage(&mut self, amount: f64) {
        self.hp = (self.hp - amount).max(0.0);
    }

    /// Remove from live accounting without it counting as a kill.
    pub fn retire(&mut self) {
        self.hp = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SpecialEffect;

    fn basic_spec() -> TowerSpec {
        TowerSpec {
            name: "Basic".into(),
            cost: 50,
            damage: 10.0,
            fire_rate: 60,
            range: 100.0,
            special: SpecialEffect::None,
        }
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for_kills(0), 0);
        assert_eq!(level_for_kills(4), 0);
        assert_eq!(level_for_kills(5), 1);
        assert_eq!(level_for_kills(14), 1);
        assert_eq!(level_for_kills(15), 2);
        assert_eq!(level_for_kills(29), 2);
        assert_eq!(level_for_kills(30), 3);
        assert_eq!(level_for_kills(500), 3);
    }

    #[test]
    fn test_damage_scales_with_level() {
        let spec = basic_spec();
        let mut tower = Tower::new("basic", Point::new(0.0, 0.0));
        assert!((tower.damage(&spec) - 10.0).abs() < 1e-9);

        for _ in 0..5 {
            tower.credit_kill();
        }
        assert_eq!(tower.level(), 1);
        assert!((tower.damage(&spec) - 12.0).abs() < 1e-9);

        for _ in 5..15 {
            tower.credit_kill();
        }
        assert_eq!(tower.level(), 2);
        assert!((tower.damage(&spec) - 15.0).abs() < 1e-9);

        for _ in 15..30 {
            tower.credit_kill();
        }
        assert_eq!(tower.level(), 3);
        assert!((tower.damage(&spec) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_enemy_hp_floor() {
        let spec = EnemySpec {
            name: "Bug".into(),
            hp: 30,
            speed: 1.0,
            reward: 10,
        };
        let mut enemy = Enemy::spawn("basic", &spec, Point::new(0.0, 0.0));
        assert!(enemy.is_alive());
        enemy.take_damage(25.0);
        assert!((enemy.hp - 5.0).abs() < 1e-9);
        enemy.take_damage(40.0);
        assert_eq!(enemy.hp, 0.0);
        assert!(!enemy.is_alive());
        assert_eq!(enemy.max_hp, 30.0);
    }
}
