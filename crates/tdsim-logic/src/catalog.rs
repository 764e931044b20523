//! Static per-type parameter tables for towers and enemies.
//!
//! Catalogs are read-only during a run. The balance search derives new
//! enemy catalogs with [`EnemyCatalog::scaled_hp`], which returns a fresh
//! value and leaves the baseline untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::kinds;

/// Secondary effect applied after a tower's primary hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialEffect {
    #[default]
    None,
    /// Halves the target's speed for a while.
    Slow,
    /// Damages other enemies around the target.
    Splash,
}

/// Parameters for one tower type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerSpec {
    pub name: String,
    pub cost: u32,
    pub damage: f64,
    /// Frames between shots.
    pub fire_rate: u32,
    pub range: f64,
    #[serde(default)]
    pub special: SpecialEffect,
}

/// Parameters for one enemy type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemySpec {
    pub name: String,
    pub hp: u32,
    /// Path units per frame.
    pub speed: f64,
    /// Gold banked when the enemy is killed.
    pub reward: u32,
}

/// Tower type key → spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TowerCatalog {
    entries: BTreeMap<String, TowerSpec>,
}

impl TowerCatalog {
    pub fn new(entries: BTreeMap<String, TowerSpec>) -> Self {
        Self { entries }
    }

    pub fn get(&self, kind: &str) -> Result<&TowerSpec> {
        self.entries
            .get(kind)
            .ok_or_else(|| SimError::UnknownTowerType(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TowerSpec)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Enemy type key → spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyCatalog {
    entries: BTreeMap<String, EnemySpec>,
}

impl EnemyCatalog {
    pub fn new(entries: BTreeMap<String, EnemySpec>) -> Self {
        Self { entries }
    }

    pub fn get(&self, kind: &str) -> Result<&EnemySpec> {
        self.entries
            .get(kind)
            .ok_or_else(|| SimError::UnknownEnemyType(kind.to_string()))
    }

    /// Like [`get`](Self::get), also returning the catalog's own copy of the key.
    pub fn entry(&self, kind: &str) -> Result<(&str, &EnemySpec)> {
        self.entries
            .get_key_value(kind)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| SimError::UnknownEnemyType(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnemySpec)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// New catalog with every enemy's HP multiplied and truncated to a whole
    /// number. Speed and reward are carried over unchanged.
    pub fn scaled_hp(&self, multiplier: f64) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(kind, spec)| {
                let hp = (spec.hp as f64 * multiplier).floor().max(0.0) as u32;
                (kind.clone(), EnemySpec { hp, ..spec.clone() })
            })
            .collect();
        Self { entries }
    }
}

fn tower(
    name: &str,
    cost: u32,
    damage: f64,
    fire_rate: u32,
    range: f64,
    special: SpecialEffect,
) -> TowerSpec {
    TowerSpec {
        name: name.to_string(),
        cost,
        damage,
        fire_rate,
        range,
        special,
    }
}

fn enemy(name: &str, hp: u32, speed: f64, reward: u32) -> EnemySpec {
    EnemySpec {
        name: name.to_string(),
        hp,
        speed,
        reward,
    }
}

/// The four stock towers of the classic map.
pub fn default_towers() -> TowerCatalog {
    use kinds::towers::*;
    TowerCatalog::new(BTreeMap::from([
        (
            BASIC.to_string(),
            tower("Basic", 50, 10.0, 60, 100.0, SpecialEffect::None),
        ),
        (
            SLOW.to_string(),
            tower("Slow", 75, 5.0, 90, 80.0, SpecialEffect::Slow),
        ),
        (
            SPLASH.to_string(),
            tower("Splash", 100, 8.0, 80, 90.0, SpecialEffect::Splash),
        ),
        (
            SNIPER.to_string(),
            tower("Sniper", 150, 40.0, 150, 180.0, SpecialEffect::None),
        ),
    ]))
}

/// Baseline enemy stats the search scales from.
pub fn baseline_enemies() -> EnemyCatalog {
    use kinds::enemies::*;
    EnemyCatalog::new(BTreeMap::from([
        (BASIC.to_string(), enemy("Bug", 30, 1.0, 10)),
        (FAST.to_string(), enemy("Fast", 20, 2.0, 15)),
        (TANK.to_string(), enemy("Tank", 100, 0.5, 30)),
        (BOSS.to_string(), enemy("Boss", 300, 0.3, 100)),
    ]))
}

/// Hand-tuned hard preset, kept for difficulty comparisons.
pub fn hard_enemies() -> EnemyCatalog {
    use kinds::enemies::*;
    EnemyCatalog::new(BTreeMap::from([
        (BASIC.to_string(), enemy("Bug", 80, 1.2, 8)),
        (FAST.to_string(), enemy("Fast", 50, 2.5, 12)),
        (TANK.to_string(), enemy("Tank", 250, 0.6, 25)),
        (BOSS.to_string(), enemy("Boss", 800, 0.4, 80)),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_entries_are_errors() {
        let towers = default_towers();
        let enemies = baseline_enemies();
        assert_eq!(
            towers.get("laser"),
            Err(SimError::UnknownTowerType("laser".into()))
        );
        assert_eq!(
            enemies.get("dragon"),
            Err(SimError::UnknownEnemyType("dragon".into()))
        );
        assert!(towers.get(kinds::towers::SNIPER).is_ok());
    }

    #[test]
    fn test_scaled_hp_truncates_and_keeps_baseline() {
        let base = baseline_enemies();
        let scaled = base.scaled_hp(1.3);

        assert_eq!(scaled.get("basic").unwrap().hp, 39);
        assert_eq!(scaled.get("tank").unwrap().hp, 130);
        assert_eq!(scaled.get("boss").unwrap().hp, 390);
        // 20 * 1.27 = 25.4 -> 25
        assert_eq!(base.scaled_hp(1.27).get("fast").unwrap().hp, 25);

        // Baseline unchanged, other fields carried over
        assert_eq!(base.get("basic").unwrap().hp, 30);
        assert_eq!(scaled.get("fast").unwrap().speed, 2.0);
        assert_eq!(scaled.get("boss").unwrap().reward, 100);
        assert_eq!(scaled.get("tank").unwrap().name, "Tank");
    }

    #[test]
    fn test_scaled_hp_identity() {
        let base = baseline_enemies();
        assert_eq!(base.scaled_hp(1.0), base);
    }

    #[test]
    fn test_special_effect_serde_names() {
        let json = serde_json::to_string(&SpecialEffect::Splash).unwrap();
        assert_eq!(json, "\"splash\"");
        let parsed: SpecialEffect = serde_json::from_str("\"slow\"").unwrap();
        assert_eq!(parsed, SpecialEffect::Slow);
    }

    #[test]
    fn test_stock_catalogs_cover_all_kinds() {
        let base = baseline_enemies();
        let hard = hard_enemies();
        for kind in kinds::enemies::ALL {
            assert!(base.contains(kind), "baseline missing {}", kind);
            assert!(hard.contains(kind), "hard missing {}", kind);
        }
        assert_eq!(default_towers().len(), 4);
    }
}
