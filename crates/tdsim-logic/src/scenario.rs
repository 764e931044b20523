//! Scenario: every input a balance run needs, bundled as plain data.
//!
//! A [`Scenario`] is what gets loaded from `data/balance.toml`. It is
//! validated once and turned into an [`Arena`], which owns the checked
//! path and purchase policy and hands out [`GameSetup`]s for any enemy
//! catalog.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{baseline_enemies, default_towers, hard_enemies, EnemyCatalog, TowerCatalog};
use crate::combat::{CombatEngine, CombatRules, WaveOutcome};
use crate::entity::Tower;
use crate::error::{Result, SimError};
use crate::game::{GameParams, GameSetup};
use crate::kinds;
use crate::path::{Path, Point};
use crate::purchase::{default_rules, PurchasePolicy, PurchaseRule};
use crate::report::PresentationHints;
use crate::search::SearchParams;
use crate::wave::compose_wave;

/// Name that always resolves to the scenario's own enemy catalog.
pub const BASELINE_PRESET: &str = "baseline";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub towers: TowerCatalog,
    /// Baseline enemies; the search scales from these.
    pub enemies: EnemyCatalog,
    /// Extra named enemy catalogs, e.g. `hard`.
    #[serde(default)]
    pub presets: BTreeMap<String, EnemyCatalog>,
    pub path: Vec<Point>,
    /// Tower positions, used in order.
    pub coverage: Vec<Point>,
    #[serde(default = "default_rules")]
    pub purchase: Vec<PurchaseRule>,
    #[serde(default)]
    pub rules: CombatRules,
    #[serde(default)]
    pub game: GameParams,
    #[serde(default)]
    pub search: SearchParams,
    #[serde(default)]
    pub presentation: PresentationHints,
}

/// The classic map with stock towers and enemies.
pub fn classic_path() -> Vec<Point> {
    vec![
        Point::new(50.0, 250.0),
        Point::new(150.0, 250.0),
        Point::new(150.0, 150.0),
        Point::new(350.0, 150.0),
        Point::new(350.0, 350.0),
        Point::new(550.0, 350.0),
        Point::new(550.0, 250.0),
        Point::new(650.0, 250.0),
    ]
}

/// Tower slots alongside [`classic_path`].
pub fn classic_coverage() -> Vec<Point> {
    vec![
        Point::new(100.0, 200.0),
        Point::new(200.0, 200.0),
        Point::new(250.0, 100.0),
        Point::new(350.0, 250.0),
        Point::new(450.0, 300.0),
        Point::new(500.0, 400.0),
        Point::new(600.0, 300.0),
        Point::new(550.0, 200.0),
    ]
}

impl Scenario {
    /// In-code copy of `data/balance.toml`.
    pub fn builtin() -> Self {
        Self {
            towers: default_towers(),
            enemies: baseline_enemies(),
            presets: BTreeMap::from([("hard".to_string(), hard_enemies())]),
            path: classic_path(),
            coverage: classic_coverage(),
            purchase: default_rules(),
            rules: CombatRules::default(),
            game: GameParams::default(),
            search: SearchParams::default(),
            presentation: PresentationHints::default(),
        }
    }

    /// Enemy catalog by preset name. `baseline` is the scenario's own.
    pub fn preset(&self, name: &str) -> Result<&EnemyCatalog> {
        if name == BASELINE_PRESET {
            return Ok(&self.enemies);
        }
        self.presets.get(name).ok_or_else(|| {
            SimError::InvalidScenario(format!("no enemy preset named '{name}'"))
        })
    }

    /// Build the arena. Fails on a short path, too few coverage positions
    /// or a purchase rule naming an unknown tower.
    pub fn arena(&self) -> Result<Arena> {
        let path = Path::new(self.path.clone())?;
        let policy = PurchasePolicy::new(
            self.purchase.clone(),
            self.game.tower_cap,
            self.coverage.clone(),
        )?;
        policy.validate(&self.towers)?;
        Ok(Arena {
            path,
            towers: self.towers.clone(),
            policy,
            rules: self.rules.clone(),
            params: self.game.clone(),
        })
    }

    /// Check everything a run could trip over, up front.
    pub fn validate(&self) -> Result<()> {
        let arena = self.arena()?;
        arena.check_enemies(&self.enemies)?;
        for catalog in self.presets.values() {
            arena.check_enemies(catalog)?;
        }
        if self.rules.spawn_interval == 0 {
            return Err(SimError::InvalidScenario(
                "spawn_interval must be at least 1".into(),
            ));
        }
        if self.search.multipliers.is_empty() {
            return Err(SimError::NoCandidates);
        }
        if let Some(m) = self
            .search
            .multipliers
            .iter()
            .find(|m| !m.is_finite() || **m < 0.0)
        {
            return Err(SimError::InvalidScenario(format!(
                "HP multiplier {m} must be a non-negative number"
            )));
        }
        for &m in &self.search.multipliers {
            if let Err(SimError::ZeroHpEnemy(kind)) =
                arena.check_enemies(&self.enemies.scaled_hp(m))
            {
                return Err(SimError::InvalidScenario(format!(
                    "HP multiplier {m} leaves '{kind}' with 0 hp"
                )));
            }
        }
        if self.search.target.lives_scale <= 0.0 {
            return Err(SimError::InvalidScenario(
                "fitness lives_scale must be positive".into(),
            ));
        }
        debug!(
            towers = self.towers.len(),
            presets = self.presets.len(),
            waypoints = self.path.len(),
            "scenario valid"
        );
        Ok(())
    }
}

/// Validated, owned game inputs minus the enemy catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Arena {
    path: Path,
    towers: TowerCatalog,
    policy: PurchasePolicy,
    rules: CombatRules,
    params: GameParams,
}

/// One wave played against hand-placed towers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub wave: u32,
    pub enemies: Vec<String>,
    pub outcome: WaveOutcome,
    /// Primary kills per tower, in placement order.
    pub tower_kills: Vec<u32>,
}

impl Arena {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn towers(&self) -> &TowerCatalog {
        &self.towers
    }

    pub fn policy(&self) -> &PurchasePolicy {
        &self.policy
    }

    pub fn rules(&self) -> &CombatRules {
        &self.rules
    }

    pub fn params(&self) -> &GameParams {
        &self.params
    }

    pub fn engine<'a>(&'a self, enemies: &'a EnemyCatalog) -> CombatEngine<'a> {
        CombatEngine::new(&self.path, &self.towers, enemies, &self.rules)
    }

    pub fn setup<'a>(&'a self, enemies: &'a EnemyCatalog) -> GameSetup<'a> {
        GameSetup {
            engine: self.engine(enemies),
            policy: &self.policy,
            params: &self.params,
        }
    }

    /// Every kind the wave generator can emit must be in `enemies`, and
    /// every entry must spawn alive.
    pub fn check_enemies(&self, enemies: &EnemyCatalog) -> Result<()> {
        for kind in kinds::enemies::ALL {
            enemies.get(kind)?;
        }
        match enemies.iter().find(|(_, spec)| spec.hp == 0) {
            Some((kind, _)) => Err(SimError::ZeroHpEnemy(kind.to_string())),
            None => Ok(()),
        }
    }

    /// Place `tower_kinds` on the first coverage positions and fight a
    /// single generated wave with fresh towers.
    pub fn probe<R: Rng + ?Sized>(
        &self,
        enemies: &EnemyCatalog,
        tower_kinds: &[&str],
        wave: u32,
        rng: &mut R,
    ) -> Result<ProbeReport> {
        let coverage = self.policy.coverage();
        if tower_kinds.len() > coverage.len() {
            return Err(SimError::InsufficientCoverage {
                cap: tower_kinds.len(),
                positions: coverage.len(),
            });
        }
        self.check_enemies(enemies)?;
        let mut towers = Vec::with_capacity(tower_kinds.len());
        for (kind, &position) in tower_kinds.iter().zip(coverage) {
            self.towers.get(kind)?;
            towers.push(Tower::new(*kind, position));
        }

        let kinds = compose_wave(wave, self.params.boss_wave, rng);
        let outcome = self.engine(enemies).run_wave(&kinds, &mut towers)?;
        Ok(ProbeReport {
            wave,
            enemies: kinds.iter().map(|k| k.to_string()).collect(),
            outcome,
            tower_kills: towers.iter().map(|t| t.kills).collect(),
        })
    }
}
