//! Frame-stepped wave resolution.
//!
//! Each frame runs four phases in order:
//!
//! 1. **Spawn**: every `spawn_interval` frames the next scheduled enemy
//!    appears at the path start.
//! 2. **Move**: live enemies advance along the path (halved while slowed).
//!    Reaching the end is an escape: the enemy leaves live accounting with
//!    no kill credited.
//! 3. **Attack**: towers on cooldown tick it down instead of firing. A
//!    ready tower hits the nearest live enemy in range (first in spawn
//!    order on ties), then applies its special effect. Only the primary
//!    target's death credits a kill, levels the tower and banks the reward.
//! 4. **Resolve**: the wave ends once everything has spawned and nothing
//!    is alive.
//!
//! A hard frame ceiling bounds every wave. A wave still running at the
//! ceiling is a divergence: leftovers are dropped uncounted and the outcome
//! is flagged.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{EnemyCatalog, EnemySpec, SpecialEffect, TowerCatalog, TowerSpec};
use crate::entity::{Enemy, Tower};
use crate::error::{Result, SimError};
use crate::path::{Path, Point};

/// Tunable constants of the frame loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    /// Frames between consecutive spawns.
    pub spawn_interval: u32,
    /// Hard ceiling on frames per wave (3 minutes at 60 fps).
    pub frame_limit: u32,
    /// Speed multiplier while slowed.
    pub slow_factor: f64,
    /// Frames a slow hit lasts.
    pub slow_frames: u32,
    pub splash_radius: f64,
    /// Fraction of the primary hit dealt to splash victims.
    pub splash_factor: f64,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            spawn_interval: 40,
            frame_limit: 60 * 180,
            slow_factor: 0.5,
            slow_frames: 120,
            splash_radius: 40.0,
            splash_factor: 0.5,
        }
    }
}

/// What happened during one wave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveOutcome {
    pub escaped: u32,
    /// Kills credited to a tower's primary hit.
    pub kills: u32,
    /// Enemies finished off by splash alone (no reward, no credit).
    pub splash_deaths: u32,
    pub gold_earned: u32,
    pub frames: u32,
    /// Wave hit the frame ceiling before resolving.
    pub diverged: bool,
    /// Enemies dropped at the ceiling, spawned or not.
    pub abandoned: u32,
}

/// Index of the nearest live enemy within `range` of `from`.
///
/// Ties keep the earliest enemy in slice order, which is spawn order.
pub fn select_target(from: Point, range: f64, enemies: &[Enemy]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, enemy) in enemies.iter().enumerate() {
        if !enemy.is_alive() {
            continue;
        }
        let dist = from.distance(&enemy.position);
        if dist <= range && best.map_or(true, |(_, d)| dist < d) {
            best = Some((i, dist));
        }
    }
    best.map(|(i, _)| i)
}

/// Read-only context every wave of a game shares.
#[derive(Debug, Clone, Copy)]
pub struct CombatEngine<'a> {
    pub path: &'a Path,
    pub towers: &'a TowerCatalog,
    pub enemies: &'a EnemyCatalog,
    pub rules: &'a CombatRules,
}

impl<'a> CombatEngine<'a> {
    pub fn new(
        path: &'a Path,
        towers: &'a TowerCatalog,
        enemies: &'a EnemyCatalog,
        rules: &'a CombatRules,
    ) -> Self {
        Self {
            path,
            towers,
            enemies,
            rules,
        }
    }

    /// Resolve a whole wave. `kinds` is the spawn schedule; towers keep
    /// their cooldowns, kills and levels afterwards.
    pub fn run_wave(&self, kinds: &[&str], towers: &mut [Tower]) -> Result<WaveOutcome> {
        let mut wave = WaveState::new(self, kinds, towers)?;
        while !wave.is_resolved() && wave.frame() < self.rules.frame_limit {
            wave.step(towers);
        }
        Ok(wave.finish())
    }
}

/// In-progress wave. Exposed so callers can step frame by frame.
#[derive(Debug)]
pub struct WaveState<'a> {
    engine: CombatEngine<'a>,
    schedule: Vec<(&'a str, &'a EnemySpec)>,
    tower_specs: Vec<&'a TowerSpec>,
    enemies: Vec<Enemy>,
    spawn_timer: u32,
    frame: u32,
    outcome: WaveOutcome,
}

impl<'a> WaveState<'a> {
    /// Resolve every catalog entry the wave needs up front, so a missing
    /// type fails before any frame runs.
    pub fn new(engine: &CombatEngine<'a>, kinds: &[&str], towers: &[Tower]) -> Result<Self> {
        let schedule = kinds
            .iter()
            .map(|kind| engine.enemies.entry(kind))
            .collect::<Result<Vec<_>>>()?;
        if let Some((kind, _)) = schedule.iter().find(|(_, spec)| spec.hp == 0) {
            return Err(SimError::ZeroHpEnemy(kind.to_string()));
        }
        let tower_specs = towers
            .iter()
            .map(|t| engine.towers.get(&t.kind))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            engine: *engine,
            schedule,
            tower_specs,
            enemies: Vec::with_capacity(kinds.len()),
            spawn_timer: 0,
            frame: 0,
            outcome: WaveOutcome::default(),
        })
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Spawned enemies in spawn order, dead ones included.
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn outcome(&self) -> &WaveOutcome {
        &self.outcome
    }

    pub fn all_spawned(&self) -> bool {
        self.enemies.len() >= self.schedule.len()
    }

    pub fn is_resolved(&self) -> bool {
        self.all_spawned() && self.enemies.iter().all(|e| !e.is_alive())
    }

    /// Run one frame. `towers` must be the slice the wave was built with.
    pub fn step(&mut self, towers: &mut [Tower]) {
        debug_assert_eq!(
            towers.len(),
            self.tower_specs.len(),
            "tower slice differs from the one the wave was built with"
        );
        self.spawn();
        self.move_enemies();
        self.attack(towers);
        self.frame += 1;
    }

    fn spawn(&mut self) {
        if self.all_spawned() {
            return;
        }
        self.spawn_timer += 1;
        if self.spawn_timer >= self.engine.rules.spawn_interval {
            let (kind, spec) = self.schedule[self.enemies.len()];
            self.enemies
                .push(Enemy::spawn(kind, spec, self.engine.path.start()));
            self.spawn_timer = 0;
        }
    }

    fn move_enemies(&mut self) {
        let path = self.engine.path;
        let rules = self.engine.rules;
        for enemy in self.enemies.iter_mut().filter(|e| e.is_alive()) {
            let mut speed = enemy.speed;
            if enemy.slow_timer > 0 {
                speed *= rules.slow_factor;
                enemy.slow_timer -= 1;
            }
            let step = path.advance(enemy.position, enemy.path_index, speed);
            enemy.position = step.position;
            enemy.path_index = step.path_index;
            if step.reached_end {
                enemy.retire();
                self.outcome.escaped += 1;
            }
        }
    }

    fn attack(&mut self, towers: &mut [Tower]) {
        let rules = self.engine.rules;
        for (tower, spec) in towers.iter_mut().zip(&self.tower_specs) {
            if tower.cooldown > 0 {
                tower.cooldown -= 1;
                continue;
            }
            let Some(target) = select_target(tower.position, spec.range, &self.enemies) else {
                continue;
            };

            tower.cooldown = spec.fire_rate;
            let damage = tower.damage(spec);
            self.enemies[target].take_damage(damage);

            match spec.special {
                SpecialEffect::None => {}
                SpecialEffect::Slow => {
                    let enemy = &mut self.enemies[target];
                    enemy.slow_timer = enemy.slow_timer.max(rules.slow_frames);
                }
                SpecialEffect::Splash => {
                    let center = self.enemies[target].position;
                    let splash = damage * rules.splash_factor;
                    for (i, enemy) in self.enemies.iter_mut().enumerate() {
                        if i == target || !enemy.is_alive() {
                            continue;
                        }
                        if enemy.position.distance(&center) <= rules.splash_radius {
                            enemy.take_damage(splash);
                            if !enemy.is_alive() {
                                self.outcome.splash_deaths += 1;
                            }
                        }
                    }
                }
            }

            let target = &self.enemies[target];
            if !target.is_alive() {
                tower.credit_kill();
                self.outcome.kills += 1;
                self.outcome.gold_earned += target.reward;
            }
        }
    }

    /// Close the wave. Anything still pending is dropped and, if the wave
    /// had not resolved, the outcome is marked diverged.
    pub fn finish(mut self) -> WaveOutcome {
        self.outcome.frames = self.frame;
        if !self.is_resolved() {
            let alive = self.enemies.iter().filter(|e| e.is_alive()).count();
            let unspawned = self.schedule.len() - self.enemies.len();
            self.outcome.diverged = true;
            self.outcome.abandoned = (alive + unspawned) as u32;
            for enemy in &mut self.enemies {
                enemy.retire();
            }
            warn!(
                frames = self.frame,
                abandoned = self.outcome.abandoned,
                "wave did not resolve within the frame ceiling"
            );
        }
        debug!(
            escaped = self.outcome.escaped,
            kills = self.outcome.kills,
            splash_deaths = self.outcome.splash_deaths,
            gold = self.outcome.gold_earned,
            frames = self.outcome.frames,
            "wave resolved"
        );
        self.outcome
    }
}
