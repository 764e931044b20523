//! HP-multiplier grid search.
//!
//! For each candidate multiplier the baseline enemy catalog is scaled, a
//! batch is played and the result scored against a target win rate and
//! survival margin:
//!
//! ```text
//! fitness = 1 − 2·|win_rate − target_win_rate| − |avg_lives − target_lives| / lives_scale
//! ```
//!
//! The highest fitness wins; ties keep the earlier candidate. Every
//! candidate plays with the same base seed, so they differ only by the
//! catalog.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::{run_batch, BatchStats};
use crate::catalog::EnemyCatalog;
use crate::error::{Result, SimError};
use crate::scenario::Arena;

/// What a balanced catalog should produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessTarget {
    pub win_rate: f64,
    pub lives: f64,
    /// Lives deviation that costs as much as one full fitness point.
    pub lives_scale: f64,
}

impl Default for FitnessTarget {
    fn default() -> Self {
        Self {
            win_rate: 0.78,
            lives: 3.0,
            lives_scale: 20.0,
        }
    }
}

impl FitnessTarget {
    pub fn score(&self, stats: &BatchStats) -> f64 {
        1.0 - 2.0 * (stats.win_rate - self.win_rate).abs()
            - (stats.avg_lives - self.lives).abs() / self.lives_scale
    }
}

/// Range a candidate must land in to count as ideal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdealBand {
    pub min_win_rate: f64,
    pub max_win_rate: f64,
    pub min_lives: f64,
    pub max_lives: f64,
}

impl Default for IdealBand {
    fn default() -> Self {
        Self {
            min_win_rate: 0.70,
            max_win_rate: 0.85,
            min_lives: 2.0,
            max_lives: 4.0,
        }
    }
}

impl IdealBand {
    pub fn contains(&self, stats: &BatchStats) -> bool {
        (self.min_win_rate..=self.max_win_rate).contains(&stats.win_rate)
            && (self.min_lives..=self.max_lives).contains(&stats.avg_lives)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Games per candidate.
    pub runs: u32,
    pub seed: u64,
    pub multipliers: Vec<f64>,
    pub target: FitnessTarget,
    pub ideal: IdealBand,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            runs: 100,
            seed: 42,
            multipliers: vec![
                1.0, 1.1, 1.2, 1.3, 1.4, 1.5, 1.6, 1.7, 1.8, 1.9, 2.0, 2.2, 2.5,
            ],
            target: FitnessTarget::default(),
            ideal: IdealBand::default(),
        }
    }
}

/// One scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub multiplier: f64,
    pub stats: BatchStats,
    pub fitness: f64,
    pub ideal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub best: CandidateScore,
    /// Baseline scaled by the winning multiplier.
    pub catalog: EnemyCatalog,
    /// Every candidate, in input order.
    pub candidates: Vec<CandidateScore>,
}

/// Index of the highest fitness; the first one on ties.
pub fn pick_best(candidates: &[CandidateScore]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, c) in candidates.iter().enumerate() {
        if best.map_or(true, |b| c.fitness > candidates[b].fitness) {
            best = Some(i);
        }
    }
    best
}

/// Score a single multiplier.
pub fn evaluate(
    arena: &Arena,
    baseline: &EnemyCatalog,
    multiplier: f64,
    params: &SearchParams,
) -> Result<CandidateScore> {
    let scaled = baseline.scaled_hp(multiplier);
    let stats = run_batch(arena, &scaled, params.runs, params.seed)?;
    let fitness = params.target.score(&stats);
    let ideal = params.ideal.contains(&stats);
    debug!(
        multiplier,
        win_rate = stats.win_rate,
        avg_lives = stats.avg_lives,
        fitness,
        ideal,
        "candidate scored"
    );
    Ok(CandidateScore {
        multiplier,
        stats,
        fitness,
        ideal,
    })
}

/// Scan every candidate multiplier and keep the fittest.
pub fn search(arena: &Arena, baseline: &EnemyCatalog, params: &SearchParams) -> Result<SearchOutcome> {
    if params.multipliers.is_empty() {
        return Err(SimError::NoCandidates);
    }
    let candidates = params
        .multipliers
        .par_iter()
        .map(|&m| evaluate(arena, baseline, m, params))
        .collect::<Result<Vec<_>>>()?;
    let best_index = pick_best(&candidates).ok_or(SimError::NoCandidates)?;
    let best = candidates[best_index].clone();
    info!(
        multiplier = best.multiplier,
        fitness = best.fitness,
        win_rate = best.stats.win_rate,
        avg_lives = best.stats.avg_lives,
        "balance search finished"
    );
    Ok(SearchOutcome {
        catalog: baseline.scaled_hp(best.multiplier),
        best,
        candidates,
    })
}
