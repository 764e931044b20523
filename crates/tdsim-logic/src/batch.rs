//! Batches of independent games.
//!
//! Run `i` of a batch draws from its own generator seeded with
//! `seed + i`, so games can run on any thread in any order. Results are
//! folded into integer totals whose merge is commutative and associative;
//! the parallel reduction therefore matches a sequential one exactly.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::EnemyCatalog;
use crate::error::Result;
use crate::game::{run_game, GameRecord};
use crate::scenario::Arena;

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Wins / runs, in `[0, 1]`.
    pub win_rate: f64,
    pub avg_waves: f64,
    /// Mean lives left over winning runs only; 0 with no wins.
    pub avg_lives: f64,
    pub runs: u32,
    pub wins: u32,
    /// Runs with at least one wave cut off by the frame ceiling.
    pub diverged_runs: u32,
}

/// Order-independent running sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTotals {
    pub runs: u32,
    pub wins: u32,
    pub waves: u64,
    pub won_lives: u64,
    pub diverged_runs: u32,
}

impl BatchTotals {
    pub fn from_record(record: &GameRecord) -> Self {
        Self {
            runs: 1,
            wins: record.won as u32,
            waves: record.waves as u64,
            won_lives: if record.won { record.lives as u64 } else { 0 },
            diverged_runs: (record.diverged_waves > 0) as u32,
        }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            runs: self.runs + other.runs,
            wins: self.wins + other.wins,
            waves: self.waves + other.waves,
            won_lives: self.won_lives + other.won_lives,
            diverged_runs: self.diverged_runs + other.diverged_runs,
        }
    }

    pub fn stats(&self) -> BatchStats {
        let ratio = |num: f64, den: u32| if den == 0 { 0.0 } else { num / den as f64 };
        BatchStats {
            win_rate: ratio(self.wins as f64, self.runs),
            avg_waves: ratio(self.waves as f64, self.runs),
            avg_lives: ratio(self.won_lives as f64, self.wins),
            runs: self.runs,
            wins: self.wins,
            diverged_runs: self.diverged_runs,
        }
    }
}

/// Reduce finished games to batch statistics.
pub fn aggregate(records: &[GameRecord]) -> BatchStats {
    records
        .iter()
        .map(BatchTotals::from_record)
        .fold(BatchTotals::default(), BatchTotals::merge)
        .stats()
}

/// Generator for run `index` of a batch seeded with `seed`.
pub fn run_rng(seed: u64, index: u32) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed.wrapping_add(index as u64))
}

/// Play `runs` games and keep every record, in run order.
pub fn run_records(
    arena: &Arena,
    enemies: &EnemyCatalog,
    runs: u32,
    seed: u64,
) -> Result<Vec<GameRecord>> {
    arena.check_enemies(enemies)?;
    let setup = arena.setup(enemies);
    (0..runs)
        .into_par_iter()
        .map(|i| run_game(setup, &mut run_rng(seed, i)))
        .collect()
}

/// Play `runs` games in parallel and reduce them to statistics.
pub fn run_batch(
    arena: &Arena,
    enemies: &EnemyCatalog,
    runs: u32,
    seed: u64,
) -> Result<BatchStats> {
    arena.check_enemies(enemies)?;
    let setup = arena.setup(enemies);
    let totals = (0..runs)
        .into_par_iter()
        .map(|i| run_game(setup, &mut run_rng(seed, i)).map(|r| BatchTotals::from_record(&r)))
        .try_reduce(BatchTotals::default, |a, b| Ok(a.merge(b)))?;
    let stats = totals.stats();
    debug!(
        runs,
        seed,
        win_rate = stats.win_rate,
        avg_waves = stats.avg_waves,
        avg_lives = stats.avg_lives,
        "batch complete"
    );
    Ok(stats)
}
