//! Engine errors.
//!
//! Every error here is a configuration problem detected before or during a
//! run. The engine never substitutes a default for a missing entry: a silent
//! fallback would skew balance statistics without any visible symptom.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A purchase rule or placed tower names a type missing from the tower catalog.
    #[error("tower type '{0}' is not in the tower catalog")]
    UnknownTowerType(String),

    /// A wave slot names a type missing from the enemy catalog.
    #[error("enemy type '{0}' is not in the enemy catalog")]
    UnknownEnemyType(String),

    /// An enemy type with 0 hp would spawn dead and never be counted.
    #[error("enemy type '{0}' has 0 hp")]
    ZeroHpEnemy(String),

    /// Balance search was given an empty candidate list.
    #[error("balance search needs at least one HP multiplier candidate")]
    NoCandidates,

    /// Fewer coverage positions than the tower cap allows towers.
    #[error("tower cap is {cap} but only {positions} coverage positions are defined")]
    InsufficientCoverage { cap: usize, positions: usize },

    /// A path needs at least a start and an end waypoint.
    #[error("path needs at least 2 waypoints, got {0}")]
    InvalidPath(usize),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}
