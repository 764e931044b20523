//! Pure combat simulation and balance search for tdsim.
//!
//! This crate contains the whole tower-defense engine that sits behind the
//! balance tool: towers and enemies fighting along a fixed path, full games
//! played wave by wave, batches of independent games, and a grid search over
//! enemy HP multipliers. Functions take plain data and an explicit random
//! generator and return results, so every run is reproducible from a seed.
//! Nothing in here touches files, the network or the console.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`batch`] | Many independent games reduced to win rate / survival stats |
//! | [`catalog`] | Immutable tower and enemy parameter tables |
//! | [`combat`] | Frame-stepped wave resolution (spawn, move, attack, effects) |
//! | [`entity`] | Runtime tower and enemy state, tower leveling |
//! | [`error`] | Configuration errors raised by the engine |
//! | [`game`] | Single-game state machine: buy, fight, end |
//! | [`kinds`] | Well-known tower and enemy type keys |
//! | [`path`] | Waypoint polyline, length and step movement |
//! | [`purchase`] | Rule-table tower buying policy |
//! | [`report`] | Presentation table handed to the live game's config |
//! | [`scenario`] | Bundled inputs: catalogs, path, rules, run parameters |
//! | [`search`] | HP-multiplier grid search scored by fitness |
//! | [`wave`] | Seeded wave composition |

pub mod batch;
pub mod catalog;
pub mod combat;
pub mod entity;
pub mod error;
pub mod game;
pub mod kinds;
pub mod path;
pub mod purchase;
pub mod report;
pub mod scenario;
pub mod search;
pub mod wave;

pub use error::{Result, SimError};
