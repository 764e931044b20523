//! Enemy path: an ordered waypoint polyline.
//!
//! Enemies walk from the first waypoint to the last, one fixed step per
//! frame. A step never carries leftover distance past a waypoint: when the
//! remaining distance to the next waypoint is shorter than the step, the
//! enemy snaps onto it and the traversal index advances. Landing exactly on
//! a waypoint leaves the index for the next step. The index only grows.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// A 2D point in map units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Result of a single movement step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub position: Point,
    /// Index of the last waypoint reached.
    pub path_index: usize,
    /// True once the final waypoint has been reached.
    pub reached_end: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    waypoints: Vec<Point>,
    length: f64,
}

impl Path {
    /// Build a path, rejecting anything shorter than two waypoints.
    pub fn new(waypoints: Vec<Point>) -> Result<Self> {
        if waypoints.len() < 2 {
            return Err(SimError::InvalidPath(waypoints.len()));
        }
        let length = waypoints.windows(2).map(|w| w[0].distance(&w[1])).sum();
        Ok(Self { waypoints, length })
    }

    /// Sum of consecutive segment lengths.
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn start(&self) -> Point {
        self.waypoints[0]
    }

    /// Index of the final waypoint.
    pub fn last_index(&self) -> usize {
        self.waypoints.len() - 1
    }

    /// Move `distance` units from `position` toward the waypoint after
    /// `path_index`.
    ///
    /// If the remaining distance to that waypoint is less than the step, the
    /// mover snaps onto it and the index increments; otherwise it moves
    /// linearly toward it. A step that lands exactly on the waypoint leaves
    /// the index alone, so it advances on the following step. A mover already
    /// at the end stays put.
    pub fn advance(&self, position: Point, path_index: usize, distance: f64) -> Step {
        let last = self.last_index();
        if path_index >= last {
            return Step {
                position,
                path_index,
                reached_end: true,
            };
        }

        let target = self.waypoints[path_index + 1];
        let remaining = position.distance(&target);

        let (position, path_index) = if remaining < distance {
            (target, path_index + 1)
        } else if remaining == distance {
            (target, path_index)
        } else {
            (
                Point::new(
                    position.x + (target.x - position.x) / remaining * distance,
                    position.y + (target.y - position.y) / remaining * distance,
                ),
                path_index,
            )
        };

        Step {
            position,
            path_index,
            reached_end: path_index >= last,
        }
    }
}
