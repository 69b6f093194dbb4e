use serde::{Deserialize, Serialize};

pub mod config;
pub mod director;
pub mod entity;
pub mod error;
pub mod generator;
pub mod map;
pub mod pathfinding;
pub mod simulation;
pub mod world;

pub use config::SimConfig;
pub use error::SimError;
pub use simulation::SimEvent;
pub use world::World;

/// A discrete grid coordinate. `x` grows to the east, `z` to the south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub z: usize,
}

impl Cell {
    pub const fn new(x: usize, z: usize) -> Self {
        Cell { x, z }
    }

    /// Continuous coordinates of the centre of this cell.
    pub fn center(self) -> Point {
        Point::new(self.x as f32 + 0.5, self.z as f32 + 0.5)
    }

    pub fn manhattan_distance(self, other: Cell) -> usize {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }
}

/// A continuous position on the ground plane, measured in cells.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub z: f32,
}

impl Point {
    pub const fn new(x: f32, z: f32) -> Self {
        Point { x, z }
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.z - other.z)
    }

    /// The cell containing this point.
    ///
    /// Returns `None` for negative or non-finite coordinates; upper bounds are
    /// left to the grid.
    pub fn cell(self) -> Option<Cell> {
        if self.x.is_finite() && self.z.is_finite() && self.x >= 0.0 && self.z >= 0.0 {
            Some(Cell::new(self.x.floor() as usize, self.z.floor() as usize))
        } else {
            None
        }
    }
}
