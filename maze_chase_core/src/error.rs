//! Fatal setup errors.
//!
//! Runtime shortfalls (unreachable targets, unmet population floors) are
//! reported as values and never surface here.

use crate::map::{GridError, MapParseError};

/// Errors that prevent a playable world from being built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("generated map is unplayable: only {free_cells} free cell(s) after fallback openings")]
    UnplayableMap { free_cells: usize },

    #[error("map has no player spawn cell")]
    MissingSpawn,

    #[error("cell ({x}, {z}) is not walkable")]
    NotWalkable { x: usize, z: usize },

    #[error(transparent)]
    MapParse(#[from] MapParseError),

    #[error(transparent)]
    Grid(#[from] GridError),
}
