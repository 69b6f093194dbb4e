//! Procedural maze construction.
//!
//! A map starts as sparse, clustered wall seeds inside a walled border. The
//! player spawn is placed as close to the centre as possible, random biased
//! corridors are carved between free cells, and every remaining obstacle is
//! finally oriented as a horizontal or vertical wall segment.
//!
//! Connectivity is not guaranteed. The corridors make disconnected pockets
//! unlikely on default settings, nothing more.

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    Cell, SimConfig, SimError,
    config::MAX_GRID_SIZE,
    map::{CellKind, Grid},
};

/// Inputs of [`generate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorParams {
    pub size: usize,
    pub wall_density: f64,
    pub wall_secondary_probability: f64,
    pub corridor_count: usize,
    pub corridor_x_bias: f64,
    pub fallback_opening_probability: f64,
}

impl GeneratorParams {
    /// Parameters with the default secondary draw, bias and fallback rates.
    pub fn new(size: usize, wall_density: f64, corridor_count: usize) -> Self {
        let defaults = SimConfig::default();
        Self {
            size,
            wall_density,
            wall_secondary_probability: defaults.wall_secondary_probability,
            corridor_count,
            corridor_x_bias: defaults.corridor_x_bias,
            fallback_opening_probability: defaults.fallback_opening_probability,
        }
    }
}

impl From<&SimConfig> for GeneratorParams {
    fn from(config: &SimConfig) -> Self {
        Self {
            size: config.grid_size,
            wall_density: config.wall_probability,
            wall_secondary_probability: config.wall_secondary_probability,
            corridor_count: config.corridor_count,
            corridor_x_bias: config.corridor_x_bias,
            fallback_opening_probability: config.fallback_opening_probability,
        }
    }
}

/// Builds a square maze.
///
/// The same `rng` stream always yields the same grid. Fails with
/// [`SimError::UnplayableMap`] when fewer than two free cells exist even after
/// the fallback opening pass.
pub fn generate<R: Rng + ?Sized>(
    params: &GeneratorParams,
    rng: &mut R,
) -> Result<Grid<CellKind>, SimError> {
    let size = params.size;
    if !(3..=MAX_GRID_SIZE).contains(&size) {
        return Err(SimError::InvalidConfig(format!(
            "grid size must be within [3, {MAX_GRID_SIZE}], got {size}"
        )));
    }

    let mut grid = Grid::from_generator(size, size, |cell| {
        let interior = cell.x > 0 && cell.z > 0 && cell.x + 1 < size && cell.z + 1 < size;
        // The secondary draw only happens when the first passes.
        if interior
            && rng.random::<f64>() < params.wall_density
            && rng.random::<f64>() < params.wall_secondary_probability
        {
            CellKind::WallHorizontal
        } else {
            CellKind::Empty
        }
    })?;
    build_border(&mut grid);
    let spawn = place_spawn(&mut grid);

    let mut free = free_cells(&grid);
    if free.len() < 2 {
        warn!(
            free_cells = free.len(),
            "too few free cells, injecting fallback openings"
        );
        for cell in grid.interior() {
            if grid[cell] != CellKind::PlayerSpawn
                && rng.random::<f64>() < params.fallback_opening_probability
            {
                grid[cell] = CellKind::Empty;
            }
        }
        free = free_cells(&grid);
        if free.len() < 2 {
            return Err(SimError::UnplayableMap {
                free_cells: free.len(),
            });
        }
    }

    for _ in 0..params.corridor_count {
        let (Some(&from), Some(&to)) = (free.choose(rng), free.choose(rng)) else {
            break;
        };
        if from != to {
            carve_corridor(&mut grid, from, to, params.corridor_x_bias, rng);
        }
    }

    orient_walls(&mut grid, rng);

    info!(
        size,
        corridors = params.corridor_count,
        spawn_x = spawn.x,
        spawn_z = spawn.z,
        walkable = grid.walkable_cells().len(),
        "map generated"
    );
    Ok(grid)
}

/// Rows along the top and bottom become horizontal walls, columns on the left
/// and right vertical ones; the columns win at the corners.
fn build_border(grid: &mut Grid<CellKind>) {
    let (width, height) = (grid.width(), grid.height());
    for x in 0..width {
        grid[Cell::new(x, 0)] = CellKind::WallHorizontal;
        grid[Cell::new(x, height - 1)] = CellKind::WallHorizontal;
    }
    for z in 0..height {
        grid[Cell::new(0, z)] = CellKind::WallVertical;
        grid[Cell::new(width - 1, z)] = CellKind::WallVertical;
    }
}

/// Marks the empty cell nearest the centre as the spawn, searching square
/// rings of growing radius. Overwrites the centre when nothing is empty.
fn place_spawn(grid: &mut Grid<CellKind>) -> Cell {
    let center = Cell::new(grid.width() / 2, grid.height() / 2);
    let spawn = (0..grid.width().max(grid.height()) / 2)
        .flat_map(|radius| ring(center, radius))
        .find(|cell| grid.kind_at(*cell) == Some(CellKind::Empty))
        .unwrap_or(center);
    grid[spawn] = CellKind::PlayerSpawn;
    spawn
}

/// Cells at Chebyshev distance `radius` from `center`, row by row. Cells
/// that would fall left of or above the origin are skipped.
fn ring(center: Cell, radius: usize) -> impl Iterator<Item = Cell> {
    let r = radius as isize;
    (-r..=r).flat_map(move |dz| {
        (-r..=r).filter_map(move |dx| {
            if dx.abs().max(dz.abs()) != r {
                return None;
            }
            let x = center.x.checked_add_signed(dx)?;
            let z = center.z.checked_add_signed(dz)?;
            Some(Cell::new(x, z))
        })
    })
}

fn free_cells(grid: &Grid<CellKind>) -> Vec<Cell> {
    grid.interior().filter(|cell| grid[*cell].is_free()).collect()
}

/// Random walk from `from` towards `to`, opening every visited cell. While both
/// axes still differ, x is chosen with probability `x_bias`.
fn carve_corridor<R: Rng + ?Sized>(
    grid: &mut Grid<CellKind>,
    from: Cell,
    to: Cell,
    x_bias: f64,
    rng: &mut R,
) {
    let max_steps = from.manhattan_distance(to) * 4 + 50;
    let mut current = from;
    let mut steps = 0;
    open(grid, current);
    while current != to && steps < max_steps {
        steps += 1;
        let step_x = match (current.x != to.x, current.z != to.z) {
            (true, true) => rng.random::<f64>() < x_bias,
            (dx, _) => dx,
        };
        if step_x {
            current.x = if to.x > current.x { current.x + 1 } else { current.x - 1 };
        } else {
            current.z = if to.z > current.z { current.z + 1 } else { current.z - 1 };
        }
        open(grid, current);
    }
}

fn open(grid: &mut Grid<CellKind>, cell: Cell) {
    if let Some(kind) = grid.get_mut(cell) {
        if *kind != CellKind::PlayerSpawn {
            *kind = CellKind::Empty;
        }
    }
}

/// A remaining interior obstacle becomes a vertical segment when it is open
/// only to its left or right, a horizontal one when open only above or below,
/// and a coin flip otherwise.
fn orient_walls<R: Rng + ?Sized>(grid: &mut Grid<CellKind>, rng: &mut R) {
    for cell in grid.interior() {
        if grid[cell].is_free() {
            continue;
        }
        let empty = |x: usize, z: usize| grid.kind_at(Cell::new(x, z)) == Some(CellKind::Empty);
        let open_x = empty(cell.x - 1, cell.z) || empty(cell.x + 1, cell.z);
        let open_z = empty(cell.x, cell.z - 1) || empty(cell.x, cell.z + 1);
        let kind = match (open_x, open_z) {
            (true, false) => CellKind::WallVertical,
            (false, true) => CellKind::WallHorizontal,
            _ if rng.random_bool(0.5) => CellKind::WallHorizontal,
            _ => CellKind::WallVertical,
        };
        grid[cell] = kind;
    }
}
