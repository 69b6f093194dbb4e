//! A* search over a 4-connected grid with unit edge costs.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
};

use crate::{
    Cell,
    map::{CellKind, Grid},
};

/// Returned when no route exists between two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no path from ({}, {}) to ({}, {})", start.x, start.z, goal.x, goal.z)]
pub struct Unreachable {
    pub start: Cell,
    pub goal: Cell,
}

/// Neighbour expansion order: east, west, south, north.
const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Open-set entry. Ordered by lowest f-score first, then by insertion order,
/// so equal-cost frontiers are expanded first-in first-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frontier {
    f_score: usize,
    g_score: usize,
    sequence: u64,
    cell: Cell,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behaviour on BinaryHeap.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest route from `start` to `goal`, both included.
///
/// Only cells for which `is_walkable` returns true are entered; the predicate
/// is also responsible for rejecting cells past the far edges of the grid.
/// `start` itself is never tested, and `start == goal` yields `[start]`.
pub fn find_path<F>(start: Cell, goal: Cell, is_walkable: F) -> Result<Vec<Cell>, Unreachable>
where
    F: Fn(Cell) -> bool,
{
    if start == goal {
        return Ok(vec![start]);
    }
    if !is_walkable(goal) {
        return Err(Unreachable { start, goal });
    }

    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut cost_so_far: HashMap<Cell, usize> = HashMap::new();
    let mut sequence = 0u64;

    frontier.push(Frontier {
        f_score: start.manhattan_distance(goal),
        g_score: 0,
        sequence,
        cell: start,
    });
    cost_so_far.insert(start, 0);

    while let Some(Frontier {
        g_score,
        cell: current,
        ..
    }) = frontier.pop()
    {
        if current == goal {
            return Ok(reconstruct(&came_from, start, goal));
        }
        // Skip entries superseded by a cheaper route found later.
        if cost_so_far.get(&current).is_some_and(|best| *best < g_score) {
            continue;
        }

        for neighbor in neighbors(current).filter(|cell| is_walkable(*cell)) {
            let new_cost = g_score + 1;
            if cost_so_far
                .get(&neighbor)
                .is_none_or(|known| new_cost < *known)
            {
                cost_so_far.insert(neighbor, new_cost);
                came_from.insert(neighbor, current);
                sequence += 1;
                frontier.push(Frontier {
                    f_score: new_cost + neighbor.manhattan_distance(goal),
                    g_score: new_cost,
                    sequence,
                    cell: neighbor,
                });
            }
        }
    }

    Err(Unreachable { start, goal })
}

/// [`find_path`] using the grid's own walkability classification.
pub fn find_grid_path(
    grid: &Grid<CellKind>,
    start: Cell,
    goal: Cell,
) -> Result<Vec<Cell>, Unreachable> {
    find_path(start, goal, |cell| grid.is_walkable(cell))
}

fn neighbors(cell: Cell) -> impl Iterator<Item = Cell> {
    DIRECTIONS.iter().filter_map(move |(dx, dz)| {
        Some(Cell::new(
            cell.x.checked_add_signed(*dx)?,
            cell.z.checked_add_signed(*dz)?,
        ))
    })
}

fn reconstruct(came_from: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(previous) => {
                current = *previous;
                path.push(current);
            }
            None => break,
        }
    }
    path.reverse();
    path
}
