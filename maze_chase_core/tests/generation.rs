use std::collections::{HashSet, VecDeque};

use maze_chase_core::{
    Cell,
    generator::{GeneratorParams, generate},
    map::{CellKind, Grid},
};
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};

fn reachable_from(grid: &Grid<CellKind>, start: Cell) -> HashSet<Cell> {
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(cell) = queue.pop_front() {
        let candidates = [
            Cell::new(cell.x + 1, cell.z),
            Cell::new(cell.x.wrapping_sub(1), cell.z),
            Cell::new(cell.x, cell.z + 1),
            Cell::new(cell.x, cell.z.wrapping_sub(1)),
        ];
        for next in candidates {
            if grid.is_walkable(next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

proptest! {
    #[test]
    fn border_and_spawn_invariants(seed in any::<u64>(), size in 6usize..32, density in 0.0f64..0.5, corridors in 0usize..60) {
        let grid = generate(&GeneratorParams::new(size, density, corridors), &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!((grid.width(), grid.height()), (size, size));
        for (cell, kind) in grid.enumerate() {
            if grid.is_border(cell) {
                prop_assert!(kind.is_wall(), "border {:?} is {:?}", cell, kind);
            }
            prop_assert!(
                matches!(kind, CellKind::Empty | CellKind::PlayerSpawn | CellKind::WallHorizontal | CellKind::WallVertical),
                "generator produced {:?}", kind
            );
        }
        prop_assert_eq!(grid.cells_of_kind(CellKind::PlayerSpawn).count(), 1);
    }

    #[test]
    fn identical_streams_give_identical_grids(seed in any::<u64>()) {
        let params = GeneratorParams::new(24, 0.06, 40);
        let a = generate(&params, &mut StdRng::seed_from_u64(seed)).unwrap();
        let b = generate(&params, &mut StdRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(a, b);
    }
}

/// Connectivity is probabilistic; on default settings nearly every walkable
/// cell should be reachable from the spawn across many seeds.
#[test]
fn default_maps_are_mostly_connected() {
    let params = GeneratorParams::new(50, 0.06, 120);
    let mut total = 0usize;
    let mut reached = 0usize;
    for seed in 0..20 {
        let grid = generate(&params, &mut StdRng::seed_from_u64(seed)).unwrap();
        let spawn = grid.spawn_cell().unwrap();
        total += grid.walkable_cells().len();
        reached += reachable_from(&grid, spawn).len();
    }
    let ratio = reached as f64 / total as f64;
    assert!(ratio > 0.95, "only {ratio:.3} of walkable cells reachable");
}
