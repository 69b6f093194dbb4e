use maze_chase_core::{
    Cell, Point, SimConfig, SimError, SimEvent, World,
    map::parse_map,
    pathfinding::{Unreachable, find_grid_path},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

#[test]
fn open_five_by_five_center_to_corner_is_manhattan() {
    let grid = parse_map(
        "
        |---|
        |...|
        |.P.|
        |...|
        |---|
        ",
    )
    .unwrap();
    let center = Cell::new(2, 2);
    for corner in [Cell::new(1, 1), Cell::new(3, 1), Cell::new(1, 3), Cell::new(3, 3)] {
        let path = find_grid_path(&grid, center, corner).unwrap();
        assert_eq!(path.len() - 1, center.manhattan_distance(corner));
    }
    assert_eq!(find_grid_path(&grid, center, center), Ok(vec![center]));
    assert_eq!(
        find_grid_path(&grid, center, Cell::new(0, 0)),
        Err(Unreachable {
            start: center,
            goal: Cell::new(0, 0)
        })
    );
}

#[test]
fn initialize_meets_default_floors() {
    let world = World::initialize(SimConfig::default(), StdRng::seed_from_u64(2024)).unwrap();
    assert_eq!(world.enemies().len(), 10);
    assert_eq!(world.capsules().len(), 10);
    assert_eq!(world.fixed_objects().len(), 10);
    assert_eq!(world.player().cell(), world.grid().spawn_cell());
    for enemy in world.enemies() {
        assert!(!world.grid().collides(enemy.position));
    }
    for capsule in world.capsules() {
        assert!(!world.grid().collides(capsule.position));
    }
}

#[test]
fn invalid_config_is_rejected() {
    for size in [1, 401, usize::MAX] {
        let config = SimConfig::default().with_grid_size(size);
        assert!(matches!(
            World::initialize(config, StdRng::seed_from_u64(0)),
            Err(SimError::InvalidConfig(_))
        ));
    }
}

/// Drives the world with random input for a while and checks the invariants
/// that must hold after every tick.
#[test]
fn long_run_keeps_invariants() {
    let config = SimConfig::default().with_grid_size(24);
    let mut world = World::initialize(config, StdRng::seed_from_u64(77)).unwrap();
    let mut input = StdRng::seed_from_u64(78);
    let mut captures = 0;

    for _ in 0..3_000 {
        match input.random_range(0..20) {
            0 => world.toggle_moving(),
            1 => world.steer(world.config().heading_step),
            2 => world.steer(-world.config().heading_step),
            3 => world.refill_energy(),
            _ => {}
        }
        let score_before = world.player().score;
        let energy_before = world.player().energy;
        let events = world.tick(1.0 / 60.0);

        let player = world.player();
        assert!((0.0..=100.0).contains(&player.energy));
        assert!(!world.grid().collides(player.position));
        for enemy in world.enemies() {
            assert!(!world.grid().collides(enemy.position));
        }
        for capsule in world.capsules() {
            assert!(!world.grid().collides(capsule.position));
        }

        let mut expected_score = score_before;
        for event in &events {
            match event {
                SimEvent::EnemyCaptured { enemy } => {
                    captures += 1;
                    expected_score -= 10;
                    let position = world.enemies()[*enemy].position;
                    assert!(position.distance(player.position) > 2.0);
                }
                SimEvent::CapsuleCollected { .. } => expected_score += 5,
                _ => {}
            }
        }
        assert_eq!(player.score, expected_score);
        if !events
            .iter()
            .any(|e| matches!(e, SimEvent::CapsuleCollected { .. }))
        {
            assert!(player.energy <= energy_before);
        }
    }
    assert!(captures > 0, "enemies never reached the player");
}

#[test]
fn same_seed_replays_identically() {
    let run = || {
        let config = SimConfig::default().with_grid_size(20);
        let mut world = World::initialize(config, StdRng::seed_from_u64(5)).unwrap();
        world.set_moving(true);
        let mut log = Vec::new();
        for tick in 0..600 {
            if tick % 40 == 0 {
                world.steer(35.0);
                world.set_moving(true);
            }
            log.extend(world.tick(1.0 / 30.0));
        }
        let positions: Vec<Point> = world.enemies().iter().map(|e| e.position).collect();
        (log, positions, world.player().clone())
    };
    assert_eq!(run(), run());
}
