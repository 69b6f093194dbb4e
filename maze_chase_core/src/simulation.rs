//! The per-tick update: player motion, enemy pursuit, captures and pickups.

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Cell, Point, World, pathfinding::find_grid_path};

/// Something noteworthy that happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// The player walked into a wall and stopped.
    PlayerStopped,
    /// No route to the player exists for this enemy right now.
    PathUnreachable { enemy: usize },
    /// An idle enemy teleported to a random cell.
    EnemyWandered { enemy: usize },
    /// The player touched an enemy and lost points.
    EnemyCaptured { enemy: usize },
    /// The player picked up an energy capsule.
    CapsuleCollected { capsule: usize },
}

impl World {
    /// Advances the world by `dt` seconds.
    ///
    /// Non-finite or negative steps are ignored.
    pub fn tick(&mut self, dt: f32) -> Vec<SimEvent> {
        let mut events = Vec::new();
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "ignoring invalid tick duration");
            return events;
        }

        self.move_player(dt, &mut events);
        self.pursue(dt, &mut events);
        self.resolve_captures(&mut events);
        self.resolve_pickups(&mut events);

        self.player.energy = self.player.energy.clamp(0.0, self.config.energy_cap);
        events
    }

    fn move_player(&mut self, dt: f32, events: &mut Vec<SimEvent>) {
        let player = &mut self.player;
        if !player.moving || player.energy <= 0.0 {
            return;
        }
        let (vx, vz) = player.forward_vector();
        let distance = self.config.player_speed * dt;
        let next = Point::new(
            player.position.x + vx * distance,
            player.position.z + vz * distance,
        );
        if self.grid.collides(next) {
            player.moving = false;
            events.push(SimEvent::PlayerStopped);
            return;
        }
        player.position = next;
        player.energy = (player.energy - distance * self.config.energy_drain_factor).max(0.0);
    }

    fn pursue(&mut self, dt: f32, events: &mut Vec<SimEvent>) {
        let config = &self.config;
        let grid = &self.grid;
        let player_cell = self.player.cell();
        // Computed on first wander only.
        let mut walkable: Option<Vec<Cell>> = None;

        for (index, enemy) in self.enemies.iter_mut().enumerate() {
            enemy.recalc_timer -= dt;

            if enemy.needs_replan(player_cell) {
                enemy.recalc_timer = config.recalc_interval;
                let route = match (enemy.position.cell(), player_cell) {
                    (Some(from), Some(to)) => find_grid_path(grid, from, to).ok(),
                    _ => None,
                };
                match route {
                    Some(path) => enemy.adopt_path(path),
                    None => {
                        debug!(enemy = index, "player unreachable");
                        enemy.clear_path();
                        enemy.blocked = true;
                        events.push(SimEvent::PathUnreachable { enemy: index });
                    }
                }
            }

            if let Some(target) = enemy.target() {
                let center = target.center();
                let (dx, dz) = (center.x - enemy.position.x, center.z - enemy.position.z);
                let distance = dx.hypot(dz);
                if distance < config.waypoint_arrival_distance {
                    enemy.cursor += 1;
                    continue;
                }
                // Never overshoot the waypoint.
                let step = (config.enemy_speed * dt).min(distance);
                let next = Point::new(
                    enemy.position.x + dx / distance * step,
                    enemy.position.z + dz / distance * step,
                );
                if grid.collides(next) {
                    enemy.recalc_timer = 0.0;
                } else {
                    enemy.position = next;
                }
            } else if self.rng.random::<f64>() < config.wander_probability {
                let cells = walkable.get_or_insert_with(|| grid.walkable_cells());
                if let Some(cell) = cells.choose(&mut self.rng) {
                    enemy.position = cell.center();
                    debug!(enemy = index, x = cell.x, z = cell.z, "enemy wandered");
                    events.push(SimEvent::EnemyWandered { enemy: index });
                }
            }
        }
    }

    fn resolve_captures(&mut self, events: &mut Vec<SimEvent>) {
        let threshold = self.config.contact_threshold;
        let gate = self.config.capture_relocation_min_distance;
        for index in 0..self.enemies.len() {
            if self.enemies[index].position.distance(self.player.position) >= threshold {
                continue;
            }
            self.player.score -= self.config.capture_penalty;
            let cell = self.random_walkable_cell(Some(gate));
            let interval = self.config.recalc_interval;
            let enemy = &mut self.enemies[index];
            if let Some(cell) = cell {
                enemy.position = cell.center();
            }
            enemy.clear_path();
            enemy.blocked = false;
            enemy.recalc_timer = interval;
            debug!(enemy = index, score = self.player.score, "enemy captured");
            events.push(SimEvent::EnemyCaptured { enemy: index });
        }
    }

    fn resolve_pickups(&mut self, events: &mut Vec<SimEvent>) {
        let threshold = self.config.contact_threshold;
        let gate = self.config.capsule_relocation_min_distance;
        for index in 0..self.capsules.len() {
            if self.capsules[index].position.distance(self.player.position) >= threshold {
                continue;
            }
            let player = &mut self.player;
            player.energy = (player.energy + self.config.capsule_energy_grant).min(self.config.energy_cap);
            player.score += self.config.capsule_score;
            if let Some(cell) = self.random_walkable_cell(gate) {
                self.capsules[index].position = cell.center();
            }
            debug!(capsule = index, energy = self.player.energy, "capsule collected");
            events.push(SimEvent::CapsuleCollected { capsule: index });
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{SimConfig, map::parse_map};

    const ARENA: &str = "
        |---------|
        |.........|
        |.........|
        |....P....|
        |.........|
        |.........|
        |---------|
    ";

    fn arena(config: SimConfig) -> World {
        let config = config.with_populations(0, 0, 0);
        World::from_grid(config, parse_map(ARENA).unwrap(), StdRng::seed_from_u64(17)).unwrap()
    }

    const PLAYER: Point = Point::new(5.5, 3.5);

    #[test]
    fn moving_player_drains_energy() {
        let mut world = arena(SimConfig::default());
        world.set_moving(true);
        let events = world.tick(0.1);
        assert!(events.is_empty());
        let player = world.player();
        assert!((player.position.x - 6.5).abs() < 1e-4);
        assert!((player.energy - 99.5).abs() < 1e-4);
    }

    #[test]
    fn idle_or_exhausted_player_stays_put() {
        let mut world = arena(SimConfig::default());
        world.tick(0.1);
        assert_eq!(world.player().position, PLAYER);

        world.set_moving(true);
        world.player.energy = 0.0;
        world.tick(0.1);
        assert_eq!(world.player().position, PLAYER);
    }

    #[test]
    fn wall_stops_player_without_cost() {
        let mut world = arena(SimConfig::default());
        world.set_moving(true);
        let events = world.tick(1.0); // ten cells east is far past the wall
        assert_eq!(events, vec![SimEvent::PlayerStopped]);
        assert!(!world.player().moving);
        assert_eq!(world.player().position, PLAYER);
        assert_eq!(world.player().energy, 100.0);
    }

    #[test]
    fn energy_never_goes_negative() {
        let mut world = arena(SimConfig::default().with_speeds(1.0, 0.0));
        world.set_moving(true);
        world.player.energy = 0.2;
        world.tick(1.0);
        assert_eq!(world.player().energy, 0.0);
        assert!(world.player().moving);
    }

    #[test]
    fn enemy_walks_path_towards_player() {
        let mut world = arena(SimConfig::default());
        world.spawn_enemy(Cell::new(1, 3)).unwrap();
        world.enemies[0].recalc_timer = 0.0;
        world.tick(0.1);

        let enemy = &world.enemies()[0];
        assert_eq!(enemy.path.first(), Some(&Cell::new(1, 3)));
        assert_eq!(enemy.path.last(), Some(&Cell::new(5, 3)));
        assert_eq!(enemy.path.len(), 5);
        assert_eq!(enemy.cursor, 1);
        assert!((enemy.position.x - 1.85).abs() < 1e-4);
        assert_eq!(enemy.recalc_timer, 0.9);
    }

    #[test]
    fn stale_target_forces_recompute() {
        let mut world = arena(SimConfig::default());
        world.spawn_enemy(Cell::new(1, 1)).unwrap();
        let enemy = &mut world.enemies[0];
        enemy.adopt_path(vec![Cell::new(1, 1), Cell::new(2, 1)]);
        enemy.recalc_timer = 100.0;

        world.tick(0.01);

        let enemy = &world.enemies()[0];
        assert_eq!(enemy.path.last(), Some(&Cell::new(5, 3)));
        assert_eq!(enemy.recalc_timer, 0.9);
    }

    #[test]
    fn blocked_move_resets_countdown() {
        let mut world = arena(SimConfig::default());
        world.spawn_enemy(Cell::new(1, 1)).unwrap();
        let enemy = &mut world.enemies[0];
        // A path through the wall above, as if the map changed underneath it.
        enemy.path = vec![Cell::new(1, 1), Cell::new(1, 0), Cell::new(5, 3)];
        enemy.cursor = 1;
        enemy.recalc_timer = 100.0;
        world.player.position = PLAYER;

        world.tick(0.2);

        let enemy = &world.enemies()[0];
        assert_eq!(enemy.position, Cell::new(1, 1).center());
        assert_eq!(enemy.recalc_timer, 0.0);
    }

    #[test]
    fn waypoint_arrival_advances_cursor() {
        let mut world = arena(SimConfig::default());
        world.spawn_enemy(Cell::new(3, 3)).unwrap();
        let enemy = &mut world.enemies[0];
        enemy.adopt_path(vec![Cell::new(3, 3), Cell::new(4, 3), Cell::new(5, 3)]);
        enemy.position = Point::new(4.47, 3.5);
        enemy.recalc_timer = 100.0;

        world.tick(0.01);
        assert_eq!(world.enemies()[0].cursor, 2);
    }

    #[test]
    fn unreachable_player_waits_for_timer() {
        let grid = parse_map(
            "
            |-----|
            |P.|..|
            |-----|
            ",
        )
        .unwrap();
        let config = SimConfig {
            wander_probability: 0.0,
            ..SimConfig::default().with_populations(0, 0, 0)
        };
        let mut world = World::from_grid(config, grid, StdRng::seed_from_u64(2)).unwrap();
        world.spawn_enemy(Cell::new(4, 1)).unwrap();
        world.enemies[0].recalc_timer = 0.0;

        let events = world.tick(0.1);
        assert_eq!(events, vec![SimEvent::PathUnreachable { enemy: 0 }]);
        assert!(world.enemies()[0].path.is_empty());
        assert!(world.enemies()[0].blocked);

        // No retry until the countdown expires.
        assert!(world.tick(0.1).is_empty());
        let mut retried = false;
        for _ in 0..10 {
            retried |= !world.tick(0.1).is_empty();
        }
        assert!(retried);
    }

    #[test]
    fn idle_enemy_wanders_to_walkable_cell() {
        let grid = parse_map(
            "
            |-------|
            |P.|....|
            |-------|
            ",
        )
        .unwrap();
        let config = SimConfig {
            wander_probability: 1.0,
            ..SimConfig::default().with_populations(0, 0, 0)
        };
        let mut world = World::from_grid(config, grid, StdRng::seed_from_u64(6)).unwrap();
        world.spawn_enemy(Cell::new(5, 1)).unwrap();
        world.enemies[0].recalc_timer = 0.0;

        let events = world.tick(0.1);
        assert!(events.contains(&SimEvent::EnemyWandered { enemy: 0 }));
        assert!(!world.grid().collides(world.enemies()[0].position));
    }

    #[test]
    fn capture_penalizes_and_relocates_far_away() {
        let mut world = arena(SimConfig::default());
        world.spawn_enemy(Cell::new(5, 3)).unwrap();
        world.enemies[0].position = Point::new(PLAYER.x + 0.59, PLAYER.z);
        world.enemies[0].recalc_timer = 100.0;
        world.enemies[0].adopt_path(vec![Cell::new(5, 3)]);

        let events = world.tick(0.0);

        assert!(events.contains(&SimEvent::EnemyCaptured { enemy: 0 }));
        assert_eq!(world.player().score, -10);
        let enemy = &world.enemies()[0];
        assert!(enemy.position.distance(world.player().position) > 2.0);
        assert!(!world.grid().collides(enemy.position));
        assert!(enemy.path.is_empty());
        assert_eq!(enemy.cursor, 0);
    }

    #[test]
    fn capture_without_distant_cell_keeps_enemy_in_place() {
        // No walkable cell lies more than 2.0 from the player here.
        let grid = parse_map(
            "
            |---|
            |.P.|
            |---|
            ",
        )
        .unwrap();
        let config = SimConfig::default().with_populations(0, 0, 0);
        let mut world = World::from_grid(config, grid, StdRng::seed_from_u64(9)).unwrap();
        world.spawn_enemy(Cell::new(1, 1)).unwrap();
        let contact = Point::new(2.5 - 0.59, 1.5);
        world.enemies[0].position = contact;
        world.enemies[0].adopt_path(vec![Cell::new(1, 1), Cell::new(2, 1)]);

        let mut events = Vec::new();
        world.resolve_captures(&mut events);

        assert_eq!(events, vec![SimEvent::EnemyCaptured { enemy: 0 }]);
        assert_eq!(world.player().score, -10);
        let enemy = &world.enemies()[0];
        assert_eq!(enemy.position, contact);
        assert!(enemy.path.is_empty());
        assert!(!enemy.blocked);
        assert_eq!(enemy.recalc_timer, 0.9);
    }

    #[test]
    fn no_capture_at_threshold() {
        let mut world = arena(SimConfig::default());
        world.spawn_enemy(Cell::new(5, 3)).unwrap();
        world.enemies[0].position = Point::new(PLAYER.x + 0.61, PLAYER.z);
        world.enemies[0].recalc_timer = 100.0;
        world.enemies[0].adopt_path(vec![Cell::new(5, 3)]);
        world.resolve_captures(&mut Vec::new());
        assert_eq!(world.player().score, 0);
    }

    #[test]
    fn pickup_grants_energy_and_score() {
        let mut world = arena(SimConfig::default());
        world.spawn_capsule(Cell::new(5, 3)).unwrap();
        world.capsules[0].position = Point::new(PLAYER.x, PLAYER.z + 0.59);
        world.player.energy = 30.0;

        let events = world.tick(0.0);

        assert_eq!(events, vec![SimEvent::CapsuleCollected { capsule: 0 }]);
        assert_eq!(world.player().energy, 80.0);
        assert_eq!(world.player().score, 5);
        assert!(!world.grid().collides(world.capsules()[0].position));
    }

    #[test]
    fn pickup_energy_is_capped() {
        let mut world = arena(SimConfig::default());
        world.spawn_capsule(Cell::new(5, 3)).unwrap();
        world.capsules[0].position = Point::new(PLAYER.x - 0.59, PLAYER.z);
        world.player.energy = 90.0;

        world.tick(0.0);

        assert_eq!(world.player().energy, 100.0);
        assert_eq!(world.player().score, 5);
    }

    #[test]
    fn gated_capsule_relocation_keeps_distance() {
        let config = SimConfig {
            capsule_relocation_min_distance: Some(3.0),
            ..SimConfig::default()
        };
        let mut world = arena(config);
        world.spawn_capsule(Cell::new(5, 3)).unwrap();

        world.tick(0.0);

        let capsule = world.capsules()[0];
        assert!(capsule.position.distance(world.player().position) > 3.0);
    }

    #[test]
    fn invalid_dt_is_ignored() {
        let mut world = arena(SimConfig::default());
        world.set_moving(true);
        assert!(world.tick(f32::NAN).is_empty());
        assert!(world.tick(-1.0).is_empty());
        assert_eq!(world.player().position, PLAYER);
    }
}
