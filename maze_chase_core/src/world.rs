use std::collections::{BTreeMap, HashMap};

use rand::{Rng, rngs::StdRng, seq::IndexedRandom};
use tracing::{info, warn};

use crate::{
    Cell, Point, SimConfig, SimError,
    director::PopulationReport,
    entity::{EnergyCapsule, Enemy, FixedKind, FixedObject, Hsv, Player},
    generator::{self, GeneratorParams},
    map::{CellKind, Grid},
};

/// The whole mutable game state: maze, player, enemies, capsules and the
/// derived fixed-object and window collections.
///
/// A single driver owns the world and mutates it between renders; every
/// random draw comes from the seeded source handed in at construction.
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) config: SimConfig,
    pub(crate) grid: Grid<CellKind>,
    pub(crate) player: Player,
    pub(crate) enemies: Vec<Enemy>,
    pub(crate) capsules: Vec<EnergyCapsule>,
    pub(crate) fixed_objects: Vec<FixedObject>,
    pub(crate) windows: BTreeMap<Cell, f32>,
    pub(crate) rng: StdRng,
}

impl World {
    /// Generates a maze, places the player on its spawn and tops up every
    /// population to its configured floor.
    pub fn initialize(config: SimConfig, mut rng: StdRng) -> Result<Self, SimError> {
        config.validate()?;
        let grid = generator::generate(&GeneratorParams::from(&config), &mut rng)?;
        let mut world = Self::from_grid(config, grid, rng)?;
        world.ensure_population();
        Ok(world)
    }

    /// Builds an unpopulated world around an existing grid, such as one read
    /// with [`crate::map::parse_map`].
    pub fn from_grid(config: SimConfig, grid: Grid<CellKind>, rng: StdRng) -> Result<Self, SimError> {
        config.validate()?;
        let spawn = grid.spawn_cell().ok_or(SimError::MissingSpawn)?;
        let player = Player::new(spawn.center(), config.initial_energy);
        let mut world = Self {
            config,
            grid,
            player,
            enemies: Vec::new(),
            capsules: Vec::new(),
            fixed_objects: Vec::new(),
            windows: BTreeMap::new(),
            rng,
        };
        world.rederive_features();
        Ok(world)
    }

    /// Returns the configuration the world was built with.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Returns the maze grid.
    pub fn grid(&self) -> &Grid<CellKind> {
        &self.grid
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Enemies in spawn order; event indices refer to this slice.
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    /// Energy capsules in spawn order.
    pub fn capsules(&self) -> &[EnergyCapsule] {
        &self.capsules
    }

    /// Fixed objects derived from the grid's `Fixed` cells.
    pub fn fixed_objects(&self) -> &[FixedObject] {
        &self.fixed_objects
    }

    /// Window openings and their heights, for renderers.
    pub fn windows(&self) -> &BTreeMap<Cell, f32> {
        &self.windows
    }

    // Player intent. Drivers call these between ticks only.

    /// Turns the player by `delta_degrees`; positive turns left.
    pub fn steer(&mut self, delta_degrees: f32) {
        self.player.heading = (self.player.heading + delta_degrees).rem_euclid(360.0);
    }

    /// Starts or stops forward motion.
    pub fn toggle_moving(&mut self) {
        self.player.moving = !self.player.moving;
    }

    pub fn set_moving(&mut self, moving: bool) {
        self.player.moving = moving;
    }

    /// Debug command: restores energy to the cap.
    pub fn refill_energy(&mut self) {
        self.player.energy = self.config.energy_cap;
    }

    /// Moves the player one discrete step forward without spending energy.
    /// Returns false when the step would collide.
    pub fn nudge_forward(&mut self, step: f32) -> bool {
        let (vx, vz) = self.player.forward_vector();
        let next = Point::new(
            self.player.position.x + vx * step,
            self.player.position.z + vz * step,
        );
        if self.grid.collides(next) {
            return false;
        }
        self.player.position = next;
        true
    }

    /// Adds an enemy at the centre of a walkable cell.
    pub fn spawn_enemy(&mut self, cell: Cell) -> Result<usize, SimError> {
        self.require_walkable(cell)?;
        let color = Hsv::random_enemy_color(&mut self.rng);
        let timer = self.rng.random::<f32>() * self.config.recalc_interval;
        self.enemies.push(Enemy::new(cell.center(), color, timer));
        Ok(self.enemies.len() - 1)
    }

    /// Adds an energy capsule at the centre of a walkable cell.
    pub fn spawn_capsule(&mut self, cell: Cell) -> Result<usize, SimError> {
        self.require_walkable(cell)?;
        self.capsules.push(EnergyCapsule {
            position: cell.center(),
        });
        Ok(self.capsules.len() - 1)
    }

    fn require_walkable(&self, cell: Cell) -> Result<(), SimError> {
        if self.grid.is_walkable(cell) {
            Ok(())
        } else {
            Err(SimError::NotWalkable {
                x: cell.x,
                z: cell.z,
            })
        }
    }

    /// Rebuilds the fixed-object list and window map from the grid.
    ///
    /// Objects still standing on a cell keep their furniture type; new
    /// `Fixed` cells get a random one.
    pub fn rederive_features(&mut self) {
        let previous: HashMap<Cell, FixedKind> = self
            .fixed_objects
            .iter()
            .map(|object| (object.cell, object.kind))
            .collect();

        let fixed_cells: Vec<Cell> = self.grid.cells_of_kind(CellKind::Fixed).collect();
        self.fixed_objects = fixed_cells
            .into_iter()
            .map(|cell| FixedObject {
                cell,
                kind: previous
                    .get(&cell)
                    .copied()
                    .unwrap_or_else(|| FixedKind::random(&mut self.rng)),
            })
            .collect();

        let height = self.config.window_height;
        self.windows = self
            .grid
            .cells_of_kind(CellKind::Window)
            .map(|cell| (cell, height))
            .collect();
    }

    /// Replaces the maze with a freshly generated one.
    ///
    /// The player returns to the new spawn and stops; enemies and capsules are
    /// relocated onto the new maze, then populations are topped up.
    pub fn regenerate(&mut self) -> Result<PopulationReport, SimError> {
        let grid = generator::generate(&GeneratorParams::from(&self.config), &mut self.rng)?;
        let spawn = grid.spawn_cell().ok_or(SimError::MissingSpawn)?;
        self.grid = grid;
        self.fixed_objects.clear();
        self.rederive_features();

        self.player.position = spawn.center();
        self.player.moving = false;

        let walkable: Vec<Cell> = self
            .grid
            .walkable_cells()
            .into_iter()
            .filter(|cell| *cell != spawn)
            .collect();
        for enemy in &mut self.enemies {
            if let Some(cell) = walkable.choose(&mut self.rng) {
                enemy.position = cell.center();
            }
            enemy.clear_path();
            enemy.blocked = false;
            enemy.recalc_timer = self.config.recalc_interval;
        }
        for capsule in &mut self.capsules {
            if let Some(cell) = walkable.choose(&mut self.rng) {
                capsule.position = cell.center();
            }
        }

        info!(
            width = self.grid.width(),
            height = self.grid.height(),
            "map regenerated"
        );
        Ok(self.ensure_population())
    }

    /// A uniformly chosen walkable cell whose centre is strictly farther than
    /// `min_distance` from the player, if any exists.
    pub(crate) fn random_walkable_cell(&mut self, min_distance: Option<f32>) -> Option<Cell> {
        let player = self.player.position;
        let candidates: Vec<Cell> = self
            .grid
            .walkable_cells()
            .into_iter()
            .filter(|cell| min_distance.is_none_or(|gate| cell.center().distance(player) > gate))
            .collect();
        let choice = candidates.choose(&mut self.rng).copied();
        if choice.is_none() {
            warn!(?min_distance, "no walkable cell available for relocation");
        }
        choice
    }
}
