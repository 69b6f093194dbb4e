//! Tunable parameters for generation, pursuit and the energy economy.

use serde::{Deserialize, Serialize};

use crate::SimError;

/// Largest accepted maze side length.
pub const MAX_GRID_SIZE: usize = 400;

/// Every named parameter of the simulation core.
///
/// Deserializes from partial documents; missing fields take their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Side length of the square maze, border included.
    pub grid_size: usize,
    /// Probability of the first draw that seeds an interior wall.
    pub wall_probability: f64,
    /// Probability of the second, independent draw that must also pass.
    pub wall_secondary_probability: f64,
    /// Number of random corridors carved after seeding.
    pub corridor_count: usize,
    /// Chance of stepping along x when a corridor still needs both axes.
    pub corridor_x_bias: f64,
    /// Per-cell chance of opening an interior cell when too few are free.
    pub fallback_opening_probability: f64,

    /// Player speed in cells per second.
    pub player_speed: f32,
    /// Energy drained per cell travelled.
    pub energy_drain_factor: f32,
    pub initial_energy: f32,
    pub energy_cap: f32,
    /// Heading change applied by one steering input, in degrees.
    pub heading_step: f32,
    /// Length of a discrete forward nudge, in cells.
    pub nudge_step: f32,

    /// Enemy speed in cells per second.
    pub enemy_speed: f32,
    /// Seconds between scheduled path recomputations.
    pub recalc_interval: f32,
    /// Distance to a waypoint centre below which it counts as reached.
    pub waypoint_arrival_distance: f32,
    /// Per-tick chance that an enemy without a path teleports elsewhere.
    pub wander_probability: f64,

    /// Distance below which the player touches an enemy or capsule.
    pub contact_threshold: f32,
    /// A captured enemy reappears strictly farther than this from the player.
    pub capture_relocation_min_distance: f32,
    /// Optional distance gate for relocated capsules; `None` allows any cell.
    pub capsule_relocation_min_distance: Option<f32>,
    pub capture_penalty: i32,
    pub capsule_score: i32,
    pub capsule_energy_grant: f32,

    pub min_fixed_objects: usize,
    pub min_enemies: usize,
    pub min_energy_capsules: usize,

    /// Height recorded for every window opening.
    pub window_height: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            grid_size: 50,
            wall_probability: 0.06,
            wall_secondary_probability: 0.9,
            corridor_count: 120,
            corridor_x_bias: 0.6,
            fallback_opening_probability: 0.02,

            player_speed: 10.0,
            energy_drain_factor: 0.5,
            initial_energy: 100.0,
            energy_cap: 100.0,
            heading_step: 5.0,
            nudge_step: 0.5,

            enemy_speed: 3.5,
            recalc_interval: 0.9,
            waypoint_arrival_distance: 0.05,
            wander_probability: 0.01,

            contact_threshold: 0.6,
            capture_relocation_min_distance: 2.0,
            capsule_relocation_min_distance: None,
            capture_penalty: 10,
            capsule_score: 5,
            capsule_energy_grant: 50.0,

            min_fixed_objects: 10,
            min_enemies: 10,
            min_energy_capsules: 10,

            window_height: 1.0,
        }
    }
}

impl SimConfig {
    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_walls(mut self, wall_probability: f64, corridor_count: usize) -> Self {
        self.wall_probability = wall_probability;
        self.corridor_count = corridor_count;
        self
    }

    pub fn with_speeds(mut self, player_speed: f32, enemy_speed: f32) -> Self {
        self.player_speed = player_speed;
        self.enemy_speed = enemy_speed;
        self
    }

    /// Set the population floors (fixed objects, enemies, energy capsules).
    pub fn with_populations(mut self, fixed: usize, enemies: usize, capsules: usize) -> Self {
        self.min_fixed_objects = fixed;
        self.min_enemies = enemies;
        self.min_energy_capsules = capsules;
        self
    }

    pub fn with_recalc_interval(mut self, seconds: f32) -> Self {
        self.recalc_interval = seconds;
        self
    }

    /// Checks ranges that would otherwise panic or make the game meaningless.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(3..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(invalid(format!(
                "grid_size must be within [3, {MAX_GRID_SIZE}], got {}",
                self.grid_size
            )));
        }

        let probabilities = [
            ("wall_probability", self.wall_probability),
            ("wall_secondary_probability", self.wall_secondary_probability),
            ("corridor_x_bias", self.corridor_x_bias),
            (
                "fallback_opening_probability",
                self.fallback_opening_probability,
            ),
            ("wander_probability", self.wander_probability),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} must be within [0, 1], got {value}")));
            }
        }

        let non_negative = [
            ("player_speed", self.player_speed),
            ("energy_drain_factor", self.energy_drain_factor),
            ("heading_step", self.heading_step),
            ("nudge_step", self.nudge_step),
            ("enemy_speed", self.enemy_speed),
            ("recalc_interval", self.recalc_interval),
            ("waypoint_arrival_distance", self.waypoint_arrival_distance),
            ("contact_threshold", self.contact_threshold),
            (
                "capture_relocation_min_distance",
                self.capture_relocation_min_distance,
            ),
            ("capsule_energy_grant", self.capsule_energy_grant),
            ("window_height", self.window_height),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        if let Some(gate) = self.capsule_relocation_min_distance {
            if !gate.is_finite() || gate < 0.0 {
                return Err(invalid(format!(
                    "capsule_relocation_min_distance must be finite and non-negative, got {gate}"
                )));
            }
        }

        if !self.energy_cap.is_finite() || self.energy_cap <= 0.0 {
            return Err(invalid(format!(
                "energy_cap must be positive, got {}",
                self.energy_cap
            )));
        }
        if !(0.0..=self.energy_cap).contains(&self.initial_energy) {
            return Err(invalid(format!(
                "initial_energy must be within [0, {}], got {}",
                self.energy_cap, self.initial_energy
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> SimError {
    SimError::InvalidConfig(message)
}
