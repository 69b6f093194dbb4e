use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Cell, Point};

/// The player-controlled character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub position: Point,
    /// Heading in degrees; 0 faces +x, 90 faces -z.
    pub heading: f32,
    pub moving: bool,
    pub energy: f32,
    pub score: i32,
}

impl Player {
    pub fn new(position: Point, energy: f32) -> Self {
        Self {
            position,
            heading: 0.0,
            moving: false,
            energy,
            score: 0,
        }
    }

    /// Unit vector along the current heading.
    pub fn forward_vector(&self) -> (f32, f32) {
        let radians = self.heading.to_radians();
        (radians.cos(), -radians.sin())
    }

    pub fn cell(&self) -> Option<Cell> {
        self.position.cell()
    }
}

/// Display colour in HSV form. Converting to a screen format is left to the
/// renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    /// Hue in [0, 1).
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

impl Hsv {
    pub fn random_enemy_color<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            hue: rng.random::<f32>(),
            saturation: 0.85,
            value: 0.9,
        }
    }
}

/// A pursuing enemy.
///
/// The pursuit state machine (idle, following, recalculating) is folded into
/// the path, its cursor and the recalculation countdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub position: Point,
    pub color: Hsv,
    /// Cells towards the player; the last one was the player's cell when the
    /// path was computed.
    pub path: Vec<Cell>,
    /// Index of the cell currently being walked to.
    pub cursor: usize,
    /// Seconds until the next scheduled recomputation.
    pub recalc_timer: f32,
    /// Set when the last search found no route; the enemy then waits for the
    /// timer instead of searching again every tick.
    pub blocked: bool,
}

impl Enemy {
    pub fn new(position: Point, color: Hsv, recalc_timer: f32) -> Self {
        Self {
            position,
            color,
            path: Vec::new(),
            cursor: 0,
            recalc_timer,
            blocked: false,
        }
    }

    /// The waypoint currently being walked to, if any.
    pub fn target(&self) -> Option<Cell> {
        self.path.get(self.cursor).copied()
    }

    /// Whether the path must be recomputed this tick: the timer ran out, no
    /// path was ever planned, the path is exhausted, or the player has left
    /// the path's final cell.
    pub fn needs_replan(&self, player_cell: Option<Cell>) -> bool {
        if self.recalc_timer <= 0.0 {
            return true;
        }
        match self.path.last() {
            None => !self.blocked,
            Some(last) => self.cursor >= self.path.len() || Some(*last) != player_cell,
        }
    }

    /// Adopts a freshly computed path, skipping the cell the enemy stands on.
    pub fn adopt_path(&mut self, path: Vec<Cell>) {
        self.cursor = usize::from(path.len() > 1);
        self.path = path;
        self.blocked = false;
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
        self.cursor = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyCapsule {
    pub position: Point,
}

/// Cosmetic furniture type of a fixed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixedKind {
    Chair,
    Table,
    Vase,
}

impl FixedKind {
    pub const ALL: [FixedKind; 3] = [FixedKind::Chair, FixedKind::Table, FixedKind::Vase];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedObject {
    pub cell: Cell,
    pub kind: FixedKind,
}
