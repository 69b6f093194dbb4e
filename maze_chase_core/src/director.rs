//! Population floors for fixed objects, enemies and energy capsules.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Cell, World, map::CellKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Population {
    FixedObjects,
    Enemies,
    EnergyCapsules,
}

/// A floor that could not be met because free cells ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub population: Population,
    pub missing: usize,
}

/// Outcome of [`World::ensure_population`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationReport {
    pub fixed_added: usize,
    pub enemies_added: usize,
    pub capsules_added: usize,
    pub shortfalls: Vec<Shortfall>,
}

impl PopulationReport {
    pub fn is_satisfied(&self) -> bool {
        self.shortfalls.is_empty()
    }

    fn record(&mut self, population: Population, missing: usize) {
        if missing > 0 {
            warn!(?population, missing, "population floor not met, free cells exhausted");
            self.shortfalls.push(Shortfall {
                population,
                missing,
            });
        }
    }
}

impl World {
    /// Tops every population up to its configured floor.
    ///
    /// Fixed objects are placed first since they consume walkable cells, then
    /// enemies, then capsules. Candidates are walkable cells that hold neither
    /// the player, the spawn, nor another entity. Running out of candidates is
    /// reported, not raised.
    pub fn ensure_population(&mut self) -> PopulationReport {
        let mut report = PopulationReport::default();

        let current = self.grid.cells_of_kind(CellKind::Fixed).count();
        let need = self.config.min_fixed_objects.saturating_sub(current);
        if need > 0 {
            for cell in self.shuffled_free_cells().into_iter().take(need) {
                self.grid[cell] = CellKind::Fixed;
                report.fixed_added += 1;
            }
            self.rederive_features();
            report.record(Population::FixedObjects, need - report.fixed_added);
        }

        let need = self.config.min_enemies.saturating_sub(self.enemies.len());
        if need > 0 {
            for cell in self.shuffled_free_cells().into_iter().take(need) {
                if self.spawn_enemy(cell).is_ok() {
                    report.enemies_added += 1;
                }
            }
            report.record(Population::Enemies, need - report.enemies_added);
        }

        let need = self
            .config
            .min_energy_capsules
            .saturating_sub(self.capsules.len());
        if need > 0 {
            for cell in self.shuffled_free_cells().into_iter().take(need) {
                if self.spawn_capsule(cell).is_ok() {
                    report.capsules_added += 1;
                }
            }
            report.record(Population::EnergyCapsules, need - report.capsules_added);
        }

        info!(
            enemies = self.enemies.len(),
            capsules = self.capsules.len(),
            fixed = self.fixed_objects.len(),
            "population ensured"
        );
        report
    }

    fn shuffled_free_cells(&mut self) -> Vec<Cell> {
        let occupied: HashSet<Cell> = self
            .enemies
            .iter()
            .map(|enemy| enemy.position)
            .chain(self.capsules.iter().map(|capsule| capsule.position))
            .chain([self.player.position])
            .filter_map(|position| position.cell())
            .collect();

        let mut cells: Vec<Cell> = self
            .grid
            .enumerate()
            .filter(|(cell, kind)| {
                kind.is_walkable() && **kind != CellKind::PlayerSpawn && !occupied.contains(cell)
            })
            .map(|(cell, _)| cell)
            .collect();
        cells.shuffle(&mut self.rng);
        cells
    }
}
