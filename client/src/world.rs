//! Maze geometry derived from the server's grid
//!
//! The grid is the only input; walls and the gate are recomputed from it in
//! full whenever it changes. Nothing here is patched incrementally.

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{Cell, Grid, Vec3, SPAWN_ROW};

/// Spawn position used when the spawn row has no open cell.
pub const FALLBACK_SPAWN: Vec3 = Vec3::new(1.0, 0.0, 1.0);

/// Positional record for one wall cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallInstance {
    pub cell: (usize, usize),
    pub position: Vec3,
}

/// Positional record for the exit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gate {
    pub cell: (usize, usize),
    pub position: Vec3,
}

#[derive(Debug, Default)]
pub struct WorldState {
    grid: Grid,
    walls: Vec<WallInstance>,
    gate: Option<Gate>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the grid and drops all derived geometry until the next rebuild.
    pub fn set_grid(&mut self, grid: Grid) {
        self.grid = grid;
        self.walls.clear();
        self.gate = None;
    }

    /// Recomputes walls and gate from the current grid.
    ///
    /// Every wall cell yields one [`WallInstance`]. The gate sits on the open
    /// cell of the last row; when a malformed grid has several, the last one
    /// scanned wins.
    pub fn rebuild_geometry(&mut self) {
        self.walls.clear();
        self.gate = None;

        let last_row = self.grid.depth().checked_sub(1);
        let mut gate_candidates = 0;

        for (x, z, cell) in self.grid.iter() {
            match cell {
                Cell::Wall => self.walls.push(WallInstance {
                    cell: (x, z),
                    position: Vec3::from_cell(x, z),
                }),
                Cell::Open if Some(z) == last_row => {
                    gate_candidates += 1;
                    self.gate = Some(Gate {
                        cell: (x, z),
                        position: Vec3::from_cell(x, z),
                    });
                }
                Cell::Open => {}
            }
        }

        match gate_candidates {
            0 if self.grid.width() > 0 => warn!("Grid has no gate opening in its last row"),
            0 | 1 => {}
            n => warn!("Grid has {} gate openings, using the last one", n),
        }

        debug!(
            "Rebuilt geometry: {}x{} grid, {} walls",
            self.grid.width(),
            self.grid.depth(),
            self.walls.len()
        );
    }

    /// Picks a uniformly random open cell of the spawn row, or [`FALLBACK_SPAWN`].
    pub fn random_spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let open: Vec<usize> = (0..self.grid.width())
            .filter(|&x| self.grid.is_open(x, SPAWN_ROW))
            .collect();

        match open.choose(rng) {
            Some(&x) => Vec3::from_cell(x, SPAWN_ROW),
            None => {
                warn!("No open spawn cell, using fallback spawn");
                FALLBACK_SPAWN
            }
        }
    }

    /// True when `position` lies inside a cell the player may occupy.
    pub fn is_walkable(&self, position: Vec3) -> bool {
        position
            .cell()
            .is_some_and(|(x, z)| self.grid.is_open(x, z))
    }

    pub fn is_gate_cell(&self, position: Vec3) -> bool {
        match (self.gate, position.cell()) {
            (Some(gate), Some(cell)) => gate.cell == cell,
            _ => false,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn walls(&self) -> &[WallInstance] {
        &self.walls
    }

    pub fn gate(&self) -> Option<Gate> {
        self.gate
    }
}
