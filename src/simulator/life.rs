//! Conway's Game of Life on a toroidal square grid.
//!
//! The design point carries one coordinate, the grid side length. A random soup
//! is seeded in a centred square and the response is the fraction of live cells
//! after the configured number of generations.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use rand::Rng;
use serde::Serialize;

use crate::core::config::LifeConfig;
use crate::core::errors::{AsbError, Result};
use crate::simulator::{Simulator, point_rng};

/// Dense toroidal cell grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeGrid {
    size: usize,
    cells: Vec<bool>,
}

impl LifeGrid {
    #[must_use]
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![false; size * size],
        }
    }

    /// Random soup of side `soup_width` centred on the grid; each soup cell is
    /// alive with probability `density`.
    pub fn soup<R: Rng + ?Sized>(size: usize, soup_width: usize, density: f64, rng: &mut R) -> Self {
        let mut grid = Self::empty(size);
        let width = soup_width.min(size);
        let offset = (size - width) / 2;
        for row in offset..offset + width {
            for col in offset..offset + width {
                if rng.random::<f64>() < density {
                    grid.set(row, col, true);
                }
            }
        }
        grid
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, alive: bool) {
        self.cells[row * self.size + col] = alive;
    }

    #[must_use]
    pub fn alive(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    #[must_use]
    pub fn density(&self) -> f64 {
        if self.cells.is_empty() {
            0.0
        } else {
            self.alive() as f64 / self.cells.len() as f64
        }
    }

    fn live_neighbours(&self, row: usize, col: usize) -> u8 {
        let n = self.size;
        let mut count = 0;
        for dr in [n - 1, 0, 1] {
            for dc in [n - 1, 0, 1] {
                if (dr, dc) == (0, 0) {
                    continue;
                }
                if self.get((row + dr) % n, (col + dc) % n) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Advance one generation (B3/S23).
    #[must_use]
    pub fn step(&self) -> Self {
        let mut next = Self::empty(self.size);
        for row in 0..self.size {
            for col in 0..self.size {
                let alive = matches!(
                    (self.get(row, col), self.live_neighbours(row, col)),
                    (true, 2 | 3) | (false, 3)
                );
                next.set(row, col, alive);
            }
        }
        next
    }
}

/// Trajectory statistics of one Game of Life run.
#[derive(Debug, Clone, Serialize)]
pub struct LifeSummary {
    pub grid_size: usize,
    pub generations: usize,
    pub initial_alive: usize,
    pub final_alive: usize,
    pub peak_alive: usize,
    pub final_density: f64,
}

#[derive(Debug, Clone)]
pub struct GameOfLife {
    config: LifeConfig,
}

impl GameOfLife {
    #[must_use]
    pub const fn new(config: LifeConfig) -> Self {
        Self { config }
    }

    /// Evolve a fresh soup for `generations` steps.
    pub fn run<R: Rng + ?Sized>(
        &self,
        grid_size: usize,
        soup_width: usize,
        generations: usize,
        rng: &mut R,
    ) -> LifeSummary {
        let density = self.config.initial_density_pct / 100.0;
        let mut grid = LifeGrid::soup(grid_size, soup_width, density, rng);
        let initial_alive = grid.alive();
        let mut peak_alive = initial_alive;
        for _ in 0..generations {
            grid = grid.step();
            peak_alive = peak_alive.max(grid.alive());
        }
        LifeSummary {
            grid_size,
            generations,
            initial_alive,
            final_alive: grid.alive(),
            peak_alive,
            final_density: grid.density(),
        }
    }
}

/// Largest grid side accepted; the grid holds `side * side` cells.
pub const MAX_GRID_SIZE: usize = 10_000;

/// Interpret a continuous coordinate as a grid side length in `[0, MAX_GRID_SIZE]`.
pub(crate) fn cells_from(value: f64, what: &str) -> Result<usize> {
    if !value.is_finite() || value < 0.0 {
        return Err(AsbError::InvalidInput {
            details: format!("{what} must be a finite non-negative number, got {value}"),
        });
    }
    let cells = value.round();
    if cells > MAX_GRID_SIZE as f64 {
        return Err(AsbError::InvalidInput {
            details: format!("{what} must be at most {MAX_GRID_SIZE}, got {value}"),
        });
    }
    Ok(cells as usize)
}

impl Simulator for GameOfLife {
    fn name(&self) -> &str {
        "game-of-life"
    }

    fn dimensions(&self) -> usize {
        1
    }

    fn evaluate(&self, point: &[f64]) -> Result<f64> {
        let &[raw_size] = point else {
            return Err(AsbError::DimensionMismatch {
                context: "game-of-life parameters",
                expected: 1,
                actual: point.len(),
                index: 0,
            });
        };
        let size = cells_from(raw_size, "gridSize")?;
        let mut rng = point_rng(self.config.seed, point);
        Ok(self
            .run(size, size, self.config.periods, &mut rng)
            .final_density)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn life(periods: usize) -> GameOfLife {
        GameOfLife::new(LifeConfig {
            periods,
            initial_density_pct: 35.0,
            seed: Some(5),
        })
    }

    #[test]
    fn blinker_oscillates_with_period_two() {
        let mut grid = LifeGrid::empty(5);
        for col in 1..4 {
            grid.set(2, col, true);
        }
        let next = grid.step();
        assert!(next.get(1, 2) && next.get(2, 2) && next.get(3, 2));
        assert_eq!(next.alive(), 3);
        assert_eq!(next.step(), grid);
    }

    #[test]
    fn block_is_still_life() {
        let mut grid = LifeGrid::empty(6);
        for (r, c) in [(2, 2), (2, 3), (3, 2), (3, 3)] {
            grid.set(r, c, true);
        }
        assert_eq!(grid.step(), grid);
    }

    #[test]
    fn edges_wrap_around() {
        let mut grid = LifeGrid::empty(5);
        // Vertical blinker straddling the top/bottom edge.
        grid.set(4, 0, true);
        grid.set(0, 0, true);
        grid.set(1, 0, true);
        let next = grid.step();
        assert!(next.get(0, 4) && next.get(0, 0) && next.get(0, 1));
        assert_eq!(next.alive(), 3);
    }

    #[test]
    fn soup_is_confined_to_centre_square() {
        let mut rng = StdRng::seed_from_u64(4);
        let grid = LifeGrid::soup(20, 6, 1.0, &mut rng);
        assert_eq!(grid.alive(), 36);
        assert!(grid.get(7, 7) && grid.get(12, 12));
        assert!(!grid.get(6, 6) && !grid.get(13, 13));
    }

    #[test]
    fn density_stays_in_unit_interval() {
        let sim = life(30);
        for size in [0.0, 1.0, 7.4, 40.0] {
            let d = sim.evaluate(&[size]).unwrap();
            assert!((0.0..=1.0).contains(&d), "size {size}: {d}");
        }
    }

    #[test]
    fn run_summary_tracks_peak() {
        let mut rng = StdRng::seed_from_u64(11);
        let summary = life(0).run(30, 10, 20, &mut rng);
        assert_eq!(summary.generations, 20);
        assert!(summary.peak_alive >= summary.initial_alive);
        assert!(summary.peak_alive >= summary.final_alive);
    }

    #[test]
    fn negative_grid_size_rejected() {
        assert!(life(5).evaluate(&[-3.0]).is_err());
        assert!(life(5).evaluate(&[3.0, 4.0]).is_err());
    }

    #[test]
    fn oversized_grid_rejected_before_allocation() {
        let err = life(5).evaluate(&[1e10]).unwrap_err();
        assert!(matches!(err, AsbError::InvalidInput { .. }), "{err}");
        assert!(cells_from(MAX_GRID_SIZE as f64, "gridSize").is_ok());
        assert!(cells_from(MAX_GRID_SIZE as f64 + 1.0, "gridSize").is_err());
    }
}
