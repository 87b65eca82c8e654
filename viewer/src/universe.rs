//! Universe - toroidal Game of Life engine
//!
//! Rows are stepped in parallel. The engine counts cell updates so the virtual
//! display can charge a realistic frame cost.

use governor::{Dimensions, Simulation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

const ALIVE: u8 = 1;
const DEAD: u8 = 0;

/// Offsets of a glider heading down-right, relative to its center
const GLIDER: &[(i64, i64)] = &[(-1, 0), (0, 1), (1, -1), (1, 0), (1, 1)];

/// One quadrant of the period-3 pulsar; mirrored into the other three
const PULSAR_QUADRANT: &[(i64, i64)] = &[
    (-6, -4), (-6, -3), (-6, -2),
    (-4, -6), (-3, -6), (-2, -6),
    (-4, -1), (-3, -1), (-2, -1),
    (-1, -4), (-1, -3), (-1, -2),
];

pub struct Universe {
    width: u32,
    height: u32,
    cells: Vec<u8>,
    scratch: Vec<u8>,
    cell_size: f64,
    gap: f64,
    generation: u64,
    work: u64,
    rng: StdRng,
}

impl Universe {
    pub fn new(width: u32, height: u32, seed: u64) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![DEAD; len],
            scratch: vec![DEAD; len],
            cell_size: 1.0,
            gap: 0.0,
            generation: 0,
            work: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }

    fn wrap(&self, row: i64, col: i64) -> (u32, u32) {
        (
            row.rem_euclid(self.height as i64) as u32,
            col.rem_euclid(self.width as i64) as u32,
        )
    }

    pub fn is_alive(&self, row: u32, col: u32) -> bool {
        self.cells[self.index(row, col)] == ALIVE
    }

    pub fn set_alive(&mut self, row: u32, col: u32, alive: bool) {
        let idx = self.index(row, col);
        self.cells[idx] = if alive { ALIVE } else { DEAD };
    }

    pub fn toggle_cell(&mut self, row: u32, col: u32) {
        let idx = self.index(row, col);
        self.cells[idx] ^= ALIVE;
    }

    /// Stamp a glider centered on (row, col), wrapping at the edges
    pub fn insert_glider(&mut self, row: u32, col: u32) {
        self.stamp(row, col, GLIDER.iter().copied());
    }

    /// Stamp a pulsar centered on (row, col), wrapping at the edges
    pub fn insert_pulsar(&mut self, row: u32, col: u32) {
        let mirrored = PULSAR_QUADRANT.iter().flat_map(|&(r, c)| {
            [(r, c), (-r, c), (r, -c), (-r, -c)]
        });
        self.stamp(row, col, mirrored);
    }

    fn stamp(&mut self, row: u32, col: u32, offsets: impl Iterator<Item = (i64, i64)>) {
        for (dr, dc) in offsets {
            let (r, c) = self.wrap(row as i64 + dr, col as i64 + dc);
            self.set_alive(r, c, true);
        }
    }

    /// Fill every cell with a coin flip
    pub fn random_reset(&mut self) {
        let rng = &mut self.rng;
        for cell in self.cells.iter_mut() {
            *cell = if rng.gen_bool(0.5) { ALIVE } else { DEAD };
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(DEAD);
    }

    pub fn population(&self) -> u64 {
        self.cells.iter().filter(|&&c| c == ALIVE).count() as u64
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    pub fn buffer_bytes(&self) -> u64 {
        (self.cells.len() + self.scratch.len()) as u64
    }

    /// Cell updates performed since the last call
    pub fn take_work(&mut self) -> u64 {
        std::mem::take(&mut self.work)
    }

    fn step(&mut self) {
        let width = self.width as usize;
        let height = self.height as usize;
        let cells = &self.cells;

        self.scratch
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(row, out)| {
                let up = (row + height - 1) % height;
                let down = (row + 1) % height;
                for col in 0..width {
                    let left = (col + width - 1) % width;
                    let right = (col + 1) % width;
                    let neighbours = cells[up * width + left]
                        + cells[up * width + col]
                        + cells[up * width + right]
                        + cells[row * width + left]
                        + cells[row * width + right]
                        + cells[down * width + left]
                        + cells[down * width + col]
                        + cells[down * width + right];
                    let alive = cells[row * width + col] == ALIVE;
                    out[col] = match (alive, neighbours) {
                        (true, 2) | (true, 3) | (false, 3) => ALIVE,
                        _ => DEAD,
                    };
                }
            });

        std::mem::swap(&mut self.cells, &mut self.scratch);
        self.generation += 1;
        self.work += self.cells.len() as u64;
    }
}

impl Simulation for Universe {
    fn advance(&mut self, steps: u32) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Keep the overlapping top-left region; new cells start dead
    fn resize(&mut self, dimensions: &Dimensions) {
        let (width, height) = (dimensions.width, dimensions.height);
        self.cell_size = dimensions.cell_size;
        self.gap = dimensions.gap;
        if width == self.width && height == self.height {
            return;
        }

        let mut cells = vec![DEAD; width as usize * height as usize];
        let keep_w = width.min(self.width) as usize;
        for row in 0..height.min(self.height) as usize {
            let src = row * self.width as usize;
            let dst = row * width as usize;
            cells[dst..dst + keep_w].copy_from_slice(&self.cells[src..src + keep_w]);
        }

        self.width = width;
        self.height = height;
        self.scratch = vec![DEAD; cells.len()];
        self.cells = cells;
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}
