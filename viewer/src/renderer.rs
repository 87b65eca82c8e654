//! Text Renderer - headless stand-in for the canvas backend

use governor::{Renderer, Simulation};

use crate::universe::Universe;

#[derive(Debug, Default)]
pub struct TextRenderer {
    redraws: u64,
    drawn_cells: u64,
    last_population: u64,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    pub fn last_population(&self) -> u64 {
        self.last_population
    }

    /// Cells drawn since the last call
    pub fn take_drawn_cells(&mut self) -> u64 {
        std::mem::take(&mut self.drawn_cells)
    }

    /// Downsampled ASCII view, at most `max_cols` x `max_rows` characters.
    /// A character is `#` when any cell it covers is alive.
    pub fn snapshot(&self, universe: &Universe, max_cols: u32, max_rows: u32) -> String {
        let (width, height) = (universe.width(), universe.height());
        let step_x = width.div_ceil(max_cols.max(1)).max(1);
        let step_y = height.div_ceil(max_rows.max(1)).max(1);

        let mut out = String::new();
        for y in (0..height).step_by(step_y as usize) {
            for x in (0..width).step_by(step_x as usize) {
                let any_alive = (y..(y + step_y).min(height))
                    .any(|row| (x..(x + step_x).min(width)).any(|col| universe.is_alive(row, col)));
                out.push(if any_alive { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

impl Renderer<Universe> for TextRenderer {
    fn redraw(&mut self, universe: &Universe) {
        self.redraws += 1;
        self.drawn_cells += universe.width() as u64 * universe.height() as u64;
        self.last_population = universe.population();
    }
}
