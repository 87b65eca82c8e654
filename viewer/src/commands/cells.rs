use governor::Simulation;

use crate::state::{AppState, CellEditResult};

fn edit<F>(state: &mut AppState, row: u32, col: u32, f: F) -> Result<CellEditResult, String>
where
    F: FnOnce(&mut crate::universe::Universe, u32, u32),
{
    let universe = state.controller.simulation_mut();
    if row >= universe.height() || col >= universe.width() {
        return Err(format!(
            "Cell ({}, {}) is outside the {}x{} grid",
            row,
            col,
            universe.width(),
            universe.height()
        ));
    }
    f(universe, row, col);
    state.controller.redraw();
    Ok(result(state))
}

fn result(state: &AppState) -> CellEditResult {
    CellEditResult {
        population: state.controller.renderer().last_population(),
        generation: state.controller.simulation().generation(),
    }
}

pub fn toggle_cell(state: &mut AppState, row: u32, col: u32) -> Result<CellEditResult, String> {
    edit(state, row, col, |u, r, c| u.toggle_cell(r, c))
}

pub fn insert_glider(state: &mut AppState, row: u32, col: u32) -> Result<CellEditResult, String> {
    edit(state, row, col, |u, r, c| u.insert_glider(r, c))
}

pub fn insert_pulsar(state: &mut AppState, row: u32, col: u32) -> Result<CellEditResult, String> {
    edit(state, row, col, |u, r, c| u.insert_pulsar(r, c))
}

pub fn random_reset(state: &mut AppState) -> CellEditResult {
    state.controller.simulation_mut().random_reset();
    state.controller.redraw();
    result(state)
}

pub fn clear(state: &mut AppState) -> CellEditResult {
    state.controller.simulation_mut().clear();
    state.controller.redraw();
    result(state)
}
