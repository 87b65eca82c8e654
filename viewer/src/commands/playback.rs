use tracing::info;

use crate::state::{AppState, LoopStatus};

pub fn toggle_play_pause(state: &mut AppState) -> LoopStatus {
    state.controller.toggle_play_pause();
    state.status()
}

pub fn set_visibility(state: &mut AppState, hidden: bool) -> LoopStatus {
    state.controller.on_visibility_change(hidden);
    state.status()
}

/// User choice of steps per frame; this is the only way speed goes back up
pub fn set_speed(state: &mut AppState, speed: u32) -> Result<LoopStatus, String> {
    state.controller.set_speed(speed).map_err(|e| e.to_string())?;
    info!(speed, "Speed set by user");
    Ok(state.status())
}
