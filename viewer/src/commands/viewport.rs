use governor::{ResizeRequest, Viewport};

use crate::state::{AppState, LoopStatus};

/// The drawable area changed (window resize, density change)
pub fn resize_viewport(
    state: &mut AppState,
    width: f64,
    height: f64,
    pixel_density: f64,
) -> Result<LoopStatus, String> {
    let viewport = Viewport::new(width, height, pixel_density);
    state
        .controller
        .on_resize(ResizeRequest::Viewport(viewport))
        .map_err(|e| e.to_string())?;
    // Samples measured at the old size say nothing about the new one
    state.controller.reset_stats();
    Ok(state.status())
}

/// User choice of the maximum grid extent
pub fn set_size_limit(state: &mut AppState, limit: u32) -> Result<LoopStatus, String> {
    state
        .controller
        .set_size_limit(limit)
        .map_err(|e| e.to_string())?;
    state.controller.reset_stats();
    Ok(state.status())
}
