//! Host Interfaces - what the render loop needs from the outside world
//!
//! The simulation engine, the renderer, the clock and the per-refresh scheduler
//! are all owned elsewhere. The loop only talks to them through these traits.

use serde::Serialize;

use crate::dimensions::Dimensions;

/// Cellular automaton engine driven by the loop
pub trait Simulation {
    /// Run `steps` generations
    fn advance(&mut self, steps: u32);

    /// Adopt a new grid layout
    fn resize(&mut self, dimensions: &Dimensions);

    fn width(&self) -> u32;

    fn height(&self) -> u32;
}

/// Draws whatever state the simulation is currently in
pub trait Renderer<S: ?Sized> {
    fn redraw(&mut self, simulation: &S);
}

/// Monotonic milliseconds
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Token for one requested display-refresh callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FrameHandle(pub u64);

/// Schedule-once, cancelable per-refresh callbacks.
///
/// The host calls `RenderLoopController::on_frame` with the handle when the
/// refresh arrives. A canceled handle must never be delivered.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);
}
