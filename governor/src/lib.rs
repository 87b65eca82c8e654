//! Lifeview Governor
//!
//! Adaptive performance governor for a cellular automaton viewer. Measures the
//! frame rate over a sliding window, lowers simulation speed or grid density
//! when the hardware cannot keep up, and drives the render loop state machine.
//! Single-threaded: the host delivers frames and UI events one at a time.

pub mod config;
pub mod dimensions;
pub mod error;
pub mod frame_stats;
pub mod governor;
pub mod host;
pub mod render_loop;

pub use config::{GridConfig, RenderLoopConfig, ViewerConfig};
pub use dimensions::{DimensionPlanner, Dimensions, Viewport};
pub use error::{GovernorError, Result};
pub use frame_stats::{FrameStatsTracker, FrameSummary, WINDOW_SIZE};
pub use governor::{
    Decision, DegradeKind, DegradeNotice, DegradeTier, GovernorConfig, PerformanceGovernor,
    QualityLevel,
};
pub use host::{Clock, FrameHandle, FrameScheduler, Renderer, Simulation};
pub use render_loop::{LoopState, RenderLoopController, ResizeRequest, TickOutcome, VisibilityPolicy};
