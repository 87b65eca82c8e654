use chrono::{DateTime, Utc};
use governor::{
    DegradeKind, DegradeNotice, Dimensions, FrameSummary, LoopState, QualityLevel,
    RenderLoopController, Simulation, ViewerConfig, Viewport,
};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

use crate::host::{HardwareProfile, VirtualDisplay};
use crate::renderer::TextRenderer;
use crate::universe::Universe;

pub type ViewerLoop = RenderLoopController<Universe, TextRenderer, VirtualDisplay>;

/// Session state shared by every command
pub struct AppState {
    pub controller: ViewerLoop,
    pub config: ViewerConfig,
    pub notices: Rc<RefCell<Vec<NoticeEvent>>>,
    pub seed: u64,
}

impl AppState {
    pub fn new(
        config: ViewerConfig,
        viewport: Viewport,
        hardware: HardwareProfile,
        seed: u64,
    ) -> anyhow::Result<Self> {
        let display = VirtualDisplay::new(hardware, seed)?;
        let mut controller = RenderLoopController::new(
            Universe::new(1, 1, seed),
            TextRenderer::new(),
            display,
            viewport,
            &config,
        )?;

        let notices = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&notices);
        controller.on_notice(move |notice: &DegradeNotice| {
            sink.borrow_mut().push(NoticeEvent::from(notice));
        });

        controller.simulation_mut().random_reset();
        controller.redraw();

        Ok(Self {
            controller,
            config,
            notices,
            seed,
        })
    }

    pub fn status(&self) -> LoopStatus {
        let c = &self.controller;
        LoopStatus {
            state: c.state(),
            page_hidden: c.is_page_hidden(),
            quality: c.quality(),
            exhausted: c.is_exhausted(),
            dimensions: c.dimensions(),
            generation: c.simulation().generation(),
            population: c.renderer().last_population(),
        }
    }
}

// -- Serializable types returned by commands --

#[derive(Serialize, Clone, Debug)]
pub struct NoticeEvent {
    pub at: DateTime<Utc>,
    pub kind: DegradeKind,
    pub message: String,
    pub mean_fps: f64,
    pub speed: u32,
    pub size_limit: u32,
    pub width: u32,
    pub height: u32,
}

impl From<&DegradeNotice> for NoticeEvent {
    fn from(notice: &DegradeNotice) -> Self {
        Self {
            at: Utc::now(),
            kind: notice.kind,
            message: notice.message.clone(),
            mean_fps: notice.mean_fps,
            speed: notice.quality.speed,
            size_limit: notice.quality.size_limit,
            width: notice.dimensions.width,
            height: notice.dimensions.height,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct LoopStatus {
    pub state: LoopState,
    pub page_hidden: bool,
    pub quality: QualityLevel,
    pub exhausted: bool,
    pub dimensions: Dimensions,
    pub generation: u64,
    pub population: u64,
}

#[derive(Serialize, Clone, Debug)]
pub struct FrameStatsData {
    pub latest: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl From<FrameSummary> for FrameStatsData {
    fn from(summary: FrameSummary) -> Self {
        // Whole frames per second, as the stats panel shows them
        Self {
            latest: summary.latest.round(),
            mean: summary.mean.round(),
            min: summary.min.round(),
            max: summary.max.round(),
            samples: summary.samples,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct CellEditResult {
    pub population: u64,
    pub generation: u64,
}

#[derive(Serialize, Clone, Debug)]
pub struct SchedulerStats {
    pub requested: u64,
    pub cancelled: u64,
    pub outstanding: usize,
    pub refresh_ms: f64,
    pub clock_ms: f64,
}

#[derive(Serialize, Clone, Debug)]
pub struct MemoryUsage {
    pub physical_mem: u64,
    pub virtual_mem: u64,
    /// Bytes held by the engine's cell buffers
    pub grid_bytes: u64,
    pub cells: u64,
}

#[derive(Serialize, Clone, Debug)]
pub struct SessionSummary {
    pub seed: u64,
    pub frames: u64,
    pub ticks: u64,
    pub status: LoopStatus,
    pub frame_stats: FrameStatsData,
    pub scheduler: SchedulerStats,
    pub notices: Vec<NoticeEvent>,
    pub memory: MemoryUsage,
    pub snapshot: String,
}

/// True when the engine runs at the planned layout
pub fn layout_matches(state: &AppState) -> bool {
    let dims = state.controller.dimensions();
    let sim = state.controller.simulation();
    sim.width() == dims.width && sim.height() == dims.height
}
