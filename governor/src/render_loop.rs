//! Render Loop Controller - play/pause, visibility and resize state machine
//!
//! Owns the frame tracker and the governor, and keeps at most one frame
//! callback outstanding at any time.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::config::ViewerConfig;
use crate::dimensions::{DimensionPlanner, Dimensions, Viewport};
use crate::error::Result;
use crate::frame_stats::{FrameStatsTracker, FrameSummary};
use crate::governor::{Decision, DegradeKind, DegradeNotice, PerformanceGovernor, QualityLevel};
use crate::host::{Clock, FrameHandle, FrameScheduler, Renderer, Simulation};

// ============================================================================
// States and requests
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Paused by the user, nothing scheduled
    Stopped,
    /// A frame callback is outstanding
    Running,
    /// Was running when the page became hidden, nothing scheduled
    Hidden,
}

/// What happens when the page becomes visible again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityPolicy {
    /// Resume only if the loop was running when the page was hidden
    #[default]
    RespectPause,
    /// Always start the loop, even if the user had paused it
    AlwaysResume,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeRequest {
    /// The drawable area changed
    Viewport(Viewport),
    /// The user picked a new maximum grid extent
    SizeLimit(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stale or unexpected frame, nothing ran
    Ignored,
    Advanced { steps: u32 },
    Degraded(DegradeKind),
}

type NoticeSink = Box<dyn FnMut(&DegradeNotice)>;

// ============================================================================
// Controller
// ============================================================================

pub struct RenderLoopController<S, R, H> {
    simulation: S,
    renderer: R,
    host: H,
    governor: PerformanceGovernor,
    tracker: FrameStatsTracker,
    viewport: Viewport,
    gap: f64,
    dimensions: Dimensions,
    state: LoopState,
    pending: Option<FrameHandle>,
    page_hidden: bool,
    visibility: VisibilityPolicy,
    notice_sink: Option<NoticeSink>,
}

impl<S, R, H> RenderLoopController<S, R, H>
where
    S: Simulation,
    R: Renderer<S>,
    H: Clock + FrameScheduler,
{
    /// Size the simulation for `viewport` and draw it once. The loop starts stopped.
    pub fn new(
        mut simulation: S,
        mut renderer: R,
        host: H,
        viewport: Viewport,
        config: &ViewerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let planner = DimensionPlanner::new(config.grid.min_scale);
        let governor = PerformanceGovernor::new(config.governor.clone(), planner)?;
        let dimensions = governor.plan(viewport, config.grid.gap)?;

        simulation.resize(&dimensions);
        renderer.redraw(&simulation);
        info!(
            width = dimensions.width,
            height = dimensions.height,
            cell_size = dimensions.cell_size,
            "Render loop ready"
        );

        let tracker = FrameStatsTracker::new(host.now_ms());
        Ok(Self {
            simulation,
            renderer,
            host,
            governor,
            tracker,
            viewport,
            gap: config.grid.gap,
            dimensions,
            state: LoopState::Stopped,
            pending: None,
            page_hidden: false,
            visibility: config.render_loop.visibility,
            notice_sink: None,
        })
    }

    /// Receive every degrade notice as it happens
    pub fn on_notice<F>(&mut self, sink: F)
    where
        F: FnMut(&DegradeNotice) + 'static,
    {
        self.notice_sink = Some(Box::new(sink));
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    pub fn toggle_play_pause(&mut self) -> LoopState {
        match self.state {
            LoopState::Stopped if self.page_hidden => {
                // Play pressed while hidden: start once the page is visible
                self.state = LoopState::Hidden;
            }
            LoopState::Stopped => self.start(),
            LoopState::Running | LoopState::Hidden => {
                self.cancel_pending();
                self.state = LoopState::Stopped;
            }
        }
        info!(state = ?self.state, "Play/pause toggled");
        self.state
    }

    pub fn on_visibility_change(&mut self, hidden: bool) {
        if hidden == self.page_hidden {
            return;
        }
        self.page_hidden = hidden;

        if hidden {
            if self.state == LoopState::Running {
                self.cancel_pending();
                self.state = LoopState::Hidden;
                info!("Page hidden, render loop suspended");
            }
            return;
        }

        match (self.state, self.visibility) {
            (LoopState::Hidden, _) | (LoopState::Stopped, VisibilityPolicy::AlwaysResume) => {
                self.start();
                info!("Page visible, render loop resumed");
            }
            _ => debug!(state = ?self.state, "Page visible, loop left as is"),
        }
    }

    /// Run one governed tick for a delivered frame callback
    pub fn on_frame(&mut self, handle: FrameHandle) -> Result<TickOutcome> {
        if self.pending != Some(handle) || self.state != LoopState::Running {
            warn!(?handle, pending = ?self.pending, state = ?self.state, "Ignoring stale frame");
            return Ok(TickOutcome::Ignored);
        }
        self.pending = None;

        let stats = self.tracker.record(self.host.now_ms());
        trace!(mean_fps = stats.mean, samples = stats.samples, "Frame recorded");

        let decision = match self
            .governor
            .evaluate(&stats, self.viewport, self.gap, &self.dimensions)
        {
            Ok(decision) => decision,
            Err(e) => {
                error!("Degrade planning failed, stopping render loop: {}", e);
                self.state = LoopState::Stopped;
                return Err(e);
            }
        };
        if decision.resets_window() {
            self.tracker.reset();
        }

        match decision {
            Decision::Advance { steps } | Decision::Exhausted { steps } => {
                self.simulation.advance(steps);
                self.renderer.redraw(&self.simulation);
                self.schedule();
                Ok(TickOutcome::Advanced { steps })
            }
            Decision::Degraded(notice) => {
                let was_running = self.pause();
                self.apply(notice.dimensions);
                self.resume(was_running);
                if let Some(sink) = self.notice_sink.as_mut() {
                    sink(&notice);
                }
                Ok(TickOutcome::Degraded(notice.kind))
            }
        }
    }

    /// Re-plan the grid for a new viewport or size limit. The loop is paused
    /// around the change; on error the previous layout stays in force.
    pub fn on_resize(&mut self, request: ResizeRequest) -> Result<Dimensions> {
        let was_running = self.pause();

        let planned = match request {
            ResizeRequest::Viewport(viewport) => self
                .governor
                .plan(viewport, self.gap)
                .map(|dimensions| (viewport, dimensions)),
            ResizeRequest::SizeLimit(limit) => self
                .governor
                .set_size_limit(limit, self.viewport, self.gap)
                .map(|dimensions| (self.viewport, dimensions)),
        };

        let result = planned.map(|(viewport, dimensions)| {
            if viewport != self.viewport {
                self.governor.clear_size_block();
            }
            self.viewport = viewport;
            self.apply(dimensions);
            dimensions
        });
        self.resume(was_running);
        result
    }

    /// Explicit user choice of grid extent, applied through the resize bracket
    pub fn set_size_limit(&mut self, limit: u32) -> Result<Dimensions> {
        self.on_resize(ResizeRequest::SizeLimit(limit))
    }

    /// Explicit user choice of steps per frame
    pub fn set_speed(&mut self, speed: u32) -> Result<()> {
        self.governor.set_speed(speed)
    }

    /// Drop all frame samples on request
    pub fn reset_stats(&mut self) {
        self.tracker.reset();
    }

    // ------------------------------------------------------------------------
    // Scheduling internals
    // ------------------------------------------------------------------------

    fn start(&mut self) {
        self.tracker.rebase(self.host.now_ms());
        self.state = LoopState::Running;
        self.schedule();
    }

    fn schedule(&mut self) {
        self.cancel_pending();
        self.pending = Some(self.host.request_frame());
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.host.cancel_frame(handle);
        }
    }

    fn pause(&mut self) -> bool {
        self.cancel_pending();
        self.state == LoopState::Running
    }

    fn resume(&mut self, was_running: bool) {
        if was_running {
            self.schedule();
        }
    }

    fn apply(&mut self, dimensions: Dimensions) {
        debug!(
            width = dimensions.width,
            height = dimensions.height,
            cell_size = dimensions.cell_size,
            "Resizing simulation"
        );
        self.simulation.resize(&dimensions);
        self.dimensions = dimensions;
        self.renderer.redraw(&self.simulation);
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn is_page_hidden(&self) -> bool {
        self.page_hidden
    }

    pub fn quality(&self) -> QualityLevel {
        self.governor.quality()
    }

    pub fn is_exhausted(&self) -> bool {
        self.governor.is_exhausted()
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frame_summary(&self) -> FrameSummary {
        self.tracker.summary()
    }

    pub fn simulation(&self) -> &S {
        &self.simulation
    }

    /// Direct engine access for edits outside the loop (toggling cells, resets)
    pub fn simulation_mut(&mut self) -> &mut S {
        &mut self.simulation
    }

    /// Redraw after an edit made through `simulation_mut`
    pub fn redraw(&mut self) {
        self.renderer.redraw(&self.simulation);
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::GovernorConfig;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeHost {
        now: f64,
        next: u64,
        requested: Vec<FrameHandle>,
        cancelled: Vec<FrameHandle>,
    }

    impl Clock for FakeHost {
        fn now_ms(&self) -> f64 {
            self.now
        }
    }

    impl FrameScheduler for FakeHost {
        fn request_frame(&mut self) -> FrameHandle {
            self.next += 1;
            let handle = FrameHandle(self.next);
            self.requested.push(handle);
            handle
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.cancelled.push(handle);
        }
    }

    #[derive(Default)]
    struct FakeSim {
        width: u32,
        height: u32,
        generations: u64,
        resizes: Vec<Dimensions>,
    }

    impl Simulation for FakeSim {
        fn advance(&mut self, steps: u32) {
            self.generations += steps as u64;
        }

        fn resize(&mut self, dimensions: &Dimensions) {
            self.width = dimensions.width;
            self.height = dimensions.height;
            self.resizes.push(*dimensions);
        }

        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }
    }

    #[derive(Default)]
    struct FakeRenderer {
        redraws: u32,
    }

    impl Renderer<FakeSim> for FakeRenderer {
        fn redraw(&mut self, _simulation: &FakeSim) {
            self.redraws += 1;
        }
    }

    type Controller = RenderLoopController<FakeSim, FakeRenderer, FakeHost>;

    fn controller_with(config: ViewerConfig) -> Controller {
        RenderLoopController::new(
            FakeSim::default(),
            FakeRenderer::default(),
            FakeHost::default(),
            Viewport::new(1280.0, 720.0, 1.0),
            &config,
        )
        .unwrap()
    }

    fn controller() -> Controller {
        controller_with(ViewerConfig::default())
    }

    /// Advance the clock by `dt` and deliver the outstanding frame
    fn frame(ctl: &mut Controller, dt: f64) -> TickOutcome {
        ctl.host_mut().now += dt;
        let handle = ctl.pending_frame().expect("frame should be scheduled");
        ctl.on_frame(handle).unwrap()
    }

    #[test]
    fn test_starts_stopped_and_sized() {
        let ctl = controller();

        assert_eq!(ctl.state(), LoopState::Stopped);
        assert_eq!(ctl.pending_frame(), None);
        assert!(ctl.host().requested.is_empty());
        assert_eq!(ctl.simulation().resizes.len(), 1);
        assert_eq!(ctl.simulation().width(), ctl.dimensions().width);
        assert_eq!(ctl.renderer().redraws, 1);
    }

    #[test]
    fn test_double_toggle_returns_to_stopped() {
        let mut ctl = controller();

        assert_eq!(ctl.toggle_play_pause(), LoopState::Running);
        let handle = ctl.pending_frame().unwrap();
        assert_eq!(ctl.toggle_play_pause(), LoopState::Stopped);

        assert_eq!(ctl.pending_frame(), None);
        assert_eq!(ctl.host().requested, vec![handle]);
        assert_eq!(ctl.host().cancelled, vec![handle]);

        // A late delivery of the canceled frame must not tick
        assert_eq!(ctl.on_frame(handle).unwrap(), TickOutcome::Ignored);
        assert_eq!(ctl.simulation().generations, 0);
    }

    #[test]
    fn test_tick_advances_and_reschedules() {
        let mut ctl = controller();
        ctl.toggle_play_pause();

        let outcome = frame(&mut ctl, 16.0);
        assert_eq!(outcome, TickOutcome::Advanced { steps: 5 });
        assert_eq!(ctl.simulation().generations, 5);
        assert_eq!(ctl.renderer().redraws, 2);
        assert_eq!(ctl.state(), LoopState::Running);
        assert_eq!(ctl.host().requested.len(), 2);
        assert_eq!(ctl.frame_summary().samples, 1);
    }

    #[test]
    fn test_stale_handle_ignored() {
        let mut ctl = controller();
        ctl.toggle_play_pause();
        let first = ctl.pending_frame().unwrap();
        frame(&mut ctl, 16.0);

        assert_eq!(ctl.on_frame(first).unwrap(), TickOutcome::Ignored);
        assert_eq!(ctl.simulation().generations, 5);
    }

    #[test]
    fn test_hide_show_cancels_and_reschedules_once() {
        let mut ctl = controller();
        ctl.toggle_play_pause();
        frame(&mut ctl, 16.0);
        let requested = ctl.host().requested.len();
        let cancelled = ctl.host().cancelled.len();

        ctl.on_visibility_change(true);
        assert_eq!(ctl.state(), LoopState::Hidden);
        assert_eq!(ctl.pending_frame(), None);

        // Repeated notifications change nothing
        ctl.on_visibility_change(true);
        ctl.on_visibility_change(false);
        ctl.on_visibility_change(false);

        assert_eq!(ctl.state(), LoopState::Running);
        assert_eq!(ctl.host().cancelled.len(), cancelled + 1);
        assert_eq!(ctl.host().requested.len(), requested + 1);
        assert_eq!(ctl.pending_frame(), ctl.host().requested.last().copied());
    }

    #[test]
    fn test_hidden_gap_not_measured() {
        let mut ctl = controller();
        ctl.toggle_play_pause();
        frame(&mut ctl, 20.0);

        ctl.on_visibility_change(true);
        ctl.host_mut().now += 60_000.0;
        ctl.on_visibility_change(false);
        frame(&mut ctl, 20.0);

        assert_eq!(ctl.frame_summary().min, 50.0);
    }

    #[test]
    fn test_show_respects_user_pause() {
        let mut ctl = controller();
        ctl.on_visibility_change(true);
        ctl.on_visibility_change(false);

        assert_eq!(ctl.state(), LoopState::Stopped);
        assert!(ctl.host().requested.is_empty());
    }

    #[test]
    fn test_show_always_resume_policy() {
        let mut config = ViewerConfig::default();
        config.render_loop.visibility = VisibilityPolicy::AlwaysResume;
        let mut ctl = controller_with(config);

        ctl.on_visibility_change(true);
        ctl.on_visibility_change(false);

        assert_eq!(ctl.state(), LoopState::Running);
        assert_eq!(ctl.host().requested.len(), 1);
    }

    #[test]
    fn test_pause_while_hidden_sticks() {
        let mut ctl = controller();
        ctl.toggle_play_pause();
        ctl.on_visibility_change(true);

        assert_eq!(ctl.toggle_play_pause(), LoopState::Stopped);
        ctl.on_visibility_change(false);
        assert_eq!(ctl.state(), LoopState::Stopped);
    }

    #[test]
    fn test_play_while_hidden_waits_for_show() {
        let mut ctl = controller();
        ctl.on_visibility_change(true);

        assert_eq!(ctl.toggle_play_pause(), LoopState::Hidden);
        assert!(ctl.host().requested.is_empty());

        ctl.on_visibility_change(false);
        assert_eq!(ctl.state(), LoopState::Running);
        assert!(ctl.pending_frame().is_some());
    }

    #[test]
    fn test_slow_frames_degrade_throughput() {
        let mut ctl = controller();
        let notices = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&notices);
        ctl.on_notice(move |notice| sink.borrow_mut().push(notice.clone()));
        ctl.toggle_play_pause();

        // 5 fps: the 10-sample tier fires on the tenth frame
        for _ in 0..9 {
            assert_eq!(frame(&mut ctl, 200.0), TickOutcome::Advanced { steps: 5 });
        }
        assert_eq!(frame(&mut ctl, 200.0), TickOutcome::Degraded(DegradeKind::Throughput));

        assert_eq!(ctl.quality().speed, 4);
        assert_eq!(ctl.frame_summary().samples, 0);
        assert_eq!(ctl.simulation().generations, 45);
        assert_eq!(ctl.simulation().resizes.len(), 2);
        assert_eq!(ctl.state(), LoopState::Running);
        assert!(ctl.pending_frame().is_some());

        let notices = notices.borrow();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, DegradeKind::Throughput);

        assert_eq!(frame(&mut ctl, 200.0), TickOutcome::Advanced { steps: 4 });
    }

    #[test]
    fn test_slow_frames_degrade_grid_size() {
        let mut config = ViewerConfig::default();
        config.governor.initial_speed = 1;
        let mut ctl = controller_with(config);
        let notices = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&notices);
        ctl.on_notice(move |notice| sink.borrow_mut().push(notice.clone()));
        ctl.toggle_play_pause();
        let before = ctl.dimensions();

        // 20 fps only trips the 100-sample tier
        for _ in 0..99 {
            assert_eq!(frame(&mut ctl, 50.0), TickOutcome::Advanced { steps: 1 });
        }
        let requested = ctl.host().requested.len();
        assert_eq!(frame(&mut ctl, 50.0), TickOutcome::Degraded(DegradeKind::GridSize));

        // The delivered frame was consumed, so the bracket schedules exactly one more
        assert!(ctl.host().cancelled.is_empty());
        assert_eq!(ctl.host().requested.len(), requested + 1);
        assert_eq!(ctl.pending_frame(), ctl.host().requested.last().copied());
        assert_eq!(ctl.state(), LoopState::Running);

        assert_eq!(ctl.simulation().resizes.len(), 2);
        assert!(ctl.dimensions().cell_size > before.cell_size);
        assert_eq!(ctl.simulation().width(), ctl.dimensions().width);
        assert_eq!(ctl.simulation().generations, 99);
        assert_eq!(ctl.frame_summary().samples, 0);
        assert_eq!(ctl.quality().speed, 1);
        assert!(ctl.quality().size_limit < 512);

        {
            let notices = notices.borrow();
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].kind, DegradeKind::GridSize);
            assert_eq!(notices[0].dimensions, ctl.dimensions());
        }

        for _ in 0..80 {
            assert_eq!(frame(&mut ctl, 50.0), TickOutcome::Advanced { steps: 1 });
        }
        assert_eq!(ctl.simulation().generations, 179);
        assert_eq!(notices.borrow().len(), 1);
    }

    #[test]
    fn test_thin_viewport_absorbs_size_degrade() {
        let mut config = ViewerConfig::default();
        config.governor.initial_speed = 1;
        config.governor.initial_size_limit = 64;
        let mut ctl = RenderLoopController::new(
            FakeSim::default(),
            FakeRenderer::default(),
            FakeHost::default(),
            Viewport::new(1000.0, 20.0, 1.0),
            &config,
        )
        .unwrap();
        ctl.toggle_play_pause();
        assert_eq!((ctl.dimensions().width, ctl.dimensions().height), (62, 1));

        for _ in 0..300 {
            assert_eq!(frame(&mut ctl, 500.0), TickOutcome::Advanced { steps: 1 });
        }
        assert_eq!(ctl.state(), LoopState::Running);
        assert!(ctl.pending_frame().is_some());
        assert!(ctl.is_exhausted());
        assert_eq!(ctl.quality().size_limit, 64);
        assert_eq!(ctl.simulation().resizes.len(), 1);
        assert_eq!(ctl.simulation().generations, 300);

        // A taller viewport makes a coarser grid possible again
        ctl.on_resize(ResizeRequest::Viewport(Viewport::new(1000.0, 200.0, 1.0)))
            .unwrap();
        assert!(!ctl.is_exhausted());
    }

    #[test]
    fn test_exhausted_loop_keeps_advancing() {
        let mut config = ViewerConfig::default();
        config.governor = GovernorConfig {
            initial_speed: 1,
            initial_size_limit: 32,
            ..GovernorConfig::default()
        };
        let mut ctl = controller_with(config);
        ctl.toggle_play_pause();

        for _ in 0..30 {
            assert_eq!(frame(&mut ctl, 500.0), TickOutcome::Advanced { steps: 1 });
        }
        assert!(ctl.is_exhausted());
        assert_eq!(ctl.simulation().resizes.len(), 1);
        assert!(ctl.frame_summary().samples < 10);
    }

    #[test]
    fn test_resize_while_running_brackets() {
        let mut ctl = controller();
        ctl.toggle_play_pause();
        let before = ctl.pending_frame().unwrap();

        let dims = ctl
            .on_resize(ResizeRequest::Viewport(Viewport::new(640.0, 480.0, 1.0)))
            .unwrap();

        assert_eq!(ctl.host().cancelled, vec![before]);
        assert_eq!(ctl.host().requested.len(), 2);
        assert_eq!(ctl.state(), LoopState::Running);
        assert_eq!(ctl.dimensions(), dims);
        assert_eq!(ctl.simulation().width(), 640 / 2);
        assert_eq!(ctl.viewport().width, 640.0);
    }

    #[test]
    fn test_resize_while_stopped_stays_stopped() {
        let mut ctl = controller();
        ctl.on_resize(ResizeRequest::SizeLimit(100)).unwrap();

        assert_eq!(ctl.state(), LoopState::Stopped);
        assert!(ctl.host().requested.is_empty());
        assert_eq!(ctl.quality().size_limit, 100);
        assert!(ctl.dimensions().extent() <= 100);
    }

    #[test]
    fn test_failed_resize_keeps_layout() {
        let mut ctl = controller();
        ctl.toggle_play_pause();
        let dims = ctl.dimensions();

        assert!(ctl.on_resize(ResizeRequest::SizeLimit(0)).is_err());
        assert!(ctl
            .on_resize(ResizeRequest::Viewport(Viewport::new(-1.0, 10.0, 1.0)))
            .is_err());

        assert_eq!(ctl.dimensions(), dims);
        assert_eq!(ctl.viewport().width, 1280.0);
        assert_eq!(ctl.state(), LoopState::Running);
        assert!(ctl.pending_frame().is_some());
    }
}
