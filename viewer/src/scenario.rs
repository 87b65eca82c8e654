//! Scenario - scripted viewer session
//!
//! A scenario fixes the virtual hardware and lists UI commands to fire at given
//! display refreshes. Running it drives the render loop frame by frame.

use anyhow::Context;
use governor::{TickOutcome, Viewport};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::commands::{cells, playback, statistics, viewport};
use crate::host::HardwareProfile;
use crate::state::{AppState, SessionSummary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    TogglePlayPause,
    SetVisibility { hidden: bool },
    ResizeViewport { width: f64, height: f64, pixel_density: f64 },
    SetSizeLimit { limit: u32 },
    SetSpeed { speed: u32 },
    RandomReset,
    Clear,
    ToggleCell { row: u32, col: u32 },
    InsertGlider { row: u32, col: u32 },
    InsertPulsar { row: u32, col: u32 },
    ResetStats,
    /// Log loop status and frame statistics
    Report,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub at_frame: u64,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    /// Display refreshes to simulate
    pub frames: u64,
    pub viewport: Viewport,
    pub hardware: HardwareProfile,
    pub seed: u64,
    pub steps: Vec<Step>,
}

impl Default for Scenario {
    fn default() -> Self {
        let at = |at_frame, command| Step { at_frame, command };
        Self {
            frames: 1600,
            viewport: Viewport::new(1280.0, 720.0, 1.0),
            hardware: HardwareProfile::default(),
            seed: 42,
            steps: vec![
                at(0, Command::TogglePlayPause),
                at(300, Command::Report),
                at(600, Command::SetVisibility { hidden: true }),
                at(660, Command::SetVisibility { hidden: false }),
                at(800, Command::TogglePlayPause),
                at(830, Command::TogglePlayPause),
                at(
                    900,
                    Command::ResizeViewport {
                        width: 1920.0,
                        height: 1080.0,
                        pixel_density: 1.0,
                    },
                ),
                at(1000, Command::InsertPulsar { row: 100, col: 100 }),
                at(1200, Command::Report),
                at(1600, Command::Report),
            ],
        }
    }
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn build_state(&self, config: governor::ViewerConfig) -> anyhow::Result<AppState> {
        AppState::new(config, self.viewport, self.hardware, self.seed)
    }

    /// Run every display refresh, firing scripted commands before the frame at
    /// their index. Commands that fail are logged and skipped.
    pub fn run(&self, state: &mut AppState) -> anyhow::Result<SessionSummary> {
        let mut steps: Vec<&Step> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.at_frame);
        let mut steps = steps.into_iter().peekable();
        let mut ticks = 0u64;

        for frame in 0..=self.frames {
            while let Some(step) = steps.next_if(|s| s.at_frame == frame) {
                if let Err(e) = apply(state, &step.command) {
                    warn!(frame, command = ?step.command, "Command failed: {}", e);
                }
            }
            if frame == self.frames {
                break;
            }

            let Some(handle) = state.controller.host_mut().next_frame() else {
                state.controller.host_mut().idle();
                continue;
            };
            match state.controller.on_frame(handle) {
                Ok(TickOutcome::Ignored) => debug!(frame, "Frame ignored"),
                Ok(TickOutcome::Advanced { .. } | TickOutcome::Degraded(_)) => ticks += 1,
                // The loop is stopped; later commands may still resume it
                Err(e) => error!(frame, "Tick failed: {}", e),
            }

            let updates = state.controller.simulation_mut().take_work();
            let drawn = state.controller.renderer_mut().take_drawn_cells();
            state.controller.host_mut().charge(updates, drawn);
        }

        for step in steps {
            warn!(at_frame = step.at_frame, "Step after the last frame was not run");
        }

        Ok(summarize(state, self.frames, ticks))
    }
}

pub fn apply(state: &mut AppState, command: &Command) -> Result<(), String> {
    match *command {
        Command::TogglePlayPause => {
            let status = playback::toggle_play_pause(state);
            info!(state = ?status.state, "Play/pause");
        }
        Command::SetVisibility { hidden } => {
            playback::set_visibility(state, hidden);
        }
        Command::ResizeViewport {
            width,
            height,
            pixel_density,
        } => {
            let status = viewport::resize_viewport(state, width, height, pixel_density)?;
            info!(
                width = status.dimensions.width,
                height = status.dimensions.height,
                "Viewport resized"
            );
        }
        Command::SetSizeLimit { limit } => {
            viewport::set_size_limit(state, limit)?;
        }
        Command::SetSpeed { speed } => {
            playback::set_speed(state, speed)?;
        }
        Command::RandomReset => {
            cells::random_reset(state);
        }
        Command::Clear => {
            cells::clear(state);
        }
        Command::ToggleCell { row, col } => {
            cells::toggle_cell(state, row, col)?;
        }
        Command::InsertGlider { row, col } => {
            cells::insert_glider(state, row, col)?;
        }
        Command::InsertPulsar { row, col } => {
            cells::insert_pulsar(state, row, col)?;
        }
        Command::ResetStats => {
            statistics::reset_frame_stats(state);
        }
        Command::Report => {
            let status = statistics::get_loop_status(state);
            let stats = statistics::get_frame_stats(state);
            let universe = state.controller.simulation();
            info!(
                cell_size = universe.cell_size(),
                gap = universe.gap(),
                redraws = state.controller.renderer().redraws(),
                state = ?status.state,
                speed = status.quality.speed,
                size_limit = status.quality.size_limit,
                width = status.dimensions.width,
                height = status.dimensions.height,
                mean_fps = stats.mean,
                min_fps = stats.min,
                max_fps = stats.max,
                samples = stats.samples,
                population = status.population,
                "Report"
            );
        }
    }
    Ok(())
}

fn summarize(state: &AppState, frames: u64, ticks: u64) -> SessionSummary {
    let snapshot = state
        .controller
        .renderer()
        .snapshot(state.controller.simulation(), 64, 24);
    SessionSummary {
        seed: state.seed,
        frames,
        ticks,
        status: statistics::get_loop_status(state),
        frame_stats: statistics::get_frame_stats(state),
        scheduler: statistics::get_scheduler_stats(state),
        notices: statistics::get_recent_notices(state, None),
        memory: statistics::get_memory_usage(state),
        snapshot,
    }
}
