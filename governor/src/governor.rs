//! Performance Governor - one-way degrade policy
//!
//! Watches the rolling frame rate and lowers simulation throughput first, grid
//! density second. It never raises quality on its own.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dimensions::{DimensionPlanner, Dimensions, Viewport};
use crate::error::{GovernorError, Result};
use crate::frame_stats::{FrameSummary, WINDOW_SIZE};

// ============================================================================
// Policy configuration
// ============================================================================

/// Degrade when at least `min_samples` are in the window and their mean is
/// below `below_fps`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegradeTier {
    pub min_samples: usize,
    pub below_fps: f64,
}

impl DegradeTier {
    pub const fn new(min_samples: usize, below_fps: f64) -> Self {
        Self { min_samples, below_fps }
    }

    fn matches(&self, summary: &FrameSummary) -> bool {
        summary.samples >= self.min_samples && summary.mean < self.below_fps
    }
}

pub const DEFAULT_TIERS: [DegradeTier; 3] = [
    DegradeTier::new(10, 6.0),
    DegradeTier::new(20, 12.0),
    DegradeTier::new(WINDOW_SIZE, 24.0),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GovernorConfig {
    /// Simulation steps per rendered frame at startup
    pub initial_speed: u32,
    pub speed_floor: u32,
    pub speed_step: u32,
    /// Maximum cells along the longer viewport axis at startup
    pub initial_size_limit: u32,
    pub size_floor: u32,
    pub size_step: u32,
    pub tiers: Vec<DegradeTier>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            initial_speed: 5,
            speed_floor: 1,
            speed_step: 1,
            initial_size_limit: 512,
            size_floor: 32,
            size_step: 16,
            tiers: DEFAULT_TIERS.to_vec(),
        }
    }
}

impl GovernorConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(GovernorError::InvalidConfig(msg));

        if self.speed_floor == 0 {
            return invalid("speed_floor must be at least 1".into());
        }
        if self.speed_step == 0 || self.size_step == 0 {
            return invalid("speed_step and size_step must be at least 1".into());
        }
        if self.initial_speed < self.speed_floor {
            return invalid(format!(
                "initial_speed {} is below speed_floor {}",
                self.initial_speed, self.speed_floor
            ));
        }
        if self.size_floor == 0 {
            return invalid("size_floor must be at least 1".into());
        }
        if self.initial_size_limit < self.size_floor {
            return invalid(format!(
                "initial_size_limit {} is below size_floor {}",
                self.initial_size_limit, self.size_floor
            ));
        }
        for tier in &self.tiers {
            if tier.min_samples == 0 || tier.min_samples > WINDOW_SIZE {
                return invalid(format!(
                    "tier min_samples {} outside 1..={}",
                    tier.min_samples, WINDOW_SIZE
                ));
            }
            if !tier.below_fps.is_finite() || tier.below_fps <= 0.0 {
                return invalid(format!("tier below_fps {} must be positive", tier.below_fps));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Quality and decisions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityLevel {
    /// Simulation steps per rendered frame
    pub speed: u32,
    /// Maximum cells along the longer viewport axis
    pub size_limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeKind {
    Throughput,
    GridSize,
}

/// User-facing description of one degrade step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradeNotice {
    pub kind: DegradeKind,
    pub message: String,
    pub quality: QualityLevel,
    pub dimensions: Dimensions,
    /// Tier that fired and the mean that fired it
    pub tier: DegradeTier,
    pub mean_fps: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Run `steps` simulation steps and redraw
    Advance { steps: u32 },
    /// Quality was lowered; the loop must resize to `notice.dimensions`
    Degraded(DegradeNotice),
    /// A tier fired but everything is at its floor; advance as usual
    Exhausted { steps: u32 },
}

impl Decision {
    /// Whether the frame window must be emptied after this decision
    pub fn resets_window(&self) -> bool {
        !matches!(self, Decision::Advance { .. })
    }
}

// ============================================================================
// Governor
// ============================================================================

pub struct PerformanceGovernor {
    config: GovernorConfig,
    quality: QualityLevel,
    planner: DimensionPlanner,
    exhausted_reported: bool,
    /// Set when the viewport cannot hold a coarser grid above the size floor
    size_blocked: bool,
}

impl PerformanceGovernor {
    pub fn new(config: GovernorConfig, planner: DimensionPlanner) -> Result<Self> {
        config.validate()?;
        let quality = QualityLevel {
            speed: config.initial_speed,
            size_limit: config.initial_size_limit,
        };
        Ok(Self {
            config,
            quality,
            planner,
            exhausted_reported: false,
            size_blocked: false,
        })
    }

    pub fn quality(&self) -> QualityLevel {
        self.quality
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// True once neither control can be lowered any further
    pub fn is_exhausted(&self) -> bool {
        self.quality.speed <= self.config.speed_floor
            && (self.quality.size_limit <= self.config.size_floor || self.size_blocked)
    }

    /// Forget that the grid could not shrink; called when the viewport changes
    pub fn clear_size_block(&mut self) {
        self.size_blocked = false;
        self.exhausted_reported = false;
    }

    /// Plan dimensions for `viewport` at the current size limit
    pub fn plan(&self, viewport: Viewport, gap: f64) -> Result<Dimensions> {
        self.planner.plan(viewport, gap, self.quality.size_limit)
    }

    /// First tier, in table order, that the summary satisfies
    pub fn triggered_tier(&self, summary: &FrameSummary) -> Option<DegradeTier> {
        self.config.tiers.iter().find(|tier| tier.matches(summary)).copied()
    }

    /// Decide what this tick does. `current` is the layout the simulation runs at.
    pub fn evaluate(
        &mut self,
        summary: &FrameSummary,
        viewport: Viewport,
        gap: f64,
        current: &Dimensions,
    ) -> Result<Decision> {
        match self.triggered_tier(summary) {
            None => Ok(Decision::Advance { steps: self.quality.speed }),
            Some(tier) => self.degrade(tier, summary.mean, viewport, gap, current),
        }
    }

    fn degrade(
        &mut self,
        tier: DegradeTier,
        mean_fps: f64,
        viewport: Viewport,
        gap: f64,
        current: &Dimensions,
    ) -> Result<Decision> {
        let floor = self.config.speed_floor;
        if self.quality.speed > floor {
            let speed = self.quality.speed.saturating_sub(self.config.speed_step).max(floor);
            let dimensions = self.planner.plan(viewport, gap, self.quality.size_limit)?;
            self.quality.speed = speed;

            info!(speed, mean_fps, "Reduced simulation throughput");
            return Ok(Decision::Degraded(DegradeNotice {
                kind: DegradeKind::Throughput,
                message: format!(
                    "Throughput reduced to {} simulation step{} per frame",
                    speed,
                    if speed == 1 { "" } else { "s" }
                ),
                quality: self.quality,
                dimensions,
                tier,
                mean_fps,
            }));
        }

        if self.quality.size_limit > self.config.size_floor {
            if let Some((size_limit, dimensions)) = self.next_size_limit(viewport, gap, current)? {
                self.quality.size_limit = size_limit;
                self.size_blocked = false;

                info!(
                    size_limit,
                    width = dimensions.width,
                    height = dimensions.height,
                    mean_fps,
                    "Reduced grid size"
                );
                return Ok(Decision::Degraded(DegradeNotice {
                    kind: DegradeKind::GridSize,
                    message: format!(
                        "Grid size reduced to {}x{} cells",
                        dimensions.width, dimensions.height
                    ),
                    quality: self.quality,
                    dimensions,
                    tier,
                    mean_fps,
                }));
            }
            if !self.size_blocked {
                info!(
                    size_limit = self.quality.size_limit,
                    "No coarser grid fits the viewport, grid size left as is"
                );
                self.size_blocked = true;
            }
        }

        if !self.exhausted_reported {
            info!(mean_fps, "Quality at floor, no further degradation possible");
            self.exhausted_reported = true;
        }
        Ok(Decision::Exhausted { steps: self.quality.speed })
    }

    /// Walk the size limit down until the grid gets coarser or the floor is
    /// reached. `None` when no lower limit yields a coarser, plannable grid.
    fn next_size_limit(
        &self,
        viewport: Viewport,
        gap: f64,
        current: &Dimensions,
    ) -> Result<Option<(u32, Dimensions)>> {
        let floor = self.config.size_floor;
        let mut size_limit = self.quality.size_limit;
        while size_limit > floor {
            size_limit = size_limit.saturating_sub(self.config.size_step).max(floor);
            match self.planner.plan(viewport, gap, size_limit) {
                Ok(planned) if planned.cell_size > current.cell_size || size_limit == floor => {
                    return Ok(Some((size_limit, planned)));
                }
                Ok(_) => debug!(size_limit, "Size limit step left the grid unchanged"),
                // Cells only get larger from here on, so nothing lower fits either
                Err(GovernorError::ViewportTooSmall { .. }) => {
                    debug!(size_limit, "Size limit step leaves no room for a cell");
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Explicit user choice of steps per frame; may raise quality
    pub fn set_speed(&mut self, speed: u32) -> Result<()> {
        if speed < self.config.speed_floor {
            return Err(GovernorError::InvalidConfig(format!(
                "speed {} is below the floor {}",
                speed, self.config.speed_floor
            )));
        }
        self.quality.speed = speed;
        self.exhausted_reported = false;
        Ok(())
    }

    /// Explicit user choice of grid extent. Returns the planned layout without
    /// committing the limit if planning fails.
    pub fn set_size_limit(&mut self, size_limit: u32, viewport: Viewport, gap: f64) -> Result<Dimensions> {
        if size_limit < self.config.size_floor {
            return Err(GovernorError::InvalidConfig(format!(
                "size limit {} is below the floor {}",
                size_limit, self.config.size_floor
            )));
        }
        let dimensions = self.planner.plan(viewport, gap, size_limit)?;
        self.quality.size_limit = size_limit;
        self.exhausted_reported = false;
        self.size_blocked = false;
        Ok(dimensions)
    }
}
