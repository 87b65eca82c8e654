//! Dimension Planner - grid extent search
//!
//! Picks the smallest cell scale for which the grid fits inside a size limit
//! along the longer viewport axis.

use serde::{Deserialize, Serialize};

use crate::error::{GovernorError, Result};

// ============================================================================
// Value types
// ============================================================================

/// Drawable area in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub pixel_density: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, pixel_density: f64) -> Self {
        Self { width, height, pixel_density }
    }

    fn longer_axis(&self) -> f64 {
        self.width.max(self.height)
    }
}

/// Grid layout handed to the simulation on resize
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimensions {
    /// Cells across
    pub width: u32,
    /// Cells down
    pub height: u32,
    /// Cell edge in device pixels
    pub cell_size: f64,
    pub gap: f64,
    pub pixel_density: f64,
}

impl Dimensions {
    pub fn cell_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Cells along the longer grid axis
    pub fn extent(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// Upper bound on the scale search, far beyond any real display
const MAX_SCALE_STEPS: f64 = (1u64 << 32) as f64;

// ============================================================================
// Planner
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct DimensionPlanner {
    /// Smallest scale tried; `None` means one device pixel (`1 / pixel_density`)
    min_scale: Option<f64>,
}

impl DimensionPlanner {
    pub fn new(min_scale: Option<f64>) -> Self {
        Self { min_scale }
    }

    /// Find the smallest scale `s = s_min + k` (k = 0, 1, 2, ...) such that
    /// `floor(max(w, h) / (s * pixel_density + gap)) <= size_limit`.
    pub fn plan(&self, viewport: Viewport, gap: f64, size_limit: u32) -> Result<Dimensions> {
        if size_limit == 0 {
            return Err(GovernorError::ZeroSizeLimit(size_limit));
        }
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(viewport.width) || !valid(viewport.height) || !valid(viewport.pixel_density) {
            return Err(GovernorError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
                pixel_density: viewport.pixel_density,
            });
        }
        if !gap.is_finite() || gap < 0.0 {
            return Err(GovernorError::InvalidGap(gap));
        }

        let density = viewport.pixel_density;
        let min_scale = self.min_scale.unwrap_or(1.0 / density);
        if !valid(min_scale) {
            return Err(GovernorError::InvalidMinScale(min_scale));
        }

        let longer = viewport.longer_axis();
        let limit = size_limit as f64;
        let cells_at = |step: u64| -> f64 {
            let pitch = (min_scale + step as f64) * density + gap;
            (longer / pitch).floor()
        };

        // The constraint holds once the pitch exceeds longer / (limit + 1). Start one
        // step below that bound and walk forward over the lattice.
        let bound = ((longer / (limit + 1.0) - gap) / density - min_scale).ceil();
        if !(bound < MAX_SCALE_STEPS) {
            return Err(GovernorError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
                pixel_density: viewport.pixel_density,
            });
        }
        let mut step = if bound > 1.0 { bound as u64 - 1 } else { 0 };
        while cells_at(step) > limit {
            step += 1;
        }
        while step > 0 && cells_at(step - 1) <= limit {
            step -= 1;
        }

        let cell_size = (min_scale + step as f64) * density;
        let pitch = cell_size + gap;
        let width = (viewport.width / pitch).floor() as u32;
        let height = (viewport.height / pitch).floor() as u32;

        if width == 0 || height == 0 {
            return Err(GovernorError::ViewportTooSmall {
                width: viewport.width,
                height: viewport.height,
                cell_pitch: pitch,
            });
        }

        Ok(Dimensions {
            width,
            height,
            cell_size,
            gap,
            pixel_density: density,
        })
    }
}
