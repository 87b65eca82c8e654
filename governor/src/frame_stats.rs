//! Frame Stats Tracker - rolling frame rate window
//!
//! Keeps the last 100 instantaneous frame rates and reports their aggregates.

use serde::Serialize;
use std::collections::VecDeque;
use tracing::trace;

/// Number of frame rate samples kept in the window
pub const WINDOW_SIZE: usize = 100;

/// Aggregates over the current window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameSummary {
    /// Most recent sample (0 when the window is empty)
    pub latest: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Entries currently in the window, never above `WINDOW_SIZE`
    pub samples: usize,
}

impl FrameSummary {
    pub const EMPTY: FrameSummary = FrameSummary {
        latest: 0.0,
        mean: 0.0,
        min: 0.0,
        max: 0.0,
        samples: 0,
    };
}

pub struct FrameStatsTracker {
    window: VecDeque<f64>,
    last_timestamp_ms: f64,
    summary: FrameSummary,
}

impl FrameStatsTracker {
    /// Create a tracker whose first measured interval starts at `now_ms`
    pub fn new(now_ms: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW_SIZE),
            last_timestamp_ms: now_ms,
            summary: FrameSummary::EMPTY,
        }
    }

    /// Record a tick at `now_ms` and return the refreshed aggregates.
    ///
    /// A zero, negative or non-finite interval yields no sample; the previous
    /// aggregates are returned unchanged.
    pub fn record(&mut self, now_ms: f64) -> FrameSummary {
        let delta = now_ms - self.last_timestamp_ms;
        self.last_timestamp_ms = now_ms;

        if !(delta > 0.0) || !delta.is_finite() {
            trace!(delta_ms = delta, "Dropping degenerate frame interval");
            return self.summary;
        }

        let fps = 1000.0 / delta;

        if self.window.len() >= WINDOW_SIZE {
            self.window.pop_front();
        }
        self.window.push_back(fps);

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &sample in &self.window {
            sum += sample;
            min = min.min(sample);
            max = max.max(sample);
        }

        self.summary = FrameSummary {
            latest: fps,
            mean: sum / self.window.len() as f64,
            min,
            max,
            samples: self.window.len(),
        };
        self.summary
    }

    /// Empty the window; the next `record` still measures from the last tick
    pub fn reset(&mut self) {
        self.window.clear();
        self.summary = FrameSummary::EMPTY;
    }

    /// Move the interval origin to `now_ms` without recording a sample
    pub fn rebase(&mut self, now_ms: f64) {
        self.last_timestamp_ms = now_ms;
    }

    pub fn summary(&self) -> FrameSummary {
        self.summary
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
