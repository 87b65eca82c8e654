//! Virtual Display - headless clock and vsync scheduler
//!
//! Frames fire on refresh boundaries. Work done in a frame keeps the display
//! busy, so the next callback lands on the first boundary after the work ends.

use governor::{Clock, FrameHandle, FrameScheduler};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Per-cell costs of the simulated machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HardwareProfile {
    pub refresh_hz: f64,
    /// Nanoseconds per simulated cell update
    pub step_ns_per_cell: f64,
    /// Nanoseconds per drawn cell
    pub draw_ns_per_cell: f64,
    /// Standard deviation of per-frame noise, ms
    pub jitter_ms: f64,
}

impl Default for HardwareProfile {
    fn default() -> Self {
        Self {
            refresh_hz: 60.0,
            step_ns_per_cell: 150.0,
            draw_ns_per_cell: 30.0,
            jitter_ms: 1.0,
        }
    }
}

pub struct VirtualDisplay {
    profile: HardwareProfile,
    refresh_ms: f64,
    /// Index of the current refresh; the clock reads `vsync * refresh_ms`
    vsync: u64,
    busy_until_ms: f64,
    next_id: u64,
    queue: VecDeque<FrameHandle>,
    requested: u64,
    cancelled: u64,
    jitter: Normal<f64>,
    rng: StdRng,
}

impl VirtualDisplay {
    pub fn new(profile: HardwareProfile, seed: u64) -> anyhow::Result<Self> {
        if !(profile.refresh_hz > 0.0) || !profile.refresh_hz.is_finite() {
            anyhow::bail!("refresh_hz must be positive, got {}", profile.refresh_hz);
        }
        let jitter = Normal::new(0.0, profile.jitter_ms.max(0.0))?;
        Ok(Self {
            profile,
            refresh_ms: 1000.0 / profile.refresh_hz,
            vsync: 0,
            busy_until_ms: 0.0,
            next_id: 0,
            queue: VecDeque::new(),
            requested: 0,
            cancelled: 0,
            jitter,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn refresh_ms(&self) -> f64 {
        self.refresh_ms
    }

    /// Move to the next refresh boundary after any outstanding work and
    /// deliver the oldest requested frame, if there is one. At least one
    /// refresh always elapses.
    pub fn next_frame(&mut self) -> Option<FrameHandle> {
        let handle = self.queue.pop_front()?;
        let after_work = (self.busy_until_ms / self.refresh_ms).floor() as u64 + 1;
        self.vsync = after_work.max(self.vsync + 1);
        Some(handle)
    }

    /// Let one refresh interval pass with nothing scheduled
    pub fn idle(&mut self) {
        self.vsync += 1;
    }

    /// Charge the work of the frame that just ran; returns its cost in ms
    pub fn charge(&mut self, cell_updates: u64, drawn_cells: u64) -> f64 {
        let base = (cell_updates as f64 * self.profile.step_ns_per_cell
            + drawn_cells as f64 * self.profile.draw_ns_per_cell)
            / 1_000_000.0;
        let cost = (base + self.jitter.sample(&mut self.rng)).max(0.0);
        self.busy_until_ms = self.now_ms() + cost;
        cost
    }

    pub fn outstanding(&self) -> usize {
        self.queue.len()
    }

    pub fn requested(&self) -> u64 {
        self.requested
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl Clock for VirtualDisplay {
    fn now_ms(&self) -> f64 {
        self.vsync as f64 * self.refresh_ms
    }
}

impl FrameScheduler for VirtualDisplay {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        self.requested += 1;
        let handle = FrameHandle(self.next_id);
        self.queue.push_back(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let before = self.queue.len();
        self.queue.retain(|&h| h != handle);
        if self.queue.len() < before {
            self.cancelled += 1;
        }
    }
}
