use crate::state::{AppState, FrameStatsData, LoopStatus, MemoryUsage, NoticeEvent, SchedulerStats};

pub fn get_frame_stats(state: &AppState) -> FrameStatsData {
    state.controller.frame_summary().into()
}

pub fn get_loop_status(state: &AppState) -> LoopStatus {
    state.status()
}

pub fn get_recent_notices(state: &AppState, count: Option<usize>) -> Vec<NoticeEvent> {
    let notices = state.notices.borrow();
    let count = count.unwrap_or(notices.len()).min(notices.len());
    notices[notices.len() - count..].to_vec()
}

pub fn get_scheduler_stats(state: &AppState) -> SchedulerStats {
    use governor::Clock;

    let display = state.controller.host();
    SchedulerStats {
        requested: display.requested(),
        cancelled: display.cancelled(),
        outstanding: display.outstanding(),
        refresh_ms: display.refresh_ms(),
        clock_ms: display.now_ms(),
    }
}

pub fn reset_frame_stats(state: &mut AppState) -> FrameStatsData {
    state.controller.reset_stats();
    get_frame_stats(state)
}

/// Process memory next to what the grid buffers account for
pub fn get_memory_usage(state: &AppState) -> MemoryUsage {
    let (physical_mem, virtual_mem) = memory_stats::memory_stats()
        .map(|stats| (stats.physical_mem as u64, stats.virtual_mem as u64))
        .unwrap_or((0, 0));

    MemoryUsage {
        physical_mem,
        virtual_mem,
        grid_bytes: state.controller.simulation().buffer_bytes(),
        cells: state.controller.dimensions().cell_count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HardwareProfile;
    use governor::{ViewerConfig, Viewport};

    #[test]
    fn test_memory_usage_tracks_grid() {
        let mut state = AppState::new(
            ViewerConfig::default(),
            Viewport::new(200.0, 100.0, 1.0),
            HardwareProfile::default(),
            2,
        )
        .unwrap();

        let usage = get_memory_usage(&state);
        assert_eq!(usage.cells, 100 * 50);
        // Current and next generation buffers, one byte per cell
        assert_eq!(usage.grid_bytes, 2 * 100 * 50);

        crate::commands::viewport::set_size_limit(&mut state, 40).unwrap();
        let usage = get_memory_usage(&state);
        assert_eq!(usage.grid_bytes, 2 * usage.cells);
        assert!(usage.cells < 100 * 50);
    }

    #[test]
    fn test_recent_notices_count() {
        let state = AppState::new(
            ViewerConfig::default(),
            Viewport::new(200.0, 100.0, 1.0),
            HardwareProfile::default(),
            2,
        )
        .unwrap();
        assert!(get_recent_notices(&state, Some(5)).is_empty());
        assert_eq!(get_scheduler_stats(&state).outstanding, 0);
    }
}
