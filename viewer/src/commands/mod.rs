//! UI-facing commands operating on the session state

pub mod cells;
pub mod config;
pub mod playback;
pub mod statistics;
pub mod viewport;
