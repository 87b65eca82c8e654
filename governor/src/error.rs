//! Error types for the governor core

use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, GovernorError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GovernorError {
    #[error("Size limit must be at least 1 cell, got {0}")]
    ZeroSizeLimit(u32),
    #[error("Invalid viewport {width}x{height} at pixel density {pixel_density}")]
    InvalidViewport {
        width: f64,
        height: f64,
        pixel_density: f64,
    },
    #[error("Invalid cell gap {0}")]
    InvalidGap(f64),
    #[error("Invalid minimum cell scale {0}")]
    InvalidMinScale(f64),
    #[error("Viewport {width}x{height} is too small for a {cell_pitch}px cell pitch")]
    ViewportTooSmall {
        width: f64,
        height: f64,
        cell_pitch: f64,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),
    #[error("Could not read configuration `{path}`: {reason}")]
    ConfigRead { path: String, reason: String },
}

