//! Viewer configuration
//!
//! JSON file with three sections (`grid`, `governor`, `render_loop`). Every
//! field is optional and falls back to its default; unknown fields are rejected.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GovernorError, Result};
use crate::governor::GovernorConfig;
use crate::render_loop::VisibilityPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Pixels between cells
    pub gap: f64,
    /// Smallest cell scale tried by the planner (default: one device pixel)
    pub min_scale: Option<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            gap: 1.0,
            min_scale: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderLoopConfig {
    pub visibility: VisibilityPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub grid: GridConfig,
    pub governor: GovernorConfig,
    pub render_loop: RenderLoopConfig,
}

impl ViewerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ViewerConfig =
            serde_json::from_str(json).map_err(|e| GovernorError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| GovernorError::ConfigRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.grid.gap.is_finite() || self.grid.gap < 0.0 {
            return Err(GovernorError::InvalidGap(self.grid.gap));
        }
        if let Some(scale) = self.grid.min_scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(GovernorError::InvalidMinScale(scale));
            }
        }
        self.governor.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::DEFAULT_TIERS;

    #[test]
    fn test_defaults_are_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.governor.tiers, DEFAULT_TIERS.to_vec());
        assert_eq!(config.render_loop.visibility, VisibilityPolicy::RespectPause);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ViewerConfig::from_json_str(
            r#"{ "governor": { "initial_speed": 8 }, "render_loop": { "visibility": "always_resume" } }"#,
        )
        .unwrap();

        assert_eq!(config.governor.initial_speed, 8);
        assert_eq!(config.governor.speed_floor, 1);
        assert_eq!(config.grid, GridConfig::default());
        assert_eq!(config.render_loop.visibility, VisibilityPolicy::AlwaysResume);
    }

    #[test]
    fn test_custom_tiers() {
        let config = ViewerConfig::from_json_str(
            r#"{ "governor": { "tiers": [ { "min_samples": 30, "below_fps": 50.0 } ] } }"#,
        )
        .unwrap();
        assert_eq!(config.governor.tiers.len(), 1);
        assert_eq!(config.governor.tiers[0].min_samples, 30);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ViewerConfig::from_json_str(r#"{ "grid": { "gutter": 2 } }"#).unwrap_err();
        assert!(matches!(err, GovernorError::ConfigParse(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            ViewerConfig::from_json_str(r#"{ "grid": { "gap": -2.0 } }"#),
            Err(GovernorError::InvalidGap(_))
        ));
        assert!(matches!(
            ViewerConfig::from_json_str(r#"{ "grid": { "min_scale": 0.0 } }"#),
            Err(GovernorError::InvalidMinScale(_))
        ));
        assert!(matches!(
            ViewerConfig::from_json_str(r#"{ "governor": { "size_floor": 600 } }"#),
            Err(GovernorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ViewerConfig::load("/nonexistent/lifeview.json").unwrap_err();
        assert!(matches!(err, GovernorError::ConfigRead { .. }));
    }
}
