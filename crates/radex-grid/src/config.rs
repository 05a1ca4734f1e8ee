//! Configuration for gridding and plotting runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::field::RatioKind;

/// Settings shared by the cube and plot paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridderConfig {
    /// Decimal places independent fields are rounded to before gridding.
    pub round_decimals: u32,

    /// Rewrite NaN/inf cube cells to zero.
    pub zero_bads: bool,

    /// Which outputs form the ratio field.
    pub ratio: RatioKind,

    /// Number of contour levels in rendered plots.
    pub ncontours: usize,

    /// Pixels per mesh cell in rendered plots.
    pub pixel_scale: usize,

    /// Contour level spacing: "log" (fixed decades) or "linear" (data range).
    pub level_scale: String,

    /// Directory receiving cubes and plots.
    pub output_dir: PathBuf,
}

impl Default for GridderConfig {
    fn default() -> Self {
        Self {
            round_decimals: 2,
            zero_bads: true,
            ratio: RatioKind::Flux,
            ncontours: 50,
            pixel_scale: 8,
            level_scale: "log".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl GridderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GRID_ROUND_DECIMALS") {
            if let Ok(decimals) = val.parse() {
                config.round_decimals = decimals;
            }
        }

        if let Ok(val) = std::env::var("GRID_ZERO_BADS") {
            config.zero_bads = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("GRID_RATIO_TYPE") {
            config.ratio = RatioKind::from_str(&val);
        }

        if let Ok(val) = std::env::var("GRID_NCONTOURS") {
            if let Ok(n) = val.parse() {
                config.ncontours = n;
            }
        }

        if let Ok(val) = std::env::var("GRID_PIXEL_SCALE") {
            if let Ok(scale) = val.parse() {
                config.pixel_scale = scale;
            }
        }

        if let Ok(val) = std::env::var("GRID_LEVEL_SCALE") {
            config.level_scale = val.to_lowercase();
        }

        if let Ok(val) = std::env::var("GRID_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(val);
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.round_decimals > 12 {
            return Err("round_decimals must be <= 12".to_string());
        }

        if self.ncontours < 2 {
            return Err("ncontours must be >= 2".to_string());
        }

        if self.pixel_scale == 0 || self.pixel_scale > 64 {
            return Err("pixel_scale must be 1-64".to_string());
        }

        if !matches!(self.level_scale.as_str(), "log" | "linear") {
            return Err(format!(
                "level_scale must be 'log' or 'linear', got '{}'",
                self.level_scale
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = GridderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.round_decimals, 2);
        assert!(config.zero_bads);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = GridderConfig {
            ncontours: 1,
            ..GridderConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GridderConfig {
            pixel_scale: 0,
            ..GridderConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GridderConfig {
            level_scale: "cubic".to_string(),
            ..GridderConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
