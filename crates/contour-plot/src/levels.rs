//! Contour levels and value-to-band mapping.

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

/// Lowest and highest decade of the default log-spaced levels.
pub const DEFAULT_LOG_RANGE: (f64, f64) = (-3.0, 1.0);

/// `n` values spaced evenly in log10 between `10^start` and `10^stop`.
pub fn logspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    radex_grid::linspace(start, stop, n)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect()
}

/// How levels are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelScale {
    /// Fixed log-spaced levels from 1e-3 to 1e1.
    #[default]
    Log,
    /// Evenly spaced levels across the finite data range.
    Linear,
}

impl LevelScale {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "linear" | "lin" => Self::Linear,
            _ => Self::Log,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Linear => "linear",
        }
    }
}

/// Sorted contour boundaries; band `i` covers `[values[i], values[i + 1])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourLevels {
    values: Vec<f64>,
    scale: LevelScale,
}

impl ContourLevels {
    /// Validate and wrap explicit boundaries.
    pub fn new(values: Vec<f64>, scale: LevelScale) -> Result<Self> {
        if values.len() < 2 {
            return Err(RenderError::InvalidLevels(format!(
                "need at least 2 levels, got {}",
                values.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(RenderError::InvalidLevels("levels must be finite".to_string()));
        }
        if values.windows(2).any(|w| w[1] <= w[0]) {
            return Err(RenderError::InvalidLevels(
                "levels must be strictly increasing".to_string(),
            ));
        }
        if scale == LevelScale::Log && values[0] <= 0.0 {
            return Err(RenderError::InvalidLevels(
                "log levels must be positive".to_string(),
            ));
        }
        Ok(Self { values, scale })
    }

    /// `n` log-spaced levels over the default decades.
    pub fn log_default(n: usize) -> Result<Self> {
        let (lo, hi) = DEFAULT_LOG_RANGE;
        Self::new(logspace(lo, hi, n), LevelScale::Log)
    }

    /// `n` linear levels over the finite range of `data`.
    pub fn linear_over(data: &[f64], n: usize) -> Result<Self> {
        let (lo, hi) = data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !lo.is_finite() {
            return Err(RenderError::InvalidLevels(
                "no finite values to derive levels from".to_string(),
            ));
        }
        // A flat field still gets one band around its value
        let (lo, hi) = if hi > lo {
            (lo, hi)
        } else {
            let pad = lo.abs().max(1.0) * 1e-6;
            (lo - pad, hi + pad)
        };
        Self::new(radex_grid::linspace(lo, hi, n), LevelScale::Linear)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn scale(&self) -> LevelScale {
        self.scale
    }

    pub fn band_count(&self) -> usize {
        self.values.len() - 1
    }

    /// Band containing `value`, or None when the value is not finite or falls
    /// outside the outermost levels. The top level closes the last band.
    pub fn band_index(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let first = self.values[0];
        let last = self.values[self.values.len() - 1];
        if value < first || value > last {
            return None;
        }
        if value == last {
            return Some(self.band_count() - 1);
        }
        // First boundary strictly above value
        let upper = self.values.partition_point(|&l| l <= value);
        Some(upper - 1)
    }
}
