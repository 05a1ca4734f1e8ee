//! Error types for plot rendering.

use thiserror::Error;

/// Errors that abort rendering of a single plot.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The grid has no cells.
    #[error("cannot render an empty {width}x{height} grid")]
    EmptyGrid { width: usize, height: usize },

    /// Contour levels are unusable (too few, unsorted, non-positive on a log norm).
    #[error("invalid contour levels: {0}")]
    InvalidLevels(String),

    /// Render options are out of range.
    #[error("invalid render options: {0}")]
    InvalidOptions(String),

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
