//! Filled-contour rendering of grid cuts.
//!
//! A [`PlotSlice`] from `radex-grid` is turned into a banded colour raster and
//! encoded as PNG. Axis labels, title and colour-bar label are written next to
//! the image as a JSON sidecar rather than drawn into it.
//!
//! ```ignore
//! use contour_plot::{write_plot, RenderOptions};
//!
//! let options = RenderOptions::from_config(&config);
//! let written = write_plot(&config.output_dir, &slice, &options)?;
//! ```

pub mod colormap;
pub mod error;
pub mod levels;
pub mod png;
pub mod raster;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use radex_grid::{GridderConfig, PlotLabels, PlotSlice, RegularMesh};

// Re-export commonly used types at crate root
pub use colormap::{Color, Colormap};
pub use error::{RenderError, Result};
pub use levels::{logspace, ContourLevels, LevelScale, DEFAULT_LOG_RANGE};
pub use png::create_png;
pub use raster::{rasterize, resample_grid};

/// How a slice is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Number of contour levels (bands = levels - 1).
    pub ncontours: usize,
    /// Pixels per mesh cell on each axis.
    pub pixel_scale: usize,
    pub scale: LevelScale,
    pub colormap: Colormap,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            ncontours: 50,
            pixel_scale: 8,
            scale: LevelScale::Log,
            colormap: Colormap::default(),
        }
    }
}

impl RenderOptions {
    pub fn from_config(config: &GridderConfig) -> Self {
        Self {
            ncontours: config.ncontours,
            pixel_scale: config.pixel_scale,
            scale: LevelScale::from_str(&config.level_scale),
            ..Self::default()
        }
    }

    fn levels_for(&self, data: &[f64]) -> Result<ContourLevels> {
        match self.scale {
            LevelScale::Log => ContourLevels::log_default(self.ncontours),
            LevelScale::Linear => ContourLevels::linear_over(data, self.ncontours),
        }
    }
}

/// An encoded plot.
#[derive(Debug, Clone)]
pub struct RenderedPlot {
    pub png: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub levels: ContourLevels,
}

/// Render a slice to PNG bytes.
pub fn render_slice(slice: &PlotSlice, options: &RenderOptions) -> Result<RenderedPlot> {
    let levels = options.levels_for(&slice.grid.data)?;
    let colors = options.colormap.band_colors(levels.band_count());
    let (pixels, width, height) = rasterize(&slice.grid, &levels, &colors, options.pixel_scale)?;

    let transparent = pixels.chunks_exact(4).filter(|px| px[3] == 0).count();
    debug!(
        width,
        height,
        bands = levels.band_count(),
        transparent,
        "Rasterized slice"
    );

    let png = create_png(&pixels, width, height)?;
    Ok(RenderedPlot {
        png,
        width,
        height,
        levels,
    })
}

/// Contents of the JSON file written beside each image.
#[derive(Debug, Serialize)]
struct PlotSidecar<'a> {
    labels: &'a PlotLabels,
    cut_value: f64,
    plot_type: &'static str,
    scale: &'static str,
    levels: &'a [f64],
    mesh: &'a RegularMesh,
    width: usize,
    height: usize,
}

/// Files produced by [`write_plot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPlot {
    pub image: PathBuf,
    pub sidecar: PathBuf,
}

/// Render a slice into `dir` as `<stem>.png` plus `<stem>.json`.
pub fn write_plot(dir: &Path, slice: &PlotSlice, options: &RenderOptions) -> Result<WrittenPlot> {
    let rendered = render_slice(slice, options)?;
    std::fs::create_dir_all(dir)?;

    let stem = &slice.labels.file_stem;
    let image = dir.join(format!("{}.png", stem));
    let sidecar = dir.join(format!("{}.json", stem));

    std::fs::write(&image, &rendered.png)?;

    let meta = PlotSidecar {
        labels: &slice.labels,
        cut_value: slice.cut_value,
        plot_type: slice.plot_type.as_str(),
        scale: rendered.levels.scale().as_str(),
        levels: rendered.levels.values(),
        mesh: &slice.mesh,
        width: rendered.width,
        height: rendered.height,
    };
    std::fs::write(&sidecar, serde_json::to_vec_pretty(&meta)?)?;

    info!(
        path = %image.display(),
        width = rendered.width,
        height = rendered.height,
        bytes = rendered.png.len(),
        "Wrote plot"
    );

    Ok(WrittenPlot { image, sidecar })
}
