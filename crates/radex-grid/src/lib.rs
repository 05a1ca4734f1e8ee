//! Assembly and resampling of RADEX model grids.
//!
//! Scattered model samples (temperature, density, column and optionally the
//! ortho/para ratio, each with eight line outputs) are turned into dense
//! arrays on regular axes:
//!
//! - **Cubes**: every combination of the outer axes is interpolated onto the
//!   mesh of the two inner axes and stacked into a 2-4 dimensional array with
//!   coordinate metadata, then stored as a Zarr V3 array.
//! - **Cuts**: one independent variable is held fixed and the remaining plane
//!   is interpolated onto a plot mesh for contour rendering.
//!
//! # Architecture
//!
//! ```text
//! ModelGridRunner ──► GridRun ──► SampleTable ◄── grid file
//!                                     │
//!                       ┌─────────────┴─────────────┐
//!                       ▼                           ▼
//!               resolve_axes + cuts           build_cube
//!                       │                           │
//!                       ▼                           ▼
//!                  project_cut            CoordinateMetadata
//!                       │                           │
//!                       ▼                           ▼
//!                   PlotSlice                  CubeWriter
//! ```
//!
//! Interpolation is linear on a Delaunay triangulation of the selected
//! samples. Mesh points outside their convex hull are NaN.
//!
//! # Example
//!
//! ```ignore
//! use radex_grid::{build_cube, ConditionReporter, CubeRequest, CubeWriter, SampleTable};
//!
//! let table = SampleTable::load("h2co_grid.dat")?;
//! let mut reporter = ConditionReporter::new();
//! let cube = build_cube(&table, &CubeRequest::default(), &mut reporter)?;
//! CubeWriter::new().write("h2co_tau1.zarr", &cube)?;
//! ```

pub mod axis;
pub mod config;
pub mod cube;
pub mod cut;
pub mod delaunay;
pub mod error;
pub mod field;
pub mod interpolation;
pub mod metadata;
pub mod plot;
pub mod report;
pub mod runner;
pub mod table;
pub mod testdata;
pub mod writer;

// Re-export commonly used types at crate root
pub use axis::{linspace, resolve_axes, AxisSpec, RegularMesh};
pub use config::GridderConfig;
pub use cube::{build_cube, CubeRequest, GridCube};
pub use cut::{format_g, select_cut, Cut, CutSpec, ThirdVariable};
pub use error::{GridError, Result};
pub use field::{Field, RatioKind, Schema};
pub use interpolation::{interpolate_masked, interpolate_slice, Grid2, Projection, ScatteredInterpolator};
pub use metadata::{AxisCoordinate, CoordinateMetadata};
pub use plot::{clamp_and_scale, project_cut, ClampOptions, PlotLabels, PlotRequest, PlotSlice, PlotType};
pub use report::{Condition, ConditionReporter};
pub use runner::{
    Evaluation, Evaluator, GridAxes, GridRun, LineOutput, LogProgress, ModelGridRunner,
    ModelParameters, NoProgress, OutputKey, OutputQuantity, ProgressSink, RunStrategy,
};
pub use table::{SampleRow, SampleTable};
pub use writer::{read_cube, CubeWriteResult, CubeWriter};
