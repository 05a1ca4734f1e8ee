//! Batches of independent cube and plot requests.
//!
//! Every request gets its own [`ConditionReporter`]. A failing request is
//! logged and recorded; the rest of the batch still runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use contour_plot::{write_plot, RenderOptions};
use radex_grid::{
    build_cube, project_cut, Condition, ConditionReporter, CubeRequest, CubeWriter, CutSpec,
    Field, GridderConfig, PlotRequest, PlotType, SampleTable, ThirdVariable,
};

/// Quantities gridded by script mode, in output order.
pub const SCRIPT_QUANTITIES: [Field; 9] = [
    Field::Tau1,
    Field::Tau2,
    Field::Tex1,
    Field::Tex2,
    Field::Tline1,
    Field::Tline2,
    Field::Flux1,
    Field::Flux2,
    Field::Ratio,
];

/// Outcome of a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(String, anyhow::Error)>,
    pub conditions: Vec<Condition>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }

    fn record(&mut self, name: String, result: Result<PathBuf>, reporter: ConditionReporter) {
        if !reporter.is_empty() {
            warn!(
                request = %name,
                conditions = reporter.len(),
                distinct = reporter.distinct_count(),
                "Request finished with conditions"
            );
        }
        self.conditions.extend(reporter.into_conditions());

        match result {
            Ok(path) => self.written.push(path),
            Err(e) => {
                error!(request = %name, error = %format!("{:#}", e), "Request failed");
                self.failed.push((name, e));
            }
        }
    }

    /// Write every retained condition to `path` as JSON. No file when empty.
    pub fn write_conditions(&self, path: &Path) -> Result<Option<PathBuf>> {
        if self.conditions.is_empty() {
            return Ok(None);
        }
        let body = serde_json::to_vec_pretty(&self.conditions)?;
        std::fs::write(path, body)
            .with_context(|| format!("writing conditions to {}", path.display()))?;
        Ok(Some(path.to_path_buf()))
    }
}

/// Grid every script quantity into `<prefix>_<quantity>.zarr`.
pub fn grid_quantities(
    table: &SampleTable,
    config: &GridderConfig,
    var4: Option<Field>,
    prefix: &str,
) -> BatchReport {
    let writer = CubeWriter::new();
    let mut report = BatchReport::default();

    for quantity in SCRIPT_QUANTITIES {
        let path = config
            .output_dir
            .join(format!("{}_{}.zarr", prefix, quantity.name()));
        let request = CubeRequest::for_quantity(quantity, config).with_var4(var4);
        let mut reporter = ConditionReporter::new();

        let result = build_cube(table, &request, &mut reporter)
            .and_then(|cube| writer.write(&path, &cube))
            .map(|written| {
                info!(
                    quantity = quantity.name(),
                    path = %written.path.display(),
                    shape = ?written.shape,
                    "Cube written"
                );
                written.path
            })
            .with_context(|| format!("gridding {} into {}", quantity, path.display()));

        report.record(quantity.name().to_string(), result, reporter);
    }

    report
}

/// Render `plot_type` for the three cuts at index `cut_index`.
pub fn plot_cuts(
    table: &SampleTable,
    config: &GridderConfig,
    plot_type: PlotType,
    cut_index: usize,
    transition: &str,
) -> BatchReport {
    let options = RenderOptions::from_config(config);
    let mut report = BatchReport::default();

    for third in ThirdVariable::ALL {
        let request = PlotRequest {
            third,
            cut: CutSpec::Index(cut_index),
            plot_type,
            transition: transition.to_string(),
            ..PlotRequest::default()
        };
        let mut reporter = ConditionReporter::new();

        let result = project_cut(table, &request, &mut reporter)
            .map_err(anyhow::Error::from)
            .and_then(|slice| {
                write_plot(&config.output_dir, &slice, &options)
                    .map(|written| written.image)
                    .map_err(anyhow::Error::from)
            })
            .with_context(|| format!("plotting {} cut {}", third.as_str(), cut_index));

        report.record(third.as_str().to_string(), result, reporter);
    }

    report
}

/// Transition label derived from the first seven characters of the file name.
pub fn default_transition(filename: &Path) -> String {
    filename
        .file_name()
        .map(|name| name.to_string_lossy().chars().take(7).collect())
        .unwrap_or_else(|| "noname".to_string())
}

/// File stem used to prefix script-mode outputs.
pub fn output_prefix(filename: &Path) -> String {
    filename
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "grid".to_string())
}
