//! RADEX grid gridder.
//!
//! Reads a tabular model grid and either renders contour plots of the three
//! standard cuts or, with `--script`, grids every output quantity into Zarr
//! cubes.

mod jobs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use radex_grid::{Field, GridderConfig, PlotType, SampleTable};

#[derive(Parser, Debug)]
#[command(name = "gridder")]
#[command(about = "Grid RADEX model tables into cubes and contour plots")]
struct Args {
    /// Tabular grid file (.dat)
    filename: PathBuf,

    /// Grid every output quantity into cubes instead of plotting
    #[arg(long)]
    script: bool,

    /// Transition label used in plot file names (default: first 7 characters of the file name)
    #[arg(long)]
    transition: Option<String>,

    /// Fourth cube axis, e.g. "opr"
    #[arg(long)]
    var4: Option<String>,

    /// Quantity to plot: ratio, tau1, tau2, tex1 or tex2
    #[arg(long, default_value = "ratio")]
    plottype: String,

    /// Index of the cut value along each third variable
    #[arg(long, default_value_t = 0)]
    cutnumber: usize,

    /// Output directory (overrides GRID_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    let mut config = GridderConfig::from_env();
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let var4 = args
        .var4
        .as_deref()
        .map(str::parse::<Field>)
        .transpose()
        .context("invalid --var4")?;
    let plot_type: PlotType = args.plottype.parse().context("invalid --plottype")?;

    let table = SampleTable::load(&args.filename)
        .with_context(|| format!("loading {}", args.filename.display()))?
        .with_ratio(config.ratio);

    info!(
        file = %args.filename.display(),
        rows = table.len(),
        output_dir = %config.output_dir.display(),
        script = args.script,
        "Starting gridder"
    );

    let prefix = jobs::output_prefix(&args.filename);
    let report = if args.script {
        jobs::grid_quantities(&table, &config, var4, &prefix)
    } else {
        let transition = args
            .transition
            .clone()
            .unwrap_or_else(|| jobs::default_transition(&args.filename));
        jobs::plot_cuts(&table, &config, plot_type, args.cutnumber, &transition)
    };

    if let Some(path) =
        report.write_conditions(&config.output_dir.join(format!("{}_conditions.json", prefix)))?
    {
        info!(
            path = %path.display(),
            conditions = report.conditions.len(),
            "Wrote condition log"
        );
    }

    info!(
        written = report.written.len(),
        failed = report.failed.len(),
        "Batch complete"
    );

    if !report.failed.is_empty() {
        let names: Vec<&str> = report.failed.iter().map(|(name, _)| name.as_str()).collect();
        anyhow::bail!(
            "{} of {} requests failed: {}",
            report.failed.len(),
            report.total(),
            names.join(", ")
        );
    }

    Ok(())
}
