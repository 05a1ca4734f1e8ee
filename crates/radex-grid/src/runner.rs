//! Model-grid runner.
//!
//! Drives an [`Evaluator`] across the Cartesian product of temperature,
//! density, column and (optionally) ortho/para ratio, and collects the
//! requested per-line outputs into dense arrays. Column varies fastest and
//! opr slowest, so an output array has shape `[opr?, T, D, C]`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::axis::AxisSpec;
use crate::cube::GridCube;
use crate::error::{GridError, Result};
use crate::field::{Field, Schema};
use crate::metadata::CoordinateMetadata;
use crate::report::{Condition, ConditionReporter};
use crate::table::{SampleRow, SampleTable};

/// Default line width (km/s) used to convert column to column per bin.
pub const DEFAULT_LINE_WIDTH: f64 = 5.0;

/// Points per parallel work unit.
const PARALLEL_CHUNK: usize = 64;

// ============================================================================
// Parameters and evaluations
// ============================================================================

/// One point of the input grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Kinetic temperature (K).
    pub temperature: f64,
    /// log10 of the H2 volume density (cm^-3).
    pub density: f64,
    /// log10 of the species column density (cm^-2).
    pub column: f64,
    pub opr: Option<f64>,
    /// Line width (km/s).
    pub line_width: f64,
}

impl ModelParameters {
    /// Linear total collider density.
    pub fn density_cm3(&self) -> f64 {
        10f64.powf(self.density)
    }

    /// `(ortho, para)` H2 densities. Without an opr all of it is para.
    pub fn collider_densities(&self) -> (f64, f64) {
        let total = self.density_cm3();
        match self.opr {
            Some(opr) => {
                let fortho = opr / (1.0 + opr);
                (total * fortho, total * (1.0 - fortho))
            }
            None => (0.0, total),
        }
    }

    /// Linear column density.
    pub fn column_density(&self) -> f64 {
        10f64.powf(self.column)
    }

    /// Column per unit line width, the quantity most solvers take as input.
    pub fn column_per_line_width(&self) -> f64 {
        self.column_density() / self.line_width
    }
}

impl fmt::Display for ModelParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T={} K, log n={}, log N={}",
            self.temperature, self.density, self.column
        )?;
        if let Some(opr) = self.opr {
            write!(f, ", opr={}", opr)?;
        }
        Ok(())
    }
}

/// Outputs of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineOutput {
    pub tau: f64,
    pub tex: f64,
    pub tline: f64,
    pub flux: f64,
}

/// Result of one evaluator call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Per-transition outputs keyed by transition name.
    pub lines: BTreeMap<String, LineOutput>,
    pub iterations: u32,
    /// False when the iteration budget was exhausted.
    pub converged: bool,
}

/// A radiative-transfer model that can be evaluated at grid points.
///
/// `reuse_last_state` asks the model to start from its previous solution;
/// implementations are free to ignore it.
pub trait Evaluator {
    fn set_parameters(
        &mut self,
        parameters: &ModelParameters,
        reuse_last_state: bool,
    ) -> Result<Evaluation>;
}

// ============================================================================
// Requested outputs
// ============================================================================

/// Per-line scalar recorded by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputQuantity {
    Tau,
    Tex,
    Tline,
    Flux,
}

impl OutputQuantity {
    pub const ALL: [OutputQuantity; 4] = [Self::Tau, Self::Tex, Self::Tline, Self::Flux];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tau => "tau",
            Self::Tex => "tex",
            Self::Tline => "tline",
            Self::Flux => "flux",
        }
    }

    pub fn value(&self, line: &LineOutput) -> f64 {
        match self {
            Self::Tau => line.tau,
            Self::Tex => line.tex,
            Self::Tline => line.tline,
            Self::Flux => line.flux,
        }
    }
}

/// A (transition, quantity) pair naming one output array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputKey {
    pub transition: String,
    pub quantity: OutputQuantity,
}

impl OutputKey {
    pub fn new(transition: impl Into<String>, quantity: OutputQuantity) -> Self {
        Self {
            transition: transition.into(),
            quantity,
        }
    }

    /// Every quantity of every listed transition.
    pub fn all_for(transitions: &[&str]) -> Vec<OutputKey> {
        transitions
            .iter()
            .flat_map(|t| OutputQuantity::ALL.iter().map(move |&q| OutputKey::new(*t, q)))
            .collect()
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.transition, self.quantity.as_str())
    }
}

// ============================================================================
// Grid axes
// ============================================================================

/// Input axes of a model grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxes {
    pub temperatures: Vec<f64>,
    /// log10 densities.
    pub densities: Vec<f64>,
    /// log10 columns.
    pub columns: Vec<f64>,
    pub oprs: Option<Vec<f64>>,
    pub line_width: f64,
}

impl GridAxes {
    pub fn new(temperatures: Vec<f64>, densities: Vec<f64>, columns: Vec<f64>) -> Self {
        Self {
            temperatures,
            densities,
            columns,
            oprs: None,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }

    pub fn with_oprs(mut self, oprs: Vec<f64>) -> Self {
        self.oprs = Some(oprs);
        self
    }

    pub fn with_line_width(mut self, line_width: f64) -> Self {
        self.line_width = line_width;
        self
    }

    /// Output array shape, slowest first.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = Vec::with_capacity(4);
        if let Some(oprs) = &self.oprs {
            shape.push(oprs.len());
        }
        shape.extend([
            self.temperatures.len(),
            self.densities.len(),
            self.columns.len(),
        ]);
        shape
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(GridError::invalid_request("model grid has an empty axis"));
        }
        if self.line_width.is_nan() || self.line_width <= 0.0 {
            return Err(GridError::invalid_request(format!(
                "line width must be positive, got {}",
                self.line_width
            )));
        }
        Ok(())
    }

    /// Parameters at flat index `i` in traversal order.
    pub fn parameters_at(&self, i: usize) -> ModelParameters {
        let nc = self.columns.len();
        let nd = self.densities.len();
        let nt = self.temperatures.len();

        let c = i % nc;
        let d = (i / nc) % nd;
        let t = (i / (nc * nd)) % nt;
        let o = i / (nc * nd * nt);

        ModelParameters {
            temperature: self.temperatures[t],
            density: self.densities[d],
            column: self.columns[c],
            opr: self.oprs.as_ref().map(|oprs| oprs[o]),
            line_width: self.line_width,
        }
    }

    /// Coordinate axes: column is axis 1, opr (if any) axis 4.
    fn axis_specs(&self) -> Vec<AxisSpec> {
        let mut specs = vec![
            axis_spec(Field::Column, &self.columns, 1),
            axis_spec(Field::Density, &self.densities, 2),
            axis_spec(Field::Temperature, &self.temperatures, 3),
        ];
        if let Some(oprs) = &self.oprs {
            specs.push(axis_spec(Field::Opr, oprs, 4));
        }
        specs
    }
}

fn axis_spec(field: Field, values: &[f64], index: usize) -> AxisSpec {
    AxisSpec {
        field,
        values: values.to_vec(),
        degenerate: values.len() == 1,
        index,
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Receives progress updates from a run.
pub trait ProgressSink: Send + Sync {
    fn update(&self, done: usize, total: usize);
}

/// Discards progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _done: usize, _total: usize) {}
}

/// Logs progress at every 10% step.
#[derive(Debug, Default)]
pub struct LogProgress {
    last_decile: AtomicUsize,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for LogProgress {
    fn update(&self, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        let decile = done * 10 / total;
        if self.last_decile.fetch_max(decile, Ordering::Relaxed) < decile {
            info!(done, total, percent = decile * 10, "Model grid progress");
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

/// How grid points are dispatched to evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStrategy {
    /// One evaluator, points in order. `reuse_state` enables warm starts.
    Sequential { reuse_state: bool },
    /// One evaluator per rayon worker; warm starts disabled.
    Parallel,
}

impl Default for RunStrategy {
    fn default() -> Self {
        Self::Sequential { reuse_state: true }
    }
}

/// Sweeps an evaluator over a [`GridAxes`] product.
#[derive(Debug, Clone)]
pub struct ModelGridRunner {
    axes: GridAxes,
    outputs: Vec<OutputKey>,
    strategy: RunStrategy,
}

impl ModelGridRunner {
    pub fn new(axes: GridAxes, outputs: Vec<OutputKey>) -> Self {
        Self {
            axes,
            outputs,
            strategy: RunStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: RunStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn axes(&self) -> &GridAxes {
        &self.axes
    }

    /// Run the grid. `factory` is called once for a sequential run and once
    /// per worker for a parallel one.
    pub fn run<E, F>(
        &self,
        factory: F,
        reporter: &mut ConditionReporter,
        progress: &dyn ProgressSink,
    ) -> Result<GridRun>
    where
        E: Evaluator + Send,
        F: Fn() -> Result<E> + Sync,
    {
        self.axes.validate()?;
        if self.outputs.is_empty() {
            return Err(GridError::invalid_request("no outputs requested"));
        }

        let total = self.axes.len();
        info!(
            points = total,
            shape = ?self.axes.shape(),
            outputs = self.outputs.len(),
            strategy = ?self.strategy,
            "Starting model grid"
        );

        let mut run = GridRun::new(self.axes.clone(), &self.outputs);
        match self.strategy {
            RunStrategy::Sequential { reuse_state } => {
                let mut evaluator = factory()?;
                for i in 0..total {
                    let parameters = self.axes.parameters_at(i);
                    let evaluation = evaluator.set_parameters(&parameters, reuse_state && i > 0)?;
                    run.record(i, &parameters, &evaluation, reporter)?;
                    progress.update(i + 1, total);
                }
            }
            RunStrategy::Parallel => {
                let done = AtomicUsize::new(0);
                let evaluations: Vec<Result<Evaluation>> = (0..total)
                    .into_par_iter()
                    .with_min_len(PARALLEL_CHUNK)
                    .map_init(&factory, |evaluator, i| {
                        let evaluator = evaluator
                            .as_mut()
                            .map_err(|e| GridError::Evaluator(e.to_string()))?;
                        let evaluation =
                            evaluator.set_parameters(&self.axes.parameters_at(i), false);
                        progress.update(done.fetch_add(1, Ordering::Relaxed) + 1, total);
                        evaluation
                    })
                    .collect();

                for (i, evaluation) in evaluations.into_iter().enumerate() {
                    run.record(i, &self.axes.parameters_at(i), &evaluation?, reporter)?;
                }
            }
        }

        info!(
            points = total,
            bad = run.bad_parameters.len(),
            "Model grid complete"
        );
        Ok(run)
    }
}

// ============================================================================
// Results
// ============================================================================

/// Dense outputs of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRun {
    pub axes: GridAxes,
    pub outputs: BTreeMap<OutputKey, Vec<f64>>,
    /// Non-converged points in traversal order.
    pub bad_parameters: Vec<ModelParameters>,
}

impl GridRun {
    fn new(axes: GridAxes, keys: &[OutputKey]) -> Self {
        let len = axes.len();
        let outputs = keys
            .iter()
            .map(|key| (key.clone(), vec![f64::NAN; len]))
            .collect();
        Self {
            axes,
            outputs,
            bad_parameters: Vec::new(),
        }
    }

    fn record(
        &mut self,
        index: usize,
        parameters: &ModelParameters,
        evaluation: &Evaluation,
        reporter: &mut ConditionReporter,
    ) -> Result<()> {
        for (key, values) in self.outputs.iter_mut() {
            let line = evaluation
                .lines
                .get(&key.transition)
                .ok_or_else(|| GridError::MissingTransition(key.transition.clone()))?;
            values[index] = key.quantity.value(line);
        }

        if !evaluation.converged {
            debug!(%parameters, iterations = evaluation.iterations, "Non-converged point");
            self.bad_parameters.push(*parameters);
            reporter.report(Condition::NonConvergence {
                parameters: *parameters,
                iterations: evaluation.iterations,
            });
        }
        Ok(())
    }

    pub fn output(&self, key: &OutputKey) -> Option<&[f64]> {
        self.outputs.get(key).map(Vec::as_slice)
    }

    pub fn bad_parameters(&self) -> &[ModelParameters] {
        &self.bad_parameters
    }

    /// One output as a cube with coordinate metadata; BTYPE is the quantity.
    pub fn to_cube(&self, key: &OutputKey) -> Result<GridCube> {
        let data = self
            .outputs
            .get(key)
            .ok_or_else(|| GridError::invalid_request(format!("output {} was not recorded", key)))?;
        let metadata = CoordinateMetadata::build(&self.axes.axis_specs(), key.quantity.as_str());
        GridCube::new(self.axes.shape(), data.clone(), metadata)
    }

    /// Flatten the run into a sample table with `line1` / `line2` as the
    /// numbered outputs. Requires all four quantities of both lines.
    pub fn to_sample_table(&self, line1: &str, line2: &str) -> Result<SampleTable> {
        let column = |transition: &str, quantity: OutputQuantity| -> Result<&[f64]> {
            let key = OutputKey::new(transition, quantity);
            self.output(&key)
                .ok_or_else(|| GridError::invalid_request(format!("output {} was not recorded", key)))
        };
        let tex1 = column(line1, OutputQuantity::Tex)?;
        let tex2 = column(line2, OutputQuantity::Tex)?;
        let tau1 = column(line1, OutputQuantity::Tau)?;
        let tau2 = column(line2, OutputQuantity::Tau)?;
        let tline1 = column(line1, OutputQuantity::Tline)?;
        let tline2 = column(line2, OutputQuantity::Tline)?;
        let flux1 = column(line1, OutputQuantity::Flux)?;
        let flux2 = column(line2, OutputQuantity::Flux)?;

        let schema = if self.axes.oprs.is_some() {
            Schema::FourVar
        } else {
            Schema::ThreeVar
        };

        let rows = (0..self.axes.len())
            .map(|i| {
                let p = self.axes.parameters_at(i);
                SampleRow {
                    temperature: p.temperature,
                    density: p.density,
                    column: p.column,
                    opr: p.opr.unwrap_or(f64::NAN),
                    tex1: tex1[i],
                    tex2: tex2[i],
                    tau1: tau1[i],
                    tau2: tau2[i],
                    tline1: tline1[i],
                    tline2: tline2[i],
                    flux1: flux1[i],
                    flux2: flux2[i],
                }
            })
            .collect();

        Ok(SampleTable::new(schema, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::AnalyticEvaluator;

    fn small_axes() -> GridAxes {
        GridAxes::new(vec![10.0, 20.0], vec![3.0, 4.0, 5.0], vec![12.0, 13.0])
    }

    #[test]
    fn test_traversal_order() {
        let axes = small_axes().with_oprs(vec![1.0, 3.0]);
        assert_eq!(axes.shape(), vec![2, 2, 3, 2]);
        assert_eq!(axes.len(), 24);

        let first = axes.parameters_at(0);
        assert_eq!((first.temperature, first.density, first.column), (10.0, 3.0, 12.0));
        assert_eq!(first.opr, Some(1.0));

        assert_eq!(axes.parameters_at(1).column, 13.0);
        assert_eq!(axes.parameters_at(2).density, 4.0);
        assert_eq!(axes.parameters_at(6).temperature, 20.0);
        assert_eq!(axes.parameters_at(12).opr, Some(3.0));
    }

    #[test]
    fn test_collider_split() {
        let p = ModelParameters {
            temperature: 20.0,
            density: 4.0,
            column: 13.0,
            opr: Some(3.0),
            line_width: 5.0,
        };
        let (ortho, para) = p.collider_densities();
        assert!((ortho - 7500.0).abs() < 1e-9);
        assert!((para - 2500.0).abs() < 1e-9);
        assert!((p.column_per_line_width() - 2e12).abs() < 1.0);

        let no_opr = ModelParameters { opr: None, ..p };
        assert_eq!(no_opr.collider_densities().0, 0.0);
    }

    #[test]
    fn test_sequential_run_fills_outputs() {
        let runner = ModelGridRunner::new(small_axes(), OutputKey::all_for(&["303", "321"]));
        let mut reporter = ConditionReporter::new();
        let run = runner
            .run(|| Ok(AnalyticEvaluator::new()), &mut reporter, &NoProgress)
            .unwrap();

        let tau = run.output(&OutputKey::new("303", OutputQuantity::Tau)).unwrap();
        assert_eq!(tau.len(), 12);
        assert!(tau.iter().all(|v| v.is_finite()));
        assert!(run.bad_parameters().is_empty());
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_missing_transition_is_fatal() {
        let runner = ModelGridRunner::new(small_axes(), vec![OutputKey::new("404", OutputQuantity::Tau)]);
        let mut reporter = ConditionReporter::new();
        let result = runner.run(|| Ok(AnalyticEvaluator::new()), &mut reporter, &NoProgress);
        assert!(matches!(result, Err(GridError::MissingTransition(t)) if t == "404"));
    }

    #[test]
    fn test_run_to_cube_metadata() {
        let runner = ModelGridRunner::new(small_axes(), OutputKey::all_for(&["303"]));
        let mut reporter = ConditionReporter::new();
        let run = runner
            .run(|| Ok(AnalyticEvaluator::new()), &mut reporter, &NoProgress)
            .unwrap();

        let cube = run.to_cube(&OutputKey::new("303", OutputQuantity::Tex)).unwrap();
        assert_eq!(cube.shape, vec![2, 3, 2]);
        assert_eq!(cube.metadata.btype, "tex");
        assert_eq!(cube.metadata.axis(1).unwrap().ctype, "LIN-COLU");
        assert_eq!(cube.metadata.axis(3).unwrap().ctype, "LIN-TEMP");
    }

    #[test]
    fn test_empty_axis_rejected() {
        let axes = GridAxes::new(vec![], vec![3.0], vec![12.0]);
        let runner = ModelGridRunner::new(axes, OutputKey::all_for(&["303"]));
        let mut reporter = ConditionReporter::new();
        assert!(matches!(
            runner.run(|| Ok(AnalyticEvaluator::new()), &mut reporter, &NoProgress),
            Err(GridError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_log_progress_deciles() {
        let sink = LogProgress::new();
        for done in 1..=20 {
            sink.update(done, 20);
        }
        assert_eq!(sink.last_decile.load(Ordering::Relaxed), 10);
    }
}
