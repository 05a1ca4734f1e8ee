//! Synthetic tables and a closed-form evaluator.
//!
//! Outputs of the synthetic tables are affine in (density, column) at fixed
//! temperature, so linear interpolation reproduces them exactly.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::field::Schema;
use crate::runner::{Evaluation, Evaluator, LineOutput, ModelParameters};
use crate::table::{SampleRow, SampleTable};

/// Transitions reported by [`AnalyticEvaluator`].
pub const TRANSITIONS: [&str; 3] = ["303", "321", "322"];

fn synthetic_row(temperature: f64, density: f64, column: f64, opr: f64) -> SampleRow {
    let opr_term = if opr.is_nan() { 0.0 } else { opr };
    let tex1 = 0.5 * temperature + 0.37 * density + 0.013 * column + 0.01 * opr_term;
    let tex2 = 0.4 * temperature + 0.2 * density + 0.1 * column;
    let tau1 = 0.1 * temperature + 0.25 * density + 0.5 * column - 6.0 + 0.05 * opr_term;
    let tau2 = 0.05 * temperature + 0.5 * density + 0.25 * column - 3.0;
    SampleRow {
        temperature,
        density,
        column,
        opr,
        tex1,
        tex2,
        tau1,
        tau2,
        tline1: 0.1 * tex1,
        tline2: 0.1 * tex2,
        flux1: 0.5 * tex1,
        flux2: 0.5 * tex2,
    }
}

/// Full three-variable lattice, temperature outermost and column innermost.
pub fn synthetic_table(temperatures: &[f64], densities: &[f64], columns: &[f64]) -> SampleTable {
    let mut rows = Vec::new();
    for &t in temperatures {
        for &n in densities {
            for &c in columns {
                rows.push(synthetic_row(t, n, c, f64::NAN));
            }
        }
    }
    SampleTable::new(Schema::ThreeVar, rows)
}

/// Full four-variable lattice with opr outermost.
pub fn synthetic_table_4var(
    temperatures: &[f64],
    densities: &[f64],
    columns: &[f64],
    oprs: &[f64],
) -> SampleTable {
    let mut rows = Vec::new();
    for &o in oprs {
        for &t in temperatures {
            for &n in densities {
                for &c in columns {
                    rows.push(synthetic_row(t, n, c, o));
                }
            }
        }
    }
    SampleTable::new(Schema::FourVar, rows)
}

/// Copy of `table` without the rows matching `drop`.
pub fn without_rows(table: &SampleTable, drop: impl Fn(&SampleRow) -> bool) -> SampleTable {
    let rows = table.rows().iter().filter(|r| !drop(r)).copied().collect();
    SampleTable::new(table.schema(), rows).with_ratio(table.ratio_kind())
}

/// The four corners of the unit square followed by `n` pseudo-random interior
/// points. The same seed always yields the same points.
pub fn scattered_unit_points(seed: u64, n: usize) -> Vec<(f64, f64)> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    let mut points = vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
    for _ in 0..n {
        let x = next();
        let y = next();
        points.push((x, y));
    }
    points
}

/// Evaluator with closed-form line outputs.
///
/// Points registered with [`Self::stuck_at`] report the full iteration budget
/// and `converged = false` while still returning finite outputs.
#[derive(Debug, Clone)]
pub struct AnalyticEvaluator {
    max_iterations: u32,
    stuck: Vec<ModelParameters>,
}

impl Default for AnalyticEvaluator {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            stuck: Vec::new(),
        }
    }
}

impl AnalyticEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stuck_at(mut self, parameters: ModelParameters) -> Self {
        self.stuck.push(parameters);
        self
    }

    fn line(parameters: &ModelParameters, scale: f64) -> LineOutput {
        let (ortho, para) = parameters.collider_densities();
        let excitation = (ortho + para).log10();
        let tau = scale * parameters.column_per_line_width().log10() / 10.0;
        let tex = parameters.temperature * excitation / (excitation + 2.0);
        let tline = tex * (1.0 - (-tau).exp());
        LineOutput {
            tau,
            tex,
            tline,
            flux: tline * parameters.line_width,
        }
    }
}

impl Evaluator for AnalyticEvaluator {
    fn set_parameters(
        &mut self,
        parameters: &ModelParameters,
        _reuse_last_state: bool,
    ) -> Result<Evaluation> {
        let lines: BTreeMap<String, LineOutput> = TRANSITIONS
            .iter()
            .enumerate()
            .map(|(k, name)| (name.to_string(), Self::line(parameters, 1.0 / (k as f64 + 1.0))))
            .collect();

        let converged = !self.stuck.contains(parameters);
        Ok(Evaluation {
            lines,
            iterations: if converged { 12 } else { self.max_iterations },
            converged,
        })
    }
}
