//! Scattered-data interpolation onto a regular mesh.
//!
//! Samples are triangulated in coordinates normalised to the unit box, then
//! each mesh point takes the barycentric blend of its enclosing triangle.
//! Mesh points outside the convex hull are NaN.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::axis::RegularMesh;
use crate::delaunay::Triangulation;
use crate::error::{GridError, Result};
use crate::field::Field;
use crate::report::{Condition, ConditionReporter};
use crate::table::SampleTable;

/// Tolerance for "on the sample line" in the collinear fallback.
const LINE_EPS: f64 = 1e-9;

/// A dense 2-D array in row-major order (row = y, column = x).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid2 {
    pub data: Vec<f64>,
    pub width: usize,
    pub height: usize,
}

impl Grid2 {
    pub fn new(data: Vec<f64>, width: usize, height: usize) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// A grid with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        Self::new(vec![value; width * height], width, height)
    }

    /// Shape as `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    pub fn nan_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

}

/// Affine map of the sample bounding box onto the unit square.
#[derive(Debug, Clone, Copy)]
struct Normalizer {
    x0: f64,
    xs: f64,
    y0: f64,
    ys: f64,
}

impl Normalizer {
    fn fit(points: &[(f64, f64)]) -> Self {
        let (mut x0, mut x1) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y0, mut y1) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in points {
            x0 = x0.min(x);
            x1 = x1.max(x);
            y0 = y0.min(y);
            y1 = y1.max(y);
        }
        let span = |lo: f64, hi: f64| if hi > lo { hi - lo } else { 1.0 };
        Self {
            x0,
            xs: span(x0, x1),
            y0,
            ys: span(y0, y1),
        }
    }

    fn apply(&self, x: f64, y: f64) -> [f64; 2] {
        [(x - self.x0) / self.xs, (y - self.y0) / self.ys]
    }
}

/// Piecewise-linear interpolant along a line of collinear samples.
#[derive(Debug, Clone)]
struct LineInterpolant {
    origin: [f64; 2],
    direction: [f64; 2],
    /// (position along the line, value), sorted by position.
    stations: Vec<(f64, f64)>,
}

impl LineInterpolant {
    fn new(points: &[[f64; 2]], values: &[f64]) -> Option<Self> {
        let origin = *points.first()?;
        let far = points.iter().copied().max_by(|a, b| {
            let da = (a[0] - origin[0]).hypot(a[1] - origin[1]);
            let db = (b[0] - origin[0]).hypot(b[1] - origin[1]);
            da.total_cmp(&db)
        })?;
        let length = (far[0] - origin[0]).hypot(far[1] - origin[1]);
        if length == 0.0 {
            return None;
        }
        let direction = [(far[0] - origin[0]) / length, (far[1] - origin[1]) / length];

        let mut stations: Vec<(f64, f64)> = points
            .iter()
            .zip(values)
            .map(|(p, &v)| {
                let t = (p[0] - origin[0]) * direction[0] + (p[1] - origin[1]) * direction[1];
                (t, v)
            })
            .collect();
        stations.sort_by(|a, b| a.0.total_cmp(&b.0));

        Some(Self {
            origin,
            direction,
            stations,
        })
    }

    fn evaluate(&self, p: [f64; 2]) -> f64 {
        let rx = p[0] - self.origin[0];
        let ry = p[1] - self.origin[1];
        let off_line = (rx * self.direction[1] - ry * self.direction[0]).abs();
        if off_line > LINE_EPS {
            return f64::NAN;
        }

        let t = rx * self.direction[0] + ry * self.direction[1];
        let (first, last) = match (self.stations.first(), self.stations.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return f64::NAN,
        };
        if t < first.0 - LINE_EPS || t > last.0 + LINE_EPS {
            return f64::NAN;
        }
        if t <= first.0 {
            return first.1;
        }

        for pair in self.stations.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if t <= t1 {
                let w = (t - t0) / (t1 - t0);
                return v0 * (1.0 - w) + v1 * w;
            }
        }
        last.1
    }
}

/// Linear interpolant over a set of scattered 2-D samples.
#[derive(Debug, Clone)]
pub struct ScatteredInterpolator {
    normalizer: Normalizer,
    triangulation: Triangulation,
    values: Vec<f64>,
    exact: HashMap<(u64, u64), f64>,
    line: Option<LineInterpolant>,
}

impl ScatteredInterpolator {
    /// Build the interpolant. Samples with non-finite coordinates are
    /// skipped; coincident samples keep the first occurrence.
    pub fn new(points: &[(f64, f64)], values: &[f64]) -> Result<Self> {
        if points.len() != values.len() {
            return Err(GridError::invalid_request(format!(
                "{} sample points but {} values",
                points.len(),
                values.len()
            )));
        }

        let mut seen = HashSet::new();
        let mut kept_points = Vec::with_capacity(points.len());
        let mut kept_values = Vec::with_capacity(values.len());
        for (&(x, y), &v) in points.iter().zip(values) {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            if seen.insert((x.to_bits(), y.to_bits())) {
                kept_points.push((x, y));
                kept_values.push(v);
            }
        }
        if kept_points.len() < points.len() {
            debug!(
                dropped = points.len() - kept_points.len(),
                "Dropped duplicate or non-finite samples"
            );
        }

        let normalizer = Normalizer::fit(&kept_points);
        let normalized: Vec<[f64; 2]> = kept_points
            .iter()
            .map(|&(x, y)| normalizer.apply(x, y))
            .collect();
        let triangulation = Triangulation::new(&normalized);

        let line = if triangulation.is_empty() {
            LineInterpolant::new(&normalized, &kept_values)
        } else {
            None
        };

        let exact = kept_points
            .iter()
            .zip(&kept_values)
            .map(|(&(x, y), &v)| ((x.to_bits(), y.to_bits()), v))
            .collect();

        Ok(Self {
            normalizer,
            triangulation,
            values: kept_values,
            exact,
            line,
        })
    }

    /// Interpolated value at `(x, y)`; NaN outside the sample hull.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        if let Some(&v) = self.exact.get(&(x.to_bits(), y.to_bits())) {
            return v;
        }

        let p = self.normalizer.apply(x, y);
        if let Some(line) = &self.line {
            return line.evaluate(p);
        }

        match self.triangulation.locate(p) {
            Some((ti, w)) => {
                let tri = self.triangulation.triangles()[ti];
                w[0] * self.values[tri[0]] + w[1] * self.values[tri[1]] + w[2] * self.values[tri[2]]
            }
            None => f64::NAN,
        }
    }

    /// Evaluate on every point of `mesh`, returning a `(ny, nx)` grid.
    pub fn evaluate_mesh(&self, mesh: &RegularMesh) -> Grid2 {
        let mut data = Vec::with_capacity(mesh.nx() * mesh.ny());
        for &y in &mesh.y {
            for &x in &mesh.x {
                data.push(self.evaluate(x, y));
            }
        }
        Grid2::new(data, mesh.nx(), mesh.ny())
    }
}

/// Interpolate scattered samples onto `mesh`.
pub fn interpolate_slice(
    points: &[(f64, f64)],
    values: &[f64],
    mesh: &RegularMesh,
) -> Result<Grid2> {
    if points.is_empty() {
        return Ok(Grid2::filled(mesh.nx(), mesh.ny(), f64::NAN));
    }
    Ok(ScatteredInterpolator::new(points, values)?.evaluate_mesh(mesh))
}

/// The fields and mesh of one 2-D projection.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    pub x_field: Field,
    pub y_field: Field,
    pub value_field: Field,
    pub mesh: &'a RegularMesh,
}

/// Interpolate the rows selected by `mask` onto the projection mesh.
///
/// An empty selection is reported as an empty slice for `context` and yields
/// an all-NaN grid rather than an error.
pub fn interpolate_masked(
    table: &SampleTable,
    projection: Projection<'_>,
    mask: &[bool],
    context: &[(Field, f64)],
    reporter: &mut ConditionReporter,
) -> Result<Grid2> {
    let xs = table.column(projection.x_field)?;
    let ys = table.column(projection.y_field)?;
    let vs = table.column(projection.value_field)?;
    if mask.len() != xs.len() {
        return Err(GridError::invalid_request(format!(
            "mask has {} entries for {} rows",
            mask.len(),
            xs.len()
        )));
    }

    let (points, values): (Vec<(f64, f64)>, Vec<f64>) = mask
        .iter()
        .zip(xs.iter().zip(&ys).zip(&vs))
        .filter(|(&keep, _)| keep)
        .map(|(_, ((&x, &y), &v))| ((x, y), v))
        .unzip();

    let mesh = projection.mesh;
    if points.is_empty() {
        reporter.report(Condition::EmptySlice {
            context: context.to_vec(),
        });
        return Ok(Grid2::filled(mesh.nx(), mesh.ny(), f64::NAN));
    }

    debug!(
        samples = points.len(),
        nx = mesh.nx(),
        ny = mesh.ny(),
        field = %projection.value_field,
        "Interpolating slice"
    );
    interpolate_slice(&points, &values, mesh)
}
