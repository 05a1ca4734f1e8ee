//! Assembly of dense N-D cubes from a sample table.
//!
//! The two inner axes define a regular mesh; every combination of the outer
//! axes selects a subset of rows that is interpolated onto that mesh. Slices
//! are stacked with the outer axes first, so a four-axis cube is laid out as
//! `[var4, var3, var2, var1]`.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::axis::{resolve_axes, AxisSpec, RegularMesh};
use crate::config::GridderConfig;
use crate::error::{GridError, Result};
use crate::field::Field;
use crate::interpolation::{interpolate_masked, Projection};
use crate::metadata::CoordinateMetadata;
use crate::report::ConditionReporter;
use crate::table::SampleTable;

/// A dense row-major array with coordinate metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCube {
    /// Dimension lengths, slowest first.
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
    pub metadata: CoordinateMetadata,
}

impl GridCube {
    pub fn new(shape: Vec<usize>, data: Vec<f64>, metadata: CoordinateMetadata) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(GridError::invalid_request(format!(
                "shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            shape,
            data,
            metadata,
        })
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at a multi-index (slowest dimension first).
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for (&i, &n) in index.iter().zip(&self.shape) {
            if i >= n {
                return None;
            }
            flat = flat * n + i;
        }
        self.data.get(flat).copied()
    }

    pub fn nan_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Rewrite NaN and infinite cells to zero.
    pub fn zero_bads(&mut self) -> usize {
        let mut replaced = 0;
        for v in self.data.iter_mut().filter(|v| !v.is_finite()) {
            *v = 0.0;
            replaced += 1;
        }
        replaced
    }
}

/// Which fields form the cube axes and which quantity fills it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeRequest {
    /// Fastest axis (x of each slice).
    pub var1: Field,
    /// y of each slice.
    pub var2: Field,
    pub var3: Option<Field>,
    /// Slowest axis; requires `var3`.
    pub var4: Option<Field>,
    pub plot_var: Field,
    /// Rewrite NaN/inf cells to zero after interpolation.
    pub zero_bads: bool,
    /// Decimal places for rounding independent fields.
    pub round: Option<u32>,
}

impl Default for CubeRequest {
    fn default() -> Self {
        Self {
            var1: Field::Density,
            var2: Field::Column,
            var3: Some(Field::Temperature),
            var4: None,
            plot_var: Field::Tau1,
            zero_bads: true,
            round: Some(2),
        }
    }
}

impl CubeRequest {
    /// Default axes for `plot_var`, with rounding and zeroing from `config`.
    pub fn for_quantity(plot_var: Field, config: &GridderConfig) -> Self {
        Self {
            plot_var,
            zero_bads: config.zero_bads,
            round: Some(config.round_decimals),
            ..Self::default()
        }
    }

    pub fn with_var4(mut self, var4: Option<Field>) -> Self {
        self.var4 = var4;
        self
    }

    fn axis_fields(&self) -> Result<Vec<Field>> {
        let mut fields = vec![self.var1, self.var2];
        match (self.var3, self.var4) {
            (Some(v3), Some(v4)) => fields.extend([v3, v4]),
            (Some(v3), None) => fields.push(v3),
            (None, Some(_)) => {
                return Err(GridError::invalid_request("var4 requires var3"));
            }
            (None, None) => {}
        }
        Ok(fields)
    }
}

/// Build a cube from `table` as described by `request`.
///
/// Outer-axis combinations with no rows are reported to `reporter` and left
/// NaN (zero if `zero_bads` is set); they never abort the build.
pub fn build_cube(
    table: &SampleTable,
    request: &CubeRequest,
    reporter: &mut ConditionReporter,
) -> Result<GridCube> {
    let fields = request.axis_fields()?;
    table.schema().require(request.plot_var)?;

    let rounded;
    let table = match request.round {
        Some(decimals) => {
            rounded = table.rounded(decimals);
            &rounded
        }
        None => table,
    };

    let axes = resolve_axes(table, &fields, request.round)?;
    let mesh = RegularMesh::from_axes(&axes[0], &axes[1]);
    let projection = Projection {
        x_field: request.var1,
        y_field: request.var2,
        value_field: request.plot_var,
        mesh: &mesh,
    };

    let outer: Vec<&AxisSpec> = axes[2..].iter().rev().collect();
    let mut shape: Vec<usize> = outer.iter().map(|a| a.len()).collect();
    shape.extend([mesh.ny(), mesh.nx()]);
    info!(
        plot_var = %request.plot_var,
        shape = ?shape,
        rows = table.len(),
        "Building cube"
    );

    let outer_columns = outer
        .iter()
        .map(|axis| table.column(axis.field))
        .collect::<Result<Vec<_>>>()?;

    let mut data = Vec::with_capacity(shape.iter().product());
    for combination in outer_combinations(&outer) {
        let context: Vec<(Field, f64)> = combination
            .iter()
            .zip(&outer)
            .map(|(&value, axis)| (axis.field, value))
            .rev()
            .collect();

        let mask: Vec<bool> = (0..table.len())
            .map(|row| {
                combination
                    .iter()
                    .zip(&outer_columns)
                    .all(|(&value, column)| column[row] == value)
            })
            .collect();

        let slice = interpolate_masked(table, projection, &mask, &context, reporter)?;
        data.extend(slice.data);
    }

    let metadata = CoordinateMetadata::build(&axes, request.plot_var.name());
    let mut cube = GridCube::new(shape, data, metadata)?;

    if request.zero_bads {
        let replaced = cube.zero_bads();
        if replaced > 0 {
            warn!(cells = replaced, "Replaced NaN/inf cells with zero");
        }
    }

    Ok(cube)
}

/// Cartesian product of the outer axis values, slowest axis first.
fn outer_combinations(outer: &[&AxisSpec]) -> Vec<Vec<f64>> {
    let mut combos: Vec<Vec<f64>> = vec![Vec::new()];
    for axis in outer {
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                axis.values.iter().map(move |&v| {
                    let mut next = prefix.clone();
                    next.push(v);
                    next
                })
            })
            .collect();
    }
    combos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::{synthetic_table, synthetic_table_4var};

    #[test]
    fn test_three_axis_cube_shape() {
        let table = synthetic_table(&[10.0, 20.0], &[3.0, 4.0, 5.0], &[12.0, 13.0, 14.0, 15.0]);
        let mut reporter = ConditionReporter::new();
        let cube = build_cube(&table, &CubeRequest::default(), &mut reporter).unwrap();

        assert_eq!(cube.shape, vec![2, 4, 3]);
        assert_eq!(cube.nan_count(), 0);
        assert!(reporter.is_empty());
        assert_eq!(cube.metadata.axis(1).unwrap().ctype, "LIN-DENS");
        assert_eq!(cube.metadata.axis(3).unwrap().ctype, "LIN-TEMP");
    }

    #[test]
    fn test_cube_values_match_samples() {
        let table = synthetic_table(&[10.0, 20.0], &[3.0, 4.0], &[12.0, 13.0]);
        let mut reporter = ConditionReporter::new();
        let cube = build_cube(&table, &CubeRequest::default(), &mut reporter).unwrap();

        for row in table.rows() {
            let t = if row.temperature == 10.0 { 0 } else { 1 };
            let c = if row.column == 12.0 { 0 } else { 1 };
            let d = if row.density == 3.0 { 0 } else { 1 };
            assert_eq!(cube.get(&[t, c, d]).unwrap(), row.tau1);
        }
    }

    #[test]
    fn test_missing_combination_is_reported_and_nan() {
        let mut table = synthetic_table_4var(&[10.0, 20.0], &[3.0, 4.0], &[12.0, 13.0], &[1.0, 3.0]);
        table = crate::testdata::without_rows(&table, |row| row.temperature == 20.0 && row.opr == 3.0);

        let request = CubeRequest {
            zero_bads: false,
            ..CubeRequest::default()
        }
        .with_var4(Some(Field::Opr));
        let mut reporter = ConditionReporter::new();
        let cube = build_cube(&table, &request, &mut reporter).unwrap();

        assert_eq!(cube.shape, vec![2, 2, 2, 2]);
        assert_eq!(reporter.len(), 1);
        let context = reporter.empty_slices().next().unwrap();
        assert_eq!(context, &[(Field::Temperature, 20.0), (Field::Opr, 3.0)]);

        // opr index 1, temperature index 1 is the empty slice
        assert!(cube.get(&[1, 1, 0, 0]).unwrap().is_nan());
        assert_eq!(cube.nan_count(), 4);
        assert_eq!(cube.metadata.axis(4).unwrap().ctype, "LIN-OPR");
    }

    #[test]
    fn test_zero_bads_post_pass() {
        let mut table = synthetic_table_4var(&[10.0, 20.0], &[3.0, 4.0], &[12.0, 13.0], &[1.0, 3.0]);
        table = crate::testdata::without_rows(&table, |row| row.temperature == 10.0 && row.opr == 1.0);
        let request = CubeRequest::default().with_var4(Some(Field::Opr));
        let mut reporter = ConditionReporter::new();
        let cube = build_cube(&table, &request, &mut reporter).unwrap();
        assert_eq!(cube.nan_count(), 0);
        assert_eq!(cube.get(&[0, 0, 1, 1]).unwrap(), 0.0);
    }

    #[test]
    fn test_var4_without_var3_rejected() {
        let table = synthetic_table(&[10.0], &[3.0, 4.0], &[12.0, 13.0]);
        let request = CubeRequest {
            var3: None,
            var4: Some(Field::Temperature),
            ..CubeRequest::default()
        };
        let mut reporter = ConditionReporter::new();
        assert!(matches!(
            build_cube(&table, &request, &mut reporter),
            Err(GridError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_unknown_plot_var() {
        let table = synthetic_table(&[10.0], &[3.0, 4.0], &[12.0, 13.0]);
        let request = CubeRequest::default().with_var4(Some(Field::Opr));
        let mut reporter = ConditionReporter::new();
        assert!(matches!(
            build_cube(&table, &request, &mut reporter),
            Err(GridError::UnknownField { .. })
        ));
    }
}
