//! Axis resolution and regular mesh construction.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::field::Field;
use crate::table::{round_to, SampleTable};

/// One independent field chosen to index a dimension of an output array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub field: Field,
    /// Sorted distinct values observed in the table (after rounding).
    pub values: Vec<f64>,
    /// True iff exactly one distinct value exists.
    pub degenerate: bool,
    /// 1-based axis number; the first requested axis is the last array dimension.
    pub index: usize,
}

impl AxisSpec {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.values.first().copied().unwrap_or(f64::NAN)
    }

    pub fn max(&self) -> f64 {
        self.values.last().copied().unwrap_or(f64::NAN)
    }

    /// Step between the first two native values, or the value itself when
    /// the axis is degenerate.
    pub fn step(&self) -> f64 {
        match self.values.as_slice() {
            [only] => *only,
            [first, second, ..] => second - first,
            [] => f64::NAN,
        }
    }

    /// Uniform coordinates spanning the native range with one point per
    /// native value.
    pub fn regular_coordinates(&self) -> Vec<f64> {
        linspace(self.min(), self.max(), self.len())
    }
}

/// Resolve 2-4 table fields into axis specifications.
///
/// Fields on the rounding allow-list are rounded to `decimals` places before
/// distinct values are taken.
pub fn resolve_axes(
    table: &SampleTable,
    fields: &[Field],
    decimals: Option<u32>,
) -> Result<Vec<AxisSpec>> {
    if !(2..=4).contains(&fields.len()) {
        return Err(GridError::invalid_request(format!(
            "expected 2 to 4 axes, got {}",
            fields.len()
        )));
    }

    fields
        .iter()
        .enumerate()
        .map(|(i, &field)| {
            let column = table.column(field)?;
            let column = match decimals {
                Some(d) if field.is_rounded() => {
                    column.into_iter().map(|v| round_to(v, d)).collect()
                }
                _ => column,
            };
            let values = distinct_sorted(&column);
            if values.is_empty() {
                return Err(GridError::invalid_request(format!(
                    "axis '{}' has no finite values",
                    field
                )));
            }
            Ok(AxisSpec {
                field,
                degenerate: values.len() == 1,
                values,
                index: i + 1,
            })
        })
        .collect()
}

/// Sorted distinct finite values.
pub fn distinct_sorted(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup();
    out
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
///
/// The last value is exactly `stop`; `n == 1` yields `[start]`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = stop;
            out
        }
    }
}

/// Target coordinates of a 2-D interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularMesh {
    /// Coordinates along the fast (column) dimension.
    pub x: Vec<f64>,
    /// Coordinates along the slow (row) dimension.
    pub y: Vec<f64>,
}

impl RegularMesh {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self { x, y }
    }

    /// Mesh spanning two axes with one point per native value.
    pub fn from_axes(x_axis: &AxisSpec, y_axis: &AxisSpec) -> Self {
        Self::new(x_axis.regular_coordinates(), y_axis.regular_coordinates())
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn ny(&self) -> usize {
        self.y.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::synthetic_table;

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(3.0, 3.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        let odd = linspace(0.1, 0.7, 7);
        assert_eq!(*odd.last().unwrap(), 0.7);
    }

    #[test]
    fn test_distinct_sorted_drops_duplicates_and_nan() {
        let values = [3.0, 1.0, f64::NAN, 3.0, 2.0, f64::INFINITY];
        assert_eq!(distinct_sorted(&values), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_resolve_axes_sorted_unique() {
        let table = synthetic_table(&[10.0, 20.0], &[3.0, 4.0, 5.0], &[12.0, 13.0, 14.0]);
        let axes = resolve_axes(
            &table,
            &[Field::Density, Field::Column, Field::Temperature],
            Some(2),
        )
        .unwrap();

        for axis in &axes {
            let mut sorted = axis.values.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            sorted.dedup();
            assert_eq!(sorted, axis.values);
            assert_eq!(axis.degenerate, axis.values.len() == 1);
        }
        assert_eq!(axes[0].index, 1);
        assert_eq!(axes[2].values, vec![10.0, 20.0]);
    }

    #[test]
    fn test_rounding_merges_jitter() {
        let table = synthetic_table(&[10.0, 10.001], &[3.0, 4.0], &[12.0, 13.0]);
        let rounded = resolve_axes(&table, &[Field::Density, Field::Temperature], Some(2)).unwrap();
        assert!(rounded[1].degenerate);
        assert_eq!(rounded[1].values, vec![10.0]);

        let raw = resolve_axes(&table, &[Field::Density, Field::Temperature], None).unwrap();
        assert_eq!(raw[1].values.len(), 2);
    }

    #[test]
    fn test_dependent_fields_not_rounded() {
        let table = synthetic_table(&[10.0, 20.0], &[3.0, 4.0], &[12.0, 13.0]);
        let axes = resolve_axes(&table, &[Field::Density, Field::Tex1], Some(0)).unwrap();
        let tex = table.column(Field::Tex1).unwrap();
        assert_eq!(axes[1].values, distinct_sorted(&tex));
    }

    #[test]
    fn test_step_sizes() {
        let table = synthetic_table(&[15.0], &[3.0, 3.5, 5.0], &[12.0, 13.0]);
        let axes = resolve_axes(&table, &[Field::Density, Field::Temperature], Some(2)).unwrap();
        assert!((axes[0].step() - 0.5).abs() < 1e-12);
        assert!(axes[1].degenerate);
        assert_eq!(axes[1].step(), 15.0);
    }

    #[test]
    fn test_axis_count_validated() {
        let table = synthetic_table(&[10.0], &[3.0], &[12.0]);
        assert!(matches!(
            resolve_axes(&table, &[Field::Density], None),
            Err(GridError::InvalidRequest(_))
        ));
        assert!(matches!(
            resolve_axes(&table, &[Field::Density, Field::Opr], None),
            Err(GridError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_mesh_is_uniform_for_nonuniform_axis() {
        let table = synthetic_table(&[10.0], &[3.0, 3.5, 5.0], &[12.0, 13.0]);
        let axes = resolve_axes(&table, &[Field::Density, Field::Column], Some(2)).unwrap();
        let mesh = RegularMesh::from_axes(&axes[0], &axes[1]);
        assert_eq!(mesh.x, vec![3.0, 4.0, 5.0]);
        assert_eq!(mesh.y, vec![12.0, 13.0]);
    }
}
