//! Coordinate-system metadata attached to every output cube.
//!
//! Axes are numbered from 1 starting at the fastest-varying (last) array
//! dimension. Each axis records a reference value at pixel 1, a type tag and a
//! step. The record flattens to `CRVALn` / `CRPIXn` / `CTYPEn` / `CDELTn`
//! keys plus `BTYPE` for the stored quantity.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::axis::AxisSpec;
use crate::error::{GridError, Result};

/// Coordinate description of one cube axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisCoordinate {
    /// 1-based axis number.
    pub number: usize,
    pub reference_value: f64,
    pub reference_pixel: u32,
    /// `LIN-<QUANTITY>` or `ONE-<QUANTITY>` for a single-valued axis.
    pub ctype: String,
    pub step: f64,
}

impl AxisCoordinate {
    pub fn from_axis(axis: &AxisSpec) -> Self {
        let prefix = if axis.degenerate { "ONE" } else { "LIN" };
        Self {
            number: axis.index,
            reference_value: axis.min(),
            reference_pixel: 1,
            ctype: format!("{}-{}", prefix, axis.field.quantity_tag()),
            step: axis.step(),
        }
    }
}

/// Coordinate metadata of a whole cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateMetadata {
    /// Name of the stored quantity.
    pub btype: String,
    /// Axes ordered by number.
    pub axes: Vec<AxisCoordinate>,
}

impl CoordinateMetadata {
    /// Build from axis specifications (any order; sorted by axis number).
    pub fn build(axes: &[AxisSpec], btype: impl Into<String>) -> Self {
        let mut coords: Vec<AxisCoordinate> = axes.iter().map(AxisCoordinate::from_axis).collect();
        coords.sort_by_key(|c| c.number);
        Self {
            btype: btype.into(),
            axes: coords,
        }
    }

    pub fn axis(&self, number: usize) -> Option<&AxisCoordinate> {
        self.axes.iter().find(|a| a.number == number)
    }

    /// Flat key/value record.
    pub fn to_attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert("BTYPE".to_string(), json!(self.btype));
        for axis in &self.axes {
            let n = axis.number;
            attrs.insert(format!("CRVAL{}", n), json!(axis.reference_value));
            attrs.insert(format!("CRPIX{}", n), json!(axis.reference_pixel));
            attrs.insert(format!("CTYPE{}", n), json!(axis.ctype));
            attrs.insert(format!("CDELT{}", n), json!(axis.step));
        }
        attrs
    }

    /// Rebuild from a flat record written by [`Self::to_attributes`].
    pub fn from_attributes(attrs: &Map<String, Value>) -> Result<Self> {
        let btype = attrs
            .get("BTYPE")
            .and_then(Value::as_str)
            .ok_or_else(|| GridError::container("missing BTYPE attribute"))?
            .to_string();

        let mut axes = Vec::new();
        for n in 1.. {
            let Some(ctype) = attrs.get(&format!("CTYPE{}", n)).and_then(Value::as_str) else {
                break;
            };
            let number_of = |key: &str| -> Result<f64> {
                attrs
                    .get(&format!("{}{}", key, n))
                    .and_then(Value::as_f64)
                    .ok_or_else(|| GridError::container(format!("missing {}{} attribute", key, n)))
            };
            axes.push(AxisCoordinate {
                number: n,
                reference_value: number_of("CRVAL")?,
                reference_pixel: number_of("CRPIX")? as u32,
                ctype: ctype.to_string(),
                step: number_of("CDELT")?,
            });
        }

        Ok(Self { btype, axes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    fn axis(field: Field, values: Vec<f64>, index: usize) -> AxisSpec {
        AxisSpec {
            field,
            degenerate: values.len() == 1,
            values,
            index,
        }
    }

    #[test]
    fn test_linear_and_single_axes() {
        let axes = vec![
            axis(Field::Density, vec![2.0, 2.5, 3.0], 1),
            axis(Field::Column, vec![12.0, 13.0], 2),
            axis(Field::Temperature, vec![50.0], 3),
        ];
        let meta = CoordinateMetadata::build(&axes, "tau1");

        let dens = meta.axis(1).unwrap();
        assert_eq!(dens.ctype, "LIN-DENS");
        assert_eq!(dens.reference_value, 2.0);
        assert_eq!(dens.reference_pixel, 1);
        assert_eq!(dens.step, 0.5);

        let temp = meta.axis(3).unwrap();
        assert_eq!(temp.ctype, "ONE-TEMP");
        assert_eq!(temp.step, 50.0);
    }

    #[test]
    fn test_flat_record_keys() {
        let axes = vec![
            axis(Field::Density, vec![2.0, 3.0], 1),
            axis(Field::Column, vec![12.0, 14.0], 2),
            axis(Field::Temperature, vec![10.0, 20.0], 3),
            axis(Field::Opr, vec![0.1, 3.0], 4),
        ];
        let attrs = CoordinateMetadata::build(&axes, "ratio").to_attributes();
        assert_eq!(attrs["BTYPE"], json!("ratio"));
        assert_eq!(attrs["CTYPE4"], json!("LIN-OPR"));
        assert_eq!(attrs["CDELT2"], json!(2.0));
        assert_eq!(attrs["CRPIX3"], json!(1));

        let back = CoordinateMetadata::from_attributes(&attrs).unwrap();
        assert_eq!(back.axes.len(), 4);
        assert_eq!(back.axis(4).unwrap().ctype, "LIN-OPR");
    }
}
