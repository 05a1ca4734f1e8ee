//! Fixed-value cuts through a three-parameter table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::axis::distinct_sorted;
use crate::error::{GridError, Result};
use crate::field::Field;
use crate::table::SampleTable;

/// The independent variable held fixed by a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThirdVariable {
    Temperature,
    Density,
    Column,
}

impl ThirdVariable {
    pub const ALL: [ThirdVariable; 3] = [Self::Temperature, Self::Density, Self::Column];

    pub fn field(&self) -> Field {
        match self {
            Self::Temperature => Field::Temperature,
            Self::Density => Field::Density,
            Self::Column => Field::Column,
        }
    }

    /// `(x, y)` fields of the plane left after fixing this variable.
    pub fn plotted_fields(&self) -> (Field, Field) {
        match self {
            Self::Temperature => (Field::Density, Field::Column),
            Self::Density => (Field::Temperature, Field::Column),
            Self::Column => (Field::Temperature, Field::Density),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Density => "Density",
            Self::Column => "Column",
        }
    }

    pub fn x_label(&self) -> &'static str {
        axis_label(self.plotted_fields().0)
    }

    pub fn y_label(&self) -> &'static str {
        axis_label(self.plotted_fields().1)
    }

    /// Plot title for a cut at `value`. Density and column are shown linear.
    pub fn title(&self, value: f64) -> String {
        match self {
            Self::Temperature => format!("T = {} K", format_g(value)),
            Self::Density => format!("n = {} cm^-3", format_g(10f64.powf(value))),
            Self::Column => format!("N = {} cm^-2", format_g(10f64.powf(value))),
        }
    }

    /// File name stem for a cut at `value`.
    pub fn stem(&self, value: f64) -> String {
        match self {
            Self::Temperature => format!("DenCol_T={}K", value.trunc() as i64),
            Self::Density => format!("TemCol_n=1e{}percc", format_g(value)),
            Self::Column => format!("TemDen_N=1e{}persc", format_g(value)),
        }
    }
}

fn axis_label(field: Field) -> &'static str {
    match field {
        Field::Temperature => "Temperature (K)",
        Field::Density => "log(n_H2) (cm^-3)",
        Field::Column => "log(N_H2CO) (cm^-2)",
        other => other.name(),
    }
}

/// How the fixed value of a cut is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CutSpec {
    /// A literal value, compared exactly.
    Value(f64),
    /// Position in the sorted distinct values of the variable.
    Index(usize),
}

/// A resolved cut: the fixed value and the rows it selects.
#[derive(Debug, Clone, PartialEq)]
pub struct Cut {
    pub variable: ThirdVariable,
    pub value: f64,
    pub mask: Vec<bool>,
}

impl Cut {
    /// Number of selected rows.
    pub fn selected(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

/// Resolve `spec` against `table` and select the matching rows.
pub fn select_cut(table: &SampleTable, variable: ThirdVariable, spec: CutSpec) -> Result<Cut> {
    let column = table.column(variable.field())?;

    let value = match spec {
        CutSpec::Value(v) => v,
        CutSpec::Index(index) => {
            let values = distinct_sorted(&column);
            *values.get(index).ok_or_else(|| GridError::CutIndexOutOfRange {
                index,
                variable: variable.as_str().to_string(),
                count: values.len(),
            })?
        }
    };

    let mask: Vec<bool> = column.iter().map(|&v| v == value).collect();
    let cut = Cut {
        variable,
        value,
        mask,
    };
    if cut.selected() == 0 {
        return Err(GridError::no_matching_cut(value, variable.as_str()));
    }

    debug!(variable = variable.as_str(), value, rows = cut.selected(), "Selected cut");
    Ok(cut)
}

/// Format like C's `%g`: six significant digits, trailing zeros removed,
/// exponent form below 1e-4 or from 1e6.
pub fn format_g(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sci = format!("{:.5e}", value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (5 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::synthetic_table;

    #[test]
    fn test_format_g() {
        assert_eq!(format_g(20.0), "20");
        assert_eq!(format_g(4.5), "4.5");
        assert_eq!(format_g(10000.0), "10000");
        assert_eq!(format_g(1e13), "1e+13");
        assert_eq!(format_g(3.16227766e4), "31622.8");
        assert_eq!(format_g(0.00012), "0.00012");
        assert_eq!(format_g(0.000012), "1.2e-05");
        assert_eq!(format_g(-2.5), "-2.5");
    }

    #[test]
    fn test_labels() {
        assert_eq!(ThirdVariable::Temperature.stem(20.0), "DenCol_T=20K");
        assert_eq!(ThirdVariable::Temperature.title(20.0), "T = 20 K");
        assert_eq!(ThirdVariable::Density.stem(4.5), "TemCol_n=1e4.5percc");
        assert_eq!(ThirdVariable::Density.title(4.0), "n = 10000 cm^-3");
        assert_eq!(ThirdVariable::Column.stem(13.0), "TemDen_N=1e13persc");
        assert_eq!(ThirdVariable::Column.title(13.0), "N = 1e+13 cm^-2");
        assert_eq!(ThirdVariable::Column.x_label(), "Temperature (K)");
        assert_eq!(ThirdVariable::Column.y_label(), "log(n_H2) (cm^-3)");
    }

    #[test]
    fn test_select_by_index() {
        let table = synthetic_table(&[10.0, 20.0], &[3.0, 4.0, 5.0], &[12.0, 13.0, 14.0]);
        let cut = select_cut(&table, ThirdVariable::Temperature, CutSpec::Index(1)).unwrap();
        assert_eq!(cut.value, 20.0);
        assert_eq!(cut.selected(), 9);

        assert!(matches!(
            select_cut(&table, ThirdVariable::Temperature, CutSpec::Index(2)),
            Err(GridError::CutIndexOutOfRange { count: 2, .. })
        ));
    }

    #[test]
    fn test_no_matching_cut_iff_zero_rows() {
        let table = synthetic_table(&[10.0, 20.0], &[3.0, 4.0], &[12.0, 13.0]);
        assert!(select_cut(&table, ThirdVariable::Density, CutSpec::Value(4.0)).is_ok());
        match select_cut(&table, ThirdVariable::Density, CutSpec::Value(4.5)) {
            Err(GridError::NoMatchingCut { value, variable }) => {
                assert_eq!(value, 4.5);
                assert_eq!(variable, "Density");
            }
            other => panic!("expected NoMatchingCut, got {:?}", other),
        }
    }
}
