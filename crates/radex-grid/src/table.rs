//! In-memory sample table and its text format.
//!
//! A grid file is whitespace-delimited with one header row naming the
//! columns. Blank lines and lines starting with `#` are skipped. The header
//! is validated against [`Schema`] before any value is read, so a file with
//! swapped or missing columns fails instead of being silently misread.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{GridError, Result};
use crate::field::{Field, RatioKind, Schema};

/// One evaluated parameter combination with its model outputs.
///
/// Rows of a three-variable table carry `opr = NaN`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRow {
    pub temperature: f64,
    pub density: f64,
    pub column: f64,
    pub opr: f64,
    pub tex1: f64,
    pub tex2: f64,
    pub tau1: f64,
    pub tau2: f64,
    pub tline1: f64,
    pub tline2: f64,
    pub flux1: f64,
    pub flux2: f64,
}

impl SampleRow {
    /// Build a row from values in `schema` column order.
    pub fn from_values(schema: Schema, values: &[f64]) -> Self {
        let mut row = SampleRow {
            temperature: f64::NAN,
            density: f64::NAN,
            column: f64::NAN,
            opr: f64::NAN,
            tex1: f64::NAN,
            tex2: f64::NAN,
            tau1: f64::NAN,
            tau2: f64::NAN,
            tline1: f64::NAN,
            tline2: f64::NAN,
            flux1: f64::NAN,
            flux2: f64::NAN,
        };
        for (field, &value) in schema.columns().iter().zip(values) {
            row.set(*field, value);
        }
        row
    }

    fn set(&mut self, field: Field, value: f64) {
        match field {
            Field::Temperature => self.temperature = value,
            Field::Density => self.density = value,
            Field::Column => self.column = value,
            Field::Opr => self.opr = value,
            Field::Tex1 => self.tex1 = value,
            Field::Tex2 => self.tex2 = value,
            Field::Tau1 => self.tau1 = value,
            Field::Tau2 => self.tau2 = value,
            Field::Tline1 => self.tline1 = value,
            Field::Tline2 => self.tline2 = value,
            Field::Flux1 => self.flux1 = value,
            Field::Flux2 => self.flux2 = value,
            Field::Ratio => {}
        }
    }
}

/// Ordered collection of sample rows with columnar access.
#[derive(Debug, Clone)]
pub struct SampleTable {
    schema: Schema,
    ratio: RatioKind,
    rows: Vec<SampleRow>,
}

impl SampleTable {
    /// Create a table from rows already in memory.
    pub fn new(schema: Schema, rows: Vec<SampleRow>) -> Self {
        Self {
            schema,
            ratio: RatioKind::default(),
            rows,
        }
    }

    /// Select which outputs form the derived ratio field.
    pub fn with_ratio(mut self, ratio: RatioKind) -> Self {
        self.ratio = ratio;
        self
    }

    /// Load a table from a grid file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| GridError::Io(format!("{}: {}", path.display(), e)))?;
        let table = Self::parse(BufReader::new(file))?;
        info!(
            path = %path.display(),
            rows = table.len(),
            schema = ?table.schema,
            "Loaded sample table"
        );
        Ok(table)
    }

    /// Parse a table from any buffered reader.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut schema: Option<Schema> = None;
        let mut rows = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            let layout = match schema {
                Some(layout) => layout,
                None => {
                    schema = Some(Schema::from_header(&tokens)?);
                    continue;
                }
            };

            if tokens.len() != layout.columns().len() {
                return Err(GridError::parse(
                    line_no,
                    format!(
                        "expected {} values, found {}",
                        layout.columns().len(),
                        tokens.len()
                    ),
                ));
            }

            let values = tokens
                .iter()
                .map(|t| {
                    t.parse::<f64>()
                        .map_err(|e| GridError::parse(line_no, format!("'{}': {}", t, e)))
                })
                .collect::<Result<Vec<f64>>>()?;

            rows.push(SampleRow::from_values(layout, &values));
        }

        let schema = schema.ok_or_else(|| GridError::parse(0, "no header row found"))?;
        debug!(rows = rows.len(), "Parsed sample table");
        Ok(Self::new(schema, rows))
    }

    /// Write the table in the same format `parse` reads.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", self.schema.header_line())?;
        for row in &self.rows {
            let line = self
                .schema
                .columns()
                .iter()
                .map(|f| f.value(row, self.ratio).to_string())
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(writer, "{}", line)?;
        }
        Ok(())
    }

    /// Write the table to a file, replacing any existing one.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| GridError::Io(format!("{}: {}", path.display(), e)))?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), rows = self.len(), "Saved sample table");
        Ok(())
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn ratio_kind(&self) -> RatioKind {
        self.ratio
    }

    pub fn rows(&self) -> &[SampleRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Full-length column for `field`, aligned by row index.
    pub fn column(&self, field: Field) -> Result<Vec<f64>> {
        self.schema.require(field)?;
        Ok(self
            .rows
            .iter()
            .map(|row| field.value(row, self.ratio))
            .collect())
    }

    /// Row mask selecting rows where `field` equals `value` exactly.
    pub fn mask_eq(&self, field: Field, value: f64) -> Result<Vec<bool>> {
        Ok(self
            .column(field)?
            .into_iter()
            .map(|v| v == value)
            .collect())
    }

    /// Copy of the table with jitter-prone independent fields rounded.
    ///
    /// Four-variable tables also have the ortho/para ratio floored to
    /// hundredths, matching how the grids are generated.
    pub fn rounded(&self, decimals: u32) -> Self {
        let four_var = self.schema == Schema::FourVar;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut out = *row;
                for &field in self.schema.columns() {
                    if field.is_rounded() {
                        out.set(field, round_to(field.value(row, self.ratio), decimals));
                    }
                }
                if four_var {
                    out.opr = (out.opr * 100.0).floor() / 100.0;
                }
                out
            })
            .collect();

        Self {
            schema: self.schema,
            ratio: self.ratio,
            rows,
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GRID: &str = "\
# comment line
Temperature log10(dens) log10(col) tex1 tex2 tau1 tau2 tline1 tline2 flux1 flux2
10.0 4.0 13.0 5.0 6.0 0.1 0.2 1.0 2.0 3.0 6.0

20.0 4.0 13.0 7.0 8.0 0.3 0.6 1.5 2.5 4.0 2.0
";

    #[test]
    fn test_parse_small_grid() {
        let table = SampleTable::parse(SMALL_GRID.as_bytes()).unwrap();
        assert_eq!(table.schema(), Schema::ThreeVar);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column(Field::Temperature).unwrap(), vec![10.0, 20.0]);
        assert_eq!(table.column(Field::Ratio).unwrap(), vec![0.5, 2.0]);
        assert!(table.rows()[0].opr.is_nan());
    }

    #[test]
    fn test_tau_ratio() {
        let table = SampleTable::parse(SMALL_GRID.as_bytes())
            .unwrap()
            .with_ratio(RatioKind::Tau);
        assert_eq!(table.column(Field::Ratio).unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_parse_rejects_short_row() {
        let text = "temperature density column tex1 tex2 tau1 tau2 tline1 tline2 flux1 flux2\n\
                    10 4 13 1 2 3\n";
        assert!(matches!(
            SampleTable::parse(text.as_bytes()),
            Err(GridError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_parse_accepts_nan_and_inf() {
        let text = "temperature density column tex1 tex2 tau1 tau2 tline1 tline2 flux1 flux2\n\
                    10 4 13 nan inf -inf 1 1 1 1 1\n";
        let table = SampleTable::parse(text.as_bytes()).unwrap();
        assert!(table.rows()[0].tex1.is_nan());
        assert!(table.rows()[0].tex2.is_infinite());
    }

    #[test]
    fn test_write_then_parse_preserves_rows() {
        let table = SampleTable::parse(SMALL_GRID.as_bytes()).unwrap();
        let mut buf = Vec::new();
        table.write_to(&mut buf).unwrap();
        let reparsed = SampleTable::parse(buf.as_slice()).unwrap();
        assert_eq!(reparsed.rows(), table.rows());
    }

    #[test]
    fn test_rounded_only_touches_independent_fields() {
        let rows = vec![SampleRow::from_values(
            Schema::FourVar,
            &[
                10.004, 4.0049, 13.0, 2.999, 1.23456, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            ],
        )];
        let table = SampleTable::new(Schema::FourVar, rows).rounded(2);
        let row = table.rows()[0];
        assert_eq!(row.temperature, 10.0);
        assert_eq!(row.density, 4.0);
        // 2.999 rounds to 3.0, flooring keeps it there
        assert_eq!(row.opr, 3.0);
        assert_eq!(row.tex1, 1.23456);
    }

    #[test]
    fn test_mask_eq() {
        let table = SampleTable::parse(SMALL_GRID.as_bytes()).unwrap();
        assert_eq!(
            table.mask_eq(Field::Temperature, 20.0).unwrap(),
            vec![false, true]
        );
        assert!(table.mask_eq(Field::Opr, 1.0).is_err());
    }
}
