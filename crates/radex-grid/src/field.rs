//! Recognised table fields and column layouts.
//!
//! Every quantity that can be gridded or plotted is a [`Field`] variant with a
//! typed accessor on [`SampleRow`], so selecting a quantity never goes through
//! a name-keyed lookup table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::table::SampleRow;

/// A named scalar field of a sample table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Kinetic temperature (K).
    Temperature,
    /// log10 of the H2 volume density (cm^-3).
    Density,
    /// log10 of the species column density (cm^-2).
    Column,
    /// Ortho/para ratio of H2 (four-variable grids only).
    Opr,
    Tex1,
    Tex2,
    Tau1,
    Tau2,
    Tline1,
    Tline2,
    Flux1,
    Flux2,
    /// Derived ratio of the two lines, see [`RatioKind`].
    Ratio,
}

impl Field {
    /// All fields, stored columns first.
    pub const ALL: [Field; 13] = [
        Field::Temperature,
        Field::Density,
        Field::Column,
        Field::Opr,
        Field::Tex1,
        Field::Tex2,
        Field::Tau1,
        Field::Tau2,
        Field::Tline1,
        Field::Tline2,
        Field::Flux1,
        Field::Flux2,
        Field::Ratio,
    ];

    /// Short lowercase name used on the command line and in metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Density => "density",
            Self::Column => "column",
            Self::Opr => "opr",
            Self::Tex1 => "tex1",
            Self::Tex2 => "tex2",
            Self::Tau1 => "tau1",
            Self::Tau2 => "tau2",
            Self::Tline1 => "tline1",
            Self::Tline2 => "tline2",
            Self::Flux1 => "flux1",
            Self::Flux2 => "flux2",
            Self::Ratio => "ratio",
        }
    }

    /// Column name written in the header of a tabular grid file.
    pub fn header_name(&self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Density => "log10(dens)",
            Self::Column => "log10(col)",
            other => other.name(),
        }
    }

    /// True for the parameters that define a grid position.
    pub fn is_independent(&self) -> bool {
        matches!(
            self,
            Self::Temperature | Self::Density | Self::Column | Self::Opr
        )
    }

    /// Fields whose values carry floating-point jitter from the model run and
    /// are rounded before distinct values are taken.
    pub fn is_rounded(&self) -> bool {
        self.is_independent()
    }

    /// Quantity tag used in coordinate type strings (`LIN-TEMP`, ...).
    pub fn quantity_tag(&self) -> String {
        match self {
            Self::Temperature => "TEMP".to_string(),
            Self::Density => "DENS".to_string(),
            Self::Column => "COLU".to_string(),
            Self::Opr => "OPR".to_string(),
            other => other.name().to_uppercase(),
        }
    }

    /// Read this field from a row.
    pub fn value(&self, row: &SampleRow, ratio: RatioKind) -> f64 {
        match self {
            Self::Temperature => row.temperature,
            Self::Density => row.density,
            Self::Column => row.column,
            Self::Opr => row.opr,
            Self::Tex1 => row.tex1,
            Self::Tex2 => row.tex2,
            Self::Tau1 => row.tau1,
            Self::Tau2 => row.tau2,
            Self::Tline1 => row.tline1,
            Self::Tline2 => row.tline2,
            Self::Flux1 => row.flux1,
            Self::Flux2 => row.flux2,
            Self::Ratio => match ratio {
                RatioKind::Flux => row.flux1 / row.flux2,
                RatioKind::Tau => row.tau1 / row.tau2,
            },
        }
    }

    /// True if `token` names this field, either by header name or short name.
    pub fn matches_header(&self, token: &str) -> bool {
        token.eq_ignore_ascii_case(self.header_name()) || token.eq_ignore_ascii_case(self.name())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Field {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.matches_header(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = Field::ALL.iter().map(|f| f.name()).collect();
                GridError::unknown_field(s, &names)
            })
    }
}

/// Which pair of outputs forms the derived [`Field::Ratio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatioKind {
    /// flux1 / flux2
    #[default]
    Flux,
    /// tau1 / tau2
    Tau,
}

impl RatioKind {
    /// Parse from string (case-insensitive), defaulting to flux.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "tau" => Self::Tau,
            _ => Self::Flux,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flux => "flux",
            Self::Tau => "tau",
        }
    }
}

/// Column layout of a tabular grid file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schema {
    /// temperature, density, column + eight outputs.
    ThreeVar,
    /// temperature, density, column, opr + eight outputs.
    FourVar,
}

const THREE_VAR_COLUMNS: [Field; 11] = [
    Field::Temperature,
    Field::Density,
    Field::Column,
    Field::Tex1,
    Field::Tex2,
    Field::Tau1,
    Field::Tau2,
    Field::Tline1,
    Field::Tline2,
    Field::Flux1,
    Field::Flux2,
];

const FOUR_VAR_COLUMNS: [Field; 12] = [
    Field::Temperature,
    Field::Density,
    Field::Column,
    Field::Opr,
    Field::Tex1,
    Field::Tex2,
    Field::Tau1,
    Field::Tau2,
    Field::Tline1,
    Field::Tline2,
    Field::Flux1,
    Field::Flux2,
];

impl Schema {
    /// Stored columns, in file order.
    pub fn columns(&self) -> &'static [Field] {
        match self {
            Self::ThreeVar => &THREE_VAR_COLUMNS,
            Self::FourVar => &FOUR_VAR_COLUMNS,
        }
    }

    /// Whether a table with this layout can answer for `field`.
    pub fn provides(&self, field: Field) -> bool {
        field == Field::Ratio || self.columns().contains(&field)
    }

    /// Names of every field this layout provides.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.columns().iter().map(|f| f.name()).collect();
        names.push(Field::Ratio.name());
        names
    }

    /// Fail with `UnknownField` unless this layout provides `field`.
    pub fn require(&self, field: Field) -> Result<()> {
        if self.provides(field) {
            Ok(())
        } else {
            Err(GridError::unknown_field(field.name(), &self.field_names()))
        }
    }

    /// Header line in the canonical column names.
    pub fn header_line(&self) -> String {
        self.columns()
            .iter()
            .map(|f| f.header_name())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Pick the layout from the header tokens and validate every column.
    pub fn from_header(tokens: &[&str]) -> Result<Self> {
        let schema = match tokens.len() {
            11 => Self::ThreeVar,
            12 => Self::FourVar,
            n => {
                return Err(GridError::SchemaMismatch {
                    column: n,
                    expected: "11 or 12 columns".to_string(),
                    found: format!("{} columns", n),
                })
            }
        };

        for (i, (token, field)) in tokens.iter().zip(schema.columns()).enumerate() {
            if !field.matches_header(token) {
                return Err(GridError::SchemaMismatch {
                    column: i + 1,
                    expected: field.header_name().to_string(),
                    found: token.to_string(),
                });
            }
        }

        Ok(schema)
    }
}
