//! Error types for grid assembly.

use thiserror::Error;

/// Errors that abort a single table load, cube or plot request.
#[derive(Error, Debug)]
pub enum GridError {
    /// A requested axis or plot field is not present in the table.
    #[error("unknown field '{field}' (table provides: {available})")]
    UnknownField { field: String, available: String },

    /// A fixed-value cut matched no rows of the table.
    #[error("cut value {value} does not match any of {variable} values")]
    NoMatchingCut { value: f64, variable: String },

    /// A cut index points past the distinct values of the cut variable.
    #[error("cut index {index} is out of range for {variable} ({count} distinct values)")]
    CutIndexOutOfRange {
        index: usize,
        variable: String,
        count: usize,
    },

    /// The header of a tabular file does not match a known column layout.
    #[error("header mismatch at column {column}: expected '{expected}', found '{found}'")]
    SchemaMismatch {
        column: usize,
        expected: String,
        found: String,
    },

    /// A line of a tabular file could not be parsed.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A request is structurally invalid (wrong axis count, empty grid, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An evaluation did not report a transition that the run asked for.
    #[error("evaluator returned no output for transition '{0}'")]
    MissingTransition(String),

    /// The physical model failed outright (not a convergence failure).
    #[error("evaluator failure: {0}")]
    Evaluator(String),

    /// Zarr container error.
    #[error("container error: {0}")]
    Container(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GridError {
    /// Create an UnknownField error.
    pub fn unknown_field(field: impl Into<String>, available: &[&str]) -> Self {
        Self::UnknownField {
            field: field.into(),
            available: available.join(", "),
        }
    }

    /// Create a NoMatchingCut error.
    pub fn no_matching_cut(value: f64, variable: impl Into<String>) -> Self {
        Self::NoMatchingCut {
            value,
            variable: variable.into(),
        }
    }

    /// Create a Parse error.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an InvalidRequest error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a Container error.
    pub fn container(msg: impl Into<String>) -> Self {
        Self::Container(msg.into())
    }
}

impl From<std::io::Error> for GridError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        Self::Container(err.to_string())
    }
}

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
