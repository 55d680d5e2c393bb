//! Error types shared by the importer crates.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while parsing or validating shared value types.
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    #[error("Invalid period '{0}', expected YYYYMMDD or YYYYMM")]
    InvalidPeriod(String),

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Cannot convert between '{from}' and '{to}': incompatible dimensions")]
    IncompatibleUnits { from: String, to: String },

    #[error("Grid shape mismatch: {0}")]
    ShapeMismatch(String),
}
