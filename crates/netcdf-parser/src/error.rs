//! Error types for NetCDF parsing operations.

use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reported by libnetcdf
    #[error("NetCDF error in {path}: {message}")]
    Library { path: String, message: String },

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Files that cannot be concatenated
    #[error("Incompatible grids: {0}")]
    IncompatibleGrids(String),

    /// No files were given
    #[error("No input files")]
    NoInput,
}

impl From<era5_common::CommonError> for NetCdfError {
    fn from(err: era5_common::CommonError) -> Self {
        NetCdfError::InvalidFormat(err.to_string())
    }
}
