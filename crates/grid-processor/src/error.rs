//! Error types for grid processing.

use era5_common::CommonError;
use thiserror::Error;

/// Errors that can occur while aggregating grids.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// Unknown aggregation name.
    #[error("unknown aggregation '{0}', expected one of sum, mean, min, max")]
    UnknownAggregation(String),

    /// Geometry that cannot be used as a zone.
    #[error("invalid geometry for zone {zone}: {reason}")]
    InvalidGeometry { zone: String, reason: String },

    /// Not enough time steps for the requested operation.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Grid shape error from the shared types.
    #[error(transparent)]
    Common(#[from] CommonError),
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
