//! Copernicus Climate Data Store client for ERA5-Land hourly data.
//!
//! Only what the importer needs: one dataset, one request shape, monthly
//! chunks, and a file cache keyed by date range so repeat runs skip months
//! already on disk.

pub mod cache;
pub mod client;
pub mod error;
pub mod request;

pub use cache::CacheDir;
pub use client::{CdsClient, CdsConfig, FetchReport, JobState};
pub use error::{CdsError, CdsResult};
pub use request::{area_for, cache_file_name, Era5LandRequest, DATASET, GRID_STEP};
