//! ERA5-Land to DHIS2 importer.
//!
//! Each run:
//! - Fetches org-unit boundaries from DHIS2
//! - Finds the last period already imported for the data element
//! - Downloads the missing days from the Climate Data Store (cached on disk)
//! - Reduces hourly grids to daily values per org unit
//! - Converts units and posts the values to `dataValueSets`
//!
//! Runs can be one-shot or driven by a cron schedule.

pub mod config;
pub mod cron;
pub mod metrics;
pub mod pipeline;
pub mod resume;
pub mod scheduler;
pub mod source;

pub use config::{Args, Command, ImporterConfig, LogFormat};
pub use pipeline::{run_import, RunOutcome};
