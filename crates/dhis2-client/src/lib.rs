//! Thin DHIS2 Web API client for importing gridded climate data.
//!
//! Covers the four calls the importer makes: a connectivity check, org-unit
//! boundaries as GeoJSON, a lookup of what is already stored, and the
//! data-value import. [`Dhis2Api`] is the seam the pipeline is written
//! against, so it can be driven by an in-memory implementation in tests.

pub mod client;
pub mod error;
pub mod org_units;
pub mod types;

pub use client::{Dhis2Api, Dhis2Client, Dhis2Config, ORG_UNIT_CHUNK};
pub use error::{Dhis2Error, Dhis2Result};
pub use org_units::OrgUnitFeatures;
pub use types::{
    latest_period, DataValue, DataValueSet, ImportConflict, ImportCount, ImportStrategy,
    ImportSummary, OrgUnit, SystemInfo,
};
