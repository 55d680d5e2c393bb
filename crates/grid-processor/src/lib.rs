//! Aggregation of ERA5-Land hourly grids to daily values per zone.
//!
//! # Pipeline
//!
//! ```text
//! HourlyGrid (accumulated since 00 UTC)
//!      │
//!      ├─► deaccumulate        (optional, for accumulated variables)
//!      │
//!      ├─► daily_reduce        (sum/mean/min/max per local day)
//!      │
//!      └─► spatial_reduce      (sum/mean/min/max per zone polygon)
//!               │
//!               ▼
//!          Vec<ZonalValue>
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{daily_reduce, deaccumulate, spatial_reduce, Aggregation};
//!
//! let hourly = deaccumulate(&hourly)?;
//! let daily = daily_reduce(&hourly, Aggregation::Sum, 0)?;
//! let values = spatial_reduce(&daily, &zones, Aggregation::Mean);
//! ```

pub mod deaccumulate;
pub mod error;
pub mod spatial;
pub mod temporal;
pub mod types;

pub use deaccumulate::deaccumulate;
pub use error::{GridProcessorError, Result};
pub use spatial::{build_masks, spatial_reduce, Zone, ZoneMask};
pub use temporal::daily_reduce;
pub use types::{Aggregation, ZonalValue};
