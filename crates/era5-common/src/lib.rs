//! Common types and utilities shared across the ERA5-Land importer crates.

pub mod bbox;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod time;
pub mod units;

pub use bbox::BoundingBox;
pub use error::{CommonError, CommonResult};
pub use geometry::{polygon_from_rings, AreaExt, MultiPolygon, Polygon};
pub use grid::{DailyGrid, GridAxes, HourlyGrid};
pub use time::{DateRange, Period};
pub use units::Unit;
