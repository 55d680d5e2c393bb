//! ERA5-Land retrieve requests and cache file naming.

use chrono::Datelike;
use era5_common::{BoundingBox, DateRange};
use serde::Serialize;

/// CDS dataset id for hourly ERA5-Land.
pub const DATASET: &str = "reanalysis-era5-land";

/// Native ERA5-Land grid spacing in degrees.
pub const GRID_STEP: f64 = 0.1;

/// Request area for a set of zones: padded by one grid step, snapped
/// outward to the grid, and clamped to valid coordinates.
pub fn area_for(bbox: &BoundingBox) -> BoundingBox {
    bbox.expand(GRID_STEP)
        .snap_outward(GRID_STEP)
        .clamp_to_valid()
}

/// Cache file name for one chunk: `{prefix}_{YYYYMMDD}_{YYYYMMDD}.nc`.
pub fn cache_file_name(prefix: &str, range: &DateRange) -> String {
    format!(
        "{}_{}_{}.nc",
        prefix,
        range.start.format("%Y%m%d"),
        range.end.format("%Y%m%d")
    )
}

/// One CDS request: all hours of the days in `range` for `variables`.
///
/// `range` must lie within one calendar month, since CDS takes year, month
/// and day as independent lists and would otherwise return their cross
/// product.
#[derive(Debug, Clone, PartialEq)]
pub struct Era5LandRequest {
    pub variables: Vec<String>,
    pub range: DateRange,
    pub area: BoundingBox,
}

impl Era5LandRequest {
    pub fn new(variables: Vec<String>, range: DateRange, area: BoundingBox) -> Self {
        Self {
            variables,
            range,
            area,
        }
    }

    /// Split a date range into one request per calendar month.
    pub fn monthly(variables: &[String], range: &DateRange, area: BoundingBox) -> Vec<Self> {
        range
            .monthly_chunks()
            .into_iter()
            .map(|chunk| Self::new(variables.to_vec(), chunk, area))
            .collect()
    }

    /// The `inputs` object of the process execution body.
    pub fn inputs(&self) -> RequestInputs {
        let [north, west, south, east] = self.area.to_cds_area();
        RequestInputs {
            variable: self.variables.clone(),
            year: vec![format!("{:04}", self.range.start.year())],
            month: vec![format!("{:02}", self.range.start.month())],
            day: self
                .range
                .days()
                .map(|d| format!("{:02}", d.day()))
                .collect(),
            time: (0..24).map(|h| format!("{:02}:00", h)).collect(),
            area: [north, west, south, east].map(round_to_grid),
            data_format: "netcdf",
            download_format: "unarchived",
        }
    }

    pub fn execution_body(&self) -> ExecutionBody {
        ExecutionBody {
            inputs: self.inputs(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExecutionBody {
    pub inputs: RequestInputs,
}

#[derive(Debug, Serialize)]
pub struct RequestInputs {
    pub variable: Vec<String>,
    pub year: Vec<String>,
    pub month: Vec<String>,
    pub day: Vec<String>,
    pub time: Vec<String>,
    pub area: [f64; 4],
    pub data_format: &'static str,
    pub download_format: &'static str,
}

// One decimal, the grid resolution. Keeps `35.900000000000006` out of the JSON.
fn round_to_grid(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
