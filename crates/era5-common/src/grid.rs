//! Regular lat/lon grids with a time axis.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{CommonError, CommonResult};

/// Cell-centre coordinates of a lat/lon grid.
///
/// Latitudes are stored in file order (ERA5 files run north to south).
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxes {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
}

impl GridAxes {
    pub fn new(lats: Vec<f64>, lons: Vec<f64>) -> Self {
        Self { lats, lons }
    }

    /// Number of cells in one time slice.
    pub fn len(&self) -> usize {
        self.lats.len() * self.lons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lats.is_empty() || self.lons.is_empty()
    }

    /// Flat index of (row, col) within a slice.
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        row * self.lons.len() + col
    }
}

/// Hourly values, time-major: `values[t * cells + row * nlon + col]`.
#[derive(Debug, Clone)]
pub struct HourlyGrid {
    /// UTC timestamps
    pub times: Vec<NaiveDateTime>,
    pub axes: GridAxes,
    pub values: Vec<f32>,
    /// `units` attribute of the source variable, if any
    pub units: Option<String>,
}

impl HourlyGrid {
    /// Create a grid, checking that `values` matches the shape.
    pub fn new(
        times: Vec<NaiveDateTime>,
        axes: GridAxes,
        values: Vec<f32>,
        units: Option<String>,
    ) -> CommonResult<Self> {
        check_shape(times.len(), &axes, values.len())?;
        Ok(Self {
            times,
            axes,
            values,
            units,
        })
    }

    /// Values of time step `t`.
    pub fn slice(&self, t: usize) -> &[f32] {
        let cells = self.axes.len();
        &self.values[t * cells..(t + 1) * cells]
    }

    pub fn num_times(&self) -> usize {
        self.times.len()
    }
}

/// Daily values, date-major, same layout as [`HourlyGrid`].
#[derive(Debug, Clone)]
pub struct DailyGrid {
    pub dates: Vec<NaiveDate>,
    pub axes: GridAxes,
    pub values: Vec<f32>,
}

impl DailyGrid {
    pub fn new(dates: Vec<NaiveDate>, axes: GridAxes, values: Vec<f32>) -> CommonResult<Self> {
        check_shape(dates.len(), &axes, values.len())?;
        Ok(Self {
            dates,
            axes,
            values,
        })
    }

    /// Values of day `d`.
    pub fn slice(&self, d: usize) -> &[f32] {
        let cells = self.axes.len();
        &self.values[d * cells..(d + 1) * cells]
    }
}

fn check_shape(steps: usize, axes: &GridAxes, len: usize) -> CommonResult<()> {
    let expected = steps * axes.len();
    if expected != len {
        return Err(CommonError::ShapeMismatch(format!(
            "expected {} x {} x {} = {} values, got {}",
            steps,
            axes.lats.len(),
            axes.lons.len(),
            expected,
            len
        )));
    }
    Ok(())
}
