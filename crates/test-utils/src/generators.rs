//! Synthetic ERA5-style grids with values that are easy to verify.

use chrono::{Duration, NaiveDateTime, Timelike};
use era5_common::{GridAxes, HourlyGrid};

/// A regular grid of cell centres, latitudes running north to south like ERA5.
///
/// `north_west` is the centre of the first cell; `step` is in degrees.
pub fn regular_axes(nlat: usize, nlon: usize, north_west: (f64, f64), step: f64) -> GridAxes {
    let (lon0, lat0) = north_west;
    let lats = (0..nlat).map(|j| lat0 - j as f64 * step).collect();
    let lons = (0..nlon).map(|i| lon0 + i as f64 * step).collect();
    GridAxes::new(lats, lons)
}

/// Consecutive hourly timestamps starting at `start`.
pub fn hourly_times(start: NaiveDateTime, hours: usize) -> Vec<NaiveDateTime> {
    (0..hours as i64).map(|h| start + Duration::hours(h)).collect()
}

/// Hourly grid where every cell holds `value` at every step.
pub fn constant_hourly_grid(
    axes: GridAxes,
    start: NaiveDateTime,
    hours: usize,
    value: f32,
) -> HourlyGrid {
    let values = vec![value; hours * axes.len()];
    HourlyGrid::new(hourly_times(start, hours), axes, values, Some("m".to_string()))
        .expect("shape is consistent by construction")
}

/// Hourly grid accumulated the way ERA5-Land stores precipitation.
///
/// Each cell receives `rate_per_hour[cell]` every hour. The stored value at
/// hour `h` is the total since 00 UTC, except at 00 UTC itself, which holds
/// the full previous day (24 hours' worth).
pub fn accumulated_hourly_grid(
    axes: GridAxes,
    start: NaiveDateTime,
    hours: usize,
    rate_per_hour: &[f32],
) -> HourlyGrid {
    assert_eq!(rate_per_hour.len(), axes.len(), "one rate per cell");
    let times = hourly_times(start, hours);
    let mut values = Vec::with_capacity(hours * axes.len());
    for time in &times {
        let hours_accumulated = match time.hour() {
            0 => 24,
            h => h,
        };
        values.extend(rate_per_hour.iter().map(|r| r * hours_accumulated as f32));
    }
    HourlyGrid::new(times, axes, values, Some("m".to_string()))
        .expect("shape is consistent by construction")
}
