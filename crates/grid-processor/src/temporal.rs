//! Hourly to daily reduction.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use era5_common::{DailyGrid, HourlyGrid};
use tracing::debug;

use crate::error::Result;
use crate::types::{Accumulator, Aggregation};

/// Reduce an hourly grid to one value per cell per local calendar day.
///
/// Timestamps are shifted by `tz_offset_hours` before grouping, so with an
/// offset of `+3` the hours 21:00 UTC to 20:00 UTC make up one day. Days
/// with fewer than 24 steps are kept. NaN values are ignored; a cell with no
/// finite values on a day is NaN.
pub fn daily_reduce(grid: &HourlyGrid, how: Aggregation, tz_offset_hours: i32) -> Result<DailyGrid> {
    let shift = Duration::hours(tz_offset_hours as i64);

    let mut days: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (t, time) in grid.times.iter().enumerate() {
        days.entry((*time + shift).date()).or_default().push(t);
    }

    let cells = grid.axes.len();
    let mut dates = Vec::with_capacity(days.len());
    let mut values = Vec::with_capacity(days.len() * cells);
    let mut partial = 0usize;

    for (date, steps) in days {
        if steps.len() < 24 {
            partial += 1;
        }

        let mut accs = vec![Accumulator::new(how); cells];
        for &t in &steps {
            for (acc, &v) in accs.iter_mut().zip(grid.slice(t)) {
                acc.push(v);
            }
        }

        dates.push(date);
        values.extend(
            accs.iter()
                .map(|acc| acc.finish().map(|v| v as f32).unwrap_or(f32::NAN)),
        );
    }

    if partial > 0 {
        // Edge days of a fetch window are expected to be short
        debug!(partial, "Some days have fewer than 24 hourly steps");
    }
    debug!(days = dates.len(), how = %how, tz_offset_hours, "Reduced to daily");

    Ok(DailyGrid::new(dates, grid.axes.clone(), values)?)
}
