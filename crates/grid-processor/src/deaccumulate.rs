//! Conversion of running accumulations to per-step increments.
//!
//! ERA5-Land stores accumulated variables (precipitation, runoff) as the
//! total since 00 UTC, with the 00 UTC step holding the whole previous day.
//! Differencing consecutive steps gives hourly amounts everywhere except
//! where the accumulation restarts, which shows up as a negative jump.

use era5_common::HourlyGrid;
use tracing::debug;

use crate::error::{GridProcessorError, Result};

/// Turn accumulated values into increments.
///
/// For each step `t >= 1` the increment is `v[t] - v[t-1]`, or `v[t]` itself
/// when the difference is negative. The first step has no predecessor and
/// is dropped, so the result is one step shorter than the input.
pub fn deaccumulate(grid: &HourlyGrid) -> Result<HourlyGrid> {
    let steps = grid.num_times();
    if steps < 2 {
        return Err(GridProcessorError::InsufficientData(format!(
            "de-accumulation needs at least 2 time steps, got {}",
            steps
        )));
    }

    let cells = grid.axes.len();
    let mut values = Vec::with_capacity((steps - 1) * cells);
    let mut resets = 0usize;

    for t in 1..steps {
        let prev = grid.slice(t - 1);
        let curr = grid.slice(t);
        for (&p, &c) in prev.iter().zip(curr) {
            let diff = c - p;
            if diff < 0.0 {
                resets += 1;
                values.push(c);
            } else {
                values.push(diff);
            }
        }
    }

    debug!(steps = steps - 1, resets, "De-accumulated grid");

    Ok(HourlyGrid::new(
        grid.times[1..].to_vec(),
        grid.axes.clone(),
        values,
        grid.units.clone(),
    )?)
}
