//! NetCDF reader for ERA5-Land hourly files from the Climate Data Store.
//!
//! Files produced by the CDS retrieve API hold one variable on a regular
//! 0.1° lat/lon grid, laid out `(valid_time, latitude, longitude)`. Older
//! CDS output names the time axis `time` and packs values as `short` with
//! `scale_factor`/`add_offset`; both layouts are handled.
//!
//! Multiple monthly files are combined with [`read_hourly_files`].

pub mod error;
pub mod native;
pub mod time_axis;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDateTime;
use era5_common::HourlyGrid;
use tracing::{info, warn};

pub use error::{NetCdfError, NetCdfResult};
pub use native::{read_hourly, silence_hdf5_errors};
pub use time_axis::{TimeAxis, TimeUnit};

/// Read several files of the same variable and grid into one hourly grid.
///
/// Time steps are sorted; when two files share a timestamp, the earlier
/// file in `paths` wins.
pub fn read_hourly_files<P: AsRef<Path>>(paths: &[P], value_var: &str) -> NetCdfResult<HourlyGrid> {
    let grids = paths
        .iter()
        .map(|p| read_hourly(p, value_var))
        .collect::<NetCdfResult<Vec<_>>>()?;
    let grid = concat_time(grids)?;

    info!(
        files = paths.len(),
        times = grid.num_times(),
        cells = grid.axes.len(),
        "Loaded hourly dataset"
    );
    Ok(grid)
}

/// Concatenate grids along time.
pub fn concat_time(grids: Vec<HourlyGrid>) -> NetCdfResult<HourlyGrid> {
    let mut iter = grids.into_iter();
    let first = iter.next().ok_or(NetCdfError::NoInput)?;
    let axes = first.axes.clone();
    let units = first.units.clone();
    let cells = axes.len();

    let mut by_time: BTreeMap<NaiveDateTime, Vec<f32>> = BTreeMap::new();
    let mut duplicates = 0usize;

    for grid in std::iter::once(first).chain(iter) {
        if grid.axes != axes {
            return Err(NetCdfError::IncompatibleGrids(format!(
                "grid {}x{} does not match {}x{}",
                grid.axes.lats.len(),
                grid.axes.lons.len(),
                axes.lats.len(),
                axes.lons.len()
            )));
        }
        if grid.units != units {
            warn!(expected = ?units, found = ?grid.units, "Units attribute differs between files");
        }
        for (t, time) in grid.times.iter().enumerate() {
            if by_time.contains_key(time) {
                duplicates += 1;
                continue;
            }
            by_time.insert(*time, grid.slice(t).to_vec());
        }
    }

    if duplicates > 0 {
        warn!(duplicates, "Dropped duplicate time steps");
    }

    let mut times = Vec::with_capacity(by_time.len());
    let mut values = Vec::with_capacity(by_time.len() * cells);
    for (time, slice) in by_time {
        times.push(time);
        values.extend(slice);
    }

    Ok(HourlyGrid::new(times, axes, values, units)?)
}
