//! Zonal statistics: daily grids reduced over organisation-unit polygons.
//!
//! A grid cell belongs to a zone when its centre lies inside the zone's
//! (multi)polygon. Masks are computed once per run and reused for every day.

use chrono::NaiveDate;
use era5_common::{AreaExt, DailyGrid, GridAxes, MultiPolygon};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::types::{Aggregation, ZonalValue};

/// A named area to aggregate over.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: String,
    pub geometry: MultiPolygon,
}

impl Zone {
    pub fn new(id: impl Into<String>, geometry: MultiPolygon) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}

/// The grid cells covered by one zone, as flat slice indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneMask {
    pub zone_id: String,
    pub cells: Vec<usize>,
}

impl ZoneMask {
    /// Select the cells of `axes` whose centres fall inside `geometry`.
    pub fn build(axes: &GridAxes, zone_id: &str, geometry: &MultiPolygon) -> Self {
        let mut cells = Vec::new();

        if let Some(bbox) = geometry.bbox() {
            for (row, &lat) in axes.lats.iter().enumerate() {
                for (col, &lon) in axes.lons.iter().enumerate() {
                    if bbox.contains(lon, lat) && geometry.covers_point(lon, lat) {
                        cells.push(axes.flat_index(row, col));
                    }
                }
            }
        }

        Self {
            zone_id: zone_id.to_string(),
            cells,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Build masks for all zones in parallel, in input order.
pub fn build_masks(axes: &GridAxes, zones: &[Zone]) -> Vec<ZoneMask> {
    zones
        .par_iter()
        .map(|zone| ZoneMask::build(axes, &zone.id, &zone.geometry))
        .collect()
}

/// Reduce each day of `daily` over each zone.
///
/// Output is ordered by zone (input order), then date. Zones that cover no
/// cell centre, and days where all of a zone's cells are NaN, yield no
/// record.
pub fn spatial_reduce(daily: &DailyGrid, zones: &[Zone], how: Aggregation) -> Vec<ZonalValue> {
    let masks = build_masks(&daily.axes, zones);

    let empty: Vec<&str> = masks
        .iter()
        .filter(|m| m.is_empty())
        .map(|m| m.zone_id.as_str())
        .collect();
    if !empty.is_empty() {
        warn!(
            count = empty.len(),
            zones = ?empty,
            "Zones cover no grid cell centre and are skipped"
        );
    }

    let per_zone: Vec<(Vec<ZonalValue>, usize)> = masks
        .par_iter()
        .filter(|m| !m.is_empty())
        .map(|mask| reduce_zone(daily, mask, how))
        .collect();

    let missing: usize = per_zone.iter().map(|(_, missing)| missing).sum();
    let values: Vec<ZonalValue> = per_zone.into_iter().flat_map(|(v, _)| v).collect();

    if missing > 0 {
        warn!(missing, "Zone-days with no finite values were skipped");
    }
    info!(
        zones = zones.len(),
        days = daily.dates.len(),
        values = values.len(),
        how = %how,
        "Aggregated to zones"
    );

    values
}

fn reduce_zone(daily: &DailyGrid, mask: &ZoneMask, how: Aggregation) -> (Vec<ZonalValue>, usize) {
    let mut out = Vec::with_capacity(daily.dates.len());
    let mut missing = 0usize;

    for (d, date) in daily.dates.iter().enumerate() {
        let slice = daily.slice(d);
        match how.reduce(mask.cells.iter().map(|&i| slice[i])) {
            Some(value) => out.push(zonal_value(&mask.zone_id, *date, value)),
            None => missing += 1,
        }
    }

    (out, missing)
}

fn zonal_value(zone_id: &str, date: NaiveDate, value: f64) -> ZonalValue {
    ZonalValue {
        zone_id: zone_id.to_string(),
        date,
        value,
    }
}
