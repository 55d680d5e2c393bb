//! One import run: org units, resume point, download, aggregation, import.

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use dhis2_client::{DataValue, DataValueSet, Dhis2Api, ImportSummary, OrgUnit};
use era5_common::units::Conversion;
use era5_common::{AreaExt, BoundingBox, DateRange, HourlyGrid, Period};
use grid_processor::{daily_reduce, deaccumulate, spatial_reduce, Aggregation, ZonalValue, Zone};
use tracing::{debug, info, instrument, warn};

use crate::config::ImporterConfig;
use crate::resume::remaining_range;
use crate::source::HourlySource;

/// Decimal places kept in imported values.
pub const VALUE_DECIMALS: usize = 4;

/// What a run did.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Everything in the configured range is already in DHIS2
    NothingToImport,
    /// Data was fetched but no org unit produced a value
    NoData,
    /// Payload built but not sent
    DryRun { values: usize },
    /// Payload sent
    Imported { summary: ImportSummary },
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::NothingToImport => "nothing_to_import",
            RunOutcome::NoData => "no_data",
            RunOutcome::DryRun { .. } => "dry_run",
            RunOutcome::Imported { .. } => "imported",
        }
    }
}

/// Settings for the CPU-bound aggregation step.
#[derive(Debug, Clone, Copy)]
pub struct AggregationSettings {
    pub is_cumulative: bool,
    pub temporal: Aggregation,
    pub spatial: Aggregation,
    pub timezone_offset: i32,
}

impl From<&ImporterConfig> for AggregationSettings {
    fn from(config: &ImporterConfig) -> Self {
        Self {
            is_cumulative: config.is_cumulative,
            temporal: config.temporal_aggregation,
            spatial: config.spatial_aggregation,
            timezone_offset: config.timezone_offset,
        }
    }
}

/// Run the import once, as of `today`.
#[instrument(skip_all, fields(today = %today, dry_run = config.dry_run))]
pub async fn run_import<A, S>(
    config: &ImporterConfig,
    today: NaiveDate,
    dhis2: &A,
    source: &S,
) -> Result<RunOutcome>
where
    A: Dhis2Api + ?Sized,
    S: HourlySource + ?Sized,
{
    let info = dhis2
        .system_info()
        .await
        .context("Failed to connect to DHIS2")?;
    info!(version = %info.version, "Connected to DHIS2");

    let Some(configured) = config.configured_range(today) else {
        info!(
            start = %config.start_date,
            latency_days = config.latency_days,
            "Configured range has no published ERA5-Land days yet, nothing to import"
        );
        return Ok(RunOutcome::NothingToImport);
    };

    info!(level = config.org_unit_level, "Fetching organisation units from DHIS2");
    let org_units = dhis2
        .org_units_geojson(config.org_unit_level)
        .await
        .context("Failed to fetch organisation units")?;
    if org_units.is_empty() {
        bail!(
            "no organisation units with polygon geometry at level {}",
            config.org_unit_level
        );
    }
    info!(
        count = org_units.len(),
        level = config.org_unit_level,
        "Found organisation units"
    );

    let ids: Vec<String> = org_units.iter().map(|ou| ou.id.clone()).collect();
    let latest = dhis2
        .latest_imported_period(&config.data_element_id, &ids, &configured)
        .await
        .context("Failed to look up already imported periods")?;
    match &latest {
        Some(period) => info!(period = %period, "Last imported period"),
        None => info!("No existing data found"),
    }

    let Some(range) = remaining_range(&configured, latest) else {
        info!(configured = %configured, "All periods already imported, nothing to import");
        return Ok(RunOutcome::NothingToImport);
    };
    info!(start = %range.start, end = %range.end, "Import range");

    let bbox = org_units_bbox(&org_units).context("org units have no coordinates")?;
    let window = fetch_window(&range, config.timezone_offset);
    debug!(start = %window.start, end = %window.end, "Fetch window");
    let hourly = source.fetch_hourly(&window, &bbox).await?;

    let settings = AggregationSettings::from(config);
    let zones: Vec<Zone> = org_units
        .into_iter()
        .map(|ou| Zone::new(ou.id, ou.geometry))
        .collect();
    let values = tokio::task::spawn_blocking(move || aggregate(hourly, &zones, settings, &range))
        .await
        .context("Aggregation task failed")??;

    if values.is_empty() {
        warn!("No values produced for any organisation unit");
        return Ok(RunOutcome::NoData);
    }

    let conversion = Conversion::new(config.from_units, config.to_units)?;
    if conversion.is_identity() {
        info!("No unit conversion needed");
    } else {
        info!(from = %config.from_units, to = %config.to_units, "Applying unit conversion");
    }

    let payload = build_payload(&values, &config.data_element_id, &conversion);
    info!(values = payload.len(), "Created payload");

    if let Some(path) = &config.payload_file {
        write_payload(path, &payload).await?;
    }

    if config.dry_run {
        info!(values = payload.len(), "DRY RUN, skipping import");
        return Ok(RunOutcome::DryRun {
            values: payload.len(),
        });
    }

    info!(values = payload.len(), strategy = %config.import_strategy, "Importing data values");
    let summary = dhis2
        .import_data_values(&payload, config.import_strategy)
        .await
        .context("Failed to import data values")?;
    log_summary(&summary);

    if summary.is_error() {
        bail!(
            "DHIS2 rejected the import: {}",
            summary.description.as_deref().unwrap_or("no description")
        );
    }
    Ok(RunOutcome::Imported { summary })
}

/// Days of ERA5-Land data needed to produce full local days for `range`.
///
/// The day before is always included: its last hours are the de-accumulation
/// baseline for the first hour of `range.start`, and east of UTC they also
/// open the first local day. West of UTC the last local day ends on the
/// following UTC day, so that is included too.
pub fn fetch_window(range: &DateRange, tz_offset_hours: i32) -> DateRange {
    let day = Duration::days(1);
    let end = if tz_offset_hours < 0 {
        range.end + day
    } else {
        range.end
    };
    DateRange {
        start: range.start - day,
        end,
    }
}

/// De-accumulate (when configured), reduce to days, reduce to zones, and
/// keep only days inside `range`.
///
/// `hourly` normally covers [`fetch_window`], so the days at either edge are
/// partial and dropped here.
pub fn aggregate(
    hourly: HourlyGrid,
    zones: &[Zone],
    settings: AggregationSettings,
    range: &DateRange,
) -> Result<Vec<ZonalValue>> {
    let hourly = if settings.is_cumulative {
        info!("Converting cumulative to incremental values");
        deaccumulate(&hourly)?
    } else {
        hourly
    };

    info!(how = %settings.temporal, "Aggregating temporally");
    let daily = daily_reduce(&hourly, settings.temporal, settings.timezone_offset)?;

    info!(how = %settings.spatial, "Aggregating to organisation units");
    let mut values = spatial_reduce(&daily, zones, settings.spatial);

    let before = values.len();
    values.retain(|v| range.contains(v.date));
    if values.len() < before {
        debug!(dropped = before - values.len(), "Dropped values outside the import range");
    }
    Ok(values)
}

/// Build the `dataValueSets` payload, converting units.
pub fn build_payload(
    values: &[ZonalValue],
    data_element_id: &str,
    conversion: &Conversion,
) -> DataValueSet {
    let data_values = values
        .iter()
        .map(|v| DataValue {
            data_element: data_element_id.to_string(),
            org_unit: v.zone_id.clone(),
            period: Period::daily(v.date).id(),
            value: format_value(conversion.apply(v.value)),
        })
        .collect();
    DataValueSet { data_values }
}

/// Round to [`VALUE_DECIMALS`] places without trailing zeros.
pub fn format_value(value: f64) -> String {
    let s = format!("{:.*}", VALUE_DECIMALS, value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        s => s.to_string(),
    }
}

fn org_units_bbox(org_units: &[OrgUnit]) -> Option<BoundingBox> {
    org_units
        .iter()
        .filter_map(|ou| ou.geometry.bbox())
        .reduce(|a, b| a.union(&b))
}

async fn write_payload(path: &std::path::Path, payload: &DataValueSet) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(payload)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write payload to {}", path.display()))?;
    info!(path = %path.display(), "Wrote payload file");
    Ok(())
}

fn log_summary(summary: &ImportSummary) {
    let count = &summary.import_count;
    info!(
        status = %summary.status,
        imported = count.imported,
        updated = count.updated,
        ignored = count.ignored,
        deleted = count.deleted,
        "Import result"
    );
    for conflict in summary.conflicts.iter().take(20) {
        warn!(
            object = conflict.object.as_deref().unwrap_or(""),
            value = conflict.value.as_deref().unwrap_or(""),
            "Import conflict"
        );
    }
    if summary.conflicts.len() > 20 {
        warn!(total = summary.conflicts.len(), "More conflicts not shown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use era5_common::Unit;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(12.0), "12");
        assert_eq!(format_value(0.5), "0.5");
        assert_eq!(format_value(1.23456), "1.2346");
        assert_eq!(format_value(0.00004), "0");
        assert_eq!(format_value(-0.00004), "0");
        assert_eq!(format_value(100.10), "100.1");
        assert_eq!(format_value(-2.5), "-2.5");
    }

    #[test]
    fn test_build_payload_converts_units() {
        let values = vec![ZonalValue {
            zone_id: "DiszpKrYNg8".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
            value: 0.0123456,
        }];
        let conversion = Conversion::new(Unit::Metre, Unit::Millimetre).unwrap();
        let payload = build_payload(&values, "sB79w2hiLp8", &conversion);

        assert_eq!(
            payload.data_values,
            vec![DataValue {
                data_element: "sB79w2hiLp8".into(),
                org_unit: "DiszpKrYNg8".into(),
                period: "20250107".into(),
                value: "12.3456".into(),
            }]
        );
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_fetch_window() {
        let range = DateRange::new(d("2025-01-03"), d("2025-01-04")).unwrap();

        let window = fetch_window(&range, 0);
        assert_eq!((window.start, window.end), (d("2025-01-02"), d("2025-01-04")));

        let window = fetch_window(&range, 3);
        assert_eq!((window.start, window.end), (d("2025-01-02"), d("2025-01-04")));

        let window = fetch_window(&range, -5);
        assert_eq!((window.start, window.end), (d("2025-01-02"), d("2025-01-05")));

        // Across a year boundary
        let range = DateRange::new(d("2025-01-01"), d("2025-01-01")).unwrap();
        assert_eq!(fetch_window(&range, 0).start, d("2024-12-31"));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(RunOutcome::NothingToImport.label(), "nothing_to_import");
        assert_eq!(RunOutcome::DryRun { values: 3 }.label(), "dry_run");
    }
}
