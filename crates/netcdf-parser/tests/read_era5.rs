//! Reads NetCDF files laid out like CDS ERA5-Land output.

use std::path::Path;

use chrono::NaiveDateTime;
use netcdf_parser::{read_hourly, read_hourly_files, NetCdfError};
use test_utils::require_test_file;

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

/// Write a tiny `(valid_time, latitude, longitude)` file.
fn write_fixture(path: &Path, start_epoch: i64, hours: usize, values: &[f32]) {
    let lats = [0.1f64, 0.0];
    let lons = [36.0f64, 36.1, 36.2];
    assert_eq!(values.len(), hours * lats.len() * lons.len());

    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("valid_time", hours).unwrap();
    file.add_dimension("latitude", lats.len()).unwrap();
    file.add_dimension("longitude", lons.len()).unwrap();

    let times: Vec<i64> = (0..hours as i64).map(|h| start_epoch + h * 3600).collect();
    let mut var = file.add_variable::<i64>("valid_time", &["valid_time"]).unwrap();
    var.put_attribute("units", "seconds since 1970-01-01").unwrap();
    var.put_values(&times, ..).unwrap();

    let mut var = file.add_variable::<f64>("latitude", &["latitude"]).unwrap();
    var.put_values(&lats, ..).unwrap();

    let mut var = file.add_variable::<f64>("longitude", &["longitude"]).unwrap();
    var.put_values(&lons, ..).unwrap();

    let mut var = file
        .add_variable::<f32>("tp", &["valid_time", "latitude", "longitude"])
        .unwrap();
    var.put_attribute("units", "m").unwrap();
    var.put_attribute("_FillValue", -9999.0f32).unwrap();
    var.put_values(values, ..).unwrap();
}

// 2025-01-01T00:00:00Z
const JAN_1: i64 = 1_735_689_600;

#[test]
fn test_read_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("era5_hourly_20250101_20250101.nc");
    let mut values: Vec<f32> = (0..12).map(|v| v as f32 * 0.001).collect();
    values[4] = -9999.0;
    write_fixture(&path, JAN_1, 2, &values);

    let grid = read_hourly(&path, "tp").unwrap();
    assert_eq!(grid.times, vec![ts("2025-01-01 00:00"), ts("2025-01-01 01:00")]);
    assert_eq!(grid.axes.lats, vec![0.1, 0.0]);
    assert_eq!(grid.axes.lons, vec![36.0, 36.1, 36.2]);
    assert_eq!(grid.units.as_deref(), Some("m"));
    assert!((grid.slice(0)[1] - 0.001).abs() < 1e-7);
    assert!(grid.slice(0)[4].is_nan());
}

/// Same layout with `tp` packed as i16, the way CDS ships most variables.
fn write_packed_fixture(path: &Path, raw: &[i16]) {
    let lats = [0.1f64, 0.0];
    let lons = [36.0f64, 36.1, 36.2];
    assert_eq!(raw.len(), lats.len() * lons.len());

    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("valid_time", 1).unwrap();
    file.add_dimension("latitude", lats.len()).unwrap();
    file.add_dimension("longitude", lons.len()).unwrap();

    let mut var = file.add_variable::<i64>("valid_time", &["valid_time"]).unwrap();
    var.put_attribute("units", "seconds since 1970-01-01").unwrap();
    var.put_values(&[JAN_1], ..).unwrap();

    let mut var = file.add_variable::<f64>("latitude", &["latitude"]).unwrap();
    var.put_values(&lats, ..).unwrap();

    let mut var = file.add_variable::<f64>("longitude", &["longitude"]).unwrap();
    var.put_values(&lons, ..).unwrap();

    let mut var = file
        .add_variable::<i16>("tp", &["valid_time", "latitude", "longitude"])
        .unwrap();
    var.put_attribute("units", "m").unwrap();
    var.put_attribute("scale_factor", 0.001f64).unwrap();
    var.put_attribute("add_offset", 0.5f64).unwrap();
    var.put_attribute("missing_value", -32767i16).unwrap();
    var.put_values(raw, ..).unwrap();
}

#[test]
fn test_read_packed_short_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("packed.nc");
    write_packed_fixture(&path, &[0, 100, 200, -32767, 1000, 50]);

    let grid = read_hourly(&path, "tp").unwrap();
    assert_eq!(grid.times, vec![ts("2025-01-01 00:00")]);

    let values = grid.slice(0);
    let expected = [Some(0.5), Some(0.6), Some(0.7), None, Some(1.5), Some(0.55)];
    for (i, (v, want)) in values.iter().zip(expected).enumerate() {
        match want {
            Some(want) => assert!((*v as f64 - want).abs() < 1e-6, "cell {}: {} != {}", i, v, want),
            None => assert!(v.is_nan(), "cell {} should be missing, got {}", i, v),
        }
    }
}

#[test]
fn test_missing_variable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.nc");
    write_fixture(&path, JAN_1, 1, &[0.0; 6]);

    let err = read_hourly(&path, "t2m").unwrap_err();
    assert!(matches!(err, NetCdfError::MissingData(_)));
}

#[test]
fn test_read_multiple_files_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let jan = dir.path().join("jan.nc");
    let feb = dir.path().join("feb.nc");
    // 2025-01-31T23:00 and 2025-02-01T00:00
    write_fixture(&jan, JAN_1 + 30 * 86400 + 23 * 3600, 1, &[1.0; 6]);
    write_fixture(&feb, JAN_1 + 31 * 86400, 1, &[2.0; 6]);

    let grid = read_hourly_files(&[feb, jan], "tp").unwrap();
    assert_eq!(grid.times, vec![ts("2025-01-31 23:00"), ts("2025-02-01 00:00")]);
    assert_eq!(grid.slice(0), &[1.0; 6]);
    assert_eq!(grid.slice(1), &[2.0; 6]);
}

#[test]
fn test_real_cds_sample() {
    let path = require_test_file!("era5_land_tp_sample.nc");
    let grid = read_hourly(&path, "tp").unwrap();
    assert!(grid.num_times() > 0);
    assert!(!grid.axes.is_empty());
}
