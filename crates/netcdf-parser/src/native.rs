//! Native NetCDF reading using the netcdf library.

use std::path::Path;
use std::sync::Once;

use chrono::NaiveDateTime;
use era5_common::{GridAxes, HourlyGrid};
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::time_axis::TimeAxis;

/// Names CDS has used for the time coordinate, newest first.
const TIME_NAMES: [&str; 2] = ["valid_time", "time"];
const LAT_NAMES: [&str; 2] = ["latitude", "lat"];
const LON_NAMES: [&str; 2] = ["longitude", "lon"];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). Call once before any NetCDF operation.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Read one ERA5-Land file into an hourly grid.
///
/// `value_var` is the short name of the data variable (e.g. `tp`), which must
/// be laid out as `(time, latitude, longitude)`.
pub fn read_hourly<P: AsRef<Path>>(path: P, value_var: &str) -> NetCdfResult<HourlyGrid> {
    silence_hdf5_errors();

    let path = path.as_ref();
    let lib_err = |e: netcdf::Error| NetCdfError::Library {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let file = netcdf::open(path).map_err(lib_err)?;

    let var = file
        .variable(value_var)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", value_var)))?;

    let dim_names: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    if dim_names.len() != 3 {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} has dimensions {:?}, expected (time, latitude, longitude)",
            value_var, dim_names
        )));
    }

    let time_var = find_variable(&file, &TIME_NAMES)?;
    let lat_var = find_variable(&file, &LAT_NAMES)?;
    let lon_var = find_variable(&file, &LON_NAMES)?;

    let time_units = get_string_attr(&time_var, "units")
        .ok_or_else(|| NetCdfError::MissingData("units attribute on time".to_string()))?;
    let axis = TimeAxis::parse(&time_units)?;

    let raw_times: Vec<f64> = time_var.get_values(..).map_err(lib_err)?;
    let times: Vec<NaiveDateTime> = raw_times
        .iter()
        .map(|&t| axis.to_datetime(t))
        .collect::<NetCdfResult<_>>()?;
    let lats: Vec<f64> = lat_var.get_values(..).map_err(lib_err)?;
    let lons: Vec<f64> = lon_var.get_values(..).map_err(lib_err)?;

    // libnetcdf converts packed integer storage to f32 on read
    let raw: Vec<f32> = var.get_values(..).map_err(lib_err)?;

    let scale_factor = get_f64_attr(&var, "scale_factor").unwrap_or(1.0);
    let add_offset = get_f64_attr(&var, "add_offset").unwrap_or(0.0);
    let fill_value = get_f64_attr(&var, "_FillValue").map(|v| v as f32);
    let missing_value = get_f64_attr(&var, "missing_value").map(|v| v as f32);
    let units = get_string_attr(&var, "units");

    let values: Vec<f32> = raw
        .into_iter()
        .map(|v| {
            if v.is_nan() || Some(v) == fill_value || Some(v) == missing_value {
                f32::NAN
            } else {
                (v as f64 * scale_factor + add_offset) as f32
            }
        })
        .collect();

    debug!(
        path = %path.display(),
        variable = value_var,
        times = times.len(),
        lats = lats.len(),
        lons = lons.len(),
        "Read NetCDF file"
    );

    Ok(HourlyGrid::new(times, GridAxes::new(lats, lons), values, units)?)
}

fn find_variable<'f>(file: &'f netcdf::File, names: &[&str]) -> NetCdfResult<netcdf::Variable<'f>> {
    names
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| NetCdfError::MissingData(format!("one of {:?} variables", names)))
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
