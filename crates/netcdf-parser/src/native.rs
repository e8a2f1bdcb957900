//! Native NetCDF parsing using the netcdf library.
//!
//! Granules are read from spooled files; libnetcdf/HDF5 need a file path.

use std::ops::Range;
use std::path::Path;
use std::sync::Once;

use chrono::{DateTime, Utc};
use tempo_common::time::{cf_offset_to_datetime, gps_epoch, parse_cf_time_units};
use tempo_common::{indices_within, BoundingBox, Dataset, Dimension, Variable};
use tracing::{debug, warn};

use crate::error::{NetCdfError, NetCdfResult};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This function disables that output by calling
/// H5Eset_auto2 with null handlers. Safe to call multiple times.
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

/// Read one group of a TEMPO granule.
///
/// `group` is `None` for the root group. When `window` is given, only the
/// latitude/longitude hyperslab covering it is read from disk, so memory is
/// bounded by the window rather than the full L3 grid.
///
/// Variables with a dimension other than time/latitude/longitude, or with
/// those dimensions out of canonical order, are skipped.
pub fn read_group<P: AsRef<Path>>(
    path: P,
    group: Option<&str>,
    window: Option<&BoundingBox>,
) -> NetCdfResult<Dataset> {
    silence_hdf5_errors();

    let path = path.as_ref();
    let file = netcdf::open(path)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;

    let time = read_time(&file)?;
    let latitude = read_coordinate(&file, "latitude")?;
    let longitude = read_coordinate(&file, "longitude")?;

    let slab = match window {
        Some(bbox) => Hyperslab::covering(&latitude, &longitude, bbox),
        None => Hyperslab::full(latitude.len(), longitude.len()),
    };
    let mut dataset = Dataset::new(
        time,
        latitude[slab.latitude.clone()].to_vec(),
        longitude[slab.longitude.clone()].to_vec(),
    );

    match group {
        None => {
            copy_attributes(&mut dataset, file.attributes());
            load_variables(&mut dataset, &slab, file.variables())?;
        }
        Some(name) => {
            let nc_group = file
                .group(name)
                .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open group {}: {}", name, e)))?
                .ok_or_else(|| NetCdfError::MissingGroup(name.to_string()))?;
            copy_attributes(&mut dataset, nc_group.attributes());
            load_variables(&mut dataset, &slab, nc_group.variables())?;
        }
    }

    // Unsorted coordinates can leave cells outside the window inside the slab.
    if let Some(bbox) = window {
        dataset = dataset.select_box(bbox)?;
    }

    debug!(
        path = %path.display(),
        group = group.unwrap_or("/"),
        latitude = ?slab.latitude,
        longitude = ?slab.longitude,
        variables = dataset.variable_names().len(),
        "Read granule group"
    );

    Ok(dataset)
}

/// Contiguous latitude/longitude index ranges read from each variable.
#[derive(Debug, Clone, PartialEq)]
struct Hyperslab {
    latitude: Range<usize>,
    longitude: Range<usize>,
}

impl Hyperslab {
    fn full(lat_len: usize, lon_len: usize) -> Self {
        Self {
            latitude: 0..lat_len,
            longitude: 0..lon_len,
        }
    }

    fn covering(latitude: &[f64], longitude: &[f64], bbox: &BoundingBox) -> Self {
        Self {
            latitude: covering_range(latitude, bbox.lat_min, bbox.lat_max),
            longitude: covering_range(longitude, bbox.lon_min, bbox.lon_max),
        }
    }

    /// Per-dimension extents for a variable laid out over `dims`.
    fn extents(&self, dims: &[Dimension], time_len: usize) -> Vec<Range<usize>> {
        dims.iter()
            .map(|dim| match dim {
                Dimension::Time => 0..time_len,
                Dimension::Latitude => self.latitude.clone(),
                Dimension::Longitude => self.longitude.clone(),
            })
            .collect()
    }
}

/// Smallest index range holding every coordinate in `[min, max]`.
fn covering_range(coords: &[f64], min: f64, max: f64) -> Range<usize> {
    let inside = indices_within(coords, min, max);
    match (inside.first(), inside.last()) {
        (Some(&first), Some(&last)) => first..last + 1,
        _ => 0..0,
    }
}

fn load_variables<'f>(
    dataset: &mut Dataset,
    slab: &Hyperslab,
    variables: impl Iterator<Item = netcdf::Variable<'f>>,
) -> NetCdfResult<()> {
    let time_len = dataset.time().len();
    for nc_var in variables {
        let name = nc_var.name();
        if Dimension::from_name(&name).is_some() {
            // Coordinate variable, already on the dataset.
            continue;
        }

        let Some(dims) = canonical_dims(&nc_var) else {
            debug!(variable = %name, "Skipping variable with unsupported dimensions");
            continue;
        };

        let extents = slab.extents(&dims, time_len);
        let variable = read_variable(&nc_var, dims, &extents)?;
        dataset.insert_variable(name, variable)?;
    }
    Ok(())
}

fn canonical_dims(var: &netcdf::Variable) -> Option<Vec<Dimension>> {
    let dims: Option<Vec<Dimension>> = var
        .dimensions()
        .iter()
        .map(|d| Dimension::from_name(&d.name()))
        .collect();
    let dims = dims?;
    if dims.windows(2).any(|w| w[0] >= w[1]) {
        return None;
    }
    Some(dims)
}

fn read_variable(
    var: &netcdf::Variable,
    dims: Vec<Dimension>,
    extents: &[Range<usize>],
) -> NetCdfResult<Variable> {
    let name = var.name();
    let raw: Vec<f64> = if extents.iter().any(|r| r.is_empty()) {
        Vec::new()
    } else {
        var.get_values(extents)
            .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?
    };

    let scale_factor = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
    let add_offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);
    let fill_value = get_f64_attr(var, "_FillValue");

    let data = raw
        .into_iter()
        .map(|v| {
            if v.is_nan() || fill_value.is_some_and(|fill| v == fill) {
                None
            } else {
                Some(v * scale_factor + add_offset)
            }
        })
        .collect();

    let mut variable = Variable::new(dims, data)?;
    for attr in var.attributes() {
        if let Some(value) = attribute_string(&attr) {
            variable.attributes.insert(attr.name().to_string(), value);
        }
    }
    Ok(variable)
}

fn read_coordinate(file: &netcdf::File, name: &str) -> NetCdfResult<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingVariable(name.to_string()))?;
    var.get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))
}

fn read_time(file: &netcdf::File) -> NetCdfResult<Vec<DateTime<Utc>>> {
    let var = file
        .variable("time")
        .ok_or_else(|| NetCdfError::MissingVariable("time".to_string()))?;
    let offsets: Vec<f64> = var
        .get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read time: {}", e)))?;

    let units = var
        .attribute("units")
        .and_then(|attr| attribute_string(&attr));
    let (step, epoch) = match units.as_deref().and_then(parse_cf_time_units) {
        Some(parsed) => parsed,
        None => {
            warn!(units = ?units, "Unrecognized time units, assuming seconds since GPS epoch");
            (chrono::Duration::seconds(1), gps_epoch())
        }
    };

    Ok(offsets
        .into_iter()
        .map(|v| cf_offset_to_datetime(v, step, epoch))
        .collect())
}

fn copy_attributes<'a>(dataset: &mut Dataset, attributes: impl Iterator<Item = netcdf::Attribute<'a>>) {
    for attr in attributes {
        if let Some(value) = attribute_string(&attr) {
            dataset.attributes.insert(attr.name().to_string(), value);
        }
    }
}

fn attribute_string(attr: &netcdf::Attribute) -> Option<String> {
    use netcdf::AttributeValue;

    match attr.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        AttributeValue::Strs(v) => Some(v.join(",")),
        AttributeValue::Double(v) => Some(v.to_string()),
        AttributeValue::Float(v) => Some(v.to_string()),
        AttributeValue::Int(v) => Some(v.to_string()),
        AttributeValue::Short(v) => Some(v.to_string()),
        AttributeValue::Longlong(v) => Some(v.to_string()),
        _ => None,
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f64 attribute.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}
