//! Flattening aggregated fields into map points.

use tempo_common::{Dimension, MapPoint};
use thiserror::Error;

use crate::aggregate::SpatialField;

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("1D grid has {values} values but {latitude} latitudes and {longitude} longitudes")]
    CoordinateMismatch {
        values: usize,
        latitude: usize,
        longitude: usize,
    },

    #[error("Field has no spatial dimensions")]
    NoSpatialDims,
}

/// Flatten a field into one point per cell.
///
/// 2D fields are walked latitude-major. A 1D field pairs value `i` with the
/// `i`-th latitude and longitude, which requires all three lengths to agree.
pub fn extract(field: &SpatialField) -> Result<Vec<MapPoint>, GridError> {
    let value = |v: Option<f64>| v.filter(|x| !x.is_nan());

    match field.dims.as_slice() {
        [Dimension::Latitude, Dimension::Longitude] => {
            let width = field.longitude.len();
            Ok(field
                .latitude
                .iter()
                .enumerate()
                .flat_map(|(i, &lat)| {
                    field.longitude.iter().enumerate().map(move |(j, &lon)| MapPoint {
                        lon,
                        lat,
                        value: value(field.values[i * width + j]),
                    })
                })
                .collect())
        }
        [_] => {
            let n = field.values.len();
            if field.latitude.len() != n || field.longitude.len() != n {
                return Err(GridError::CoordinateMismatch {
                    values: n,
                    latitude: field.latitude.len(),
                    longitude: field.longitude.len(),
                });
            }
            Ok(field
                .values
                .iter()
                .zip(field.latitude.iter().zip(&field.longitude))
                .map(|(&v, (&lat, &lon))| MapPoint {
                    lon,
                    lat,
                    value: value(v),
                })
                .collect())
        }
        _ => Err(GridError::NoSpatialDims),
    }
}
