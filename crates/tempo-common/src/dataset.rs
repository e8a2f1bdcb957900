//! Typed in-memory representation of a gridded TEMPO dataset.
//!
//! A [`Dataset`] carries three named coordinate axes (time, latitude,
//! longitude) and a set of variables defined over an ordered subset of those
//! axes. Cell values are `Option<f64>`; `None` is the missing marker, so fill
//! values and quality-masked cells never travel as NaN.
//!
//! Variable data is stored row-major with the axes in canonical order
//! (time, latitude, longitude).

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::bbox::BoundingBox;

/// Errors raised while assembling or combining datasets.
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Nothing to combine")]
    Empty,

    #[error("Dimension '{dimension}' has length {found}, expected {expected}")]
    ShapeMismatch {
        dimension: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Variable '{name}' has {found} values, expected {expected}")]
    DataLength {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Variable dimensions must be a subset of (time, latitude, longitude) in that order")]
    DimensionOrder,

    #[error("Variable '{0}' is missing from a granule being concatenated")]
    MissingInPart(String),

    #[error("Index {index} out of range for dimension '{dimension}' of length {len}")]
    IndexOutOfRange {
        dimension: &'static str,
        index: usize,
        len: usize,
    },
}

/// One of the three coordinate axes of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Time,
    Latitude,
    Longitude,
}

impl Dimension {
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Time => "time",
            Dimension::Latitude => "latitude",
            Dimension::Longitude => "longitude",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "time" => Some(Dimension::Time),
            "latitude" | "lat" => Some(Dimension::Latitude),
            "longitude" | "lon" => Some(Dimension::Longitude),
            _ => None,
        }
    }
}

/// A data variable: its axes, row-major values and string attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    dims: Vec<Dimension>,
    data: Vec<Option<f64>>,
    pub attributes: BTreeMap<String, String>,
}

impl Variable {
    /// Create a variable. `dims` must be strictly increasing in canonical order.
    pub fn new(dims: Vec<Dimension>, data: Vec<Option<f64>>) -> Result<Self, DatasetError> {
        if dims.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DatasetError::DimensionOrder);
        }
        Ok(Self {
            dims,
            data,
            attributes: BTreeMap::new(),
        })
    }

    /// Convenience constructor from plain floats; NaN becomes missing.
    pub fn from_f64(dims: Vec<Dimension>, values: Vec<f64>) -> Result<Self, DatasetError> {
        let data = values
            .into_iter()
            .map(|v| if v.is_nan() { None } else { Some(v) })
            .collect();
        Self::new(dims, data)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn data(&self) -> &[Option<f64>] {
        &self.data
    }

    pub fn has_dim(&self, dim: Dimension) -> bool {
        self.dims.contains(&dim)
    }

    pub fn units(&self) -> Option<&str> {
        self.attributes.get("units").map(String::as_str)
    }
}

/// Index selection along each axis, used by [`Dataset::isel`].
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// `None` keeps the whole axis.
    pub time: Option<Vec<usize>>,
    pub latitude: Option<Vec<usize>>,
    pub longitude: Option<Vec<usize>>,
}

impl Selection {
    fn axis(&self, dim: Dimension) -> Option<&[usize]> {
        match dim {
            Dimension::Time => self.time.as_deref(),
            Dimension::Latitude => self.latitude.as_deref(),
            Dimension::Longitude => self.longitude.as_deref(),
        }
    }
}

/// A merged, time-indexed gridded dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    time: Vec<DateTime<Utc>>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    variables: BTreeMap<String, Variable>,
    pub attributes: BTreeMap<String, String>,
}

impl Dataset {
    pub fn new(time: Vec<DateTime<Utc>>, latitude: Vec<f64>, longitude: Vec<f64>) -> Self {
        Self {
            time,
            latitude,
            longitude,
            variables: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn time(&self) -> &[DateTime<Utc>] {
        &self.time
    }

    pub fn latitude(&self) -> &[f64] {
        &self.latitude
    }

    pub fn longitude(&self) -> &[f64] {
        &self.longitude
    }

    /// Length of an axis.
    pub fn len_of(&self, dim: Dimension) -> usize {
        match dim {
            Dimension::Time => self.time.len(),
            Dimension::Latitude => self.latitude.len(),
            Dimension::Longitude => self.longitude.len(),
        }
    }

    /// Shape of a variable defined over `dims`.
    pub fn shape_of(&self, dims: &[Dimension]) -> Vec<usize> {
        dims.iter().map(|d| self.len_of(*d)).collect()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    /// Insert a variable after checking its data length against the axes.
    pub fn insert_variable(
        &mut self,
        name: impl Into<String>,
        variable: Variable,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        let expected: usize = self.shape_of(&variable.dims).iter().product();
        if variable.data.len() != expected {
            return Err(DatasetError::DataLength {
                name,
                expected,
                found: variable.data.len(),
            });
        }
        self.variables.insert(name, variable);
        Ok(())
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        self.variables.remove(name)
    }

    /// Builder-style [`insert_variable`](Self::insert_variable).
    pub fn with_variable(
        mut self,
        name: impl Into<String>,
        variable: Variable,
    ) -> Result<Self, DatasetError> {
        self.insert_variable(name, variable)?;
        Ok(self)
    }

    /// Select cells by index along each axis.
    pub fn isel(&self, selection: &Selection) -> Result<Dataset, DatasetError> {
        for dim in [Dimension::Time, Dimension::Latitude, Dimension::Longitude] {
            if let Some(picks) = selection.axis(dim) {
                let len = self.len_of(dim);
                if let Some(&index) = picks.iter().find(|&&i| i >= len) {
                    return Err(DatasetError::IndexOutOfRange {
                        dimension: dim.name(),
                        index,
                        len,
                    });
                }
            }
        }

        let time = pick(&self.time, selection.time.as_deref());
        let latitude = pick(&self.latitude, selection.latitude.as_deref());
        let longitude = pick(&self.longitude, selection.longitude.as_deref());

        let mut out = Dataset::new(time, latitude, longitude);
        out.attributes = self.attributes.clone();

        for (name, var) in &self.variables {
            let src_shape = self.shape_of(&var.dims);
            let picks: Vec<Vec<usize>> = var
                .dims
                .iter()
                .zip(&src_shape)
                .map(|(dim, &len)| match selection.axis(*dim) {
                    Some(p) => p.to_vec(),
                    None => (0..len).collect(),
                })
                .collect();

            let data = gather(&var.data, &src_shape, &picks);
            out.variables.insert(
                name.clone(),
                Variable {
                    dims: var.dims.clone(),
                    data,
                    attributes: var.attributes.clone(),
                },
            );
        }

        Ok(out)
    }

    /// Restrict the dataset to the cells whose coordinates fall inside `bbox`
    /// (bounds inclusive). The time axis is kept whole.
    pub fn select_box(&self, bbox: &BoundingBox) -> Result<Dataset, DatasetError> {
        let selection = Selection {
            time: None,
            latitude: Some(indices_within(&self.latitude, bbox.lat_min, bbox.lat_max)),
            longitude: Some(indices_within(&self.longitude, bbox.lon_min, bbox.lon_max)),
        };
        self.isel(&selection)
    }

    /// Concatenate granule datasets along the time axis.
    ///
    /// Only variables indexed by time are concatenated; everything else
    /// (latitude/longitude coordinates, time-invariant variables, attributes)
    /// is taken from the first part. Every part must carry each of the first
    /// part's time-indexed variables and agree on the spatial axis lengths.
    pub fn concat_time(parts: Vec<Dataset>) -> Result<Dataset, DatasetError> {
        let mut parts = parts.into_iter();
        let mut out = parts.next().ok_or(DatasetError::Empty)?;

        for part in parts {
            check_len(Dimension::Latitude, out.latitude.len(), part.latitude.len())?;
            check_len(Dimension::Longitude, out.longitude.len(), part.longitude.len())?;

            let mut part_vars = part.variables;
            for (name, var) in out.variables.iter_mut() {
                if !var.has_dim(Dimension::Time) {
                    continue;
                }
                let other = part_vars
                    .remove(name)
                    .ok_or_else(|| DatasetError::MissingInPart(name.clone()))?;
                if other.dims != var.dims {
                    return Err(DatasetError::DimensionOrder);
                }
                var.data.extend(other.data);
            }
            out.time.extend(part.time);
        }

        Ok(out)
    }

    /// Merge datasets, keeping the first occurrence of any variable,
    /// attribute or coordinate that appears in more than one of them.
    ///
    /// Axis lengths must agree; coordinate *values* are taken from the first
    /// dataset without comparison.
    pub fn merge_first_wins(datasets: Vec<Dataset>) -> Result<Dataset, DatasetError> {
        let mut datasets = datasets.into_iter();
        let mut merged = datasets.next().ok_or(DatasetError::Empty)?;

        for other in datasets {
            for dim in [Dimension::Time, Dimension::Latitude, Dimension::Longitude] {
                check_len(dim, merged.len_of(dim), other.len_of(dim))?;
            }
            for (name, var) in other.variables {
                merged.variables.entry(name).or_insert(var);
            }
            for (key, value) in other.attributes {
                merged.attributes.entry(key).or_insert(value);
            }
        }

        Ok(merged)
    }
}

fn check_len(dim: Dimension, expected: usize, found: usize) -> Result<(), DatasetError> {
    if expected != found {
        return Err(DatasetError::ShapeMismatch {
            dimension: dim.name(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Positions of the coordinate values lying in `[min, max]`.
pub fn indices_within(coords: &[f64], min: f64, max: f64) -> Vec<usize> {
    coords
        .iter()
        .enumerate()
        .filter(|(_, &c)| c >= min && c <= max)
        .map(|(i, _)| i)
        .collect()
}

fn pick<T: Clone>(values: &[T], picks: Option<&[usize]>) -> Vec<T> {
    match picks {
        Some(p) => p.iter().map(|&i| values[i].clone()).collect(),
        None => values.to_vec(),
    }
}

/// Gather a row-major sub-array given per-axis index lists.
fn gather(data: &[Option<f64>], shape: &[usize], picks: &[Vec<usize>]) -> Vec<Option<f64>> {
    if picks.is_empty() {
        return data.to_vec();
    }
    let total: usize = picks.iter().map(Vec::len).product();
    if total == 0 {
        return Vec::new();
    }

    let mut strides = vec![1usize; shape.len()];
    for k in (0..shape.len().saturating_sub(1)).rev() {
        strides[k] = strides[k + 1] * shape[k + 1];
    }

    let mut out = Vec::with_capacity(total);
    let mut counter = vec![0usize; picks.len()];
    loop {
        let offset: usize = counter
            .iter()
            .enumerate()
            .map(|(k, &c)| picks[k][c] * strides[k])
            .sum();
        out.push(data[offset]);

        // Odometer increment, innermost axis fastest.
        let mut axis = picks.len();
        loop {
            if axis == 0 {
                return out;
            }
            axis -= 1;
            counter[axis] += 1;
            if counter[axis] < picks[axis].len() {
                break;
            }
            counter[axis] = 0;
        }
    }
}
