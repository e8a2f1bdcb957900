//! Temporal means, summary statistics and per-timestamp series.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use tempo_common::{AggregateStats, Dataset, Dimension, TimeSeriesEntry};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AggregateError {
    #[error("Variable '{0}' not found")]
    MissingVariable(String),
}

/// Mean, min and max over the non-missing values of a set of cells.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// A variable with the time axis collapsed away.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialField {
    /// Remaining axes, a subset of (latitude, longitude).
    pub dims: Vec<Dimension>,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
    /// Row-major values over `dims`.
    pub values: Vec<Option<f64>>,
}

/// Summarize the non-missing, non-NaN values. All-missing input yields nulls.
pub fn summarize<I>(values: I) -> Summary
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for v in values.into_iter().flatten().filter(|v| !v.is_nan()) {
        sum += v;
        count += 1;
        min = min.min(v);
        max = max.max(v);
    }

    if count == 0 {
        return Summary::default();
    }
    Summary {
        mean: Some(sum / count as f64),
        min: Some(min),
        max: Some(max),
    }
}

/// Average `name` over time, cell by cell, skipping missing values.
pub fn collapse_time(dataset: &Dataset, name: &str) -> Result<SpatialField, AggregateError> {
    let var = dataset
        .variable(name)
        .ok_or_else(|| AggregateError::MissingVariable(name.to_string()))?;

    let spatial_dims: Vec<Dimension> = var
        .dims()
        .iter()
        .copied()
        .filter(|d| *d != Dimension::Time)
        .collect();
    let cells: usize = dataset.shape_of(&spatial_dims).iter().product();

    let values = if var.has_dim(Dimension::Time) {
        let steps = dataset.len_of(Dimension::Time);
        (0..cells)
            .map(|cell| summarize((0..steps).map(|t| var.data()[t * cells + cell])).mean)
            .collect()
    } else {
        var.data().to_vec()
    };

    Ok(SpatialField {
        dims: spatial_dims,
        latitude: dataset.latitude().to_vec(),
        longitude: dataset.longitude().to_vec(),
        values,
    })
}

/// One entry per distinct timestamp, in time order.
///
/// Duplicate timestamps (overlapping granules) are pooled into one entry.
pub fn time_series(dataset: &Dataset, name: &str) -> Result<Vec<TimeSeriesEntry>, AggregateError> {
    let var = dataset
        .variable(name)
        .ok_or_else(|| AggregateError::MissingVariable(name.to_string()))?;

    if !var.has_dim(Dimension::Time) {
        return Ok(Vec::new());
    }

    let cells = var.data().len() / dataset.len_of(Dimension::Time).max(1);

    let mut by_time: BTreeMap<DateTime<Utc>, Vec<usize>> = BTreeMap::new();
    for (t, time) in dataset.time().iter().enumerate() {
        by_time.entry(*time).or_default().push(t);
    }

    Ok(by_time
        .into_iter()
        .map(|(time, steps)| {
            let summary = summarize(
                steps
                    .iter()
                    .flat_map(|&t| var.data()[t * cells..(t + 1) * cells].iter().copied()),
            );
            TimeSeriesEntry {
                time: time.to_rfc3339_opts(SecondsFormat::Secs, true),
                mean: summary.mean,
                min: summary.min,
                max: summary.max,
            }
        })
        .collect())
}

/// Statistics for one product's result variable.
///
/// `mean`/`min`/`max` are taken over the time-averaged field; `data_points`
/// is the length of the time axis. The returned field feeds the map grid.
pub fn aggregate(
    dataset: &Dataset,
    name: &str,
    with_series: bool,
    units: &str,
) -> Result<(AggregateStats, SpatialField), AggregateError> {
    let field = collapse_time(dataset, name)?;
    let summary = summarize(field.values.iter().copied());

    let time_series = if with_series {
        Some(time_series(dataset, name)?)
    } else {
        None
    };

    let stats = AggregateStats {
        mean: summary.mean,
        min: summary.min,
        max: summary.max,
        data_points: dataset.len_of(Dimension::Time),
        units: units.to_string(),
        time_series,
    };
    Ok((stats, field))
}
