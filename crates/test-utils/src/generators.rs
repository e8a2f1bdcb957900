//! Synthetic TEMPO granule groups.
//!
//! Column values follow a predictable pattern so tests can check exactly which
//! cells survived cropping and masking:
//!
//! `value(t, i, j) = BASE_COLUMN * (1 + t * 100 + i * 10 + j)`

use chrono::{DateTime, Utc};
use tempo_common::{Dataset, Dimension, Product, Variable, QUALITY_FLAG_VARIABLE};

/// Order of magnitude of a tropospheric NO2 column in molecules/cm^2.
pub const BASE_COLUMN: f64 = 1.0e15;

/// Predictable column value for cell `(t, i, j)`.
pub fn column_value(t: usize, i: usize, j: usize) -> f64 {
    BASE_COLUMN * (1 + t * 100 + i * 10 + j) as f64
}

fn full_dims() -> Vec<Dimension> {
    vec![Dimension::Time, Dimension::Latitude, Dimension::Longitude]
}

/// Builds the three groups of a synthetic TEMPO L3 granule set.
#[derive(Debug, Clone)]
pub struct TempoGridBuilder {
    product: Product,
    times: Vec<DateTime<Utc>>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    bad_cells: Vec<(usize, usize, usize)>,
    missing_cells: Vec<(usize, usize, usize)>,
    with_result_variable: bool,
    with_quality_flag: bool,
}

impl TempoGridBuilder {
    pub fn new(product: Product, times: Vec<DateTime<Utc>>, latitudes: Vec<f64>, longitudes: Vec<f64>) -> Self {
        Self {
            product,
            times,
            latitudes,
            longitudes,
            bad_cells: Vec::new(),
            missing_cells: Vec::new(),
            with_result_variable: true,
            with_quality_flag: true,
        }
    }

    /// Flag cell `(t, i, j)` as low quality.
    pub fn bad_quality(mut self, t: usize, i: usize, j: usize) -> Self {
        self.bad_cells.push((t, i, j));
        self
    }

    /// Flag every cell as low quality.
    pub fn all_bad_quality(mut self) -> Self {
        for t in 0..self.times.len() {
            for i in 0..self.latitudes.len() {
                for j in 0..self.longitudes.len() {
                    self.bad_cells.push((t, i, j));
                }
            }
        }
        self
    }

    /// Leave cell `(t, i, j)` as a fill value.
    pub fn missing(mut self, t: usize, i: usize, j: usize) -> Self {
        self.missing_cells.push((t, i, j));
        self
    }

    /// Drop the product's result variable from the product group.
    pub fn without_result_variable(mut self) -> Self {
        self.with_result_variable = false;
        self
    }

    pub fn without_quality_flag(mut self) -> Self {
        self.with_quality_flag = false;
        self
    }

    fn index(&self, t: usize, i: usize, j: usize) -> usize {
        (t * self.latitudes.len() + i) * self.longitudes.len() + j
    }

    fn grid(&self) -> Dataset {
        Dataset::new(self.times.clone(), self.latitudes.clone(), self.longitudes.clone())
    }

    /// Root group: coordinates and global attributes.
    pub fn root(&self) -> Dataset {
        let mut ds = self.grid();
        ds.attributes.insert("title".into(), format!("TEMPO {} L3", self.product));
        ds.attributes.insert("source".into(), "root".into());
        ds
    }

    /// Product group: the result variable and the quality flag.
    pub fn product_group(&self) -> Dataset {
        let (nt, ny, nx) = (self.times.len(), self.latitudes.len(), self.longitudes.len());
        let mut values = Vec::with_capacity(nt * ny * nx);
        for t in 0..nt {
            for i in 0..ny {
                for j in 0..nx {
                    values.push(Some(column_value(t, i, j)));
                }
            }
        }
        for &(t, i, j) in &self.missing_cells {
            let idx = self.index(t, i, j);
            values[idx] = None;
        }

        let mut flags = vec![0.0; nt * ny * nx];
        for &(t, i, j) in &self.bad_cells {
            let idx = self.index(t, i, j);
            flags[idx] = 1.0;
        }

        let mut ds = self.grid();
        ds.attributes.insert("source".into(), "product".into());
        if self.with_result_variable {
            // Built from the axes above, so the length always matches.
            if let Ok(var) = Variable::new(full_dims(), values) {
                let var = var.with_attribute("units", "molecules/cm^2");
                let _ = ds.insert_variable(self.product.result_variable(), var);
            }
        }
        if self.with_quality_flag {
            if let Ok(var) = Variable::from_f64(full_dims(), flags) {
                let _ = ds.insert_variable(QUALITY_FLAG_VARIABLE, var);
            }
        }
        ds
    }

    /// Geolocation group: a solar zenith angle per cell, plus a copy of the
    /// result variable filled with -1 that clashes with the product group.
    pub fn geolocation_group(&self) -> Dataset {
        let n = self.times.len() * self.latitudes.len() * self.longitudes.len();
        let mut ds = self.grid();
        ds.attributes.insert("source".into(), "geolocation".into());
        if let Ok(var) = Variable::from_f64(full_dims(), vec![35.0; n]) {
            let _ = ds.insert_variable("solar_zenith_angle", var);
        }
        if self.with_result_variable {
            if let Ok(var) = Variable::from_f64(full_dims(), vec![-1.0; n]) {
                let _ = ds.insert_variable(self.product.result_variable(), var);
            }
        }
        ds
    }

    /// Root, product and geolocation groups, in that order.
    pub fn groups(&self) -> [Dataset; 3] {
        [self.root(), self.product_group(), self.geolocation_group()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;

    #[test]
    fn test_column_pattern() {
        assert_eq!(column_value(0, 0, 0), BASE_COLUMN);
        assert_eq!(column_value(1, 2, 3), BASE_COLUMN * 124.0);
    }

    #[test]
    fn test_groups_share_axes() {
        let builder = TempoGridBuilder::new(
            Product::No2,
            scan_hours(&[14, 15]),
            philly_latitudes(),
            philly_longitudes(),
        )
        .bad_quality(0, 1, 1)
        .missing(1, 0, 0);

        let [root, product, geo] = builder.groups();
        assert_eq!(root.time().len(), 2);
        assert_eq!(product.latitude(), geo.latitude());

        let flag = product.variable(QUALITY_FLAG_VARIABLE).unwrap();
        assert_eq!(flag.data()[builder.index(0, 1, 1)], Some(1.0));
        let vcd = product.variable("vertical_column_troposphere").unwrap();
        assert_eq!(vcd.data()[builder.index(1, 0, 0)], None);
    }

    #[test]
    fn test_without_result_variable() {
        let builder = TempoGridBuilder::new(Product::Hcho, scan_hours(&[14]), vec![40.0], vec![-75.0])
            .without_result_variable();
        assert!(!builder.product_group().contains("vertical_column"));
        assert!(!builder.geolocation_group().contains("vertical_column"));
    }
}
