//! Spatial cropping and quality masking.

use tempo_common::{BoundingBox, Dataset, DatasetError, Dimension, Variable, QUALITY_FLAG_VARIABLE};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SubsetError {
    #[error("Quality flag variable '{0}' not found")]
    MissingQualityFlag(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Crop `dataset` to `bbox` and mask every cell whose quality flag is not 0.
///
/// Each variable is broadcast over the union of its own and the flag's
/// dimensions before masking, so a time-invariant variable becomes
/// time-indexed once a time-varying flag is applied to it. A missing flag
/// value counts as not usable.
pub fn subset(dataset: &Dataset, bbox: &BoundingBox) -> Result<Dataset, SubsetError> {
    let mut cropped = dataset.select_box(bbox)?;

    let flag = cropped
        .remove_variable(QUALITY_FLAG_VARIABLE)
        .ok_or_else(|| SubsetError::MissingQualityFlag(QUALITY_FLAG_VARIABLE.to_string()))?;

    let names: Vec<String> = cropped.variable_names().iter().map(|s| s.to_string()).collect();
    for name in names {
        if let Some(var) = cropped.remove_variable(&name) {
            let masked = mask_variable(&cropped, &var, &flag)?;
            cropped.insert_variable(name, masked)?;
        }
    }

    let masked_flag = mask_variable(&cropped, &flag, &flag)?;
    cropped.insert_variable(QUALITY_FLAG_VARIABLE, masked_flag)?;

    Ok(cropped)
}

fn mask_variable(
    dataset: &Dataset,
    var: &Variable,
    flag: &Variable,
) -> Result<Variable, DatasetError> {
    let mut target: Vec<Dimension> = var.dims().iter().chain(flag.dims()).copied().collect();
    target.sort();
    target.dedup();

    let shape = dataset.shape_of(&target);
    let total: usize = shape.iter().product();

    let var_index = Indexer::new(dataset, &target, var.dims());
    let flag_index = Indexer::new(dataset, &target, flag.dims());

    let mut data = Vec::with_capacity(total);
    let mut idx = vec![0usize; target.len()];
    for _ in 0..total {
        let usable = flag.data()[flag_index.offset(&idx)] == Some(0.0);
        data.push(if usable { var.data()[var_index.offset(&idx)] } else { None });

        for axis in (0..idx.len()).rev() {
            idx[axis] += 1;
            if idx[axis] < shape[axis] {
                break;
            }
            idx[axis] = 0;
        }
    }

    let mut masked = Variable::new(target, data)?;
    masked.attributes = var.attributes.clone();
    Ok(masked)
}

/// Maps a multi-index over the target dimensions to a flat offset into a
/// variable defined over a subset of them.
struct Indexer {
    positions: Vec<usize>,
    strides: Vec<usize>,
}

impl Indexer {
    fn new(dataset: &Dataset, target: &[Dimension], dims: &[Dimension]) -> Self {
        let positions = dims
            .iter()
            .filter_map(|d| target.iter().position(|t| t == d))
            .collect();
        let shape = dataset.shape_of(dims);
        let mut strides = vec![1usize; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        Self { positions, strides }
    }

    fn offset(&self, idx: &[usize]) -> usize {
        self.positions
            .iter()
            .zip(&self.strides)
            .map(|(&pos, &stride)| idx[pos] * stride)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn grid() -> Dataset {
        let times = vec![
            Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap(),
        ];
        Dataset::new(times, vec![39.0, 40.0, 41.0], vec![-76.0, -75.0])
    }

    fn full_dims() -> Vec<Dimension> {
        vec![Dimension::Time, Dimension::Latitude, Dimension::Longitude]
    }

    #[test]
    fn test_crop_and_mask() {
        let values: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let mut flags = vec![0.0; 12];
        flags[3] = 1.0; // t0, lat 40, lon -75
        flags[8] = 2.0; // t1, lat 40, lon -76

        let ds = grid()
            .with_variable("vcd", Variable::from_f64(full_dims(), values).unwrap())
            .unwrap()
            .with_variable(QUALITY_FLAG_VARIABLE, Variable::from_f64(full_dims(), flags).unwrap())
            .unwrap();

        let bbox = BoundingBox::new(39.5, 41.5, -76.5, -74.5);
        let out = subset(&ds, &bbox).unwrap();

        assert_eq!(out.latitude(), &[40.0, 41.0]);
        assert_eq!(out.longitude(), &[-76.0, -75.0]);
        assert_eq!(
            out.variable("vcd").unwrap().data(),
            &[Some(2.0), None, Some(4.0), Some(5.0), None, Some(9.0), Some(10.0), Some(11.0)]
        );
    }

    #[test]
    fn test_missing_flag_value_is_masked() {
        let ds = grid()
            .with_variable("vcd", Variable::from_f64(full_dims(), vec![1.0; 12]).unwrap())
            .unwrap()
            .with_variable(
                QUALITY_FLAG_VARIABLE,
                Variable::new(full_dims(), {
                    let mut f = vec![Some(0.0); 12];
                    f[0] = None;
                    f
                })
                .unwrap(),
            )
            .unwrap();

        let bbox = BoundingBox::new(-90.0, 90.0, -180.0, 180.0);
        let out = subset(&ds, &bbox).unwrap();
        assert_eq!(out.variable("vcd").unwrap().data()[0], None);
        assert_eq!(out.variable("vcd").unwrap().data()[1], Some(1.0));
    }

    #[test]
    fn test_time_invariant_variable_is_broadcast() {
        let spatial = vec![Dimension::Latitude, Dimension::Longitude];
        let mut flags = vec![0.0; 12];
        flags[6] = 1.0; // t1, lat 39, lon -76

        let ds = grid()
            .with_variable("surface", Variable::from_f64(spatial, vec![7.0; 6]).unwrap())
            .unwrap()
            .with_variable(QUALITY_FLAG_VARIABLE, Variable::from_f64(full_dims(), flags).unwrap())
            .unwrap();

        let bbox = BoundingBox::new(-90.0, 90.0, -180.0, 180.0);
        let out = subset(&ds, &bbox).unwrap();
        let surface = out.variable("surface").unwrap();
        assert_eq!(surface.dims(), full_dims().as_slice());
        assert_eq!(surface.data()[0], Some(7.0));
        assert_eq!(surface.data()[6], None);
    }

    #[test]
    fn test_missing_flag_variable() {
        let ds = grid()
            .with_variable("vcd", Variable::from_f64(full_dims(), vec![1.0; 12]).unwrap())
            .unwrap();
        let bbox = BoundingBox::new(-90.0, 90.0, -180.0, 180.0);
        assert!(matches!(subset(&ds, &bbox), Err(SubsetError::MissingQualityFlag(_))));
    }

    #[test]
    fn test_polar_box_keeps_every_longitude() {
        let times = vec![Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap()];
        let ds = Dataset::new(times, vec![89.9, 89.95], vec![-170.0, 0.0, 170.0])
            .with_variable("vcd", Variable::from_f64(full_dims(), vec![1.0; 6]).unwrap())
            .unwrap()
            .with_variable(QUALITY_FLAG_VARIABLE, Variable::from_f64(full_dims(), vec![0.0; 6]).unwrap())
            .unwrap();

        let bbox = crate::geo::bounding_box(89.95, 20.0, 50.0);
        let out = subset(&ds, &bbox).unwrap();
        assert_eq!(out.longitude(), &[-170.0, 0.0, 170.0]);
        assert_eq!(out.variable("vcd").unwrap().data(), &[Some(1.0); 6]);
    }

    #[test]
    fn test_empty_box() {
        let ds = grid()
            .with_variable("vcd", Variable::from_f64(full_dims(), vec![1.0; 12]).unwrap())
            .unwrap()
            .with_variable(QUALITY_FLAG_VARIABLE, Variable::from_f64(full_dims(), vec![0.0; 12]).unwrap())
            .unwrap();
        let bbox = BoundingBox::new(10.0, 11.0, 10.0, 11.0);
        let out = subset(&ds, &bbox).unwrap();
        assert!(out.latitude().is_empty());
        assert!(out.variable("vcd").unwrap().data().is_empty());
    }
}
