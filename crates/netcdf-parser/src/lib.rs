//! NetCDF reader for TEMPO Level-3 granules.
//!
//! A TEMPO L3 granule is a NetCDF-4 file with the coordinate variables
//! (`time`, `latitude`, `longitude`) in the root group and the science
//! fields split across the root, `product` and `geolocation` groups. This
//! crate reads one group at a time into a [`tempo_common::Dataset`]; the
//! coordinates always come from the root group, so every group yields a
//! dataset on the same grid and the three can be merged directly.
//!
//! # Implementation Notes
//!
//! Reading goes through the `netcdf` crate (libnetcdf + HDF5). Fill values
//! and NaN become missing cells; `scale_factor`/`add_offset` are applied
//! when present.

pub mod error;
pub mod native;

pub use error::{NetCdfError, NetCdfResult};
pub use native::{read_group, silence_hdf5_errors};
