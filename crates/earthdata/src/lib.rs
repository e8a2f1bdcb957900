//! Access to TEMPO granules hosted by NASA Earthdata.
//!
//! The [`CatalogClient`] trait is the seam the pipeline fetches through.
//! [`CmrCatalog`] implements it against the CMR search API, downloading
//! granules with an Earthdata Login bearer token and reading them with
//! `netcdf-parser`.

pub mod auth;
pub mod client;
pub mod cmr;
pub mod error;
pub mod spool;

pub use auth::{EarthdataCredentials, EarthdataSession};
pub use client::{CatalogClient, ConflictPolicy, Granule, GranuleQuery, OpenOptions};
pub use cmr::{CmrCatalog, CmrConfig};
pub use error::{CatalogError, CatalogResult};
