//! Error types for catalog search and granule access.

use netcdf_parser::NetCdfError;
use tempo_common::DatasetError;
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Earthdata authentication failed: {0}")]
    Auth(String),

    #[error("Granule search failed: {0}")]
    Search(String),

    #[error("Granule download failed: {0}")]
    Download(String),

    #[error("Failed to read granule: {0}")]
    Read(#[from] NetCdfError),

    #[error("Failed to combine granules: {0}")]
    Combine(#[from] DatasetError),

    #[error("Unsupported open option: {0}")]
    Unsupported(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
