//! Errors raised while reading TEMPO NetCDF granules.

use tempo_common::DatasetError;
use thiserror::Error;

pub type NetCdfResult<T> = Result<T, NetCdfError>;

#[derive(Error, Debug)]
pub enum NetCdfError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The granule has no group with this name.
    #[error("Group not found: {0}")]
    MissingGroup(String),

    /// A coordinate the reader depends on is absent.
    #[error("Variable not found: {0}")]
    MissingVariable(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Values read did not fit the dataset layout
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}
