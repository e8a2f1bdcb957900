//! Common types and utilities shared across the TEMPO air-quality crates.

pub mod bbox;
pub mod dataset;
pub mod error;
pub mod product;
pub mod request;
pub mod response;
pub mod time;

pub use bbox::BoundingBox;
pub use dataset::{indices_within, Dataset, DatasetError, Dimension, Selection, Variable};
pub use error::{TempoError, TempoResult};
pub use product::{Product, QUALITY_FLAG_VARIABLE, UNITS};
pub use request::{EndpointKind, RequestParams};
pub use response::{AggregateStats, MapPoint, TempoResponse, TimeSeriesEntry};
