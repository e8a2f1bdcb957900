//! The TEMPO request pipeline.
//!
//! ```text
//! RequestOrchestrator::run(params)
//!      │
//!      ├─► CacheKeyCodec::encode ─► ResponseCache::get ─► hit: cached bytes
//!      │
//!      ├─► geo::bounding_box
//!      │
//!      ├─► DatasetFetcher::fetch_all (NO2, HCHO, O3 independently)
//!      │
//!      ├─► per product:
//!      │      subset::subset ─► aggregate::aggregate ─► grid::extract
//!      │
//!      └─► assemble TempoResponse ─► ResponseCache::set
//! ```
//!
//! A product with no granules, or whose fetch fails, is left out of the
//! response; only an empty result set fails the request.

pub mod aggregate;
pub mod config;
pub mod fetcher;
pub mod geo;
pub mod grid;
pub mod orchestrator;
pub mod subset;
pub mod validation;

pub use aggregate::{aggregate, collapse_time, summarize, AggregateError, SpatialField, Summary};
pub use config::PipelineConfig;
pub use fetcher::{DatasetFetcher, PRODUCT_GROUPS};
pub use geo::bounding_box;
pub use grid::{extract, GridError};
pub use orchestrator::{cache_params, RequestOrchestrator};
pub use subset::{subset, SubsetError};
pub use validation::{validate_current, validate_range, RawQuery};
