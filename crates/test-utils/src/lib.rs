//! Shared test utilities for the TEMPO air-quality workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic TEMPO granule groups (root, product, geolocation)
//! - A scripted, in-memory [`CatalogClient`](earthdata::CatalogClient)
//! - Cache doubles for exercising degraded-cache behavior
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! ```ignore
//! use test_utils::{FakeCatalog, TempoGridBuilder};
//! ```

pub mod fakes;
pub mod fixtures;
pub mod generators;

pub use fakes::*;
pub use fixtures::*;
pub use generators::*;
