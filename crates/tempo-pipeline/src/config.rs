//! Pipeline settings.

use std::time::Duration;

use tempo_common::product::DEFAULT_VERSION;
use tempo_common::{Product, UNITS};

/// Settings handed to the [`RequestOrchestrator`](crate::RequestOrchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Search radius for current-map requests.
    pub current_radius_km: f64,

    /// Search radius for data-range requests.
    pub range_radius_km: f64,

    /// Maximum granules requested per product search.
    pub max_granules: usize,

    /// Catalog collection version.
    pub product_version: String,

    /// Products fetched for every request.
    pub products: Vec<Product>,

    /// Lifetime of cached responses.
    pub cache_ttl: Duration,

    /// Units reported alongside every statistic.
    pub units: String,

    /// Current-map window start, in days before now.
    pub current_window_start_days: i64,

    /// Current-map window end, in days before now.
    pub current_window_end_days: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            current_radius_km: 50.0,
            range_radius_km: 10.0,
            max_granules: 10,
            product_version: DEFAULT_VERSION.to_string(),
            products: Product::ALL.to_vec(),
            cache_ttl: Duration::from_secs(3600),
            units: UNITS.to_string(),
            current_window_start_days: 365,
            current_window_end_days: 364,
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.current_radius_km > 0.0 && self.current_radius_km.is_finite()) {
            return Err("current_radius_km must be positive".to_string());
        }
        if !(self.range_radius_km > 0.0 && self.range_radius_km.is_finite()) {
            return Err("range_radius_km must be positive".to_string());
        }
        if self.max_granules == 0 {
            return Err("max_granules must be at least 1".to_string());
        }
        if self.products.is_empty() {
            return Err("at least one product must be enabled".to_string());
        }
        if self.current_window_start_days < self.current_window_end_days {
            return Err("current-map window must start before it ends".to_string());
        }
        Ok(())
    }
}
