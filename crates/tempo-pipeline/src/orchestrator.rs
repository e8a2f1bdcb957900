//! Request orchestration: cache lookup, pipeline run, response assembly.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use earthdata::CatalogClient;
use metrics::{counter, histogram};
use storage::{CacheKey, CacheKeyCodec, CacheValue, ResponseCache};
use tempo_common::{
    AggregateStats, BoundingBox, Dataset, MapPoint, Product, RequestParams, TempoError,
    TempoResponse, TempoResult,
};
use tracing::{debug, info, instrument, warn};

use crate::aggregate::aggregate;
use crate::config::PipelineConfig;
use crate::fetcher::DatasetFetcher;
use crate::geo::bounding_box;
use crate::grid::extract;
use crate::subset::subset;
use crate::validation::{validate_current, validate_range, RawQuery};

const NO_DATA: &str = "No data found for the specified parameters";
const NO_VARIABLES: &str = "No valid data variables found in datasets";

/// Parameters a response is cached under: coordinates, the window truncated
/// to whole days and the endpoint kind.
pub fn cache_params(params: &RequestParams) -> Vec<(&'static str, CacheValue)> {
    vec![
        ("lat", params.lat.into()),
        ("lon", params.lon.into()),
        ("start", params.start_time.format("%Y-%m-%d").to_string().into()),
        ("end", params.end_time.format("%Y-%m-%d").to_string().into()),
        ("endpoint", params.endpoint.as_str().into()),
    ]
}

/// Drives one request through the cache and the fetch/subset/aggregate pipeline.
pub struct RequestOrchestrator {
    fetcher: DatasetFetcher,
    cache: Arc<dyn ResponseCache>,
    config: PipelineConfig,
}

impl RequestOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        cache: Arc<dyn ResponseCache>,
        config: PipelineConfig,
    ) -> Self {
        let fetcher = DatasetFetcher::new(catalog, config.product_version.clone(), config.max_granules);
        Self {
            fetcher,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogClient> {
        self.fetcher.catalog()
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    pub fn cache_key(params: &RequestParams) -> CacheKey {
        CacheKeyCodec::encode(cache_params(params))
    }

    /// Validate and serve a current-map request.
    pub async fn current_map(&self, query: &RawQuery, now: DateTime<Utc>) -> TempoResult<Bytes> {
        let params = validate_current(query, now, &self.config)?;
        self.run(&params).await
    }

    /// Validate and serve a data-range request.
    pub async fn data_range(&self, query: &RawQuery) -> TempoResult<Bytes> {
        let params = validate_range(query, &self.config)?;
        self.run(&params).await
    }

    /// Serve a validated request, from the cache when possible.
    ///
    /// The returned bytes are the JSON response body; a cache hit returns the
    /// stored body verbatim.
    #[instrument(skip(self, params), fields(endpoint = params.endpoint.as_str(), lat = params.lat, lon = params.lon))]
    pub async fn run(&self, params: &RequestParams) -> TempoResult<Bytes> {
        let endpoint = params.endpoint.as_str();
        counter!("tempo_requests_total", "endpoint" => endpoint).increment(1);

        let key = Self::cache_key(params);
        if let Some(cached) = self.cache.get(&key).await {
            counter!("tempo_cache_hits_total").increment(1);
            return Ok(cached);
        }
        counter!("tempo_cache_misses_total").increment(1);

        let started = Instant::now();
        let response = self.compute(params).await;
        histogram!("tempo_pipeline_duration_ms", "endpoint" => endpoint)
            .record(started.elapsed().as_secs_f64() * 1000.0);
        let response = response?;

        let body = Bytes::from(serde_json::to_vec(&response)?);
        self.cache.set(&key, body.clone(), self.config.cache_ttl).await;
        Ok(body)
    }

    /// Run the pipeline without touching the cache.
    pub async fn compute(&self, params: &RequestParams) -> TempoResult<TempoResponse> {
        let bbox = bounding_box(params.lat, params.lon, params.radius_km);
        info!(
            lat_min = bbox.lat_min,
            lat_max = bbox.lat_max,
            lon_min = bbox.lon_min,
            lon_max = bbox.lon_max,
            start = %params.start_time,
            end = %params.end_time,
            "Fetching data"
        );

        let datasets = self
            .fetcher
            .fetch_all(&self.config.products, params.start_time, params.end_time, Some(bbox))
            .await;
        if datasets.is_empty() {
            return Err(TempoError::not_found(NO_DATA));
        }

        let mut products = BTreeMap::new();
        let mut map_data = BTreeMap::new();
        for (product, dataset) in datasets {
            if let Some((stats, points)) = self.process_product(product, &dataset, params, &bbox) {
                products.insert(product, stats);
                if let Some(points) = points {
                    map_data.insert(product, points);
                }
            }
        }

        if products.is_empty() {
            return Err(TempoError::not_found(NO_VARIABLES));
        }

        Ok(TempoResponse {
            latitude: params.lat,
            longitude: params.lon,
            radius_km: params.radius_km,
            start_date: params.start_label.clone(),
            end_date: params.end_label.clone(),
            map_data,
            products,
        })
    }

    /// Subset, aggregate and grid one product.
    ///
    /// `None` skips the product (subsetting or aggregation failed, e.g. the
    /// result variable or quality flag is missing); the map is omitted when
    /// the grid cannot be flattened.
    fn process_product(
        &self,
        product: Product,
        dataset: &Dataset,
        params: &RequestParams,
        bbox: &BoundingBox,
    ) -> Option<(AggregateStats, Option<Vec<MapPoint>>)> {
        let variable = product.result_variable();

        let subset_ds = match subset(dataset, bbox) {
            Ok(ds) => ds,
            Err(e) => {
                warn!(product = %product, error = %e, "Skipping product");
                return None;
            }
        };

        let (stats, field) = match aggregate(
            &subset_ds,
            variable,
            params.endpoint.wants_time_series(),
            &self.config.units,
        ) {
            Ok(aggregated) => aggregated,
            Err(e) => {
                warn!(product = %product, variable, error = %e, "Skipping product");
                return None;
            }
        };

        let points = match extract(&field) {
            Ok(points) => Some(points),
            Err(e) => {
                warn!(product = %product, error = %e, "Omitting map grid");
                None
            }
        };

        debug!(product = %product, data_points = stats.data_points, "Processed product");
        Some((stats, points))
    }
}
