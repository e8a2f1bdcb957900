//! Per-product granule search and group merging.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use earthdata::{CatalogClient, GranuleQuery, OpenOptions};
use metrics::counter;
use tempo_common::{BoundingBox, Dataset, Product, TempoError, TempoResult};
use tracing::{error, info, instrument, warn};

/// Granule groups merged into one dataset, in conflict-priority order.
pub const PRODUCT_GROUPS: [Option<&str>; 3] = [None, Some("product"), Some("geolocation")];

/// Fetches and merges the datasets for every product.
pub struct DatasetFetcher {
    catalog: Arc<dyn CatalogClient>,
    version: String,
    max_granules: usize,
}

impl DatasetFetcher {
    pub fn new(catalog: Arc<dyn CatalogClient>, version: impl Into<String>, max_granules: usize) -> Self {
        Self {
            catalog,
            version: version.into(),
            max_granules,
        }
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogClient> {
        &self.catalog
    }

    /// Fetch every product over `[start, end]`.
    ///
    /// Products without granules and products whose fetch fails are left out
    /// of the result; an empty map means no data for the request.
    pub async fn fetch_all(
        &self,
        products: &[Product],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: Option<BoundingBox>,
    ) -> BTreeMap<Product, Dataset> {
        let results = futures::future::join_all(
            products
                .iter()
                .map(|&product| async move { (product, self.fetch_product(product, start, end, window).await) }),
        )
        .await;

        let mut datasets = BTreeMap::new();
        for (product, result) in results {
            match result {
                Ok(Some(dataset)) => {
                    counter!("tempo_product_fetch_total", "product" => product.name(), "outcome" => "ok")
                        .increment(1);
                    datasets.insert(product, dataset);
                }
                Ok(None) => {
                    counter!("tempo_product_fetch_total", "product" => product.name(), "outcome" => "empty")
                        .increment(1);
                }
                Err(e) => {
                    counter!("tempo_product_fetch_total", "product" => product.name(), "outcome" => "error")
                        .increment(1);
                    error!(product = %product, error = %e, "Failed to fetch product");
                }
            }
        }
        datasets
    }

    /// Search and merge one product. `Ok(None)` when no granules match.
    #[instrument(skip(self, product, window), fields(product = %product))]
    pub async fn fetch_product(
        &self,
        product: Product,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: Option<BoundingBox>,
    ) -> TempoResult<Option<Dataset>> {
        let query = GranuleQuery {
            short_name: product.short_name().to_string(),
            version: self.version.clone(),
            start,
            end,
            count: Some(self.max_granules),
        };

        let granules = self
            .catalog
            .search(&query)
            .await
            .map_err(|e| TempoError::upstream(product, e))?;

        info!(granules = granules.len(), "Found granules");
        if granules.is_empty() {
            warn!(short_name = product.short_name(), "No granules found");
            return Ok(None);
        }

        let options = OpenOptions {
            window,
            ..OpenOptions::default()
        };

        let mut groups = Vec::with_capacity(PRODUCT_GROUPS.len());
        for group in PRODUCT_GROUPS {
            let dataset = self
                .catalog
                .open(&granules, group, &options)
                .await
                .map_err(|e| TempoError::upstream(product, e))?;
            groups.push(dataset);
        }

        let merged = Dataset::merge_first_wins(groups).map_err(|e| TempoError::upstream(product, e))?;
        info!(
            time_steps = merged.time().len(),
            variables = merged.variable_names().len(),
            "Merged product groups"
        );
        Ok(Some(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{philly_latitudes, philly_longitudes, scan_hours, FakeCatalog, TempoGridBuilder};

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let hours = scan_hours(&[0, 23]);
        (hours[0], hours[1])
    }

    #[tokio::test]
    async fn test_merges_all_groups() {
        let grid = TempoGridBuilder::new(
            Product::No2,
            scan_hours(&[14, 15]),
            philly_latitudes(),
            philly_longitudes(),
        );
        let catalog = Arc::new(FakeCatalog::new().with_product(Product::No2, grid.groups()));
        let fetcher = DatasetFetcher::new(catalog.clone(), "V03", 10);

        let (start, end) = window();
        let merged = fetcher
            .fetch_product(Product::No2, start, end, None)
            .await
            .unwrap()
            .unwrap();

        assert!(merged.contains("vertical_column_troposphere"));
        assert!(merged.contains("main_data_quality_flag"));
        assert!(merged.contains("solar_zenith_angle"));
        assert_eq!(merged.attributes.get("source").map(String::as_str), Some("root"));
        assert_eq!(catalog.open_count(), 3);
    }

    #[tokio::test]
    async fn test_window_is_pushed_down() {
        let grid = TempoGridBuilder::new(
            Product::Hcho,
            scan_hours(&[14]),
            philly_latitudes(),
            philly_longitudes(),
        );
        let catalog = Arc::new(FakeCatalog::new().with_product(Product::Hcho, grid.groups()));
        let fetcher = DatasetFetcher::new(catalog, "V03", 10);

        let (start, end) = window();
        let bbox = BoundingBox::new(39.99, 40.01, -75.01, -74.99);
        let merged = fetcher
            .fetch_product(Product::Hcho, start, end, Some(bbox))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(merged.latitude(), &[40.0]);
        assert_eq!(merged.longitude(), &[-75.0]);
    }

    #[tokio::test]
    async fn test_no_granules_is_none() {
        let fetcher = DatasetFetcher::new(Arc::new(FakeCatalog::new()), "V03", 10);
        let (start, end) = window();
        assert!(fetcher
            .fetch_product(Product::O3, start, end, None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_failures_are_upstream_and_isolated() {
        let grid = TempoGridBuilder::new(Product::O3, scan_hours(&[14]), vec![40.0], vec![-75.0]);
        let catalog = Arc::new(
            FakeCatalog::new()
                .with_search_failure(Product::No2, "CMR returned 500")
                .with_product(Product::O3, grid.groups()),
        );
        let fetcher = DatasetFetcher::new(catalog, "V03", 10);
        let (start, end) = window();

        let err = fetcher
            .fetch_product(Product::No2, start, end, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TempoError::Upstream { product: Product::No2, .. }));

        let all = fetcher.fetch_all(&Product::ALL, start, end, None).await;
        assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec![Product::O3]);
    }
}
