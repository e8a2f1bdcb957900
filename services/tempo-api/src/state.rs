//! Application context shared by every handler.

use std::sync::Arc;

use anyhow::{Context, Result};
use earthdata::{CatalogClient, CmrCatalog};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::{MemoryCache, RedisCache, ResponseCache};
use tempo_pipeline::{PipelineConfig, RequestOrchestrator};
use tracing::info;

use crate::config::{Args, CacheBackend};

/// Built once at startup and passed to handlers through an `Extension`.
pub struct AppContext {
    pub catalog: Arc<dyn CatalogClient>,
    pub cache: Arc<dyn ResponseCache>,
    pub orchestrator: RequestOrchestrator,
    /// Present when a Prometheus recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppContext {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        cache: Arc<dyn ResponseCache>,
        config: PipelineConfig,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        let orchestrator = RequestOrchestrator::new(catalog.clone(), cache.clone(), config);
        Self {
            catalog,
            cache,
            orchestrator,
            prometheus,
        }
    }

    /// Connect the cache and the catalog described by `args`.
    pub async fn from_args(args: &Args, prometheus: Option<PrometheusHandle>) -> Result<Self> {
        let config = args.pipeline_config();
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid pipeline configuration")?;

        let cache: Arc<dyn ResponseCache> = match args.cache_backend {
            CacheBackend::Redis => Arc::new(RedisCache::connect_or_disabled(&args.redis_url()).await),
            CacheBackend::Memory => Arc::new(MemoryCache::new(args.memory_cache_entries)),
            CacheBackend::None => Arc::new(RedisCache::disabled()),
        };
        info!(backend = ?args.cache_backend, "Response cache ready");

        let credentials = args.credentials();
        let catalog = CmrCatalog::connect(args.cmr_config(), credentials.as_ref())
            .await
            .context("Failed to create catalog client")?;
        info!(
            cmr_url = %args.cmr_url,
            authenticated = catalog.is_authenticated(),
            "Catalog client ready"
        );

        Ok(Self::new(Arc::new(catalog), cache, config, prometheus))
    }
}
