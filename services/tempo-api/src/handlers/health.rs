//! Health and metrics handlers.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::state::AppContext;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub redis_connected: bool,
    pub earthdata_authenticated: bool,
}

/// GET /health - Service, cache and catalog status
pub async fn health_handler(Extension(ctx): Extension<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        redis_connected: ctx.cache.ping().await,
        earthdata_authenticated: ctx.catalog.is_authenticated(),
    })
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(Extension(ctx): Extension<Arc<AppContext>>) -> Response {
    let body = ctx
        .prometheus
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::MemoryCache;
    use tempo_pipeline::PipelineConfig;
    use test_utils::{FakeCatalog, UnavailableCache};

    #[tokio::test]
    async fn test_health_handler() {
        let ctx = Arc::new(AppContext::new(
            Arc::new(FakeCatalog::new()),
            Arc::new(MemoryCache::new(4)),
            PipelineConfig::default(),
            None,
        ));
        let response = health_handler(Extension(ctx)).await;
        assert_eq!(response.status, "healthy");
        assert!(response.redis_connected);
        assert!(response.earthdata_authenticated);
    }

    #[tokio::test]
    async fn test_health_reports_degraded_collaborators() {
        let ctx = Arc::new(AppContext::new(
            Arc::new(FakeCatalog::new().unauthenticated()),
            Arc::new(UnavailableCache::new()),
            PipelineConfig::default(),
            None,
        ));
        let response = health_handler(Extension(ctx)).await;
        assert_eq!(response.status, "healthy");
        assert!(!response.redis_connected);
        assert!(!response.earthdata_authenticated);
    }
}
