//! TEMPO API Service Library
//!
//! HTTP surface over the TEMPO pipeline: current-map and data-range queries,
//! health and Prometheus metrics.

pub mod config;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppContext;

/// Build the service router around a shared context.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/api/map/current", get(handlers::data::current_map_handler))
        .route("/api/data/range", get(handlers::data::data_range_handler))
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(ctx))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
