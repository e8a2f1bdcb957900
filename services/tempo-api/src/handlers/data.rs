//! Current-map and data-range handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::Response,
};
use chrono::Utc;
use tempo_common::TempoError;
use tempo_pipeline::RawQuery;

use super::{error_response, json_body};
use crate::state::AppContext;

/// GET /api/map/current - column statistics and map around a point for
/// the fixed window a year back.
pub async fn current_map_handler(
    Extension(ctx): Extension<Arc<AppContext>>,
    query: Result<Query<RawQuery>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(query)) => json_body(ctx.orchestrator.current_map(&query, Utc::now()).await),
        Err(rejection) => query_rejected(rejection),
    }
}

/// GET /api/data/range - statistics, time series and map for a date range.
pub async fn data_range_handler(
    Extension(ctx): Extension<Arc<AppContext>>,
    query: Result<Query<RawQuery>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(query)) => json_body(ctx.orchestrator.data_range(&query).await),
        Err(rejection) => query_rejected(rejection),
    }
}

fn query_rejected(rejection: QueryRejection) -> Response {
    error_response(&TempoError::validation(rejection.body_text()))
}
