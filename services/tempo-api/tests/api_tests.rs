//! Router-level tests with scripted collaborators.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use storage::MemoryCache;
use tempo_api::build_router;
use tempo_api::state::AppContext;
use tempo_common::Product;
use tempo_pipeline::PipelineConfig;
use test_utils::{philly_latitudes, philly_longitudes, scan_hours, FakeCatalog, TempoGridBuilder};
use tower::ServiceExt;

fn context(catalog: FakeCatalog) -> Arc<AppContext> {
    Arc::new(AppContext::new(
        Arc::new(catalog),
        Arc::new(MemoryCache::new(16)),
        PipelineConfig::default(),
        None,
    ))
}

async fn get(ctx: Arc<AppContext>, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = build_router(ctx)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_data_range_success() {
    let grid = TempoGridBuilder::new(
        Product::No2,
        scan_hours(&[14, 15]),
        philly_latitudes(),
        philly_longitudes(),
    );
    let ctx = context(FakeCatalog::new().with_product(Product::No2, grid.groups()));

    let (status, body) = get(
        ctx,
        "/api/data/range?lat=40&lon=-75&start_date=2024-01-01&end_date=2024-01-02",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latitude"], 40.0);
    assert_eq!(body["radius_km"], 10.0);
    assert_eq!(body["start_date"], "2024-01-01");
    assert_eq!(body["products"]["NO2"]["data_points"], 2);
    assert_eq!(body["products"]["NO2"]["units"], "molecules/cm^2");
    assert_eq!(body["products"]["NO2"]["time_series"].as_array().unwrap().len(), 2);
    let first = &body["map_data"]["NO2"][0];
    assert_eq!(first[0], 39.96);
    assert_eq!(first[1], -75.04);
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let ctx = context(FakeCatalog::new());

    let (status, body) = get(ctx.clone(), "/api/map/current?lat=91&lon=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "lat must be between -90 and 90");

    let (status, body) = get(ctx.clone(), "/api/map/current?lat=40").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "lat and lon parameters are required");

    let (status, body) = get(
        ctx.clone(),
        "/api/data/range?lat=40&lon=-75&start_date=2024-01-01&end_date=2023-12-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "start_date must be before end_date");

    let (status, body) = get(ctx, "/api/data/range?lat=40&lon=-75&start_date=yesterday&end_date=today").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid date format. Use ISO format YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS"
    );
}

#[tokio::test]
async fn test_no_data_is_404() {
    let ctx = context(FakeCatalog::new());
    let (status, body) = get(
        ctx,
        "/api/data/range?lat=40&lon=-75&start_date=2024-01-01&end_date=2024-01-02",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No data found for the specified parameters");
}

#[tokio::test]
async fn test_health_endpoint() {
    let ctx = context(FakeCatalog::new().unauthenticated());
    let (status, body) = get(ctx, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["redis_connected"], true);
    assert_eq!(body["earthdata_authenticated"], false);
}

#[tokio::test]
async fn test_malformed_query_is_json_error() {
    let ctx = context(FakeCatalog::new());

    for uri in [
        "/api/data/range?lat=40&lat=41&lon=-75&start_date=2024-01-01&end_date=2024-01-02",
        "/api/map/current?lat=40&lat=41&lon=-75",
    ] {
        let (status, body) = get(ctx.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()), "{uri}");
    }
}
