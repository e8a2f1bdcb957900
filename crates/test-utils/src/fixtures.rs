//! Common test fixtures for TEMPO pipeline tests.

use chrono::{DateTime, TimeZone, Utc};

/// Philadelphia, the reference location used across the test suite.
pub const PHILLY: (f64, f64) = (40.0, -75.0);

/// Box a 10 km radius around [`PHILLY`] should produce
/// (lat_min, lat_max, lon_min, lon_max).
pub const PHILLY_10KM_BOX: (f64, f64, f64, f64) = (39.9099, 40.0901, -75.1176, -74.8824);

/// Latitude axis of a 0.02° grid around [`PHILLY`], well inside a 10 km box.
pub fn philly_latitudes() -> Vec<f64> {
    vec![39.96, 39.98, 40.0, 40.02, 40.04]
}

/// Longitude axis of a 0.02° grid around [`PHILLY`], well inside a 10 km box.
pub fn philly_longitudes() -> Vec<f64> {
    vec![-75.04, -75.02, -75.0, -74.98, -74.96]
}

/// Hourly TEMPO scan times on 2024-01-01.
pub fn scan_hours(hours: &[u32]) -> Vec<DateTime<Utc>> {
    hours
        .iter()
        .filter_map(|&h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).single())
        .collect()
}
