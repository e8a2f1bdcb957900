//! Query-parameter validation for the two request kinds.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;
use tempo_common::time::parse_iso8601;
use tempo_common::{EndpointKind, RequestParams, TempoError, TempoResult};

use crate::config::PipelineConfig;

/// Query parameters exactly as received. Values that fail to parse as
/// numbers are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn parse_float(value: Option<&String>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

fn check_coordinates(lat: f64, lon: f64) -> TempoResult<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(TempoError::validation("lat must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(TempoError::validation("lon must be between -180 and 180"));
    }
    Ok(())
}

/// Validate a current-map request. The window is fixed relative to `now`.
pub fn validate_current(
    query: &RawQuery,
    now: DateTime<Utc>,
    config: &PipelineConfig,
) -> TempoResult<RequestParams> {
    let (Some(lat), Some(lon)) = (parse_float(query.lat.as_ref()), parse_float(query.lon.as_ref()))
    else {
        return Err(TempoError::validation("lat and lon parameters are required"));
    };
    check_coordinates(lat, lon)?;

    let start_time = now - Duration::days(config.current_window_start_days);
    let end_time = now - Duration::days(config.current_window_end_days);

    Ok(RequestParams {
        lat,
        lon,
        radius_km: config.current_radius_km,
        start_time,
        end_time,
        endpoint: EndpointKind::CurrentMap,
        start_label: start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
        end_label: end_time.to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

/// Validate a data-range request.
pub fn validate_range(query: &RawQuery, config: &PipelineConfig) -> TempoResult<RequestParams> {
    let (Some(lat), Some(lon), Some(start), Some(end)) = (
        parse_float(query.lat.as_ref()),
        parse_float(query.lon.as_ref()),
        query.start_date.as_ref(),
        query.end_date.as_ref(),
    ) else {
        return Err(TempoError::validation(
            "lat, lon, start_date, and end_date parameters are required",
        ));
    };
    check_coordinates(lat, lon)?;

    let (Some(start_time), Some(end_time)) = (parse_iso8601(start), parse_iso8601(end)) else {
        return Err(TempoError::validation(
            "Invalid date format. Use ISO format YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS",
        ));
    };

    if start_time > end_time {
        return Err(TempoError::validation("start_date must be before end_date"));
    }

    Ok(RequestParams {
        lat,
        lon,
        radius_km: config.range_radius_km,
        start_time,
        end_time,
        endpoint: EndpointKind::DataRange,
        start_label: start.clone(),
        end_label: end.clone(),
    })
}
