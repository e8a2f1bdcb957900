//! Validated request parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which HTTP request kind produced the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// Fixed one-day window a year back, temporal mean only.
    CurrentMap,
    /// Caller-supplied window, temporal mean plus per-timestamp series.
    DataRange,
}

impl EndpointKind {
    /// Tag stored in the cache parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::CurrentMap => "current_map",
            EndpointKind::DataRange => "data_range",
        }
    }

    pub fn wants_time_series(&self) -> bool {
        matches!(self, EndpointKind::DataRange)
    }
}

/// Parameters of a single request after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParams {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub endpoint: EndpointKind,
    /// Start of the window as echoed back in the response.
    pub start_label: String,
    /// End of the window as echoed back in the response.
    pub end_label: String,
}
