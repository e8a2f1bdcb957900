//! Response payload types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::product::Product;

/// Spatial/temporal summary of one product's result variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    #[serde(rename = "mean_value")]
    pub mean: Option<f64>,
    #[serde(rename = "min_value")]
    pub min: Option<f64>,
    #[serde(rename = "max_value")]
    pub max: Option<f64>,
    /// Length of the time axis before averaging.
    pub data_points: usize,
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_series: Option<Vec<TimeSeriesEntry>>,
}

/// Statistics of one timestamp in a data-range response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesEntry {
    pub time: String,
    #[serde(rename = "mean_value")]
    pub mean: Option<f64>,
    #[serde(rename = "min_value")]
    pub min: Option<f64>,
    #[serde(rename = "max_value")]
    pub max: Option<f64>,
}

/// One grid cell of a map.
///
/// Serialized as the `[lat, lon, value]` triple the web client consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64, Option<f64>)", into = "(f64, f64, Option<f64>)")]
pub struct MapPoint {
    pub lon: f64,
    pub lat: f64,
    pub value: Option<f64>,
}

impl From<(f64, f64, Option<f64>)> for MapPoint {
    fn from((lat, lon, value): (f64, f64, Option<f64>)) -> Self {
        Self { lon, lat, value }
    }
}

impl From<MapPoint> for (f64, f64, Option<f64>) {
    fn from(p: MapPoint) -> Self {
        (p.lat, p.lon, p.value)
    }
}

/// Body of a successful map or data-range request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub start_date: String,
    pub end_date: String,
    pub map_data: BTreeMap<Product, Vec<MapPoint>>,
    pub products: BTreeMap<Product, AggregateStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_point_wire_format() {
        let p = MapPoint {
            lon: -75.0,
            lat: 40.0,
            value: None,
        };
        assert_eq!(serde_json::to_string(&p).unwrap(), "[40.0,-75.0,null]");
        let back: MapPoint = serde_json::from_str("[40.0,-75.0,1.5]").unwrap();
        assert_eq!(back.lat, 40.0);
        assert_eq!(back.lon, -75.0);
        assert_eq!(back.value, Some(1.5));
    }

    #[test]
    fn test_stats_field_names() {
        let stats = AggregateStats {
            mean: None,
            min: Some(1.0),
            max: Some(2.0),
            data_points: 3,
            units: crate::UNITS.to_string(),
            time_series: None,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["mean_value"].is_null());
        assert_eq!(json["min_value"], 1.0);
        assert_eq!(json["data_points"], 3);
        assert!(json.get("time_series").is_none());
    }

    #[test]
    fn test_products_keyed_by_name() {
        let mut products = BTreeMap::new();
        products.insert(
            Product::Hcho,
            AggregateStats {
                mean: Some(1.0),
                min: Some(1.0),
                max: Some(1.0),
                data_points: 1,
                units: crate::UNITS.to_string(),
                time_series: None,
            },
        );
        let response = TempoResponse {
            latitude: 40.0,
            longitude: -75.0,
            radius_km: 10.0,
            start_date: "2024-01-01".into(),
            end_date: "2024-01-02".into(),
            map_data: BTreeMap::new(),
            products,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["products"]["HCHO"]["mean_value"], 1.0);
    }
}
