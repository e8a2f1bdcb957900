//! Point-and-radius to bounding-box conversion.

use tempo_common::BoundingBox;

/// Kilometres per degree of latitude (and of longitude at the equator).
pub const KM_PER_DEGREE: f64 = 111.0;

/// Largest longitude half-width; a box this wide covers every longitude.
pub const MAX_LON_OFFSET: f64 = 180.0;

/// Axis-aligned box of `radius_km` around `(lat, lon)`.
///
/// The longitude half-width grows with `1 / cos(lat)`. Once it reaches
/// [`MAX_LON_OFFSET`] the box covers every longitude, `[-180, 180]`, so it
/// stays finite at and near the poles.
pub fn bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_offset = radius_km / KM_PER_DEGREE;

    let cos_lat = lat.to_radians().cos().abs();
    if cos_lat * MAX_LON_OFFSET * KM_PER_DEGREE <= radius_km {
        return BoundingBox::new(
            lat - lat_offset,
            lat + lat_offset,
            -MAX_LON_OFFSET,
            MAX_LON_OFFSET,
        );
    }

    let lon_offset = radius_km / (KM_PER_DEGREE * cos_lat);
    BoundingBox::new(
        lat - lat_offset,
        lat + lat_offset,
        lon - lon_offset,
        lon + lon_offset,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_scenario() {
        let bbox = bounding_box(40.0, -75.0, 10.0);
        assert_close(bbox.lat_min, 39.9099);
        assert_close(bbox.lat_max, 40.0901);
        assert_close(bbox.lon_min, -75.1176);
        assert_close(bbox.lon_max, -74.8824);
    }

    #[test]
    fn test_box_is_centered() {
        for &(lat, lon, radius) in &[(0.0, 0.0, 50.0), (-33.9, 151.2, 10.0), (60.0, -150.0, 25.0)] {
            let bbox = bounding_box(lat, lon, radius);
            let (c_lat, c_lon) = bbox.center();
            assert_close(c_lat, lat);
            assert_close(c_lon, lon);
            assert_close(bbox.lat_span(), 2.0 * radius / KM_PER_DEGREE);
        }
    }

    #[test]
    fn test_equator_is_square_in_degrees() {
        let bbox = bounding_box(0.0, 10.0, 111.0);
        assert_close(bbox.lat_span(), 2.0);
        assert_close(bbox.lon_span(), 2.0);
    }

    #[test]
    fn test_longitude_widens_with_latitude() {
        let low = bounding_box(10.0, 0.0, 50.0);
        let high = bounding_box(70.0, 0.0, 50.0);
        assert!(high.lon_span() > low.lon_span());
    }

    #[test]
    fn test_near_pole_is_finite() {
        for lat in [89.9, 89.9999, -89.9999] {
            let bbox = bounding_box(lat, 0.0, 50.0);
            assert!(bbox.is_finite(), "box at {lat} should be finite");
            assert!(bbox.lon_span() <= 2.0 * MAX_LON_OFFSET);
        }
    }

    #[test]
    fn test_pole_spans_all_longitudes() {
        let bbox = bounding_box(90.0, 20.0, 10.0);
        assert!(bbox.is_finite());
        assert_close(bbox.lon_min, -MAX_LON_OFFSET);
        assert_close(bbox.lon_max, MAX_LON_OFFSET);
    }

    #[test]
    fn test_clamped_box_is_not_shifted_by_center() {
        for lon in [-120.0, 20.0, 179.0] {
            let bbox = bounding_box(89.95, lon, 50.0);
            assert_close(bbox.lon_min, -MAX_LON_OFFSET);
            assert_close(bbox.lon_max, MAX_LON_OFFSET);
        }
    }
}
