//! Time parsing helpers.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parse an ISO 8601 date or datetime.
///
/// Accepts RFC 3339 timestamps, naive datetimes (`T` or space separated,
/// optional fractional seconds, assumed UTC) and plain dates (midnight UTC).
pub fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H",
        "%Y-%m-%d %H",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Decode a CF-style time units attribute such as
/// `"seconds since 1980-01-06T00:00:00Z"` into a step and an epoch.
pub fn parse_cf_time_units(units: &str) -> Option<(Duration, DateTime<Utc>)> {
    let (unit, epoch) = units.split_once(" since ")?;
    let step = match unit.trim().to_ascii_lowercase().as_str() {
        "seconds" | "second" | "secs" | "s" => Duration::seconds(1),
        "minutes" | "minute" | "mins" => Duration::minutes(1),
        "hours" | "hour" | "h" => Duration::hours(1),
        "days" | "day" | "d" => Duration::days(1),
        _ => return None,
    };
    let epoch = epoch.trim().trim_end_matches(" UTC");
    Some((step, parse_iso8601(epoch)?))
}

/// Convert a CF time offset to an absolute instant.
pub fn cf_offset_to_datetime(value: f64, step: Duration, epoch: DateTime<Utc>) -> DateTime<Utc> {
    let step_ms = step.num_milliseconds() as f64;
    epoch + Duration::milliseconds((value * step_ms).round() as i64)
}

/// The GPS epoch used by TEMPO time coordinates.
pub fn gps_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1980, 1, 6, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_only() {
        let dt = parse_iso8601("2024-01-15").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_datetime() {
        let dt = parse_iso8601("2024-01-15T12:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap());
        let dt = parse_iso8601("2024-01-15 12:30").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_iso8601("2024-01-15T12:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_iso8601("not-a-date").is_none());
        assert!(parse_iso8601("2024-13-01").is_none());
        assert!(parse_iso8601("").is_none());
    }

    #[test]
    fn test_cf_units() {
        let (step, epoch) = parse_cf_time_units("seconds since 1980-01-06T00:00:00Z").unwrap();
        assert_eq!(step, Duration::seconds(1));
        assert_eq!(epoch, gps_epoch());

        let t = cf_offset_to_datetime(86_400.0, step, epoch);
        assert_eq!(t, Utc.with_ymd_and_hms(1980, 1, 7, 0, 0, 0).unwrap());

        assert!(parse_cf_time_units("fortnights since 1980-01-06").is_none());
        assert!(parse_cf_time_units("seconds").is_none());
    }
}
