use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

pub const TIMESTAMP: &str = "Timestamp";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";
pub const SEVERITY: &str = "Severity";
pub const DEFECT_TYPE: &str = "Defect_Type";

/// One logged detection. Absent columns and unparseable cells are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionLogRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub severity: Option<f64>,
    pub defect_type: Option<String>,
}

/// Which of the known columns the CSV header carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogColumns {
    pub timestamp: Option<usize>,
    pub latitude: Option<usize>,
    pub longitude: Option<usize>,
    pub severity: Option<usize>,
    pub defect_type: Option<usize>,
}

impl LogColumns {
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut columns = LogColumns::default();
        for (index, header) in headers.into_iter().enumerate() {
            let slot = match header {
                TIMESTAMP => &mut columns.timestamp,
                LATITUDE => &mut columns.latitude,
                LONGITUDE => &mut columns.longitude,
                SEVERITY => &mut columns.severity,
                DEFECT_TYPE => &mut columns.defect_type,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(index);
            }
        }
        columns
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn parse_row(&self, cells: &[String]) -> DetectionLogRecord {
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| cells.get(i))
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };
        DetectionLogRecord {
            timestamp: cell(self.timestamp).and_then(parse_timestamp),
            latitude: cell(self.latitude).and_then(parse_number),
            longitude: cell(self.longitude).and_then(parse_number),
            severity: cell(self.severity).and_then(parse_number),
            defect_type: cell(self.defect_type).map(str::to_string),
        }
    }
}

/// Finite number or nothing; NaN-like markers count as missing.
pub fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

/// Parses the usual ISO-ish timestamp spellings; anything else is `None`.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn headers_are_matched_case_sensitively() {
        let columns = LogColumns::from_headers(["latitude", "Longitude", "Defect_Type"]);
        assert_eq!(columns.latitude, None);
        assert_eq!(columns.longitude, Some(1));
        assert_eq!(columns.defect_type, Some(2));
        assert!(!columns.has_coordinates());
    }

    #[test]
    fn bad_cells_become_missing_values() {
        let columns = LogColumns::from_headers([TIMESTAMP, LATITUDE, LONGITUDE, SEVERITY, DEFECT_TYPE]);
        let row: Vec<String> = ["yesterday", "18.52", "abc", "", "  "]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let record = columns.parse_row(&row);
        assert_eq!(record.timestamp, None);
        assert_eq!(record.latitude, Some(18.52));
        assert_eq!(record.longitude, None);
        assert_eq!(record.severity, None);
        assert_eq!(record.defect_type, None);
    }

    #[test]
    fn short_rows_do_not_panic() {
        let columns = LogColumns::from_headers([TIMESTAMP, LATITUDE, LONGITUDE]);
        let record = columns.parse_row(&["2024-03-01".to_string()]);
        assert!(record.timestamp.is_some());
        assert_eq!(record.latitude, None);
    }

    #[test]
    fn timestamps_accept_common_iso_forms() {
        let parsed = parse_timestamp("2025-01-15 08:30:00").unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.hour()), (2025, 1, 8));
        assert!(parse_timestamp("2025-01-15T08:30:00.250").is_some());
        assert!(parse_timestamp("2025-01-15T08:30:00+05:30").is_some());
        assert!(parse_timestamp("2025-01-15").is_some());
        assert!(parse_timestamp("15th of Jan").is_none());
    }

    #[test]
    fn non_finite_numbers_are_missing() {
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("-3.5"), Some(-3.5));
    }
}
