use crate::math::stats::StatsHelper;
use crate::stats::loader::DetectionLog;
use crate::stats::record::{DetectionLogRecord, LATITUDE, LONGITUDE, SEVERITY};
use serde::Serialize;
use std::fmt;

/// Count that distinguishes "column absent" from "no matching rows".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DefectCount {
    NotAvailable,
    Count(usize),
}

impl fmt::Display for DefectCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefectCount::NotAvailable => f.write_str("N/A"),
            DefectCount::Count(n) => write!(f, "{n}"),
        }
    }
}

/// Describe-style statistics for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub column: &'static str,
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl NumericSummary {
    pub fn from_values(column: &'static str, mut values: Vec<f64>) -> Option<Self> {
        values.sort_by(f64::total_cmp);
        let mean = StatsHelper::mean(&values)?;
        Some(Self {
            column,
            count: values.len(),
            mean,
            std: StatsHelper::std_dev(&values),
            min: values[0],
            q25: StatsHelper::quantile(&values, 0.25)?,
            median: StatsHelper::quantile(&values, 0.5)?,
            q75: StatsHelper::quantile(&values, 0.75)?,
            max: values[values.len() - 1],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// What the locations section shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum MapView {
    /// Coordinate columns absent, or every coordinate cell missing.
    MissingCoordinates,
    /// Coordinates exist but no row has both of them.
    NoValidCoordinates,
    Points(Vec<GeoPoint>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub total_rows: usize,
    pub potholes: DefectCount,
    pub cracks: DefectCount,
    pub numeric: Vec<NumericSummary>,
    pub map: MapView,
}

impl StatisticsSummary {
    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }
}

fn count_matching(log: &DetectionLog, needle: &str) -> DefectCount {
    if log.columns.defect_type.is_none() {
        return DefectCount::NotAvailable;
    }
    let matches = log
        .records
        .iter()
        .filter_map(|record| record.defect_type.as_deref())
        .filter(|defect| defect.to_lowercase().contains(needle))
        .count();
    DefectCount::Count(matches)
}

fn numeric_column(
    log: &DetectionLog,
    column: &'static str,
    present: bool,
    pick: fn(&DetectionLogRecord) -> Option<f64>,
) -> Option<NumericSummary> {
    if !present {
        return None;
    }
    let values: Vec<f64> = log.records.iter().filter_map(pick).collect();
    NumericSummary::from_values(column, values)
}

fn map_view(log: &DetectionLog) -> MapView {
    if !log.columns.has_coordinates() {
        return MapView::MissingCoordinates;
    }
    let any_coordinate = log
        .records
        .iter()
        .any(|r| r.latitude.is_some() || r.longitude.is_some());
    if !any_coordinate {
        return MapView::MissingCoordinates;
    }
    let points: Vec<GeoPoint> = log
        .records
        .iter()
        .filter_map(|r| match (r.latitude, r.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        })
        .collect();
    if points.is_empty() {
        MapView::NoValidCoordinates
    } else {
        MapView::Points(points)
    }
}

/// Aggregates the log the way the statistics page presents it.
pub fn summarize(log: &DetectionLog) -> StatisticsSummary {
    let columns = log.columns;
    let numeric = [
        numeric_column(log, LATITUDE, columns.latitude.is_some(), |r| r.latitude),
        numeric_column(log, LONGITUDE, columns.longitude.is_some(), |r| r.longitude),
        numeric_column(log, SEVERITY, columns.severity.is_some(), |r| r.severity),
    ]
    .into_iter()
    .flatten()
    .collect();

    StatisticsSummary {
        total_rows: log.len(),
        potholes: count_matching(log, "pothole"),
        cracks: count_matching(log, "crack"),
        numeric,
        map: map_view(log),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::loader::parse_detection_log;

    fn log(csv: &str) -> DetectionLog {
        parse_detection_log(csv.as_bytes()).unwrap()
    }

    #[test]
    fn missing_defect_column_reads_not_available() {
        let summary = summarize(&log("Latitude,Longitude\n18.5,73.8\n"));
        assert_eq!(summary.potholes, DefectCount::NotAvailable);
        assert_eq!(summary.cracks.to_string(), "N/A");
        assert_eq!(summary.total_rows, 1);
    }

    #[test]
    fn zero_matches_read_zero_not_na() {
        let summary = summarize(&log("Defect_Type\nrutting\nbleeding\n"));
        assert_eq!(summary.potholes, DefectCount::Count(0));
        assert_eq!(summary.cracks.to_string(), "0");
        assert_ne!(summary.potholes, DefectCount::NotAvailable);
    }

    #[test]
    fn defect_matching_is_case_insensitive_substring() {
        let summary = summarize(&log(
            "Defect_Type\nPOTHOLE\nLongitudinal_Crack\ncrack\n\nalligator cracking\n",
        ));
        assert_eq!(summary.potholes, DefectCount::Count(1));
        assert_eq!(summary.cracks, DefectCount::Count(3));
    }

    #[test]
    fn map_is_replaced_when_coordinates_missing_or_null() {
        let no_columns = summarize(&log("Severity\n2\n"));
        assert_eq!(no_columns.map, MapView::MissingCoordinates);

        let all_null = summarize(&log("Latitude,Longitude\n,\nx,y\n"));
        assert_eq!(all_null.map, MapView::MissingCoordinates);

        let unpaired = summarize(&log("Latitude,Longitude\n18.5,\n,73.8\n"));
        assert_eq!(unpaired.map, MapView::NoValidCoordinates);
    }

    #[test]
    fn map_plots_only_complete_coordinate_pairs() {
        let summary = summarize(&log("Latitude,Longitude\n18.5,73.8\n18.6,\n18.7,73.9\n"));
        match summary.map {
            MapView::Points(points) => {
                assert_eq!(points.len(), 2);
                assert_eq!(points[1].latitude, 18.7);
            }
            other => panic!("expected points, got {other:?}"),
        }
    }

    #[test]
    fn numeric_summary_covers_present_columns_only() {
        let summary = summarize(&log("Severity,Defect_Type\n1,crack\n2,crack\n3,pothole\nbad,crack\n"));
        assert_eq!(summary.numeric.len(), 1);
        let severity = &summary.numeric[0];
        assert_eq!(severity.column, SEVERITY);
        assert_eq!(severity.count, 3);
        assert_eq!(severity.mean, 2.0);
        assert_eq!(severity.median, 2.0);
        assert_eq!(severity.std, Some(1.0));
        assert_eq!((severity.min, severity.max), (1.0, 3.0));
    }

    #[test]
    fn header_only_log_is_empty() {
        let summary = summarize(&log("Timestamp,Defect_Type\n"));
        assert!(summary.is_empty());
        assert_eq!(summary.potholes, DefectCount::Count(0));
        assert!(summary.numeric.is_empty());
    }
}
