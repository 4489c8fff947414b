use crate::stats::record::{DetectionLogRecord, LogColumns};
use crate::stats::StatsError;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

/// Parsed detection log: the raw table for display plus typed records.
#[derive(Debug, Clone, Default)]
pub struct DetectionLog {
    pub source: Option<PathBuf>,
    pub headers: Vec<String>,
    pub cells: Vec<Vec<String>>,
    pub columns: LogColumns,
    pub records: Vec<DetectionLogRecord>,
}

impl DetectionLog {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reads the detection log CSV at `path`.
///
/// A missing file, a file without any header and any other read or parse
/// failure map to distinct `StatsError` variants.
pub fn load_detection_log(path: &Path) -> Result<DetectionLog, StatsError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(StatsError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(StatsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(StatsError::Empty(path.to_path_buf()));
    }

    let mut log = parse_detection_log(bytes.as_slice())?;
    log.source = Some(path.to_path_buf());
    log::info!(
        "loaded {} detection log rows from {}",
        log.len(),
        path.display()
    );
    Ok(log)
}

/// Parses CSV text with a header row. Short rows are padded with empty
/// cells on lookup; rows longer than the header are rejected.
pub fn parse_detection_log<R: Read>(reader: R) -> Result<DetectionLog, StatsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let columns = LogColumns::from_headers(headers.iter().map(String::as_str));

    let mut cells = Vec::new();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.len() > headers.len() {
            return Err(StatsError::TooManyFields {
                line: row.position().map(|pos| pos.line()).unwrap_or_default(),
                expected: headers.len(),
                found: row.len(),
            });
        }
        let row: Vec<String> = row.iter().map(str::to_string).collect();
        records.push(columns.parse_row(&row));
        cells.push(row);
    }

    Ok(DetectionLog {
        source: None,
        headers,
        cells,
        columns,
        records,
    })
}
