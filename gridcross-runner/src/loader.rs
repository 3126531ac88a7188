//! CSV bar loading.
//!
//! Exchange exports disagree on header names and timestamp formats, so the
//! loader accepts the common aliases and formats, skips (and counts)
//! unparseable rows, and guarantees the sorted/deduplicated ordering the
//! core engine assumes.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use gridcross_core::Bar;
use thiserror::Error;

const TIMESTAMP_HEADERS: &[&str] = &["timestamp", "open time", "date"];
const CLOSE_HEADERS: &[&str] = &["close", "close_price"];

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no recognizable timestamp/close columns")]
    MissingColumns { path: PathBuf },

    #[error("{path} contains no parseable bars")]
    Empty { path: PathBuf },
}

/// One instrument's price history plus loading diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    /// Taken from the file stem, e.g. `BTCUSDT.csv` -> `BTCUSDT`.
    pub instrument: String,
    /// Sorted ascending by timestamp, duplicates removed.
    pub bars: Vec<Bar>,
    pub skipped_rows: usize,
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    // Epoch seconds or milliseconds.
    if let Ok(numeric) = raw.parse::<i64>() {
        let seconds = if numeric >= 1_000_000_000_000 {
            numeric / 1000
        } else {
            numeric
        };
        return chrono::DateTime::from_timestamp(seconds, 0).map(|dt| dt.naive_utc());
    }
    None
}

fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim();
        aliases.iter().any(|alias| h.eq_ignore_ascii_case(alias))
    })
}

/// Load one instrument's bars from a CSV file.
pub fn load_bars(path: &Path) -> Result<LoadedSeries, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let ts_col = find_column(&headers, TIMESTAMP_HEADERS);
    let close_col = find_column(&headers, CLOSE_HEADERS);
    let (ts_col, close_col) = match (ts_col, close_col) {
        (Some(t), Some(c)) => (t, c),
        _ => {
            return Err(LoadError::MissingColumns {
                path: path.to_path_buf(),
            })
        }
    };

    let mut bars = Vec::new();
    let mut skipped_rows = 0usize;
    for record in reader.records() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed = record
            .get(ts_col)
            .and_then(parse_timestamp)
            .zip(record.get(close_col).and_then(|c| c.trim().parse::<f64>().ok()));
        match parsed {
            Some((timestamp, close)) if close.is_finite() && close > 0.0 => {
                bars.push(Bar { timestamp, close });
            }
            _ => skipped_rows += 1,
        }
    }

    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);

    let instrument = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    Ok(LoadedSeries {
        instrument,
        bars,
        skipped_rows,
    })
}
