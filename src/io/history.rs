//! Loading historical warm-up samples and zone trend logs from CSV.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;

use crate::optimal_start::{HistoricalSample, TrendPoint};

/// Timestamp layouts accepted in trend logs.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Failure to read a warm-up history or trend file.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("cannot read history: {0}")]
    Csv(#[from] csv::Error),
    #[error("trend row {row}: unrecognised timestamp \"{value}\"")]
    Timestamp { row: usize, value: String },
}

/// Reads samples with columns `zone_temp,outdoor_temp,warmup_minutes`.
///
/// Values are not range-checked here; degenerate rows are reported by the
/// estimator instead.
///
/// # Errors
///
/// Returns `HistoryError::Csv` if the file cannot be opened or a row does
/// not parse as three numbers.
pub fn load_history(path: &Path) -> Result<Vec<HistoricalSample>, HistoryError> {
    let rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    collect(rdr)
}

/// Same as [`load_history`] for any reader.
pub fn read_history(reader: impl Read) -> Result<Vec<HistoricalSample>, HistoryError> {
    let rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    collect(rdr)
}

fn collect<R: Read>(mut rdr: csv::Reader<R>) -> Result<Vec<HistoricalSample>, HistoryError> {
    let mut samples = Vec::new();
    for row in rdr.deserialize() {
        samples.push(row?);
    }
    Ok(samples)
}

#[derive(Debug, Deserialize)]
struct TrendRow {
    timestamp: String,
    #[serde(alias = "SpaceTemp")]
    space_temp: f64,
    #[serde(alias = "OaTemp", alias = "oa_temp")]
    outdoor_temp: f64,
}

/// Reads a zone trend log with columns `timestamp,space_temp,outdoor_temp`
/// (`SpaceTemp` and `OaTemp` are accepted as column names too).
///
/// # Errors
///
/// Returns `HistoryError::Csv` for unreadable files or rows, and
/// `HistoryError::Timestamp` for a timestamp in none of the accepted layouts.
pub fn load_trend(path: &Path) -> Result<Vec<TrendPoint>, HistoryError> {
    let rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
    collect_trend(rdr)
}

/// Same as [`load_trend`] for any reader.
pub fn read_trend(reader: impl Read) -> Result<Vec<TrendPoint>, HistoryError> {
    let rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    collect_trend(rdr)
}

fn collect_trend<R: Read>(mut rdr: csv::Reader<R>) -> Result<Vec<TrendPoint>, HistoryError> {
    let mut points = Vec::new();
    for (row, record) in rdr.deserialize::<TrendRow>().enumerate() {
        let record = record?;
        let Some(timestamp) = parse_timestamp(&record.timestamp) else {
            return Err(HistoryError::Timestamp {
                row,
                value: record.timestamp,
            });
        };
        points.push(TrendPoint {
            timestamp,
            space_temp: record.space_temp,
            outdoor_temp: record.outdoor_temp,
        });
    }
    Ok(points)
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// A representative week of morning warm-ups at a 70 °F occupied setpoint.
pub fn sample_week() -> Vec<HistoricalSample> {
    [
        (50.0, 10.0, 120.0),
        (48.0, 12.0, 115.0),
        (52.0, 8.0, 125.0),
        (50.0, 11.0, 118.0),
        (51.0, 9.0, 122.0),
        (49.0, 13.0, 110.0),
        (47.0, 14.0, 108.0),
    ]
    .into_iter()
    .map(|(z, o, m)| HistoricalSample::new(z, o, m))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_rows() {
        let data = "zone_temp,outdoor_temp,warmup_minutes\n48, 12, 120\n50,10,118.5\n";
        let samples = read_history(data.as_bytes()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], HistoricalSample::new(48.0, 12.0, 120.0));
        assert_eq!(samples[1].warmup_minutes, 118.5);
    }

    #[test]
    fn bad_number_is_an_error() {
        let data = "zone_temp,outdoor_temp,warmup_minutes\n48,cold,120\n";
        assert!(read_history(data.as_bytes()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_history(Path::new("/nonexistent/history.csv")).is_err());
    }

    #[test]
    fn reads_trend_in_either_column_style() {
        let data = "timestamp,space_temp,outdoor_temp\n2024-01-09 04:00:00,60.5,18\n2024-01-09T04:05:00,61,18\n";
        let points = read_trend(data.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].space_temp, 60.5);
        assert_eq!(points[1].timestamp.format("%H:%M").to_string(), "04:05");

        let data = "timestamp,SpaceTemp,OaTemp\n2024-01-09 04:00,60,18\n";
        let points = read_trend(data.as_bytes()).unwrap();
        assert_eq!(points[0].outdoor_temp, 18.0);
    }

    #[test]
    fn bad_trend_timestamp_is_an_error() {
        let data = "timestamp,space_temp,outdoor_temp\n09/01/2024,60,18\n";
        assert!(matches!(
            read_trend(data.as_bytes()),
            Err(HistoryError::Timestamp { row: 0, .. })
        ));
    }

    #[test]
    fn sample_week_has_seven_days() {
        assert_eq!(sample_week().len(), 7);
    }
}
