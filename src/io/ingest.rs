//! CSV / text ingest.
//!
//! This module is responsible for turning instrument exports into the value
//! types the pipeline consumes:
//!
//! - raw sensor CSV (`Time (s)`, `Value`) -> [`RawSample`]
//! - `cp.txt` -> contact point (single number)
//! - previously written `*_hertz_results.txt` -> modulus / R² (collect mode)
//!
//! Design goals:
//! - **Strict schema** for required columns (`MissingColumn`)
//! - **Row-level validation** (skip bad rows, but count them)
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use log::warn;

use crate::domain::{RawPoint, RawSample};
use crate::error::ProcessError;

pub const TIME_COLUMN: &str = "Time (s)";
pub const VALUE_COLUMN: &str = "Value";

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the sample plus row accounting.
#[derive(Debug, Clone)]
pub struct RawIngest {
    pub sample: RawSample,
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
}

/// Read a raw sensor CSV from disk.
pub fn read_raw_csv(path: &Path) -> Result<RawIngest, ProcessError> {
    let file = File::open(path).map_err(|e| ProcessError::io(path, e))?;
    let ingest = parse_raw_csv(file)?;
    if !ingest.row_errors.is_empty() {
        warn!(
            "{}: skipped {} of {} row(s)",
            path.display(),
            ingest.row_errors.len(),
            ingest.rows_read
        );
    }
    Ok(ingest)
}

/// Parse raw sensor CSV from any reader.
pub fn parse_raw_csv<R: Read>(reader: R) -> Result<RawIngest, ProcessError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);

    let time_idx = column_index(&header_map, TIME_COLUMN)?;
    let value_idx = column_index(&header_map, VALUE_COLUMN)?;

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header line plus 1-based numbering.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match (parse_f64(&record, time_idx), parse_f64(&record, value_idx)) {
            (Ok(time_s), Ok(value)) => points.push(RawPoint { time_s, value }),
            (Err(e), _) | (_, Err(e)) => row_errors.push(RowError { line, message: e }),
        }
    }

    if points.is_empty() {
        return Err(ProcessError::EmptyData(format!(
            "no valid rows ({rows_read} read, {} rejected)",
            row_errors.len()
        )));
    }

    Ok(RawIngest {
        sample: RawSample::new(points),
        rows_read,
        row_errors,
    })
}

/// Read the contact point (first number in the file).
pub fn read_contact_point(path: &Path) -> Result<f64, ProcessError> {
    let text = std::fs::read_to_string(path).map_err(|e| ProcessError::io(path, e))?;
    parse_contact_point(&text)
}

pub fn parse_contact_point(text: &str) -> Result<f64, ProcessError> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| ProcessError::EmptyData("contact point file is empty".to_string()))?;
    let value: f64 = token.parse().map_err(|e| ProcessError::Parse {
        what: "contact point".to_string(),
        message: format!("'{token}': {e}"),
    })?;
    if !value.is_finite() {
        return Err(ProcessError::Parse {
            what: "contact point".to_string(),
            message: format!("'{token}' is not finite"),
        });
    }
    Ok(value)
}

/// Modulus and R² read back from a fit report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredFit {
    pub effective_modulus: f64,
    pub r_squared: f64,
    /// Tip radius in meters, when the report carries it.
    pub tip_radius: Option<f64>,
}

/// Read a `*_hertz_results.txt` report.
pub fn read_hertz_report(path: &Path) -> Result<StoredFit, ProcessError> {
    let text = std::fs::read_to_string(path).map_err(|e| ProcessError::io(path, e))?;
    parse_hertz_report(&text)
}

/// Parse the `E_eff = … Pa` / `R² = …` / `R = … μm` report lines.
pub fn parse_hertz_report(text: &str) -> Result<StoredFit, ProcessError> {
    let mut modulus = None;
    let mut r2 = None;
    let mut radius_um = None;

    for line in text.lines() {
        let Some((key, rest)) = line.split_once('=') else {
            continue;
        };
        let number = rest.split_whitespace().next().unwrap_or("");
        let parsed = number.parse::<f64>().ok();
        match key.trim() {
            "E_eff" => modulus = parsed,
            "R²" | "R2" | "R^2" => r2 = parsed,
            "R" => radius_um = parsed,
            _ => {}
        }
    }

    let effective_modulus = modulus.ok_or_else(|| ProcessError::Parse {
        what: "hertz report".to_string(),
        message: "missing `E_eff = <value>` line".to_string(),
    })?;
    let r_squared = r2.ok_or_else(|| ProcessError::Parse {
        what: "hertz report".to_string(),
        message: "missing `R² = <value>` line".to_string(),
    })?;

    Ok(StoredFit {
        effective_modulus,
        r_squared,
        tip_radius: radius_um.map(|um| um * 1e-6),
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header; without stripping it the time column looks missing.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn column_index(header_map: &HashMap<String, usize>, column: &str) -> Result<usize, ProcessError> {
    header_map
        .get(&normalize_header_name(column))
        .copied()
        .ok_or_else(|| ProcessError::MissingColumn {
            column: column.to_string(),
        })
}

fn parse_f64(record: &StringRecord, idx: usize) -> Result<f64, String> {
    let raw = record.get(idx).unwrap_or("").trim();
    if raw.is_empty() {
        return Err(format!("empty value in column {idx}"));
    }
    let v: f64 = raw
        .parse()
        .map_err(|e| format!("invalid number '{raw}' in column {idx}: {e}"))?;
    if !v.is_finite() {
        return Err(format!("non-finite value '{raw}' in column {idx}"));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_required_columns_in_any_order() {
        let csv = "Value,Extra,Time (s)\n1.5,x,0.0\n2.5,y,0.1\n";
        let ingest = parse_raw_csv(csv.as_bytes()).unwrap();
        assert_eq!(ingest.rows_read, 2);
        assert_eq!(
            ingest.sample.points,
            vec![
                RawPoint { time_s: 0.0, value: 1.5 },
                RawPoint { time_s: 0.1, value: 2.5 },
            ]
        );
    }

    #[test]
    fn tolerates_bom_and_case() {
        let csv = "\u{feff}time (s),VALUE\n0,1\n";
        let ingest = parse_raw_csv(csv.as_bytes()).unwrap();
        assert_eq!(ingest.sample.len(), 1);
    }

    #[test]
    fn missing_value_column_is_reported() {
        let csv = "Time (s),Reading\n0,1\n";
        let err = parse_raw_csv(csv.as_bytes()).unwrap_err();
        match err {
            ProcessError::MissingColumn { column } => assert_eq!(column, VALUE_COLUMN),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bad_rows_are_skipped_and_counted() {
        let csv = "Time (s),Value\n0,1\nabc,2\n0.2,\n0.3,4\n";
        let ingest = parse_raw_csv(csv.as_bytes()).unwrap();
        assert_eq!(ingest.rows_read, 4);
        assert_eq!(ingest.sample.len(), 2);
        assert_eq!(ingest.row_errors.len(), 2);
        assert_eq!(ingest.row_errors[0].line, 3);
    }

    #[test]
    fn header_only_file_is_empty_data() {
        let err = parse_raw_csv("Time (s),Value\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ProcessError::EmptyData(_)));
    }

    #[test]
    fn contact_point_parsing() {
        assert_eq!(parse_contact_point("  1234.5\n").unwrap(), 1234.5);
        assert!(matches!(parse_contact_point(""), Err(ProcessError::EmptyData(_))));
        assert!(matches!(parse_contact_point("nope"), Err(ProcessError::Parse { .. })));
    }

    #[test]
    fn hertz_report_round_trips_written_format() {
        let text = "E_eff = 1.2345e5 Pa\nR² = 0.9312\nR = 10.00 μm";
        let fit = parse_hertz_report(text).unwrap();
        assert_eq!(fit.effective_modulus, 1.2345e5);
        assert_eq!(fit.r_squared, 0.9312);
        assert!((fit.tip_radius.unwrap() - 10e-6).abs() < 1e-18);
    }

    #[test]
    fn hertz_report_without_r_squared_is_rejected() {
        let err = parse_hertz_report("E_eff = 1e5 Pa\n").unwrap_err();
        assert!(matches!(err, ProcessError::Parse { .. }));
    }
}
