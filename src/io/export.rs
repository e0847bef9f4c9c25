//! Persist per-sample tables, fit reports and batch summaries.
//!
//! File formats are the ones the lab's downstream scripts already read:
//! two-column CSV tables, a three-line `*_hertz_results.txt` and plain-text
//! batch reports. The JSON summary is meant for everything else.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::aggregate::Aggregation;
use crate::domain::{ForceDistanceCurve, HertzFitResult, RawSample, RejectedFit, RetractSegment};
use crate::error::ProcessError;
use crate::io::ingest::{TIME_COLUMN, VALUE_COLUMN};

pub const FZ_DISTANCE_COLUMN: &str = "Line0004Point0000Ind_Ext";
pub const FZ_FORCE_COLUMN: &str = "Line0004Point0000Force";

pub const LOW_QUALITY_FILE: &str = "low_quality_results.txt";
pub const GROUP_MEANS_FILE: &str = "average_E_eff_results_filtered.txt";
pub const SUMMARY_FILE: &str = "afm_summary.json";

pub fn fz_file_name(prefix: &str) -> String {
    format!("{prefix}_fz_data.csv")
}

pub fn retract_file_name(prefix: &str) -> String {
    format!("{prefix}_retract_data.csv")
}

pub fn report_file_name(prefix: &str) -> String {
    format!("{prefix}_hertz_results.txt")
}

/// Write a raw recording in the instrument's `Time (s),Value` layout.
pub fn write_raw_csv(path: &Path, raw: &RawSample) -> Result<(), ProcessError> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record([TIME_COLUMN, VALUE_COLUMN])?;
    for p in &raw.points {
        w.write_record([p.time_s.to_string(), p.value.to_string()])?;
    }
    w.flush().map_err(|e| ProcessError::io(path, e))
}

/// Write the converted force–distance curve.
pub fn write_fz_csv(path: &Path, curve: &ForceDistanceCurve) -> Result<(), ProcessError> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record([FZ_DISTANCE_COLUMN, FZ_FORCE_COLUMN])?;
    for p in &curve.points {
        w.write_record([p.distance.to_string(), p.force.to_string()])?;
    }
    w.flush().map_err(|e| ProcessError::io(path, e))
}

/// Write the retract segment as `Indentation,Force`.
pub fn write_retract_csv(path: &Path, segment: &RetractSegment) -> Result<(), ProcessError> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["Indentation", "Force"])?;
    for p in &segment.points {
        w.write_record([p.indentation.to_string(), p.force.to_string()])?;
    }
    w.flush().map_err(|e| ProcessError::io(path, e))
}

/// Three-line fit report, readable by `io::ingest::parse_hertz_report`.
pub fn format_hertz_report(result: &HertzFitResult) -> String {
    format!(
        "E_eff = {:.4e} Pa\nR² = {:.4}\nR = {:.2} μm",
        result.effective_modulus,
        result.r_squared,
        result.tip_radius * 1e6
    )
}

pub fn write_hertz_report(path: &Path, result: &HertzFitResult) -> Result<(), ProcessError> {
    std::fs::write(path, format_hertz_report(result)).map_err(|e| ProcessError::io(path, e))
}

/// One `"<sample>: R² = 0.1234"` line per rejected fit.
pub fn write_low_quality(path: &Path, rejected: &[RejectedFit]) -> Result<(), ProcessError> {
    let mut out = create(path)?;
    for r in rejected {
        writeln!(out, "{}: R² = {:.4}", r.sample_id, r.r_squared)
            .map_err(|e| ProcessError::io(path, e))?;
    }
    out.flush().map_err(|e| ProcessError::io(path, e))
}

/// One `"<material>: <mean> Pa"` line per group; `undefined` when no fit passed.
pub fn write_group_means(path: &Path, aggregation: &Aggregation) -> Result<(), ProcessError> {
    let mut out = create(path)?;
    for (name, mean) in aggregation.group_means() {
        let line = match mean {
            Some(m) => format!("{name}: {m:.4e} Pa"),
            None => format!("{name}: undefined"),
        };
        writeln!(out, "{line}").map_err(|e| ProcessError::io(path, e))?;
    }
    out.flush().map_err(|e| ProcessError::io(path, e))
}

/// Pretty-printed JSON of any serializable summary.
pub fn write_summary_json<T: Serialize>(path: &Path, summary: &T) -> Result<(), ProcessError> {
    let out = create(path)?;
    serde_json::to_writer_pretty(out, summary)
        .map_err(|e| ProcessError::io(path, std::io::Error::other(e)))
}

fn create(path: &Path) -> Result<BufWriter<File>, ProcessError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| ProcessError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_with_groups;
    use crate::domain::{CurveUnits, ForcePoint, IndentationPoint};
    use crate::io::ingest::parse_hertz_report;
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("afm-export-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fit_result(id: &str, e: f64, r2: f64) -> HertzFitResult {
        HertzFitResult {
            sample_id: id.to_string(),
            effective_modulus: e,
            r_squared: r2,
            tip_radius: 10e-6,
            n_points: 4,
        }
    }

    #[test]
    fn report_text_matches_lab_format() {
        let text = format_hertz_report(&fit_result("s", 123456.0, 0.93117));
        assert_eq!(text, "E_eff = 1.2346e5 Pa\nR² = 0.9312\nR = 10.00 μm");

        let parsed = parse_hertz_report(&text).unwrap();
        assert_eq!(parsed.effective_modulus, 1.2346e5);
        assert_eq!(parsed.r_squared, 0.9312);
    }

    #[test]
    fn tables_have_expected_headers() {
        let dir = scratch("tables");
        let curve = ForceDistanceCurve {
            points: vec![ForcePoint { distance: 0.0, force: 1.5 }],
            units: CurveUnits::DISPLAY,
            baseline: 0.0,
        };
        let fz = dir.join(fz_file_name("20240101_000000"));
        write_fz_csv(&fz, &curve).unwrap();
        let text = std::fs::read_to_string(&fz).unwrap();
        assert_eq!(text, "Line0004Point0000Ind_Ext,Line0004Point0000Force\n0,1.5\n");

        let segment = RetractSegment {
            points: vec![IndentationPoint { indentation: 2.0, force: 0.25 }],
            units: CurveUnits::DISPLAY,
            contact_point: 0.0,
            contact_index: 3,
            max_force_index: 0,
        };
        let retract = dir.join(retract_file_name("20240101_000000"));
        write_retract_csv(&retract, &segment).unwrap();
        let text = std::fs::read_to_string(&retract).unwrap();
        assert_eq!(text, "Indentation,Force\n2,0.25\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn raw_csv_reads_back() {
        let dir = scratch("raw");
        let path = dir.join("20240101_000000_data.csv");
        let raw = RawSample::from_pairs(&[(0.0, 1000.0), (0.25, 999.5)]);
        write_raw_csv(&path, &raw).unwrap();

        let ingest = crate::io::ingest::read_raw_csv(&path).unwrap();
        assert_eq!(ingest.sample, raw);
        assert!(ingest.row_errors.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn batch_reports_list_rejections_and_means() {
        let dir = scratch("batch");
        let results = vec![
            ("pink", fit_result("pink/1", 2.0e5, 0.95)),
            ("pink", fit_result("pink/2", 9.0e5, 0.40)),
        ];
        let agg = aggregate_with_groups(&["pink", "white"], &results, 0.85);

        let low = dir.join(LOW_QUALITY_FILE);
        write_low_quality(&low, &agg.rejected).unwrap();
        assert_eq!(std::fs::read_to_string(&low).unwrap(), "pink/2: R² = 0.4000\n");

        let means = dir.join(GROUP_MEANS_FILE);
        write_group_means(&means, &agg).unwrap();
        assert_eq!(
            std::fs::read_to_string(&means).unwrap(),
            "pink: 2.0000e5 Pa\nwhite: undefined\n"
        );

        let json = dir.join(SUMMARY_FILE);
        write_summary_json(&json, &agg).unwrap();
        let back: Aggregation =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(back.groups.len(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
