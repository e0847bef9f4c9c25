//! Batch directory layout.
//!
//! Experiments live under `<root>/<material>/...`. An experiment directory
//! holds one raw sensor export (`*data.csv`) and a `cp.txt` contact point.
//! Files this tool writes itself are never treated as raw input.
//!
//! Discovery is deterministic: directories and files are visited in sorted
//! order so batch output (and the JSON summary) is stable across runs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, warn};

use crate::error::ProcessError;

/// Maximum directory recursion below a material folder.
const DEFAULT_SEARCH_DEPTH: usize = 6;

pub const CONTACT_POINT_FILE: &str = "cp.txt";
pub const FALLBACK_PREFIX: &str = "processed";

const RAW_SUFFIX: &str = "data.csv";
const OUTPUT_SUFFIXES: [&str; 3] = ["_fz_data.csv", "_retract_data.csv", "processed_data.csv"];
const REPORT_SUFFIX: &str = "_hertz_results.txt";

/// One discovered experiment folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experiment {
    pub material: String,
    pub dir: PathBuf,
    pub raw_csv: PathBuf,
    pub contact_file: PathBuf,
    /// Output file prefix: the recording timestamp or `processed`.
    pub prefix: String,
    /// Stable identifier: the raw file path relative to the batch root.
    pub sample_id: String,
}

/// A previously written fit report found by [`discover_reports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub material: String,
    pub path: PathBuf,
}

/// Find every experiment under `root/<material>` for each material.
///
/// Missing material folders are skipped (and logged), not an error; a
/// missing root is.
pub fn discover_experiments<S: AsRef<str>>(
    root: &Path,
    materials: &[S],
) -> Result<Vec<Experiment>, ProcessError> {
    ensure_dir(root)?;

    let mut out = Vec::new();
    for material in materials {
        let material = material.as_ref();
        let base = root.join(material);
        if !base.is_dir() {
            debug!("no folder for material '{material}' under {}", root.display());
            continue;
        }
        let mut dirs = Vec::new();
        collect_dirs(&base, 0, DEFAULT_SEARCH_DEPTH, &mut dirs);
        for dir in dirs {
            if let Some(exp) = experiment_in(root, material, &dir) {
                out.push(exp);
            }
        }
    }
    Ok(out)
}

/// Describe a single experiment folder (the `sample` subcommand).
pub fn experiment_at(dir: &Path) -> Result<Experiment, ProcessError> {
    ensure_dir(dir)?;
    let parent = dir.parent().unwrap_or(dir);
    let material = parent
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();
    experiment_in(parent, &material, dir).ok_or_else(|| {
        ProcessError::EmptyData(format!(
            "{} has no raw '*{RAW_SUFFIX}' file with a {CONTACT_POINT_FILE}",
            dir.display()
        ))
    })
}

/// Find `*_hertz_results.txt` reports under `root/<material>` (collect mode).
pub fn discover_reports<S: AsRef<str>>(
    root: &Path,
    materials: &[S],
) -> Result<Vec<ReportFile>, ProcessError> {
    ensure_dir(root)?;

    let mut out = Vec::new();
    for material in materials {
        let material = material.as_ref();
        let base = root.join(material);
        if !base.is_dir() {
            continue;
        }
        let mut dirs = Vec::new();
        collect_dirs(&base, 0, DEFAULT_SEARCH_DEPTH, &mut dirs);
        for dir in dirs {
            for path in sorted_files(&dir) {
                if file_name(&path).ends_with(REPORT_SUFFIX) {
                    out.push(ReportFile {
                        material: material.to_string(),
                        path,
                    });
                }
            }
        }
    }
    Ok(out)
}

/// First `YYYYMMDD_HHMMSS` token in `name` that is a real date-time.
pub fn extract_timestamp(name: &str) -> Option<String> {
    const LEN: usize = 15;
    let bytes = name.as_bytes();
    if bytes.len() < LEN {
        return None;
    }
    (0..=bytes.len() - LEN).find_map(|start| {
        let window = &bytes[start..start + LEN];
        let shaped = window.iter().enumerate().all(|(i, b)| {
            if i == 8 { *b == b'_' } else { b.is_ascii_digit() }
        });
        if !shaped {
            return None;
        }
        let token = std::str::from_utf8(window).ok()?;
        NaiveDateTime::parse_from_str(token, "%Y%m%d_%H%M%S")
            .ok()
            .map(|_| token.to_string())
    })
}

/// Output prefix for a raw file name.
pub fn output_prefix(name: &str) -> String {
    extract_timestamp(name).unwrap_or_else(|| FALLBACK_PREFIX.to_string())
}

/// Whether `name` looks like a raw sensor export rather than our own output.
pub fn is_raw_data_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(RAW_SUFFIX) && !OUTPUT_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

fn experiment_in(root: &Path, material: &str, dir: &Path) -> Option<Experiment> {
    let files = sorted_files(dir);
    let contact_file = files
        .iter()
        .find(|p| file_name(p).eq_ignore_ascii_case(CONTACT_POINT_FILE))?
        .clone();
    let raw_csv = files.iter().find(|p| is_raw_data_file(file_name(p)))?.clone();

    let prefix = output_prefix(file_name(&raw_csv));
    let sample_id = raw_csv
        .strip_prefix(root)
        .unwrap_or(&raw_csv)
        .display()
        .to_string();

    Some(Experiment {
        material: material.to_string(),
        dir: dir.to_path_buf(),
        raw_csv,
        contact_file,
        prefix,
        sample_id,
    })
}

fn ensure_dir(path: &Path) -> Result<(), ProcessError> {
    if path.is_dir() {
        return Ok(());
    }
    Err(ProcessError::InvalidConfig(format!(
        "not a directory: {}",
        path.display()
    )))
}

/// `root` and every sub-directory (pre-order, sorted).
fn collect_dirs(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }
    out.push(root.to_path_buf());

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("skipping directory {}: {e}", root.display());
            return;
        }
    };
    let mut children: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| !should_skip_dir(p))
        .collect();
    children.sort();

    for child in children {
        collect_dirs(&child, depth + 1, max_depth, out);
    }
}

fn sorted_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot list {}: {e}", dir.display());
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

fn should_skip_dir(path: &Path) -> bool {
    let name = file_name(path);
    name.starts_with('.') || matches!(name, "target" | "node_modules")
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("afm-layout-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn timestamp_is_validated() {
        assert_eq!(
            extract_timestamp("run_20240506_142233_data.csv").as_deref(),
            Some("20240506_142233")
        );
        // Month 13 is shaped right but not a date.
        assert_eq!(extract_timestamp("20241306_142233_data.csv"), None);
        assert_eq!(extract_timestamp("data.csv"), None);
        assert_eq!(output_prefix("data.csv"), "processed");
    }

    #[test]
    fn raw_file_filter_excludes_outputs() {
        assert!(is_raw_data_file("20240506_142233_data.csv"));
        assert!(is_raw_data_file("sensordata.csv"));
        assert!(!is_raw_data_file("20240506_142233_fz_data.csv"));
        assert!(!is_raw_data_file("20240506_142233_retract_data.csv"));
        assert!(!is_raw_data_file("processed_data.csv"));
        assert!(!is_raw_data_file("cp.txt"));
    }

    #[test]
    fn discovers_experiments_in_sorted_order() {
        let root = scratch("discover");
        touch(&root.join("pink/2/20240506_120000_data.csv"));
        touch(&root.join("pink/2/CP.txt"));
        touch(&root.join("pink/1/20240506_110000_data.csv"));
        touch(&root.join("pink/1/20240506_110000_fz_data.csv"));
        touch(&root.join("pink/1/cp.txt"));
        // No contact point: not an experiment.
        touch(&root.join("pink/3/20240506_130000_data.csv"));
        touch(&root.join("yellow/a/20240507_090000_data.csv"));
        touch(&root.join("yellow/a/cp.txt"));

        let found = discover_experiments(&root, &["pink", "white", "yellow"]).unwrap();
        let ids: Vec<(&str, &str)> = found
            .iter()
            .map(|e| (e.material.as_str(), e.prefix.as_str()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("pink", "20240506_110000"),
                ("pink", "20240506_120000"),
                ("yellow", "20240507_090000"),
            ]
        );
        assert!(found[0].raw_csv.ends_with("20240506_110000_data.csv"));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn single_experiment_folder() {
        let root = scratch("single");
        let dir = root.join("white").join("7");
        touch(&dir.join("20240101_000000_data.csv"));
        touch(&dir.join("cp.txt"));

        let exp = experiment_at(&dir).unwrap();
        assert_eq!(exp.material, "white");
        assert_eq!(exp.prefix, "20240101_000000");

        let empty = root.join("white").join("8");
        fs::create_dir_all(&empty).unwrap();
        assert!(matches!(experiment_at(&empty), Err(ProcessError::EmptyData(_))));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn reports_are_found_per_material() {
        let root = scratch("reports");
        touch(&root.join("pink/1/20240506_110000_hertz_results.txt"));
        touch(&root.join("white/1/notes.txt"));

        let reports = discover_reports(&root, &["pink", "white"]).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].material, "pink");

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_root_is_config_error() {
        let err = discover_experiments(Path::new("/definitely/not/here"), &["pink"]).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidConfig(_)));
    }

    #[test]
    fn unreadable_directory_is_listed_but_not_descended() {
        let root = scratch("unreadable");
        let missing = root.join("gone");

        let mut dirs = Vec::new();
        collect_dirs(&missing, 0, 3, &mut dirs);
        assert_eq!(dirs, vec![missing.clone()]);
        assert!(sorted_files(&missing).is_empty());

        let _ = fs::remove_dir_all(&root);
    }
}
