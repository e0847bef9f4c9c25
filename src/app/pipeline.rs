//! Shared pipeline logic used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! raw sample -> force curve -> retract segment -> Hertz fit -> aggregation
//!
//! Per-sample work is independent and runs on the rayon pool; outcomes are
//! collected in input order. One bad sample never aborts a batch: its error
//! is recorded (with sample id and stage) and the rest carry on.

use std::path::Path;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::aggregate::{Aggregation, aggregate_with_groups};
use crate::convert::convert;
use crate::domain::{
    ForceDistanceCurve, HertzFitResult, PipelineConfig, RawSample, RetractSegment,
};
use crate::error::{ProcessError, SampleError, Stage};
use crate::fit::fit;
use crate::io::{
    Experiment, GROUP_MEANS_FILE, LOW_QUALITY_FILE, SUMMARY_FILE, discover_experiments,
    discover_reports, fz_file_name, read_contact_point, read_hertz_report, read_raw_csv,
    report_file_name, retract_file_name, write_fz_csv, write_group_means, write_hertz_report,
    write_low_quality, write_retract_csv, write_summary_json,
};
use crate::segment::extract_retract;

/// One sample ready for processing.
#[derive(Debug, Clone)]
pub struct SampleInput {
    pub sample_id: String,
    pub group: String,
    pub raw: RawSample,
    /// Contact point in the curve's length unit.
    pub contact_point: f64,
}

/// Everything computed for a successful sample.
#[derive(Debug, Clone)]
pub struct SampleArtifacts {
    pub curve: ForceDistanceCurve,
    pub segment: RetractSegment,
    pub fit: HertzFitResult,
}

#[derive(Debug)]
pub struct SampleOutcome {
    pub sample_id: String,
    pub group: String,
    pub result: Result<SampleArtifacts, SampleError>,
}

/// All computed outputs of a batch run.
#[derive(Debug)]
pub struct BatchRun {
    pub outcomes: Vec<SampleOutcome>,
    pub aggregation: Aggregation,
}

impl BatchRun {
    pub fn failures(&self) -> impl Iterator<Item = &SampleError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }

    pub fn fitted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Failures split into `(bad data, bad fit)`.
    pub fn failure_counts(&self) -> (usize, usize) {
        self.failures().fold((0, 0), |(data, fit), e| {
            if e.source.is_data_error() {
                (data + 1, fit)
            } else {
                (data, fit + 1)
            }
        })
    }

    pub fn summary(&self, config: &PipelineConfig) -> BatchSummary {
        let samples = self
            .outcomes
            .iter()
            .map(|o| {
                let (fit, error) = match &o.result {
                    Ok(a) => (Some(a.fit.clone()), None),
                    Err(e) => (None, Some(FailureRecord::from(e))),
                };
                SampleRecord {
                    sample_id: o.sample_id.clone(),
                    group: o.group.clone(),
                    fit,
                    error,
                }
            })
            .collect();
        BatchSummary {
            config: config.clone(),
            samples,
            aggregation: self.aggregation.clone(),
        }
    }
}

/// JSON-friendly view of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub config: PipelineConfig,
    pub samples: Vec<SampleRecord>,
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleRecord {
    pub sample_id: String,
    pub group: String,
    pub fit: Option<HertzFitResult>,
    pub error: Option<FailureRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub stage: Stage,
    pub kind: &'static str,
    pub message: String,
}

impl From<&SampleError> for FailureRecord {
    fn from(err: &SampleError) -> Self {
        Self {
            stage: err.stage,
            kind: err.source.kind(),
            message: err.source.to_string(),
        }
    }
}

/// Reject settings no sample could succeed with, before any work is done.
pub fn validate_config(config: &PipelineConfig) -> Result<(), ProcessError> {
    if !(config.tip_radius.is_finite() && config.tip_radius > 0.0) {
        return Err(ProcessError::InvalidConfig(format!(
            "tip radius must be finite and > 0 (got {})",
            config.tip_radius
        )));
    }
    if !config.r2_threshold.is_finite() {
        return Err(ProcessError::InvalidConfig(format!(
            "R² threshold must be finite (got {})",
            config.r2_threshold
        )));
    }
    if config.solver.max_iterations == 0 {
        return Err(ProcessError::InvalidConfig(
            "solver iteration limit must be > 0".to_string(),
        ));
    }
    if config.convert.baseline.end <= config.convert.baseline.start {
        return Err(ProcessError::InvalidConfig(format!(
            "baseline window {}..{} is empty",
            config.convert.baseline.start, config.convert.baseline.end
        )));
    }
    Ok(())
}

/// Stages 1–3 for one sample.
pub fn process_sample(
    raw: &RawSample,
    contact_point: f64,
    config: &PipelineConfig,
    sample_id: &str,
) -> Result<SampleArtifacts, SampleError> {
    let curve = convert(raw, &config.convert)
        .map_err(|e| SampleError::new(sample_id, Stage::Convert, e))?;
    let segment = extract_retract(&curve, contact_point)
        .map_err(|e| SampleError::new(sample_id, Stage::Segment, e))?;
    debug!(
        "{sample_id}: retract segment {}..{} ({} points)",
        segment.max_force_index + 1,
        segment.contact_index,
        segment.len()
    );
    let fit = fit(&segment, config.tip_radius, &config.solver, sample_id)
        .map_err(|e| SampleError::new(sample_id, Stage::Fit, e))?;

    Ok(SampleArtifacts {
        curve,
        segment,
        fit,
    })
}

/// Process in-memory samples in parallel and aggregate the successful fits.
pub fn run_batch(inputs: &[SampleInput], config: &PipelineConfig) -> BatchRun {
    let outcomes: Vec<SampleOutcome> = inputs
        .par_iter()
        .map(|s| SampleOutcome {
            sample_id: s.sample_id.clone(),
            group: s.group.clone(),
            result: process_sample(&s.raw, s.contact_point, config, &s.sample_id),
        })
        .collect();
    finish_batch(outcomes, config)
}

/// Load one experiment folder from disk.
pub fn load_experiment(exp: &Experiment) -> Result<SampleInput, SampleError> {
    let tag = |e: ProcessError| SampleError::new(exp.sample_id.as_str(), Stage::Ingest, e);
    let ingest = read_raw_csv(&exp.raw_csv).map_err(tag)?;
    let contact_point = read_contact_point(&exp.contact_file).map_err(tag)?;
    Ok(SampleInput {
        sample_id: exp.sample_id.clone(),
        group: exp.material.clone(),
        raw: ingest.sample,
        contact_point,
    })
}

/// Load, process and (optionally) persist a single experiment folder.
pub fn process_experiment(
    exp: &Experiment,
    config: &PipelineConfig,
    write_outputs: bool,
) -> Result<SampleArtifacts, SampleError> {
    let input = load_experiment(exp)?;
    let artifacts = process_sample(&input.raw, input.contact_point, config, &input.sample_id)?;
    if write_outputs {
        write_sample_outputs(exp, &artifacts)
            .map_err(|e| SampleError::new(exp.sample_id.as_str(), Stage::Export, e))?;
    }
    Ok(artifacts)
}

/// Discover, process and aggregate every experiment under `root`.
///
/// With `write_outputs`, per-sample tables/reports land next to the raw data
/// and the batch reports plus JSON summary land in `root`.
pub fn run_batch_dir(
    root: &Path,
    config: &PipelineConfig,
    write_outputs: bool,
) -> Result<BatchRun, ProcessError> {
    validate_config(config)?;
    let experiments = discover_experiments(root, &config.materials)?;
    if experiments.is_empty() {
        return Err(ProcessError::EmptyData(format!(
            "no experiment folders (raw *data.csv + cp.txt) under {}",
            root.display()
        )));
    }
    info!("found {} experiment(s) under {}", experiments.len(), root.display());

    let outcomes: Vec<SampleOutcome> = experiments
        .par_iter()
        .map(|exp| SampleOutcome {
            sample_id: exp.sample_id.clone(),
            group: exp.material.clone(),
            result: process_experiment(exp, config, write_outputs),
        })
        .collect();
    let run = finish_batch(outcomes, config);

    if write_outputs {
        write_batch_outputs(root, &run.aggregation)?;
        write_summary_json(&root.join(SUMMARY_FILE), &run.summary(config))?;
    }
    Ok(run)
}

/// Outcome of re-aggregating stored fit reports.
#[derive(Debug)]
pub struct CollectRun {
    pub aggregation: Aggregation,
    pub unreadable: Vec<SampleError>,
}

/// Re-aggregate `*_hertz_results.txt` reports without refitting.
pub fn collect_reports(
    root: &Path,
    config: &PipelineConfig,
    write_outputs: bool,
) -> Result<CollectRun, ProcessError> {
    validate_config(config)?;
    let reports = discover_reports(root, &config.materials)?;
    info!("found {} fit report(s) under {}", reports.len(), root.display());

    let mut results = Vec::with_capacity(reports.len());
    let mut unreadable = Vec::new();
    for report in &reports {
        let sample_id = report
            .path
            .strip_prefix(root)
            .unwrap_or(&report.path)
            .display()
            .to_string();
        match read_hertz_report(&report.path) {
            Ok(stored) => results.push((
                report.material.clone(),
                HertzFitResult {
                    sample_id,
                    effective_modulus: stored.effective_modulus,
                    r_squared: stored.r_squared,
                    tip_radius: stored.tip_radius.unwrap_or(config.tip_radius),
                    n_points: 0,
                },
            )),
            Err(e) => {
                warn!("skipping {sample_id}: {e}");
                unreadable.push(SampleError::new(sample_id, Stage::Ingest, e));
            }
        }
    }

    let aggregation = aggregate_with_groups(&config.materials, &results, config.r2_threshold);
    if write_outputs {
        write_batch_outputs(root, &aggregation)?;
    }
    Ok(CollectRun {
        aggregation,
        unreadable,
    })
}

fn finish_batch(outcomes: Vec<SampleOutcome>, config: &PipelineConfig) -> BatchRun {
    for o in &outcomes {
        if let Err(e) = &o.result {
            warn!("{e}");
        }
    }

    let results: Vec<(&str, HertzFitResult)> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok().map(|a| (o.group.as_str(), a.fit.clone())))
        .collect();
    let aggregation = aggregate_with_groups(&config.materials, &results, config.r2_threshold);

    let run = BatchRun {
        outcomes,
        aggregation,
    };
    let (data_failures, fit_failures) = run.failure_counts();
    info!(
        "batch done: {} sample(s), {} fitted, {} bad data, {} failed to fit, {} accepted",
        run.outcomes.len(),
        run.fitted_count(),
        data_failures,
        fit_failures,
        run.aggregation.accepted_count()
    );
    run
}

fn write_sample_outputs(exp: &Experiment, artifacts: &SampleArtifacts) -> Result<(), ProcessError> {
    write_fz_csv(&exp.dir.join(fz_file_name(&exp.prefix)), &artifacts.curve)?;
    write_retract_csv(&exp.dir.join(retract_file_name(&exp.prefix)), &artifacts.segment)?;
    write_hertz_report(&exp.dir.join(report_file_name(&exp.prefix)), &artifacts.fit)?;
    Ok(())
}

fn write_batch_outputs(root: &Path, aggregation: &Aggregation) -> Result<(), ProcessError> {
    write_low_quality(&root.join(LOW_QUALITY_FILE), &aggregation.rejected)?;
    write_group_means(&root.join(GROUP_MEANS_FILE), aggregation)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SynthSpec, generate};
    use crate::domain::ConvertConfig;
    use crate::io::write_raw_csv;
    use std::fs;
    use std::path::PathBuf;

    fn synthetic_input(id: &str, group: &str, modulus: f64) -> SampleInput {
        let spec = SynthSpec {
            modulus,
            ..SynthSpec::default()
        };
        let sample = generate(&spec, &ConvertConfig::default()).unwrap();
        SampleInput {
            sample_id: id.to_string(),
            group: group.to_string(),
            raw: sample.raw,
            contact_point: sample.contact_point,
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("afm-pipeline-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn single_sample_recovers_modulus() {
        let input = synthetic_input("s1", "pink", 2.5e5);
        let out = process_sample(&input.raw, input.contact_point, &PipelineConfig::default(), "s1")
            .unwrap();
        let rel = (out.fit.effective_modulus - 2.5e5).abs() / 2.5e5;
        assert!(rel < 1e-6, "rel={rel}");
        assert!(out.fit.r_squared > 0.999_999);
    }

    #[test]
    fn bad_contact_point_is_tagged_with_segment_stage() {
        let input = synthetic_input("s1", "pink", 1e5);
        // Contact point before the force peak.
        let err = process_sample(&input.raw, 0.0, &PipelineConfig::default(), "s1").unwrap_err();
        assert_eq!(err.sample_id, "s1");
        assert_eq!(err.stage, Stage::Segment);
        assert!(matches!(err.source, ProcessError::InvalidSegment(_)));
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let mut broken = synthetic_input("bad", "white", 1e5);
        broken.raw = RawSample::default();
        let inputs = vec![
            synthetic_input("a", "pink", 1e5),
            broken,
            synthetic_input("b", "pink", 3e5),
            synthetic_input("c", "yellow", 2e5),
        ];

        let run = run_batch(&inputs, &PipelineConfig::default());
        let ids: Vec<&str> = run.outcomes.iter().map(|o| o.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "bad", "b", "c"]);
        assert_eq!(run.fitted_count(), 3);

        let failures: Vec<&SampleError> = run.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].stage, Stage::Convert);
        assert_eq!(run.failure_counts(), (1, 0));

        let pink = run.aggregation.group("pink").unwrap().mean_modulus.unwrap();
        assert!((pink - 2e5).abs() / 2e5 < 1e-6);
        assert_eq!(run.aggregation.group("white").unwrap().mean_modulus, None);
    }

    #[test]
    fn config_validation_rejects_nonsense() {
        let mut cfg = PipelineConfig::default();
        assert!(validate_config(&cfg).is_ok());
        cfg.r2_threshold = f64::NAN;
        assert!(matches!(validate_config(&cfg), Err(ProcessError::InvalidConfig(_))));
    }

    #[test]
    fn directory_batch_writes_outputs_and_collects_back() {
        let root = scratch("dir");
        for (material, idx, modulus) in [("pink", 1, 1e5), ("pink", 2, 3e5), ("yellow", 1, 2e5)] {
            let dir = root.join(material).join(idx.to_string());
            fs::create_dir_all(&dir).unwrap();
            let sample = generate(
                &SynthSpec {
                    modulus,
                    ..SynthSpec::default()
                },
                &ConvertConfig::default(),
            )
            .unwrap();
            write_raw_csv(&dir.join(format!("2024050{idx}_120000_data.csv")), &sample.raw).unwrap();
            fs::write(dir.join("cp.txt"), format!("{}\n", sample.contact_point)).unwrap();
        }
        // Experiment with an unreadable contact point.
        let broken = root.join("white").join("1");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("20240501_120000_data.csv"), "Time (s),Value\n0,1\n").unwrap();
        fs::write(broken.join("cp.txt"), "n/a").unwrap();

        let cfg = PipelineConfig::default();
        let run = run_batch_dir(&root, &cfg, true).unwrap();
        assert_eq!(run.outcomes.len(), 4);
        assert_eq!(run.fitted_count(), 3);
        assert_eq!(run.failures().next().unwrap().stage, Stage::Ingest);

        assert!(root.join("pink/1/20240501_120000_fz_data.csv").is_file());
        assert!(root.join("pink/1/20240501_120000_retract_data.csv").is_file());
        assert!(root.join("pink/1/20240501_120000_hertz_results.txt").is_file());
        assert!(root.join(GROUP_MEANS_FILE).is_file());
        assert!(root.join(LOW_QUALITY_FILE).is_file());

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(root.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["samples"].as_array().unwrap().len(), 4);

        // Stored reports carry 4 significant digits.
        let collected = collect_reports(&root, &cfg, false).unwrap();
        assert!(collected.unreadable.is_empty());
        let pink = collected.aggregation.group("pink").unwrap();
        assert_eq!(pink.accepted.len(), 2);
        assert!((pink.mean_modulus.unwrap() - 2e5).abs() / 2e5 < 1e-3);

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn empty_root_is_an_error() {
        let root = scratch("empty");
        let err = run_batch_dir(&root, &PipelineConfig::default(), false).unwrap_err();
        assert!(matches!(err, ProcessError::EmptyData(_)));
        let _ = fs::remove_dir_all(&root);
    }
}
