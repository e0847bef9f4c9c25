//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::aggregate::Aggregation;
use crate::app::pipeline::{BatchRun, CollectRun, SampleArtifacts};
use crate::domain::PipelineConfig;

/// Summary of a single processed sample.
pub fn format_sample(artifacts: &SampleArtifacts, config: &PipelineConfig) -> String {
    let fit = &artifacts.fit;
    let seg = &artifacts.segment;
    let mut out = String::new();

    out.push_str(&format!("=== afm - Hertz fit: {} ===\n", fit.sample_id));
    out.push_str(&format!(
        "Curve: n={} | baseline={:.6} (rows {}..{})\n",
        artifacts.curve.len(),
        artifacts.curve.baseline,
        config.convert.baseline.start,
        config.convert.baseline.end
    ));
    out.push_str(&format!(
        "Retract: rows {}..{} (n={}) | contact point={:.3}\n",
        seg.max_force_index + 1,
        seg.contact_index,
        seg.len(),
        seg.contact_point
    ));
    out.push_str(&format!("E_eff = {:.4e} Pa\n", fit.effective_modulus));
    out.push_str(&format!(
        "R² = {:.4}{}\n",
        fit.r_squared,
        if fit.r_squared >= config.r2_threshold { "" } else { "  (below threshold)" }
    ));
    out.push_str(&format!(
        "R = {:.2} μm | n={}\n",
        fit.tip_radius * 1e6,
        fit.n_points
    ));

    out
}

/// Per-sample table for a batch run, followed by failures and group means.
pub fn format_batch(run: &BatchRun) -> String {
    let mut out = String::new();

    out.push_str(&header_row());
    for o in &run.outcomes {
        let line = match &o.result {
            Ok(a) => format!(
                "{:<36} {:<8} {:>12} {:>8.4} {:>6}",
                truncate(&o.sample_id, 36),
                truncate(&o.group, 8),
                format!("{:.4e}", a.fit.effective_modulus),
                a.fit.r_squared,
                a.fit.n_points
            ),
            Err(e) => format!(
                "{:<36} {:<8} {:>12} {:>8} {:>6}",
                truncate(&o.sample_id, 36),
                truncate(&o.group, 8),
                "failed",
                "-",
                "-"
            ) + &format!("  [{}] {}", e.stage.label(), e.source),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    let (data_failures, fit_failures) = run.failure_counts();
    if data_failures + fit_failures > 0 {
        out.push_str(&format!(
            "\nFailures: {data_failures} bad data, {fit_failures} failed to fit\n"
        ));
    }

    out.push('\n');
    out.push_str(&format_aggregation(&run.aggregation));
    out
}

/// Group means plus rejected fits.
pub fn format_aggregation(agg: &Aggregation) -> String {
    let mut out = String::new();

    out.push_str(&format!("Material means (R² >= {}):\n", agg.r2_threshold));
    for g in &agg.groups {
        let mean = match g.mean_modulus {
            Some(m) => format!("{m:.4e} Pa"),
            None => "undefined".to_string(),
        };
        out.push_str(&format!("- {:<8} n={:<4} {mean}\n", g.name, g.accepted.len()));
    }

    if !agg.rejected.is_empty() {
        out.push_str("\nLow-quality fits:\n");
        for r in &agg.rejected {
            out.push_str(&format!("- {} ({}): R² = {:.4}\n", r.sample_id, r.group, r.r_squared));
        }
    }

    out
}

pub fn format_collect(run: &CollectRun) -> String {
    let mut out = format_aggregation(&run.aggregation);
    if !run.unreadable.is_empty() {
        out.push_str("\nUnreadable reports:\n");
        for e in &run.unreadable {
            out.push_str(&format!("- {}: {}\n", e.sample_id, e.source));
        }
    }
    out
}

fn header_row() -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<36} {:<8} {:>12} {:>8} {:>6}",
            "sample", "group", "E_eff (Pa)", "R²", "n"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<36} {:-<8} {:-<12} {:-<8} {:-<6}", "", "", "", "", "").trim_end());
    out.push('\n');
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_with_groups;
    use crate::app::pipeline::SampleOutcome;
    use crate::domain::HertzFitResult;
    use crate::error::{ProcessError, SampleError, Stage};

    fn result(id: &str, e: f64, r2: f64) -> HertzFitResult {
        HertzFitResult {
            sample_id: id.to_string(),
            effective_modulus: e,
            r_squared: r2,
            tip_radius: 10e-6,
            n_points: 12,
        }
    }

    #[test]
    fn aggregation_marks_undefined_means() {
        let results = vec![
            ("pink", result("p1", 1.5e5, 0.97)),
            ("white", result("w1", 2.0e5, 0.30)),
        ];
        let agg = aggregate_with_groups(&["pink", "white"], &results, 0.85);
        let text = format_aggregation(&agg);

        assert!(text.contains("- pink     n=1    1.5000e5 Pa"), "{text}");
        assert!(text.contains("- white    n=0    undefined"), "{text}");
        assert!(text.contains("- w1 (white): R² = 0.3000"), "{text}");
    }

    #[test]
    fn batch_table_lists_failures_with_stage() {
        let agg = aggregate_with_groups::<&str, &str>(&["pink"], &[], 0.85);
        let run = BatchRun {
            outcomes: vec![SampleOutcome {
                sample_id: "pink/1/raw_data.csv".to_string(),
                group: "pink".to_string(),
                result: Err(SampleError::new(
                    "pink/1/raw_data.csv",
                    Stage::Segment,
                    ProcessError::InvalidSegment("only 2 point(s)".to_string()),
                )),
            }],
            aggregation: agg,
        };
        let text = format_batch(&run);
        assert!(text.starts_with("sample"));
        assert!(text.contains("failed"));
        assert!(text.contains("[segment] invalid retract segment: only 2 point(s)"));
        assert!(text.contains("Failures: 1 bad data, 0 failed to fit"), "{text}");
    }

    #[test]
    fn batch_table_separates_data_and_fit_failures() {
        let failed = |id: &str, stage: Stage, err: ProcessError| SampleOutcome {
            sample_id: id.to_string(),
            group: "pink".to_string(),
            result: Err(SampleError::new(id, stage, err)),
        };
        let run = BatchRun {
            outcomes: vec![
                failed("a", Stage::Convert, ProcessError::EmptyData("no rows".to_string())),
                failed(
                    "b",
                    Stage::Fit,
                    ProcessError::FitConvergence("modulus pinned at the E >= 0 bound".to_string()),
                ),
                failed(
                    "c",
                    Stage::Fit,
                    ProcessError::DegenerateFit("force is constant".to_string()),
                ),
            ],
            aggregation: aggregate_with_groups::<&str, &str>(&["pink"], &[], 0.85),
        };
        assert_eq!(run.failure_counts(), (2, 1));
        assert!(format_batch(&run).contains("Failures: 2 bad data, 1 failed to fit"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
