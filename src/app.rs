//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the pipeline (batch, single sample, collect, synth)
//! - prints reports/plots

use clap::Parser;
use log::info;

use crate::cli::{BatchArgs, CollectArgs, Command, PipelineArgs, SampleArgs, SynthArgs};
use crate::domain::{BaselineWindow, Calibration, ConvertConfig, PipelineConfig, SolverOptions};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `afm` binary.
pub fn run() -> Result<(), AppError> {
    // `AFM_*` settings may live in a local `.env`; a missing file is fine.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Batch(args) => handle_batch(args),
        Command::Sample(args) => handle_sample(args),
        Command::Collect(args) => handle_collect(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.pipeline);
    let run = pipeline::run_batch_dir(&args.root, &config, !args.dry_run)?;

    println!("{}", crate::report::format_batch(&run));

    // Partial failure still produces outputs; the exit code reflects it.
    let failed = run.failures().count();
    if failed > 0 {
        return Err(AppError::new(
            3,
            format!("{failed} of {} sample(s) failed", run.outcomes.len()),
        ));
    }
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.pipeline);
    pipeline::validate_config(&config)?;

    let exp = crate::io::experiment_at(&args.dir)?;
    let artifacts = pipeline::process_experiment(&exp, &config, !args.dry_run)?;

    println!("{}", crate::report::format_sample(&artifacts, &config));
    if !args.no_plot {
        println!(
            "{}",
            crate::plot::render_curve_plot(&artifacts.curve, args.width, args.height)
        );
        println!(
            "{}",
            crate::plot::render_retract_plot(
                &artifacts.segment,
                Some(&artifacts.fit),
                args.width,
                args.height
            )
        );
    }
    Ok(())
}

fn handle_collect(args: CollectArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.pipeline);
    let run = pipeline::collect_reports(&args.root, &config, !args.dry_run)?;
    println!("{}", crate::report::format_collect(&run));
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.pipeline);
    let spec = crate::data::SynthSpec {
        modulus: args.modulus,
        tip_radius: config.tip_radius,
        peak_indentation_nm: args.peak_nm,
        points_per_phase: args.points,
        noise_sigma: args.noise,
        seed: args.seed,
        ..crate::data::SynthSpec::default()
    };
    let sample = crate::data::generate(&spec, &config.convert)?;

    let cp_path = args.cp_out.clone().unwrap_or_else(|| {
        args.out
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join(crate::io::CONTACT_POINT_FILE)
    });
    crate::io::write_raw_csv(&args.out, &sample.raw)?;
    std::fs::write(&cp_path, format!("{}\n", sample.contact_point))
        .map_err(|e| crate::error::ProcessError::io(&cp_path, e))?;

    info!(
        "wrote {} ({} rows) and {} (contact point {:.3})",
        args.out.display(),
        sample.raw.len(),
        cp_path.display(),
        sample.contact_point
    );
    Ok(())
}

pub fn pipeline_config_from_args(args: &PipelineArgs) -> PipelineConfig {
    PipelineConfig {
        convert: ConvertConfig {
            // mm/s -> m/s
            pull_speed: args.pull_speed_mm_s * 1e-3,
            calibration: Calibration {
                slope: args.cal_slope,
                offset: args.cal_offset,
                unit_scale: args.cal_scale,
            },
            baseline: BaselineWindow {
                start: args.baseline_start,
                end: args.baseline_end,
            },
            force_to_n: args.force_unit_n,
            ..ConvertConfig::default()
        },
        tip_radius: args.tip_radius_um * 1e-6,
        r2_threshold: args.r2_threshold,
        solver: SolverOptions {
            max_iterations: args.max_iterations,
            ..SolverOptions::default()
        },
        materials: args.materials.clone(),
    }
}
