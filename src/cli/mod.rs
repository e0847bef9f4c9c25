//! Command-line parsing for the AFM indentation pipeline.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the conversion/fitting code.
//!
//! Every numeric setting can also come from an `AFM_*` environment variable
//! (a `.env` file in the working directory is loaded first).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "afm", version, about = "AFM indentation -> Hertz modulus pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process every experiment under `<root>/<material>/...` and aggregate.
    Batch(BatchArgs),
    /// Process one experiment folder and show the fit.
    Sample(SampleArgs),
    /// Re-aggregate existing `*_hertz_results.txt` reports without refitting.
    Collect(CollectArgs),
    /// Write a synthetic raw recording (plus `cp.txt`) with known modulus.
    Synth(SynthArgs),
}

/// Conversion, fit and aggregation settings shared by all subcommands.
#[derive(Debug, Args, Clone)]
pub struct PipelineArgs {
    /// Tip radius (μm).
    #[arg(long, env = "AFM_TIP_RADIUS_UM", default_value_t = 10.0)]
    pub tip_radius_um: f64,

    /// Minimum R² for a fit to count towards the material mean.
    #[arg(long, env = "AFM_R2_THRESHOLD", default_value_t = 0.85)]
    pub r2_threshold: f64,

    /// Stage pull speed (mm/s).
    #[arg(long, env = "AFM_PULL_SPEED_MM_S", default_value_t = 0.0325)]
    pub pull_speed_mm_s: f64,

    /// Calibration slope `a` in `(a·c + b)·scale`.
    #[arg(long, env = "AFM_CAL_SLOPE", default_value_t = -0.000930, allow_hyphen_values = true)]
    pub cal_slope: f64,

    /// Calibration offset `b` in `(a·c + b)·scale`.
    #[arg(long, env = "AFM_CAL_OFFSET", default_value_t = 2.941133, allow_hyphen_values = true)]
    pub cal_offset: f64,

    /// Calibration unit scale (grams -> μN by default).
    #[arg(long, env = "AFM_CAL_SCALE", default_value_t = 0.001 * 9.8 * 1e6)]
    pub cal_scale: f64,

    /// Newtons per calibrated force unit (1e-6 when the scale yields μN).
    #[arg(long, env = "AFM_FORCE_UNIT_N", default_value_t = 1e-6)]
    pub force_unit_n: f64,

    /// First row of the baseline window (inclusive).
    #[arg(long, env = "AFM_BASELINE_START", default_value_t = 0)]
    pub baseline_start: usize,

    /// End row of the baseline window (exclusive).
    #[arg(long, env = "AFM_BASELINE_END", default_value_t = 30)]
    pub baseline_end: usize,

    /// Solver iteration limit.
    #[arg(long, env = "AFM_MAX_ITERATIONS", default_value_t = 200)]
    pub max_iterations: usize,

    /// Material folders, comma separated.
    #[arg(
        long,
        env = "AFM_MATERIALS",
        value_delimiter = ',',
        default_value = "pink,white,yellow"
    )]
    pub materials: Vec<String>,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Batch root folder.
    pub root: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Compute and print only; write no files.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Experiment folder (raw `*data.csv` + `cp.txt`).
    pub dir: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Compute and print only; write no files.
    #[arg(long)]
    pub dry_run: bool,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Batch root folder.
    pub root: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Print only; do not rewrite the batch report files.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct SynthArgs {
    /// Output CSV path (`Time (s),Value`).
    pub out: PathBuf,

    /// Contact point file (defaults to `cp.txt` next to the CSV).
    #[arg(long)]
    pub cp_out: Option<PathBuf>,

    /// Effective modulus (Pa).
    #[arg(long, default_value_t = 1e5)]
    pub modulus: f64,

    /// Peak indentation (nm).
    #[arg(long, default_value_t = 500.0)]
    pub peak_nm: f64,

    /// Samples per loading/retract phase.
    #[arg(long, default_value_t = 100)]
    pub points: usize,

    /// Sensor noise standard deviation (raw units).
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Noise seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}
