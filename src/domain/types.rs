//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pure pipeline stages without shared state
//! - exported to CSV/JSON
//! - echoed into run summaries for reproducibility

use serde::{Deserialize, Serialize};

/// Default tip (indenter) radius in meters.
pub const DEFAULT_TIP_RADIUS_M: f64 = 10e-6;

/// Default R² acceptance threshold for aggregation.
pub const DEFAULT_R2_THRESHOLD: f64 = 0.85;

/// Default material folders of the batch layout.
pub const DEFAULT_MATERIALS: [&str; 3] = ["pink", "white", "yellow"];

/// One raw reading: time in seconds and the uncalibrated sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub time_s: f64,
    pub value: f64,
}

/// Raw sensor time series for one experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub points: Vec<RawPoint>,
}

impl RawSample {
    pub fn new(points: Vec<RawPoint>) -> Self {
        Self { points }
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self {
            points: pairs
                .iter()
                .map(|&(time_s, value)| RawPoint { time_s, value })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Conversion factors from a curve's working units to SI.
///
/// The default working units are nanometers and micronewtons, which is what the
/// instrument exports and what the tables/plots show.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveUnits {
    /// Multiply a working length by this to get meters.
    pub length_to_m: f64,
    /// Multiply a working force by this to get newtons.
    pub force_to_n: f64,
}

impl CurveUnits {
    /// nm / μN.
    pub const DISPLAY: CurveUnits = CurveUnits {
        length_to_m: 1e-9,
        force_to_n: 1e-6,
    };

    /// Plain meters / newtons.
    pub const SI: CurveUnits = CurveUnits {
        length_to_m: 1.0,
        force_to_n: 1.0,
    };
}

impl Default for CurveUnits {
    fn default() -> Self {
        CurveUnits::DISPLAY
    }
}

/// One calibrated point: signed distance and force in working units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForcePoint {
    pub distance: f64,
    pub force: f64,
}

/// Calibrated force–distance series derived from one [`RawSample`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceDistanceCurve {
    pub points: Vec<ForcePoint>,
    pub units: CurveUnits,
    /// Baseline (mean sensor value of the early window) that was subtracted.
    pub baseline: f64,
}

impl ForceDistanceCurve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One point of the unloading branch, relative to the contact point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndentationPoint {
    pub indentation: f64,
    pub force: f64,
}

/// The elastic unloading branch between the force turnaround and the contact point.
///
/// Points keep the order of the source curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetractSegment {
    pub points: Vec<IndentationPoint>,
    pub units: CurveUnits,
    pub contact_point: f64,
    pub contact_index: usize,
    pub max_force_index: usize,
}

impl RetractSegment {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points read from the contact point outward (reverse of curve order).
    pub fn from_contact(&self) -> impl Iterator<Item = &IndentationPoint> {
        self.points.iter().rev()
    }

    /// Whether indentation is monotonic (either direction) in stored order.
    ///
    /// The extractor never re-sorts, so a non-monotonic source curve yields a
    /// segment whose indentation axis zig-zags.
    pub fn is_monotonic(&self) -> bool {
        let diffs = || {
            self.points
                .windows(2)
                .map(|w| w[1].indentation - w[0].indentation)
        };
        diffs().all(|d| d >= 0.0) || diffs().all(|d| d <= 0.0)
    }

    /// Indentation (m) and force (N) columns.
    pub fn to_si(&self) -> (Vec<f64>, Vec<f64>) {
        let delta = self
            .points
            .iter()
            .map(|p| p.indentation * self.units.length_to_m)
            .collect();
        let force = self
            .points
            .iter()
            .map(|p| p.force * self.units.force_to_n)
            .collect();
        (delta, force)
    }
}

/// Outcome of fitting the Hertz model to one retract segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HertzFitResult {
    pub sample_id: String,
    /// Effective modulus in pascals.
    pub effective_modulus: f64,
    pub r_squared: f64,
    /// Tip radius in meters.
    pub tip_radius: f64,
    pub n_points: usize,
}

/// Accepted results of one material plus their mean modulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialGroup {
    pub name: String,
    pub accepted: Vec<HertzFitResult>,
    /// `None` when the group has no accepted result (the mean is undefined).
    pub mean_modulus: Option<f64>,
}

/// A fit result that failed the R² threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedFit {
    pub sample_id: String,
    pub group: String,
    pub r_squared: f64,
}

/// Affine sensor calibration: `force = (slope * corrected + offset) * unit_scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub slope: f64,
    pub offset: f64,
    pub unit_scale: f64,
}

impl Default for Calibration {
    /// Load-cell calibration in grams, scaled g -> kg -> N -> μN.
    fn default() -> Self {
        Self {
            slope: -0.000930,
            offset: 2.941133,
            unit_scale: 0.001 * 9.8 * 1e6,
        }
    }
}

/// Half-open index range `[start, end)` of the early, contact-free readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineWindow {
    pub start: usize,
    pub end: usize,
}

impl Default for BaselineWindow {
    fn default() -> Self {
        Self { start: 0, end: 30 }
    }
}

/// Parameters of the baseline & force conversion stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Stage speed in m/s.
    pub pull_speed: f64,
    /// Meters -> working length unit.
    pub length_scale: f64,
    pub calibration: Calibration,
    pub baseline: BaselineWindow,
    /// Working force unit -> newtons (recorded on the curve for the fitter).
    pub force_to_n: f64,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            // 0.0325 mm/s
            pull_speed: 0.0325e-3,
            length_scale: 1e9,
            calibration: Calibration::default(),
            baseline: BaselineWindow::default(),
            force_to_n: 1e-6,
        }
    }
}

impl ConvertConfig {
    pub fn units(&self) -> CurveUnits {
        CurveUnits {
            length_to_m: 1.0 / self.length_scale,
            force_to_n: self.force_to_n,
        }
    }
}

/// Levenberg–Marquardt limits for the Hertz fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    pub max_iterations: usize,
    /// Starting modulus (Pa) when the data-driven guess is unusable.
    pub initial_modulus: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            initial_modulus: 1e5,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub convert: ConvertConfig,
    /// Tip radius in meters.
    pub tip_radius: f64,
    pub r2_threshold: f64,
    pub solver: SolverOptions,
    pub materials: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            convert: ConvertConfig::default(),
            tip_radius: DEFAULT_TIP_RADIUS_M,
            r2_threshold: DEFAULT_R2_THRESHOLD,
            solver: SolverOptions::default(),
            materials: DEFAULT_MATERIALS.iter().map(|m| m.to_string()).collect(),
        }
    }
}
