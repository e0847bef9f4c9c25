//! Synthetic raw indentation recordings with known Hertz parameters.
//!
//! The generator runs the force converter backwards: it lays out a
//! force–distance trace in display units, then maps each force to the raw
//! sensor value the calibration would turn back into that force.
//!
//! Trace shape, in sample index `k` with `n = points_per_phase`:
//!
//! - `0..=flat`: out of contact, zero force (covers the baseline window)
//! - loading: indentation grows to `peak_indentation_nm`
//! - retract: indentation shrinks back to zero at the contact point
//! - tail: out of contact again
//!
//! Gaussian noise (raw sensor units) is optional and seeded.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::{ConvertConfig, DEFAULT_TIP_RADIUS_M, RawPoint, RawSample};
use crate::error::ProcessError;
use crate::models::hertz_force;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthSpec {
    /// Effective modulus in Pa.
    pub modulus: f64,
    /// Tip radius in meters.
    pub tip_radius: f64,
    pub peak_indentation_nm: f64,
    pub flat_points: usize,
    pub points_per_phase: usize,
    pub tail_points: usize,
    /// Raw sensor reading while out of contact.
    pub sensor_baseline: f64,
    /// Standard deviation of additive sensor noise (raw units).
    pub noise_sigma: f64,
    pub seed: u64,
}

impl Default for SynthSpec {
    fn default() -> Self {
        Self {
            modulus: 1e5,
            tip_radius: DEFAULT_TIP_RADIUS_M,
            peak_indentation_nm: 500.0,
            flat_points: 40,
            points_per_phase: 100,
            tail_points: 20,
            sensor_baseline: 1000.0,
            noise_sigma: 0.0,
            seed: 42,
        }
    }
}

/// A generated recording plus the contact point that goes with it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSample {
    pub raw: RawSample,
    /// Contact point in the curve's length unit.
    pub contact_point: f64,
}

pub fn generate(spec: &SynthSpec, convert: &ConvertConfig) -> Result<SyntheticSample, ProcessError> {
    validate(spec, convert)?;

    let n = spec.points_per_phase;
    let step = spec.peak_indentation_nm / n as f64;
    let length_per_s = convert.pull_speed * convert.length_scale;
    let dt = step / length_per_s;
    // Raw-value change per display force unit.
    let gain = convert.calibration.slope * convert.calibration.unit_scale;

    let load_start = spec.flat_points;
    let peak_at = load_start + n;
    let contact_at = peak_at + n;
    let total = contact_at + spec.tail_points + 1;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let noise = if spec.noise_sigma > 0.0 {
        Some(Normal::new(0.0, spec.noise_sigma).map_err(|e| {
            ProcessError::InvalidConfig(format!("noise distribution error: {e}"))
        })?)
    } else {
        None
    };

    let mut points = Vec::with_capacity(total);
    for k in 0..total {
        let indentation_steps = if k <= load_start {
            0
        } else if k <= peak_at {
            k - load_start
        } else if k < contact_at {
            contact_at - k
        } else {
            0
        };
        let delta_m = indentation_steps as f64 * step / convert.length_scale;
        let force_n = hertz_force(delta_m, spec.modulus, spec.tip_radius);
        let force_display = force_n / convert.force_to_n;

        let mut value = spec.sensor_baseline + force_display / gain;
        if let Some(dist) = &noise {
            value += dist.sample(&mut rng);
        }
        points.push(RawPoint {
            time_s: k as f64 * dt,
            value,
        });
    }

    Ok(SyntheticSample {
        raw: RawSample::new(points),
        contact_point: contact_at as f64 * step,
    })
}

fn validate(spec: &SynthSpec, convert: &ConvertConfig) -> Result<(), ProcessError> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !(positive(spec.modulus) && positive(spec.tip_radius) && positive(spec.peak_indentation_nm)) {
        return Err(ProcessError::InvalidConfig(
            "modulus, tip radius and peak indentation must be finite and > 0".to_string(),
        ));
    }
    if spec.points_per_phase < 2 {
        return Err(ProcessError::InvalidConfig(
            "points per phase must be >= 2".to_string(),
        ));
    }
    if spec.flat_points < convert.baseline.end {
        return Err(ProcessError::InvalidConfig(format!(
            "flat region ({} points) must cover the baseline window (..{})",
            spec.flat_points, convert.baseline.end
        )));
    }
    if !(spec.noise_sigma.is_finite() && spec.noise_sigma >= 0.0) {
        return Err(ProcessError::InvalidConfig(format!(
            "noise sigma must be finite and >= 0 (got {})",
            spec.noise_sigma
        )));
    }
    let gain = convert.calibration.slope * convert.calibration.unit_scale;
    if !(positive(convert.pull_speed * convert.length_scale) && gain.is_finite() && gain != 0.0) {
        return Err(ProcessError::InvalidConfig(
            "conversion settings cannot be inverted".to_string(),
        ));
    }
    Ok(())
}
