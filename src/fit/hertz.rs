//! Hertz fit of a single retract segment.
//!
//! Given:
//! - indentation `δ_i` and force `F_i` (converted to SI from the segment units)
//! - a fixed, known tip radius `R`
//!
//! we solve for the single parameter `E > 0` with `tiny-solver`'s
//! Levenberg–Marquardt (lower bound 0 on the variable) and score the fit with R².
//!
//! The solver variable is `k = E / E₀`, with residuals divided by the peak
//! force, so the problem is O(1) regardless of the working units.
//!
//! Initial guess (deterministic): the deepest-indentation point alone,
//! `E₀ = F / basis(δ_max)`. When that is not usable (non-positive force) the
//! configured `initial_modulus` is used instead.

use std::collections::HashMap;

use log::debug;
use tiny_solver::Optimizer;
use tiny_solver::factors::na as ts_na;

use crate::domain::{HertzFitResult, RetractSegment, SolverOptions};
use crate::error::ProcessError;
use crate::math::{mean, r_squared};
use crate::models::{hertz_basis, hertz_force};

const SCALE_VAR: &str = "k";

/// One point of the scaled Hertz residual `k·model - target`.
#[derive(Debug, Clone)]
struct HertzFactor {
    /// `E₀ · basis(δ) / F_peak`
    model: f64,
    /// `F / F_peak`
    target: f64,
}

impl<T: ts_na::RealField> tiny_solver::factors::Factor<T> for HertzFactor {
    fn residual_func(&self, params: &[ts_na::DVector<T>]) -> ts_na::DVector<T> {
        let k = params[0][0].clone();
        let model: T = ts_na::convert(self.model);
        let target: T = ts_na::convert(self.target);
        ts_na::DVector::<T>::from_vec(vec![k * model - target])
    }
}

/// Fit the Hertz model to `segment` with a fixed tip radius (meters).
pub fn fit(
    segment: &RetractSegment,
    tip_radius: f64,
    solver: &SolverOptions,
    sample_id: &str,
) -> Result<HertzFitResult, ProcessError> {
    if segment.is_empty() {
        return Err(ProcessError::InvalidSegment("retract segment is empty".to_string()));
    }
    if !(tip_radius.is_finite() && tip_radius > 0.0) {
        return Err(ProcessError::InvalidConfig(format!(
            "tip radius must be finite and > 0 (got {tip_radius})"
        )));
    }

    let (delta, force) = segment.to_si();
    if delta.iter().chain(force.iter()).any(|v| !v.is_finite()) {
        return Err(ProcessError::InvalidSegment(
            "retract segment contains non-finite values".to_string(),
        ));
    }

    // R² needs variance in the target; check before spending solver time.
    let mean_force = mean(&force).unwrap_or(0.0);
    let ss_tot: f64 = force.iter().map(|f| (f - mean_force) * (f - mean_force)).sum();
    if force.iter().all(|&f| f == force[0]) || !(ss_tot > 0.0) {
        return Err(ProcessError::DegenerateFit(format!(
            "force is constant over {} point(s); R² is undefined",
            force.len()
        )));
    }

    let basis: Vec<f64> = delta.iter().map(|&d| hertz_basis(d, tip_radius)).collect();
    if !basis.iter().any(|&b| b > 0.0) {
        return Err(ProcessError::FitConvergence(format!(
            "{sample_id}: no point has positive indentation; E is unconstrained"
        )));
    }

    let e0 = initial_guess(&basis, &force).unwrap_or(solver.initial_modulus);
    if !(e0.is_finite() && e0 > 0.0) {
        return Err(ProcessError::InvalidConfig(format!(
            "initial modulus must be finite and > 0 (got {e0})"
        )));
    }
    let peak = force.iter().fold(0.0_f64, |m, f| m.max(f.abs()));
    debug!("hertz fit {sample_id}: n={}, E0={e0:.4e}", basis.len());

    let mut problem = tiny_solver::Problem::new();
    for (&b, &f) in basis.iter().zip(force.iter()) {
        problem.add_residual_block(
            1,
            &[SCALE_VAR],
            Box::new(HertzFactor {
                model: e0 * b / peak,
                target: f / peak,
            }),
            None,
        );
    }
    problem.set_variable_bounds(SCALE_VAR, 0, 0.0, f64::INFINITY);

    let mut initial_values = HashMap::<String, ts_na::DVector<f64>>::new();
    initial_values.insert(SCALE_VAR.to_string(), ts_na::DVector::<f64>::from_vec(vec![1.0]));

    let optimizer = tiny_solver::LevenbergMarquardtOptimizer::default();
    let options = tiny_solver::OptimizerOptions {
        max_iteration: solver.max_iterations,
        verbosity_level: 0,
        ..Default::default()
    };
    let k = optimizer
        .optimize(&problem, &initial_values, Some(options))
        .and_then(|values| values.get(SCALE_VAR).map(|v| v[0]))
        .ok_or_else(|| {
            ProcessError::FitConvergence(format!(
                "{sample_id}: solver gave no solution within {} iteration(s)",
                solver.max_iterations
            ))
        })?;

    let e = k * e0;
    if !e.is_finite() {
        return Err(ProcessError::FitConvergence(format!(
            "{sample_id}: solver returned a non-finite modulus ({e})"
        )));
    }
    // The optimum sits on the lower bound: the data pull E negative.
    if e <= 0.0 {
        return Err(ProcessError::FitConvergence(format!(
            "{sample_id}: modulus pinned at the E >= 0 bound"
        )));
    }

    let predicted: Vec<f64> = delta.iter().map(|&d| hertz_force(d, e, tip_radius)).collect();
    let r2 = r_squared(&force, &predicted).ok_or_else(|| {
        ProcessError::DegenerateFit("R² is undefined for this segment".to_string())
    })?;

    debug!("hertz fit {sample_id}: E={e:.4e} Pa, R²={r2:.4}");

    Ok(HertzFitResult {
        sample_id: sample_id.to_string(),
        effective_modulus: e,
        r_squared: r2,
        tip_radius,
        n_points: basis.len(),
    })
}

/// Ratio at the deepest in-contact point, if it gives a positive finite modulus.
fn initial_guess(basis: &[f64], force: &[f64]) -> Option<f64> {
    let (i, &b) = basis
        .iter()
        .enumerate()
        .filter(|(_, b)| **b > 0.0)
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    let e0 = force[i] / b;
    (e0.is_finite() && e0 > 0.0).then_some(e0)
}
