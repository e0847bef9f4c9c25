//! Cross-sample quality filtering and per-material aggregation (stage 4).
//!
//! A pure fold over `(group, HertzFitResult)` pairs:
//!
//! - `r_squared >= threshold` -> accepted into the group (input order kept)
//! - otherwise -> `rejected`, with sample id, group and R², for auditing
//!
//! Groups appear in first-seen order (after any pre-seeded names). A group with
//! no accepted result reports `mean_modulus: None` rather than a number.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::domain::{HertzFitResult, MaterialGroup, RejectedFit};
use crate::math::mean;

/// Output of [`aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub r2_threshold: f64,
    pub groups: Vec<MaterialGroup>,
    pub rejected: Vec<RejectedFit>,
}

impl Aggregation {
    pub fn group(&self, name: &str) -> Option<&MaterialGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// `(group, mean modulus)` in group order; `None` marks an undefined mean.
    pub fn group_means(&self) -> Vec<(&str, Option<f64>)> {
        self.groups
            .iter()
            .map(|g| (g.name.as_str(), g.mean_modulus))
            .collect()
    }

    pub fn accepted_count(&self) -> usize {
        self.groups.iter().map(|g| g.accepted.len()).sum()
    }
}

/// Partition results by R² and compute per-group mean moduli.
pub fn aggregate<G: AsRef<str>>(results: &[(G, HertzFitResult)], r2_threshold: f64) -> Aggregation {
    aggregate_with_groups::<G, &str>(&[], results, r2_threshold)
}

/// Like [`aggregate`], but every name in `expected` is reported even if no
/// result mentions it.
pub fn aggregate_with_groups<G: AsRef<str>, E: AsRef<str>>(
    expected: &[E],
    results: &[(G, HertzFitResult)],
    r2_threshold: f64,
) -> Aggregation {
    let mut groups: Vec<MaterialGroup> = Vec::new();
    let mut rejected = Vec::new();

    for name in expected {
        group_slot(&mut groups, name.as_ref());
    }

    for (group, result) in results {
        let idx = group_slot(&mut groups, group.as_ref());
        if result.r_squared >= r2_threshold {
            groups[idx].accepted.push(result.clone());
        } else {
            warn!(
                "low-quality fit {} ({}): R² = {:.4} < {r2_threshold}",
                result.sample_id,
                group.as_ref(),
                result.r_squared
            );
            rejected.push(RejectedFit {
                sample_id: result.sample_id.clone(),
                group: group.as_ref().to_string(),
                r_squared: result.r_squared,
            });
        }
    }

    for g in &mut groups {
        let moduli: Vec<f64> = g.accepted.iter().map(|r| r.effective_modulus).collect();
        g.mean_modulus = mean(&moduli);
        match g.mean_modulus {
            Some(m) => info!("{}: {} accepted, mean E_eff = {m:.4e} Pa", g.name, g.accepted.len()),
            None => warn!("{}: no accepted fits, mean E_eff undefined", g.name),
        }
    }

    Aggregation {
        r2_threshold,
        groups,
        rejected,
    }
}

fn group_slot(groups: &mut Vec<MaterialGroup>, name: &str) -> usize {
    if let Some(idx) = groups.iter().position(|g| g.name == name) {
        return idx;
    }
    groups.push(MaterialGroup {
        name: name.to_string(),
        accepted: Vec::new(),
        mean_modulus: None,
    });
    groups.len() - 1
}
