//! Confidence intervals from a bootstrap distribution.
//!
//! - percentile: quantiles of the distribution
//! - standard error: `point ± z * sd(distribution)`
//! - bias-corrected: percentile with quantile levels shifted by `z0`, the
//!   normal score of the fraction of values below the observed statistic
//!   (mid-rank ties), zero acceleration.

use crate::calculate::Calculated;
use crate::descriptive::quantile_linear_sorted;
use crate::distribution::NullDistribution;
use crate::generate::GenerateType;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::str::FromStr;
use ti_core::{Error, Result};

const PROB_EPS: f64 = 1e-12;

/// Interval construction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiMethod {
    /// Quantiles of the bootstrap distribution.
    #[default]
    Percentile,
    /// Point estimate plus or minus a normal multiple of the bootstrap SD.
    #[serde(alias = "standard_error")]
    Se,
    /// Percentile interval corrected for median bias.
    #[serde(alias = "bias-corrected")]
    BiasCorrected,
}

impl FromStr for CiMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentile" => Ok(CiMethod::Percentile),
            "se" | "standard_error" | "standard error" => Ok(CiMethod::Se),
            "bias_corrected" | "bias-corrected" | "bc" => Ok(CiMethod::BiasCorrected),
            other => Err(Error::Validation(format!(
                "unknown interval method '{other}' (expected percentile, se or bias_corrected)"
            ))),
        }
    }
}

/// Two-sided confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
    /// Confidence level in (0, 1).
    pub level: f64,
    /// Method used.
    pub method: CiMethod,
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| Error::Computation(format!("standard normal: {e}")))
}

fn clip_prob(p: f64) -> f64 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

/// Bias-correction constant `z0` with mid-rank ties.
fn bias_correction_z0(normal: &Normal, theta_hat: f64, sorted: &[f64]) -> f64 {
    let n_lt = sorted.partition_point(|&v| v < theta_hat);
    let n_le = sorted.partition_point(|&v| v <= theta_hat);
    let p = (n_lt as f64 + 0.5 * (n_le - n_lt) as f64) / sorted.len() as f64;
    normal.inverse_cdf(clip_prob(p))
}

/// Confidence interval at `level` from `dist`.
///
/// `point_estimate` is the observed statistic; it is required by the `Se` and
/// `BiasCorrected` methods and checked against `dist` when given.
///
/// # Errors
///
/// [`Error::Validation`] for a level outside (0, 1), fewer than two finite
/// values, or a missing or non-finite point estimate where one is needed.
pub fn confidence_interval(
    dist: &NullDistribution,
    level: f64,
    method: CiMethod,
    point_estimate: Option<&Calculated>,
) -> Result<ConfidenceInterval> {
    if !(level.is_finite() && level > 0.0 && level < 1.0) {
        return Err(Error::Validation(format!("level must be in (0,1), got {level}")));
    }
    let mut sorted = dist.finite();
    if sorted.len() < 2 {
        return Err(Error::Validation(format!(
            "confidence interval needs at least 2 finite values, got {}",
            sorted.len()
        )));
    }
    sorted.sort_by(f64::total_cmp);
    if dist.kind() != GenerateType::Bootstrap {
        log::warn!(
            "confidence_interval: distribution was generated by {}, not bootstrap",
            dist.kind()
        );
    }
    if let Some(obs) = point_estimate {
        dist.ensure_compatible(obs)?;
    }
    let theta_hat = || {
        point_estimate.map(|c| c.value).filter(|v| v.is_finite()).ok_or_else(|| {
            Error::Validation(format!("{method:?} interval needs a finite point estimate"))
        })
    };

    let alpha = (1.0 - level) / 2.0;
    let normal = standard_normal()?;
    let (lower, upper) = match method {
        CiMethod::Percentile => (
            quantile_linear_sorted(&sorted, alpha),
            quantile_linear_sorted(&sorted, 1.0 - alpha),
        ),
        CiMethod::Se => {
            let center = theta_hat()?;
            let half = normal.inverse_cdf(1.0 - alpha) * dist.sd();
            (center - half, center + half)
        }
        CiMethod::BiasCorrected => {
            let z0 = bias_correction_z0(&normal, theta_hat()?, &sorted);
            let adjust = |a: f64| clip_prob(normal.cdf(2.0 * z0 + normal.inverse_cdf(a)));
            (
                quantile_linear_sorted(&sorted, adjust(alpha)),
                quantile_linear_sorted(&sorted, adjust(1.0 - alpha)),
            )
        }
    };

    Ok(ConfidenceInterval { lower: lower.min(upper), upper: lower.max(upper), level, method })
}
