//! Simulation-based p-values.

use crate::calculate::Calculated;
use crate::distribution::NullDistribution;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ti_core::{Error, Result};

/// Direction of the alternative hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Alternative: statistic smaller than under the null.
    #[serde(alias = "left")]
    Less,
    /// Alternative: statistic larger than under the null.
    #[serde(alias = "right")]
    Greater,
    /// Alternative: statistic differs in either direction.
    #[default]
    #[serde(alias = "two-sided", alias = "both")]
    TwoSided,
}

impl Direction {
    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Less => "less",
            Direction::Greater => "greater",
            Direction::TwoSided => "two_sided",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "less" | "left" => Ok(Direction::Less),
            "greater" | "right" => Ok(Direction::Greater),
            "two_sided" | "two-sided" | "two sided" | "both" => Ok(Direction::TwoSided),
            other => Err(Error::Validation(format!(
                "unknown direction '{other}' (expected less, greater or two_sided)"
            ))),
        }
    }
}

/// Fraction of `null_values` at least as extreme as `observed`.
///
/// Non-finite null values are ignored. Two-sided p-values are twice the
/// smaller tail, capped at 1.
///
/// # Errors
///
/// [`Error::Validation`] when `observed` is not finite or no null value is.
pub fn p_value_of(null_values: &[f64], observed: f64, direction: Direction) -> Result<f64> {
    if !observed.is_finite() {
        return Err(Error::Validation(format!("observed statistic is not finite ({observed})")));
    }
    let finite: Vec<f64> = null_values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Err(Error::Validation("null distribution has no finite values".to_string()));
    }
    let n = finite.len() as f64;
    let left = finite.iter().filter(|&&v| v <= observed).count() as f64 / n;
    let right = finite.iter().filter(|&&v| v >= observed).count() as f64 / n;

    let p = match direction {
        Direction::Less => left,
        Direction::Greater => right,
        Direction::TwoSided => (2.0 * left.min(right)).min(1.0),
    };
    if p == 0.0 {
        log::warn!(
            "p_value: no null value is as extreme as {observed}; the true p-value is below 1/{}",
            finite.len()
        );
    }
    Ok(p)
}

/// p-value of `observed` against `dist`.
///
/// # Errors
///
/// Fails when `observed` is a different statistic or order from `dist`, and
/// as [`p_value_of`].
pub fn p_value(dist: &NullDistribution, observed: &Calculated, direction: Direction) -> Result<f64> {
    dist.ensure_compatible(observed)?;
    p_value_of(dist.values(), observed.value, direction)
}
