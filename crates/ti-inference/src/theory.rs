//! Theoretical reference distributions for standardized statistics.
//!
//! The theory path replaces the simulated null distribution with the
//! large-sample one, taking degrees of freedom from the specified dataset.

use crate::calculate::{STAT_TABLE, Stat};
use crate::descriptive::variance;
use crate::p_value::Direction;
use crate::specify::{RoleSignature, Specified};
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};
use ti_core::{Error, Result};

/// Reference distribution of a standardized statistic under the null.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum Theoretical {
    /// Student t.
    T {
        /// Degrees of freedom (Welch-Satterthwaite for two samples).
        df: f64,
    },
    /// Standard normal.
    Z,
    /// Fisher F.
    F {
        /// Numerator degrees of freedom.
        df1: f64,
        /// Denominator degrees of freedom.
        df2: f64,
    },
    /// Chi-square.
    ChiSquared {
        /// Degrees of freedom.
        df: f64,
    },
}

fn dist_err(e: impl std::fmt::Display) -> Error {
    Error::Computation(format!("reference distribution: {e}"))
}

impl Theoretical {
    /// Lower-tail probability `P(X <= x)`.
    pub fn cdf(&self, x: f64) -> Result<f64> {
        Ok(match *self {
            Theoretical::T { df } => StudentsT::new(0.0, 1.0, df).map_err(dist_err)?.cdf(x),
            Theoretical::Z => Normal::new(0.0, 1.0).map_err(dist_err)?.cdf(x),
            Theoretical::F { df1, df2 } => FisherSnedecor::new(df1, df2).map_err(dist_err)?.cdf(x),
            Theoretical::ChiSquared { df } => ChiSquared::new(df).map_err(dist_err)?.cdf(x),
        })
    }

    /// p-value of `observed` under this distribution.
    ///
    /// Two-sided p-values are twice the smaller tail, capped at 1. F and
    /// chi-square statistics are conventionally tested with `Greater`.
    pub fn p_value(&self, observed: f64, direction: Direction) -> Result<f64> {
        if !observed.is_finite() {
            return Err(Error::Validation(format!("observed statistic is not finite ({observed})")));
        }
        let lower = self.cdf(observed)?;
        let upper = 1.0 - lower;
        if direction != Direction::Greater
            && matches!(self, Theoretical::F { .. } | Theoretical::ChiSquared { .. })
        {
            log::warn!("theory: `{direction}` test on a one-tailed reference distribution");
        }
        Ok(match direction {
            Direction::Less => lower,
            Direction::Greater => upper,
            Direction::TwoSided => (2.0 * lower.min(upper)).min(1.0),
        })
    }
}

fn level_sizes(codes: &[u32], n_levels: usize) -> Vec<usize> {
    let mut sizes = vec![0; n_levels];
    for &c in codes {
        sizes[c as usize] += 1;
    }
    sizes
}

/// Reference distribution of `stat` on `specified`.
///
/// # Errors
///
/// [`Error::Unsupported`] for statistics without a standard reference
/// distribution (anything but `t`, `z`, `F`, `Chisq`);
/// [`Error::IncompatibleStatistic`] when the statistic does not fit the roles;
/// [`Error::Validation`] when the degrees of freedom are not positive.
pub fn assume(specified: &Specified, stat: Stat) -> Result<Theoretical> {
    let signature = specified.signature();
    if !matches!(stat, Stat::T | Stat::Z | Stat::F | Stat::Chisq) {
        return Err(Error::Unsupported(format!(
            "no theoretical distribution for `{stat}`; use t, z, F or Chisq"
        )));
    }
    if !STAT_TABLE.iter().any(|e| e.stat == stat && e.signature == signature) {
        return Err(Error::IncompatibleStatistic(format!(
            "`{stat}` is not defined for a {signature}"
        )));
    }
    let n = specified.n_rows() as f64;
    let explanatory = specified.explanatory_var().and_then(|x| x.as_categorical());

    let theory = match (stat, signature) {
        (Stat::T, RoleSignature::Numeric | RoleSignature::Paired) => Theoretical::T { df: n - 1.0 },
        (Stat::T, _) => {
            let (y, (levels, x)) = specified
                .response()
                .as_numeric()
                .zip(explanatory)
                .ok_or_else(|| Error::IncompatibleStatistic("two-sample `t` roles".into()))?;
            if levels.len() != 2 {
                return Err(Error::IncompatibleStatistic(format!(
                    "two-sample `t` needs two groups, got {}",
                    levels.len()
                )));
            }
            let group = |k: u32| -> Vec<f64> {
                y.iter().zip(x).filter(|&(_, &c)| c == k).map(|(&v, _)| v).collect()
            };
            let (a, b) = (group(0), group(1));
            let (na, nb) = (a.len() as f64, b.len() as f64);
            let (va, vb) = (variance(&a) / na, variance(&b) / nb);
            let df = (va + vb).powi(2) / (va * va / (na - 1.0) + vb * vb / (nb - 1.0));
            Theoretical::T { df }
        }
        (Stat::Z, _) => Theoretical::Z,
        (Stat::F, _) => {
            let (levels, x) = explanatory
                .ok_or_else(|| Error::IncompatibleStatistic("`F` needs groups".into()))?;
            let k = level_sizes(x, levels.len()).into_iter().filter(|&s| s > 0).count() as f64;
            Theoretical::F { df1: k - 1.0, df2: n - k }
        }
        (Stat::Chisq, RoleSignature::Categorical) => {
            let k = specified.response().levels().map_or(0, <[String]>::len) as f64;
            Theoretical::ChiSquared { df: k - 1.0 }
        }
        (Stat::Chisq, _) => {
            let r = specified.response().levels().map_or(0, <[String]>::len) as f64;
            let c = explanatory.map_or(0, |(levels, _)| levels.len()) as f64;
            Theoretical::ChiSquared { df: (r - 1.0) * (c - 1.0) }
        }
        _ => return Err(Error::Unsupported(format!("no theoretical distribution for `{stat}`"))),
    };

    let df_ok = match theory {
        Theoretical::T { df } | Theoretical::ChiSquared { df } => df.is_finite() && df > 0.0,
        Theoretical::F { df1, df2 } => df1 > 0.0 && df2 > 0.0,
        Theoretical::Z => true,
    };
    if !df_ok {
        return Err(Error::Validation(format!(
            "degrees of freedom for `{stat}` are not positive ({theory:?})"
        )));
    }
    log::debug!("theory: `{stat}` on a {signature} follows {theory:?}");
    Ok(theory)
}
