//! Statistic calculation.
//!
//! Each supported statistic is keyed to the role signature it is defined for
//! in [`STAT_TABLE`]. [`calculate`] resolves the statistic against a dataset
//! once (table lookup, success level, null-dependent form of `t`/`z`, group
//! order) and then evaluates it; null distributions resolve once against the
//! source dataset and reuse the resolution for every replicate.

use crate::descriptive::{mean, median, std_dev, sum, variance};
use crate::hypothesize::NullHypothesis;
use crate::specify::{RoleSignature, Specified};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ti_core::{Error, Result};

/// Named statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Stat {
    /// Mean of a numeric response.
    Mean,
    /// Median of a numeric response.
    Median,
    /// Sum of a numeric response.
    Sum,
    /// Sample standard deviation of a numeric response.
    Sd,
    /// Fraction of rows equal to the success level.
    Prop,
    /// Number of rows equal to the success level.
    Count,
    /// One-sample or Welch two-sample t statistic.
    T,
    /// One-sample or pooled two-sample z statistic for proportions.
    Z,
    /// `mean(A) - mean(B)`.
    DiffInMeans,
    /// `median(A) - median(B)`.
    DiffInMedians,
    /// `mean(A) / mean(B)`.
    RatioOfMeans,
    /// `prop(A) - prop(B)`.
    DiffInProps,
    /// `prop(A) / prop(B)`.
    RatioOfProps,
    /// `odds(A) / odds(B)`.
    OddsRatio,
    /// One-way ANOVA F.
    F,
    /// Pearson chi-square (goodness of fit or independence).
    Chisq,
    /// OLS slope of response on explanatory.
    Slope,
    /// Pearson correlation.
    Correlation,
}

impl Stat {
    /// Every statistic.
    pub const ALL: [Stat; 18] = [
        Stat::Mean,
        Stat::Median,
        Stat::Sum,
        Stat::Sd,
        Stat::Prop,
        Stat::Count,
        Stat::T,
        Stat::Z,
        Stat::DiffInMeans,
        Stat::DiffInMedians,
        Stat::RatioOfMeans,
        Stat::DiffInProps,
        Stat::RatioOfProps,
        Stat::OddsRatio,
        Stat::F,
        Stat::Chisq,
        Stat::Slope,
        Stat::Correlation,
    ];

    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            Stat::Mean => "mean",
            Stat::Median => "median",
            Stat::Sum => "sum",
            Stat::Sd => "sd",
            Stat::Prop => "prop",
            Stat::Count => "count",
            Stat::T => "t",
            Stat::Z => "z",
            Stat::DiffInMeans => "diff in means",
            Stat::DiffInMedians => "diff in medians",
            Stat::RatioOfMeans => "ratio of means",
            Stat::DiffInProps => "diff in props",
            Stat::RatioOfProps => "ratio of props",
            Stat::OddsRatio => "odds ratio",
            Stat::F => "F",
            Stat::Chisq => "Chisq",
            Stat::Slope => "slope",
            Stat::Correlation => "correlation",
        }
    }

    /// Whether the statistic counts a success level.
    pub fn needs_success(self) -> bool {
        matches!(
            self,
            Stat::Prop
                | Stat::Count
                | Stat::Z
                | Stat::DiffInProps
                | Stat::RatioOfProps
                | Stat::OddsRatio
        )
    }

    /// Whether the statistic contrasts two explanatory groups in a given order.
    pub fn is_two_group(self) -> bool {
        matches!(
            self,
            Stat::DiffInMeans
                | Stat::DiffInMedians
                | Stat::RatioOfMeans
                | Stat::DiffInProps
                | Stat::RatioOfProps
                | Stat::OddsRatio
        )
    }
}

impl std::fmt::Display for Stat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Stat> for &'static str {
    fn from(s: Stat) -> Self {
        s.as_str()
    }
}

impl FromStr for Stat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim();
        Stat::ALL
            .into_iter()
            .find(|stat| {
                let name = stat.as_str();
                name == key || name.replace(' ', "_") == key || name.eq_ignore_ascii_case(key)
            })
            .ok_or_else(|| Error::IncompatibleStatistic(format!("unknown statistic '{key}'")))
    }
}

impl TryFrom<String> for Stat {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Subtraction order for two-group statistics: `(minuend, subtrahend)` levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order(pub String, pub String);

impl Order {
    /// Order `first - second`.
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Order(first.into(), second.into())
    }

    /// The same two levels, swapped.
    pub fn reversed(&self) -> Self {
        Order(self.1.clone(), self.0.clone())
    }
}

/// A statistic evaluated on one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calculated {
    /// Statistic computed.
    pub stat: Stat,
    /// Role signature it was computed under.
    pub signature: RoleSignature,
    /// Group order used, for two-group statistics.
    pub order: Option<Order>,
    /// Value (`NaN` when undefined for this dataset).
    pub value: f64,
    /// Rows removed for missing values when the dataset was specified.
    pub dropped_rows: usize,
}

// ---------------------------------------------------------------------------
// Dispatch table
// ---------------------------------------------------------------------------

type StatFn = fn(&Specified, &Resolved) -> Result<f64>;

/// One row of the dispatch table.
#[derive(Clone, Copy)]
pub struct StatEntry {
    /// Statistic.
    pub stat: Stat,
    /// Role signature it is defined for.
    pub signature: RoleSignature,
    compute: StatFn,
}

impl std::fmt::Debug for StatEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatEntry")
            .field("stat", &self.stat)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

const fn entry(stat: Stat, signature: RoleSignature, compute: StatFn) -> StatEntry {
    StatEntry { stat, signature, compute }
}

use RoleSignature as Sig;

/// Every (statistic, role signature) pair with its implementation.
pub const STAT_TABLE: &[StatEntry] = &[
    entry(Stat::Mean, Sig::Numeric, stat_mean),
    entry(Stat::Mean, Sig::Paired, stat_mean),
    entry(Stat::Median, Sig::Numeric, stat_median),
    entry(Stat::Median, Sig::Paired, stat_median),
    entry(Stat::Sum, Sig::Numeric, stat_sum),
    entry(Stat::Sum, Sig::Paired, stat_sum),
    entry(Stat::Sd, Sig::Numeric, stat_sd),
    entry(Stat::Sd, Sig::Paired, stat_sd),
    entry(Stat::Prop, Sig::Categorical, stat_prop),
    entry(Stat::Count, Sig::Categorical, stat_count),
    entry(Stat::T, Sig::Numeric, stat_t_one_sample),
    entry(Stat::T, Sig::Paired, stat_t_one_sample),
    entry(Stat::T, Sig::NumericByCategorical, stat_t_two_sample),
    entry(Stat::Z, Sig::Categorical, stat_z_one_sample),
    entry(Stat::Z, Sig::CategoricalByCategorical, stat_z_two_sample),
    entry(Stat::DiffInMeans, Sig::NumericByCategorical, stat_diff_in_means),
    entry(Stat::DiffInMedians, Sig::NumericByCategorical, stat_diff_in_medians),
    entry(Stat::RatioOfMeans, Sig::NumericByCategorical, stat_ratio_of_means),
    entry(Stat::DiffInProps, Sig::CategoricalByCategorical, stat_diff_in_props),
    entry(Stat::RatioOfProps, Sig::CategoricalByCategorical, stat_ratio_of_props),
    entry(Stat::OddsRatio, Sig::CategoricalByCategorical, stat_odds_ratio),
    entry(Stat::F, Sig::NumericByCategorical, stat_f),
    entry(Stat::Chisq, Sig::Categorical, stat_chisq_gof),
    entry(Stat::Chisq, Sig::CategoricalByCategorical, stat_chisq_independence),
    entry(Stat::Slope, Sig::NumericByNumeric, stat_slope),
    entry(Stat::Correlation, Sig::NumericByNumeric, stat_correlation),
];

/// A statistic resolved against a dataset's roles and null.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub(crate) stat: Stat,
    pub(crate) signature: RoleSignature,
    pub(crate) order: Option<Order>,
    entry: StatEntry,
    /// Explanatory level codes `[A, B]` for two-group forms.
    groups: Option<[u32; 2]>,
}

impl Resolved {
    pub(crate) fn compute(&self, specified: &Specified) -> Result<f64> {
        (self.entry.compute)(specified, self)
    }

    fn groups(&self) -> Result<[u32; 2]> {
        self.groups.ok_or_else(|| {
            Error::Computation(format!("`{}` was resolved without a group order", self.stat))
        })
    }
}

fn describe_null(h: Option<&NullHypothesis>) -> String {
    match h {
        None => "no null".to_string(),
        Some(NullHypothesis::Point(p)) => format!("a point null on {}", p.name()),
        Some(h) => format!("a {} null", h.null_type()),
    }
}

pub(crate) fn resolve(specified: &Specified, stat: Stat, order: Option<&Order>) -> Result<Resolved> {
    let signature = specified.signature();
    let hypothesis = specified.hypothesis();

    if stat.needs_success()
        && matches!(signature, Sig::Categorical | Sig::CategoricalByCategorical)
        && specified.success().is_none()
    {
        return Err(Error::IncompatibleStatistic(format!(
            "`{stat}` needs a declared `success` level for categorical response '{}'",
            specified.response().name()
        )));
    }

    let entry = STAT_TABLE
        .iter()
        .find(|e| e.stat == stat && e.signature == signature)
        .copied()
        .ok_or_else(|| {
            let supported: Vec<String> = STAT_TABLE
                .iter()
                .filter(|e| e.stat == stat)
                .map(|e| e.signature.to_string())
                .collect();
            Error::IncompatibleStatistic(format!(
                "`{stat}` is not defined for a {signature}; it needs a {}",
                supported.join(" or a ")
            ))
        })?;

    match (stat, signature) {
        (Stat::T, Sig::Numeric | Sig::Paired) => match hypothesis {
            None => log::warn!("calculate: `t` without a point null on mu; testing against mu = 0"),
            Some(NullHypothesis::Point(crate::hypothesize::PointParam::Mean(_)))
            | Some(NullHypothesis::PairedIndependence) => {}
            Some(_) => {
                return Err(Error::IncompatibleStatistic(format!(
                    "one-sample `t` needs a point null on mu, got {}",
                    describe_null(hypothesis)
                )));
            }
        },
        (Stat::T, Sig::NumericByCategorical) => {
            if !matches!(hypothesis, Some(NullHypothesis::Independence)) {
                return Err(Error::IncompatibleStatistic(format!(
                    "`t` with an explanatory variable needs a declared independence null \
                     (two-sample form) or a point null without the explanatory variable \
                     (one-sample form); got {}",
                    describe_null(hypothesis)
                )));
            }
        }
        (Stat::Z, Sig::Categorical) => match hypothesis.and_then(NullHypothesis::p_scalar) {
            None => {
                return Err(Error::IncompatibleStatistic(format!(
                    "one-sample `z` needs a point null on a scalar p, got {}",
                    describe_null(hypothesis)
                )));
            }
            Some(p0) if p0 <= 0.0 || p0 >= 1.0 => {
                return Err(Error::IncompatibleStatistic(format!(
                    "one-sample `z` has zero standard error under p = {p0}; use `prop` or `count`"
                )));
            }
            Some(_) => {}
        },
        (Stat::Chisq, Sig::Categorical) => {
            if hypothesis.and_then(NullHypothesis::p_scalar).is_some() {
                return Err(Error::IncompatibleStatistic(
                    "Chisq goodness of fit needs p for every level, not a scalar p".to_string(),
                ));
            }
        }
        _ => {}
    }

    let two_group = stat.is_two_group()
        || matches!((stat, signature), (Stat::T, Sig::NumericByCategorical))
        || matches!((stat, signature), (Stat::Z, Sig::CategoricalByCategorical));

    let (groups, order) = if two_group {
        let (levels, name) = match specified.explanatory_var() {
            Some(x) => (x.levels().unwrap_or_default(), x.name()),
            None => (&[][..], ""),
        };
        if levels.len() != 2 {
            return Err(Error::IncompatibleStatistic(format!(
                "`{stat}` compares two groups; '{name}' has {} levels",
                levels.len()
            )));
        }
        match order {
            Some(o) => {
                let find = |level: &str| {
                    levels.iter().position(|l| l == level).ok_or_else(|| {
                        Error::Validation(format!(
                            "order names '{level}', which is not a level of '{name}' \
                             (levels: {})",
                            levels.join(", ")
                        ))
                    })
                };
                let a = find(&o.0)?;
                let b = find(&o.1)?;
                if a == b {
                    return Err(Error::Validation(format!(
                        "order must name two different levels, got '{}' twice",
                        o.0
                    )));
                }
                (Some([a as u32, b as u32]), Some(o.clone()))
            }
            None => {
                log::warn!(
                    "calculate: `order` not supplied for `{stat}`; using level order \"{}\" - \"{}\"",
                    levels[0],
                    levels[1]
                );
                (Some([0, 1]), Some(Order::new(levels[0].clone(), levels[1].clone())))
            }
        }
    } else {
        if order.is_some() {
            log::warn!("calculate: `order` is ignored for `{stat}` on a {signature}");
        }
        (None, None)
    };

    Ok(Resolved { stat, signature, order, entry, groups })
}

/// Compute `stat` on `specified`.
///
/// `order` names the minuend level first for two-group statistics; when omitted
/// the explanatory variable's level order is used and a warning names it.
///
/// # Errors
///
/// [`Error::IncompatibleStatistic`] when the statistic is not defined for the
/// declared roles, a required `success` level is missing, or the declared null
/// does not fit (`t` with an explanatory variable but no independence null).
/// [`Error::Validation`] when `order` names unknown or repeated levels.
pub fn calculate(specified: &Specified, stat: Stat, order: Option<&Order>) -> Result<Calculated> {
    let resolved = resolve(specified, stat, order)?;
    let value = resolved.compute(specified)?;
    if !value.is_finite() {
        log::warn!("calculate: `{stat}` is undefined for this dataset (value {value})");
    }
    Ok(Calculated {
        stat,
        signature: resolved.signature,
        order: resolved.order,
        value,
        dropped_rows: specified.dropped_rows(),
    })
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

fn numeric_response(s: &Specified) -> Result<&[f64]> {
    s.response().as_numeric().ok_or_else(|| {
        Error::IncompatibleStatistic(format!("response '{}' is not numeric", s.response().name()))
    })
}

fn categorical_response(s: &Specified) -> Result<(&[String], &[u32])> {
    s.response().as_categorical().ok_or_else(|| {
        Error::IncompatibleStatistic(format!(
            "response '{}' is not categorical",
            s.response().name()
        ))
    })
}

fn numeric_explanatory(s: &Specified) -> Result<&[f64]> {
    s.explanatory_var().and_then(|x| x.as_numeric()).ok_or_else(|| {
        Error::IncompatibleStatistic("a single numeric explanatory variable is required".into())
    })
}

fn categorical_explanatory(s: &Specified) -> Result<(&[String], &[u32])> {
    s.explanatory_var().and_then(|x| x.as_categorical()).ok_or_else(|| {
        Error::IncompatibleStatistic("a single categorical explanatory variable is required".into())
    })
}

fn success_code(s: &Specified) -> Result<u32> {
    s.success_index().map(|i| i as u32).ok_or_else(|| {
        Error::IncompatibleStatistic(format!(
            "no `success` level declared for response '{}'",
            s.response().name()
        ))
    })
}

/// Numeric response split into groups `A`, `B`.
fn numeric_groups(s: &Specified, r: &Resolved) -> Result<(Vec<f64>, Vec<f64>)> {
    let y = numeric_response(s)?;
    let (_, x) = categorical_explanatory(s)?;
    let [a, b] = r.groups()?;
    let mut ga = Vec::new();
    let mut gb = Vec::new();
    for (&v, &c) in y.iter().zip(x) {
        if c == a {
            ga.push(v);
        } else if c == b {
            gb.push(v);
        }
    }
    Ok((ga, gb))
}

/// `(successes, rows)` for groups `A`, `B`.
fn success_counts(s: &Specified, r: &Resolved) -> Result<[(f64, f64); 2]> {
    let (_, y) = categorical_response(s)?;
    let (_, x) = categorical_explanatory(s)?;
    let success = success_code(s)?;
    let [a, b] = r.groups()?;
    let mut out = [(0.0, 0.0); 2];
    for (&yc, &xc) in y.iter().zip(x) {
        let slot = if xc == a {
            &mut out[0]
        } else if xc == b {
            &mut out[1]
        } else {
            continue;
        };
        slot.1 += 1.0;
        if yc == success {
            slot.0 += 1.0;
        }
    }
    Ok(out)
}

fn level_counts(codes: &[u32], n_levels: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n_levels];
    for &c in codes {
        counts[c as usize] += 1.0;
    }
    counts
}

// ---------------------------------------------------------------------------
// One variable
// ---------------------------------------------------------------------------

fn stat_mean(s: &Specified, _: &Resolved) -> Result<f64> {
    Ok(mean(numeric_response(s)?))
}

fn stat_median(s: &Specified, _: &Resolved) -> Result<f64> {
    Ok(median(numeric_response(s)?))
}

fn stat_sum(s: &Specified, _: &Resolved) -> Result<f64> {
    Ok(sum(numeric_response(s)?))
}

fn stat_sd(s: &Specified, _: &Resolved) -> Result<f64> {
    Ok(std_dev(numeric_response(s)?))
}

fn stat_count(s: &Specified, _: &Resolved) -> Result<f64> {
    let (_, codes) = categorical_response(s)?;
    let success = success_code(s)?;
    Ok(codes.iter().filter(|&&c| c == success).count() as f64)
}

fn stat_prop(s: &Specified, r: &Resolved) -> Result<f64> {
    let n = s.n_rows();
    if n == 0 {
        return Ok(f64::NAN);
    }
    Ok(stat_count(s, r)? / n as f64)
}

fn stat_t_one_sample(s: &Specified, _: &Resolved) -> Result<f64> {
    let y = numeric_response(s)?;
    let mu = s.hypothesis().and_then(NullHypothesis::mu).unwrap_or(0.0);
    let se = std_dev(y) / (y.len() as f64).sqrt();
    Ok((mean(y) - mu) / se)
}

fn stat_z_one_sample(s: &Specified, r: &Resolved) -> Result<f64> {
    let p0 = s.hypothesis().and_then(NullHypothesis::p_scalar).ok_or_else(|| {
        Error::IncompatibleStatistic("one-sample `z` needs a point null on p".to_string())
    })?;
    let n = s.n_rows() as f64;
    let p_hat = stat_prop(s, r)?;
    Ok((p_hat - p0) / (p0 * (1.0 - p0) / n).sqrt())
}

// ---------------------------------------------------------------------------
// Two groups
// ---------------------------------------------------------------------------

fn stat_t_two_sample(s: &Specified, r: &Resolved) -> Result<f64> {
    let (a, b) = numeric_groups(s, r)?;
    let se = (variance(&a) / a.len() as f64 + variance(&b) / b.len() as f64).sqrt();
    Ok((mean(&a) - mean(&b)) / se)
}

fn stat_diff_in_means(s: &Specified, r: &Resolved) -> Result<f64> {
    let (a, b) = numeric_groups(s, r)?;
    Ok(mean(&a) - mean(&b))
}

fn stat_diff_in_medians(s: &Specified, r: &Resolved) -> Result<f64> {
    let (a, b) = numeric_groups(s, r)?;
    Ok(median(&a) - median(&b))
}

fn stat_ratio_of_means(s: &Specified, r: &Resolved) -> Result<f64> {
    let (a, b) = numeric_groups(s, r)?;
    Ok(mean(&a) / mean(&b))
}

fn stat_diff_in_props(s: &Specified, r: &Resolved) -> Result<f64> {
    let [(xa, na), (xb, nb)] = success_counts(s, r)?;
    Ok(xa / na - xb / nb)
}

fn stat_ratio_of_props(s: &Specified, r: &Resolved) -> Result<f64> {
    let [(xa, na), (xb, nb)] = success_counts(s, r)?;
    Ok((xa / na) / (xb / nb))
}

fn stat_odds_ratio(s: &Specified, r: &Resolved) -> Result<f64> {
    let [(xa, na), (xb, nb)] = success_counts(s, r)?;
    let (pa, pb) = (xa / na, xb / nb);
    Ok((pa / (1.0 - pa)) / (pb / (1.0 - pb)))
}

fn stat_z_two_sample(s: &Specified, r: &Resolved) -> Result<f64> {
    let [(xa, na), (xb, nb)] = success_counts(s, r)?;
    let pooled = (xa + xb) / (na + nb);
    let se = (pooled * (1.0 - pooled) * (1.0 / na + 1.0 / nb)).sqrt();
    Ok((xa / na - xb / nb) / se)
}

// ---------------------------------------------------------------------------
// Many groups / two numeric variables
// ---------------------------------------------------------------------------

fn stat_f(s: &Specified, _: &Resolved) -> Result<f64> {
    let y = numeric_response(s)?;
    let (levels, x) = categorical_explanatory(s)?;
    let k_all = levels.len();

    let mut sums = vec![0.0; k_all];
    let counts = level_counts(x, k_all);
    for (&v, &c) in y.iter().zip(x) {
        sums[c as usize] += v;
    }
    let grand = mean(y);
    let group_means: Vec<f64> =
        sums.iter().zip(&counts).map(|(s, &n)| if n > 0.0 { s / n } else { 0.0 }).collect();

    let ss_between: f64 = group_means
        .iter()
        .zip(&counts)
        .map(|(m, &n)| n * (m - grand) * (m - grand))
        .sum();
    let ss_within: f64 = y
        .iter()
        .zip(x)
        .map(|(&v, &c)| {
            let d = v - group_means[c as usize];
            d * d
        })
        .sum();

    let k = counts.iter().filter(|&&n| n > 0.0).count() as f64;
    let n = y.len() as f64;
    if k < 2.0 || n - k <= 0.0 {
        return Ok(f64::NAN);
    }
    Ok((ss_between / (k - 1.0)) / (ss_within / (n - k)))
}

fn pearson_chisq(observed: &[f64], expected: &[f64]) -> f64 {
    observed
        .iter()
        .zip(expected)
        .filter(|(_, e)| **e > 0.0)
        .map(|(o, e)| (o - e) * (o - e) / e)
        .sum()
}

fn stat_chisq_gof(s: &Specified, _: &Resolved) -> Result<f64> {
    let (levels, codes) = categorical_response(s)?;
    let n = codes.len() as f64;
    let observed = level_counts(codes, levels.len());
    let expected: Vec<f64> = match s.hypothesis().and_then(NullHypothesis::p_levels) {
        Some(p) => p.iter().map(|(_, v)| n * v).collect(),
        None => vec![n / levels.len() as f64; levels.len()],
    };
    Ok(pearson_chisq(&observed, &expected))
}

fn stat_chisq_independence(s: &Specified, _: &Resolved) -> Result<f64> {
    let (y_levels, y) = categorical_response(s)?;
    let (x_levels, x) = categorical_explanatory(s)?;
    let (r, c) = (y_levels.len(), x_levels.len());

    let mut table = vec![0.0; r * c];
    for (&yi, &xi) in y.iter().zip(x) {
        table[yi as usize * c + xi as usize] += 1.0;
    }
    let row: Vec<f64> = (0..r).map(|i| table[i * c..(i + 1) * c].iter().sum()).collect();
    let col: Vec<f64> = (0..c).map(|j| (0..r).map(|i| table[i * c + j]).sum()).collect();
    let n = y.len() as f64;

    let expected: Vec<f64> =
        (0..r * c).map(|idx| row[idx / c] * col[idx % c] / n).collect();
    Ok(pearson_chisq(&table, &expected))
}

fn centred_moments(x: &[f64], y: &[f64]) -> (f64, f64, f64) {
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    (sxy, sxx, syy)
}

fn stat_slope(s: &Specified, _: &Resolved) -> Result<f64> {
    let (sxy, sxx, _) = centred_moments(numeric_explanatory(s)?, numeric_response(s)?);
    Ok(if sxx > 0.0 { sxy / sxx } else { f64::NAN })
}

fn stat_correlation(s: &Specified, _: &Resolved) -> Result<f64> {
    let (sxy, sxx, syy) = centred_moments(numeric_explanatory(s)?, numeric_response(s)?);
    let denom = (sxx * syy).sqrt();
    Ok(if denom > 0.0 { sxy / denom } else { f64::NAN })
}
