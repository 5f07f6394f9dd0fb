//! Null hypothesis declaration and validation.
//!
//! Validation runs in a fixed order and reports the first violated rule:
//! 1. exactly one null type,
//! 2. role compatibility of that type,
//! 3. parameter arity (point: exactly one of `p`/`mu`/`med`/`sigma`; otherwise none,
//!    and extra parameters only warn),
//! 4. parameter/variable compatibility and numeric validity.

use crate::specify::Specified;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ti_core::{Error, Result};

/// Tolerance on `|sum(p) - 1|` for a per-level proportion vector.
pub const P_SUM_TOLERANCE: f64 = f64::EPSILON;

/// Kind of null hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullType {
    /// A single population parameter has a given value.
    Point,
    /// Response and explanatory variables are independent.
    Independence,
    /// A paired difference is centred at zero.
    #[serde(alias = "paired independence")]
    PairedIndependence,
}

impl NullType {
    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            NullType::Point => "point",
            NullType::Independence => "independence",
            NullType::PairedIndependence => "paired independence",
        }
    }
}

impl std::fmt::Display for NullType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NullType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "point" => Ok(NullType::Point),
            "independence" => Ok(NullType::Independence),
            "paired independence" | "paired_independence" => Ok(NullType::PairedIndependence),
            other => Err(Error::InvalidNull(format!(
                "unknown null type '{other}'; expected point, independence or paired independence"
            ))),
        }
    }
}

/// Hypothesized proportion: a single success probability, or one per level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProportionParam {
    /// Probability of the declared success level.
    Scalar(f64),
    /// `(level, probability)` pairs covering every response level.
    Levels(Vec<(String, f64)>),
}

impl From<f64> for ProportionParam {
    fn from(p: f64) -> Self {
        ProportionParam::Scalar(p)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ProportionParam {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        ProportionParam::Levels(iter.into_iter().map(|(l, p)| (l.into(), p)).collect())
    }
}

/// Unvalidated null-hypothesis arguments, as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesisArgs {
    /// Null type(s); exactly one is valid.
    pub null: Vec<NullType>,
    /// Hypothesized proportion(s).
    pub p: Option<ProportionParam>,
    /// Hypothesized mean.
    pub mu: Option<f64>,
    /// Hypothesized median.
    pub med: Option<f64>,
    /// Hypothesized standard deviation.
    pub sigma: Option<f64>,
}

impl HypothesisArgs {
    /// Arguments for a null of the given type, without parameters.
    pub fn new(null: NullType) -> Self {
        Self { null: vec![null], ..Self::default() }
    }

    /// Point null.
    pub fn point() -> Self {
        Self::new(NullType::Point)
    }

    /// Independence null.
    pub fn independence() -> Self {
        Self::new(NullType::Independence)
    }

    /// Paired independence null.
    pub fn paired_independence() -> Self {
        Self::new(NullType::PairedIndependence)
    }

    /// Set `p`.
    pub fn with_p(mut self, p: impl Into<ProportionParam>) -> Self {
        self.p = Some(p.into());
        self
    }

    /// Set `mu`.
    pub fn with_mu(mut self, mu: f64) -> Self {
        self.mu = Some(mu);
        self
    }

    /// Set `med`.
    pub fn with_med(mut self, med: f64) -> Self {
        self.med = Some(med);
        self
    }

    /// Set `sigma`.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(sigma);
        self
    }

    fn supplied(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.p.is_some() {
            out.push("p");
        }
        if self.mu.is_some() {
            out.push("mu");
        }
        if self.med.is_some() {
            out.push("med");
        }
        if self.sigma.is_some() {
            out.push("sigma");
        }
        out
    }
}

/// Validated point-null parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointParam {
    /// `p`; a `Levels` vector is stored in response-level order.
    Proportion(ProportionParam),
    /// `mu`.
    Mean(f64),
    /// `med`.
    Median(f64),
    /// `sigma`.
    StdDev(f64),
}

impl PointParam {
    /// Parameter name as written by the caller.
    pub fn name(&self) -> &'static str {
        match self {
            PointParam::Proportion(_) => "p",
            PointParam::Mean(_) => "mu",
            PointParam::Median(_) => "med",
            PointParam::StdDev(_) => "sigma",
        }
    }
}

/// Validated null hypothesis, attached to a [`Specified`] dataset and to
/// every replicate generated from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullHypothesis {
    /// Point null with its parameter.
    Point(PointParam),
    /// Independence of response and explanatory.
    Independence,
    /// Paired difference centred at zero.
    PairedIndependence,
}

impl NullHypothesis {
    /// Validate `args` against `specified`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidNull`] for structural and compatibility violations,
    /// [`Error::Validation`] for out-of-range parameter values.
    pub fn declare(specified: &Specified, args: &HypothesisArgs) -> Result<Self> {
        // (1) exactly one null type
        let null = match args.null.as_slice() {
            [t] => *t,
            [] => {
                return Err(Error::InvalidNull(
                    "no null type supplied; give exactly one of point, independence, \
                     paired independence"
                        .to_string(),
                ));
            }
            many => {
                return Err(Error::InvalidNull(format!(
                    "exactly one null type may be supplied, got {}",
                    many.len()
                )));
            }
        };
        if specified.hypothesis().is_some() {
            return Err(Error::InvalidNull("a null hypothesis is already declared".to_string()));
        }
        if specified.replicate().is_some() {
            return Err(Error::InvalidNull(
                "cannot declare a null on a generated replicate".to_string(),
            ));
        }

        // (2) role compatibility
        let response = specified.response();
        match null {
            NullType::Point if specified.has_explanatory() => {
                return Err(Error::InvalidNull(
                    "a point null applies to a response alone; remove the explanatory variable"
                        .to_string(),
                ));
            }
            NullType::Independence if !specified.has_explanatory() => {
                return Err(Error::InvalidNull(format!(
                    "an independence null needs an explanatory variable for response '{}'",
                    response.name()
                )));
            }
            NullType::PairedIndependence if specified.has_explanatory() => {
                return Err(Error::InvalidNull(
                    "a paired independence null takes only a response (the paired difference)"
                        .to_string(),
                ));
            }
            NullType::PairedIndependence if !response.is_numeric() => {
                return Err(Error::InvalidNull(format!(
                    "paired difference '{}' must be numeric",
                    response.name()
                )));
            }
            _ => {}
        }

        // (3) arity
        let supplied = args.supplied();
        match null {
            NullType::Point if supplied.len() != 1 => {
                return Err(Error::InvalidNull(format!(
                    "a point null needs exactly one of p, mu, med, sigma; got {}",
                    if supplied.is_empty() { "none".to_string() } else { supplied.join(", ") }
                )));
            }
            NullType::Point => {}
            NullType::Independence | NullType::PairedIndependence => {
                if !supplied.is_empty() {
                    log::warn!(
                        "hypothesize: parameter(s) {} ignored for a {null} null",
                        supplied.join(", ")
                    );
                }
                return Ok(match null {
                    NullType::Independence => NullHypothesis::Independence,
                    _ => NullHypothesis::PairedIndependence,
                });
            }
        }

        // (4) compatibility and values
        let param = match (&args.p, args.mu, args.med, args.sigma) {
            (Some(p), ..) => PointParam::Proportion(validate_p(specified, p)?),
            (None, Some(mu), ..) => PointParam::Mean(validate_location(specified, "mu", mu)?),
            (None, None, Some(med), _) => {
                PointParam::Median(validate_location(specified, "med", med)?)
            }
            (None, None, None, Some(sigma)) => {
                let sigma = validate_location(specified, "sigma", sigma)?;
                if sigma <= 0.0 {
                    return Err(Error::Validation(format!("sigma must be > 0, got {sigma}")));
                }
                PointParam::StdDev(sigma)
            }
            (None, None, None, None) => {
                return Err(Error::InvalidNull("a point null needs a parameter".to_string()));
            }
        };
        Ok(NullHypothesis::Point(param))
    }

    /// Null type.
    pub fn null_type(&self) -> NullType {
        match self {
            NullHypothesis::Point(_) => NullType::Point,
            NullHypothesis::Independence => NullType::Independence,
            NullHypothesis::PairedIndependence => NullType::PairedIndependence,
        }
    }

    /// Point parameter, if any.
    pub fn param(&self) -> Option<&PointParam> {
        match self {
            NullHypothesis::Point(p) => Some(p),
            _ => None,
        }
    }

    /// Hypothesized mean, if this is a point null on `mu`.
    pub fn mu(&self) -> Option<f64> {
        match self {
            NullHypothesis::Point(PointParam::Mean(mu)) => Some(*mu),
            _ => None,
        }
    }

    /// Hypothesized success probability, if this is a point null on a scalar `p`.
    pub fn p_scalar(&self) -> Option<f64> {
        match self {
            NullHypothesis::Point(PointParam::Proportion(ProportionParam::Scalar(p))) => Some(*p),
            _ => None,
        }
    }

    /// Hypothesized per-level probabilities, in response-level order.
    pub fn p_levels(&self) -> Option<&[(String, f64)]> {
        match self {
            NullHypothesis::Point(PointParam::Proportion(ProportionParam::Levels(v))) => Some(v),
            _ => None,
        }
    }
}

fn validate_location(specified: &Specified, name: &str, value: f64) -> Result<f64> {
    let response = specified.response();
    if !response.is_numeric() {
        return Err(Error::InvalidNull(format!(
            "{name} requires a numeric response, '{}' is categorical",
            response.name()
        )));
    }
    if !value.is_finite() {
        return Err(Error::Validation(format!("{name} must be finite, got {value}")));
    }
    Ok(value)
}

fn validate_p(specified: &Specified, p: &ProportionParam) -> Result<ProportionParam> {
    let response = specified.response();
    let Some(levels) = response.levels() else {
        return Err(Error::InvalidNull(format!(
            "p requires a categorical response, '{}' is numeric",
            response.name()
        )));
    };

    match p {
        ProportionParam::Scalar(v) => {
            if specified.success().is_none() {
                return Err(Error::InvalidNull(format!(
                    "a scalar p needs a declared success level for '{}'",
                    response.name()
                )));
            }
            if !(v.is_finite() && (0.0..=1.0).contains(v)) {
                return Err(Error::Validation(format!("p must be in [0, 1], got {v}")));
            }
            Ok(ProportionParam::Scalar(*v))
        }
        ProportionParam::Levels(pairs) => {
            for (level, v) in pairs {
                if !(v.is_finite() && (0.0..=1.0).contains(v)) {
                    return Err(Error::Validation(format!(
                        "p for level '{level}' must be a finite value in [0, 1], got {v}"
                    )));
                }
            }
            for (i, (level, _)) in pairs.iter().enumerate() {
                if pairs[..i].iter().any(|(l, _)| l == level) {
                    return Err(Error::Validation(format!("p names level '{level}' twice")));
                }
                if !levels.contains(level) {
                    return Err(Error::Validation(format!(
                        "p names '{level}', which is not a level of '{}'",
                        response.name()
                    )));
                }
            }
            if let Some(missing) = levels.iter().find(|l| !pairs.iter().any(|(n, _)| n == *l)) {
                return Err(Error::Validation(format!(
                    "p has no value for level '{missing}' of '{}'",
                    response.name()
                )));
            }
            let total: f64 = pairs.iter().map(|(_, v)| v).sum();
            if (total - 1.0).abs() > P_SUM_TOLERANCE {
                return Err(Error::Validation(format!("p values must sum to 1, got {total}")));
            }
            // Store in response-level order so draws and expected counts line up.
            let ordered = levels
                .iter()
                .map(|l| {
                    let v = pairs.iter().find(|(n, _)| n == l).map_or(0.0, |(_, v)| *v);
                    (l.clone(), v)
                })
                .collect();
            Ok(ProportionParam::Levels(ordered))
        }
    }
}

/// Declare a null hypothesis and attach it to `specified`.
pub fn hypothesize(specified: Specified, args: &HypothesisArgs) -> Result<Specified> {
    let hypothesis = NullHypothesis::declare(&specified, args)?;
    Ok(specified.with_hypothesis(hypothesis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specify::{Roles, specify};
    use ti_core::{Column, Table};

    fn table() -> Table {
        Table::new()
            .with_column("y", Column::numeric([1.0, 2.0, 3.0, 4.0]))
            .unwrap()
            .with_column("g", Column::categorical(["a", "b", "a", "b"]))
            .unwrap()
            .with_column("k", Column::categorical(["x", "y", "z", "x"]))
            .unwrap()
    }

    fn prepared(roles: Roles) -> Specified {
        specify(&table(), &roles).unwrap()
    }

    #[test]
    fn test_type_count_checked_first() {
        let s = prepared(Roles::response("y"));
        let mut args = HypothesisArgs::point().with_mu(1.0).with_med(2.0);
        args.null.push(NullType::Independence);
        let err = NullHypothesis::declare(&s, &args).unwrap_err();
        assert!(matches!(err, Error::InvalidNull(ref m) if m.contains("exactly one null type")));

        let err = NullHypothesis::declare(&s, &HypothesisArgs::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidNull(_)));
    }

    #[test]
    fn test_point_arity() {
        let s = prepared(Roles::response("y"));
        let err =
            NullHypothesis::declare(&s, &HypothesisArgs::point().with_mu(1.0).with_med(2.0))
                .unwrap_err();
        assert!(matches!(err, Error::InvalidNull(ref m) if m.contains("mu, med")));
        assert!(NullHypothesis::declare(&s, &HypothesisArgs::point()).is_err());
    }

    #[test]
    fn test_point_param_compat() {
        let num = prepared(Roles::response("y"));
        let cat = prepared(Roles::response("g").with_success("a"));
        assert!(NullHypothesis::declare(&num, &HypothesisArgs::point().with_p(0.5)).is_err());
        assert!(NullHypothesis::declare(&cat, &HypothesisArgs::point().with_mu(0.5)).is_err());
        assert!(NullHypothesis::declare(&num, &HypothesisArgs::point().with_sigma(0.0)).is_err());
        assert!(NullHypothesis::declare(&num, &HypothesisArgs::point().with_mu(f64::NAN)).is_err());

        let h = NullHypothesis::declare(&cat, &HypothesisArgs::point().with_p(0.3)).unwrap();
        assert_eq!(h.p_scalar(), Some(0.3));
        assert!(NullHypothesis::declare(&cat, &HypothesisArgs::point().with_p(1.3)).is_err());

        let no_success = prepared(Roles::response("g"));
        assert!(NullHypothesis::declare(&no_success, &HypothesisArgs::point().with_p(0.3)).is_err());
    }

    #[test]
    fn test_point_with_explanatory_rejected() {
        let s = prepared(Roles::formula("y ~ g"));
        assert!(NullHypothesis::declare(&s, &HypothesisArgs::point().with_mu(0.0)).is_err());
    }

    #[test]
    fn test_independence_roles_and_warning() {
        let s = prepared(Roles::formula("y ~ g"));
        let h =
            NullHypothesis::declare(&s, &HypothesisArgs::independence().with_mu(3.0)).unwrap();
        assert_eq!(h, NullHypothesis::Independence);

        let alone = prepared(Roles::response("y"));
        assert!(NullHypothesis::declare(&alone, &HypothesisArgs::independence()).is_err());
    }

    #[test]
    fn test_paired_roles() {
        let s = prepared(Roles::response("y"));
        let h = NullHypothesis::declare(&s, &HypothesisArgs::paired_independence()).unwrap();
        assert_eq!(h.null_type(), NullType::PairedIndependence);

        let two = prepared(Roles::formula("y ~ g"));
        assert!(NullHypothesis::declare(&two, &HypothesisArgs::paired_independence()).is_err());
    }

    #[test]
    fn test_p_vector_sum_tolerance() {
        let s = prepared(Roles::response("g"));
        let eps = f64::EPSILON;
        let ok_hi: ProportionParam = [("a", 0.5), ("b", 0.5 + eps)].into_iter().collect();
        let ok_lo: ProportionParam = [("a", 0.5), ("b", 0.5 - eps)].into_iter().collect();
        let bad: ProportionParam = [("a", 0.5), ("b", 0.5 + 3.0 * eps)].into_iter().collect();
        assert!(NullHypothesis::declare(&s, &HypothesisArgs::point().with_p(ok_hi)).is_ok());
        assert!(NullHypothesis::declare(&s, &HypothesisArgs::point().with_p(ok_lo)).is_ok());
        let err = NullHypothesis::declare(&s, &HypothesisArgs::point().with_p(bad)).unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("sum to 1")));
    }

    #[test]
    fn test_p_vector_levels() {
        let s = prepared(Roles::response("k"));
        let reordered: ProportionParam =
            [("z", 0.2), ("x", 0.5), ("y", 0.3)].into_iter().collect();
        let h = NullHypothesis::declare(&s, &HypothesisArgs::point().with_p(reordered)).unwrap();
        let levels: Vec<&str> = h.p_levels().unwrap().iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(levels, ["x", "y", "z"]);

        let missing: ProportionParam = [("x", 0.5), ("y", 0.5)].into_iter().collect();
        assert!(NullHypothesis::declare(&s, &HypothesisArgs::point().with_p(missing)).is_err());
        let unknown: ProportionParam =
            [("x", 0.5), ("y", 0.25), ("w", 0.25)].into_iter().collect();
        assert!(NullHypothesis::declare(&s, &HypothesisArgs::point().with_p(unknown)).is_err());
        let nan: ProportionParam =
            [("x", f64::NAN), ("y", 0.5), ("z", 0.5)].into_iter().collect();
        assert!(NullHypothesis::declare(&s, &HypothesisArgs::point().with_p(nan)).is_err());
    }

    #[test]
    fn test_hypothesize_once() {
        let s = prepared(Roles::response("y"));
        let s = hypothesize(s, &HypothesisArgs::point().with_mu(2.0)).unwrap();
        assert_eq!(s.hypothesis().and_then(NullHypothesis::mu), Some(2.0));
        assert!(hypothesize(s, &HypothesisArgs::point().with_mu(1.0)).is_err());
    }

    #[test]
    fn test_null_type_parse() {
        assert_eq!("paired independence".parse::<NullType>().unwrap(), NullType::PairedIndependence);
        assert!("pointy".parse::<NullType>().is_err());
    }
}
