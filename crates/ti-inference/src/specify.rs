//! Role declaration: which columns are the response and the explanatory variable(s).
//!
//! [`specify`] turns a [`Table`] plus [`Roles`] into a [`Specified`] dataset, the
//! value every later stage reads. Roles may be given directly or as a formula
//! `response ~ explanatory (+ explanatory ...)`; both forms resolve to the same
//! representation. Rows with a missing value in any role column are dropped
//! here, once, and the count is kept for diagnostics.

use crate::generate::ReplicateTag;
use crate::hypothesize::NullHypothesis;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use ti_core::{Column, Error, Result, Table};

const LOGICAL_LEVELS: [&str; 2] = ["FALSE", "TRUE"];

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// Values of one declared variable, free of missing entries.
#[derive(Debug, Clone, PartialEq)]
pub enum VarData {
    /// Real values.
    Numeric(Vec<f64>),
    /// Level codes into `levels`.
    Categorical {
        /// Ordered levels.
        levels: Vec<String>,
        /// Per-row level index.
        codes: Vec<u32>,
    },
}

/// A named variable taking part in the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    data: VarData,
}

impl Variable {
    pub(crate) fn new(name: impl Into<String>, data: VarData) -> Self {
        Self { name: name.into(), data }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values.
    pub fn data(&self) -> &VarData {
        &self.data
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match &self.data {
            VarData::Numeric(v) => v.len(),
            VarData::Categorical { codes, .. } => codes.len(),
        }
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the variable is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self.data, VarData::Numeric(_))
    }

    /// Numeric values, if numeric.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.data {
            VarData::Numeric(v) => Some(v),
            VarData::Categorical { .. } => None,
        }
    }

    /// Levels and codes, if categorical.
    pub fn as_categorical(&self) -> Option<(&[String], &[u32])> {
        match &self.data {
            VarData::Categorical { levels, codes } => Some((levels, codes)),
            VarData::Numeric(_) => None,
        }
    }

    /// Levels, if categorical.
    pub fn levels(&self) -> Option<&[String]> {
        self.as_categorical().map(|(l, _)| l)
    }

    /// Rows `idx` (in that order, repetition allowed) as a new variable.
    pub(crate) fn take_rows(&self, idx: &[usize]) -> Variable {
        let data = match &self.data {
            VarData::Numeric(v) => VarData::Numeric(idx.iter().map(|&i| v[i]).collect()),
            VarData::Categorical { levels, codes } => VarData::Categorical {
                levels: levels.clone(),
                codes: idx.iter().map(|&i| codes[i]).collect(),
            },
        };
        Variable { name: self.name.clone(), data }
    }

    /// Same name, replaced data.
    pub(crate) fn with_data(&self, data: VarData) -> Variable {
        Variable { name: self.name.clone(), data }
    }

    fn from_column(name: &str, column: &Column, rows: &[usize]) -> Self {
        let data = match column {
            Column::Numeric(v) => {
                VarData::Numeric(rows.iter().map(|&i| v[i].unwrap_or(f64::NAN)).collect())
            }
            Column::Categorical(f) => VarData::Categorical {
                levels: f.levels().to_vec(),
                codes: rows.iter().map(|&i| f.codes()[i].unwrap_or_default()).collect(),
            },
            Column::Logical(v) => VarData::Categorical {
                levels: LOGICAL_LEVELS.iter().map(|s| s.to_string()).collect(),
                codes: rows.iter().map(|&i| u32::from(v[i].unwrap_or_default())).collect(),
            },
        };
        Variable::new(name, data)
    }
}

// ---------------------------------------------------------------------------
// Roles and formulas
// ---------------------------------------------------------------------------

/// A parsed `response ~ explanatory + ...` formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    /// Left-hand side.
    pub response: String,
    /// Right-hand side terms, in order. Empty for `y ~ NULL` / `y ~ 1`.
    pub explanatory: Vec<String>,
}

impl FromStr for Formula {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('~');
        let (lhs, rhs) = match (parts.next(), parts.next(), parts.next()) {
            (Some(l), Some(r), None) => (l.trim(), r.trim()),
            _ => {
                return Err(Error::InvalidRole(format!(
                    "formula '{s}' must contain exactly one '~'"
                )));
            }
        };
        if lhs.is_empty() {
            return Err(Error::InvalidRole(format!("formula '{s}' has no response")));
        }
        let explanatory = if rhs.is_empty() || rhs == "NULL" || rhs == "1" {
            Vec::new()
        } else {
            rhs.split('+')
                .map(|t| {
                    let t = t.trim();
                    if t.is_empty() {
                        Err(Error::InvalidRole(format!("formula '{s}' has an empty term")))
                    } else {
                        Ok(t.to_string())
                    }
                })
                .collect::<Result<Vec<_>>>()?
        };
        Ok(Formula { response: lhs.to_string(), explanatory })
    }
}

/// Caller-supplied role declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Roles {
    /// Response column.
    pub response: Option<String>,
    /// Explanatory column(s).
    pub explanatory: Vec<String>,
    /// Formula form, `response ~ explanatory`.
    pub formula: Option<String>,
    /// Level of a categorical response counted as a success.
    pub success: Option<String>,
    /// The response is an already-computed paired difference.
    pub paired: bool,
}

impl Roles {
    /// Declare a response only.
    pub fn response(name: impl Into<String>) -> Self {
        Self { response: Some(name.into()), ..Self::default() }
    }

    /// Declare roles with a formula.
    pub fn formula(formula: impl Into<String>) -> Self {
        Self { formula: Some(formula.into()), ..Self::default() }
    }

    /// Add an explanatory column.
    pub fn with_explanatory(mut self, name: impl Into<String>) -> Self {
        self.explanatory.push(name.into());
        self
    }

    /// Set the success level.
    pub fn with_success(mut self, level: impl Into<String>) -> Self {
        self.success = Some(level.into());
        self
    }

    /// Mark the response as a paired difference.
    pub fn paired(mut self) -> Self {
        self.paired = true;
        self
    }

    fn resolve(&self) -> Result<(String, Vec<String>)> {
        let formula = self.formula.as_deref().map(Formula::from_str).transpose()?;
        match (formula, &self.response) {
            (None, None) => Err(Error::InvalidRole("no response variable declared".to_string())),
            (None, Some(r)) => Ok((r.clone(), self.explanatory.clone())),
            (Some(f), None) if self.explanatory.is_empty() => Ok((f.response, f.explanatory)),
            (Some(f), direct) => {
                // Both forms given: accept only if they agree.
                let same_response = direct.as_ref().is_none_or(|r| *r == f.response);
                let same_explanatory =
                    self.explanatory.is_empty() || self.explanatory == f.explanatory;
                if same_response && same_explanatory {
                    Ok((f.response, f.explanatory))
                } else {
                    Err(Error::InvalidRole(format!(
                        "formula '{}' conflicts with response/explanatory arguments",
                        self.formula.as_deref().unwrap_or_default()
                    )))
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Role signature
// ---------------------------------------------------------------------------

/// Variable-role combination of a specified dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleSignature {
    /// One numeric response.
    Numeric,
    /// One numeric response holding paired differences.
    Paired,
    /// One categorical response.
    Categorical,
    /// Numeric response, numeric explanatory.
    NumericByNumeric,
    /// Numeric response, categorical explanatory.
    NumericByCategorical,
    /// Categorical response, categorical explanatory.
    CategoricalByCategorical,
    /// Categorical response, numeric explanatory.
    CategoricalByNumeric,
    /// More than one explanatory variable.
    MultipleExplanatory,
}

impl std::fmt::Display for RoleSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RoleSignature::Numeric => "numeric response",
            RoleSignature::Paired => "paired numeric response",
            RoleSignature::Categorical => "categorical response",
            RoleSignature::NumericByNumeric => "numeric response ~ numeric explanatory",
            RoleSignature::NumericByCategorical => "numeric response ~ categorical explanatory",
            RoleSignature::CategoricalByCategorical => {
                "categorical response ~ categorical explanatory"
            }
            RoleSignature::CategoricalByNumeric => "categorical response ~ numeric explanatory",
            RoleSignature::MultipleExplanatory => "multiple explanatory variables",
        })
    }
}

// ---------------------------------------------------------------------------
// Specified dataset
// ---------------------------------------------------------------------------

/// A dataset annotated with declared roles, and optionally a null hypothesis
/// and a replicate tag.
///
/// Values are immutable: every stage returns a new `Specified`. Columns are
/// shared through `Arc`, so annotating or permuting one column never copies
/// the others.
#[derive(Debug, Clone)]
pub struct Specified {
    pub(crate) response: Arc<Variable>,
    pub(crate) explanatory: Vec<Arc<Variable>>,
    pub(crate) success: Option<String>,
    pub(crate) paired: bool,
    pub(crate) hypothesis: Option<NullHypothesis>,
    pub(crate) replicate: Option<ReplicateTag>,
    pub(crate) dropped_rows: usize,
}

impl Specified {
    /// Response variable.
    pub fn response(&self) -> &Variable {
        &self.response
    }

    /// All explanatory variables.
    pub fn explanatory(&self) -> impl Iterator<Item = &Variable> {
        self.explanatory.iter().map(|v| v.as_ref())
    }

    /// The single explanatory variable, if exactly one is declared.
    pub fn explanatory_var(&self) -> Option<&Variable> {
        match self.explanatory.as_slice() {
            [x] => Some(x),
            _ => None,
        }
    }

    /// Whether any explanatory variable is declared.
    pub fn has_explanatory(&self) -> bool {
        !self.explanatory.is_empty()
    }

    /// Success level, if declared.
    pub fn success(&self) -> Option<&str> {
        self.success.as_deref()
    }

    /// Index of the success level among the response levels.
    pub fn success_index(&self) -> Option<usize> {
        let levels = self.response.levels()?;
        let s = self.success.as_deref()?;
        levels.iter().position(|l| l == s)
    }

    /// Whether the response is flagged as a paired difference.
    pub fn is_paired(&self) -> bool {
        self.paired
    }

    /// Declared null hypothesis, if any.
    pub fn hypothesis(&self) -> Option<&NullHypothesis> {
        self.hypothesis.as_ref()
    }

    /// Replicate tag, if this dataset was produced by the generator.
    pub fn replicate(&self) -> Option<&ReplicateTag> {
        self.replicate.as_ref()
    }

    /// Rows removed at specification time because of missing values.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.response.len()
    }

    /// Variable-role combination.
    pub fn signature(&self) -> RoleSignature {
        let response_numeric = self.response.is_numeric();
        match self.explanatory.as_slice() {
            [] if response_numeric => {
                let paired_null = matches!(self.hypothesis, Some(NullHypothesis::PairedIndependence));
                if self.paired || paired_null {
                    RoleSignature::Paired
                } else {
                    RoleSignature::Numeric
                }
            }
            [] => RoleSignature::Categorical,
            [x] => match (response_numeric, x.is_numeric()) {
                (true, true) => RoleSignature::NumericByNumeric,
                (true, false) => RoleSignature::NumericByCategorical,
                (false, true) => RoleSignature::CategoricalByNumeric,
                (false, false) => RoleSignature::CategoricalByCategorical,
            },
            _ => RoleSignature::MultipleExplanatory,
        }
    }

    /// Attach a validated null hypothesis (see [`crate::hypothesize`]).
    pub(crate) fn with_hypothesis(mut self, hypothesis: NullHypothesis) -> Self {
        self.hypothesis = Some(hypothesis);
        self
    }
}

/// Declare roles on a table.
///
/// # Errors
///
/// [`Error::InvalidRole`] when a column does not exist, no response is declared,
/// the formula and direct arguments conflict, a column is used twice, `success`
/// is set on a numeric response or is not one of its levels, or `paired` is set
/// with an explanatory variable or a non-numeric response.
/// [`Error::Validation`] when no complete row remains.
pub fn specify(table: &Table, roles: &Roles) -> Result<Specified> {
    let (response_name, explanatory_names) = roles.resolve()?;

    let lookup = |name: &str| {
        table.column(name).ok_or_else(|| {
            let known: Vec<&str> = table.names().collect();
            Error::InvalidRole(format!(
                "column '{name}' not found; available columns: {}",
                known.join(", ")
            ))
        })
    };
    let response_col = lookup(&response_name)?;
    let explanatory_cols =
        explanatory_names.iter().map(|n| lookup(n)).collect::<Result<Vec<_>>>()?;

    for (i, name) in explanatory_names.iter().enumerate() {
        if *name == response_name {
            return Err(Error::InvalidRole(format!(
                "column '{name}' cannot be both response and explanatory"
            )));
        }
        if explanatory_names[..i].contains(name) {
            return Err(Error::InvalidRole(format!(
                "explanatory column '{name}' is declared twice"
            )));
        }
    }

    if roles.paired {
        if !explanatory_names.is_empty() {
            return Err(Error::InvalidRole(
                "a paired response must be declared without an explanatory variable".to_string(),
            ));
        }
        if !matches!(response_col, Column::Numeric(_)) {
            return Err(Error::InvalidRole(format!(
                "paired response '{response_name}' must be numeric, got {}",
                response_col.kind()
            )));
        }
    }

    let n_total = table.n_rows();
    let rows: Vec<usize> = (0..n_total)
        .filter(|&i| {
            !response_col.is_missing(i) && explanatory_cols.iter().all(|c| !c.is_missing(i))
        })
        .collect();
    let dropped_rows = n_total - rows.len();
    if dropped_rows > 0 {
        log::warn!(
            "specify: removed {dropped_rows} of {n_total} rows with missing values in '{}'",
            std::iter::once(&response_name)
                .chain(explanatory_names.iter())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("', '")
        );
    }
    if rows.is_empty() {
        return Err(Error::Validation(format!(
            "no complete rows for response '{response_name}'"
        )));
    }

    let response = Variable::from_column(&response_name, response_col, &rows);
    if let Some(success) = &roles.success {
        match response.levels() {
            None => {
                return Err(Error::InvalidRole(format!(
                    "success level '{success}' given for numeric response '{response_name}'"
                )));
            }
            Some(levels) if !levels.contains(success) => {
                return Err(Error::InvalidRole(format!(
                    "success level '{success}' is not a level of '{response_name}' (levels: {})",
                    levels.join(", ")
                )));
            }
            Some(_) => {}
        }
    }

    let explanatory = explanatory_names
        .iter()
        .zip(&explanatory_cols)
        .map(|(name, col)| Arc::new(Variable::from_column(name, col, &rows)))
        .collect();

    Ok(Specified {
        response: Arc::new(response),
        explanatory,
        success: roles.success.clone(),
        paired: roles.paired,
        hypothesis: None,
        replicate: None,
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ti_core::Factor;

    fn table() -> Table {
        Table::new()
            .with_column("y", Column::Numeric(vec![Some(1.0), Some(2.0), None, Some(4.0)]))
            .unwrap()
            .with_column("g", Column::categorical(["b", "a", "a", "b"]))
            .unwrap()
            .with_column("ok", Column::logical([true, false, true, true]))
            .unwrap()
    }

    #[test]
    fn test_formula_parse() {
        let f: Formula = "y ~ g + h".parse().unwrap();
        assert_eq!(f.response, "y");
        assert_eq!(f.explanatory, vec!["g", "h"]);

        let f: Formula = " y ~ NULL ".parse().unwrap();
        assert!(f.explanatory.is_empty());

        assert!("y".parse::<Formula>().is_err());
        assert!("~ g".parse::<Formula>().is_err());
        assert!("y ~ g ~ h".parse::<Formula>().is_err());
        assert!("y ~ g +".parse::<Formula>().is_err());
    }

    #[test]
    fn test_formula_and_direct_agree() {
        let t = table();
        let a = specify(&t, &Roles::response("y").with_explanatory("g")).unwrap();
        let b = specify(&t, &Roles::formula("y ~ g")).unwrap();
        assert_eq!(a.response(), b.response());
        assert_eq!(a.explanatory_var(), b.explanatory_var());
        assert_eq!(a.signature(), RoleSignature::NumericByCategorical);

        let mut both = Roles::formula("y ~ g");
        both.response = Some("y".into());
        assert!(specify(&t, &both).is_ok());

        let mut conflict = Roles::formula("y ~ g");
        conflict.response = Some("ok".into());
        assert!(matches!(specify(&t, &conflict), Err(Error::InvalidRole(_))));
    }

    #[test]
    fn test_missing_rows_dropped() {
        let s = specify(&table(), &Roles::formula("y ~ g")).unwrap();
        assert_eq!(s.n_rows(), 3);
        assert_eq!(s.dropped_rows(), 1);
        assert_eq!(s.response().as_numeric().unwrap(), &[1.0, 2.0, 4.0]);
        let (levels, codes) = s.explanatory_var().unwrap().as_categorical().unwrap();
        assert_eq!(levels, &["a", "b"]);
        assert_eq!(codes, &[1, 0, 1]);
    }

    #[test]
    fn test_unknown_column() {
        let err = specify(&table(), &Roles::formula("y ~ nope")).unwrap_err();
        assert!(matches!(err, Error::InvalidRole(ref m) if m.contains("nope")));
        assert!(matches!(specify(&table(), &Roles::default()), Err(Error::InvalidRole(_))));
    }

    #[test]
    fn test_same_column_twice() {
        assert!(specify(&table(), &Roles::formula("y ~ y")).is_err());
        assert!(specify(&table(), &Roles::formula("y ~ g + g")).is_err());
    }

    #[test]
    fn test_success_validation() {
        let t = table();
        let s = specify(&t, &Roles::response("ok").with_success("TRUE")).unwrap();
        assert_eq!(s.signature(), RoleSignature::Categorical);
        assert_eq!(s.success_index(), Some(1));

        assert!(specify(&t, &Roles::response("ok").with_success("yes")).is_err());
        assert!(specify(&t, &Roles::response("y").with_success("TRUE")).is_err());
    }

    #[test]
    fn test_paired_rules() {
        let t = table();
        let s = specify(&t, &Roles::response("y").paired()).unwrap();
        assert_eq!(s.signature(), RoleSignature::Paired);
        assert!(specify(&t, &Roles::formula("y ~ g").paired()).is_err());
        assert!(specify(&t, &Roles::response("g").paired()).is_err());
    }

    #[test]
    fn test_explicit_levels_kept() {
        let t = Table::new()
            .with_column("y", Column::numeric([1.0, 2.0]))
            .unwrap()
            .with_column(
                "g",
                Column::Categorical(
                    Factor::with_levels(["ctrl", "trt"].map(Some), ["trt", "ctrl"]).unwrap(),
                ),
            )
            .unwrap();
        let s = specify(&t, &Roles::formula("y ~ g")).unwrap();
        assert_eq!(s.explanatory_var().unwrap().levels().unwrap(), &["trt", "ctrl"]);
    }
}
