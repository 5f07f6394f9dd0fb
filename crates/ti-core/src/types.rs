//! Tabular data types for tidyinfer
//!
//! A [`Table`] is an ordered collection of named, equal-length [`Column`]s.
//! Missing values are represented as `None` in every column kind.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Categorical column: integer codes into an ordered list of levels.
///
/// The level order is the "natural" order used whenever a caller does not
/// supply an explicit subtraction order. Levels inferred from values are
/// sorted lexicographically; [`Factor::with_levels`] keeps the order given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FactorRepr", into = "FactorRepr")]
pub struct Factor {
    levels: Vec<String>,
    codes: Vec<Option<u32>>,
}

#[derive(Serialize, Deserialize)]
struct FactorRepr {
    #[serde(default)]
    levels: Option<Vec<String>>,
    values: Vec<Option<String>>,
}

impl TryFrom<FactorRepr> for Factor {
    type Error = Error;

    fn try_from(repr: FactorRepr) -> Result<Self> {
        match repr.levels {
            Some(levels) => Factor::with_levels(repr.values, levels),
            None => Ok(Factor::new(repr.values)),
        }
    }
}

impl From<Factor> for FactorRepr {
    fn from(f: Factor) -> Self {
        let values = (0..f.len()).map(|i| f.get(i).map(str::to_string)).collect();
        FactorRepr { levels: Some(f.levels), values }
    }
}

impl Factor {
    /// Build a factor from optional values, inferring lexicographically sorted levels.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let raw: Vec<Option<String>> =
            values.into_iter().map(|v| v.map(|s| s.as_ref().to_string())).collect();
        let mut levels: Vec<String> = raw.iter().flatten().cloned().collect();
        levels.sort();
        levels.dedup();
        let codes = raw
            .iter()
            .map(|v| {
                v.as_ref().map(|s| {
                    // Present by construction.
                    levels.binary_search(s).unwrap_or_default() as u32
                })
            })
            .collect();
        Self { levels, codes }
    }

    /// Build a factor with an explicit level order.
    ///
    /// Every non-missing value must be one of `levels`; levels must be unique.
    pub fn with_levels<I, S, L>(values: I, levels: L) -> Result<Self>
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        let levels: Vec<String> = levels.into_iter().map(Into::into).collect();
        for (i, l) in levels.iter().enumerate() {
            if levels[..i].contains(l) {
                return Err(Error::Validation(format!("duplicate factor level '{l}'")));
            }
        }
        let mut codes = Vec::new();
        for v in values {
            match v {
                None => codes.push(None),
                Some(s) => {
                    let s = s.as_ref();
                    let idx = levels.iter().position(|l| l == s).ok_or_else(|| {
                        Error::Validation(format!("value '{s}' is not one of the declared levels"))
                    })?;
                    codes.push(Some(idx as u32));
                }
            }
        }
        Ok(Self { levels, codes })
    }

    /// Build a factor directly from codes; every code must index into `levels`.
    pub fn from_codes(codes: Vec<Option<u32>>, levels: Vec<String>) -> Result<Self> {
        if let Some(bad) = codes.iter().flatten().find(|&&c| c as usize >= levels.len()) {
            return Err(Error::Validation(format!(
                "factor code {bad} out of range for {} levels",
                levels.len()
            )));
        }
        Ok(Self { levels, codes })
    }

    /// Ordered levels.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Per-row level codes (`None` = missing).
    pub fn codes(&self) -> &[Option<u32>] {
        &self.codes
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the factor has no rows.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Position of a level by name.
    pub fn level_index(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == level)
    }

    /// Level name at row `i`.
    pub fn get(&self, i: usize) -> Option<&str> {
        let code = (*self.codes.get(i)?)?;
        self.levels.get(code as usize).map(String::as_str)
    }
}

/// Kind of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Real-valued.
    Numeric,
    /// Categorical with levels.
    Categorical,
    /// Boolean.
    Logical,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Logical => "logical",
        })
    }
}

/// One column of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Column {
    /// Numeric values; `None` (or a non-finite input) is missing.
    Numeric(Vec<Option<f64>>),
    /// Categorical values.
    Categorical(Factor),
    /// Logical values.
    Logical(Vec<Option<bool>>),
}

impl Column {
    /// Numeric column from plain values; `NaN` becomes missing.
    pub fn numeric<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Column::Numeric(values.into_iter().map(|v| (!v.is_nan()).then_some(v)).collect())
    }

    /// Categorical column from plain values with inferred (sorted) levels.
    pub fn categorical<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Column::Categorical(Factor::new(values.into_iter().map(Some)))
    }

    /// Logical column from plain values.
    pub fn logical<I: IntoIterator<Item = bool>>(values: I) -> Self {
        Column::Logical(values.into_iter().map(Some).collect())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Categorical(f) => f.len(),
            Column::Logical(v) => v.len(),
        }
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind of values held.
    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Numeric(_) => ColumnKind::Numeric,
            Column::Categorical(_) => ColumnKind::Categorical,
            Column::Logical(_) => ColumnKind::Logical,
        }
    }

    /// Whether row `i` is missing. Out-of-range rows count as missing.
    pub fn is_missing(&self, i: usize) -> bool {
        match self {
            Column::Numeric(v) => !matches!(v.get(i), Some(Some(x)) if x.is_finite()),
            Column::Categorical(f) => !matches!(f.codes().get(i), Some(Some(_))),
            Column::Logical(v) => !matches!(v.get(i), Some(Some(_))),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedColumn {
    /// Column name (unique within a table).
    pub name: String,
    /// Column values.
    pub column: Column,
}

/// Ordered collection of equal-length named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NamedColumn>", into = "Vec<NamedColumn>")]
pub struct Table {
    columns: Vec<NamedColumn>,
}

impl TryFrom<Vec<NamedColumn>> for Table {
    type Error = Error;

    fn try_from(columns: Vec<NamedColumn>) -> Result<Self> {
        columns.into_iter().try_fold(Table::new(), |t, c| t.with_column(c.name, c.column))
    }
}

impl From<Table> for Vec<NamedColumn> {
    fn from(t: Table) -> Self {
        t.columns
    }
}

impl Table {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Fails on a duplicate name or a row-count mismatch.
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(Error::Validation(format!("duplicate column name '{name}'")));
        }
        if let Some(first) = self.columns.first() {
            if first.column.len() != column.len() {
                return Err(Error::Validation(format!(
                    "column '{name}' has {} rows, expected {}",
                    column.len(),
                    first.column.len()
                )));
            }
        }
        self.columns.push(NamedColumn { name, column });
        Ok(self)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.column)
    }

    /// Column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Number of rows (0 for a table without columns).
    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.column.len())
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }
}
