//! End-to-end runs: specify, hypothesize, calculate the observed statistic,
//! build its null distribution and compare the two.

use crate::calculate::{Calculated, Order, Stat, calculate};
use crate::distribution::{NullDistribution, null_distribution};
use crate::generate::GenerateConfig;
use crate::hypothesize::{HypothesisArgs, hypothesize};
use crate::p_value::{Direction, p_value};
use crate::specify::{Roles, Specified, specify};
use serde::{Deserialize, Serialize};
use ti_core::{Result, Table};

/// Configuration of a full inference run, loadable from JSON.
///
/// ```json
/// {
///   "roles": { "formula": "y ~ group" },
///   "hypothesis": { "null": ["independence"] },
///   "generate": { "reps": 1000, "type": "permute", "seed": 42 },
///   "stat": "diff in means",
///   "order": ["treatment", "control"],
///   "direction": "two_sided"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Variable roles.
    pub roles: Roles,
    /// Null hypothesis; without one the run stops at the (bootstrap)
    /// distribution and no p-value is reported.
    #[serde(default)]
    pub hypothesis: Option<HypothesisArgs>,
    /// Replicate generation settings.
    #[serde(default)]
    pub generate: GenerateConfig,
    /// Statistic.
    pub stat: Stat,
    /// Group order for two-group statistics.
    #[serde(default)]
    pub order: Option<Order>,
    /// Alternative direction for the p-value.
    #[serde(default)]
    pub direction: Direction,
}

impl PipelineConfig {
    /// Minimal configuration: `roles` and `stat`, defaults elsewhere.
    pub fn new(roles: Roles, stat: Stat) -> Self {
        Self {
            roles,
            hypothesis: None,
            generate: GenerateConfig::default(),
            stat,
            order: None,
            direction: Direction::default(),
        }
    }

    /// Parse from a JSON string.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Output of [`run_pipeline`].
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Statistic on the observed data.
    pub observed: Calculated,
    /// Statistic over the replicates.
    pub null_distribution: NullDistribution,
    /// Present when a null hypothesis was declared.
    pub p_value: Option<f64>,
}

fn prepare(table: &Table, roles: &Roles, hypothesis: Option<&HypothesisArgs>) -> Result<Specified> {
    let specified = specify(table, roles)?;
    match hypothesis {
        Some(args) => hypothesize(specified, args),
        None => Ok(specified),
    }
}

/// Observed statistic: specify, optionally hypothesize, then calculate.
///
/// The null is applied before calculating so that statistics standardized
/// against it (`t` against `mu`, `z` against `p`) use the declared value.
pub fn observe(
    table: &Table,
    roles: &Roles,
    hypothesis: Option<&HypothesisArgs>,
    stat: Stat,
    order: Option<&Order>,
) -> Result<Calculated> {
    let specified = prepare(table, roles, hypothesis)?;
    calculate(&specified, stat, order)
}

/// Run the whole pipeline described by `config` on `table`.
///
/// Every stage validates before any resampling starts.
pub fn run_pipeline(table: &Table, config: &PipelineConfig) -> Result<PipelineResult> {
    let specified = prepare(table, &config.roles, config.hypothesis.as_ref())?;
    let observed = calculate(&specified, config.stat, config.order.as_ref())?;
    // Pin the order the observed statistic used so no second default warning fires.
    let dist = null_distribution(&specified, &config.generate, config.stat, observed.order.as_ref())?;
    let p = match specified.hypothesis() {
        Some(_) => Some(p_value(&dist, &observed, config.direction)?),
        None => None,
    };
    log::debug!(
        "pipeline: `{}` observed {} over {} replicates, p = {p:?}",
        config.stat,
        observed.value,
        dist.len()
    );
    Ok(PipelineResult { observed, null_distribution: dist, p_value: p })
}
