//! # ti-inference
//!
//! Simulation-based hypothesis testing for tidyinfer.
//!
//! A test is a chain of pure stages, each returning a new value:
//! - [`specify()`]: declare response / explanatory roles on a [`ti_core::Table`]
//! - [`hypothesize()`]: attach a validated null hypothesis
//! - [`generate()`]: bootstrap, permute or draw replicates under the null
//! - [`calculate()`]: reduce a dataset (or each replicate) to a statistic
//! - [`p_value()`] / [`confidence_interval`]: compare observed and null
//!
//! [`run_pipeline`] drives the whole chain from a [`PipelineConfig`], and
//! [`theory::assume`] offers the matching large-sample reference distribution.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Statistic definitions and the (statistic, roles) dispatch table.
pub mod calculate;
/// Mean, median, variance and quantiles.
pub mod descriptive;
/// Statistic values over replicates.
pub mod distribution;
/// Bootstrap / permutation / draw replicate generation.
pub mod generate;
/// Null hypothesis declaration and validation.
pub mod hypothesize;
/// Bootstrap confidence intervals.
pub mod interval;
/// Simulation p-values.
pub mod p_value;
/// Config-driven end-to-end runs.
pub mod pipeline;
/// Role declaration.
pub mod specify;
/// Theoretical reference distributions.
pub mod theory;

pub use calculate::{Calculated, Order, Stat, calculate};
pub use distribution::{NullDistribution, calculate_replicates, null_distribution};
pub use generate::{CancelToken, GenerateConfig, GenerateType, ReplicateTag, Replicates, generate};
pub use hypothesize::{
    HypothesisArgs, NullHypothesis, NullType, PointParam, ProportionParam, hypothesize,
};
pub use interval::{CiMethod, ConfidenceInterval, confidence_interval};
pub use p_value::{Direction, p_value, p_value_of};
pub use pipeline::{PipelineConfig, PipelineResult, observe, run_pipeline};
pub use specify::{Formula, RoleSignature, Roles, Specified, Variable, specify};
pub use theory::Theoretical;
