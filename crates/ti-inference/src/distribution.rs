//! Null distributions: one statistic value per replicate.
//!
//! Two entry points produce the same values for the same seed:
//! [`calculate_replicates`] reduces materialized [`Replicates`], while
//! [`null_distribution`] fuses generation and calculation so no replicate is
//! kept alive after its statistic is taken.

use crate::calculate::{Calculated, Order, Resolved, Stat, resolve};
use crate::descriptive::{mean, std_dev};
use crate::generate::{self, GenerateConfig, GenerateType, Replicates};
use crate::specify::{RoleSignature, Specified};
use rayon::prelude::*;
use serde::Serialize;
use ti_core::{Error, Result};

/// Statistic values over the replicates of one generation, in replicate order.
///
/// Undefined replicate statistics are kept as `NaN` so that `len()` always
/// equals the number of replicates requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NullDistribution {
    stat: Stat,
    signature: RoleSignature,
    kind: GenerateType,
    order: Option<Order>,
    values: Vec<f64>,
}

impl NullDistribution {
    fn new(resolved: Resolved, kind: GenerateType, values: Vec<f64>) -> Self {
        let dist = Self {
            stat: resolved.stat,
            signature: resolved.signature,
            kind,
            order: resolved.order,
            values,
        };
        let undefined = dist.n_undefined();
        if undefined > 0 {
            log::warn!(
                "null distribution: `{}` undefined in {undefined} of {} replicates; kept as NaN",
                dist.stat,
                dist.values.len()
            );
        }
        dist
    }

    /// Statistic the values are of.
    pub fn stat(&self) -> Stat {
        self.stat
    }

    /// Role signature of the source dataset.
    pub fn signature(&self) -> RoleSignature {
        self.signature
    }

    /// Generation scheme.
    pub fn kind(&self) -> GenerateType {
        self.kind
    }

    /// Group order used, for two-group statistics.
    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// Values in replicate order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of replicates.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when there are no replicates.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate values in replicate order.
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.values.iter()
    }

    /// Finite values only.
    pub fn finite(&self) -> Vec<f64> {
        self.values.iter().copied().filter(|v| v.is_finite()).collect()
    }

    /// Count of non-finite values.
    pub fn n_undefined(&self) -> usize {
        self.values.iter().filter(|v| !v.is_finite()).count()
    }

    /// Mean of the finite values.
    pub fn mean(&self) -> f64 {
        mean(&self.finite())
    }

    /// Sample standard deviation of the finite values.
    pub fn sd(&self) -> f64 {
        std_dev(&self.finite())
    }

    /// Check that `observed` is the same statistic, computed under the same
    /// role signature and group order, as this distribution.
    pub fn ensure_compatible(&self, observed: &Calculated) -> Result<()> {
        if observed.stat != self.stat {
            return Err(Error::IncompatibleStatistic(format!(
                "observed statistic is `{}` but the null distribution is of `{}`",
                observed.stat, self.stat
            )));
        }
        if observed.signature != self.signature {
            return Err(Error::IncompatibleStatistic(format!(
                "observed `{}` was computed on a {} but the null distribution on a {}",
                self.stat, observed.signature, self.signature
            )));
        }
        if observed.order != self.order {
            return Err(Error::Validation(format!(
                "observed `{}` uses order {:?} but the null distribution uses {:?}",
                self.stat, observed.order, self.order
            )));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a NullDistribution {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Compute `stat` on every replicate.
///
/// The statistic is resolved once against the replicates' source dataset, so
/// an incompatible statistic or a bad `order` fails before any replicate is
/// touched, and the default-order warning is emitted once. Runs on the rayon
/// pool only when the replicates were generated in parallel.
pub fn calculate_replicates(
    replicates: &Replicates,
    stat: Stat,
    order: Option<&Order>,
) -> Result<NullDistribution> {
    let resolved = resolve(replicates.source(), stat, order)?;
    let items = replicates.as_slice();
    let values = if replicates.is_parallel() {
        items.par_iter().with_min_len(16).map(|r| resolved.compute(r)).collect()
    } else {
        items.iter().map(|r| resolved.compute(r)).collect::<Result<Vec<f64>>>()
    }?;
    Ok(NullDistribution::new(resolved, replicates.kind(), values))
}

/// Generate replicates of `specified` and compute `stat` on each, without
/// materializing the replicate collection.
///
/// Produces the same values as [`generate`](crate::generate::generate)
/// followed by [`calculate_replicates`] with the same `config`.
pub fn null_distribution(
    specified: &Specified,
    config: &GenerateConfig,
    stat: Stat,
    order: Option<&Order>,
) -> Result<NullDistribution> {
    let plan = generate::plan(specified, config)?;
    let resolved = resolve(specified, stat, order)?;
    let values = generate::run_indexed(config, |i| {
        let replicate = generate::replicate(specified, &plan, i, config.seed);
        resolved.compute(&replicate)
    })?
    .into_iter()
    .collect::<Result<Vec<f64>>>()?;
    log::debug!(
        "null distribution: {} `{stat}` values from {} replicates (seed {})",
        values.len(),
        plan.kind(),
        config.seed
    );
    Ok(NullDistribution::new(resolved, plan.kind(), values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::calculate;
    use crate::generate::generate;
    use crate::hypothesize::{HypothesisArgs, hypothesize};
    use crate::p_value::{Direction, p_value};
    use crate::specify::{Roles, specify};
    use ti_core::{Column, Table};

    fn table() -> Table {
        Table::new()
            .with_column("y", Column::numeric([4.0, 5.0, 6.0, 8.0, 9.0, 11.0, 12.0, 15.0]))
            .unwrap()
            .with_column("g", Column::categorical(["a", "b", "a", "b", "a", "b", "a", "b"]))
            .unwrap()
    }

    fn independence() -> Specified {
        let s = specify(&table(), &Roles::formula("y ~ g")).unwrap();
        hypothesize(s, &HypothesisArgs::independence()).unwrap()
    }

    #[test]
    fn test_fused_matches_two_step() {
        let s = independence();
        let config = GenerateConfig::new(GenerateType::Permute, 200).with_seed(11);
        let order = Order::new("a", "b");

        let fused = null_distribution(&s, &config, Stat::DiffInMeans, Some(&order)).unwrap();
        let reps = generate(&s, &config).unwrap();
        let two_step = calculate_replicates(&reps, Stat::DiffInMeans, Some(&order)).unwrap();

        assert_eq!(fused.values(), two_step.values());
        assert_eq!(fused.len(), 200);
        assert_eq!(fused.kind(), GenerateType::Permute);
    }

    #[test]
    fn test_sequential_reduction_matches_parallel() {
        let s = independence();
        let config = GenerateConfig::new(GenerateType::Permute, 60).with_seed(21);
        let order = Order::new("a", "b");

        let sequential = generate(&s, &config.clone().sequential()).unwrap();
        assert!(!sequential.is_parallel());
        let parallel = generate(&s, &config).unwrap();
        assert!(parallel.is_parallel());

        let a = calculate_replicates(&sequential, Stat::DiffInMeans, Some(&order)).unwrap();
        let b = calculate_replicates(&parallel, Stat::DiffInMeans, Some(&order)).unwrap();
        assert_eq!(a.values(), b.values());
    }

    #[test]
    fn test_resolve_fails_before_generation() {
        let s = independence();
        let config = GenerateConfig::new(GenerateType::Permute, 50);
        let err = null_distribution(&s, &config, Stat::Slope, None).unwrap_err();
        assert!(matches!(err, Error::IncompatibleStatistic(_)));
    }

    #[test]
    fn test_order_negates_distribution() {
        let s = independence();
        let config = GenerateConfig::new(GenerateType::Permute, 100).with_seed(3);
        let ab = null_distribution(&s, &config, Stat::DiffInMeans, Some(&Order::new("a", "b")))
            .unwrap();
        let ba = null_distribution(&s, &config, Stat::DiffInMeans, Some(&Order::new("b", "a")))
            .unwrap();
        for (x, y) in ab.iter().zip(&ba) {
            assert!((x + y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_undefined_values_kept() {
        // One observation per bootstrap leaves sd undefined in every replicate.
        let t = Table::new().with_column("y", Column::numeric([3.0])).unwrap();
        let s = specify(&t, &Roles::response("y")).unwrap();
        let config = GenerateConfig::new(GenerateType::Bootstrap, 20);
        let dist = null_distribution(&s, &config, Stat::Sd, None).unwrap();
        assert_eq!(dist.len(), 20);
        assert_eq!(dist.n_undefined(), 20);
        assert!(dist.finite().is_empty());
    }

    #[test]
    fn test_ensure_compatible() {
        let s = independence();
        let config = GenerateConfig::new(GenerateType::Permute, 10);
        let order = Order::new("b", "a");
        let dist = null_distribution(&s, &config, Stat::DiffInMeans, Some(&order)).unwrap();

        let obs = calculate(&s, Stat::DiffInMeans, Some(&order)).unwrap();
        assert!(dist.ensure_compatible(&obs).is_ok());

        let flipped = calculate(&s, Stat::DiffInMeans, Some(&order.reversed())).unwrap();
        assert!(dist.ensure_compatible(&flipped).is_err());

        let other = calculate(&s, Stat::DiffInMedians, Some(&order)).unwrap();
        assert!(dist.ensure_compatible(&other).is_err());
    }

    #[test]
    fn test_signature_mismatch_rejected() {
        let t = Table::new()
            .with_column("v", Column::categorical(["x", "y", "x", "x", "y", "y", "x", "y"]))
            .unwrap()
            .with_column("g", Column::categorical(["a", "a", "b", "b", "a", "b", "a", "b"]))
            .unwrap();
        let fit = specify(&t, &Roles::response("v")).unwrap();
        let config = GenerateConfig::new(GenerateType::Bootstrap, 50).with_seed(2);
        let dist = null_distribution(&fit, &config, Stat::Chisq, None).unwrap();

        let joint = specify(&t, &Roles::formula("v ~ g")).unwrap();
        let joint = hypothesize(joint, &HypothesisArgs::independence()).unwrap();
        let observed = calculate(&joint, Stat::Chisq, None).unwrap();

        let err = dist.ensure_compatible(&observed).unwrap_err();
        assert!(matches!(err, Error::IncompatibleStatistic(_)), "{err}");
        let err = p_value(&dist, &observed, Direction::Greater).unwrap_err();
        assert!(matches!(err, Error::IncompatibleStatistic(_)), "{err}");
    }
}
