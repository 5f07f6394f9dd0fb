//! Replicate generation: bootstrap, permutation and simulation (draw).
//!
//! Randomness is deterministic via per-replicate seeding (`seed + replicate_id`),
//! independent of threading: replicate `i` is a pure function of the input
//! dataset, the generation type, `seed` and `i`.

use crate::descriptive;
use crate::hypothesize::{NullHypothesis, PointParam, ProportionParam};
use crate::specify::{Specified, VarData, Variable};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, WeightedIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use ti_core::{Error, Result};

/// Resampling scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerateType {
    /// Rows drawn with replacement.
    Bootstrap,
    /// Explanatory values shuffled against a fixed response (or paired signs flipped).
    Permute,
    /// Response drawn from the hypothesized level probabilities.
    #[serde(alias = "simulate")]
    Draw,
}

impl GenerateType {
    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            GenerateType::Bootstrap => "bootstrap",
            GenerateType::Permute => "permute",
            GenerateType::Draw => "draw",
        }
    }
}

impl std::fmt::Display for GenerateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerateType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "bootstrap" => Ok(GenerateType::Bootstrap),
            "permute" => Ok(GenerateType::Permute),
            "draw" | "simulate" => Ok(GenerateType::Draw),
            other => Err(Error::Validation(format!(
                "unknown generation type '{other}'; expected bootstrap, permute or draw"
            ))),
        }
    }
}

/// Cooperative cancellation flag shared with a running generation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// New, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration for replicate generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Number of replicates (default: 1000).
    pub reps: usize,
    /// Resampling scheme. `None` picks one from the declared null:
    /// draw for a point null on `p`, permute for (paired) independence,
    /// bootstrap otherwise.
    #[serde(rename = "type")]
    pub kind: Option<GenerateType>,
    /// Base seed; replicate `i` uses `seed + i` (default: 0).
    pub seed: u64,
    /// Run replicates on the rayon thread pool (default: true).
    pub parallel: bool,
    /// Cancellation flag, checked before each replicate.
    #[serde(skip)]
    pub cancel: Option<CancelToken>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self { reps: 1000, kind: None, seed: 0, parallel: true, cancel: None }
    }
}

impl GenerateConfig {
    /// `reps` replicates of the given type.
    pub fn new(kind: GenerateType, reps: usize) -> Self {
        Self { reps, kind: Some(kind), ..Self::default() }
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Run replicates sequentially.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Marks a dataset as replicate `id` of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicateTag {
    /// Position in the generated sequence.
    pub id: usize,
    /// Scheme that produced it.
    pub kind: GenerateType,
}

/// Ordered collection of generated replicates, with the dataset they came from.
#[derive(Debug, Clone)]
pub struct Replicates {
    source: Specified,
    kind: GenerateType,
    seed: u64,
    parallel: bool,
    items: Vec<Specified>,
}

impl Replicates {
    /// Dataset the replicates were generated from.
    pub fn source(&self) -> &Specified {
        &self.source
    }

    /// Scheme used.
    pub fn kind(&self) -> GenerateType {
        self.kind
    }

    /// Base seed used.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether generation ran on the rayon pool; reduction follows the same choice.
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Number of replicates.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no replicates.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replicate `id`.
    pub fn get(&self, id: usize) -> Option<&Specified> {
        self.items.get(id)
    }

    /// Replicates in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Specified> {
        self.items.iter()
    }

    /// Replicates as a slice.
    pub fn as_slice(&self) -> &[Specified] {
        &self.items
    }
}

impl<'a> IntoIterator for &'a Replicates {
    type Item = &'a Specified;
    type IntoIter = std::slice::Iter<'a, Specified>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ---------------------------------------------------------------------------
// Planning: all validation happens before any random draw.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scheme {
    /// Resample rows of `response` (possibly shifted to satisfy a point null).
    Bootstrap { response: Arc<Variable> },
    /// Shuffle explanatory columns jointly.
    PermuteExplanatory,
    /// Flip the sign of each paired difference.
    FlipSigns,
    /// Draw response codes from level weights.
    Draw { weights: WeightedIndex<f64> },
}

/// Validated generation plan for one dataset.
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    kind: GenerateType,
    scheme: Scheme,
}

impl Plan {
    pub(crate) fn kind(&self) -> GenerateType {
        self.kind
    }
}

fn default_kind(specified: &Specified) -> GenerateType {
    match specified.hypothesis() {
        Some(NullHypothesis::Point(PointParam::Proportion(_))) => GenerateType::Draw,
        Some(NullHypothesis::Independence | NullHypothesis::PairedIndependence) => {
            GenerateType::Permute
        }
        _ => GenerateType::Bootstrap,
    }
}

pub(crate) fn plan(specified: &Specified, config: &GenerateConfig) -> Result<Plan> {
    if config.reps == 0 {
        return Err(Error::Validation("reps must be at least 1".to_string()));
    }
    if let Some(tag) = specified.replicate() {
        return Err(Error::Validation(format!(
            "dataset is already replicate {} of a {} generation",
            tag.id, tag.kind
        )));
    }
    let kind = match config.kind {
        Some(k) => k,
        None => {
            let k = default_kind(specified);
            log::debug!("generate: type not supplied; using {k}");
            k
        }
    };

    let scheme = match kind {
        GenerateType::Bootstrap => bootstrap_scheme(specified)?,
        GenerateType::Permute => match specified.hypothesis() {
            Some(NullHypothesis::Independence) => Scheme::PermuteExplanatory,
            Some(NullHypothesis::PairedIndependence) => Scheme::FlipSigns,
            _ => {
                return Err(Error::InvalidNull(
                    "permute requires an independence or paired independence null".to_string(),
                ));
            }
        },
        GenerateType::Draw => draw_scheme(specified)?,
    };
    Ok(Plan { kind, scheme })
}

fn bootstrap_scheme(specified: &Specified) -> Result<Scheme> {
    let response = Arc::clone(&specified.response);
    let shifted = match specified.hypothesis() {
        None => return Ok(Scheme::Bootstrap { response }),
        Some(NullHypothesis::Point(param)) => param,
        Some(h) => {
            return Err(Error::InvalidNull(format!(
                "bootstrap cannot enforce a {} null; use permute",
                h.null_type()
            )));
        }
    };

    let Some(values) = response.as_numeric() else {
        return Err(Error::InvalidNull(
            "bootstrap cannot enforce a point null on p; use draw".to_string(),
        ));
    };
    let centred: Vec<f64> = match shifted {
        PointParam::Mean(mu) => {
            let shift = mu - descriptive::mean(values);
            values.iter().map(|v| v + shift).collect()
        }
        PointParam::Median(med) => {
            let shift = med - descriptive::median(values);
            values.iter().map(|v| v + shift).collect()
        }
        PointParam::StdDev(sigma) => {
            let m = descriptive::mean(values);
            let sd = descriptive::std_dev(values);
            if !(sd.is_finite() && sd > 0.0) {
                return Err(Error::Computation(format!(
                    "cannot rescale response '{}' to sigma = {sigma}: sample sd is {sd}",
                    response.name()
                )));
            }
            values.iter().map(|v| m + (v - m) * sigma / sd).collect()
        }
        PointParam::Proportion(_) => {
            return Err(Error::InvalidNull(
                "bootstrap cannot enforce a point null on p; use draw".to_string(),
            ));
        }
    };
    Ok(Scheme::Bootstrap { response: Arc::new(response.with_data(VarData::Numeric(centred))) })
}

fn draw_scheme(specified: &Specified) -> Result<Scheme> {
    let param = match specified.hypothesis() {
        Some(NullHypothesis::Point(param)) => param,
        _ => {
            return Err(Error::InvalidNull("draw requires a point null on p".to_string()));
        }
    };
    let p = match param {
        PointParam::Proportion(p) => p,
        other => {
            return Err(Error::Unsupported(format!(
                "simulating a numeric response under a point null on {} is not supported; \
                 use bootstrap",
                other.name()
            )));
        }
    };
    let Some(levels) = specified.response().levels() else {
        return Err(Error::InvalidNull("draw requires a categorical response".to_string()));
    };

    let mut weights = vec![0.0; levels.len()];
    match p {
        ProportionParam::Levels(pairs) => {
            for (w, (_, v)) in weights.iter_mut().zip(pairs) {
                *w = *v;
            }
        }
        ProportionParam::Scalar(v) => {
            let Some(success) = specified.success_index() else {
                return Err(Error::InvalidNull("draw with a scalar p needs a success level".into()));
            };
            weights[success] = *v;
            match (0..levels.len()).find(|&i| i != success) {
                Some(other) => weights[other] = 1.0 - v,
                None if *v < 1.0 => {
                    return Err(Error::Validation(format!(
                        "drawing with p = {v} needs a response with at least two levels"
                    )));
                }
                None => {}
            }
        }
    }
    let weights = WeightedIndex::new(&weights)
        .map_err(|e| Error::Computation(format!("invalid draw weights: {e}")))?;
    Ok(Scheme::Draw { weights })
}

// ---------------------------------------------------------------------------
// Single replicate
// ---------------------------------------------------------------------------

pub(crate) fn replicate(specified: &Specified, plan: &Plan, id: usize, seed: u64) -> Specified {
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(id as u64));
    let n = specified.n_rows();
    let mut out = specified.clone();

    match &plan.scheme {
        Scheme::Bootstrap { response } => {
            let idx: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            out.response = Arc::new(response.take_rows(&idx));
            out.explanatory =
                specified.explanatory.iter().map(|x| Arc::new(x.take_rows(&idx))).collect();
        }
        Scheme::PermuteExplanatory => {
            let mut perm: Vec<usize> = (0..n).collect();
            perm.shuffle(&mut rng);
            out.explanatory =
                specified.explanatory.iter().map(|x| Arc::new(x.take_rows(&perm))).collect();
        }
        Scheme::FlipSigns => {
            if let Some(values) = specified.response.as_numeric() {
                let flipped = values
                    .iter()
                    .map(|&v| if rng.gen_bool(0.5) { -v } else { v })
                    .collect();
                out.response = Arc::new(specified.response.with_data(VarData::Numeric(flipped)));
            }
        }
        Scheme::Draw { weights } => {
            if let Some(levels) = specified.response.levels() {
                let codes = (0..n).map(|_| weights.sample(&mut rng) as u32).collect();
                let data = VarData::Categorical { levels: levels.to_vec(), codes };
                out.response = Arc::new(specified.response.with_data(data));
            }
        }
    }

    out.replicate = Some(ReplicateTag { id, kind: plan.kind });
    out
}

/// Run `f(i)` for `i in 0..reps`, in order, honouring cancellation.
pub(crate) fn run_indexed<T, F>(config: &GenerateConfig, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    let reps = config.reps;
    let cancelled = || config.cancel.as_ref().is_some_and(CancelToken::is_cancelled);
    let step = |i: usize| if cancelled() { None } else { Some(f(i)) };

    let results: Vec<Option<T>> = if config.parallel {
        (0..reps).into_par_iter().with_min_len(16).map(step).collect()
    } else {
        (0..reps).map(step).collect()
    };

    let completed = results.iter().filter(|r| r.is_some()).count();
    if completed < reps {
        log::warn!("generate: cancelled after {completed} of {reps} replicates");
        return Err(Error::Cancelled { completed, requested: reps });
    }
    Ok(results.into_iter().flatten().collect())
}

/// Generate `config.reps` replicates of `specified`.
///
/// # Errors
///
/// - [`Error::Validation`] when `reps` is 0 or `specified` is itself a replicate
/// - [`Error::InvalidNull`] when the scheme does not fit the declared null
///   (permute without independence, draw without a point null on `p`,
///   bootstrap under independence or a `p` null)
/// - [`Error::Unsupported`] for draw under a numeric point null
/// - [`Error::Cancelled`] when the cancel token fires before completion
pub fn generate(specified: &Specified, config: &GenerateConfig) -> Result<Replicates> {
    let plan = plan(specified, config)?;
    let items = run_indexed(config, |i| replicate(specified, &plan, i, config.seed))?;
    log::debug!("generate: {} {} replicates (seed {})", items.len(), plan.kind, config.seed);
    Ok(Replicates {
        source: specified.clone(),
        kind: plan.kind,
        seed: config.seed,
        parallel: config.parallel,
        items,
    })
}
