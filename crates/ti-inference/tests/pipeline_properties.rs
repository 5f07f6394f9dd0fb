//! End-to-end properties of the specify → hypothesize → generate → calculate chain.
//!
//! Run: `cargo test -p ti-inference --test pipeline_properties`

use approx::assert_relative_eq;
use ti_core::{Column, Error, Table};
use ti_inference::{
    Direction, GenerateConfig, GenerateType, HypothesisArgs, Order, ProportionParam, Roles, Stat,
    calculate, calculate_replicates, generate, hypothesize, null_distribution, p_value, specify,
};

fn sample(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 7919) % 1000) as f64 / 10.0).collect()
}

fn two_group_table() -> Table {
    let y = [12.1, 9.8, 11.4, 13.0, 10.2, 14.5, 15.1, 13.9, 16.0, 14.8, 12.7, 15.6];
    let g = ["ctl", "ctl", "ctl", "ctl", "ctl", "trt", "trt", "trt", "trt", "trt", "ctl", "trt"];
    Table::new()
        .with_column("y", Column::numeric(y))
        .unwrap()
        .with_column("g", Column::categorical(g))
        .unwrap()
}

fn sorted(mut v: Vec<f64>) -> Vec<f64> {
    v.sort_by(f64::total_cmp);
    v
}

// ── generation ───────────────────────────────────────────────────────────

#[test]
fn test_permute_keeps_multiset_and_response() {
    let s = specify(&two_group_table(), &Roles::formula("y ~ g")).unwrap();
    let s = hypothesize(s, &HypothesisArgs::independence()).unwrap();
    let reps = generate(&s, &GenerateConfig::new(GenerateType::Permute, 50).with_seed(1)).unwrap();

    let (_, original) = s.explanatory_var().unwrap().as_categorical().unwrap();
    let mut original_codes = original.to_vec();
    original_codes.sort_unstable();

    for r in &reps {
        assert_eq!(r.response().as_numeric(), s.response().as_numeric());
        let (_, codes) = r.explanatory_var().unwrap().as_categorical().unwrap();
        let mut codes = codes.to_vec();
        codes.sort_unstable();
        assert_eq!(codes, original_codes);
    }
}

#[test]
fn test_bootstrap_rows_come_from_originals() {
    let y = sample(40);
    let t = Table::new().with_column("y", Column::numeric(y.clone())).unwrap();
    let s = specify(&t, &Roles::response("y")).unwrap();
    let reps =
        generate(&s, &GenerateConfig::new(GenerateType::Bootstrap, 2000).with_seed(7)).unwrap();

    let mut grand = 0.0;
    for r in &reps {
        let values = r.response().as_numeric().unwrap();
        assert_eq!(values.len(), 40);
        assert!(values.iter().all(|v| y.contains(v)));
        grand += values.iter().sum::<f64>() / 40.0;
    }
    grand /= reps.len() as f64;
    let sample_mean = y.iter().sum::<f64>() / 40.0;
    assert_relative_eq!(grand, sample_mean, max_relative = 0.01);
}

#[test]
fn test_same_seed_same_distribution() {
    let s = specify(&two_group_table(), &Roles::formula("y ~ g")).unwrap();
    let s = hypothesize(s, &HypothesisArgs::independence()).unwrap();
    let config = GenerateConfig::new(GenerateType::Permute, 400).with_seed(99);
    let order = Order::new("trt", "ctl");

    let parallel = null_distribution(&s, &config, Stat::DiffInMeans, Some(&order)).unwrap();
    let sequential =
        null_distribution(&s, &config.clone().sequential(), Stat::DiffInMeans, Some(&order))
            .unwrap();
    assert_eq!(parallel.values(), sequential.values());

    let other = config.with_seed(100);
    let shifted = null_distribution(&s, &other, Stat::DiffInMeans, Some(&order)).unwrap();
    assert_ne!(parallel.values(), shifted.values());
}

// ── statistics ───────────────────────────────────────────────────────────

#[test]
fn test_diff_in_means_order_negates() {
    let s = specify(&two_group_table(), &Roles::formula("y ~ g")).unwrap();
    let ab = calculate(&s, Stat::DiffInMeans, Some(&Order::new("trt", "ctl"))).unwrap();
    let ba = calculate(&s, Stat::DiffInMeans, Some(&Order::new("ctl", "trt"))).unwrap();
    assert_relative_eq!(ab.value, -ba.value);
    assert!(ab.value > 0.0);
}

#[test]
fn test_prop_is_exact_fraction() {
    let levels: Vec<&str> = (0..120).map(|i| if i < 37 { "yes" } else { "no" }).collect();
    let t = Table::new().with_column("answer", Column::categorical(levels)).unwrap();
    let s = specify(&t, &Roles::response("answer").with_success("yes")).unwrap();
    let prop = calculate(&s, Stat::Prop, None).unwrap();
    assert_eq!(prop.value, 37.0 / 120.0);
}

// ── null declaration ─────────────────────────────────────────────────────

#[test]
fn test_independence_ignores_parameter() {
    let s = specify(&two_group_table(), &Roles::formula("y ~ g")).unwrap();
    let plain = hypothesize(s.clone(), &HypothesisArgs::independence()).unwrap();
    let with_mu = hypothesize(s, &HypothesisArgs::independence().with_mu(3.0)).unwrap();

    let config = GenerateConfig::new(GenerateType::Permute, 250).with_seed(5);
    let order = Order::new("trt", "ctl");
    let a = null_distribution(&plain, &config, Stat::DiffInMeans, Some(&order)).unwrap();
    let b = null_distribution(&with_mu, &config, Stat::DiffInMeans, Some(&order)).unwrap();
    assert_eq!(a.values(), b.values());
}

#[test]
fn test_point_arity_error_before_resampling() {
    let t = Table::new().with_column("y", Column::numeric(sample(30))).unwrap();
    let s = specify(&t, &Roles::response("y")).unwrap();
    let err = hypothesize(s, &HypothesisArgs::point().with_mu(1.0).with_med(1.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidNull(_)), "{err}");
}

#[test]
fn test_p_vector_epsilon_sums() {
    let t = Table::new().with_column("c", Column::categorical(["a", "b", "a", "b"])).unwrap();
    let s = specify(&t, &Roles::response("c")).unwrap();
    let eps = f64::EPSILON;
    let p = |x: f64| -> ProportionParam { [("a", 0.5), ("b", x)].into_iter().collect() };

    assert!(hypothesize(s.clone(), &HypothesisArgs::point().with_p(p(0.5 + eps))).is_ok());
    assert!(hypothesize(s.clone(), &HypothesisArgs::point().with_p(p(0.5 - eps))).is_ok());
    let err = hypothesize(s, &HypothesisArgs::point().with_p(p(0.5 + 3.0 * eps))).unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "{err}");
}

// ── full runs ────────────────────────────────────────────────────────────

#[test]
fn test_large_bootstrap_mean() {
    let t = Table::new().with_column("x", Column::numeric(sample(500))).unwrap();
    let s = specify(&t, &Roles::response("x")).unwrap();
    let s = hypothesize(s, &HypothesisArgs::point().with_mu(45.0)).unwrap();
    let config = GenerateConfig::new(GenerateType::Bootstrap, 1000).with_seed(2024);

    let dist = null_distribution(&s, &config, Stat::Mean, None).unwrap();
    assert_eq!(dist.len(), 1000);
    assert_eq!(dist.n_undefined(), 0);
    // Shifted to the null before resampling.
    assert_relative_eq!(dist.mean(), 45.0, max_relative = 0.01);

    let observed = calculate(&s, Stat::Mean, None).unwrap();
    for direction in [Direction::Less, Direction::Greater, Direction::TwoSided] {
        let p = p_value(&dist, &observed, direction).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}

#[test]
fn test_draw_under_p() {
    let answers: Vec<&str> = (0..80).map(|i| if i % 4 == 0 { "yes" } else { "no" }).collect();
    let t = Table::new().with_column("a", Column::categorical(answers)).unwrap();
    let s = specify(&t, &Roles::response("a").with_success("yes")).unwrap();
    let s = hypothesize(s, &HypothesisArgs::point().with_p(0.5)).unwrap();

    let reps = generate(&s, &GenerateConfig::default().with_seed(3)).unwrap();
    assert_eq!(reps.kind(), GenerateType::Draw);
    let dist = calculate_replicates(&reps, Stat::Prop, None).unwrap();
    assert_relative_eq!(dist.mean(), 0.5, epsilon = 0.01);

    let observed = calculate(&s, Stat::Prop, None).unwrap();
    let p = p_value(&dist, &observed, Direction::Less).unwrap();
    assert!(p < 0.01);
}

#[test]
fn test_statistic_mismatch_rejected() {
    let s = specify(&two_group_table(), &Roles::formula("y ~ g")).unwrap();
    let s = hypothesize(s, &HypothesisArgs::independence()).unwrap();
    let config = GenerateConfig::new(GenerateType::Permute, 20);
    let order = Order::new("trt", "ctl");
    let dist = null_distribution(&s, &config, Stat::DiffInMeans, Some(&order)).unwrap();
    let observed = calculate(&s, Stat::DiffInMedians, Some(&order)).unwrap();
    assert!(p_value(&dist, &observed, Direction::TwoSided).is_err());
}
