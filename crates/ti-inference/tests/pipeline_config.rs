//! Config-driven runs and agreement between the simulation and theory paths.

use approx::assert_relative_eq;
use ti_core::{Column, Error, Table};
use ti_inference::theory::assume;
use ti_inference::{
    CancelToken, CiMethod, Direction, GenerateConfig, GenerateType, HypothesisArgs,
    PipelineConfig, Roles, Stat, confidence_interval, observe, run_pipeline, specify,
};

fn survey() -> Table {
    let n = 90;
    let region: Vec<&str> = (0..n).map(|i| ["north", "south", "west"][i % 3]).collect();
    let vote: Vec<&str> =
        (0..n).map(|i| if (i * 13) % 7 < 3 { "yes" } else { "no" }).collect();
    let score: Vec<f64> = (0..n).map(|i| 50.0 + ((i * 37) % 23) as f64 - (i % 3) as f64).collect();
    Table::new()
        .with_column("region", Column::categorical(region))
        .unwrap()
        .with_column("vote", Column::categorical(vote))
        .unwrap()
        .with_column("score", Column::numeric(score))
        .unwrap()
}

#[test]
fn test_chisq_independence_from_json() {
    let config = PipelineConfig::from_json(
        r#"{
            "roles": { "response": "vote", "explanatory": ["region"] },
            "hypothesis": { "null": ["independence"] },
            "generate": { "reps": 500, "seed": 17 },
            "stat": "Chisq",
            "direction": "right"
        }"#,
    )
    .unwrap();
    let result = run_pipeline(&survey(), &config).unwrap();
    assert_eq!(result.null_distribution.kind(), GenerateType::Permute);
    assert_eq!(result.null_distribution.len(), 500);
    assert!(result.null_distribution.iter().all(|v| *v >= 0.0));

    let p = result.p_value.unwrap();
    assert!((0.0..=1.0).contains(&p));
}

#[test]
fn test_f_simulation_close_to_theory() {
    let table = survey();
    let args = HypothesisArgs::independence();
    let mut config = PipelineConfig::new(Roles::formula("score ~ region"), Stat::F);
    config.hypothesis = Some(args);
    config.generate = GenerateConfig::new(GenerateType::Permute, 2000).with_seed(8);
    config.direction = Direction::Greater;
    let result = run_pipeline(&table, &config).unwrap();

    let s = specify(&table, &config.roles).unwrap();
    let theory = assume(&s, Stat::F).unwrap();
    let p_theory = theory.p_value(result.observed.value, Direction::Greater).unwrap();
    let p_sim = result.p_value.unwrap();
    assert!((p_sim - p_theory).abs() < 0.05, "sim {p_sim} vs theory {p_theory}");
}

#[test]
fn test_bootstrap_interval_from_pipeline() {
    let mut config = PipelineConfig::new(Roles::response("score"), Stat::Median);
    config.generate = GenerateConfig::new(GenerateType::Bootstrap, 1000).with_seed(4);
    let result = run_pipeline(&survey(), &config).unwrap();
    assert!(result.p_value.is_none());

    for method in [CiMethod::Percentile, CiMethod::Se, CiMethod::BiasCorrected] {
        let ci =
            confidence_interval(&result.null_distribution, 0.95, method, Some(&result.observed))
                .unwrap();
        assert!(ci.lower <= result.observed.value && result.observed.value <= ci.upper);
        assert_relative_eq!(ci.level, 0.95);
    }
}

#[test]
fn test_observe_then_cancel() {
    let table = survey();
    let roles = Roles::response("vote").with_success("yes");
    let args = HypothesisArgs::point().with_p(0.4);
    let z = observe(&table, &roles, Some(&args), Stat::Z, None).unwrap();
    assert!(z.value.is_finite());

    let token = CancelToken::new();
    token.cancel();
    let mut config = PipelineConfig::new(roles, Stat::Prop);
    config.hypothesis = Some(args);
    config.generate = GenerateConfig::new(GenerateType::Draw, 100).with_cancel(token);
    let err = run_pipeline(&table, &config).unwrap_err();
    assert!(matches!(err, Error::Cancelled { completed: 0, requested: 100 }), "{err}");
}
