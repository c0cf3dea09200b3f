//! End-to-end evaluation scenarios for the trust engine.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use edet_engine::analyzers::{Assessment, Dimension, FlagCode, SensitivityLevel};
use edet_engine::config::EngineConfig;
use edet_engine::analyzers::SamplingPolicy;
use edet_engine::engine::{ResultBundle, TrustEngine, TrustTier};
use edet_engine::error::EngineError;
use edet_engine::profile::{DatasetProfile, ProfileBuilder};

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn engine() -> TrustEngine {
    TrustEngine::new(EngineConfig::default()).unwrap()
}

fn numbers(values: impl IntoIterator<Item = f64>) -> Vec<Option<f64>> {
    values.into_iter().map(Some).collect()
}

/// Daily sales feed whose last row is the day before profiling.
fn sales_profile() -> DatasetProfile {
    let start = fixed_time() - Duration::days(30);
    let days: Vec<_> = (0..30).map(|d| Some(start + Duration::days(d))).collect();
    let revenue = numbers((0..30).map(|i| 100.0 + (i % 7) as f64 * 10.0));
    let profit = numbers((0..30).map(|i| 10.0 + (i % 5) as f64));
    let region: Vec<_> = (0..30)
        .map(|i| Some(["north", "south", "east"][i % 3].to_string()))
        .collect();
    ProfileBuilder::new("csv")
        .profiled_at(fixed_time())
        .temporal("order_date", days)
        .numeric("revenue", revenue)
        .numeric("profit", profit)
        .categorical("region", region)
        .build()
        .unwrap()
}

#[test]
fn test_empty_dataset_scenario() {
    let profile = ProfileBuilder::new("csv")
        .profiled_at(fixed_time())
        .numeric("amount", vec![])
        .temporal("created_at", vec![])
        .build()
        .unwrap();

    let bundle = engine().evaluate(&profile).unwrap();

    assert_eq!(bundle.structural.result.score(), 0.0);
    assert!(bundle.structural.result.has_flag("EmptyDataset"));
    assert_eq!(bundle.structural.aggregate_score(), None);
    assert!(bundle.operational.result.has_flag("InsufficientTemporalData"));

    let trust = &bundle.trust;
    assert_eq!(
        trust.excluded_dimensions,
        vec![Dimension::Structural, Dimension::Logical, Dimension::Analytical]
    );
    assert!((trust.weights_used["governance"] - 0.20 / 0.35).abs() < 1e-12);
    assert!((trust.weights_used["operational"] - 0.15 / 0.35).abs() < 1e-12);

    let expected = trust.weights_used["governance"] * bundle.governance.result.score()
        + trust.weights_used["operational"] * bundle.operational.result.score();
    assert!((trust.edti_score - expected).abs() < 1e-12);
}

#[test]
fn test_email_column_is_high_sensitivity() {
    let emails: Vec<_> = (0..20)
        .map(|i| Some(format!("user{i}@example.com")))
        .collect();
    let profile = ProfileBuilder::new("csv")
        .profiled_at(fixed_time())
        .text("email", emails)
        .numeric("score", numbers((0..20).map(f64::from)))
        .build()
        .unwrap();

    let bundle = engine().evaluate(&profile).unwrap();

    assert_eq!(bundle.governance.sensitivity, SensitivityLevel::High);
    assert!(bundle.governance.result.score() < 0.7);
    assert_eq!(
        bundle.governance.sensitive_columns.get("email"),
        Some(&SensitivityLevel::High)
    );
    assert!(bundle.governance.result.has_flag("DirectIdentifier"));
    assert!(bundle.trust.trust_tier <= TrustTier::ReviewRecommended);
}

#[test]
fn test_correlated_pair_flagged_once() {
    let x: Vec<f64> = (0..100).map(f64::from).collect();
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(i, v)| v + if i % 2 == 0 { 4.0 } else { -4.0 })
        .collect();
    let profile = ProfileBuilder::new("csv")
        .profiled_at(fixed_time())
        .numeric("x", numbers(x))
        .numeric("y", numbers(y))
        .build()
        .unwrap();

    let bundle = engine().evaluate(&profile).unwrap();
    let structural = &bundle.structural;

    assert_eq!(structural.redundant_pairs.len(), 1);
    let pair = &structural.redundant_pairs[0];
    assert_eq!((pair.first.as_str(), pair.second.as_str()), ("x", "y"));
    assert!(pair.correlation > 0.98 && pair.correlation < 1.0);

    let flags: Vec<_> = structural.result.flags_named("RedundantFeature").collect();
    assert_eq!(flags.len(), 1);
    assert!(flags[0].affected_columns.contains("x"));
    assert!(flags[0].affected_columns.contains("y"));
}

#[test]
fn test_profit_exceeding_revenue_scores_logical() {
    let revenue = numbers((0..20).map(|i| 100.0 + f64::from(i)));
    let profit = numbers((0..20).map(|i| if i < 2 { 500.0 } else { 10.0 }));
    let profile = ProfileBuilder::new("csv")
        .profiled_at(fixed_time())
        .numeric("revenue", revenue)
        .numeric("profit", profit)
        .build()
        .unwrap();

    let bundle = engine().evaluate(&profile).unwrap();
    let logical = &bundle.logical;

    assert!((logical.result.score() - 0.90).abs() < 1e-12);
    let violations: Vec<_> = logical.result.flags_named("RuleViolation").collect();
    assert_eq!(violations.len(), 1);
    assert_eq!(
        violations[0].code,
        FlagCode::RuleViolation {
            rule_id: "profit_le_revenue".to_string(),
            violation_count: 2,
        }
    );
}

#[test]
fn test_sensitivity_caps_decision_ready() {
    let engine = engine();
    let (tier, uncapped, capped) = engine.classify(0.82, SensitivityLevel::Low);
    assert_eq!(tier, TrustTier::DecisionReady);
    assert_eq!(uncapped, TrustTier::DecisionReady);
    assert!(!capped);

    let (tier, uncapped, capped) = engine.classify(0.82, SensitivityLevel::High);
    assert_eq!(tier, TrustTier::ReviewRecommended);
    assert_eq!(uncapped, TrustTier::DecisionReady);
    assert!(capped);
}

#[test]
fn test_clean_feed_is_decision_ready() {
    let bundle = engine().evaluate(&sales_profile()).unwrap();

    assert!(bundle.trust.excluded_dimensions.is_empty());
    assert_eq!(bundle.operational.temporal_column.as_deref(), Some("order_date"));
    assert!(!bundle.operational.result.has_flag("StaleData"));
    assert_eq!(bundle.logical.result.score(), 1.0);
    assert!(bundle.trust.edti_score >= 0.8, "edti {}", bundle.trust.edti_score);
    assert_eq!(bundle.trust.trust_tier, TrustTier::DecisionReady);
}

#[test]
fn test_evaluation_is_idempotent() {
    let profile = sales_profile();
    let engine = engine();
    let first = engine.evaluate(&profile).unwrap();
    let second = engine.evaluate(&profile).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_broken_profile_is_rejected() {
    let mut value = serde_json::to_value(sales_profile()).unwrap();
    value["row_count"] = serde_json::json!(99);
    let broken: DatasetProfile = serde_json::from_value(value).unwrap();

    let err = engine().evaluate(&broken).unwrap_err();
    assert!(err.is_contract_violation());
    assert!(matches!(err, EngineError::ProfileContractViolation { .. }));
}

#[test]
fn test_reference_time_override_makes_feed_stale() {
    let config = EngineConfig::builder()
        .reference_time(fixed_time() + Duration::days(120))
        .build()
        .unwrap();
    let bundle = TrustEngine::new(config)
        .unwrap()
        .evaluate(&sales_profile())
        .unwrap();
    assert!(bundle.operational.result.has_flag("StaleData"));
    assert!(bundle.operational.lag_days.unwrap() > 100.0);
}

#[tokio::test]
async fn test_concurrent_evaluation_matches_sequential() {
    let profile = Arc::new(sales_profile());
    let engine = engine();
    let sequential = engine.evaluate(&profile).unwrap();
    let concurrent = engine.evaluate_concurrent(Arc::clone(&profile)).await.unwrap();
    assert_eq!(sequential, concurrent);
}

#[tokio::test]
async fn test_concurrent_evaluation_rejects_broken_profile() {
    let mut value = serde_json::to_value(sales_profile()).unwrap();
    value["column_count"] = serde_json::json!(7);
    let broken: DatasetProfile = serde_json::from_value(value).unwrap();
    let err = engine()
        .evaluate_concurrent(Arc::new(broken))
        .await
        .unwrap_err();
    assert!(err.is_contract_violation());
}

fn sales_profile_with_gap(gap: Option<f64>) -> DatasetProfile {
    let start = fixed_time() - Duration::days(30);
    let days: Vec<_> = (0..30).map(|d| Some(start + Duration::days(d))).collect();
    let mut revenue = numbers((0..30).map(|i| 100.0 + (i % 7) as f64 * 10.0));
    revenue[12] = gap;
    ProfileBuilder::new("csv")
        .profiled_at(fixed_time())
        .temporal("order_date", days)
        .numeric("revenue", revenue)
        .numeric("profit", numbers((0..30).map(|i| 10.0 + (i % 5) as f64)))
        .build()
        .unwrap()
}

#[test]
fn test_non_finite_cell_evaluates_like_missing_cell() {
    let engine = engine();
    let missing = engine.evaluate(&sales_profile_with_gap(None)).unwrap();
    let nan = engine.evaluate(&sales_profile_with_gap(Some(f64::NAN))).unwrap();
    let inf = engine.evaluate(&sales_profile_with_gap(Some(f64::INFINITY))).unwrap();

    assert_eq!(nan, missing);
    assert_eq!(inf, missing);
    assert_eq!(nan, nan.clone());
    assert!(nan.analytical.skewness.values().all(|s| s.is_finite()));

    let restored: ResultBundle = serde_json::from_str(&nan.to_json().unwrap()).unwrap();
    assert_eq!(restored.trust.trust_tier, nan.trust.trust_tier);
    assert_eq!(restored.analytical.skewness.len(), nan.analytical.skewness.len());
}

#[test]
fn test_sampled_evaluation_is_deterministic() {
    let rows: u32 = 1_000;
    let x: Vec<f64> = (0..rows).map(|i| f64::from(i % 97)).collect();
    let y: Vec<f64> = (0..rows).map(|i| f64::from((i * 31) % 101)).collect();
    let profile = ProfileBuilder::new("csv")
        .profiled_at(fixed_time())
        .numeric("x", numbers(x))
        .numeric("y", numbers(y))
        .build()
        .unwrap();

    let config = EngineConfig::builder()
        .sampling(SamplingPolicy {
            max_rows: 300,
            ..SamplingPolicy::default()
        })
        .build()
        .unwrap();
    let engine = TrustEngine::new(config).unwrap();
    let first = engine.evaluate(&profile).unwrap();
    let second = engine.evaluate(&profile).unwrap();
    assert_eq!(first, second);

    // stride ⌈1000 / 300⌉ = 4 keeps ⌈1000 / 4⌉ rows
    let sampled = rows.div_ceil(rows.div_ceil(300)) as f64;
    assert_eq!(sampled, 250.0);
    assert_eq!(first.structural.result.metric("sampled_rows"), Some(sampled));
    assert_eq!(first.analytical.result.metric("sampled_rows"), Some(sampled));
    assert_eq!(first.structural.result.metric("row_count"), Some(1_000.0));
}

