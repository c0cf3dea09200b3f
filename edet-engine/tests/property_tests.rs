//! Property-based tests for the trust engine.
//!
//! These check invariants that must hold for every profile:
//! - every dimension score and the EDTI lie in `[0, 1]`
//! - renormalized weights sum to 1
//! - tiers are monotonic in the EDTI and respect the sensitivity cap
//! - adding missing cells never raises the structural score

use chrono::{TimeZone, Utc};
use edet_engine::analyzers::{
    AnalysisContext, Dimension, DimensionAnalyzer, SamplingPolicy, SensitivityLevel,
    StructuralAnalyzer,
};
use edet_engine::config::EngineConfig;
use edet_engine::engine::{SensitivityCap, TierBands, TrustEngine, TrustTier, TrustWeights};
use edet_engine::profile::{DatasetProfile, ProfileBuilder};
use proptest::prelude::*;

fn numeric_column() -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(prop::option::weighted(0.8, -1_000.0f64..1_000.0), 0..40)
}

fn sensitivity() -> impl Strategy<Value = SensitivityLevel> {
    prop_oneof![
        Just(SensitivityLevel::Low),
        Just(SensitivityLevel::Moderate),
        Just(SensitivityLevel::High),
    ]
}

/// Profile with a unique sequence column and one text column, so rows can
/// never collide and only missingness moves the structural score.
fn sequence_profile(labels: &[Option<String>]) -> DatasetProfile {
    let seq = (0..labels.len()).map(|i| Some(i as f64)).collect();
    ProfileBuilder::new("memory")
        .profiled_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .numeric("seq", seq)
        .categorical("label", labels.to_vec())
        .build()
        .unwrap()
}

fn structural_score(profile: &DatasetProfile) -> f64 {
    let sampling = SamplingPolicy::default();
    StructuralAnalyzer::new()
        .analyze(&AnalysisContext::new(profile, &sampling))
        .result
        .score()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_scores_are_bounded(
        (a, b, c) in (0usize..30).prop_flat_map(|n| (
            prop::collection::vec(prop::option::weighted(0.8, -1_000.0f64..1_000.0), n),
            prop::collection::vec(prop::option::weighted(0.8, 0.0f64..50.0), n),
            prop::collection::vec(prop::option::weighted(0.7, "[a-c]{1,3}"), n),
        ))
    ) {
        let profile = ProfileBuilder::new("memory")
            .numeric("revenue", a)
            .numeric("profit", b)
            .text("note", c)
            .build()
            .unwrap();
        let bundle = TrustEngine::new(EngineConfig::default())
            .unwrap()
            .evaluate(&profile)
            .unwrap();

        for dimension in Dimension::ALL {
            let score = bundle.result(dimension).score();
            prop_assert!((0.0..=1.0).contains(&score), "{dimension} score {score}");
        }
        prop_assert!((0.0..=1.0).contains(&bundle.trust.edti_score));
        for risk in bundle.trust.risk_heatmap.values() {
            prop_assert!((0.0..=1.0).contains(risk));
        }
    }

    #[test]
    fn prop_single_numeric_column_bounded(values in numeric_column()) {
        let profile = ProfileBuilder::new("memory")
            .numeric("x", values)
            .build()
            .unwrap();
        let bundle = TrustEngine::new(EngineConfig::default())
            .unwrap()
            .evaluate(&profile)
            .unwrap();
        prop_assert!((0.0..=1.0).contains(&bundle.trust.edti_score));
        prop_assert!((0.0..=1.0).contains(&bundle.analytical.preparation_complexity));
    }

    #[test]
    fn prop_renormalized_weights_sum_to_one(
        mask in prop::collection::vec(any::<bool>(), 5),
        raw in prop::collection::vec(0.01f64..1.0, 5),
    ) {
        let weights = TrustWeights {
            structural: raw[0],
            governance: raw[1],
            operational: raw[2],
            logical: raw[3],
            analytical: raw[4],
        };
        let available: Vec<Dimension> = Dimension::ALL
            .into_iter()
            .zip(mask)
            .filter_map(|(d, keep)| keep.then_some(d))
            .collect();
        let used = weights.renormalize(&available);
        if available.is_empty() {
            prop_assert!(used.is_empty());
        } else {
            prop_assert!((used.values().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_tier_monotonic_in_edti(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let bands = TierBands::default();
        prop_assert!(bands.tier_for(low) <= bands.tier_for(high));
    }

    #[test]
    fn prop_sensitivity_cap(edti in 0.0f64..=1.0, level in sensitivity()) {
        let cap = SensitivityCap::default();
        let uncapped = TierBands::default().tier_for(edti);
        let (tier, capped) = cap.apply(uncapped, level);
        prop_assert!(tier <= uncapped);
        if level == SensitivityLevel::High {
            prop_assert!(tier <= TrustTier::ReviewRecommended);
        } else {
            prop_assert_eq!(tier, uncapped);
            prop_assert!(!capped);
        }
    }

    #[test]
    fn prop_more_missing_never_raises_structural(
        (labels, target) in prop::collection::vec(
            prop::option::weighted(0.7, "[a-z]{1,4}"), 1..40
        ).prop_flat_map(|labels| {
            let n = labels.len();
            (Just(labels), 0..n)
        })
    ) {
        let before = sequence_profile(&labels);
        let mut masked = labels.clone();
        masked[target] = None;
        let after = sequence_profile(&masked);
        prop_assert!(structural_score(&after) <= structural_score(&before) + 1e-12);
    }

    #[test]
    fn prop_evaluation_deterministic(values in numeric_column()) {
        let profile = ProfileBuilder::new("memory")
            .profiled_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .numeric("amount", values)
            .build()
            .unwrap();
        let engine = TrustEngine::new(EngineConfig::default()).unwrap();
        let first = engine.evaluate(&profile).unwrap();
        let second = engine.evaluate(&profile).unwrap();
        prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }
}
