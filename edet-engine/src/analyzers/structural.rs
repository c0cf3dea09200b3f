//! Structural integrity: missingness, duplication, redundancy and keys.
//!
//! ```text
//! structural_score = 1 − (0.5·missing_rate + 0.3·duplicate_rate
//!                         + 0.2·redundant_feature_count / column_count)
//! ```
//!
//! Missingness and duplicates read every row. Redundancy uses the sampled
//! rows and at most `max_numeric_columns` numeric columns. Candidate keys are
//! informational and never affect the score.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::context::AnalysisContext;
use super::stats::{clamp_unit, pearson};
use super::traits::{Assessment, DimensionAnalyzer};
use super::types::{Dimension, FlagCode, RiskFlag, ScoreResult, Severity};
use crate::profile::{CellKey, ColumnValues, DatasetProfile};

/// Thresholds and weights for structural scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralConfig {
    /// Per-column missing fraction above which `HighMissingness` is raised (default: 0.30)
    pub column_missing_threshold: f64,
    /// Duplicate row rate above which `DuplicateRows` is raised (default: 0.05)
    pub duplicate_threshold: f64,
    /// Minimum |r| for a redundant numeric pair (default: 0.95)
    pub redundancy_correlation: f64,
    pub missing_weight: f64,
    pub duplicate_weight: f64,
    pub redundancy_weight: f64,
}

impl Default for StructuralConfig {
    fn default() -> Self {
        Self {
            column_missing_threshold: 0.30,
            duplicate_threshold: 0.05,
            redundancy_correlation: 0.95,
            missing_weight: 0.5,
            duplicate_weight: 0.3,
            redundancy_weight: 0.2,
        }
    }
}

/// Two numeric columns that carry the same information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedundantPair {
    pub first: String,
    pub second: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralAssessment {
    pub result: ScoreResult,
    pub redundant_pairs: Vec<RedundantPair>,
    /// Single columns, or minimal column pairs, that uniquely identify rows
    pub candidate_keys: Vec<Vec<String>>,
    /// Set when the dataset has no rows; the score is then not aggregated
    pub empty_dataset: bool,
}

impl Assessment for StructuralAssessment {
    fn result(&self) -> &ScoreResult {
        &self.result
    }

    fn aggregate_score(&self) -> Option<f64> {
        (!self.empty_dataset).then(|| self.result.score())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructuralAnalyzer {
    config: StructuralConfig,
}

impl StructuralAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StructuralConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StructuralConfig {
        &self.config
    }

    fn redundant_pairs(&self, ctx: &AnalysisContext<'_>) -> Vec<RedundantPair> {
        let sample = ctx.row_sample();
        let numeric: Vec<_> = ctx
            .profile
            .numeric_columns()
            .take(ctx.sampling.max_numeric_columns)
            .collect();

        let mut pairs = Vec::new();
        for (i, (first, x)) in numeric.iter().enumerate() {
            for (second, y) in numeric.iter().skip(i + 1) {
                let (xs, ys): (Vec<f64>, Vec<f64>) = sample
                    .rows()
                    .filter_map(|row| match (x[row], y[row]) {
                        (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((a, b)),
                        _ => None,
                    })
                    .unzip();
                if let Some(r) = pearson(&xs, &ys) {
                    if r.abs() >= self.config.redundancy_correlation {
                        crate::log_analyzer!(
                            ctx.log,
                            first = %first.name,
                            second = %second.name,
                            correlation = r,
                            "Redundant numeric pair"
                        );
                        pairs.push(RedundantPair {
                            first: first.name.clone(),
                            second: second.name.clone(),
                            correlation: r,
                        });
                    }
                }
            }
        }
        pairs
    }
}

impl DimensionAnalyzer for StructuralAnalyzer {
    type Output = StructuralAssessment;

    fn dimension(&self) -> Dimension {
        Dimension::Structural
    }

    fn description(&self) -> &str {
        "Missingness, duplicate rows, redundant features and candidate keys"
    }

    #[instrument(
        skip(self, ctx),
        fields(rows = ctx.profile.row_count(), columns = ctx.profile.column_count())
    )]
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> StructuralAssessment {
        let profile = ctx.profile;
        if profile.is_empty() {
            info!("Dataset has no rows, structural score excluded");
            return StructuralAssessment {
                result: ScoreResult::new(0.0)
                    .with_flag(RiskFlag::new(
                        FlagCode::EmptyDataset,
                        Severity::High,
                        "Dataset contains no rows",
                    ))
                    .with_metric("row_count", 0.0)
                    .with_metric("column_count", profile.column_count() as f64),
                redundant_pairs: Vec::new(),
                candidate_keys: Vec::new(),
                empty_dataset: true,
            };
        }

        let rows = profile.row_count();
        let cols = profile.column_count();
        let mut flags = Vec::new();

        let missing_rate = profile.missing_rate();
        let sparse: Vec<&str> = profile
            .columns()
            .iter()
            .filter(|c| c.missing_fraction(rows) > self.config.column_missing_threshold)
            .map(|c| c.name.as_str())
            .collect();
        if !sparse.is_empty() {
            flags.push(
                RiskFlag::new(
                    FlagCode::HighMissingness,
                    Severity::Medium,
                    format!(
                        "{} column(s) are more than {:.0}% empty",
                        sparse.len(),
                        self.config.column_missing_threshold * 100.0
                    ),
                )
                .with_columns(sparse),
            );
        }

        let duplicate_rows = count_duplicate_rows(profile);
        let duplicate_rate = duplicate_rows as f64 / rows as f64;
        if duplicate_rate > self.config.duplicate_threshold {
            flags.push(RiskFlag::new(
                FlagCode::DuplicateRows,
                Severity::Medium,
                format!(
                    "{duplicate_rows} duplicate row(s) ({:.1}% of rows)",
                    duplicate_rate * 100.0
                ),
            ));
        }

        let redundant_pairs = self.redundant_pairs(ctx);
        let redundant_columns: BTreeSet<&str> = redundant_pairs
            .iter()
            .flat_map(|p| [p.first.as_str(), p.second.as_str()])
            .collect();
        for pair in &redundant_pairs {
            flags.push(
                RiskFlag::new(
                    FlagCode::RedundantFeature,
                    Severity::Medium,
                    format!(
                        "'{}' and '{}' are highly correlated (r = {:.3})",
                        pair.first, pair.second, pair.correlation
                    ),
                )
                .with_columns([pair.first.as_str(), pair.second.as_str()]),
            );
        }

        let empty_columns: Vec<&str> = profile
            .columns()
            .iter()
            .filter(|c| c.missing_count == rows)
            .map(|c| c.name.as_str())
            .collect();
        if !empty_columns.is_empty() {
            flags.push(
                RiskFlag::new(
                    FlagCode::EmptyColumn,
                    Severity::Low,
                    format!("{} column(s) contain no values", empty_columns.len()),
                )
                .with_columns(empty_columns),
            );
        }

        let constant_columns: Vec<&str> = profile
            .columns()
            .iter()
            .filter(|c| rows > 1 && c.distinct_count == 1)
            .map(|c| c.name.as_str())
            .collect();
        if !constant_columns.is_empty() {
            flags.push(
                RiskFlag::new(
                    FlagCode::ConstantColumn,
                    Severity::Low,
                    format!("{} column(s) hold a single value", constant_columns.len()),
                )
                .with_columns(constant_columns),
            );
        }

        let candidate_keys = candidate_keys(profile, ctx.sampling.max_key_columns);

        let redundancy_ratio = redundant_columns.len() as f64 / cols as f64;
        let score = 1.0
            - (self.config.missing_weight * missing_rate
                + self.config.duplicate_weight * duplicate_rate
                + self.config.redundancy_weight * redundancy_ratio);

        let result = ScoreResult::new(clamp_unit(score))
            .with_flags(flags)
            .with_metric("row_count", rows as f64)
            .with_metric("column_count", cols as f64)
            .with_metric("missing_rate", missing_rate)
            .with_metric("duplicate_row_count", duplicate_rows as f64)
            .with_metric("duplicate_rate", duplicate_rate)
            .with_metric("redundant_pair_count", redundant_pairs.len() as f64)
            .with_metric("redundant_feature_count", redundant_columns.len() as f64)
            .with_metric("candidate_key_count", candidate_keys.len() as f64)
            .with_metric("sampled_rows", ctx.row_sample().len() as f64);

        info!(
            score = result.score(),
            missing_rate,
            duplicate_rate,
            redundant = redundant_columns.len(),
            "Structural analysis complete"
        );

        StructuralAssessment {
            result,
            redundant_pairs,
            candidate_keys,
            empty_dataset: false,
        }
    }
}

/// Rows identical (nulls included) to an earlier row.
fn count_duplicate_rows(profile: &DatasetProfile) -> usize {
    let columns: Vec<&ColumnValues> = profile.iter_columns().map(|(_, v)| v).collect();
    let mut seen: HashSet<Vec<CellKey<'_>>> = HashSet::with_capacity(profile.row_count());
    (0..profile.row_count())
        .filter(|&row| {
            let key: Vec<CellKey<'_>> = columns.iter().map(|c| c.cell(row)).collect();
            !seen.insert(key)
        })
        .count()
}

/// Single-column keys, or jointly unique pairs of complete columns when no
/// single key exists.
fn candidate_keys(profile: &DatasetProfile, max_key_columns: usize) -> Vec<Vec<String>> {
    let rows = profile.row_count();
    let singles: Vec<Vec<String>> = profile
        .columns()
        .iter()
        .filter(|c| c.is_unique_key(rows))
        .map(|c| vec![c.name.clone()])
        .collect();
    if !singles.is_empty() {
        return singles;
    }

    let complete: Vec<_> = profile
        .iter_columns()
        .filter(|(meta, _)| meta.missing_count == 0 && meta.distinct_count > 1)
        .take(max_key_columns)
        .collect();

    let mut keys = Vec::new();
    for (i, (a_meta, a)) in complete.iter().enumerate() {
        for (b_meta, b) in complete.iter().skip(i + 1) {
            if a_meta.distinct_count.saturating_mul(b_meta.distinct_count) < rows {
                continue;
            }
            let mut seen = HashSet::with_capacity(rows);
            let unique = (0..rows).all(|row| seen.insert((a.cell(row), b.cell(row))));
            if unique {
                keys.push(vec![a_meta.name.clone(), b_meta.name.clone()]);
            }
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::SamplingPolicy;
    use crate::profile::ProfileBuilder;

    fn analyze(profile: &DatasetProfile) -> StructuralAssessment {
        analyze_sampled(profile, &SamplingPolicy::default())
    }

    fn analyze_sampled(
        profile: &DatasetProfile,
        sampling: &SamplingPolicy,
    ) -> StructuralAssessment {
        StructuralAnalyzer::new().analyze(&AnalysisContext::new(profile, sampling))
    }

    fn text(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_clean_dataset_scores_one() {
        let profile = ProfileBuilder::new("memory")
            .numeric("id", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)])
            .numeric("v", vec![Some(3.0), Some(1.0), Some(4.0), Some(1.0)])
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert_eq!(assessment.result.score(), 1.0);
        assert!(assessment.result.flags().is_empty());
        assert_eq!(assessment.candidate_keys, vec![vec!["id".to_string()]]);
    }

    #[test]
    fn test_empty_dataset() {
        let profile = ProfileBuilder::new("memory")
            .numeric("x", vec![])
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert_eq!(assessment.result.score(), 0.0);
        assert_eq!(assessment.result.flags().len(), 1);
        assert!(assessment.result.has_flag("EmptyDataset"));
        assert_eq!(assessment.aggregate_score(), None);
    }

    #[test]
    fn test_missingness_penalty() {
        // 4 of 8 cells missing, x is 100% empty
        let profile = ProfileBuilder::new("memory")
            .numeric("x", vec![None, None, None, None])
            .numeric("y", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)])
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert!((assessment.result.metric("missing_rate").unwrap() - 0.5).abs() < 1e-12);
        assert!((assessment.result.score() - 0.75).abs() < 1e-12);
        assert!(assessment.result.has_flag("HighMissingness"));
        assert!(assessment.result.has_flag("EmptyColumn"));
    }

    #[test]
    fn test_duplicates_with_nulls_compare_equal() {
        let profile = ProfileBuilder::new("memory")
            .numeric("a", vec![Some(1.0), Some(1.0), None, None, Some(2.0)])
            .text("b", vec![Some("x".into()), Some("x".into()), None, None, Some("y".into())])
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert_eq!(assessment.result.metric("duplicate_row_count"), Some(2.0));
        assert!(assessment.result.has_flag("DuplicateRows"));
    }

    #[test]
    fn test_redundant_pair_reported_once() {
        let x: Vec<Option<f64>> = (0..20).map(|i| Some(i as f64)).collect();
        let y: Vec<Option<f64>> = (0..20).map(|i| Some(2.0 * i as f64 + 1.0)).collect();
        let profile = ProfileBuilder::new("memory")
            .numeric("x", x)
            .numeric("y", y)
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert_eq!(assessment.redundant_pairs.len(), 1);
        assert_eq!(assessment.result.flags_named("RedundantFeature").count(), 1);
        assert_eq!(assessment.result.metric("redundant_feature_count"), Some(2.0));
        // 1 − 0.2 × 2/2
        assert!((assessment.result.score() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_composite_key_when_no_single_key() {
        let profile = ProfileBuilder::new("memory")
            .categorical("region", text(&["n", "n", "s", "s"]))
            .categorical("month", text(&["jan", "feb", "jan", "feb"]))
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert_eq!(
            assessment.candidate_keys,
            vec![vec!["region".to_string(), "month".to_string()]]
        );
        assert_eq!(assessment.result.score(), 1.0);
    }

    #[test]
    fn test_constant_column_flag() {
        let profile = ProfileBuilder::new("memory")
            .numeric("c", vec![Some(7.0), Some(7.0), Some(7.0)])
            .numeric("id", vec![Some(1.0), Some(2.0), Some(3.0)])
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert!(assessment.result.has_flag("ConstantColumn"));
        assert_eq!(assessment.result.score(), 1.0);
    }

    #[test]
    fn test_missingness_threshold_is_exclusive() {
        let at_threshold: Vec<Option<f64>> = (0..10)
            .map(|i| if i < 3 { None } else { Some(i as f64) })
            .collect();
        let above_threshold: Vec<Option<f64>> = (0..10)
            .map(|i| if i < 4 { None } else { Some(i as f64) })
            .collect();
        let id: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64)).collect();

        let profile = ProfileBuilder::new("memory")
            .numeric("id", id.clone())
            .numeric("x", at_threshold)
            .build()
            .unwrap();
        assert!(!analyze(&profile).result.has_flag("HighMissingness"));

        let profile = ProfileBuilder::new("memory")
            .numeric("id", id)
            .numeric("x", above_threshold)
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        let flags: Vec<_> = assessment.result.flags_named("HighMissingness").collect();
        assert_eq!(flags.len(), 1);
        assert!(flags[0].affected_columns.contains("x"));
        assert!(!flags[0].affected_columns.contains("id"));
    }

    #[test]
    fn test_redundancy_reads_only_sampled_rows() {
        // y follows x on rows 0, 3, 6, 9 and diverges elsewhere
        let x: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64)).collect();
        let y: Vec<Option<f64>> = (0..10)
            .map(|i| Some(if i % 3 == 0 { i as f64 } else { 100.0 - 10.0 * i as f64 }))
            .collect();
        let profile = ProfileBuilder::new("memory")
            .numeric("x", x)
            .numeric("y", y)
            .build()
            .unwrap();

        let full = analyze(&profile);
        assert!(full.redundant_pairs.is_empty());
        assert_eq!(full.result.metric("sampled_rows"), Some(10.0));

        let sampling = SamplingPolicy {
            max_rows: 4,
            ..SamplingPolicy::default()
        };
        let sampled = analyze_sampled(&profile, &sampling);
        assert_eq!(sampled.redundant_pairs.len(), 1);
        assert_eq!(sampled.result.metric("sampled_rows"), Some(4.0));
        // missingness and duplicates still read every row
        assert_eq!(sampled.result.metric("row_count"), Some(10.0));
    }

    #[test]
    fn test_numeric_column_cap_limits_redundancy() {
        let a: Vec<Option<f64>> = (0..20).map(|i| Some(i as f64)).collect();
        let b: Vec<Option<f64>> = (0..20).map(|i| Some(((i * 7) % 11) as f64)).collect();
        let c: Vec<Option<f64>> = (0..20).map(|i| Some(2.0 * i as f64 + 1.0)).collect();
        let profile = ProfileBuilder::new("memory")
            .numeric("a", a)
            .numeric("b", b)
            .numeric("c", c)
            .build()
            .unwrap();

        assert_eq!(analyze(&profile).redundant_pairs.len(), 1);

        let sampling = SamplingPolicy {
            max_numeric_columns: 2,
            ..SamplingPolicy::default()
        };
        assert!(analyze_sampled(&profile, &sampling).redundant_pairs.is_empty());
    }

    #[test]
    fn test_key_column_cap_limits_composite_keys() {
        let profile = ProfileBuilder::new("memory")
            .categorical("region", text(&["n", "n", "s", "s"]))
            .categorical("month", text(&["jan", "feb", "jan", "feb"]))
            .build()
            .unwrap();
        let sampling = SamplingPolicy {
            max_key_columns: 1,
            ..SamplingPolicy::default()
        };
        assert!(analyze_sampled(&profile, &sampling).candidate_keys.is_empty());
    }

    #[test]
    fn test_nan_cell_does_not_hide_redundancy() {
        let x: Vec<Option<f64>> = (0..20).map(|i| Some(i as f64)).collect();
        let y: Vec<Option<f64>> = (0..20)
            .map(|i| Some(if i == 5 { f64::NAN } else { 2.0 * i as f64 + 1.0 }))
            .collect();
        let profile = ProfileBuilder::new("memory")
            .numeric("x", x)
            .numeric("y", y)
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert_eq!(assessment.redundant_pairs.len(), 1);
        assert!(assessment.redundant_pairs[0].correlation.is_finite());
    }
}
