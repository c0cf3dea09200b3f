//! Analytical utility: how much preparation the numeric data needs.
//!
//! ```text
//! analytics_utility_score = ⅓(1 − normalized_skew)
//!                         + ⅓(1 − multicollinearity_penalty)
//!                         + ⅓(1 − anomaly_density)
//! preparation_complexity  = mean(missing_rate, normalized_skew, anomaly_density)
//! ```
//!
//! Preparation complexity is reported, never blended into the score.
//! Skew, VIF and anomaly statistics read the sampled rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::context::{AnalysisContext, RowSample};
use super::stats::{
    correlation_matrix, invert_matrix, iqr_outlier_fraction, mean, population_variance, skewness,
};
use super::traits::{Assessment, DimensionAnalyzer};
use super::types::{Dimension, FlagCode, RiskFlag, ScoreResult, Severity};
use crate::profile::ColumnMeta;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticalConfig {
    /// |skew| above which a column is flagged `HighSkew` (default: 2.0)
    pub high_skew_threshold: f64,
    /// Average |skew| at which the skew component bottoms out (default: 4.0)
    pub skew_normalizer: f64,
    /// VIF above which a column is flagged (default: 10.0)
    pub vif_threshold: f64,
    /// Anomaly density above which `AnomalyDensity` is raised (default: 0.10)
    pub anomaly_threshold: f64,
    /// Score when the dataset has no numeric columns (default: 0.5)
    pub neutral_score: f64,
}

impl Default for AnalyticalConfig {
    fn default() -> Self {
        Self {
            high_skew_threshold: 2.0,
            skew_normalizer: 4.0,
            vif_threshold: 10.0,
            anomaly_threshold: 0.10,
            neutral_score: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticalAssessment {
    pub result: ScoreResult,
    pub preparation_complexity: f64,
    pub anomaly_density: f64,
    pub skewness: BTreeMap<String, f64>,
    pub vif: BTreeMap<String, f64>,
    pub high_skew_columns: Vec<String>,
    pub high_vif_columns: Vec<String>,
    pub low_variance_columns: Vec<String>,
    /// Set when the dataset has no rows; the score is then not aggregated
    pub empty_dataset: bool,
}

impl AnalyticalAssessment {
    fn neutral(result: ScoreResult, preparation_complexity: f64, empty_dataset: bool) -> Self {
        Self {
            result,
            preparation_complexity,
            anomaly_density: 0.0,
            skewness: BTreeMap::new(),
            vif: BTreeMap::new(),
            high_skew_columns: Vec::new(),
            high_vif_columns: Vec::new(),
            low_variance_columns: Vec::new(),
            empty_dataset,
        }
    }
}

impl Assessment for AnalyticalAssessment {
    fn result(&self) -> &ScoreResult {
        &self.result
    }

    fn aggregate_score(&self) -> Option<f64> {
        (!self.empty_dataset).then(|| self.result.score())
    }
}

/// Outcome of the variance inflation computation.
#[derive(Debug, Default)]
struct VifOutcome {
    values: BTreeMap<String, f64>,
    singular: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticalAnalyzer {
    config: AnalyticalConfig,
}

impl AnalyticalAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyticalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticalConfig {
        &self.config
    }

    /// VIF per column from the diagonal of the inverse correlation matrix.
    ///
    /// Uses sampled rows where every candidate column is present. Columns
    /// with zero variance on those rows are left out and get VIF 1.
    fn variance_inflation(
        &self,
        columns: &[(&ColumnMeta, &[Option<f64>])],
        sample: RowSample,
    ) -> VifOutcome {
        let mut outcome = VifOutcome {
            values: columns.iter().map(|(m, _)| (m.name.clone(), 1.0)).collect(),
            singular: false,
        };
        if columns.len() < 2 {
            return outcome;
        }

        let complete_rows: Vec<usize> = sample
            .rows()
            .filter(|&row| {
                columns
                    .iter()
                    .all(|(_, v)| v[row].is_some_and(f64::is_finite))
            })
            .collect();

        let series: Vec<(&str, Vec<f64>)> = columns
            .iter()
            .map(|(meta, values)| {
                let series = complete_rows.iter().filter_map(|&row| values[row]).collect();
                (meta.name.as_str(), series)
            })
            .filter(|(_, series): &(&str, Vec<f64>)| {
                population_variance(series).is_some_and(|v| v > f64::EPSILON)
            })
            .collect();

        let k = series.len();
        if k < 2 || complete_rows.len() < (k + 1).max(3) {
            debug!(
                columns = k,
                complete_rows = complete_rows.len(),
                "Too few columns or rows for VIF"
            );
            return outcome;
        }

        let data: Vec<Vec<f64>> = series.iter().map(|(_, s)| s.clone()).collect();
        let Some(inverse) = invert_matrix(&correlation_matrix(&data)) else {
            outcome.singular = true;
            return outcome;
        };

        for (i, (name, _)) in series.iter().enumerate() {
            let vif = inverse[i][i];
            if vif.is_finite() {
                outcome.values.insert((*name).to_string(), vif.max(1.0));
            }
        }
        outcome
    }
}

impl DimensionAnalyzer for AnalyticalAnalyzer {
    type Output = AnalyticalAssessment;

    fn dimension(&self) -> Dimension {
        Dimension::Analytical
    }

    fn description(&self) -> &str {
        "Skew, multicollinearity and anomaly density of numeric columns"
    }

    #[instrument(skip(self, ctx), fields(rows = ctx.profile.row_count()))]
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> AnalyticalAssessment {
        let profile = ctx.profile;
        let missing_rate = profile.missing_rate();

        if profile.is_empty() {
            info!("Dataset has no rows, analytical score excluded");
            let result = ScoreResult::new(0.0).with_flag(RiskFlag::new(
                FlagCode::EmptyDataset,
                Severity::High,
                "Dataset contains no rows",
            ));
            return AnalyticalAssessment::neutral(result, 0.0, true);
        }

        let numeric: Vec<_> = profile.numeric_columns().collect();
        if numeric.is_empty() {
            info!("No numeric columns, analytical score is neutral");
            let preparation = missing_rate / 3.0;
            let result = ScoreResult::new(self.config.neutral_score)
                .with_flag(RiskFlag::new(
                    FlagCode::NoNumericColumns,
                    Severity::Low,
                    "No numeric columns; analytical utility cannot be measured",
                ))
                .with_metric("preparation_complexity", preparation);
            return AnalyticalAssessment::neutral(result, preparation, false);
        }

        let sample = ctx.row_sample();
        let mut skews = BTreeMap::new();
        let mut anomaly_fractions = Vec::new();
        let mut low_variance_columns = Vec::new();
        let mut high_skew_columns = Vec::new();

        for (meta, values) in &numeric {
            let present = sample.present_values(values);
            let constant = population_variance(&present).is_some_and(|v| v <= f64::EPSILON);
            if present.len() >= 2 && constant {
                low_variance_columns.push(meta.name.clone());
            }
            if let Some(skew) = skewness(&present) {
                if skew.abs() > self.config.high_skew_threshold {
                    high_skew_columns.push(meta.name.clone());
                }
                skews.insert(meta.name.clone(), skew);
            }
            if let Some(fraction) = iqr_outlier_fraction(&present) {
                anomaly_fractions.push(fraction);
            }
            crate::perf_debug!(
                ctx.log,
                column = %meta.name,
                values = present.len(),
                "Profiled numeric distribution"
            );
        }

        let abs_skews: Vec<f64> = skews.values().map(|s| s.abs()).collect();
        let avg_abs_skew = mean(&abs_skews).unwrap_or(0.0);
        let normalized_skew = (avg_abs_skew / self.config.skew_normalizer).min(1.0);
        let anomaly_density = mean(&anomaly_fractions).unwrap_or(0.0);

        let vif_columns: Vec<_> = numeric
            .iter()
            .take(ctx.sampling.max_numeric_columns)
            .copied()
            .collect();
        let vif = self.variance_inflation(&vif_columns, sample);
        let high_vif_columns: Vec<String> = vif
            .values
            .iter()
            .filter(|(_, v)| **v > self.config.vif_threshold)
            .map(|(name, _)| name.clone())
            .collect();
        let multicollinearity_penalty = high_vif_columns.len() as f64 / numeric.len() as f64;

        let preparation_complexity = (missing_rate + normalized_skew + anomaly_density) / 3.0;
        let score = ((1.0 - normalized_skew)
            + (1.0 - multicollinearity_penalty)
            + (1.0 - anomaly_density))
            / 3.0;

        let mut flags = Vec::new();
        if !high_skew_columns.is_empty() {
            flags.push(
                RiskFlag::new(
                    FlagCode::HighSkew,
                    Severity::Medium,
                    format!(
                        "{} column(s) with |skew| above {}",
                        high_skew_columns.len(),
                        self.config.high_skew_threshold
                    ),
                )
                .with_columns(high_skew_columns.iter().cloned()),
            );
        }
        if !high_vif_columns.is_empty() {
            flags.push(
                RiskFlag::new(
                    FlagCode::Multicollinearity,
                    Severity::Medium,
                    format!(
                        "{} column(s) with VIF above {}",
                        high_vif_columns.len(),
                        self.config.vif_threshold
                    ),
                )
                .with_columns(high_vif_columns.iter().cloned()),
            );
        }
        if vif.singular {
            flags.push(
                RiskFlag::new(
                    FlagCode::SingularCorrelationMatrix,
                    Severity::Low,
                    "Correlation matrix is singular; VIF defaults to 1",
                )
                .with_columns(vif_columns.iter().map(|(m, _)| m.name.as_str())),
            );
        }
        if anomaly_density > self.config.anomaly_threshold {
            flags.push(RiskFlag::new(
                FlagCode::AnomalyDensity,
                Severity::Medium,
                format!(
                    "{:.1}% of numeric values fall outside the 1.5×IQR fence",
                    anomaly_density * 100.0
                ),
            ));
        }
        if !low_variance_columns.is_empty() {
            flags.push(
                RiskFlag::new(
                    FlagCode::LowVariance,
                    Severity::Low,
                    format!("{} numeric column(s) are constant", low_variance_columns.len()),
                )
                .with_columns(low_variance_columns.iter().cloned()),
            );
        }

        let result = ScoreResult::new(score)
            .with_flags(flags)
            .with_metric("avg_abs_skew", avg_abs_skew)
            .with_metric("normalized_skew", normalized_skew)
            .with_metric("multicollinearity_penalty", multicollinearity_penalty)
            .with_metric("anomaly_density", anomaly_density)
            .with_metric("preparation_complexity", preparation_complexity)
            .with_metric("sampled_rows", sample.len() as f64);

        info!(
            score = result.score(),
            avg_abs_skew,
            high_vif = high_vif_columns.len(),
            anomaly_density,
            "Analytical analysis complete"
        );

        AnalyticalAssessment {
            result,
            preparation_complexity,
            anomaly_density,
            skewness: skews,
            vif: vif.values,
            high_skew_columns,
            high_vif_columns,
            low_variance_columns,
            empty_dataset: false,
        }
    }
}
