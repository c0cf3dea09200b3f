//! Operational reliability: freshness, supply gaps and volume stability.
//!
//! The expected cadence is the median positive interval between consecutive
//! timestamps. Lag and gaps are measured in cadences so that daily, hourly
//! and monthly feeds share one set of thresholds.
//!
//! ```text
//! score = 0.3·(1 − normalized_lag) + 0.3·(1 − gap_rate) + 0.4·volume_stability
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::context::AnalysisContext;
use super::stats::{clamp_unit, coefficient_of_variation, median};
use super::traits::{Assessment, DimensionAnalyzer};
use super::types::{Dimension, FlagCode, RiskFlag, ScoreResult, Severity};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Thresholds and weights for operational scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationalConfig {
    /// Temporal column to use; defaults to the first temporal column
    pub temporal_column: Option<String>,
    /// Lag, in cadences, at which the lag component reaches zero (default: 30)
    pub max_lag_cadences: f64,
    /// Lag, in cadences, above which `StaleData` is raised (default: 3)
    pub stale_after_cadences: f64,
    /// An interval longer than this many cadences is a gap (default: 2)
    pub gap_multiplier: f64,
    /// Gaps tolerated before `SupplyGaps` is raised (default: 0)
    pub max_gap_count: usize,
    /// Upper bound on volume buckets (default: 10)
    pub volume_buckets: usize,
    /// Stability below which `VolumeInstability` is raised (default: 0.5)
    pub min_volume_stability: f64,
    /// Cadence used when every timestamp coincides (default: one day)
    pub fallback_cadence_secs: f64,
    /// Score when no usable temporal column exists (default: 0.5)
    pub neutral_score: f64,
    pub lag_weight: f64,
    pub gap_weight: f64,
    pub volume_weight: f64,
}

impl Default for OperationalConfig {
    fn default() -> Self {
        Self {
            temporal_column: None,
            max_lag_cadences: 30.0,
            stale_after_cadences: 3.0,
            gap_multiplier: 2.0,
            max_gap_count: 0,
            volume_buckets: 10,
            min_volume_stability: 0.5,
            fallback_cadence_secs: SECONDS_PER_DAY,
            neutral_score: 0.5,
            lag_weight: 0.3,
            gap_weight: 0.3,
            volume_weight: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalAssessment {
    pub result: ScoreResult,
    /// Temporal column the assessment is based on
    pub temporal_column: Option<String>,
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Time between the last timestamp and the reference time, in days
    pub lag_days: Option<f64>,
}

impl Assessment for OperationalAssessment {
    fn result(&self) -> &ScoreResult {
        &self.result
    }
}

#[derive(Debug, Clone, Default)]
pub struct OperationalAnalyzer {
    config: OperationalConfig,
}

impl OperationalAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OperationalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OperationalConfig {
        &self.config
    }

    fn neutral(
        &self,
        code: FlagCode,
        message: String,
        column: Option<String>,
    ) -> OperationalAssessment {
        let mut flag = RiskFlag::new(code, Severity::Low, message);
        if let Some(ref column) = column {
            flag = flag.with_columns([column.as_str()]);
        }
        OperationalAssessment {
            result: ScoreResult::new(self.config.neutral_score).with_flag(flag),
            temporal_column: column,
            last_timestamp: None,
            lag_days: None,
        }
    }

    /// Volume stability over equal-width buckets spanning the sorted timestamps.
    fn volume_stability(&self, timestamps: &[DateTime<Utc>]) -> f64 {
        let (Some(first), Some(last)) = (timestamps.first(), timestamps.last()) else {
            return 1.0;
        };
        let span = seconds_between(*first, *last);
        if span <= 0.0 {
            return 1.0;
        }
        let buckets = self.config.volume_buckets.min(timestamps.len()).max(1);
        let width = span / buckets as f64;

        let mut counts = vec![0.0; buckets];
        for ts in timestamps {
            let index = (seconds_between(*first, *ts) / width) as usize;
            counts[index.min(buckets - 1)] += 1.0;
        }
        coefficient_of_variation(&counts)
            .map(|cv| clamp_unit(1.0 - cv))
            .unwrap_or(1.0)
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

impl DimensionAnalyzer for OperationalAnalyzer {
    type Output = OperationalAssessment;

    fn dimension(&self) -> Dimension {
        Dimension::Operational
    }

    fn description(&self) -> &str {
        "Freshness lag, supply gaps and volume stability of the temporal column"
    }

    #[instrument(skip(self, ctx), fields(reference_time = %ctx.reference_time))]
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> OperationalAssessment {
        let profile = ctx.profile;
        let selected = match self.config.temporal_column.as_deref() {
            Some(name) => profile.temporal_columns().find(|(meta, _)| meta.name == name),
            None => profile.temporal_columns().next(),
        };

        let Some((meta, values)) = selected else {
            info!("No temporal column, operational score is neutral");
            return self.neutral(
                FlagCode::NoTemporalColumn,
                "No temporal column detected; freshness cannot be assessed".to_string(),
                None,
            );
        };

        let mut timestamps: Vec<DateTime<Utc>> = values.iter().flatten().copied().collect();
        timestamps.sort();
        if timestamps.len() < 2 {
            info!(column = %meta.name, "Too few timestamps, operational score is neutral");
            return self.neutral(
                FlagCode::InsufficientTemporalData,
                format!(
                    "Temporal column '{}' has {} timestamp(s); at least 2 are needed",
                    meta.name,
                    timestamps.len()
                ),
                Some(meta.name.clone()),
            );
        }

        let deltas: Vec<f64> = timestamps
            .windows(2)
            .map(|w| seconds_between(w[0], w[1]))
            .collect();
        let positive: Vec<f64> = deltas.iter().copied().filter(|d| *d > 0.0).collect();
        let cadence = median(&positive)
            .filter(|c| *c > 0.0)
            .unwrap_or(self.config.fallback_cadence_secs);

        let last = timestamps[timestamps.len() - 1];
        let lag_secs = seconds_between(last, ctx.reference_time).max(0.0);
        let lag_cadences = lag_secs / cadence;
        let normalized_lag = (lag_cadences / self.config.max_lag_cadences).min(1.0);

        let gap_count = deltas
            .iter()
            .filter(|d| **d > self.config.gap_multiplier * cadence)
            .count();
        let gap_rate = gap_count as f64 / deltas.len() as f64;

        let stability = self.volume_stability(&timestamps);

        let mut flags = Vec::new();
        if lag_cadences > self.config.stale_after_cadences {
            let severity = if normalized_lag >= 1.0 {
                Severity::High
            } else {
                Severity::Medium
            };
            flags.push(
                RiskFlag::new(
                    FlagCode::StaleData,
                    severity,
                    format!(
                        "Last record is {:.1} days old ({lag_cadences:.1} expected intervals)",
                        lag_secs / SECONDS_PER_DAY
                    ),
                )
                .with_columns([meta.name.as_str()]),
            );
        }
        if gap_count > self.config.max_gap_count {
            flags.push(
                RiskFlag::new(
                    FlagCode::SupplyGaps,
                    Severity::Medium,
                    format!(
                        "{gap_count} interval(s) exceed {}× the expected cadence",
                        self.config.gap_multiplier
                    ),
                )
                .with_columns([meta.name.as_str()]),
            );
        }
        if stability < self.config.min_volume_stability {
            flags.push(
                RiskFlag::new(
                    FlagCode::VolumeInstability,
                    Severity::Medium,
                    format!("Record volume over time is uneven (stability {stability:.2})"),
                )
                .with_columns([meta.name.as_str()]),
            );
        }

        let score = self.config.lag_weight * (1.0 - normalized_lag)
            + self.config.gap_weight * (1.0 - gap_rate)
            + self.config.volume_weight * stability;

        let lag_days = lag_secs / SECONDS_PER_DAY;
        let result = ScoreResult::new(score)
            .with_flags(flags)
            .with_metric("timestamp_count", timestamps.len() as f64)
            .with_metric("cadence_seconds", cadence)
            .with_metric("lag_days", lag_days)
            .with_metric("lag_cadences", lag_cadences)
            .with_metric("normalized_lag", normalized_lag)
            .with_metric("gap_count", gap_count as f64)
            .with_metric("gap_rate", gap_rate)
            .with_metric("volume_stability", stability);

        info!(
            score = result.score(),
            column = %meta.name,
            lag_days,
            gap_count,
            "Operational analysis complete"
        );

        OperationalAssessment {
            result,
            temporal_column: Some(meta.name.clone()),
            last_timestamp: Some(last),
            lag_days: Some(lag_days),
        }
    }
}
