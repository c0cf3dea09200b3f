//! Shared inputs for one evaluation run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::profile::DatasetProfile;

/// Bounds the work done by the quadratic and sorting computations.
///
/// Missingness, duplicate detection and logical rules always read every
/// row; only correlation, VIF, skew and anomaly statistics use the row
/// sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingPolicy {
    /// Rows above which statistics use a stride sample (default: 100 000)
    pub max_rows: usize,
    /// Numeric columns entering pairwise and VIF computations (default: 50)
    pub max_numeric_columns: usize,
    /// Complete columns considered for two-column keys (default: 20)
    pub max_key_columns: usize,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            max_rows: 100_000,
            max_numeric_columns: 50,
            max_key_columns: 20,
        }
    }
}

impl SamplingPolicy {
    /// No sampling at all.
    pub fn exhaustive() -> Self {
        Self {
            max_rows: usize::MAX,
            max_numeric_columns: usize::MAX,
            max_key_columns: usize::MAX,
        }
    }

    /// Deterministic stride sample for a table of `row_count` rows.
    pub fn row_sample(&self, row_count: usize) -> RowSample {
        let max_rows = self.max_rows.max(1);
        let stride = if row_count > max_rows {
            row_count.div_ceil(max_rows)
        } else {
            1
        };
        RowSample { row_count, stride }
    }
}

/// Every `stride`-th row, starting at row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSample {
    row_count: usize,
    stride: usize,
}

impl RowSample {
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_full(&self) -> bool {
        self.stride == 1
    }

    /// Number of sampled rows.
    pub fn len(&self) -> usize {
        self.row_count.div_ceil(self.stride)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Sampled row indices in ascending order.
    pub fn rows(&self) -> impl Iterator<Item = usize> {
        (0..self.row_count).step_by(self.stride)
    }

    /// Finite, non-missing sampled values of a numeric column.
    pub fn present_values(&self, values: &[Option<f64>]) -> Vec<f64> {
        self.rows()
            .filter_map(|row| values.get(row).copied().flatten())
            .filter(|x| x.is_finite())
            .collect()
    }
}

/// What every analyzer sees during one evaluation.
#[derive(Debug, Clone)]
pub struct AnalysisContext<'a> {
    pub profile: &'a DatasetProfile,
    pub sampling: &'a SamplingPolicy,
    /// "Now" for staleness computations
    pub reference_time: DateTime<Utc>,
    pub log: LogConfig,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(profile: &'a DatasetProfile, sampling: &'a SamplingPolicy) -> Self {
        Self {
            profile,
            sampling,
            reference_time: profile.profiled_at(),
            log: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn with_reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = reference_time;
        self
    }

    /// Row sample for statistics on this profile.
    pub fn row_sample(&self) -> RowSample {
        self.sampling.row_sample(self.profile.row_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_sampling_below_limit() {
        let sample = SamplingPolicy::default().row_sample(500);
        assert!(sample.is_full());
        assert_eq!(sample.len(), 500);
    }

    #[test]
    fn test_stride_sampling() {
        let policy = SamplingPolicy {
            max_rows: 4,
            ..SamplingPolicy::default()
        };
        let sample = policy.row_sample(10);
        assert_eq!(sample.stride(), 3);
        assert_eq!(sample.rows().collect::<Vec<_>>(), vec![0, 3, 6, 9]);
        assert_eq!(sample.len(), 4);
    }

    #[test]
    fn test_present_values_skip_missing() {
        let policy = SamplingPolicy {
            max_rows: 2,
            ..SamplingPolicy::default()
        };
        let sample = policy.row_sample(4);
        let values = [Some(1.0), Some(2.0), None, Some(4.0)];
        assert_eq!(sample.stride(), 2);
        assert_eq!(sample.present_values(&values), vec![1.0]);
    }

    #[test]
    fn test_present_values_skip_non_finite() {
        let sample = SamplingPolicy::default().row_sample(4);
        let values = [Some(1.0), Some(f64::NAN), Some(f64::NEG_INFINITY), Some(4.0)];
        assert_eq!(sample.present_values(&values), vec![1.0, 4.0]);
    }

    #[test]
    fn test_empty_sample() {
        let sample = SamplingPolicy::default().row_sample(0);
        assert!(sample.is_empty());
        assert_eq!(sample.len(), 0);
        assert_eq!(sample.rows().count(), 0);
    }
}
