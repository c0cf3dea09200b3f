//! Type inference for raw string columns.
//!
//! Detection runs on a bounded sample of non-empty values; the detected type
//! is then confirmed by converting the whole column. A column that fails to
//! convert cleanly falls back to text, so inference never turns a value into
//! a missing cell.
//!
//! # Example
//!
//! ```rust
//! use edet_engine::profile::{ColumnType, TypeInference};
//!
//! let inference = TypeInference::new().unwrap();
//! let raw = vec![Some("2024-01-01".to_string()), Some("2024-01-02".to_string()), None];
//! let (column_type, values) = inference.convert(raw);
//! assert_eq!(column_type, ColumnType::Temporal);
//! assert_eq!(values.missing_count(), 1);
//! ```

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::column::{ColumnType, ColumnValues};
use crate::error::Result;

/// Configuration for string type inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Number of non-empty values sampled for detection (default: 1000)
    pub sample_size: usize,
    /// Text columns with at most this many distinct values may be categorical (default: 50)
    pub categorical_threshold: usize,
    /// Maximum distinct/non-null ratio for a categorical column (default: 0.5)
    pub categorical_ratio: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            categorical_threshold: 50,
            categorical_ratio: 0.5,
        }
    }
}

struct TypePatterns {
    number: Regex,
    date_iso: Regex,
    datetime_iso: Regex,
    boolean: Regex,
}

impl TypePatterns {
    fn new() -> Result<Self> {
        Ok(Self {
            number: Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$")?,
            date_iso: Regex::new(r"^\d{4}-\d{2}-\d{2}$")?,
            datetime_iso: Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(:\d{2})?")?,
            boolean: Regex::new(r"(?i)^(true|false|yes|no|t|f|y|n)$")?,
        })
    }
}

/// Infers column types from string values.
pub struct TypeInference {
    config: InferenceConfig,
    patterns: TypePatterns,
}

impl std::fmt::Debug for TypeInference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInference")
            .field("config", &self.config)
            .finish()
    }
}

impl TypeInference {
    /// Creates an inference engine with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(InferenceConfig::default())
    }

    /// Creates an inference engine with the given configuration.
    pub fn with_config(config: InferenceConfig) -> Result<Self> {
        Ok(Self {
            config,
            patterns: TypePatterns::new()?,
        })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Detects the most specific type every sampled value satisfies.
    pub fn detect(&self, values: &[Option<String>]) -> ColumnType {
        let sample: Vec<&str> = values
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .take(self.config.sample_size)
            .collect();

        if sample.is_empty() {
            return ColumnType::Text;
        }
        if sample.iter().all(|s| self.patterns.boolean.is_match(s)) {
            return ColumnType::Boolean;
        }
        if sample.iter().all(|s| self.patterns.number.is_match(s)) {
            return ColumnType::Numeric;
        }
        if sample.iter().all(|s| {
            self.patterns.date_iso.is_match(s) || self.patterns.datetime_iso.is_match(s)
        }) {
            return ColumnType::Temporal;
        }
        ColumnType::Text
    }

    /// Chooses between text and categorical from cardinality.
    pub fn classify_text(&self, distinct_count: usize, non_null_count: usize) -> ColumnType {
        if non_null_count > 0
            && distinct_count <= self.config.categorical_threshold
            && (distinct_count as f64) <= self.config.categorical_ratio * non_null_count as f64
        {
            ColumnType::Categorical
        } else {
            ColumnType::Text
        }
    }

    /// Detects and converts a raw string column.
    ///
    /// Empty and whitespace-only strings become missing cells. If any
    /// non-empty value fails to parse as the detected type, the column is
    /// kept as text.
    pub fn convert(&self, values: Vec<Option<String>>) -> (ColumnType, ColumnValues) {
        let values: Vec<Option<String>> = values
            .into_iter()
            .map(|v| v.filter(|s| !s.trim().is_empty()))
            .collect();

        let detected = self.detect(&values);
        let converted = match detected {
            ColumnType::Numeric => convert_all(&values, |s| s.trim().parse::<f64>().ok())
                .map(ColumnValues::Numeric),
            ColumnType::Temporal => convert_all(&values, parse_timestamp).map(ColumnValues::Temporal),
            ColumnType::Boolean => convert_all(&values, parse_boolean).map(ColumnValues::Boolean),
            ColumnType::Text | ColumnType::Categorical => None,
        };

        match converted {
            Some(converted) => (detected, converted),
            None => {
                if detected != ColumnType::Text {
                    debug!(
                        detected = detected.as_str(),
                        "Sampled type did not hold for every value, keeping text"
                    );
                }
                let non_null = values.iter().filter(|v| v.is_some()).count();
                let distinct = values.iter().flatten().collect::<HashSet<_>>().len();
                (
                    self.classify_text(distinct, non_null),
                    ColumnValues::Text(values),
                )
            }
        }
    }
}

/// Infers and converts a raw string column with default configuration.
pub fn infer_column(values: Vec<Option<String>>) -> Result<(ColumnType, ColumnValues)> {
    Ok(TypeInference::new()?.convert(values))
}

fn convert_all<T>(values: &[Option<String>], parse: impl Fn(&str) -> Option<T>) -> Option<Vec<Option<T>>> {
    values
        .iter()
        .map(|v| match v {
            Some(s) => parse(s.trim()).map(Some),
            None => Some(None),
        })
        .collect()
}

/// Parses ISO dates, ISO/space separated datetimes and RFC 3339 timestamps.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn parse_boolean(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "t" | "y" => Some(true),
        "false" | "no" | "f" | "n" => Some(false),
        _ => None,
    }
}
