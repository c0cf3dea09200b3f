//! Dataset profiles: the fixed input contract of the trust engine.
//!
//! A [`DatasetProfile`] describes an already materialized table: its shape,
//! per-column metadata, and the typed, row-aligned values captured at
//! profiling time. Profiles are immutable; every analyzer reads the same
//! instance, and evaluation never mutates it.
//!
//! Profiles are produced by [`ProfileBuilder`] from typed vectors, or by the
//! Arrow/DataFusion adapter in [`record_batch`].
//!
//! # Example
//!
//! ```rust
//! use edet_engine::profile::ProfileBuilder;
//!
//! let profile = ProfileBuilder::new("csv")
//!     .numeric("revenue", vec![Some(120.0), Some(80.5), None])
//!     .text("region", vec![Some("north".into()), Some("south".into()), Some("north".into())])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(profile.row_count(), 3);
//! assert_eq!(profile.column_count(), 2);
//! assert!((profile.numeric_density() - 0.5).abs() < f64::EPSILON);
//! ```

mod builder;
mod column;
mod inference;
pub mod record_batch;

pub use builder::ProfileBuilder;
pub use column::{normalize_column_name, CellKey, ColumnMeta, ColumnType, ColumnValues};
pub use inference::{infer_column, parse_timestamp, InferenceConfig, TypeInference};
pub use record_batch::{create_profile, create_profile_from_batches, profile_table};

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EngineError, Result};

/// Immutable description of a tabular dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    source_type: String,
    row_count: usize,
    column_count: usize,
    columns: Vec<ColumnMeta>,
    numeric_density: f64,
    has_temporal: bool,
    has_text: bool,
    profiled_at: DateTime<Utc>,
    values: Vec<ColumnValues>,
}

impl DatasetProfile {
    /// Origin of the data, e.g. `csv` or `parquet`.
    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Fraction of columns that are numeric.
    pub fn numeric_density(&self) -> f64 {
        self.numeric_density
    }

    pub fn has_temporal(&self) -> bool {
        self.has_temporal
    }

    pub fn has_text(&self) -> bool {
        self.has_text
    }

    /// Instant the profile was captured; the default reference time for staleness.
    pub fn profiled_at(&self) -> DateTime<Utc> {
        self.profiled_at
    }

    /// True when the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Looks up a column descriptor by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Values of the column at `index`.
    pub fn values(&self, index: usize) -> Option<&ColumnValues> {
        self.values.get(index)
    }

    /// Values of the column named `name`.
    pub fn column_values(&self, name: &str) -> Option<&ColumnValues> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .and_then(|i| self.values.get(i))
    }

    /// Iterates columns in schema order, pairing metadata with values.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&ColumnMeta, &ColumnValues)> {
        self.columns.iter().zip(self.values.iter())
    }

    /// Numeric columns in schema order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = (&ColumnMeta, &[Option<f64>])> {
        self.iter_columns().filter_map(|(meta, values)| {
            match (meta.column_type, values.as_numeric()) {
                (ColumnType::Numeric, Some(v)) => Some((meta, v)),
                _ => None,
            }
        })
    }

    /// Temporal columns in schema order.
    pub fn temporal_columns(&self) -> impl Iterator<Item = (&ColumnMeta, &[Option<DateTime<Utc>>])> {
        self.iter_columns().filter_map(|(meta, values)| {
            match (meta.column_type, values.as_temporal()) {
                (ColumnType::Temporal, Some(v)) => Some((meta, v)),
                _ => None,
            }
        })
    }

    /// Text and categorical columns in schema order.
    pub fn text_columns(&self) -> impl Iterator<Item = (&ColumnMeta, &[Option<String>])> {
        self.iter_columns().filter_map(|(meta, values)| {
            match (meta.column_type.is_textual(), values.as_text()) {
                (true, Some(v)) => Some((meta, v)),
                _ => None,
            }
        })
    }

    /// Total number of missing cells.
    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|c| c.missing_count).sum()
    }

    /// Missing cells over all cells; 0 when the table has no cells.
    pub fn missing_rate(&self) -> f64 {
        let cells = self.row_count * self.column_count;
        if cells == 0 {
            0.0
        } else {
            self.total_missing() as f64 / cells as f64
        }
    }

    /// Checks every structural invariant of the profile.
    ///
    /// Builders always produce valid profiles; this guards profiles that were
    /// deserialized or assembled elsewhere.
    pub fn validate(&self) -> Result<()> {
        if self.column_count != self.columns.len() {
            return Err(EngineError::contract(format!(
                "column_count {} does not match {} column descriptors",
                self.column_count,
                self.columns.len()
            )));
        }
        if self.columns.len() != self.values.len() {
            return Err(EngineError::contract(format!(
                "{} column descriptors but {} value vectors",
                self.columns.len(),
                self.values.len()
            )));
        }
        if !(0.0..=1.0).contains(&self.numeric_density) {
            return Err(EngineError::contract(format!(
                "numeric_density {} outside [0, 1]",
                self.numeric_density
            )));
        }

        let mut names = HashSet::with_capacity(self.columns.len());
        for (meta, values) in self.iter_columns() {
            if !names.insert(meta.name.as_str()) {
                return Err(EngineError::contract(format!(
                    "duplicate column name '{}'",
                    meta.name
                )));
            }
            if values.len() != self.row_count {
                return Err(EngineError::contract(format!(
                    "column '{}' has {} values for {} rows",
                    meta.name,
                    values.len(),
                    self.row_count
                )));
            }
            if meta.missing_count > self.row_count {
                return Err(EngineError::contract(format!(
                    "column '{}' reports {} missing cells for {} rows",
                    meta.name, meta.missing_count, self.row_count
                )));
            }
            if meta.distinct_count > self.row_count {
                return Err(EngineError::contract(format!(
                    "column '{}' reports {} distinct values for {} rows",
                    meta.name, meta.distinct_count, self.row_count
                )));
            }
            if !meta.column_type.is_compatible_with(values) {
                return Err(EngineError::contract(format!(
                    "column '{}' is typed {} but stores {} values",
                    meta.name,
                    meta.column_type,
                    values.storage_kind()
                )));
            }
        }
        Ok(())
    }

    /// SHA-256 hex digest over the schema and every cell value.
    ///
    /// Two profiles of the same data produce the same fingerprint regardless
    /// of source type or profiling time.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.row_count as u64).to_le_bytes());
        hasher.update((self.column_count as u64).to_le_bytes());
        for (meta, values) in self.iter_columns() {
            hasher.update((meta.name.len() as u64).to_le_bytes());
            hasher.update(meta.name.as_bytes());
            hasher.update(meta.column_type.as_str().as_bytes());
            for row in 0..values.len() {
                match values.cell(row) {
                    CellKey::Null => hasher.update([0u8]),
                    CellKey::Number(bits) => {
                        hasher.update([1u8]);
                        hasher.update(bits.to_le_bytes());
                    }
                    CellKey::Text(s) => {
                        hasher.update([2u8]);
                        hasher.update((s.len() as u64).to_le_bytes());
                        hasher.update(s.as_bytes());
                    }
                    CellKey::Instant(t) => {
                        hasher.update([3u8]);
                        hasher.update(t.timestamp().to_le_bytes());
                        hasher.update(t.timestamp_subsec_nanos().to_le_bytes());
                    }
                    CellKey::Bool(b) => hasher.update([4u8, u8::from(b)]),
                }
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Summary carried in result bundles.
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            source_type: self.source_type.clone(),
            row_count: self.row_count,
            column_count: self.column_count,
            numeric_density: self.numeric_density,
            has_temporal: self.has_temporal,
            has_text: self.has_text,
            missing_rate: self.missing_rate(),
            profiled_at: self.profiled_at,
            fingerprint: self.fingerprint(),
            columns: self.columns.clone(),
        }
    }
}

/// Profile facts reported alongside evaluation results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub source_type: String,
    pub row_count: usize,
    pub column_count: usize,
    pub numeric_density: f64,
    pub has_temporal: bool,
    pub has_text: bool,
    pub missing_rate: f64,
    pub profiled_at: DateTime<Utc>,
    /// SHA-256 hex digest of schema and values
    pub fingerprint: String,
    pub columns: Vec<ColumnMeta>,
}
