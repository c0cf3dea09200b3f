//! Builder for dataset profiles from typed column vectors.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::column::{ColumnMeta, ColumnType, ColumnValues};
use super::inference::{InferenceConfig, TypeInference};
use super::DatasetProfile;
use crate::error::{EngineError, Result};

enum PendingValues {
    Typed(ColumnType, ColumnValues),
    /// Text whose categorical/text split is decided from cardinality
    Text(Vec<Option<String>>),
    /// Raw strings whose type is inferred
    Raw(Vec<Option<String>>),
}

/// Builder for [`DatasetProfile`].
///
/// Columns keep insertion order. Metadata (missing and distinct counts,
/// numeric density, temporal/text detection) is derived from the values in
/// [`build`](Self::build), so it can never disagree with them.
///
/// # Example
///
/// ```rust
/// use edet_engine::profile::{ColumnType, ProfileBuilder};
///
/// let profile = ProfileBuilder::new("csv")
///     .raw("signup", vec![Some("2024-05-01".into()), Some("2024-05-02".into())])
///     .boolean("active", vec![Some(true), None])
///     .build()
///     .unwrap();
///
/// assert_eq!(profile.column("signup").unwrap().column_type, ColumnType::Temporal);
/// assert!(profile.has_temporal());
/// ```
pub struct ProfileBuilder {
    source_type: String,
    profiled_at: Option<DateTime<Utc>>,
    inference: InferenceConfig,
    columns: Vec<(String, PendingValues)>,
}

impl ProfileBuilder {
    /// Creates a builder for data from `source_type`.
    pub fn new(source_type: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            profiled_at: None,
            inference: InferenceConfig::default(),
            columns: Vec::new(),
        }
    }

    /// Sets the profiling instant. Defaults to the time of [`build`](Self::build).
    pub fn profiled_at(mut self, at: DateTime<Utc>) -> Self {
        self.profiled_at = Some(at);
        self
    }

    /// Sets the configuration used for raw and text columns.
    pub fn inference_config(mut self, config: InferenceConfig) -> Self {
        self.inference = config;
        self
    }

    pub fn numeric(self, name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        self.push(name, PendingValues::Typed(ColumnType::Numeric, ColumnValues::Numeric(values)))
    }

    /// Adds a text column; low-cardinality columns are profiled as categorical.
    pub fn text(self, name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        self.push(name, PendingValues::Text(values))
    }

    /// Adds a text column that is always profiled as categorical.
    pub fn categorical(self, name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        self.push(
            name,
            PendingValues::Typed(ColumnType::Categorical, ColumnValues::Text(values)),
        )
    }

    pub fn temporal(self, name: impl Into<String>, values: Vec<Option<DateTime<Utc>>>) -> Self {
        self.push(
            name,
            PendingValues::Typed(ColumnType::Temporal, ColumnValues::Temporal(values)),
        )
    }

    pub fn boolean(self, name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        self.push(
            name,
            PendingValues::Typed(ColumnType::Boolean, ColumnValues::Boolean(values)),
        )
    }

    /// Adds a raw string column whose type is inferred at build time.
    pub fn raw(self, name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        self.push(name, PendingValues::Raw(values))
    }

    /// Adds a column with an explicit type. The type must match the storage.
    pub fn column(
        self,
        name: impl Into<String>,
        column_type: ColumnType,
        values: ColumnValues,
    ) -> Self {
        self.push(name, PendingValues::Typed(column_type, values))
    }

    fn push(mut self, name: impl Into<String>, values: PendingValues) -> Self {
        self.columns.push((name.into(), values));
        self
    }

    /// Builds the profile.
    ///
    /// NaN and infinite numbers are stored as missing cells.
    ///
    /// Fails with a contract violation when column lengths differ, names
    /// repeat, or an explicit type does not match its storage.
    #[instrument(skip(self), fields(source_type = %self.source_type, columns = self.columns.len()))]
    pub fn build(self) -> Result<DatasetProfile> {
        let needs_inference = self
            .columns
            .iter()
            .any(|(_, v)| !matches!(v, PendingValues::Typed(..)));
        let inference = if needs_inference {
            Some(TypeInference::with_config(self.inference)?)
        } else {
            None
        };

        let mut seen = HashSet::with_capacity(self.columns.len());
        let mut metas = Vec::with_capacity(self.columns.len());
        let mut values = Vec::with_capacity(self.columns.len());
        let mut row_count = None;

        for (name, pending) in self.columns {
            if !seen.insert(name.clone()) {
                return Err(EngineError::contract(format!(
                    "duplicate column name '{name}'"
                )));
            }

            let (column_type, column_values) = match (pending, inference.as_ref()) {
                (PendingValues::Typed(ty, v), _) => (ty, v),
                (PendingValues::Text(v), Some(inference)) => {
                    let non_null = v.iter().filter(|s| s.is_some()).count();
                    let distinct = v.iter().flatten().collect::<HashSet<_>>().len();
                    (inference.classify_text(distinct, non_null), ColumnValues::Text(v))
                }
                (PendingValues::Raw(v), Some(inference)) => inference.convert(v),
                (_, None) => {
                    return Err(EngineError::contract(format!(
                        "column '{name}' needs type inference"
                    )))
                }
            };

            if !column_type.is_compatible_with(&column_values) {
                return Err(EngineError::contract(format!(
                    "column '{name}' is typed {column_type} but stores {} values",
                    column_values.storage_kind()
                )));
            }

            let column_values = column_values.into_finite();
            let len = column_values.len();
            match row_count {
                None => row_count = Some(len),
                Some(expected) if expected != len => {
                    return Err(EngineError::contract(format!(
                        "column '{name}' has {len} values, expected {expected}"
                    )));
                }
                Some(_) => {}
            }

            debug!(column = %name, column_type = column_type.as_str(), "Profiled column");
            metas.push(ColumnMeta {
                missing_count: column_values.missing_count(),
                distinct_count: column_values.distinct_count(),
                name,
                column_type,
            });
            values.push(column_values);
        }

        let column_count = metas.len();
        let numeric = metas
            .iter()
            .filter(|m| m.column_type == ColumnType::Numeric)
            .count();
        let numeric_density = if column_count == 0 {
            0.0
        } else {
            numeric as f64 / column_count as f64
        };

        Ok(DatasetProfile {
            source_type: self.source_type,
            row_count: row_count.unwrap_or(0),
            column_count,
            numeric_density,
            has_temporal: metas.iter().any(|m| m.column_type == ColumnType::Temporal),
            has_text: metas.iter().any(|m| m.column_type.is_textual()),
            columns: metas,
            profiled_at: self.profiled_at.unwrap_or_else(Utc::now),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_derives_metadata() {
        let profile = ProfileBuilder::new("memory")
            .numeric("x", vec![Some(1.0), Some(1.0), None])
            .boolean("flag", vec![Some(true), Some(false), Some(true)])
            .build()
            .unwrap();

        let x = profile.column("x").unwrap();
        assert_eq!(x.missing_count, 1);
        assert_eq!(x.distinct_count, 1);
        assert!((profile.numeric_density() - 0.5).abs() < f64::EPSILON);
        assert!(!profile.has_temporal());
        assert!(!profile.has_text());
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let err = ProfileBuilder::new("memory")
            .numeric("a", vec![Some(1.0), Some(2.0)])
            .numeric("b", vec![Some(1.0)])
            .build()
            .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = ProfileBuilder::new("memory")
            .numeric("a", vec![Some(1.0)])
            .numeric("a", vec![Some(2.0)])
            .build()
            .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_explicit_type_must_match_storage() {
        let err = ProfileBuilder::new("memory")
            .column("a", ColumnType::Temporal, ColumnValues::Numeric(vec![Some(1.0)]))
            .build()
            .unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_empty_builder_yields_empty_profile() {
        let profile = ProfileBuilder::new("memory").build().unwrap();
        assert_eq!(profile.row_count(), 0);
        assert_eq!(profile.column_count(), 0);
        assert_eq!(profile.numeric_density(), 0.0);
    }

    #[test]
    fn test_non_finite_numbers_stored_as_missing() {
        let profile = ProfileBuilder::new("memory")
            .numeric("x", vec![Some(1.0), Some(f64::NAN), Some(f64::INFINITY), None])
            .build()
            .unwrap();
        assert_eq!(profile.column("x").unwrap().missing_count, 3);
        assert_eq!(
            profile.column_values("x").unwrap().as_numeric().unwrap(),
            &[Some(1.0), None, None, None]
        );
    }

    #[test]
    fn test_text_cardinality_split() {
        let regions: Vec<Option<String>> = (0..20)
            .map(|i| Some(if i % 2 == 0 { "east" } else { "west" }.to_string()))
            .collect();
        let notes: Vec<Option<String>> = (0..20).map(|i| Some(format!("note {i}"))).collect();
        let profile = ProfileBuilder::new("memory")
            .text("region", regions)
            .text("notes", notes)
            .build()
            .unwrap();
        assert_eq!(profile.column("region").unwrap().column_type, ColumnType::Categorical);
        assert_eq!(profile.column("notes").unwrap().column_type, ColumnType::Text);
        assert!(profile.has_text());
    }
}
