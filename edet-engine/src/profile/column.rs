//! Typed column descriptors and row-aligned column storage.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column type fixed at profiling time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnType {
    /// Integer or floating point values
    Numeric,
    /// Free-form text
    Text,
    /// Dates and timestamps
    Temporal,
    /// Low-cardinality text
    Categorical,
    /// true/false values
    Boolean,
}

impl ColumnType {
    /// Returns the name of this column type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
            ColumnType::Temporal => "temporal",
            ColumnType::Categorical => "categorical",
            ColumnType::Boolean => "boolean",
        }
    }

    /// True for text and categorical columns.
    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Categorical)
    }

    /// Checks whether values stored as `values` may carry this column type.
    pub fn is_compatible_with(&self, values: &ColumnValues) -> bool {
        matches!(
            (self, values),
            (ColumnType::Numeric, ColumnValues::Numeric(_))
                | (ColumnType::Text, ColumnValues::Text(_))
                | (ColumnType::Categorical, ColumnValues::Text(_))
                | (ColumnType::Temporal, ColumnValues::Temporal(_))
                | (ColumnType::Boolean, ColumnValues::Boolean(_))
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-column descriptor, immutable once profiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
    /// Number of null (missing) cells
    pub missing_count: usize,
    /// Number of distinct non-null values
    pub distinct_count: usize,
}

impl ColumnMeta {
    /// Fraction of `row_count` that is missing; 0 for an empty table.
    pub fn missing_fraction(&self, row_count: usize) -> f64 {
        if row_count == 0 {
            0.0
        } else {
            self.missing_count as f64 / row_count as f64
        }
    }

    /// Uniqueness ratio over all rows (distinct non-null values / rows).
    pub fn uniqueness_ratio(&self, row_count: usize) -> f64 {
        if row_count == 0 {
            0.0
        } else {
            self.distinct_count as f64 / row_count as f64
        }
    }

    /// True when every row holds a distinct, non-null value.
    pub fn is_unique_key(&self, row_count: usize) -> bool {
        row_count > 0 && self.missing_count == 0 && self.distinct_count == row_count
    }
}

/// Row-aligned values of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values")]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    /// Storage for both text and categorical columns
    Text(Vec<Option<String>>),
    Temporal(Vec<Option<DateTime<Utc>>>),
    Boolean(Vec<Option<bool>>),
}

impl ColumnValues {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
            ColumnValues::Temporal(v) => v.len(),
            ColumnValues::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the cell at `row` is missing.
    pub fn is_null(&self, row: usize) -> bool {
        matches!(self.cell(row), CellKey::Null)
    }

    /// Counts missing cells.
    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_null(row)).count()
    }

    /// Counts distinct non-null values.
    pub fn distinct_count(&self) -> usize {
        let mut seen = HashSet::new();
        for row in 0..self.len() {
            let cell = self.cell(row);
            if cell != CellKey::Null {
                seen.insert(cell);
            }
        }
        seen.len()
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            ColumnValues::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&[Option<String>]> {
        match self {
            ColumnValues::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_temporal(&self) -> Option<&[Option<DateTime<Utc>>]> {
        match self {
            ColumnValues::Temporal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<&[Option<bool>]> {
        match self {
            ColumnValues::Boolean(v) => Some(v),
            _ => None,
        }
    }

    /// Hashable view of the cell at `row`, used for duplicate and key detection.
    ///
    /// Out-of-range rows read as [`CellKey::Null`].
    pub fn cell(&self, row: usize) -> CellKey<'_> {
        match self {
            ColumnValues::Numeric(v) => match v.get(row).copied().flatten() {
                Some(x) if x.is_finite() => CellKey::Number(normalized_bits(x)),
                _ => CellKey::Null,
            },
            ColumnValues::Text(v) => match v.get(row) {
                Some(Some(s)) => CellKey::Text(s.as_str()),
                _ => CellKey::Null,
            },
            ColumnValues::Temporal(v) => match v.get(row).copied().flatten() {
                Some(t) => CellKey::Instant(t),
                None => CellKey::Null,
            },
            ColumnValues::Boolean(v) => match v.get(row).copied().flatten() {
                Some(b) => CellKey::Bool(b),
                None => CellKey::Null,
            },
        }
    }

    /// Replaces NaN and infinite numbers with missing cells.
    pub fn into_finite(self) -> Self {
        match self {
            ColumnValues::Numeric(v) => ColumnValues::Numeric(
                v.into_iter()
                    .map(|x| x.filter(|x| x.is_finite()))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Name of the storage variant.
    pub fn storage_kind(&self) -> &'static str {
        match self {
            ColumnValues::Numeric(_) => "numeric",
            ColumnValues::Text(_) => "text",
            ColumnValues::Temporal(_) => "temporal",
            ColumnValues::Boolean(_) => "boolean",
        }
    }
}

/// Hashable, borrowed representation of a single cell.
///
/// Missing cells compare equal to each other so that rows that are null in
/// the same positions count as duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKey<'a> {
    Null,
    Number(u64),
    Text(&'a str),
    Instant(DateTime<Utc>),
    Bool(bool),
}

// -0.0 and 0.0 are the same value
fn normalized_bits(x: f64) -> u64 {
    if x == 0.0 {
        0.0f64.to_bits()
    } else {
        x.to_bits()
    }
}

/// Normalizes a column name for pattern matching.
///
/// Lowercases, splits camelCase boundaries with `_` and maps spaces, dashes
/// and dots to `_`, so `customerId`, `Customer ID` and `customer-id` all read
/// as `customer_id`.
pub fn normalize_column_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.trim().chars() {
        if ch.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        match ch {
            ' ' | '-' | '.' => out.push('_'),
            c => out.extend(c.to_lowercase()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_distinct_counts() {
        let values = ColumnValues::Numeric(vec![Some(1.0), None, Some(1.0), Some(2.0), None]);
        assert_eq!(values.len(), 5);
        assert_eq!(values.missing_count(), 2);
        assert_eq!(values.distinct_count(), 2);
    }

    #[test]
    fn test_nan_reads_as_missing() {
        let values = ColumnValues::Numeric(vec![Some(f64::NAN), Some(1.0)]);
        assert!(values.is_null(0));
        assert_eq!(values.missing_count(), 1);
    }

    #[test]
    fn test_infinities_read_as_missing() {
        let values = ColumnValues::Numeric(vec![
            Some(f64::INFINITY),
            Some(f64::NEG_INFINITY),
            Some(2.0),
        ]);
        assert_eq!(values.missing_count(), 2);
        assert_eq!(values.distinct_count(), 1);
        assert_eq!(
            values.into_finite(),
            ColumnValues::Numeric(vec![None, None, Some(2.0)])
        );
    }

    #[test]
    fn test_negative_zero_equals_zero() {
        let values = ColumnValues::Numeric(vec![Some(-0.0), Some(0.0)]);
        assert_eq!(values.cell(0), values.cell(1));
        assert_eq!(values.distinct_count(), 1);
    }

    #[test]
    fn test_type_compatibility() {
        let text = ColumnValues::Text(vec![Some("a".to_string())]);
        assert!(ColumnType::Text.is_compatible_with(&text));
        assert!(ColumnType::Categorical.is_compatible_with(&text));
        assert!(!ColumnType::Numeric.is_compatible_with(&text));
    }

    #[test]
    fn test_column_meta_ratios() {
        let meta = ColumnMeta {
            name: "id".to_string(),
            column_type: ColumnType::Numeric,
            missing_count: 0,
            distinct_count: 10,
        };
        assert!(meta.is_unique_key(10));
        assert!(!meta.is_unique_key(11));
        assert_eq!(meta.missing_fraction(0), 0.0);
        assert!((meta.uniqueness_ratio(20) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("customerId"), "customer_id");
        assert_eq!(normalize_column_name("Customer ID"), "customer_id");
        assert_eq!(normalize_column_name("net-income"), "net_income");
        assert_eq!(normalize_column_name("EMAIL"), "email");
        assert_eq!(normalize_column_name("address2Line"), "address2_line");
    }
}
