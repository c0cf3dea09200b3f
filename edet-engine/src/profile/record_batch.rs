//! Arrow and DataFusion input adapter.
//!
//! Converts an in-memory [`RecordBatch`] (or a registered DataFusion table)
//! into a [`DatasetProfile`]. File parsing stays with the caller: register a
//! CSV or Parquet source on a [`SessionContext`] and hand over the table name.
//!
//! Type mapping:
//!
//! | Arrow type                           | Column type                 |
//! |--------------------------------------|-----------------------------|
//! | integers, floats, decimals           | `Numeric`                   |
//! | `Boolean`                            | `Boolean`                   |
//! | `Date32`, `Date64`, `Timestamp`      | `Temporal`                  |
//! | `Utf8`, `LargeUtf8`, `Utf8View`, string dictionaries | inferred from values |
//! | `Null`                               | `Text` (all missing)        |
//!
//! Any other type is rejected with [`EngineError::UnsupportedType`].

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use datafusion::prelude::SessionContext;
use tracing::{debug, info, instrument};

use super::builder::ProfileBuilder;
use super::DatasetProfile;
use crate::error::{EngineError, Result};

/// Profiles a single record batch, stamping it with the current time.
pub fn create_profile(batch: &RecordBatch, source_type: &str) -> Result<DatasetProfile> {
    create_profile_at(batch, source_type, Utc::now())
}

/// Profiles a single record batch with an explicit profiling instant.
#[instrument(skip(batch), fields(rows = batch.num_rows(), columns = batch.num_columns()))]
pub fn create_profile_at(
    batch: &RecordBatch,
    source_type: &str,
    profiled_at: DateTime<Utc>,
) -> Result<DatasetProfile> {
    let schema = batch.schema();
    let mut builder = ProfileBuilder::new(source_type).profiled_at(profiled_at);

    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        let name = field.name();
        debug!(column = %name, data_type = %field.data_type(), "Converting column");
        builder = match array.data_type() {
            DataType::Boolean => builder.boolean(name, boolean_values(name, array)?),
            dt if dt.is_numeric() => builder.numeric(name, numeric_values(name, array)?),
            DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
                builder.temporal(name, temporal_values(name, array)?)
            }
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
                builder.raw(name, string_values(name, array)?)
            }
            DataType::Dictionary(_, value) if is_string_type(value) => {
                builder.raw(name, string_values(name, array)?)
            }
            DataType::Null => builder.raw(name, vec![None; array.len()]),
            other => return Err(EngineError::unsupported_type(name, other)),
        };
    }

    let profile = builder.build()?;
    info!(
        rows = profile.row_count(),
        columns = profile.column_count(),
        "Profiled record batch"
    );
    Ok(profile)
}

/// Profiles several batches that share one schema as a single table.
///
/// An empty slice yields an empty profile with no columns.
pub fn create_profile_from_batches(
    batches: &[RecordBatch],
    source_type: &str,
) -> Result<DatasetProfile> {
    match batches {
        [] => ProfileBuilder::new(source_type).build(),
        [single] => create_profile(single, source_type),
        [first, ..] => {
            let combined = concat_batches(&first.schema(), batches)?;
            create_profile(&combined, source_type)
        }
    }
}

/// Profiles a table registered on a DataFusion session.
///
/// # Example
///
/// ```rust,no_run
/// use datafusion::prelude::*;
/// use edet_engine::profile::profile_table;
///
/// # async fn example() -> edet_engine::error::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("sales", "data/sales.csv", CsvReadOptions::new()).await?;
/// let profile = profile_table(&ctx, "sales", "csv").await?;
/// println!("{} rows", profile.row_count());
/// # Ok(())
/// # }
/// ```
#[instrument(skip(ctx))]
pub async fn profile_table(
    ctx: &SessionContext,
    table: &str,
    source_type: &str,
) -> Result<DatasetProfile> {
    let df = ctx.table(table).await?;
    let schema = Arc::clone(df.schema().inner());
    let batches = df.collect().await?;

    if batches.is_empty() {
        return create_profile(&RecordBatch::new_empty(schema), source_type);
    }
    create_profile_from_batches(&batches, source_type)
}

fn is_string_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    )
}

fn downcast<'a, T: 'static>(name: &str, array: &'a ArrayRef) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| EngineError::unsupported_type(name, array.data_type()))
}

fn boolean_values(name: &str, array: &ArrayRef) -> Result<Vec<Option<bool>>> {
    Ok(downcast::<BooleanArray>(name, array)?.iter().collect())
}

fn numeric_values(name: &str, array: &ArrayRef) -> Result<Vec<Option<f64>>> {
    let cast_array = cast(array, &DataType::Float64)?;
    let floats = downcast::<Float64Array>(name, &cast_array)?;
    Ok(floats
        .iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

fn temporal_values(name: &str, array: &ArrayRef) -> Result<Vec<Option<DateTime<Utc>>>> {
    let cast_array = cast(array, &DataType::Timestamp(TimeUnit::Microsecond, None))?;
    let micros = downcast::<TimestampMicrosecondArray>(name, &cast_array)?;
    Ok(micros
        .iter()
        .map(|v| v.and_then(DateTime::from_timestamp_micros))
        .collect())
}

fn string_values(name: &str, array: &ArrayRef) -> Result<Vec<Option<String>>> {
    let cast_array = cast(array, &DataType::Utf8)?;
    let strings = downcast::<StringArray>(name, &cast_array)?;
    Ok(strings.iter().map(|v| v.map(str::to_string)).collect())
}
