//! Integration tests for profiling Arrow batches and DataFusion tables.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{TimeZone, Utc};
use datafusion::prelude::SessionContext;
use edet_engine::config::EngineConfig;
use edet_engine::engine::TrustEngine;
use edet_engine::profile::record_batch::create_profile_at;
use edet_engine::profile::{profile_table, ColumnType};

const DAY_MICROS: i64 = 86_400_000_000;

fn orders_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Int64, false),
        Field::new(
            "order_ts",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            true,
        ),
        Field::new("revenue", DataType::Float64, true),
        Field::new("customer_email", DataType::Utf8, true),
    ]));

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp_micros();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from((1..=12).collect::<Vec<i64>>())),
        Arc::new(TimestampMicrosecondArray::from(
            (0..12).map(|d| Some(start + d * DAY_MICROS)).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            (0..12)
                .map(|i| if i == 5 { None } else { Some(50.0 + i as f64) })
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            (0..12)
                .map(|i| Some(format!("buyer{i}@shop.example")))
                .collect::<Vec<_>>(),
        )),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

#[test]
fn test_batch_profile_types_and_counts() {
    let at = Utc.with_ymd_and_hms(2024, 1, 13, 0, 0, 0).unwrap();
    let profile = create_profile_at(&orders_batch(), "arrow", at).unwrap();

    assert_eq!(profile.row_count(), 12);
    assert_eq!(profile.column_count(), 4);
    assert_eq!(profile.profiled_at(), at);
    assert!(profile.has_temporal());
    assert!(profile.has_text());

    let revenue = profile.column("revenue").unwrap();
    assert_eq!(revenue.column_type, ColumnType::Numeric);
    assert_eq!(revenue.missing_count, 1);
    assert_eq!(
        profile.column("order_ts").unwrap().column_type,
        ColumnType::Temporal
    );
    assert!(profile.column("customer_email").unwrap().column_type.is_textual());
    assert!(profile.validate().is_ok());
}

#[test]
fn test_batch_profile_evaluates() {
    let at = Utc.with_ymd_and_hms(2024, 1, 13, 0, 0, 0).unwrap();
    let profile = create_profile_at(&orders_batch(), "arrow", at).unwrap();
    let bundle = TrustEngine::new(EngineConfig::default())
        .unwrap()
        .evaluate(&profile)
        .unwrap();

    assert_eq!(bundle.operational.temporal_column.as_deref(), Some("order_ts"));
    assert!(bundle.governance.sensitive_columns.contains_key("customer_email"));
    assert_eq!(bundle.profile.fingerprint, profile.fingerprint());
}

#[tokio::test]
async fn test_profile_registered_table() {
    let ctx = SessionContext::new();
    ctx.register_batch("orders", orders_batch()).unwrap();

    let profile = profile_table(&ctx, "orders", "datafusion").await.unwrap();
    assert_eq!(profile.source_type(), "datafusion");
    assert_eq!(profile.row_count(), 12);
    assert_eq!(profile.numeric_columns().count(), 2);

    let at = profile.profiled_at();
    let direct = create_profile_at(&orders_batch(), "datafusion", at).unwrap();
    assert_eq!(profile.fingerprint(), direct.fingerprint());
}

#[tokio::test]
async fn test_profile_filtered_view() {
    let ctx = SessionContext::new();
    ctx.register_batch("orders", orders_batch()).unwrap();
    let df = ctx
        .sql("SELECT order_id, revenue FROM orders WHERE revenue IS NOT NULL")
        .await
        .unwrap();
    ctx.register_table("paid_orders", df.into_view()).unwrap();

    let profile = profile_table(&ctx, "paid_orders", "datafusion").await.unwrap();
    assert_eq!(profile.row_count(), 11);
    assert_eq!(profile.column("revenue").unwrap().missing_count, 0);
}

#[tokio::test]
async fn test_missing_table_is_datafusion_error() {
    let ctx = SessionContext::new();
    let err = profile_table(&ctx, "nope", "datafusion").await.unwrap_err();
    assert!(matches!(err, edet_engine::error::EngineError::DataFusion(_)));
}
