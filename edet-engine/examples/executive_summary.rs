//! Profiles a small in-memory sales table and prints the executive summary.
//!
//! Run with `RUST_LOG=edet_engine=debug` to see analyzer events.

use chrono::{Duration, TimeZone, Utc};
use edet_engine::formatters::{JsonFormatter, SummaryFormatter};
use edet_engine::logging::setup::{init_logging, LoggingConfig};
use edet_engine::prelude::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default())?;

    let now = Utc.with_ymd_and_hms(2024, 6, 30, 18, 0, 0).unwrap();
    let days: Vec<_> = (0..60)
        .filter(|d| !(20..26).contains(d))
        .map(|d| Some(now - Duration::days(62 - d)))
        .collect();
    let rows = days.len();

    let profile = ProfileBuilder::new("csv")
        .profiled_at(now)
        .temporal("order_date", days)
        .raw(
            "order_id",
            (0..rows).map(|i| Some(format!("{}", 10_000 + i))).collect(),
        )
        .raw(
            "customer_email",
            (0..rows)
                .map(|i| (i % 9 != 0).then(|| format!("customer{i}@example.com")))
                .collect(),
        )
        .numeric(
            "revenue",
            (0..rows).map(|i| Some(200.0 + (i % 11) as f64 * 15.0)).collect(),
        )
        .numeric(
            "profit",
            (0..rows)
                .map(|i| Some(if i % 17 == 0 { 900.0 } else { 30.0 + (i % 5) as f64 }))
                .collect(),
        )
        .build()?;

    let engine = TrustEngine::new(EngineConfig::default())?;
    let bundle = engine.evaluate(&profile)?;

    println!("{}", SummaryFormatter::new().format(&bundle)?);
    println!(
        "{}",
        JsonFormatter::new().with_flat(true).format(&bundle)?
    );
    Ok(())
}
