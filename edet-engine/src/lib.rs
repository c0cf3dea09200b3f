//! # EDET - Enterprise Data Trust scoring
//!
//! `edet-engine` turns a profiled tabular dataset into five per-dimension
//! trust scores and a composite **Enterprise Data Trust Index** (EDTI) with
//! a discrete trust tier. It reads an already-materialized
//! [`DatasetProfile`](profile::DatasetProfile) and performs no I/O of its
//! own; profiles come from typed column vectors, raw strings with type
//! inference, or Arrow record batches and DataFusion tables.
//!
//! ## Quick Start
//!
//! ```rust
//! use edet_engine::prelude::*;
//!
//! # fn main() -> edet_engine::error::Result<()> {
//! let profile = ProfileBuilder::new("csv")
//!     .raw("order_id", vec![Some("1".into()), Some("2".into()), Some("3".into())])
//!     .raw("revenue", vec![Some("120.5".into()), Some("80".into()), Some("99.9".into())])
//!     .raw("profit", vec![Some("20".into()), Some("95".into()), Some("10".into())])
//!     .build()?;
//!
//! let engine = TrustEngine::new(EngineConfig::default())?;
//! let bundle = engine.evaluate(&profile)?;
//!
//! println!("EDTI {:.2} -> {}", bundle.trust.edti_score, bundle.trust.trust_tier);
//! for (dimension, flag) in bundle.all_flags() {
//!     println!("{dimension}: {flag}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Dimensions
//!
//! | Dimension   | Measures                                                  | Default weight |
//! |-------------|-----------------------------------------------------------|----------------|
//! | structural  | missingness, duplicate rows, redundant numeric features   | 0.25           |
//! | governance  | PII by name and value patterns, dataset sensitivity       | 0.20           |
//! | operational | freshness lag, supply gaps, volume stability              | 0.15           |
//! | logical     | business rules over detected semantic roles               | 0.20           |
//! | analytical  | skew, variance inflation, IQR anomaly density             | 0.20           |
//!
//! Weights are renormalized over the dimensions that produced a score.
//! Tiers follow fixed bands (0.80 / 0.60 / 0.40), and a dataset with High
//! sensitivity never rates above "Review Recommended".
//!
//! ## Architecture
//!
//! - **`profile`**: dataset profile model, builder, type inference, Arrow and
//!   DataFusion adapters
//! - **`analyzers`**: the five dimension analyzers and their shared types
//! - **`engine`**: aggregation, tiers, the result bundle
//! - **`config`**: serde-loadable engine configuration
//! - **`formatters`**: JSON and executive summary output
//! - **`logging`**: `tracing` configuration helpers

pub mod analyzers;
pub mod config;
pub mod engine;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod profile;
