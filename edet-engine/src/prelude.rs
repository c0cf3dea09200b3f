//! Prelude for commonly used types and traits in edet-engine.

pub use crate::analyzers::{
    Assessment, Dimension, DimensionAnalyzer, FlagCode, RiskFlag, SamplingPolicy, ScoreResult,
    SensitivityLevel, Severity,
};
pub use crate::config::{EngineConfig, EngineConfigBuilder};
pub use crate::engine::{ResultBundle, TrustAssessment, TrustEngine, TrustTier, TrustWeights};
pub use crate::error::{EngineError, Result};
pub use crate::formatters::{BundleFormatter, FormatterConfig};
pub use crate::logging::LogConfig;
pub use crate::profile::{ColumnType, DatasetProfile, ProfileBuilder};
