//! Engine configuration.
//!
//! [`EngineConfig`] gathers every weight, threshold and band the engine
//! uses. Defaults equal the documented constants. The whole structure is
//! serde-(de)serializable, so a deployment can keep it in a JSON file and
//! override only the fields it cares about:
//!
//! ```rust
//! use edet_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{
//!     "weights": { "operational": 0.0 },
//!     "tiers": { "decision_ready": 0.85 }
//! }"#).unwrap();
//! assert_eq!(config.weights.operational, 0.0);
//! assert_eq!(config.weights.structural, 0.25);
//! assert_eq!(config.tiers.decision_ready, 0.85);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzers::{
    AnalyticalConfig, GovernanceConfig, LogicalConfig, OperationalConfig, SamplingPolicy,
    StructuralConfig,
};
use crate::engine::{SensitivityCap, TierBands, TrustWeights};
use crate::error::{EngineError, Result};
use crate::logging::LogConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: TrustWeights,
    pub tiers: TierBands,
    pub sensitivity_cap: SensitivityCap,
    pub sampling: SamplingPolicy,
    pub structural: StructuralConfig,
    pub governance: GovernanceConfig,
    pub operational: OperationalConfig,
    pub logical: LogicalConfig,
    pub analytical: AnalyticalConfig,
    /// "Now" for staleness. Defaults to the profile's `profiled_at`.
    pub reference_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub logging: LogConfig,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parses a (partial) JSON configuration and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.tiers.validate()?;
        if self.sampling.max_rows == 0 {
            return Err(EngineError::configuration(
                "sampling.max_rows must be positive",
            ));
        }
        require_positive("analytical.skew_normalizer", self.analytical.skew_normalizer)?;
        if self.operational.volume_buckets == 0 {
            return Err(EngineError::configuration(
                "operational.volume_buckets must be positive",
            ));
        }
        require_positive(
            "operational.max_lag_cadences",
            self.operational.max_lag_cadences,
        )?;
        require_positive(
            "operational.fallback_cadence_secs",
            self.operational.fallback_cadence_secs,
        )?;
        for (name, weight) in [
            ("governance.low_weight", self.governance.low_weight),
            ("governance.moderate_weight", self.governance.moderate_weight),
            ("governance.high_weight", self.governance.high_weight),
        ] {
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(EngineError::configuration(format!(
                    "{name} must be a non-negative number, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::configuration(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

/// Builder for [`EngineConfig`].
///
/// # Examples
///
/// ```rust
/// use edet_engine::config::EngineConfig;
/// use edet_engine::engine::TrustWeights;
/// use edet_engine::logging::LogConfig;
///
/// let config = EngineConfig::builder()
///     .weights(TrustWeights { operational: 0.0, ..TrustWeights::default() })
///     .logging(LogConfig::production())
///     .build()
///     .unwrap();
/// assert_eq!(config.weights.operational, 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn weights(mut self, weights: TrustWeights) -> Self {
        self.config.weights = weights;
        self
    }

    pub fn tiers(mut self, tiers: TierBands) -> Self {
        self.config.tiers = tiers;
        self
    }

    pub fn sensitivity_cap(mut self, cap: SensitivityCap) -> Self {
        self.config.sensitivity_cap = cap;
        self
    }

    pub fn sampling(mut self, sampling: SamplingPolicy) -> Self {
        self.config.sampling = sampling;
        self
    }

    pub fn structural(mut self, config: StructuralConfig) -> Self {
        self.config.structural = config;
        self
    }

    pub fn governance(mut self, config: GovernanceConfig) -> Self {
        self.config.governance = config;
        self
    }

    pub fn operational(mut self, config: OperationalConfig) -> Self {
        self.config.operational = config;
        self
    }

    pub fn logical(mut self, config: LogicalConfig) -> Self {
        self.config.logical = config;
        self
    }

    pub fn analytical(mut self, config: AnalyticalConfig) -> Self {
        self.config.analytical = config;
        self
    }

    /// Fixes "now" for staleness instead of using `profiled_at`.
    pub fn reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.config.reference_time = Some(reference_time);
        self
    }

    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
