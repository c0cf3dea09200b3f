//! Trust tiers, tier bands, the sensitivity cap and dimension weights.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analyzers::{Dimension, SensitivityLevel};
use crate::error::{EngineError, Result};

/// Discrete trust tier, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrustTier {
    #[serde(rename = "Not Trustworthy")]
    NotTrustworthy,
    #[serde(rename = "Risk Present")]
    RiskPresent,
    #[serde(rename = "Review Recommended")]
    ReviewRecommended,
    #[serde(rename = "Decision-Ready")]
    DecisionReady,
}

impl TrustTier {
    /// Stable label used in reports and serialized bundles.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustTier::NotTrustworthy => "Not Trustworthy",
            TrustTier::RiskPresent => "Risk Present",
            TrustTier::ReviewRecommended => "Review Recommended",
            TrustTier::DecisionReady => "Decision-Ready",
        }
    }

    /// Tier for `score` under the default bands.
    pub fn from_score(score: f64) -> Self {
        TierBands::default().tier_for(score)
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds of the upper three tiers. Anything below `risk_present`
/// is `NotTrustworthy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierBands {
    /// Default: 0.80
    pub decision_ready: f64,
    /// Default: 0.60
    pub review_recommended: f64,
    /// Default: 0.40
    pub risk_present: f64,
}

impl Default for TierBands {
    fn default() -> Self {
        Self {
            decision_ready: 0.80,
            review_recommended: 0.60,
            risk_present: 0.40,
        }
    }
}

impl TierBands {
    /// Bands must lie in `[0, 1]` and be strictly increasing.
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.risk_present, self.review_recommended, self.decision_ready];
        if bounds.iter().any(|b| !(0.0..=1.0).contains(b)) {
            return Err(EngineError::configuration(format!(
                "tier bands must lie in [0, 1], got {bounds:?}"
            )));
        }
        if !(self.risk_present < self.review_recommended
            && self.review_recommended < self.decision_ready)
        {
            return Err(EngineError::configuration(format!(
                "tier bands must be strictly increasing, got {bounds:?}"
            )));
        }
        Ok(())
    }

    pub fn tier_for(&self, score: f64) -> TrustTier {
        if score >= self.decision_ready {
            TrustTier::DecisionReady
        } else if score >= self.review_recommended {
            TrustTier::ReviewRecommended
        } else if score >= self.risk_present {
            TrustTier::RiskPresent
        } else {
            TrustTier::NotTrustworthy
        }
    }
}

/// Caps the tier of sensitive datasets after band lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityCap {
    pub enabled: bool,
    /// Sensitivity at or above which the cap applies (default: High)
    pub trigger: SensitivityLevel,
    /// Best tier a capped dataset can reach (default: ReviewRecommended)
    pub max_tier: TrustTier,
}

impl Default for SensitivityCap {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger: SensitivityLevel::High,
            max_tier: TrustTier::ReviewRecommended,
        }
    }
}

impl SensitivityCap {
    /// Returns the final tier and whether the cap lowered it.
    pub fn apply(&self, tier: TrustTier, sensitivity: SensitivityLevel) -> (TrustTier, bool) {
        if self.enabled && sensitivity >= self.trigger && tier > self.max_tier {
            (self.max_tier, true)
        } else {
            (tier, false)
        }
    }
}

/// Per-dimension EDTI weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustWeights {
    pub structural: f64,
    pub governance: f64,
    pub operational: f64,
    pub logical: f64,
    pub analytical: f64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        Self {
            structural: 0.25,
            governance: 0.20,
            operational: 0.15,
            logical: 0.20,
            analytical: 0.20,
        }
    }
}

impl TrustWeights {
    pub fn weight(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Structural => self.structural,
            Dimension::Governance => self.governance,
            Dimension::Operational => self.operational,
            Dimension::Logical => self.logical,
            Dimension::Analytical => self.analytical,
        }
    }

    pub fn total(&self) -> f64 {
        Dimension::ALL.iter().map(|d| self.weight(*d)).sum()
    }

    /// Weights must be finite, non-negative and sum to a positive value.
    pub fn validate(&self) -> Result<()> {
        for dimension in Dimension::ALL {
            let weight = self.weight(dimension);
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::configuration(format!(
                    "weight for {dimension} must be a non-negative number, got {weight}"
                )));
            }
        }
        if self.total() <= 0.0 {
            return Err(EngineError::configuration("weights must not sum to zero"));
        }
        Ok(())
    }

    /// Weights rescaled to sum to 1 over `available` dimensions.
    ///
    /// Returns an empty map when nothing is available or every available
    /// dimension has weight 0.
    pub fn renormalize(&self, available: &[Dimension]) -> BTreeMap<String, f64> {
        let total: f64 = available.iter().map(|d| self.weight(*d)).sum();
        if total <= 0.0 {
            return BTreeMap::new();
        }
        available
            .iter()
            .map(|d| (d.as_str().to_string(), self.weight(*d) / total))
            .collect()
    }
}
