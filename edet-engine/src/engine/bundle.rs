//! The evaluation result bundle and its flat export.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::tier::TrustTier;
use crate::analyzers::{
    AnalyticalAssessment, Dimension, GovernanceAssessment, LogicalAssessment,
    OperationalAssessment, RiskFlag, ScoreResult, SensitivityLevel, StructuralAssessment,
};
use crate::error::Result;
use crate::profile::ProfileSummary;

/// Heatmap key for the analytical preparation burden.
pub const PREPARATION_BURDEN: &str = "preparation_burden";

/// Aggregated trust outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustAssessment {
    /// Enterprise Data Trust Index in `[0, 1]`
    pub edti_score: f64,
    /// Tier after the sensitivity cap
    pub trust_tier: TrustTier,
    /// Tier from the bands alone
    pub uncapped_tier: TrustTier,
    pub sensitivity: SensitivityLevel,
    pub sensitivity_capped: bool,
    /// Score per dimension, keyed by dimension name
    pub component_scores: BTreeMap<String, f64>,
    /// Dimensions left out of the EDTI
    pub excluded_dimensions: Vec<Dimension>,
    /// Renormalized weights that produced the EDTI
    pub weights_used: BTreeMap<String, f64>,
    /// `1 − score` per dimension plus the preparation burden; higher is riskier
    pub risk_heatmap: BTreeMap<String, f64>,
}

/// Everything one evaluation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub profile: ProfileSummary,
    pub structural: StructuralAssessment,
    pub governance: GovernanceAssessment,
    pub operational: OperationalAssessment,
    pub logical: LogicalAssessment,
    pub analytical: AnalyticalAssessment,
    pub trust: TrustAssessment,
}

impl ResultBundle {
    /// The scored result of one dimension.
    pub fn result(&self, dimension: Dimension) -> &ScoreResult {
        match dimension {
            Dimension::Structural => &self.structural.result,
            Dimension::Governance => &self.governance.result,
            Dimension::Operational => &self.operational.result,
            Dimension::Logical => &self.logical.result,
            Dimension::Analytical => &self.analytical.result,
        }
    }

    /// Every flag raised, tagged with its dimension.
    pub fn all_flags(&self) -> impl Iterator<Item = (Dimension, &RiskFlag)> {
        Dimension::ALL
            .into_iter()
            .flat_map(move |d| self.result(d).flags().iter().map(move |f| (d, f)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Flat `dotted.key → value` view used by the executive summary export.
    ///
    /// Keys are grouped by prefix: `profile.*`, one prefix per dimension
    /// (`score`, `flag_count`, `flags`, `metrics.*` and a few
    /// dimension-specific entries) and `trust.*`.
    pub fn flatten(&self) -> BTreeMap<String, Value> {
        let mut out = BTreeMap::new();
        let mut put = |key: String, value: Value| {
            out.insert(key, value);
        };

        let p = &self.profile;
        put("profile.source_type".into(), json!(p.source_type));
        put("profile.row_count".into(), json!(p.row_count));
        put("profile.column_count".into(), json!(p.column_count));
        put("profile.numeric_density".into(), json!(p.numeric_density));
        put("profile.has_temporal".into(), json!(p.has_temporal));
        put("profile.has_text".into(), json!(p.has_text));
        put("profile.missing_rate".into(), json!(p.missing_rate));
        put("profile.profiled_at".into(), json!(p.profiled_at.to_rfc3339()));
        put("profile.fingerprint".into(), json!(p.fingerprint));

        for dimension in Dimension::ALL {
            let prefix = dimension.as_str();
            let result = self.result(dimension);
            put(format!("{prefix}.score"), json!(result.score()));
            put(format!("{prefix}.flag_count"), json!(result.flags().len()));
            let codes: Vec<&str> = result.flags().iter().map(|f| f.code.name()).collect();
            put(format!("{prefix}.flags"), json!(codes.join(",")));
            for (name, value) in result.metrics() {
                put(format!("{prefix}.metrics.{name}"), json!(value));
            }
        }

        put(
            "structural.redundant_pairs".into(),
            json!(self.structural.redundant_pairs.len()),
        );
        put(
            "governance.sensitivity".into(),
            json!(self.governance.sensitivity.as_str()),
        );
        let sensitive: Vec<&str> = self
            .governance
            .sensitive_columns
            .keys()
            .map(String::as_str)
            .collect();
        put("governance.sensitive_columns".into(), json!(sensitive.join(",")));
        put(
            "operational.temporal_column".into(),
            json!(self.operational.temporal_column),
        );
        put("operational.lag_days".into(), json!(self.operational.lag_days));
        put(
            "logical.violation_rate".into(),
            json!(self.logical.violation_rate),
        );
        put(
            "analytical.preparation_complexity".into(),
            json!(self.analytical.preparation_complexity),
        );

        let t = &self.trust;
        put("trust.edti_score".into(), json!(t.edti_score));
        put("trust.trust_tier".into(), json!(t.trust_tier.as_str()));
        put("trust.uncapped_tier".into(), json!(t.uncapped_tier.as_str()));
        put("trust.sensitivity".into(), json!(t.sensitivity.as_str()));
        put("trust.sensitivity_capped".into(), json!(t.sensitivity_capped));
        let excluded: Vec<&str> = t.excluded_dimensions.iter().map(|d| d.as_str()).collect();
        put("trust.excluded_dimensions".into(), json!(excluded.join(",")));
        for (name, weight) in &t.weights_used {
            put(format!("trust.weights.{name}"), json!(weight));
        }
        for (name, risk) in &t.risk_heatmap {
            put(format!("trust.heatmap.{name}"), json!(risk));
        }

        out
    }
}
