//! Result types shared by every dimension analyzer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a risk flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable reason for a risk flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum FlagCode {
    // structural
    EmptyDataset,
    HighMissingness,
    DuplicateRows,
    RedundantFeature,
    EmptyColumn,
    ConstantColumn,
    // governance
    DirectIdentifier,
    QuasiIdentifier,
    FreeTextExposure,
    NoUniqueIdentifier,
    // operational
    NoTemporalColumn,
    InsufficientTemporalData,
    StaleData,
    SupplyGaps,
    VolumeInstability,
    // logical
    RuleViolation {
        rule_id: String,
        violation_count: usize,
    },
    NoApplicableRules,
    // analytical
    HighSkew,
    Multicollinearity,
    AnomalyDensity,
    SingularCorrelationMatrix,
    LowVariance,
    NoNumericColumns,
}

impl FlagCode {
    /// Stable name of the flag code.
    pub fn name(&self) -> &'static str {
        match self {
            FlagCode::EmptyDataset => "EmptyDataset",
            FlagCode::HighMissingness => "HighMissingness",
            FlagCode::DuplicateRows => "DuplicateRows",
            FlagCode::RedundantFeature => "RedundantFeature",
            FlagCode::EmptyColumn => "EmptyColumn",
            FlagCode::ConstantColumn => "ConstantColumn",
            FlagCode::DirectIdentifier => "DirectIdentifier",
            FlagCode::QuasiIdentifier => "QuasiIdentifier",
            FlagCode::FreeTextExposure => "FreeTextExposure",
            FlagCode::NoUniqueIdentifier => "NoUniqueIdentifier",
            FlagCode::NoTemporalColumn => "NoTemporalColumn",
            FlagCode::InsufficientTemporalData => "InsufficientTemporalData",
            FlagCode::StaleData => "StaleData",
            FlagCode::SupplyGaps => "SupplyGaps",
            FlagCode::VolumeInstability => "VolumeInstability",
            FlagCode::RuleViolation { .. } => "RuleViolation",
            FlagCode::NoApplicableRules => "NoApplicableRules",
            FlagCode::HighSkew => "HighSkew",
            FlagCode::Multicollinearity => "Multicollinearity",
            FlagCode::AnomalyDensity => "AnomalyDensity",
            FlagCode::SingularCorrelationMatrix => "SingularCorrelationMatrix",
            FlagCode::LowVariance => "LowVariance",
            FlagCode::NoNumericColumns => "NoNumericColumns",
        }
    }
}

impl fmt::Display for FlagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagCode::RuleViolation {
                rule_id,
                violation_count,
            } => write!(f, "RuleViolation({rule_id}: {violation_count})"),
            other => f.write_str(other.name()),
        }
    }
}

/// A single finding raised by an analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlag {
    #[serde(flatten)]
    pub code: FlagCode,
    pub severity: Severity,
    pub message: String,
    pub affected_columns: BTreeSet<String>,
}

impl RiskFlag {
    pub fn new(code: FlagCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            affected_columns: BTreeSet::new(),
        }
    }

    /// Adds affected columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

/// Score, flags and metrics of one dimension.
///
/// The score is clamped into `[0, 1]` on construction (NaN reads as 0) and
/// non-finite metrics are never stored, so results always serialize to
/// plain JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    score: f64,
    flags: Vec<RiskFlag>,
    metrics: BTreeMap<String, f64>,
}

impl ScoreResult {
    pub fn new(score: f64) -> Self {
        Self {
            score: crate::analyzers::stats::clamp_unit(score),
            flags: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_flag(mut self, flag: RiskFlag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = RiskFlag>) -> Self {
        self.flags.extend(flags);
        self
    }

    /// Records a metric; non-finite values are skipped.
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        if value.is_finite() {
            self.metrics.insert(name.into(), value);
        }
        self
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn flags(&self) -> &[RiskFlag] {
        &self.flags
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// True if any flag carries the named code.
    pub fn has_flag(&self, code_name: &str) -> bool {
        self.flags.iter().any(|f| f.code.name() == code_name)
    }

    /// Flags carrying the named code.
    pub fn flags_named<'a>(&'a self, code_name: &'a str) -> impl Iterator<Item = &'a RiskFlag> {
        self.flags.iter().filter(move |f| f.code.name() == code_name)
    }
}

/// Dataset-level sensitivity, ordered `Low < Moderate < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SensitivityLevel {
    #[default]
    Low,
    Moderate,
    High,
}

impl SensitivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensitivityLevel::Low => "Low",
            SensitivityLevel::Moderate => "Moderate",
            SensitivityLevel::High => "High",
        }
    }
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five trust dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Structural,
    Governance,
    Operational,
    Logical,
    Analytical,
}

impl Dimension {
    /// All dimensions in aggregation order.
    pub const ALL: [Dimension; 5] = [
        Dimension::Structural,
        Dimension::Governance,
        Dimension::Operational,
        Dimension::Logical,
        Dimension::Analytical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Structural => "structural",
            Dimension::Governance => "governance",
            Dimension::Operational => "operational",
            Dimension::Logical => "logical",
            Dimension::Analytical => "analytical",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(ScoreResult::new(1.7).score(), 1.0);
        assert_eq!(ScoreResult::new(-0.2).score(), 0.0);
        assert_eq!(ScoreResult::new(f64::NAN).score(), 0.0);
    }

    #[test]
    fn test_non_finite_metrics_skipped() {
        let result = ScoreResult::new(0.5)
            .with_metric("ok", 0.25)
            .with_metric("bad", f64::INFINITY);
        assert_eq!(result.metric("ok"), Some(0.25));
        assert_eq!(result.metric("bad"), None);
    }

    #[test]
    fn test_rule_violation_serializes_flat() {
        let flag = RiskFlag::new(
            FlagCode::RuleViolation {
                rule_id: "profit_le_revenue".to_string(),
                violation_count: 4,
            },
            Severity::Medium,
            "profit exceeds revenue",
        )
        .with_columns(["revenue", "profit"]);

        let json = serde_json::to_value(&flag).unwrap();
        assert_eq!(json["code"], "RuleViolation");
        assert_eq!(json["rule_id"], "profit_le_revenue");
        assert_eq!(json["violation_count"], 4);
        assert_eq!(json["affected_columns"][0], "profit");

        let back: RiskFlag = serde_json::from_value(json).unwrap();
        assert_eq!(back, flag);
    }

    #[test]
    fn test_ordering() {
        assert!(SensitivityLevel::Low < SensitivityLevel::Moderate);
        assert!(SensitivityLevel::Moderate < SensitivityLevel::High);
        assert!(Severity::Low < Severity::High);
    }

    #[test]
    fn test_flag_lookup() {
        let result = ScoreResult::new(0.0)
            .with_flag(RiskFlag::new(FlagCode::EmptyDataset, Severity::High, "no rows"));
        assert!(result.has_flag("EmptyDataset"));
        assert!(!result.has_flag("DuplicateRows"));
        assert_eq!(result.flags_named("EmptyDataset").count(), 1);
    }
}
