//! Governance and sensitivity: pattern-based PII detection.
//!
//! Every column is checked against a declarative table of [`PatternRule`]s.
//! A rule matches on the normalized column name, or on a bounded sample of
//! text values, or both. Matched categories tag the column with a
//! [`SensitivityLevel`]; the dataset level is the maximum tag.
//!
//! ```text
//! governance_risk_score = sensitive_columns / column_count × weight(level)
//! governance_score      = 1 − governance_risk_score
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::context::AnalysisContext;
use super::stats::clamp_unit;
use super::traits::{Assessment, DimensionAnalyzer};
use super::types::{Dimension, FlagCode, RiskFlag, ScoreResult, SensitivityLevel, Severity};
use crate::error::Result;
use crate::logging::truncate_field;
use crate::profile::{normalize_column_name, ColumnType};

/// Kinds of sensitive content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    Email,
    Phone,
    NationalId,
    CreditCard,
    BankAccount,
    Credential,
    PersonName,
    PostalAddress,
    DateOfBirth,
    IpAddress,
    Compensation,
    FreeText,
}

impl PiiCategory {
    /// Direct identifiers are High, quasi-identifiers Moderate, free text Low.
    pub fn sensitivity(&self) -> SensitivityLevel {
        match self {
            PiiCategory::Email
            | PiiCategory::Phone
            | PiiCategory::NationalId
            | PiiCategory::CreditCard
            | PiiCategory::BankAccount
            | PiiCategory::Credential => SensitivityLevel::High,
            PiiCategory::PersonName
            | PiiCategory::PostalAddress
            | PiiCategory::DateOfBirth
            | PiiCategory::IpAddress
            | PiiCategory::Compensation => SensitivityLevel::Moderate,
            PiiCategory::FreeText => SensitivityLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PiiCategory::Email => "email",
            PiiCategory::Phone => "phone",
            PiiCategory::NationalId => "national_id",
            PiiCategory::CreditCard => "credit_card",
            PiiCategory::BankAccount => "bank_account",
            PiiCategory::Credential => "credential",
            PiiCategory::PersonName => "person_name",
            PiiCategory::PostalAddress => "postal_address",
            PiiCategory::DateOfBirth => "date_of_birth",
            PiiCategory::IpAddress => "ip_address",
            PiiCategory::Compensation => "compensation",
            PiiCategory::FreeText => "free_text",
        }
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the pattern table.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub category: PiiCategory,
    /// Matched against the normalized column name
    pub name: Option<Regex>,
    /// Searched for in sampled text values
    pub value: Option<Regex>,
}

impl PatternRule {
    /// Compiles a rule; names are matched case-insensitively.
    pub fn new(
        category: PiiCategory,
        name_pattern: Option<&str>,
        value_pattern: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            category,
            name: name_pattern
                .map(|p| Regex::new(&format!("(?i){p}")))
                .transpose()?,
            value: value_pattern.map(Regex::new).transpose()?,
        })
    }
}

/// The built-in pattern table.
///
/// Name patterns match whole `_`-separated tokens of the normalized name, so
/// `customer_email` matches but `voicemail` does not.
pub fn default_rules() -> Result<Vec<PatternRule>> {
    use PiiCategory::*;

    let table: [(PiiCategory, Option<&str>, Option<&str>); 12] = [
        (
            Email,
            Some(r"(^|_)e_?mail(_?address)?(_|$)"),
            Some(r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+"),
        ),
        (
            Phone,
            Some(r"(^|_)(phone|mobile|cell_?phone|tel|telephone|cell|fax)(_|$)"),
            Some(r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b"),
        ),
        (
            NationalId,
            Some(r"(^|_)(ssn|nin|tin|social_?security|national_?id|tax_?id|passport)(_|$)"),
            Some(r"\b\d{3}-\d{2}-\d{4}\b"),
        ),
        (
            CreditCard,
            Some(r"(^|_)(credit_?card|card_?number|cc_num|cvv|pan)(_|$)"),
            Some(r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b"),
        ),
        (
            BankAccount,
            Some(r"(^|_)(iban|bank_?account|account_?number|routing_?number|swift)(_|$)"),
            Some(r"\b[A-Z]{2}\d{2}\s?\d{4}\s?\d{4}\s?\d{4}\s?\d{4}\s?\d{0,4}\b"),
        ),
        (
            Credential,
            Some(r"(^|_)(password|passwd|pwd|secret|token|api_?key|private_?key)(_|$)"),
            None,
        ),
        (
            PersonName,
            Some(r"^((first|last|full|middle|given|family|sur|customer|contact|person|user|holder)_?)?name$"),
            None,
        ),
        (
            PostalAddress,
            Some(r"(^|_)(address|street|zip|zip_?code|post_?code|postal_?code)(_|$)"),
            None,
        ),
        (
            DateOfBirth,
            Some(r"(^|_)(dob|birth_?date|date_of_birth|birthday)(_|$)"),
            None,
        ),
        (
            IpAddress,
            Some(r"(^|_)(ip|ip_?address|ipv[46])(_|$)"),
            Some(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b"),
        ),
        (
            Compensation,
            Some(r"(^|_)(salary|wages?|compensation|(annual|household|personal)_income)(_|$)"),
            None,
        ),
        (
            FreeText,
            Some(r"(^|_)(notes?|comments?|description|remarks?|feedback|free_?text|memo)(_|$)"),
            None,
        ),
    ];

    table
        .into_iter()
        .map(|(category, name, value)| PatternRule::new(category, name, value))
        .collect()
}

/// Sampling and weighting for governance scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Non-null values sampled per text column (default: 1000)
    pub sample_size: usize,
    /// Fraction of sampled values that must match a value pattern; any match
    /// counts at the default of 0.0
    pub min_value_match_ratio: f64,
    /// Average words per value that marks a text column as free text (default: 5)
    pub free_text_min_words: f64,
    pub low_weight: f64,
    pub moderate_weight: f64,
    pub high_weight: f64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            min_value_match_ratio: 0.0,
            free_text_min_words: 5.0,
            low_weight: 0.3,
            moderate_weight: 0.6,
            high_weight: 1.0,
        }
    }
}

impl GovernanceConfig {
    pub fn severity_weight(&self, level: SensitivityLevel) -> f64 {
        match level {
            SensitivityLevel::Low => self.low_weight,
            SensitivityLevel::Moderate => self.moderate_weight,
            SensitivityLevel::High => self.high_weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceAssessment {
    pub result: ScoreResult,
    /// Dataset-level sensitivity
    pub sensitivity: SensitivityLevel,
    /// Sensitive column map: column name to its tag
    pub sensitive_columns: BTreeMap<String, SensitivityLevel>,
    /// Matched categories per sensitive column
    pub column_findings: BTreeMap<String, BTreeSet<PiiCategory>>,
    pub governance_risk_score: f64,
}

impl Assessment for GovernanceAssessment {
    fn result(&self) -> &ScoreResult {
        &self.result
    }
}

#[derive(Debug, Clone)]
pub struct GovernanceAnalyzer {
    config: GovernanceConfig,
    rules: Vec<PatternRule>,
}

impl GovernanceAnalyzer {
    /// Creates an analyzer with the built-in pattern table.
    pub fn new() -> Result<Self> {
        Self::with_config(GovernanceConfig::default())
    }

    pub fn with_config(config: GovernanceConfig) -> Result<Self> {
        Ok(Self {
            config,
            rules: default_rules()?,
        })
    }

    /// Appends a rule to the pattern table.
    pub fn with_rule(mut self, rule: PatternRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    fn value_matches(&self, pattern: &Regex, sample: &[&str]) -> bool {
        let hits = sample.iter().filter(|v| pattern.is_match(v)).count();
        hits > 0 && hits as f64 >= self.config.min_value_match_ratio * sample.len() as f64
    }

    fn is_free_text(&self, sample: &[&str]) -> bool {
        if sample.is_empty() {
            return false;
        }
        let words: usize = sample.iter().map(|v| v.split_whitespace().count()).sum();
        words as f64 / sample.len() as f64 >= self.config.free_text_min_words
    }
}

impl DimensionAnalyzer for GovernanceAnalyzer {
    type Output = GovernanceAssessment;

    fn dimension(&self) -> Dimension {
        Dimension::Governance
    }

    fn description(&self) -> &str {
        "PII and sensitive attribute detection with sensitivity classification"
    }

    #[instrument(skip(self, ctx), fields(columns = ctx.profile.column_count()))]
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> GovernanceAssessment {
        let profile = ctx.profile;
        let mut column_findings: BTreeMap<String, BTreeSet<PiiCategory>> = BTreeMap::new();

        for (meta, values) in profile.iter_columns() {
            let name = normalize_column_name(&meta.name);
            let sample: Vec<&str> = if meta.column_type.is_textual() {
                values
                    .as_text()
                    .unwrap_or_default()
                    .iter()
                    .flatten()
                    .map(String::as_str)
                    .take(self.config.sample_size)
                    .collect()
            } else {
                Vec::new()
            };

            let mut categories = BTreeSet::new();
            for rule in &self.rules {
                let by_name = rule.name.as_ref().is_some_and(|re| re.is_match(&name));
                let by_value = !sample.is_empty()
                    && rule
                        .value
                        .as_ref()
                        .is_some_and(|re| self.value_matches(re, &sample));
                if by_name || by_value {
                    categories.insert(rule.category);
                }
            }
            if meta.column_type == ColumnType::Text && self.is_free_text(&sample) {
                categories.insert(PiiCategory::FreeText);
            }

            if !categories.is_empty() {
                crate::log_analyzer!(
                    ctx.log,
                    column = %meta.name,
                    categories = ?categories,
                    "Sensitive column detected"
                );
                column_findings.insert(meta.name.clone(), categories);
            }
        }

        let sensitive_columns: BTreeMap<String, SensitivityLevel> = column_findings
            .iter()
            .map(|(column, categories)| {
                let level = categories
                    .iter()
                    .map(PiiCategory::sensitivity)
                    .max()
                    .unwrap_or_default();
                (column.clone(), level)
            })
            .collect();
        let sensitivity = sensitive_columns.values().copied().max().unwrap_or_default();

        let cols = profile.column_count();
        let risk = if cols == 0 {
            0.0
        } else {
            clamp_unit(
                sensitive_columns.len() as f64 / cols as f64
                    * self.config.severity_weight(sensitivity),
            )
        };

        let mut flags = Vec::new();
        let tier_flags = [
            (
                SensitivityLevel::High,
                FlagCode::DirectIdentifier,
                Severity::High,
                "direct identifier",
            ),
            (
                SensitivityLevel::Moderate,
                FlagCode::QuasiIdentifier,
                Severity::Medium,
                "quasi-identifier",
            ),
            (
                SensitivityLevel::Low,
                FlagCode::FreeTextExposure,
                Severity::Low,
                "free-text",
            ),
        ];
        for (level, code, severity, label) in tier_flags {
            let columns: Vec<&str> = sensitive_columns
                .iter()
                .filter(|(_, l)| **l == level)
                .map(|(c, _)| c.as_str())
                .collect();
            if !columns.is_empty() {
                flags.push(
                    RiskFlag::new(
                        code,
                        severity,
                        format!(
                            "{} {label} column(s): {}",
                            columns.len(),
                            truncate_field(&columns.join(", "), ctx.log.max_field_length)
                        ),
                    )
                    .with_columns(columns),
                );
            }
        }

        let rows = profile.row_count();
        if rows > 0 && cols > 0 && !profile.columns().iter().any(|c| c.is_unique_key(rows)) {
            flags.push(RiskFlag::new(
                FlagCode::NoUniqueIdentifier,
                Severity::Low,
                "No column uniquely identifies rows; re-identification risk is harder to bound",
            ));
        }

        let result = ScoreResult::new(1.0 - risk)
            .with_flags(flags)
            .with_metric("governance_risk_score", risk)
            .with_metric("sensitive_column_count", sensitive_columns.len() as f64)
            .with_metric(
                "direct_identifier_count",
                sensitive_columns
                    .values()
                    .filter(|l| **l == SensitivityLevel::High)
                    .count() as f64,
            );

        info!(
            score = result.score(),
            sensitivity = %sensitivity,
            sensitive = sensitive_columns.len(),
            "Governance analysis complete"
        );

        GovernanceAssessment {
            result,
            sensitivity,
            sensitive_columns,
            column_findings,
            governance_risk_score: risk,
        }
    }
}
