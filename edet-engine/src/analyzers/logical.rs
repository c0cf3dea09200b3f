//! Logical consistency: business-rule conformance.
//!
//! Columns are assigned semantic roles by a declarative [`RoleMatcher`]
//! table; [`LogicalRule`]s are then evaluated over every column (or column
//! pair) carrying the roles they reference. A rule with no matching column
//! is skipped.
//!
//! ```text
//! violation_rate = rows violating at least one rule / row_count
//! logical_score  = 1 − violation_rate
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::context::AnalysisContext;
use super::traits::{Assessment, DimensionAnalyzer};
use super::types::{Dimension, FlagCode, RiskFlag, ScoreResult, Severity};
use crate::error::{EngineError, Result};
use crate::profile::{normalize_column_name, CellKey, ColumnMeta, ColumnType, ColumnValues};

/// Business meaning inferred from a column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRole {
    Revenue,
    Profit,
    Quantity,
    Identifier,
    /// A role registered through [`LogicalAnalyzerBuilder::role`]
    Custom(String),
}

impl fmt::Display for SemanticRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticRole::Revenue => f.write_str("revenue"),
            SemanticRole::Profit => f.write_str("profit"),
            SemanticRole::Quantity => f.write_str("quantity"),
            SemanticRole::Identifier => f.write_str("identifier"),
            SemanticRole::Custom(name) => f.write_str(name),
        }
    }
}

/// Assigns a role to columns whose normalized name matches.
#[derive(Debug, Clone)]
pub struct RoleMatcher {
    pub role: SemanticRole,
    pub pattern: Regex,
    pub accepts: Vec<ColumnType>,
    /// Minimum distinct/non-null ratio, for name patterns that are only
    /// meaningful on near-unique columns
    pub min_distinct_ratio: Option<f64>,
}

impl RoleMatcher {
    pub fn new(role: SemanticRole, pattern: &str, accepts: &[ColumnType]) -> Result<Self> {
        Ok(Self {
            role,
            pattern: Regex::new(&format!("(?i){pattern}"))?,
            accepts: accepts.to_vec(),
            min_distinct_ratio: None,
        })
    }

    pub fn with_min_distinct_ratio(mut self, ratio: f64) -> Self {
        self.min_distinct_ratio = Some(ratio);
        self
    }

    fn matches(&self, normalized_name: &str, meta: &ColumnMeta, row_count: usize) -> bool {
        if !self.accepts.contains(&meta.column_type) || !self.pattern.is_match(normalized_name) {
            return false;
        }
        match self.min_distinct_ratio {
            Some(ratio) => {
                let present = row_count - meta.missing_count;
                present > 0 && meta.distinct_count as f64 >= ratio * present as f64
            }
            None => true,
        }
    }
}

/// The built-in role table.
pub fn default_roles() -> Result<Vec<RoleMatcher>> {
    use ColumnType::{Categorical, Numeric, Text};

    Ok(vec![
        RoleMatcher::new(SemanticRole::Revenue, r"revenue|sales|amount", &[Numeric])?,
        RoleMatcher::new(SemanticRole::Profit, r"profit|net_income", &[Numeric])?,
        RoleMatcher::new(
            SemanticRole::Quantity,
            r"(^|_)(qty|quantity|count|units)(_|$)",
            &[Numeric],
        )?,
        RoleMatcher::new(
            SemanticRole::Identifier,
            r"^(id|key|uuid|guid|pk|row_id|record_id)$|(^|_)(txn|transaction)(_?(id|no|num|number|ref|key))?$",
            &[Numeric, Text, Categorical],
        )?,
        RoleMatcher::new(
            SemanticRole::Identifier,
            r"_(id|key)$",
            &[Numeric, Text, Categorical],
        )?
        .with_min_distinct_ratio(0.9),
    ])
}

/// What a rule checks for each applicable column or column pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCheck {
    /// Numeric values must be ≥ 0
    NonNegative(SemanticRole),
    /// `lhs ≤ rhs` wherever both are present, for every lhs × rhs column pair
    NotExceeding { lhs: SemanticRole, rhs: SemanticRole },
    /// Non-null values must not repeat
    UniqueValues(SemanticRole),
    /// Text ids must be non-blank without whitespace; numeric ids must be
    /// non-negative integers
    IdentifierFormat(SemanticRole),
}

/// A named business rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalRule {
    pub id: String,
    pub description: String,
    pub check: RuleCheck,
}

impl LogicalRule {
    pub fn new(id: impl Into<String>, description: impl Into<String>, check: RuleCheck) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            check,
        }
    }
}

/// The built-in rule set.
pub fn default_rules() -> Vec<LogicalRule> {
    vec![
        LogicalRule::new(
            "revenue_non_negative",
            "revenue-like values must not be negative",
            RuleCheck::NonNegative(SemanticRole::Revenue),
        ),
        LogicalRule::new(
            "quantity_non_negative",
            "quantities must not be negative",
            RuleCheck::NonNegative(SemanticRole::Quantity),
        ),
        LogicalRule::new(
            "profit_le_revenue",
            "profit must not exceed revenue",
            RuleCheck::NotExceeding {
                lhs: SemanticRole::Profit,
                rhs: SemanticRole::Revenue,
            },
        ),
        LogicalRule::new(
            "identifier_unique",
            "identifiers must be unique",
            RuleCheck::UniqueValues(SemanticRole::Identifier),
        ),
        LogicalRule::new(
            "identifier_format",
            "identifiers must be well formed",
            RuleCheck::IdentifierFormat(SemanticRole::Identifier),
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicalConfig {
    /// Violations a rule instance needs before it is flagged (default: 1)
    pub min_violation_count: usize,
    /// Violation rate above which a flag is High (default: 0.10)
    pub high_severity_rate: f64,
    /// Violation rate above which a flag is Medium (default: 0.01)
    pub medium_severity_rate: f64,
}

impl Default for LogicalConfig {
    fn default() -> Self {
        Self {
            min_violation_count: 1,
            high_severity_rate: 0.10,
            medium_severity_rate: 0.01,
        }
    }
}

/// Violations of one rule on one column or column pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub columns: Vec<String>,
    pub violation_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalAssessment {
    pub result: ScoreResult,
    pub violation_rate: f64,
    /// Columns per detected role, keyed by role name
    pub roles: BTreeMap<String, Vec<String>>,
    /// Every evaluated rule instance, violated or not
    pub outcomes: Vec<RuleOutcome>,
    /// Set when the dataset has no rows; the score is then not aggregated
    pub empty_dataset: bool,
}

impl Assessment for LogicalAssessment {
    fn result(&self) -> &ScoreResult {
        &self.result
    }

    fn aggregate_score(&self) -> Option<f64> {
        (!self.empty_dataset).then(|| self.result.score())
    }
}

/// Builder for [`LogicalAnalyzer`].
///
/// # Example
///
/// ```rust
/// use edet_engine::analyzers::{LogicalAnalyzer, LogicalRule, RuleCheck, SemanticRole};
/// use edet_engine::profile::ColumnType;
///
/// let discount = SemanticRole::Custom("discount".into());
/// let analyzer = LogicalAnalyzer::builder()
///     .role(discount.clone(), r"discount", &[ColumnType::Numeric])
///     .rule(LogicalRule::new(
///         "discount_le_revenue",
///         "discount must not exceed revenue",
///         RuleCheck::NotExceeding { lhs: discount, rhs: SemanticRole::Revenue },
///     ))
///     .build()
///     .unwrap();
/// assert_eq!(analyzer.rules().len(), 6);
/// ```
#[derive(Debug, Default)]
pub struct LogicalAnalyzerBuilder {
    config: LogicalConfig,
    custom_roles: Vec<(SemanticRole, String, Vec<ColumnType>)>,
    rules: Vec<LogicalRule>,
    skip_default_rules: bool,
}

impl LogicalAnalyzerBuilder {
    pub fn config(mut self, config: LogicalConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a role matcher, compiled in [`build`](Self::build).
    pub fn role(
        mut self,
        role: SemanticRole,
        pattern: impl Into<String>,
        accepts: &[ColumnType],
    ) -> Self {
        self.custom_roles
            .push((role, pattern.into(), accepts.to_vec()));
        self
    }

    pub fn rule(mut self, rule: LogicalRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Evaluates only rules added through [`rule`](Self::rule).
    pub fn without_default_rules(mut self) -> Self {
        self.skip_default_rules = true;
        self
    }

    /// Compiles the role table. Invalid patterns or duplicate rule ids are
    /// configuration errors.
    pub fn build(self) -> Result<LogicalAnalyzer> {
        let mut roles = default_roles()?;
        for (role, pattern, accepts) in &self.custom_roles {
            roles.push(RoleMatcher::new(role.clone(), pattern, accepts)?);
        }

        let mut rules = if self.skip_default_rules {
            Vec::new()
        } else {
            default_rules()
        };
        rules.extend(self.rules);

        let mut ids = HashSet::new();
        for rule in &rules {
            if !ids.insert(rule.id.as_str()) {
                return Err(EngineError::configuration(format!(
                    "duplicate logical rule id '{}'",
                    rule.id
                )));
            }
        }

        Ok(LogicalAnalyzer {
            config: self.config,
            roles,
            rules,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogicalAnalyzer {
    config: LogicalConfig,
    roles: Vec<RoleMatcher>,
    rules: Vec<LogicalRule>,
}

impl LogicalAnalyzer {
    pub fn builder() -> LogicalAnalyzerBuilder {
        LogicalAnalyzerBuilder::default()
    }

    /// Analyzer with the built-in roles and rules.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn config(&self) -> &LogicalConfig {
        &self.config
    }

    pub fn rules(&self) -> &[LogicalRule] {
        &self.rules
    }

    /// Column indices per role, in schema order.
    fn detect_roles(&self, ctx: &AnalysisContext<'_>) -> BTreeMap<SemanticRole, Vec<usize>> {
        let rows = ctx.profile.row_count();
        let mut detected: BTreeMap<SemanticRole, Vec<usize>> = BTreeMap::new();
        for (index, meta) in ctx.profile.columns().iter().enumerate() {
            let name = normalize_column_name(&meta.name);
            for matcher in &self.roles {
                if matcher.matches(&name, meta, rows) {
                    let columns = detected.entry(matcher.role.clone()).or_default();
                    if !columns.contains(&index) {
                        columns.push(index);
                    }
                }
            }
        }
        detected
    }

    fn severity(&self, rate: f64) -> Severity {
        if rate > self.config.high_severity_rate {
            Severity::High
        } else if rate > self.config.medium_severity_rate {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

fn columns_for<'a>(detected: &'a BTreeMap<SemanticRole, Vec<usize>>, role: &SemanticRole) -> &'a [usize] {
    detected.get(role).map(Vec::as_slice).unwrap_or(&[])
}

/// Marks violating rows of one rule instance; returns `None` when the
/// columns have the wrong storage for the check.
fn check_rows(check: &RuleCheck, columns: &[&ColumnValues], violations: &mut [bool]) -> Option<usize> {
    let mut count = 0;
    let mut mark = |row: usize, violations: &mut [bool]| {
        violations[row] = true;
        count += 1;
    };

    match (check, columns) {
        (RuleCheck::NonNegative(_), [values]) => {
            let values = values.as_numeric()?;
            for (row, v) in values.iter().enumerate() {
                if matches!(v, Some(x) if *x < 0.0) {
                    mark(row, violations);
                }
            }
        }
        (RuleCheck::NotExceeding { .. }, [lhs, rhs]) => {
            let (lhs, rhs) = (lhs.as_numeric()?, rhs.as_numeric()?);
            for (row, (l, r)) in lhs.iter().zip(rhs).enumerate() {
                if let (Some(l), Some(r)) = (l, r) {
                    if l > r {
                        mark(row, violations);
                    }
                }
            }
        }
        (RuleCheck::UniqueValues(_), [values]) => {
            let mut seen = HashSet::with_capacity(values.len());
            for row in 0..values.len() {
                let cell = values.cell(row);
                if cell != CellKey::Null && !seen.insert(cell) {
                    mark(row, violations);
                }
            }
        }
        (RuleCheck::IdentifierFormat(_), [values]) => match values {
            ColumnValues::Text(text) => {
                for (row, v) in text.iter().enumerate() {
                    if let Some(s) = v {
                        if s.trim().is_empty() || s.chars().any(char::is_whitespace) {
                            mark(row, violations);
                        }
                    }
                }
            }
            ColumnValues::Numeric(numbers) => {
                for (row, v) in numbers.iter().enumerate() {
                    if matches!(v, Some(x) if *x < 0.0 || x.fract() != 0.0) {
                        mark(row, violations);
                    }
                }
            }
            _ => return None,
        },
        _ => return None,
    }
    Some(count)
}

impl DimensionAnalyzer for LogicalAnalyzer {
    type Output = LogicalAssessment;

    fn dimension(&self) -> Dimension {
        Dimension::Logical
    }

    fn description(&self) -> &str {
        "Business-rule conformance over semantically detected columns"
    }

    #[instrument(skip(self, ctx), fields(rules = self.rules.len()))]
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> LogicalAssessment {
        let profile = ctx.profile;
        let detected = self.detect_roles(ctx);
        let roles: BTreeMap<String, Vec<String>> = detected
            .iter()
            .map(|(role, indices)| {
                let names = indices
                    .iter()
                    .map(|&i| profile.columns()[i].name.clone())
                    .collect();
                (role.to_string(), names)
            })
            .collect();

        if profile.is_empty() {
            info!("Dataset has no rows, logical score excluded");
            return LogicalAssessment {
                result: ScoreResult::new(0.0).with_flag(RiskFlag::new(
                    FlagCode::EmptyDataset,
                    Severity::High,
                    "Dataset contains no rows",
                )),
                violation_rate: 0.0,
                roles,
                outcomes: Vec::new(),
                empty_dataset: true,
            };
        }

        let rows = profile.row_count();
        let mut violated = vec![false; rows];
        let mut outcomes = Vec::new();
        let mut flags = Vec::new();

        for rule in &self.rules {
            let instances: Vec<Vec<usize>> = match &rule.check {
                RuleCheck::NonNegative(role)
                | RuleCheck::UniqueValues(role)
                | RuleCheck::IdentifierFormat(role) => {
                    columns_for(&detected, role).iter().map(|&i| vec![i]).collect()
                }
                RuleCheck::NotExceeding { lhs, rhs } => columns_for(&detected, lhs)
                    .iter()
                    .flat_map(|&l| {
                        columns_for(&detected, rhs)
                            .iter()
                            .filter(move |&&r| r != l)
                            .map(move |&r| vec![l, r])
                    })
                    .collect(),
            };

            for indices in instances {
                let values: Vec<&ColumnValues> = indices
                    .iter()
                    .filter_map(|&i| profile.values(i))
                    .collect();
                let Some(count) = check_rows(&rule.check, &values, &mut violated) else {
                    debug!(rule = %rule.id, "Rule not applicable to column storage");
                    continue;
                };
                let names: Vec<String> = indices
                    .iter()
                    .map(|&i| profile.columns()[i].name.clone())
                    .collect();

                crate::log_analyzer!(
                    ctx.log,
                    rule = %rule.id,
                    columns = ?names,
                    violations = count,
                    "Evaluated logical rule"
                );

                if count >= self.config.min_violation_count.max(1) {
                    let rate = count as f64 / rows as f64;
                    flags.push(
                        RiskFlag::new(
                            FlagCode::RuleViolation {
                                rule_id: rule.id.clone(),
                                violation_count: count,
                            },
                            self.severity(rate),
                            format!(
                                "{} ({}): {count} row(s) in violation",
                                rule.description,
                                names.join(", ")
                            ),
                        )
                        .with_columns(names.iter().cloned()),
                    );
                }
                outcomes.push(RuleOutcome {
                    rule_id: rule.id.clone(),
                    columns: names,
                    violation_count: count,
                });
            }
        }

        if outcomes.is_empty() {
            info!("No logical rule applies to this dataset");
            return LogicalAssessment {
                result: ScoreResult::new(1.0)
                    .with_flag(RiskFlag::new(
                        FlagCode::NoApplicableRules,
                        Severity::Low,
                        "No business rule matched any column; logical consistency is unverified",
                    ))
                    .with_metric("applicable_rule_count", 0.0)
                    .with_metric("violation_rate", 0.0),
                violation_rate: 0.0,
                roles,
                outcomes,
                empty_dataset: false,
            };
        }

        let violating_rows = violated.iter().filter(|v| **v).count();
        let violation_rate = violating_rows as f64 / rows as f64;
        let result = ScoreResult::new(1.0 - violation_rate)
            .with_flags(flags)
            .with_metric("applicable_rule_count", outcomes.len() as f64)
            .with_metric("violating_row_count", violating_rows as f64)
            .with_metric("violation_rate", violation_rate);

        info!(
            score = result.score(),
            violation_rate,
            applicable = outcomes.len(),
            "Logical analysis complete"
        );

        LogicalAssessment {
            result,
            violation_rate,
            roles,
            outcomes,
            empty_dataset: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::SamplingPolicy;
    use crate::profile::{DatasetProfile, ProfileBuilder};

    fn analyze(profile: &DatasetProfile) -> LogicalAssessment {
        let sampling = SamplingPolicy::default();
        LogicalAnalyzer::new()
            .unwrap()
            .analyze(&AnalysisContext::new(profile, &sampling))
    }

    fn numbers(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|v| Some(*v)).collect()
    }

    #[test]
    fn test_profit_exceeding_revenue() {
        let revenue: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let mut profit: Vec<f64> = revenue.iter().map(|r| r * 0.2).collect();
        profit[3] = 500.0;
        profit[7] = 900.0;
        let profile = ProfileBuilder::new("memory")
            .numeric("revenue", numbers(&revenue))
            .numeric("profit", numbers(&profit))
            .build()
            .unwrap();

        let assessment = analyze(&profile);
        assert!((assessment.result.score() - 0.9).abs() < 1e-12);
        let violations: Vec<_> = assessment.result.flags_named("RuleViolation").collect();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].code,
            FlagCode::RuleViolation {
                rule_id: "profit_le_revenue".to_string(),
                violation_count: 2,
            }
        );
    }

    #[test]
    fn test_rows_counted_once_across_rules() {
        let profile = ProfileBuilder::new("memory")
            .numeric("sales", numbers(&[-5.0, 10.0, 10.0, 10.0]))
            .numeric("quantity", numbers(&[-1.0, 1.0, 2.0, 3.0]))
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert_eq!(assessment.result.flags_named("RuleViolation").count(), 2);
        assert!((assessment.violation_rate - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_identifier_rules() {
        let profile = ProfileBuilder::new("memory")
            .text(
                "transaction_id",
                vec![
                    Some("T1".to_string()),
                    Some("T2".to_string()),
                    Some("T2".to_string()),
                    Some("T 4".to_string()),
                ],
            )
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        let ids: Vec<&str> = assessment
            .outcomes
            .iter()
            .filter(|o| o.violation_count > 0)
            .map(|o| o.rule_id.as_str())
            .collect();
        assert_eq!(ids, vec!["identifier_unique", "identifier_format"]);
        assert!((assessment.violation_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_foreign_key_style_ids_are_not_identifiers() {
        let profile = ProfileBuilder::new("memory")
            .numeric("customer_id", numbers(&[1.0, 1.0, 2.0, 2.0]))
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert!(assessment.roles.is_empty());
        assert!(assessment.result.has_flag("NoApplicableRules"));
        assert_eq!(assessment.result.score(), 1.0);
    }

    #[test]
    fn test_quantity_tokens() {
        let profile = ProfileBuilder::new("memory")
            .numeric("account", numbers(&[-1.0, 2.0]))
            .numeric("unit_count", numbers(&[1.0, 2.0]))
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert_eq!(
            assessment.roles.get("quantity"),
            Some(&vec!["unit_count".to_string()])
        );
        assert_eq!(assessment.result.score(), 1.0);
    }

    #[test]
    fn test_empty_dataset_excluded() {
        let profile = ProfileBuilder::new("memory")
            .numeric("revenue", vec![])
            .build()
            .unwrap();
        let assessment = analyze(&profile);
        assert_eq!(assessment.result.score(), 0.0);
        assert!(assessment.result.has_flag("EmptyDataset"));
        assert_eq!(assessment.aggregate_score(), None);
    }

    #[test]
    fn test_custom_rule_through_builder() {
        let cost = SemanticRole::Custom("cost".to_string());
        let analyzer = LogicalAnalyzer::builder()
            .role(cost.clone(), "(^|_)cost$", &[ColumnType::Numeric])
            .rule(LogicalRule::new(
                "cost_non_negative",
                "costs must not be negative",
                RuleCheck::NonNegative(cost),
            ))
            .build()
            .unwrap();
        let profile = ProfileBuilder::new("memory")
            .numeric("unit_cost", numbers(&[1.0, -2.0, 3.0, 4.0]))
            .build()
            .unwrap();
        let sampling = SamplingPolicy::default();
        let assessment = analyzer.analyze(&AnalysisContext::new(&profile, &sampling));
        assert!((assessment.result.score() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_role_pattern_rejected() {
        let err = LogicalAnalyzer::builder()
            .role(SemanticRole::Custom("x".into()), "([", &[ColumnType::Numeric])
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_duplicate_rule_id_rejected() {
        let err = LogicalAnalyzer::builder()
            .rule(LogicalRule::new(
                "identifier_unique",
                "again",
                RuleCheck::UniqueValues(SemanticRole::Identifier),
            ))
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
