//! Output formatting for evaluation results.
//!
//! Two formatters ship with the crate: [`JsonFormatter`] for machine
//! consumption (full bundle or the flat dotted-key export) and
//! [`SummaryFormatter`] for the human-readable executive summary.
//!
//! # Examples
//!
//! ```rust
//! use edet_engine::config::EngineConfig;
//! use edet_engine::engine::TrustEngine;
//! use edet_engine::formatters::{BundleFormatter, SummaryFormatter};
//! use edet_engine::profile::ProfileBuilder;
//!
//! let profile = ProfileBuilder::new("memory")
//!     .numeric("amount", vec![Some(1.0), Some(2.0), Some(3.0)])
//!     .build()
//!     .unwrap();
//! let bundle = TrustEngine::new(EngineConfig::default())
//!     .unwrap()
//!     .evaluate(&profile)
//!     .unwrap();
//!
//! let summary = SummaryFormatter::new().format(&bundle).unwrap();
//! assert!(summary.contains("Enterprise Data Trust Index"));
//! ```

use std::fmt::Write;

use serde_json::Value;

use crate::analyzers::{Dimension, ScoreResult};
use crate::engine::ResultBundle;
use crate::error::Result;

/// Configuration options for formatting result bundles.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include per-dimension metrics
    pub include_metrics: bool,
    /// Include risk flags
    pub include_flags: bool,
    /// Flags listed per dimension in the summary (`None` for all)
    pub max_flags_per_dimension: Option<usize>,
    /// Include the risk heatmap section
    pub include_heatmap: bool,
    /// Include the profiling timestamp
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_metrics: false,
            include_flags: true,
            max_flags_per_dimension: Some(10),
            include_heatmap: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Scores and tier only.
    pub fn minimal() -> Self {
        Self {
            include_metrics: false,
            include_flags: false,
            max_flags_per_dimension: Some(0),
            include_heatmap: false,
            include_timestamps: false,
        }
    }

    /// Everything, including every flag and metric.
    pub fn detailed() -> Self {
        Self {
            include_metrics: true,
            include_flags: true,
            max_flags_per_dimension: None,
            include_heatmap: true,
            include_timestamps: true,
        }
    }

    pub fn with_metrics(mut self, include: bool) -> Self {
        self.include_metrics = include;
        self
    }

    pub fn with_flags(mut self, include: bool) -> Self {
        self.include_flags = include;
        self
    }

    pub fn with_max_flags(mut self, max: Option<usize>) -> Self {
        self.max_flags_per_dimension = max;
        self
    }

    pub fn with_heatmap(mut self, include: bool) -> Self {
        self.include_heatmap = include;
        self
    }

    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }
}

/// Converts a [`ResultBundle`] into a string representation.
///
/// # Examples
///
/// ```rust
/// use edet_engine::engine::ResultBundle;
/// use edet_engine::formatters::BundleFormatter;
///
/// struct TierOnly;
///
/// impl BundleFormatter for TierOnly {
///     fn format(&self, bundle: &ResultBundle) -> edet_engine::prelude::Result<String> {
///         Ok(bundle.trust.trust_tier.to_string())
///     }
/// }
/// ```
pub trait BundleFormatter {
    fn format(&self, bundle: &ResultBundle) -> Result<String>;

    /// Formats with explicit options. The default ignores them.
    fn format_with_config(
        &self,
        bundle: &ResultBundle,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(bundle)
    }
}

/// Serializes bundles as JSON.
///
/// With `flat` set, the output is the dotted-key map from
/// [`ResultBundle::flatten`] rather than the nested bundle.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
    flat: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::detailed())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
            flat: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_flat(mut self, flat: bool) -> Self {
        self.flat = flat;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleFormatter for JsonFormatter {
    fn format(&self, bundle: &ResultBundle) -> Result<String> {
        self.format_with_config(bundle, &self.config)
    }

    fn format_with_config(
        &self,
        bundle: &ResultBundle,
        config: &FormatterConfig,
    ) -> Result<String> {
        let value = if self.flat {
            let mut flat = bundle.flatten();
            if !config.include_metrics {
                flat.retain(|key, _| !key.contains(".metrics."));
            }
            if !config.include_flags {
                flat.retain(|key, _| !key.ends_with(".flags"));
            }
            if !config.include_heatmap {
                flat.retain(|key, _| !key.starts_with("trust.heatmap."));
            }
            serde_json::to_value(flat)?
        } else {
            let mut value = serde_json::to_value(bundle)?;
            filter_nested(&mut value, config);
            value
        };

        if self.pretty {
            Ok(serde_json::to_string_pretty(&value)?)
        } else {
            Ok(serde_json::to_string(&value)?)
        }
    }
}

/// Drops the parts of a serialized bundle that `config` excludes.
fn filter_nested(value: &mut Value, config: &FormatterConfig) {
    for dimension in Dimension::ALL {
        let Some(result) = value
            .get_mut(dimension.as_str())
            .and_then(|d| d.get_mut("result"))
            .and_then(Value::as_object_mut)
        else {
            continue;
        };
        if !config.include_metrics {
            result.remove("metrics");
        }
        if !config.include_flags {
            result.remove("flags");
        }
    }
    if !config.include_heatmap {
        if let Some(trust) = value.get_mut("trust").and_then(Value::as_object_mut) {
            trust.remove("risk_heatmap");
        }
    }
}

/// Human-readable executive summary.
#[derive(Debug, Clone)]
pub struct SummaryFormatter {
    config: FormatterConfig,
    title: String,
}

impl SummaryFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            title: "EDET Executive Summary".to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    fn write_flags(
        &self,
        output: &mut String,
        result: &ScoreResult,
        config: &FormatterConfig,
    ) -> Result<()> {
        if !config.include_flags {
            return Ok(());
        }
        let limit = config.max_flags_per_dimension.unwrap_or(usize::MAX);
        for flag in result.flags().iter().take(limit) {
            writeln!(output, "   - {flag}")?;
        }
        let hidden = result.flags().len().saturating_sub(limit);
        if hidden > 0 {
            writeln!(output, "   ... and {hidden} more")?;
        }
        Ok(())
    }

    fn write_metrics(
        &self,
        output: &mut String,
        result: &ScoreResult,
        config: &FormatterConfig,
    ) -> Result<()> {
        if !config.include_metrics {
            return Ok(());
        }
        for (name, value) in result.metrics() {
            writeln!(output, "     {name}: {value:.3}")?;
        }
        Ok(())
    }
}

impl Default for SummaryFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleFormatter for SummaryFormatter {
    fn format(&self, bundle: &ResultBundle) -> Result<String> {
        self.format_with_config(bundle, &self.config)
    }

    fn format_with_config(
        &self,
        bundle: &ResultBundle,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        let p = &bundle.profile;
        let t = &bundle.trust;

        writeln!(output, "{}", self.title)?;
        writeln!(output, "{}", "=".repeat(60))?;
        writeln!(output)?;

        writeln!(output, "1. Dataset Overview")?;
        writeln!(output, "   Rows: {}, Columns: {}", p.row_count, p.column_count)?;
        writeln!(output, "   Source type: {}", p.source_type)?;
        writeln!(output, "   Numeric density: {:.1}%", p.numeric_density * 100.0)?;
        writeln!(
            output,
            "   Has timestamp: {}, Has text: {}",
            p.has_temporal, p.has_text
        )?;
        if config.include_timestamps {
            writeln!(output, "   Profiled at: {}", p.profiled_at.to_rfc3339())?;
        }
        writeln!(output)?;

        writeln!(output, "2. Enterprise Data Trust Index (EDTI)")?;
        writeln!(output, "   Score: {:.2}", t.edti_score)?;
        writeln!(output, "   Tier: {}", t.trust_tier)?;
        if t.sensitivity_capped {
            writeln!(
                output,
                "   Capped from {} by {} sensitivity",
                t.uncapped_tier, t.sensitivity
            )?;
        }
        if !t.excluded_dimensions.is_empty() {
            let excluded: Vec<&str> = t.excluded_dimensions.iter().map(|d| d.as_str()).collect();
            writeln!(output, "   Excluded: {}", excluded.join(", "))?;
        }
        writeln!(output)?;

        writeln!(output, "3. Component Scores")?;
        for (name, score) in &t.component_scores {
            let weight = t.weights_used.get(name).copied().unwrap_or(0.0);
            writeln!(output, "   {name}: {score:.2} (weight {weight:.2})")?;
        }

        let mut section = 4;
        if config.include_heatmap {
            writeln!(output)?;
            writeln!(output, "{section}. Risk Heatmap (higher = more risk)")?;
            for (name, risk) in &t.risk_heatmap {
                writeln!(output, "   {name}: {risk:.2}")?;
            }
            section += 1;
        }

        writeln!(output)?;
        writeln!(output, "{section}. Structural Reliability")?;
        writeln!(output, "   Score: {:.2}", bundle.structural.result.score())?;
        self.write_metrics(&mut output, &bundle.structural.result, config)?;
        self.write_flags(&mut output, &bundle.structural.result, config)?;
        section += 1;

        writeln!(output)?;
        writeln!(output, "{section}. Governance & Sensitivity")?;
        writeln!(output, "   Classification: {}", bundle.governance.sensitivity)?;
        writeln!(output, "   Score: {:.2}", bundle.governance.result.score())?;
        self.write_metrics(&mut output, &bundle.governance.result, config)?;
        self.write_flags(&mut output, &bundle.governance.result, config)?;
        section += 1;

        writeln!(output)?;
        writeln!(output, "{section}. Operational Stability")?;
        writeln!(output, "   Score: {:.2}", bundle.operational.result.score())?;
        if let Some(lag) = bundle.operational.lag_days {
            writeln!(output, "   Lag: {lag:.1} days")?;
        }
        self.write_metrics(&mut output, &bundle.operational.result, config)?;
        self.write_flags(&mut output, &bundle.operational.result, config)?;
        section += 1;

        writeln!(output)?;
        writeln!(output, "{section}. Logical Integrity")?;
        writeln!(
            output,
            "   Score: {:.2}, Violation rate: {:.2}%",
            bundle.logical.result.score(),
            bundle.logical.violation_rate * 100.0
        )?;
        self.write_metrics(&mut output, &bundle.logical.result, config)?;
        self.write_flags(&mut output, &bundle.logical.result, config)?;
        section += 1;

        writeln!(output)?;
        writeln!(output, "{section}. Preparation & Analytical Utility")?;
        writeln!(
            output,
            "   Utility: {:.2}, Preparation complexity: {:.2}",
            bundle.analytical.result.score(),
            bundle.analytical.preparation_complexity
        )?;
        self.write_metrics(&mut output, &bundle.analytical.result, config)?;
        self.write_flags(&mut output, &bundle.analytical.result, config)?;

        writeln!(output)?;
        writeln!(output, "--- End of Executive Summary ---")?;
        Ok(output)
    }
}
