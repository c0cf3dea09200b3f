//! Trust engine: runs the five analyzers and aggregates the EDTI.
//!
//! ```text
//! edti = Σ wᵢ · scoreᵢ   over dimensions with an aggregatable score,
//!                         weights renormalized to sum to 1
//! tier = band(edti), then capped by dataset sensitivity
//! ```
//!
//! # Example
//!
//! ```rust
//! use edet_engine::config::EngineConfig;
//! use edet_engine::engine::{TrustEngine, TrustTier};
//! use edet_engine::profile::ProfileBuilder;
//!
//! let profile = ProfileBuilder::new("memory")
//!     .numeric("revenue", vec![Some(10.0), Some(12.0), Some(11.0), Some(13.0)])
//!     .numeric("profit", vec![Some(2.0), Some(3.0), Some(2.5), Some(3.5)])
//!     .build()
//!     .unwrap();
//!
//! let engine = TrustEngine::new(EngineConfig::default()).unwrap();
//! let bundle = engine.evaluate(&profile).unwrap();
//! assert!((0.0..=1.0).contains(&bundle.trust.edti_score));
//! assert!(bundle.trust.trust_tier >= TrustTier::NotTrustworthy);
//! ```

mod bundle;
mod tier;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

pub use bundle::{ResultBundle, TrustAssessment, PREPARATION_BURDEN};
pub use tier::{SensitivityCap, TierBands, TrustTier, TrustWeights};

use crate::analyzers::stats::clamp_unit;
use crate::analyzers::{
    AnalysisContext, AnalyticalAnalyzer, AnalyticalAssessment, Assessment, Dimension,
    DimensionAnalyzer, GovernanceAnalyzer, GovernanceAssessment, LogicalAnalyzer,
    LogicalAssessment, OperationalAnalyzer, OperationalAssessment, SamplingPolicy,
    SensitivityLevel, StructuralAnalyzer, StructuralAssessment,
};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::logging::LogConfig;
use crate::profile::DatasetProfile;

/// The five dimension assessments of one evaluation.
struct Assessments {
    structural: StructuralAssessment,
    governance: GovernanceAssessment,
    operational: OperationalAssessment,
    logical: LogicalAssessment,
    analytical: AnalyticalAssessment,
}

impl Assessments {
    fn aggregate_score(&self, dimension: Dimension) -> Option<f64> {
        match dimension {
            Dimension::Structural => self.structural.aggregate_score(),
            Dimension::Governance => self.governance.aggregate_score(),
            Dimension::Operational => self.operational.aggregate_score(),
            Dimension::Logical => self.logical.aggregate_score(),
            Dimension::Analytical => self.analytical.aggregate_score(),
        }
    }

    fn score(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Structural => self.structural.result().score(),
            Dimension::Governance => self.governance.result().score(),
            Dimension::Operational => self.operational.result().score(),
            Dimension::Logical => self.logical.result().score(),
            Dimension::Analytical => self.analytical.result().score(),
        }
    }
}

/// Evaluates dataset profiles against an immutable [`EngineConfig`].
///
/// The engine holds no per-evaluation state; one instance can evaluate any
/// number of profiles, from any number of threads.
#[derive(Debug, Clone)]
pub struct TrustEngine {
    config: EngineConfig,
    structural: StructuralAnalyzer,
    governance: GovernanceAnalyzer,
    operational: OperationalAnalyzer,
    logical: LogicalAnalyzer,
    analytical: AnalyticalAnalyzer,
}

impl TrustEngine {
    /// Validates `config` and builds the analyzers it describes.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            structural: StructuralAnalyzer::with_config(config.structural.clone()),
            governance: GovernanceAnalyzer::with_config(config.governance.clone())?,
            operational: OperationalAnalyzer::with_config(config.operational.clone()),
            logical: LogicalAnalyzer::builder()
                .config(config.logical.clone())
                .build()?,
            analytical: AnalyticalAnalyzer::with_config(config.analytical.clone()),
            config,
        })
    }

    /// Replaces the logical analyzer, e.g. one with custom roles and rules.
    pub fn with_logical_analyzer(mut self, analyzer: LogicalAnalyzer) -> Self {
        self.logical = analyzer;
        self
    }

    /// Replaces the governance analyzer, e.g. one with extra pattern rules.
    pub fn with_governance_analyzer(mut self, analyzer: GovernanceAnalyzer) -> Self {
        self.governance = analyzer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn reference_time(&self, profile: &DatasetProfile) -> DateTime<Utc> {
        self.config
            .reference_time
            .unwrap_or_else(|| profile.profiled_at())
    }

    /// Validates the profile, runs the five analyzers in sequence and
    /// aggregates their scores.
    #[instrument(skip(self, profile), fields(
        source = %profile.source_type(),
        rows = profile.row_count(),
        columns = profile.column_count()
    ))]
    pub fn evaluate(&self, profile: &DatasetProfile) -> Result<ResultBundle> {
        profile.validate()?;

        let ctx = AnalysisContext::new(profile, &self.config.sampling)
            .with_log_config(self.config.logging.clone())
            .with_reference_time(self.reference_time(profile));

        let assessments = Assessments {
            structural: self.structural.analyze(&ctx),
            governance: self.governance.analyze(&ctx),
            operational: self.operational.analyze(&ctx),
            logical: self.logical.analyze(&ctx),
            analytical: self.analytical.analyze(&ctx),
        };

        Ok(self.aggregate(profile, assessments))
    }

    /// Same result as [`evaluate`](Self::evaluate), with the analyzers
    /// running in parallel on the tokio blocking pool.
    #[instrument(skip(self, profile), fields(rows = profile.row_count()))]
    pub async fn evaluate_concurrent(&self, profile: Arc<DatasetProfile>) -> Result<ResultBundle> {
        profile.validate()?;

        let inputs = TaskInputs {
            profile: Arc::clone(&profile),
            sampling: self.config.sampling.clone(),
            log: self.config.logging.clone(),
            reference_time: self.reference_time(&profile),
        };
        let structural = spawn_analyzer(self.structural.clone(), inputs.clone());
        let governance = spawn_analyzer(self.governance.clone(), inputs.clone());
        let operational = spawn_analyzer(self.operational.clone(), inputs.clone());
        let logical = spawn_analyzer(self.logical.clone(), inputs.clone());
        let analytical = spawn_analyzer(self.analytical.clone(), inputs);

        let (structural, governance, operational, logical, analytical) =
            tokio::try_join!(structural, governance, operational, logical, analytical)
                .map_err(|e| EngineError::execution(format!("analyzer task failed: {e}")))?;

        let assessments = Assessments {
            structural,
            governance,
            operational,
            logical,
            analytical,
        };
        Ok(self.aggregate(&profile, assessments))
    }

    /// Band lookup followed by the sensitivity cap.
    ///
    /// Returns `(final tier, uncapped tier, capped)`.
    pub fn classify(
        &self,
        edti: f64,
        sensitivity: SensitivityLevel,
    ) -> (TrustTier, TrustTier, bool) {
        let uncapped = self.config.tiers.tier_for(edti);
        let (tier, capped) = self.config.sensitivity_cap.apply(uncapped, sensitivity);
        (tier, uncapped, capped)
    }

    fn aggregate(&self, profile: &DatasetProfile, assessments: Assessments) -> ResultBundle {
        let available: Vec<Dimension> = Dimension::ALL
            .into_iter()
            .filter(|d| assessments.aggregate_score(*d).is_some())
            .collect();
        let excluded_dimensions: Vec<Dimension> = Dimension::ALL
            .into_iter()
            .filter(|d| !available.contains(d))
            .collect();
        let weights_used = self.config.weights.renormalize(&available);

        let edti = clamp_unit(
            available
                .iter()
                .filter_map(|d| {
                    let weight = weights_used.get(d.as_str())?;
                    Some(weight * assessments.aggregate_score(*d)?)
                })
                .sum(),
        );
        if weights_used.is_empty() {
            warn!("No dimension produced an aggregatable score, EDTI is 0");
        }

        let sensitivity = assessments.governance.sensitivity;
        let (trust_tier, uncapped_tier, sensitivity_capped) = self.classify(edti, sensitivity);
        if sensitivity_capped {
            info!(
                uncapped = %uncapped_tier,
                capped = %trust_tier,
                "Tier capped by dataset sensitivity"
            );
        }

        let component_scores: BTreeMap<String, f64> = Dimension::ALL
            .into_iter()
            .map(|d| (d.as_str().to_string(), assessments.score(d)))
            .collect();
        let mut risk_heatmap: BTreeMap<String, f64> = component_scores
            .iter()
            .map(|(name, score)| (name.clone(), clamp_unit(1.0 - score)))
            .collect();
        risk_heatmap.insert(
            PREPARATION_BURDEN.to_string(),
            clamp_unit(assessments.analytical.preparation_complexity),
        );

        log_dimension_scores(&self.config.logging, &component_scores, &weights_used);
        info!(
            edti,
            tier = %trust_tier,
            excluded = excluded_dimensions.len(),
            "Evaluation complete"
        );

        ResultBundle {
            profile: profile.summary(),
            trust: TrustAssessment {
                edti_score: edti,
                trust_tier,
                uncapped_tier,
                sensitivity,
                sensitivity_capped,
                component_scores,
                excluded_dimensions,
                weights_used,
                risk_heatmap,
            },
            structural: assessments.structural,
            governance: assessments.governance,
            operational: assessments.operational,
            logical: assessments.logical,
            analytical: assessments.analytical,
        }
    }
}

/// Owned inputs for one analyzer task.
#[derive(Debug, Clone)]
struct TaskInputs {
    profile: Arc<DatasetProfile>,
    sampling: SamplingPolicy,
    log: LogConfig,
    reference_time: DateTime<Utc>,
}

fn spawn_analyzer<A>(analyzer: A, inputs: TaskInputs) -> tokio::task::JoinHandle<A::Output>
where
    A: DimensionAnalyzer + 'static,
{
    tokio::task::spawn_blocking(move || {
        let ctx = AnalysisContext::new(&inputs.profile, &inputs.sampling)
            .with_log_config(inputs.log)
            .with_reference_time(inputs.reference_time);
        debug!(analyzer = analyzer.name(), "Running analyzer");
        analyzer.analyze(&ctx)
    })
}

fn log_dimension_scores(
    log: &LogConfig,
    scores: &BTreeMap<String, f64>,
    weights: &BTreeMap<String, f64>,
) {
    if !log.log_metrics {
        return;
    }
    for (dimension, score) in scores {
        let weight = weights.get(dimension).copied().unwrap_or(0.0);
        info!(dimension = %dimension, score, weight, "Dimension score");
    }
    crate::perf_debug!(log, weights = ?weights, "Renormalized weights");
}
