//! Core analyzer traits.

use std::fmt::Debug;

use serde::Serialize;

use super::context::AnalysisContext;
use super::types::{Dimension, ScoreResult};

/// Output of a dimension analyzer: a [`ScoreResult`] plus dimension-specific
/// detail.
pub trait Assessment: Debug + Clone + Serialize + Send + Sync + 'static {
    /// The scored result.
    fn result(&self) -> &ScoreResult;

    /// Score that enters EDTI aggregation, or `None` when the dimension is
    /// excluded (for example on an empty dataset).
    fn aggregate_score(&self) -> Option<f64> {
        Some(self.result().score())
    }
}

/// Scores one trust dimension of a dataset profile.
///
/// Analyzers are independent and pure: they read the profile, never fail on
/// a valid profile, and map degenerate input to a documented neutral score
/// plus an explanatory flag.
///
/// # Example
///
/// ```rust
/// use edet_engine::analyzers::{AnalysisContext, DimensionAnalyzer, StructuralAnalyzer};
/// use edet_engine::analyzers::SamplingPolicy;
/// use edet_engine::profile::ProfileBuilder;
///
/// let profile = ProfileBuilder::new("memory")
///     .numeric("x", vec![Some(1.0), Some(2.0), None])
///     .build()
///     .unwrap();
/// let sampling = SamplingPolicy::default();
/// let ctx = AnalysisContext::new(&profile, &sampling);
///
/// let assessment = StructuralAnalyzer::new().analyze(&ctx);
/// assert!(assessment.result.score() < 1.0);
/// ```
pub trait DimensionAnalyzer: Send + Sync + Debug {
    /// The assessment type produced by this analyzer.
    type Output: Assessment;

    /// The dimension this analyzer scores.
    fn dimension(&self) -> Dimension;

    /// Returns the name of this analyzer.
    fn name(&self) -> &str {
        self.dimension().as_str()
    }

    /// Returns a description of what this analyzer scores.
    fn description(&self) -> &str;

    /// Scores the profile in `ctx`.
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Self::Output;
}
