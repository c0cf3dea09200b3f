//! Trust dimension analyzers.
//!
//! Each analyzer reads a validated [`DatasetProfile`](crate::profile::DatasetProfile)
//! through an [`AnalysisContext`] and returns an [`Assessment`]: a score in
//! `[0, 1]`, risk flags, metrics, and dimension-specific detail.
//!
//! ## Available Analyzers
//!
//! - **Structural** (`structural`): missingness, duplicate rows, redundant
//!   numeric features, candidate keys
//! - **Governance** (`governance`): PII detection by column name and value
//!   patterns, dataset sensitivity level
//! - **Operational** (`operational`): freshness lag, supply gaps, volume
//!   stability of the temporal column
//! - **Logical** (`logical`): semantic roles and business rules such as
//!   non-negative revenue or profit not exceeding revenue
//! - **Analytical** (`analytical`): skew, variance inflation, IQR anomaly
//!   density, preparation complexity
//!
//! Analyzers never fail on a valid profile. Degenerate input (no rows, no
//! temporal column, no numeric columns) maps to a fixed neutral score plus a
//! flag explaining why.
//!
//! ## Example Usage
//!
//! ```rust
//! use edet_engine::analyzers::{
//!     AnalysisContext, Assessment, DimensionAnalyzer, GovernanceAnalyzer, SamplingPolicy,
//! };
//! use edet_engine::profile::ProfileBuilder;
//!
//! let profile = ProfileBuilder::new("csv")
//!     .text("email", vec![Some("ana@example.com".into()), Some("bo@example.org".into())])
//!     .build()
//!     .unwrap();
//! let sampling = SamplingPolicy::default();
//! let ctx = AnalysisContext::new(&profile, &sampling);
//!
//! let governance = GovernanceAnalyzer::new().unwrap().analyze(&ctx);
//! assert!(governance.result().has_flag("DirectIdentifier"));
//! ```

pub mod analytical;
pub mod context;
pub mod governance;
pub mod logical;
pub mod operational;
pub mod stats;
pub mod structural;
pub mod traits;
pub mod types;

pub use analytical::{AnalyticalAnalyzer, AnalyticalAssessment, AnalyticalConfig};
pub use context::{AnalysisContext, RowSample, SamplingPolicy};
pub use governance::{
    GovernanceAnalyzer, GovernanceAssessment, GovernanceConfig, PatternRule, PiiCategory,
};
pub use logical::{
    LogicalAnalyzer, LogicalAnalyzerBuilder, LogicalAssessment, LogicalConfig, LogicalRule,
    RoleMatcher, RuleCheck, RuleOutcome, SemanticRole,
};
pub use operational::{OperationalAnalyzer, OperationalAssessment, OperationalConfig};
pub use structural::{RedundantPair, StructuralAnalyzer, StructuralAssessment, StructuralConfig};
pub use traits::{Assessment, DimensionAnalyzer};
pub use types::{Dimension, FlagCode, RiskFlag, ScoreResult, SensitivityLevel, Severity};
