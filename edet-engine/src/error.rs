//! Error types for the EDET trust scoring engine.
//!
//! Analyzers never fail on degenerate but valid input; those cases map to a
//! neutral score plus an explanatory flag. The errors in this module cover
//! what remains: profiles that break their own invariants, invalid
//! configuration, and failures in the Arrow/DataFusion input adapter.

use thiserror::Error;

/// The main error type for the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A dataset profile violates one of its structural invariants.
    ///
    /// This is a programmer error in the layer that produced the profile and
    /// is never silently tolerated.
    #[error("Profile contract violation: {message}")]
    ProfileContractViolation {
        /// Human-readable description of the broken invariant
        message: String,
    },

    /// Invalid engine or analyzer configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A column uses an Arrow type the profiler cannot map to a column type.
    #[error("Unsupported data type {data_type} for column '{column}'")]
    UnsupportedType {
        /// Column name
        column: String,
        /// Arrow data type, rendered
        data_type: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error while rendering a report.
    #[error("Formatting error: {0}")]
    Formatting(#[from] std::fmt::Error),

    /// A concurrent evaluation task failed to complete.
    #[error("Execution error: {0}")]
    Execution(String),
}

/// A type alias for `Result<T, EngineError>`.
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Creates a profile contract violation with the given message.
    pub fn contract(message: impl Into<String>) -> Self {
        Self::ProfileContractViolation {
            message: message.into(),
        }
    }

    /// Creates a configuration error with the given message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an unsupported type error.
    pub fn unsupported_type(column: impl Into<String>, data_type: impl ToString) -> Self {
        Self::UnsupportedType {
            column: column.into(),
            data_type: data_type.to_string(),
        }
    }

    /// Creates an execution error with the given message.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Returns true if this error reports a broken profile invariant.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ProfileContractViolation { .. })
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<regex::Error> for EngineError {
    fn from(err: regex::Error) -> Self {
        Self::Configuration(format!("invalid pattern: {err}"))
    }
}
