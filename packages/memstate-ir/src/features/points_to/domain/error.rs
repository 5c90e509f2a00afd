//! Analysis errors

use thiserror::Error;

use crate::config::ConfigError;

/// Recoverable analysis failures
///
/// Usage violations (non-root where a root is required, foreign indices) are
/// panics, not variants of this type.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Entity budget exceeded
    #[error("Resource exhausted: entity limit of {limit} reached")]
    ResourceExhausted { limit: usize },

    /// Invalid analysis configuration
    #[error("Invalid analysis configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

pub type PtaResult<T> = std::result::Result<T, AnalysisError>;
