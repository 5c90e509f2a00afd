//! Error types for memstate-ir
//!
//! Provides unified error handling across the crate. Each feature keeps its
//! own error enum; [`MemstateError`] wraps them for drivers that chain
//! configuration loading, analysis and graph edits.

use crate::config::ConfigError;
use crate::features::points_to::{AnalysisError, PointsToGraphError};
use thiserror::Error;

/// Main error type for memstate-ir operations
#[derive(Debug, Error)]
pub enum MemstateError {
    /// Points-to analysis error
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Points-to graph edit error
    #[error("Graph error: {0}")]
    Graph(#[from] PointsToGraphError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for memstate-ir operations
pub type Result<T> = std::result::Result<T, MemstateError>;
