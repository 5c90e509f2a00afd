//! Application layer for Points-to Analysis
//!
//! - **ConstraintGenerator**: program → entities + constraints
//! - **PointsToAnalyzer**: generation, solver selection, graph construction

pub mod analyzer;
pub mod constraint_generator;

pub use analyzer::{AnalysisResult, AnalysisStats, PointsToAnalyzer};
pub use constraint_generator::{ConstraintGenerator, GeneratedConstraints};
