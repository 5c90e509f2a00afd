//! # Points-to Analysis
//!
//! Whole-unit, flow- and context-insensitive pointer analysis over a
//! [`Program`](crate::features::program::Program):
//! - **Steensgaard's Algorithm**: near-linear unification using union-find
//! - **Andersen's Algorithm**: inclusion-based worklist fixpoint, with lazy
//!   cycle detection collapsing subset cycles as they are discovered
//!
//! Both solvers model memory outside the unit with two sentinel objects,
//! unknown and external memory. The result is a [`PointsToGraph`] with a
//! deterministic dot dump.
//!
//! ## Academic References
//! - Steensgaard, B. "Points-to Analysis in Almost Linear Time" (POPL 1996)
//! - Andersen, L. O. "Program Analysis and Specialization for C" (PhD 1994)
//! - Hardekopf & Lin "The Ant and the Grasshopper" (PLDI 2007)
//!
//! ## Usage
//! ```text
//! use memstate_ir::config::AnalysisConfig;
//! use memstate_ir::features::points_to::PointsToAnalyzer;
//!
//! let result = PointsToAnalyzer::new(AnalysisConfig::default()).analyze(&program)?;
//! println!("{}", result.graph.to_dot());
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

// Re-exports for public API
pub use application::{AnalysisResult, AnalysisStats, ConstraintGenerator, GeneratedConstraints, PointsToAnalyzer};
pub use domain::{
    AnalysisError, Constraint, ConstraintKind, ConstraintSet, EntityIndex, EntityKind, NodeIndex, NodeRef,
    PointsToGraph, PointsToGraphError, PointsToNodeKind, PtaResult,
};
pub use ports::{CycleGraph, PointsToSolver, SolverStats};
// Re-export infrastructure (internal use - prefer application layer)
#[doc(hidden)]
pub use infrastructure::{AndersenSolver, LazyCycleDetector, NodeSet, SteensgaardSolver};
