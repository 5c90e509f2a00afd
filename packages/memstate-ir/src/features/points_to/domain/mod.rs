//! Domain models for Points-to Analysis
//!
//! Core abstractions independent of analysis algorithm:
//! - Entity: registers and memory objects as seen by the solvers
//! - Constraint: PointsTo, Superset, Load, Store, Call and the sentinel forms
//! - PointsToGraph: solved points-to relation over program values
//! - AnalysisError: recoverable analysis failures

pub mod constraint;
pub mod entity;
pub mod error;
pub mod points_to_graph;

pub use constraint::{Constraint, ConstraintCounts, ConstraintKind, ConstraintSet};
pub use entity::{Entity, EntityIndex, EntityKind, EntityOrigin, FunctionSignature, NodeSetId};
pub use error::{AnalysisError, PtaResult};
pub use points_to_graph::{
    GraphId, GraphStats, NodeIndex, NodeRef, PointsToGraph, PointsToGraphError, PointsToNode, PointsToNodeKind,
};
