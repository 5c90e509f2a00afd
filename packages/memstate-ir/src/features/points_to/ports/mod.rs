//! Ports (Interfaces) for Points-to Analysis
//!
//! - [`PointsToSolver`]: runs a constraint set to fixpoint over a node set
//! - [`CycleGraph`]: what the lazy cycle detector needs from its host solver
//!   (successor lookup and root unification); the detector owns no adjacency

use serde::Serialize;

use crate::features::points_to::domain::constraint::ConstraintSet;
use crate::features::points_to::domain::entity::EntityIndex;
use crate::features::points_to::infrastructure::andersen_solver::AndersenStats;
use crate::features::points_to::infrastructure::node_set::NodeSet;
use crate::features::points_to::infrastructure::steensgaard_solver::SteensgaardStats;

// ============================================================================
// Solver
// ============================================================================

/// Solver statistics, per algorithm
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "solver", rename_all = "lowercase")]
pub enum SolverStats {
    Steensgaard(SteensgaardStats),
    Andersen(AndersenStats),
}

impl SolverStats {
    pub fn duration_ms(&self) -> f64 {
        match self {
            SolverStats::Steensgaard(stats) => stats.duration_ms,
            SolverStats::Andersen(stats) => stats.duration_ms,
        }
    }
}

/// A points-to solver
///
/// On return every root of `set` carries its final points-to set; members of
/// a partition share their root's set.
pub trait PointsToSolver {
    fn name(&self) -> &'static str;

    fn solve(&mut self, set: &mut NodeSet, constraints: &ConstraintSet) -> SolverStats;
}

// ============================================================================
// Cycle detection host
// ============================================================================

/// Subset-constraint graph as seen by the lazy cycle detector
pub trait CycleGraph {
    /// Roots whose points-to set must include `root`'s
    fn successors(&self, root: EntityIndex) -> Vec<EntityIndex>;

    /// Current unification root of `index`
    fn root_of(&self, index: EntityIndex) -> EntityIndex;

    /// Unify two distinct roots, merging their adjacency; returns the survivor
    fn unify_roots(&mut self, a: EntityIndex, b: EntityIndex) -> EntityIndex;
}
