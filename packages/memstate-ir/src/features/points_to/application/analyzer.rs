//! High-Level Points-to Analyzer
//!
//! Program in, [`PointsToGraph`] out:
//! 1. validate the [`AnalysisConfig`]
//! 2. generate entities and constraints (the entity budget applies here,
//!    before any solving)
//! 3. pick a solver (`Auto` resolves on the entity count)
//! 4. build the graph
//!
//! # Usage
//! ```text
//! use memstate_ir::config::{AnalysisConfig, PtaMode};
//! use memstate_ir::features::points_to::PointsToAnalyzer;
//!
//! let config = AnalysisConfig::default().mode(PtaMode::Precise);
//! let result = PointsToAnalyzer::new(config).analyze(&program)?;
//! assert!(result.may_alias(x, y));
//! ```

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use super::constraint_generator::ConstraintGenerator;
use crate::config::{AnalysisConfig, PtaMode};
use crate::features::points_to::domain::constraint::ConstraintCounts;
use crate::features::points_to::domain::error::PtaResult;
use crate::features::points_to::domain::points_to_graph::{GraphStats, PointsToGraph};
use crate::features::points_to::infrastructure::andersen_solver::{AndersenConfig, AndersenSolver};
use crate::features::points_to::infrastructure::graph_builder::build_points_to_graph;
use crate::features::points_to::infrastructure::steensgaard_solver::SteensgaardSolver;
use crate::features::points_to::ports::{PointsToSolver, SolverStats};
use crate::features::program::{Program, ValueId};

/// Analysis result
#[derive(Debug)]
pub struct AnalysisResult {
    /// The computed points-to graph
    pub graph: PointsToGraph,

    pub stats: AnalysisStats,
}

impl AnalysisResult {
    /// Whether two pointer values may refer to the same memory object
    ///
    /// Values without a register node alias nothing.
    pub fn may_alias(&self, a: ValueId, b: ValueId) -> bool {
        match (self.graph.register_node(a), self.graph.register_node(b)) {
            (Some(a), Some(b)) => !self.graph.targets(a).is_disjoint(self.graph.targets(b)),
            _ => false,
        }
    }
}

/// Unified statistics
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisStats {
    /// Which mode was actually used (never `Auto`)
    pub mode_used: PtaMode,
    pub entities: usize,
    pub registers: usize,
    pub constraints: ConstraintCounts,
    pub solver: SolverStats,
    pub graph: GraphStats,
    pub duration_ms: f64,
}

/// High-level points-to analyzer
#[derive(Debug, Clone, Default)]
pub struct PointsToAnalyzer {
    config: AnalysisConfig,
}

impl PointsToAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze `program`
    ///
    /// Fails with `InvalidConfig` or `ResourceExhausted`; nothing is solved
    /// in either case.
    pub fn analyze(&self, program: &Program) -> PtaResult<AnalysisResult> {
        let start = Instant::now();
        self.config.validate()?;

        let generated = ConstraintGenerator::new(program)
            .with_entity_limit(self.config.max_entities)
            .generate()?;
        let mut set = generated.node_set;
        let constraints = generated.constraints;

        let entities = set.num_entities();
        let registers = set.registers().len();
        let mode = self.config.resolve_mode(entities);
        info!(
            config_mode = %self.config.mode,
            mode = %mode,
            entities,
            constraints = constraints.len(),
            "points-to analysis started"
        );

        let mut solver: Box<dyn PointsToSolver> = match mode {
            PtaMode::Fast => Box::new(SteensgaardSolver::new()),
            _ => Box::new(AndersenSolver::new(AndersenConfig::from(&self.config))),
        };
        let solver_stats = solver.solve(&mut set, &constraints);

        let graph = build_points_to_graph(&set, program);
        if self.config.dump_dot {
            debug!(dot = %graph.to_dot(), "points-to graph");
        }

        let stats = AnalysisStats {
            mode_used: mode,
            entities,
            registers,
            constraints: constraints.counts(),
            solver: solver_stats,
            graph: graph.stats(),
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        info!(
            solver = solver.name(),
            nodes = graph.num_nodes(),
            edges = stats.graph.edges,
            duration_ms = stats.duration_ms,
            "points-to analysis finished"
        );

        Ok(AnalysisResult { graph, stats })
    }
}
