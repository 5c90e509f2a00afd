//! Andersen's Points-to Analysis Solver
//!
//! Inclusion-based pointer analysis over a [`NodeSet`]:
//! - Explicit points-to set per root
//! - Subset edges `subset → superset` from assignments
//! - Conditional LOAD/STORE/CALL constraints re-evaluated whenever the
//!   dereferenced pointer's set grows
//! - FIFO or LIFO worklist of roots whose set changed; fixpoint at empty
//!   worklist
//! - Optional lazy cycle detection collapsing subset cycles
//! - Optional difference propagation: each root remembers the pointees added
//!   since it was last processed and only that difference flows to its
//!   conditionals and supersets. A new subset edge copies the full set once;
//!   a collapsed cycle resets the survivor's difference to its full set.
//!
//! External and unknown memory are ordinary entities here: each sentinel is in
//! its own points-to set and carries `*S = S` and `S = *S`, so anything stored
//! into escaped memory escapes and anything loaded from it may be external.
//! Function objects hold no pointers; loads and stores through them are
//! skipped.
//!
//! # Complexity
//! - O(n³) worst case, bounded by O(n²) edge activations
//!
//! # References
//! - Andersen, L. O. "Program Analysis and Specialization for C" (PhD 1994)
//! - Hardekopf & Lin "The Ant and the Grasshopper" (PLDI 2007)

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info};

use super::lazy_cycle_detector::LazyCycleDetector;
use super::node_set::NodeSet;
use crate::config::{AnalysisConfig, WorklistPolicy};
use crate::features::points_to::domain::constraint::{Constraint, ConstraintSet};
use crate::features::points_to::domain::entity::{EntityIndex, EntityKind};
use crate::features::points_to::ports::{CycleGraph, PointsToSolver, SolverStats};

/// Andersen solver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AndersenConfig {
    /// Collapse subset cycles on the fly
    pub enable_cycle_detection: bool,

    /// Worklist discipline
    pub worklist: WorklistPolicy,

    /// Propagate only new pointees
    pub difference_propagation: bool,
}

impl Default for AndersenConfig {
    fn default() -> Self {
        Self {
            enable_cycle_detection: true,
            worklist: WorklistPolicy::Fifo,
            difference_propagation: true,
        }
    }
}

impl From<&AnalysisConfig> for AndersenConfig {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            enable_cycle_detection: config.enable_cycle_detection,
            worklist: config.worklist,
            difference_propagation: config.difference_propagation,
        }
    }
}

/// Statistics for Andersen's analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AndersenStats {
    pub constraints_total: usize,
    /// Worklist pops
    pub iterations: usize,
    /// Subset propagations that grew the target
    pub propagations: usize,
    /// Distinct subset edges
    pub edges_added: usize,
    /// (call site, callee) pairs bound
    pub calls_bound: usize,
    /// Function objects reachable from external memory
    pub escaped_functions: usize,
    pub cycle_detection_attempts: usize,
    pub cycles_detected: usize,
    pub cycle_unifications: usize,
    pub duration_ms: f64,
}

// ═══════════════════════════════════════════════════════════════════════════
// Solver-owned adjacency
// ═══════════════════════════════════════════════════════════════════════════

/// Constraint adjacency, valid for roots only
#[derive(Debug, Default)]
struct ConstraintGraph {
    /// subset → supersets
    supersets: Vec<FxHashSet<EntityIndex>>,
    /// address → values loaded from it
    loads: Vec<Vec<EntityIndex>>,
    /// address → values stored through it
    stores: Vec<Vec<EntityIndex>>,
    /// callee → call site indices
    calls: Vec<Vec<usize>>,
}

impl ConstraintGraph {
    fn new(num_entities: usize) -> Self {
        Self {
            supersets: vec![FxHashSet::default(); num_entities],
            loads: vec![Vec::new(); num_entities],
            stores: vec![Vec::new(); num_entities],
            calls: vec![Vec::new(); num_entities],
        }
    }

    /// Fold the loser's adjacency into the survivor's
    fn merge(&mut self, loser: EntityIndex, survivor: EntityIndex) {
        let (l, s) = (loser.as_usize(), survivor.as_usize());

        let supersets = std::mem::take(&mut self.supersets[l]);
        self.supersets[s].extend(supersets);
        self.supersets[s].remove(&survivor);

        let loads = std::mem::take(&mut self.loads[l]);
        self.loads[s].extend(loads);
        let stores = std::mem::take(&mut self.stores[l]);
        self.stores[s].extend(stores);
        let calls = std::mem::take(&mut self.calls[l]);
        self.calls[s].extend(calls);
    }
}

#[derive(Debug)]
struct CallSite {
    arguments: Vec<Option<EntityIndex>>,
    results: Vec<Option<EntityIndex>>,
    /// Pointees of the callee already bound
    bound: FxHashSet<EntityIndex>,
}

#[derive(Debug)]
struct Worklist {
    queue: VecDeque<EntityIndex>,
    queued: FxHashSet<EntityIndex>,
    policy: WorklistPolicy,
}

impl Worklist {
    fn new(policy: WorklistPolicy) -> Self {
        Self {
            queue: VecDeque::new(),
            queued: FxHashSet::default(),
            policy,
        }
    }

    fn push(&mut self, root: EntityIndex) {
        if self.queued.insert(root) {
            self.queue.push_back(root);
        }
    }

    fn pop(&mut self) -> Option<EntityIndex> {
        let next = match self.policy {
            WorklistPolicy::Fifo => self.queue.pop_front(),
            WorklistPolicy::Lifo => self.queue.pop_back(),
        }?;
        self.queued.remove(&next);
        Some(next)
    }
}

/// What the cycle detector sees while the solver is mid-propagation
struct CollapseHost<'a> {
    set: &'a mut NodeSet,
    graph: &'a mut ConstraintGraph,
    worklist: &'a mut Worklist,
    delta: Option<&'a mut Vec<FxHashSet<EntityIndex>>>,
}

impl CycleGraph for CollapseHost<'_> {
    fn successors(&self, root: EntityIndex) -> Vec<EntityIndex> {
        self.graph.supersets[root.as_usize()].iter().copied().collect()
    }

    fn root_of(&self, index: EntityIndex) -> EntityIndex {
        self.set.root_of(index)
    }

    fn unify_roots(&mut self, a: EntityIndex, b: EntityIndex) -> EntityIndex {
        let survivor = self.set.unify(a, b);
        let loser = if survivor == a { b } else { a };
        self.graph.merge(loser, survivor);
        if let Some(delta) = self.delta.as_mut() {
            delta[loser.as_usize()].clear();
            delta[survivor.as_usize()] = self.set.points_to(survivor).clone();
        }
        self.worklist.push(survivor);
        survivor
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Solver
// ═══════════════════════════════════════════════════════════════════════════

/// Andersen's points-to analysis solver
#[derive(Debug, Default)]
pub struct AndersenSolver {
    config: AndersenConfig,
    stats: AndersenStats,
}

impl AndersenSolver {
    pub fn new(config: AndersenConfig) -> Self {
        Self {
            config,
            stats: AndersenStats::default(),
        }
    }

    pub fn stats(&self) -> &AndersenStats {
        &self.stats
    }
}

impl PointsToSolver for AndersenSolver {
    fn name(&self) -> &'static str {
        "andersen"
    }

    fn solve(&mut self, set: &mut NodeSet, constraints: &ConstraintSet) -> SolverStats {
        let start = Instant::now();
        debug!(
            entities = set.num_entities(),
            constraints = constraints.len(),
            cycle_detection = self.config.enable_cycle_detection,
            difference_propagation = self.config.difference_propagation,
            "andersen: start"
        );

        let mut run = Run::new(set, self.config);
        run.stats.constraints_total = constraints.len();
        run.seed(constraints);
        run.propagate();

        let mut stats = run.finish();
        stats.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            iterations = stats.iterations,
            propagations = stats.propagations,
            cycles = stats.cycles_detected,
            duration_ms = stats.duration_ms,
            "andersen: fixpoint reached"
        );

        self.stats = stats.clone();
        SolverStats::Andersen(stats)
    }
}

/// State of one solver run
struct Run<'a> {
    set: &'a mut NodeSet,
    graph: ConstraintGraph,
    calls: Vec<CallSite>,
    worklist: Worklist,
    lcd: Option<LazyCycleDetector>,
    /// Pointees added per root since its last pop; None without difference
    /// propagation
    delta: Option<Vec<FxHashSet<EntityIndex>>>,
    /// Function objects already exposed to external callers
    escaped_functions: FxHashSet<EntityIndex>,
    stats: AndersenStats,
}

impl<'a> Run<'a> {
    fn new(set: &'a mut NodeSet, config: AndersenConfig) -> Self {
        let n = set.num_entities();
        Self {
            graph: ConstraintGraph::new(n),
            calls: Vec::new(),
            worklist: Worklist::new(config.worklist),
            lcd: config.enable_cycle_detection.then(|| LazyCycleDetector::new(n)),
            delta: config
                .difference_propagation
                .then(|| vec![FxHashSet::default(); n]),
            escaped_functions: FxHashSet::default(),
            stats: AndersenStats::default(),
            set,
        }
    }

    fn root(&mut self, index: EntityIndex) -> EntityIndex {
        self.set.get_unification_root(index)
    }

    /// pts(superset) ⊇ pts(subset); returns true if the edge is new
    fn add_superset_edge(&mut self, superset: EntityIndex, subset: EntityIndex) -> bool {
        let sup = self.root(superset);
        let sub = self.root(subset);
        if sup == sub {
            return false;
        }
        if self.graph.supersets[sub.as_usize()].insert(sup) {
            self.stats.edges_added += 1;
            if self.delta.is_some() {
                // the edge has seen nothing of `sub` yet
                let pointees: Vec<EntityIndex> = self.set.points_to(sub).iter().copied().collect();
                if self.insert_pointees(sup, &pointees) {
                    self.stats.propagations += 1;
                    self.worklist.push(sup);
                }
            } else {
                self.worklist.push(sub);
            }
            true
        } else {
            false
        }
    }

    /// Add `object` to the root's set, recording it as new
    fn insert_pointee(&mut self, root: EntityIndex, object: EntityIndex) -> bool {
        let added = self.set.add_to_points_to_set(root, object);
        if added {
            if let Some(delta) = self.delta.as_mut() {
                delta[root.as_usize()].insert(object);
            }
        }
        added
    }

    fn insert_pointees(&mut self, root: EntityIndex, objects: &[EntityIndex]) -> bool {
        let mut grew = false;
        for &object in objects {
            grew |= self.insert_pointee(root, object);
        }
        grew
    }

    fn seed(&mut self, constraints: &ConstraintSet) {
        for sentinel in [self.set.unknown_memory(), self.set.external_memory()] {
            let root = self.root(sentinel);
            self.insert_pointee(root, sentinel);
            self.graph.loads[root.as_usize()].push(sentinel);
            self.graph.stores[root.as_usize()].push(sentinel);
            self.worklist.push(root);
        }
        let external = self.set.external_memory();
        let unknown = self.set.unknown_memory();

        for constraint in constraints {
            match constraint {
                Constraint::PointsTo { pointer, pointee } => {
                    let root = self.root(*pointer);
                    if self.insert_pointee(root, *pointee) {
                        self.worklist.push(root);
                    }
                }
                Constraint::Superset { superset, subset } => {
                    self.add_superset_edge(*superset, *subset);
                }
                Constraint::Load { value, address } => {
                    let root = self.root(*address);
                    self.graph.loads[root.as_usize()].push(*value);
                    self.worklist.push(root);
                }
                Constraint::Store { address, value } => {
                    let root = self.root(*address);
                    self.graph.stores[root.as_usize()].push(*value);
                    self.worklist.push(root);
                }
                Constraint::Call {
                    callee,
                    arguments,
                    results,
                } => {
                    let root = self.root(*callee);
                    self.graph.calls[root.as_usize()].push(self.calls.len());
                    self.calls.push(CallSite {
                        arguments: arguments.clone(),
                        results: results.clone(),
                        bound: FxHashSet::default(),
                    });
                    self.worklist.push(root);
                }
                Constraint::PointsToExternal { pointer } => {
                    self.add_superset_edge(*pointer, external);
                }
                Constraint::PointsToUnknown { pointer } => {
                    self.add_superset_edge(*pointer, unknown);
                }
                Constraint::Escapes { pointer } => {
                    self.add_superset_edge(external, *pointer);
                }
            }
        }
    }

    fn propagate(&mut self) {
        self.propagate_with(|_, _| {});
    }

    /// Drain the worklist, handing the state to `after_pop` after each root
    fn propagate_with(&mut self, mut after_pop: impl FnMut(&NodeSet, &AndersenStats)) {
        while let Some(next) = self.worklist.pop() {
            let root = self.root(next);
            self.stats.iterations += 1;
            self.process(root);
            after_pop(&*self.set, &self.stats);
        }
    }

    fn process(&mut self, root: EntityIndex) {
        let pointees: Vec<EntityIndex> = match self.delta.as_mut() {
            Some(delta) => std::mem::take(&mut delta[root.as_usize()]).into_iter().collect(),
            None => self.set.points_to(root).iter().copied().collect(),
        };

        if !pointees.is_empty() {
            self.process_conditionals(root, &pointees);
        }

        let successors: Vec<EntityIndex> = self.graph.supersets[root.as_usize()].iter().copied().collect();
        for successor in successors {
            let target = self.root(successor);
            if target == root {
                continue;
            }

            let grew = if self.delta.is_some() {
                self.insert_pointees(target, &pointees)
            } else {
                self.set.make_points_to_superset(target, root)
            };
            if grew {
                self.stats.propagations += 1;
                self.worklist.push(target);
            } else if !pointees.is_empty() {
                if let Some(lcd) = self.lcd.as_mut() {
                    let mut host = CollapseHost {
                        set: &mut *self.set,
                        graph: &mut self.graph,
                        worklist: &mut self.worklist,
                        delta: self.delta.as_mut(),
                    };
                    if lcd.on_propagated_nothing(&mut host, root, target).is_some() {
                        return;
                    }
                }
            }
        }
    }

    fn process_conditionals(&mut self, root: EntityIndex, pointees: &[EntityIndex]) {
        let data_pointees: Vec<EntityIndex> = pointees
            .iter()
            .copied()
            .filter(|o| self.set.kind(*o) != EntityKind::FunctionObject)
            .collect();

        // *root ⊇ value
        let stores = self.graph.stores[root.as_usize()].clone();
        for value in stores {
            for &object in &data_pointees {
                self.add_superset_edge(object, value);
            }
        }

        // value ⊇ *root
        let loads = self.graph.loads[root.as_usize()].clone();
        for value in loads {
            for &object in &data_pointees {
                self.add_superset_edge(value, object);
            }
        }

        let calls = self.graph.calls[root.as_usize()].clone();
        for call in calls {
            for &callee in pointees {
                if self.calls[call].bound.insert(callee) {
                    self.bind_call(call, callee);
                }
            }
        }

        let external = self.set.external_memory();
        if self.set.root_of(external) == root {
            for &object in pointees {
                if self.set.kind(object) == EntityKind::FunctionObject && self.escaped_functions.insert(object) {
                    self.expose_function(object);
                }
            }
        }
    }

    /// Bind one call site to one possible callee
    fn bind_call(&mut self, call: usize, callee: EntityIndex) {
        self.stats.calls_bound += 1;
        let arguments = self.calls[call].arguments.clone();
        let results = self.calls[call].results.clone();

        let signature = match self.set.kind(callee) {
            EntityKind::FunctionObject => self.set.function_signature(callee).cloned(),
            _ => None,
        };

        match signature {
            Some(signature) => {
                for (argument, param) in arguments.iter().zip(signature.params.iter()) {
                    if let (Some(argument), Some(param)) = (argument, param) {
                        self.add_superset_edge(*param, *argument);
                    }
                }
                for (result, returned) in results.iter().zip(signature.results.iter()) {
                    if let (Some(result), Some(returned)) = (result, returned) {
                        self.add_superset_edge(*result, *returned);
                    }
                }
            }
            None => {
                // Callee outside the unit
                let external = self.set.external_memory();
                for argument in arguments.iter().flatten() {
                    self.add_superset_edge(external, *argument);
                }
                for result in results.iter().flatten() {
                    self.add_superset_edge(*result, external);
                }
            }
        }
    }

    /// An escaped function may be called from outside with external arguments
    fn expose_function(&mut self, function: EntityIndex) {
        self.stats.escaped_functions += 1;
        let Some(signature) = self.set.function_signature(function).cloned() else {
            return;
        };
        let external = self.set.external_memory();
        for param in signature.params.iter().flatten() {
            self.add_superset_edge(*param, external);
        }
        for returned in signature.results.iter().flatten() {
            self.add_superset_edge(external, *returned);
        }
    }

    fn finish(self) -> AndersenStats {
        let mut stats = self.stats;
        if let Some(lcd) = &self.lcd {
            let lcd_stats = lcd.stats();
            stats.cycle_detection_attempts = lcd_stats.detection_attempts;
            stats.cycles_detected = lcd_stats.cycles_detected;
            stats.cycle_unifications = lcd_stats.unifications;
        }
        stats
    }
}
