//! Lazy Cycle Detection (LCD)
//!
//! Collapses cycles in the subset-constraint graph of the inclusion solver.
//! All members of a cycle end up with identical points-to sets, so they can be
//! unified into one root without losing precision.
//!
//! The solver calls [`LazyCycleDetector::on_propagated_nothing`] whenever
//! propagation along `source → target` added nothing to `target`. That is the
//! cheap trigger: an edge that yields nothing new often closes a cycle whose
//! members already share state.
//!
//! On each trigger:
//! 1. An unordered pair is probed at most once; repeats are no-ops.
//! 2. Search from `target` back to `source` over current roots.
//! 3. Every root lying on some `target → source` path (both ends included) is
//!    unified into one survivor through the host's unify operation.
//!
//! The detector owns no adjacency; the host merges successor lists when it
//! unifies.
//!
//! # References
//! - Hardekopf & Lin "The Ant and the Grasshopper" (PLDI 2007)

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::features::points_to::domain::entity::EntityIndex;
use crate::features::points_to::ports::CycleGraph;

/// Detection counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LcdStats {
    /// Distinct edges probed
    pub detection_attempts: usize,
    /// Probes that found a cycle
    pub cycles_detected: usize,
    /// Pairwise unify operations performed
    pub unifications: usize,
}

/// Lazy cycle detector
#[derive(Debug, Default)]
pub struct LazyCycleDetector {
    probed: FxHashSet<(EntityIndex, EntityIndex)>,
    stats: LcdStats,
}

impl LazyCycleDetector {
    /// Create a detector for a node set of `num_entities` entities
    pub fn new(num_entities: usize) -> Self {
        let mut probed = FxHashSet::default();
        probed.reserve(num_entities);
        Self {
            probed,
            stats: LcdStats::default(),
        }
    }

    /// Hook: propagation along `source → target` produced no new information
    ///
    /// Returns the surviving root when a cycle was collapsed.
    pub fn on_propagated_nothing<G: CycleGraph + ?Sized>(
        &mut self,
        graph: &mut G,
        source: EntityIndex,
        target: EntityIndex,
    ) -> Option<EntityIndex> {
        let source = graph.root_of(source);
        let target = graph.root_of(target);
        if source == target {
            return None;
        }

        let key = if source < target {
            (source, target)
        } else {
            (target, source)
        };
        if !self.probed.insert(key) {
            return None;
        }
        self.stats.detection_attempts += 1;

        let members = Self::cycle_members(graph, source, target);
        if members.is_empty() {
            return None;
        }
        self.stats.cycles_detected += 1;

        let mut root = members[0];
        for &member in &members[1..] {
            root = graph.unify_roots(root, member);
            self.stats.unifications += 1;
        }
        trace!(
            source = source.as_u32(),
            target = target.as_u32(),
            collapsed = members.len(),
            "collapsed subset cycle"
        );
        Some(root)
    }

    /// Roots on any path `target → source`, sorted; empty if none
    fn cycle_members<G: CycleGraph + ?Sized>(
        graph: &G,
        source: EntityIndex,
        target: EntityIndex,
    ) -> Vec<EntityIndex> {
        let mut visited: FxHashSet<EntityIndex> = FxHashSet::default();
        let mut predecessors: FxHashMap<EntityIndex, Vec<EntityIndex>> = FxHashMap::default();
        let mut stack = vec![target];
        visited.insert(target);

        while let Some(node) = stack.pop() {
            if node == source {
                continue;
            }
            for successor in graph.successors(node) {
                let successor = graph.root_of(successor);
                if successor == node {
                    continue;
                }
                predecessors.entry(successor).or_default().push(node);
                if visited.insert(successor) {
                    stack.push(successor);
                }
            }
        }

        if !visited.contains(&source) {
            return Vec::new();
        }

        // Walk back from source: everything that reaches it is on a path
        let mut on_path: FxHashSet<EntityIndex> = FxHashSet::default();
        on_path.insert(source);
        let mut stack = vec![source];
        while let Some(node) = stack.pop() {
            if let Some(preds) = predecessors.get(&node) {
                for &pred in preds {
                    if on_path.insert(pred) {
                        stack.push(pred);
                    }
                }
            }
        }

        let mut members: Vec<EntityIndex> = on_path.into_iter().collect();
        members.sort_unstable();
        members
    }

    pub fn stats(&self) -> LcdStats {
        self.stats
    }

    pub fn num_cycle_detection_attempts(&self) -> usize {
        self.stats.detection_attempts
    }

    pub fn num_cycles_detected(&self) -> usize {
        self.stats.cycles_detected
    }

    pub fn num_cycle_unifications(&self) -> usize {
        self.stats.unifications
    }
}
