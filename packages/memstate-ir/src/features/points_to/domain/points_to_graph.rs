//! Points-to Graph
//!
//! Materialized result of a points-to analysis run:
//! - Arena of nodes addressed by [`NodeIndex`]
//! - One node per register value and per memory object, plus the two
//!   sentinels (unknown memory, external memory) that always exist
//! - Directed may-point-to edges, indexed on both endpoints (`targets` and
//!   `sources`); targets are always memory-object nodes
//!
//! Every graph carries a process-unique [`GraphId`]; node handles
//! ([`NodeRef`]) remember which graph they belong to so that edges between
//! two graph instances are rejected with [`PointsToGraphError::CrossGraph`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use super::entity::EntityOrigin;
use crate::features::points_to::infrastructure::dot_export;
use crate::features::program::{FunctionId, OperationId, ValueId};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique graph identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(u64);

impl GraphId {
    fn fresh() -> Self {
        GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph#{}", self.0)
    }
}

/// Node index within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Node handle tagged with its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub graph: GraphId,
    pub index: NodeIndex,
}

/// Node kind (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointsToNodeKind {
    Register,
    Alloca,
    Malloc,
    /// Function-like objects
    Allocator,
    Import,
    UnknownMemory,
    ExternalMemory,
}

impl PointsToNodeKind {
    #[inline]
    pub fn is_memory_object(self) -> bool {
        !matches!(self, PointsToNodeKind::Register)
    }

    #[inline]
    pub fn is_sentinel(self) -> bool {
        matches!(self, PointsToNodeKind::UnknownMemory | PointsToNodeKind::ExternalMemory)
    }

    /// Position in the dot dump
    pub fn dump_group(self) -> u8 {
        match self {
            PointsToNodeKind::Register => 0,
            PointsToNodeKind::Alloca => 1,
            PointsToNodeKind::Malloc => 2,
            PointsToNodeKind::Allocator => 3,
            PointsToNodeKind::Import => 4,
            PointsToNodeKind::UnknownMemory => 5,
            PointsToNodeKind::ExternalMemory => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PointsToNodeKind::Register => "register",
            PointsToNodeKind::Alloca => "alloca",
            PointsToNodeKind::Malloc => "malloc",
            PointsToNodeKind::Allocator => "allocator",
            PointsToNodeKind::Import => "import",
            PointsToNodeKind::UnknownMemory => "unknown",
            PointsToNodeKind::ExternalMemory => "external",
        }
    }
}

/// A graph node
#[derive(Debug, Clone)]
pub struct PointsToNode {
    kind: PointsToNodeKind,
    label: String,
    origin: EntityOrigin,
    targets: BTreeSet<NodeIndex>,
    sources: BTreeSet<NodeIndex>,
}

impl PointsToNode {
    fn new(kind: PointsToNodeKind, label: String, origin: EntityOrigin) -> Self {
        Self {
            kind,
            label,
            origin,
            targets: BTreeSet::new(),
            sources: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> PointsToNodeKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn origin(&self) -> EntityOrigin {
        self.origin
    }

    /// Outgoing edges
    pub fn targets(&self) -> &BTreeSet<NodeIndex> {
        &self.targets
    }

    /// Incoming edges
    pub fn sources(&self) -> &BTreeSet<NodeIndex> {
        &self.sources
    }
}

/// Graph errors callers may want to handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointsToGraphError {
    #[error("Edge between different points-to graphs: {source_graph} -> {target_graph} (inserting into {graph})")]
    CrossGraph {
        graph: GraphId,
        source_graph: GraphId,
        target_graph: GraphId,
    },

    #[error("Register node {0:?} cannot be a points-to target")]
    RegisterTarget(NodeIndex),
}

/// Summary numbers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub register_nodes: usize,
    pub alloca_nodes: usize,
    pub malloc_nodes: usize,
    pub allocator_nodes: usize,
    pub import_nodes: usize,
    pub edges: usize,
    pub escaped_nodes: usize,
}

/// Points-to graph
#[derive(Debug)]
pub struct PointsToGraph {
    id: GraphId,
    nodes: Vec<PointsToNode>,
    registers: BTreeMap<ValueId, NodeIndex>,
    memory_by_origin: FxHashMap<EntityOrigin, NodeIndex>,
    unknown: NodeIndex,
    external: NodeIndex,
}

impl Default for PointsToGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PointsToGraph {
    /// Create a graph holding only the two sentinels
    pub fn new() -> Self {
        let mut graph = Self {
            id: GraphId::fresh(),
            nodes: Vec::new(),
            registers: BTreeMap::new(),
            memory_by_origin: FxHashMap::default(),
            unknown: NodeIndex(0),
            external: NodeIndex(0),
        };
        graph.unknown = graph.push_node(PointsToNodeKind::UnknownMemory, "unknown".into(), EntityOrigin::Synthetic);
        graph.external = graph.push_node(PointsToNodeKind::ExternalMemory, "external".into(), EntityOrigin::Synthetic);
        graph
    }

    fn push_node(&mut self, kind: PointsToNodeKind, label: String, origin: EntityOrigin) -> NodeIndex {
        let index = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(PointsToNode::new(kind, label, origin));
        index
    }

    #[inline]
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Handle for a node of this graph
    pub fn node_ref(&self, index: NodeIndex) -> NodeRef {
        assert!(index.as_usize() < self.nodes.len(), "node {:?} out of range", index);
        NodeRef {
            graph: self.id,
            index,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Construction
    // ═══════════════════════════════════════════════════════════════════════

    /// Add the node for a register value
    ///
    /// # Panics
    /// If `value` already has a node.
    pub fn add_register_node(&mut self, value: ValueId, label: impl Into<String>) -> NodeIndex {
        assert!(!self.registers.contains_key(&value), "value {} already has a register node", value);
        let index = self.push_node(PointsToNodeKind::Register, label.into(), EntityOrigin::Value(value));
        self.registers.insert(value, index);
        index
    }

    /// Add a memory-object node (sentinels excluded)
    pub fn add_memory_node(
        &mut self,
        kind: PointsToNodeKind,
        label: impl Into<String>,
        origin: EntityOrigin,
    ) -> NodeIndex {
        assert!(
            kind.is_memory_object() && !kind.is_sentinel(),
            "{:?} is not an allocatable memory node kind",
            kind
        );
        let index = self.push_node(kind, label.into(), origin);
        if origin != EntityOrigin::Synthetic {
            self.memory_by_origin.insert(origin, index);
        }
        index
    }

    fn check_edge(&self, source: NodeRef, target: NodeRef) -> Result<(), PointsToGraphError> {
        if source.graph != self.id || target.graph != self.id {
            return Err(PointsToGraphError::CrossGraph {
                graph: self.id,
                source_graph: source.graph,
                target_graph: target.graph,
            });
        }
        if !self.node(target.index).kind.is_memory_object() {
            return Err(PointsToGraphError::RegisterTarget(target.index));
        }
        Ok(())
    }

    /// Add `source → target`; returns false if the edge already existed
    pub fn add_edge(&mut self, source: NodeRef, target: NodeRef) -> Result<bool, PointsToGraphError> {
        self.check_edge(source, target)?;
        Ok(self.insert_edge(source.index, target.index))
    }

    /// Remove `source → target`; returns false if there was no such edge
    pub fn remove_edge(&mut self, source: NodeRef, target: NodeRef) -> Result<bool, PointsToGraphError> {
        self.check_edge(source, target)?;
        let removed = self.nodes[source.index.as_usize()].targets.remove(&target.index);
        if removed {
            self.nodes[target.index.as_usize()].sources.remove(&source.index);
        }
        Ok(removed)
    }

    /// Same-graph insertion used by the builder
    pub(crate) fn insert_edge(&mut self, source: NodeIndex, target: NodeIndex) -> bool {
        debug_assert!(self.nodes[target.as_usize()].kind.is_memory_object());
        let inserted = self.nodes[source.as_usize()].targets.insert(target);
        if inserted {
            self.nodes[target.as_usize()].sources.insert(source);
        }
        inserted
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn node(&self, index: NodeIndex) -> &PointsToNode {
        &self.nodes[index.as_usize()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &PointsToNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeIndex(i as u32), node))
    }

    pub fn targets(&self, index: NodeIndex) -> &BTreeSet<NodeIndex> {
        &self.node(index).targets
    }

    pub fn sources(&self, index: NodeIndex) -> &BTreeSet<NodeIndex> {
        &self.node(index).sources
    }

    #[inline]
    pub fn unknown_memory_node(&self) -> NodeIndex {
        self.unknown
    }

    #[inline]
    pub fn external_memory_node(&self) -> NodeIndex {
        self.external
    }

    pub fn register_node(&self, value: ValueId) -> Option<NodeIndex> {
        self.registers.get(&value).copied()
    }

    /// Register nodes ordered by value
    pub fn register_nodes(&self) -> impl Iterator<Item = (ValueId, NodeIndex)> + '_ {
        self.registers.iter().map(|(v, n)| (*v, *n))
    }

    pub fn memory_node(&self, origin: EntityOrigin) -> Option<NodeIndex> {
        self.memory_by_origin.get(&origin).copied()
    }

    /// Alloca or malloc node of an allocation site
    pub fn allocation_node(&self, operation: OperationId) -> Option<NodeIndex> {
        self.memory_node(EntityOrigin::Operation(operation))
    }

    pub fn function_node(&self, function: FunctionId) -> Option<NodeIndex> {
        self.memory_node(EntityOrigin::Function(function))
    }

    /// Import node, keyed by the import's address value
    pub fn import_node(&self, value: ValueId) -> Option<NodeIndex> {
        self.memory_node(EntityOrigin::Import(value))
    }

    /// All memory-object nodes (sentinels included), in dump order
    pub fn memory_nodes(&self) -> Vec<NodeIndex> {
        self.nodes_in_dump_order()
            .into_iter()
            .filter(|n| self.node(*n).kind.is_memory_object())
            .collect()
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_nodes_of_kind(&self, kind: PointsToNodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    pub fn num_register_nodes(&self) -> usize {
        self.registers.len()
    }

    pub fn num_edges(&self) -> usize {
        self.nodes.iter().map(|n| n.targets.len()).sum()
    }

    /// Memory nodes reachable from external memory (sentinels excluded)
    pub fn escaped_memory_nodes(&self) -> BTreeSet<NodeIndex> {
        let mut escaped = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([self.external]);
        visited.insert(self.external);

        while let Some(node) = queue.pop_front() {
            for &target in &self.node(node).targets {
                if visited.insert(target) {
                    queue.push_back(target);
                    if !self.node(target).kind.is_sentinel() {
                        escaped.insert(target);
                    }
                }
            }
        }
        escaped
    }

    /// Nodes grouped by kind in dump order, then by index
    pub fn nodes_in_dump_order(&self) -> Vec<NodeIndex> {
        let mut order: Vec<NodeIndex> = (0..self.nodes.len() as u32).map(NodeIndex).collect();
        order.sort_by_key(|n| (self.node(*n).kind.dump_group(), *n));
        order
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            register_nodes: self.num_register_nodes(),
            alloca_nodes: self.num_nodes_of_kind(PointsToNodeKind::Alloca),
            malloc_nodes: self.num_nodes_of_kind(PointsToNodeKind::Malloc),
            allocator_nodes: self.num_nodes_of_kind(PointsToNodeKind::Allocator),
            import_nodes: self.num_nodes_of_kind(PointsToNodeKind::Import),
            edges: self.num_edges(),
            escaped_nodes: self.escaped_memory_nodes().len(),
        }
    }

    /// Deterministic `digraph PointsToGraph { ... }` dump
    pub fn to_dot(&self) -> String {
        dot_export::to_dot(self)
    }
}

impl fmt::Display for PointsToGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        writeln!(f, "PointsToGraph {{")?;
        writeln!(f, "  registers: {}", stats.register_nodes)?;
        writeln!(f, "  allocas: {}", stats.alloca_nodes)?;
        writeln!(f, "  mallocs: {}", stats.malloc_nodes)?;
        writeln!(f, "  allocators: {}", stats.allocator_nodes)?;
        writeln!(f, "  imports: {}", stats.import_nodes)?;
        writeln!(f, "  edges: {}", stats.edges)?;
        writeln!(f, "  escaped: {}", stats.escaped_nodes)?;
        writeln!(f, "}}")
    }
}
