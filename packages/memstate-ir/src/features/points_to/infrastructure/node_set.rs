//! Node Set: entity storage plus union-find partition
//!
//! Owns every entity created during one analysis run:
//! - Entity records (kind, label, origin)
//! - Union-find partition: parent pointers with path compression, union by rank
//! - Explicit points-to sets, valid for unification roots only
//! - Register side table: program value → entity index
//! - Function signatures for function objects (call binding)
//!
//! The two sentinels, unknown memory `U` and external memory `E`, exist from
//! construction and occupy indices 0 and 1.
//!
//! Every set has a process-unique [`NodeSetId`] stamped into the handles it
//! issues. Usage violations (a handle from another node set, an out-of-range
//! index, a non-root passed where a root is required, unifying a root with
//! itself) panic.
//!
//! # References
//! - Tarjan, R. E. "Efficiency of a Good But Not Linear Set Union Algorithm" (1975)

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::features::points_to::domain::entity::{
    Entity, EntityIndex, EntityKind, EntityOrigin, FunctionSignature, NodeSetId,
};
use crate::features::points_to::domain::error::{AnalysisError, PtaResult};
use crate::features::program::ValueId;

const UNKNOWN_MEMORY: u32 = 0;
const EXTERNAL_MEMORY: u32 = 1;

/// Entities and their union-find partition
#[derive(Debug, Clone)]
pub struct NodeSet {
    id: NodeSetId,

    entities: Vec<Entity>,

    /// Parent pointers (self-loop = root)
    parent: Vec<u32>,

    /// Rank (tree height upper bound) for union by rank
    rank: Vec<u8>,

    /// Points-to sets (only valid for roots)
    points_to: Vec<FxHashSet<EntityIndex>>,

    /// Register side table
    registers: FxHashMap<ValueId, EntityIndex>,

    signatures: FxHashMap<EntityIndex, FunctionSignature>,

    /// Maximum number of entities (None = unbounded)
    capacity: Option<usize>,

    /// Number of disjoint sets
    root_count: usize,
}

impl Default for NodeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSet {
    /// Create a node set holding only the two sentinels
    pub fn new() -> Self {
        let mut set = Self {
            id: NodeSetId::fresh(),
            entities: Vec::new(),
            parent: Vec::new(),
            rank: Vec::new(),
            points_to: Vec::new(),
            registers: FxHashMap::default(),
            signatures: FxHashMap::default(),
            capacity: None,
            root_count: 0,
        };
        set.push_entity(Entity::new(EntityKind::UnknownMemory, "unknown", EntityOrigin::Synthetic));
        set.push_entity(Entity::new(EntityKind::ExternalMemory, "external", EntityOrigin::Synthetic));
        set
    }

    /// Create a node set that refuses to grow beyond `limit` entities
    /// (sentinels included)
    pub fn with_capacity_limit(limit: usize) -> Self {
        let mut set = Self::new();
        set.capacity = Some(limit);
        set
    }

    fn push_entity(&mut self, entity: Entity) -> EntityIndex {
        let index = self.handle(self.entities.len() as u32);
        self.entities.push(entity);
        self.parent.push(index.as_u32());
        self.rank.push(0);
        self.points_to.push(FxHashSet::default());
        self.root_count += 1;
        index
    }

    #[inline]
    fn handle(&self, index: u32) -> EntityIndex {
        EntityIndex::new(self.id, index)
    }

    #[inline]
    fn check(&self, index: EntityIndex) {
        assert!(
            index.node_set() == self.id,
            "entity {} belongs to a different node set ({} vs {})",
            index,
            index.node_set(),
            self.id
        );
        assert!(
            index.as_usize() < self.entities.len(),
            "entity index {} out of range (node set holds {})",
            index,
            self.entities.len()
        );
    }

    #[inline]
    fn check_root(&self, index: EntityIndex) {
        self.check(index);
        assert!(
            self.is_unification_root(index),
            "entity {} is not a unification root",
            index
        );
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Entity creation
    // ═══════════════════════════════════════════════════════════════════════

    /// Allocate a fresh, non-unified entity
    ///
    /// Fails only when the capacity limit is reached.
    pub fn create_entity(&mut self, kind: EntityKind, label: impl Into<String>) -> PtaResult<EntityIndex> {
        self.create_entity_with_origin(kind, label, EntityOrigin::Synthetic)
    }

    pub fn create_entity_with_origin(
        &mut self,
        kind: EntityKind,
        label: impl Into<String>,
        origin: EntityOrigin,
    ) -> PtaResult<EntityIndex> {
        if let Some(limit) = self.capacity {
            if self.entities.len() >= limit {
                warn!(limit, "entity budget exhausted");
                return Err(AnalysisError::ResourceExhausted { limit });
            }
        }
        Ok(self.push_entity(Entity::new(kind, label, origin)))
    }

    /// Create the register entity modelling `value`
    ///
    /// # Panics
    /// If `value` already has a register.
    pub fn create_register(&mut self, value: ValueId, label: impl Into<String>) -> PtaResult<EntityIndex> {
        assert!(
            !self.registers.contains_key(&value),
            "value {} already has a register",
            value
        );
        let index = self.create_entity_with_origin(EntityKind::Register, label, EntityOrigin::Value(value))?;
        self.registers.insert(value, index);
        Ok(index)
    }

    /// Let `value` share an existing entity (pointer arithmetic, casts)
    pub fn map_register_to_existing(&mut self, value: ValueId, index: EntityIndex) {
        self.check(index);
        assert!(
            !self.registers.contains_key(&value),
            "value {} already has a register",
            value
        );
        self.registers.insert(value, index);
    }

    /// Register without a program value (memcpy intermediates)
    pub fn create_dummy_register(&mut self) -> PtaResult<EntityIndex> {
        self.create_entity(EntityKind::Register, "dummy")
    }

    pub fn register_entity(&self, value: ValueId) -> Option<EntityIndex> {
        self.registers.get(&value).copied()
    }

    /// All modelled values with their entities, ordered by value id
    pub fn registers(&self) -> Vec<(ValueId, EntityIndex)> {
        let mut registers: Vec<_> = self.registers.iter().map(|(v, e)| (*v, *e)).collect();
        registers.sort_unstable();
        registers
    }

    pub fn set_function_signature(&mut self, function: EntityIndex, signature: FunctionSignature) {
        self.check(function);
        assert_eq!(
            self.entities[function.as_usize()].kind,
            EntityKind::FunctionObject,
            "signature attached to non-function entity {}",
            function
        );
        self.signatures.insert(function, signature);
    }

    pub fn function_signature(&self, function: EntityIndex) -> Option<&FunctionSignature> {
        self.signatures.get(&function)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Entity queries
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn unknown_memory(&self) -> EntityIndex {
        self.handle(UNKNOWN_MEMORY)
    }

    #[inline]
    pub fn external_memory(&self) -> EntityIndex {
        self.handle(EXTERNAL_MEMORY)
    }

    pub fn id(&self) -> NodeSetId {
        self.id
    }

    #[inline]
    pub fn num_entities(&self) -> usize {
        self.entities.len()
    }

    /// Number of disjoint partitions
    #[inline]
    pub fn num_roots(&self) -> usize {
        self.root_count
    }

    pub fn capacity_limit(&self) -> Option<usize> {
        self.capacity
    }

    pub fn entity(&self, index: EntityIndex) -> &Entity {
        self.check(index);
        &self.entities[index.as_usize()]
    }

    #[inline]
    pub fn kind(&self, index: EntityIndex) -> EntityKind {
        self.entity(index).kind
    }

    pub fn indices(&self) -> impl Iterator<Item = EntityIndex> {
        let id = self.id;
        (0..self.entities.len() as u32).map(move |index| EntityIndex::new(id, index))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Union-find
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn is_unification_root(&self, index: EntityIndex) -> bool {
        self.check(index);
        self.parent[index.as_usize()] == index.as_u32()
    }

    /// Resolve to the partition representative, compressing the path
    pub fn get_unification_root(&mut self, index: EntityIndex) -> EntityIndex {
        self.check(index);
        let mut root = index.as_u32();
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        let mut current = index.as_u32();
        while current != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }
        self.handle(root)
    }

    /// Resolve without path compression (read-only queries)
    pub fn root_of(&self, index: EntityIndex) -> EntityIndex {
        self.check(index);
        let mut current = index.as_u32();
        while self.parent[current as usize] != current {
            current = self.parent[current as usize];
        }
        self.handle(current)
    }

    /// Merge two distinct roots; returns the survivor
    ///
    /// The loser's points-to set is folded into the survivor's and the loser
    /// forwards to the survivor for the rest of the run.
    pub fn unify(&mut self, a: EntityIndex, b: EntityIndex) -> EntityIndex {
        self.check_root(a);
        self.check_root(b);
        assert_ne!(a, b, "cannot unify root {} with itself", a);

        let (ra, rb) = (a.as_usize(), b.as_usize());
        let (survivor, loser) = if self.rank[ra] < self.rank[rb] {
            (b, a)
        } else if self.rank[ra] > self.rank[rb] {
            (a, b)
        } else {
            self.rank[ra] += 1;
            (a, b)
        };

        self.parent[loser.as_usize()] = survivor.as_u32();
        let moved = std::mem::take(&mut self.points_to[loser.as_usize()]);
        self.points_to[survivor.as_usize()].extend(moved);
        self.root_count -= 1;
        survivor
    }

    /// Group every entity under its root
    pub fn partitions(&self) -> FxHashMap<EntityIndex, Vec<EntityIndex>> {
        let mut partitions: FxHashMap<EntityIndex, Vec<EntityIndex>> = FxHashMap::default();
        for index in self.indices() {
            partitions.entry(self.root_of(index)).or_default().push(index);
        }
        partitions
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Points-to sets (roots only)
    // ═══════════════════════════════════════════════════════════════════════

    pub fn points_to(&self, root: EntityIndex) -> &FxHashSet<EntityIndex> {
        self.check_root(root);
        &self.points_to[root.as_usize()]
    }

    /// Points-to set of any entity, resolved through its root
    pub fn points_to_of(&self, index: EntityIndex) -> &FxHashSet<EntityIndex> {
        &self.points_to[self.root_of(index).as_usize()]
    }

    /// Add `pointee` to the root's set; returns true if it was new
    pub fn add_to_points_to_set(&mut self, root: EntityIndex, pointee: EntityIndex) -> bool {
        self.check_root(root);
        self.check(pointee);
        assert!(
            self.entities[pointee.as_usize()].kind.is_memory_object(),
            "register {} cannot be a points-to target",
            pointee
        );
        self.points_to[root.as_usize()].insert(pointee)
    }

    /// pts(superset) ⊇ pts(subset); returns true if the superset grew
    pub fn make_points_to_superset(&mut self, superset: EntityIndex, subset: EntityIndex) -> bool {
        self.check_root(superset);
        self.check_root(subset);
        if superset == subset {
            return false;
        }

        let source = std::mem::take(&mut self.points_to[subset.as_usize()]);
        let before = self.points_to[superset.as_usize()].len();
        self.points_to[superset.as_usize()].extend(source.iter().copied());
        let grew = self.points_to[superset.as_usize()].len() > before;
        self.points_to[subset.as_usize()] = source;
        grew
    }

    /// Replace a root's points-to set wholesale (unification solver output)
    pub(crate) fn set_points_to(&mut self, root: EntityIndex, pointees: FxHashSet<EntityIndex>) {
        self.check_root(root);
        self.points_to[root.as_usize()] = pointees;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocas(set: &mut NodeSet, n: usize) -> Vec<EntityIndex> {
        (0..n)
            .map(|i| set.create_entity(EntityKind::AllocaObject, format!("a{}", i)).unwrap())
            .collect()
    }

    #[test]
    fn test_sentinels_exist_from_creation() {
        let set = NodeSet::new();

        assert_eq!(set.num_entities(), 2);
        assert_eq!(set.kind(set.unknown_memory()), EntityKind::UnknownMemory);
        assert_eq!(set.kind(set.external_memory()), EntityKind::ExternalMemory);
        assert!(set.is_unification_root(set.unknown_memory()));
    }

    #[test]
    fn test_basic_unify() {
        let mut set = NodeSet::new();
        let e = allocas(&mut set, 4);
        assert_eq!(set.num_roots(), 6);

        let r01 = set.unify(e[0], e[1]);
        let r23 = set.unify(e[2], e[3]);
        assert_eq!(set.get_unification_root(e[0]), r01);
        assert_eq!(set.get_unification_root(e[1]), r01);
        assert_ne!(set.get_unification_root(e[2]), r01);
        assert_eq!(set.num_roots(), 4);

        let r = set.unify(r01, r23);
        for &x in &e {
            assert_eq!(set.get_unification_root(x), r);
        }
        assert_eq!(set.num_roots(), 3);
    }

    #[test]
    fn test_unify_merges_points_to_sets() {
        let mut set = NodeSet::new();
        let e = allocas(&mut set, 4);
        // e0 -> {e2}, e1 -> {e3}
        set.add_to_points_to_set(e[0], e[2]);
        set.add_to_points_to_set(e[1], e[3]);

        let root = set.unify(e[0], e[1]);
        let mut pts: Vec<_> = set.points_to(root).iter().copied().collect();
        pts.sort();
        assert_eq!(pts, vec![e[2], e[3]]);
        assert_eq!(set.points_to_of(e[0]), set.points_to_of(e[1]));
    }

    #[test]
    fn test_path_compression() {
        let mut set = NodeSet::new();
        let e = allocas(&mut set, 100);

        // Long chain
        let mut root = e[0];
        for &x in &e[1..] {
            root = set.unify(root, x);
        }

        let resolved = set.get_unification_root(e[99]);
        assert_eq!(resolved, root);
        for &x in &e {
            assert_eq!(set.root_of(x), root);
        }
    }

    #[test]
    fn test_make_points_to_superset() {
        let mut set = NodeSet::new();
        let e = allocas(&mut set, 3);
        set.add_to_points_to_set(e[0], e[2]);

        assert!(set.make_points_to_superset(e[1], e[0]));
        // nothing new the second time
        assert!(!set.make_points_to_superset(e[1], e[0]));
        assert!(set.points_to(e[1]).contains(&e[2]));
        assert!(set.points_to(e[0]).contains(&e[2]));
    }

    #[test]
    fn test_register_side_table() {
        let mut set = NodeSet::new();
        let r = set.create_register(ValueId(7), "p").unwrap();
        set.map_register_to_existing(ValueId(9), r);

        assert_eq!(set.register_entity(ValueId(7)), Some(r));
        assert_eq!(set.register_entity(ValueId(9)), Some(r));
        assert_eq!(set.register_entity(ValueId(8)), None);
        assert_eq!(set.registers(), vec![(ValueId(7), r), (ValueId(9), r)]);
    }

    #[test]
    fn test_capacity_limit() {
        let mut set = NodeSet::with_capacity_limit(3);
        assert!(set.create_entity(EntityKind::HeapObject, "h").is_ok());

        let err = set.create_entity(EntityKind::HeapObject, "h2").unwrap_err();
        assert!(matches!(err, AnalysisError::ResourceExhausted { limit: 3 }));
        assert_eq!(set.num_entities(), 3);
    }

    #[test]
    #[should_panic(expected = "not a unification root")]
    fn test_unify_non_root_panics() {
        let mut set = NodeSet::new();
        let e = allocas(&mut set, 3);
        let root = set.unify(e[0], e[1]);
        let loser = if root == e[0] { e[1] } else { e[0] };
        set.unify(loser, e[2]);
    }

    #[test]
    #[should_panic(expected = "with itself")]
    fn test_unify_self_panics() {
        let mut set = NodeSet::new();
        let e = allocas(&mut set, 1);
        set.unify(e[0], e[0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_out_of_range_index_panics() {
        let set = NodeSet::new();
        set.root_of(EntityIndex::new(set.id(), 42));
    }

    #[test]
    #[should_panic(expected = "belongs to a different node set")]
    fn test_index_from_other_node_set_panics() {
        let mut first = NodeSet::new();
        let e = allocas(&mut first, 2);
        let mut second = NodeSet::new();
        allocas(&mut second, 2);
        // same positions, different run
        second.unify(e[0], e[1]);
    }

    #[test]
    fn test_node_sets_have_distinct_ids() {
        let first = NodeSet::new();
        let second = NodeSet::new();
        assert_ne!(first.id(), second.id());
        assert_ne!(first.unknown_memory(), second.unknown_memory());
        assert_eq!(first.unknown_memory().as_usize(), second.unknown_memory().as_usize());
        // a clone keeps accepting the original's handles
        let clone = first.clone();
        assert!(clone.is_unification_root(first.external_memory()));
    }

    #[test]
    #[should_panic(expected = "cannot be a points-to target")]
    fn test_register_target_panics() {
        let mut set = NodeSet::new();
        let r = set.create_register(ValueId(0), "p").unwrap();
        let q = set.create_register(ValueId(1), "q").unwrap();
        set.add_to_points_to_set(r, q);
    }
}
