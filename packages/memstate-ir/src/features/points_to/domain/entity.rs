//! Analysis entities
//!
//! An entity is an abstract identity for either a register (a pointer-typed
//! value) or a memory object (an allocation site, a function, an import, or
//! one of the two sentinels). Entities are addressed by dense [`EntityIndex`]
//! values owned by a single `NodeSet`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::features::program::{FunctionId, OperationId, ValueId};

static NEXT_NODE_SET_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique identity of one node set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeSetId(u32);

impl NodeSetId {
    pub(crate) fn fresh() -> Self {
        NodeSetId(NEXT_NODE_SET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set{}", self.0)
    }
}

/// Entity index (dense, per analysis run)
///
/// Carries the id of the node set that issued it, so a handle from another
/// run is rejected instead of silently addressing an unrelated entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityIndex {
    index: u32,
    set: NodeSetId,
}

impl EntityIndex {
    pub(crate) fn new(set: NodeSetId, index: u32) -> Self {
        Self { index, set }
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self.index
    }

    /// Node set that issued this handle
    #[inline]
    pub fn node_set(self) -> NodeSetId {
        self.set
    }
}

impl fmt::Display for EntityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Entity kind (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Pointer-typed value
    Register,
    /// Stack allocation site
    AllocaObject,
    /// Heap allocation site
    HeapObject,
    /// Function defined in the unit
    FunctionObject,
    /// Imported symbol
    ImportObject,
    /// Memory outside precise tracking (int-to-ptr, unmodelled ops)
    UnknownMemory,
    /// Memory owned by code outside the unit
    ExternalMemory,
}

impl EntityKind {
    /// Everything except registers can be pointed to
    #[inline]
    pub fn is_memory_object(self) -> bool {
        !matches!(self, EntityKind::Register)
    }

    #[inline]
    pub fn is_sentinel(self) -> bool {
        matches!(self, EntityKind::UnknownMemory | EntityKind::ExternalMemory)
    }
}

/// Program element an entity was created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityOrigin {
    /// Register for a program value
    Value(ValueId),
    /// Allocation site (alloca / malloc)
    Operation(OperationId),
    /// Function object
    Function(FunctionId),
    /// Import object, keyed by the import's address value
    Import(ValueId),
    /// Sentinels and solver-internal registers
    Synthetic,
}

/// Entity record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub label: String,
    pub origin: EntityOrigin,
}

impl Entity {
    pub fn new(kind: EntityKind, label: impl Into<String>, origin: EntityOrigin) -> Self {
        Self {
            kind,
            label: label.into(),
            origin,
        }
    }
}

/// Parameter and result registers of a function object
///
/// Non-pointer positions are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub params: Vec<Option<EntityIndex>>,
    pub results: Vec<Option<EntityIndex>>,
}
