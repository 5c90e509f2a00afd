//! Operations and their memory-state dependency

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::value::ValueId;
use crate::features::memory_state::domain::ChannelId;

/// Operation identifier (unique across the program)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OperationId(pub u32);

impl OperationId {
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// Operation kind
///
/// Operand layout per kind:
///
/// | Kind          | inputs                     | outputs      |
/// |---------------|----------------------------|--------------|
/// | Alloca        | -                          | `ptr`        |
/// | Malloc        | `size?`                    | `ptr`        |
/// | Free          | `address`                  | -            |
/// | Load          | `address`                  | `value`      |
/// | Store         | `address`, `value`         | -            |
/// | Memcpy        | `dst`, `src`, `len?`       | -            |
/// | Call          | `callee`, `args...`        | `results...` |
/// | GetElementPtr | `base`, `offsets...`       | `ptr`        |
/// | Bitcast       | `value`                    | `value`      |
/// | IntToPtr      | `int`                      | `ptr`        |
/// | NullPointer   | -                          | `ptr`        |
/// | Undef         | -                          | `value`      |
/// | Phi           | `values...`                | `value`      |
/// | Opaque        | any                        | any          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Alloca,
    Malloc,
    Free,
    Load,
    Store,
    Memcpy,
    Call,
    GetElementPtr,
    Bitcast,
    IntToPtr,
    NullPointer,
    Undef,
    Phi,
    /// Unmodelled operation: pointer inputs escape, pointer outputs may
    /// point anywhere.
    Opaque,
}

impl OperationKind {
    /// Whether the operation is threaded through the memory state
    pub fn touches_memory(self) -> bool {
        matches!(
            self,
            OperationKind::Alloca
                | OperationKind::Malloc
                | OperationKind::Free
                | OperationKind::Load
                | OperationKind::Store
                | OperationKind::Memcpy
                | OperationKind::Call
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Alloca => "alloca",
            OperationKind::Malloc => "malloc",
            OperationKind::Free => "free",
            OperationKind::Load => "load",
            OperationKind::Store => "store",
            OperationKind::Memcpy => "memcpy",
            OperationKind::Call => "call",
            OperationKind::GetElementPtr => "gep",
            OperationKind::Bitcast => "bitcast",
            OperationKind::IntToPtr => "inttoptr",
            OperationKind::NullPointer => "null",
            OperationKind::Undef => "undef",
            OperationKind::Phi => "phi",
            OperationKind::Opaque => "opaque",
        }
    }
}

/// Memory-state dependency of an operation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemoryState {
    /// Operation does not touch memory
    #[default]
    None,

    /// Single conservative dependency on all of memory
    Coarse,

    /// Explicit per-channel dependencies
    Encoded {
        uses: BTreeSet<ChannelId>,
        defs: BTreeSet<ChannelId>,
    },
}

impl MemoryState {
    pub fn is_coarse(&self) -> bool {
        matches!(self, MemoryState::Coarse)
    }

    /// Channels read, if encoded
    pub fn uses(&self) -> Option<&BTreeSet<ChannelId>> {
        match self {
            MemoryState::Encoded { uses, .. } => Some(uses),
            _ => None,
        }
    }

    /// Channels written, if encoded
    pub fn defs(&self) -> Option<&BTreeSet<ChannelId>> {
        match self {
            MemoryState::Encoded { defs, .. } => Some(defs),
            _ => None,
        }
    }

    /// All channels the operation depends on (uses ∪ defs)
    pub fn channels(&self) -> BTreeSet<ChannelId> {
        match self {
            MemoryState::Encoded { uses, defs } => uses.union(defs).copied().collect(),
            _ => BTreeSet::new(),
        }
    }
}

/// A single operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub inputs: Vec<ValueId>,
    pub outputs: Vec<ValueId>,
    pub state: MemoryState,
}

impl Operation {
    pub fn new(id: OperationId, kind: OperationKind, inputs: Vec<ValueId>, outputs: Vec<ValueId>) -> Self {
        let state = if kind.touches_memory() {
            MemoryState::Coarse
        } else {
            MemoryState::None
        };
        Self {
            id,
            kind,
            inputs,
            outputs,
            state,
        }
    }

    /// Address operand of a load, store or free
    pub fn address(&self) -> Option<ValueId> {
        match self.kind {
            OperationKind::Load | OperationKind::Store | OperationKind::Free => {
                self.inputs.first().copied()
            }
            _ => None,
        }
    }

    /// Callee operand of a call
    pub fn callee(&self) -> Option<ValueId> {
        match self.kind {
            OperationKind::Call => self.inputs.first().copied(),
            _ => None,
        }
    }

    /// Argument operands of a call
    pub fn arguments(&self) -> &[ValueId] {
        match self.kind {
            OperationKind::Call if !self.inputs.is_empty() => &self.inputs[1..],
            _ => &[],
        }
    }
}
