//! SSA values

use serde::{Deserialize, Serialize};
use std::fmt;

use super::operation::OperationId;
use super::program::FunctionId;

/// Value identifier (index into `Program::values`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueId(pub u32);

impl ValueId {
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Value type
///
/// Only pointer-typed values take part in points-to analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Pointer,
    Scalar,
}

impl ValueType {
    #[inline]
    pub fn is_pointer(self) -> bool {
        matches!(self, ValueType::Pointer)
    }
}

/// Where a value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueDefinition {
    /// Formal parameter `index` of a function
    Parameter { function: FunctionId, index: usize },

    /// Address of a function (the function object itself)
    FunctionAddress(FunctionId),

    /// Address of an imported symbol
    Import(usize),

    /// Output `index` of an operation
    Operation { operation: OperationId, index: usize },
}

/// An SSA value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Value {
    pub id: ValueId,
    pub name: String,
    pub ty: ValueType,
    pub definition: ValueDefinition,
}

impl Value {
    #[inline]
    pub fn is_pointer(&self) -> bool {
        self.ty.is_pointer()
    }
}
