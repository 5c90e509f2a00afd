//! Program, functions and imports

use serde::{Deserialize, Serialize};
use std::fmt;

use super::operation::{Operation, OperationId};
use super::value::{Value, ValueDefinition, ValueId};

/// Function identifier (index into `Program::functions`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

impl FunctionId {
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn{}", self.0)
    }
}

/// A function defined in the unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    /// Pointer-typed value holding the function's address
    pub address: ValueId,
    pub params: Vec<ValueId>,
    pub results: Vec<ValueId>,
    pub body: Vec<Operation>,
}

/// An imported (externally defined) symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    pub name: String,
    /// Pointer-typed value holding the symbol's address
    pub value: ValueId,
}

/// A program unit
///
/// Values, functions and operations are addressed by dense ids. The unit's
/// exports are values visible to code outside the unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub(crate) values: Vec<Value>,
    pub(crate) functions: Vec<Function>,
    pub(crate) imports: Vec<Import>,
    pub(crate) exports: Vec<ValueId>,
    /// OperationId -> (function, position in body)
    pub(crate) op_locations: Vec<(FunctionId, usize)>,
}

impl Program {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get a value
    ///
    /// # Panics
    /// If `id` does not belong to this program.
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.as_usize()]
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.as_usize()]
    }

    /// Find a function by name
    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn exports(&self) -> &[ValueId] {
        &self.exports
    }

    pub fn is_exported(&self, value: ValueId) -> bool {
        self.exports.contains(&value)
    }

    pub fn num_operations(&self) -> usize {
        self.op_locations.len()
    }

    pub fn operation(&self, id: OperationId) -> Option<&Operation> {
        let (function, position) = *self.op_locations.get(id.as_usize())?;
        self.functions[function.as_usize()].body.get(position)
    }

    pub fn operation_mut(&mut self, id: OperationId) -> Option<&mut Operation> {
        let (function, position) = *self.op_locations.get(id.as_usize())?;
        self.functions[function.as_usize()].body.get_mut(position)
    }

    /// Function containing an operation
    pub fn function_of(&self, id: OperationId) -> Option<FunctionId> {
        self.op_locations.get(id.as_usize()).map(|(f, _)| *f)
    }

    /// All operations in function order, then body order
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.functions.iter().flat_map(|f| f.body.iter())
    }

    /// Operation producing `value`, if it is an operation output
    pub fn defining_operation(&self, value: ValueId) -> Option<OperationId> {
        match self.values.get(value.as_usize())?.definition {
            ValueDefinition::Operation { operation, .. } => Some(operation),
            _ => None,
        }
    }

    /// Number of operations threaded through the memory state
    pub fn num_memory_operations(&self) -> usize {
        self.operations().filter(|op| op.kind.touches_memory()).count()
    }
}
