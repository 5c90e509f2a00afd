//! Program domain types

pub mod operation;
pub mod program;
pub mod value;

pub use operation::{MemoryState, Operation, OperationId, OperationKind};
pub use program::{Function, FunctionId, Import, Program};
pub use value::{Value, ValueDefinition, ValueId, ValueType};
