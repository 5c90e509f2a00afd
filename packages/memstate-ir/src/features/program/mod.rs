//! Program Model
//!
//! A deliberately small program representation: functions holding a flat list
//! of operations over SSA-like values, plus imports and exported values.
//! There is no control flow. Memory operations carry a [`MemoryState`]
//! dependency that the memory-state encoder rewrites in place.
//!
//! ```text
//! ProgramBuilder ──build()──▶ Program ──▶ ConstraintGenerator ──▶ solvers
//!                                 ▲
//!                                 └── MemoryStateEncoder rewrites states
//! ```

pub mod application;
pub mod domain;

pub use application::ProgramBuilder;
pub use domain::{
    Function, FunctionId, Import, MemoryState, Operation, OperationId, OperationKind, Program,
    Value, ValueDefinition, ValueId, ValueType,
};
