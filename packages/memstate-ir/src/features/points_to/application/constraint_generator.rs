//! Constraint generation
//!
//! Walks a [`Program`] once and produces the entities and constraints the
//! solvers consume:
//!
//! | Program element        | Entities                     | Constraints                          |
//! |------------------------|------------------------------|--------------------------------------|
//! | import `i`             | import object, register `i`  | `i ⊇ {obj}`, `i` escapes             |
//! | function `f`           | function object, register    | `&f ⊇ {obj}`, signature              |
//! | `p = alloca / malloc`  | alloca / heap object         | `p ⊇ {obj}`                          |
//! | `v = *p` (pointer `v`) | -                            | `Load(v, p)`                         |
//! | `*p = v` (pointer `v`) | -                            | `Store(p, v)`                        |
//! | `memcpy(d, s)`         | dummy register `t`           | `Load(t, s)`, `Store(d, t)`          |
//! | `r = f(args)`          | -                            | `Call(f, args, r)`                   |
//! | `q = gep/bitcast p`    | `q` shares `p`'s entity      | -                                    |
//! | `q = inttoptr i`       | register `q`                 | `q ⊇ external`                       |
//! | `q = null / undef`     | register `q`                 | -                                    |
//! | `q = phi(a, b, ..)`    | register `q`                 | `q ⊇ a`, `q ⊇ b`, ..                 |
//! | opaque                 | -                            | pointer inputs escape, outputs ⊇ external, unknown |
//! | export `v`             | -                            | `v` escapes                          |
//!
//! Every address operand gets a register even when no constraint reads it, so
//! the encoder finds a node for each memory operation.

use tracing::debug;

use crate::features::points_to::domain::constraint::{Constraint, ConstraintSet};
use crate::features::points_to::domain::entity::{EntityIndex, EntityKind, EntityOrigin, FunctionSignature};
use crate::features::points_to::domain::error::PtaResult;
use crate::features::points_to::infrastructure::node_set::NodeSet;
use crate::features::program::{Operation, OperationKind, Program, ValueId};

/// Output of [`ConstraintGenerator::generate`]
#[derive(Debug)]
pub struct GeneratedConstraints {
    pub node_set: NodeSet,
    pub constraints: ConstraintSet,
}

/// Single-pass constraint generator
pub struct ConstraintGenerator<'a> {
    program: &'a Program,
    set: NodeSet,
    constraints: ConstraintSet,
}

impl<'a> ConstraintGenerator<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            set: NodeSet::new(),
            constraints: ConstraintSet::new(),
        }
    }

    /// Fail with `ResourceExhausted` instead of growing past `limit` entities
    pub fn with_entity_limit(mut self, limit: Option<usize>) -> Self {
        self.set = match limit {
            Some(limit) => NodeSet::with_capacity_limit(limit),
            None => NodeSet::new(),
        };
        self
    }

    pub fn generate(mut self) -> PtaResult<GeneratedConstraints> {
        let program = self.program;

        for import in program.imports() {
            let object = self.set.create_entity_with_origin(
                EntityKind::ImportObject,
                format!("import:{}", import.name),
                EntityOrigin::Import(import.value),
            )?;
            let register = self.register(import.value)?;
            self.constraints.add(Constraint::points_to(register, object));
            self.constraints.add(Constraint::Escapes { pointer: register });
        }

        let mut function_objects = Vec::with_capacity(program.functions().len());
        for function in program.functions() {
            let object = self.set.create_entity_with_origin(
                EntityKind::FunctionObject,
                format!("function:{}", function.name),
                EntityOrigin::Function(function.id),
            )?;
            let address = self.register(function.address)?;
            self.constraints.add(Constraint::points_to(address, object));
            let params = self.pointer_registers(&function.params)?;
            function_objects.push((object, params));
        }

        for function in program.functions() {
            for op in &function.body {
                self.operation(op)?;
            }
        }

        for (function, (object, params)) in program.functions().iter().zip(function_objects) {
            let results = self.pointer_registers(&function.results)?;
            self.set
                .set_function_signature(object, FunctionSignature { params, results });
        }

        for &value in program.exports() {
            if program.value(value).is_pointer() {
                let register = self.register(value)?;
                self.constraints.add(Constraint::Escapes { pointer: register });
            }
        }

        debug!(
            entities = self.set.num_entities(),
            constraints = self.constraints.len(),
            "constraints generated"
        );
        Ok(GeneratedConstraints {
            node_set: self.set,
            constraints: self.constraints,
        })
    }

    /// Register of `value`, created on first use
    fn register(&mut self, value: ValueId) -> PtaResult<EntityIndex> {
        match self.set.register_entity(value) {
            Some(index) => Ok(index),
            None => self.set.create_register(value, self.program.value(value).name.clone()),
        }
    }

    fn is_pointer(&self, value: ValueId) -> bool {
        self.program.value(value).is_pointer()
    }

    /// Registers for the pointer values of `values`, `None` elsewhere
    fn pointer_registers(&mut self, values: &[ValueId]) -> PtaResult<Vec<Option<EntityIndex>>> {
        values
            .iter()
            .map(|&value| {
                if self.is_pointer(value) {
                    self.register(value).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect()
    }

    fn allocation(&mut self, op: &Operation, kind: EntityKind, prefix: &str) -> PtaResult<()> {
        let output = op.outputs[0];
        let object = self.set.create_entity_with_origin(
            kind,
            format!("{}:{}", prefix, self.program.value(output).name),
            EntityOrigin::Operation(op.id),
        )?;
        let register = self.register(output)?;
        self.constraints.add(Constraint::points_to(register, object));
        Ok(())
    }

    fn operation(&mut self, op: &Operation) -> PtaResult<()> {
        match op.kind {
            OperationKind::Alloca => self.allocation(op, EntityKind::AllocaObject, "alloca")?,
            OperationKind::Malloc => self.allocation(op, EntityKind::HeapObject, "malloc")?,
            OperationKind::Free => {
                self.register(op.inputs[0])?;
            }
            OperationKind::Load => {
                let address = self.register(op.inputs[0])?;
                let value = op.outputs[0];
                if self.is_pointer(value) {
                    let value = self.register(value)?;
                    self.constraints.add(Constraint::load(value, address));
                }
            }
            OperationKind::Store => {
                let address = self.register(op.inputs[0])?;
                let value = op.inputs[1];
                if self.is_pointer(value) {
                    let value = self.register(value)?;
                    self.constraints.add(Constraint::store(address, value));
                }
            }
            OperationKind::Memcpy => {
                let dst = self.register(op.inputs[0])?;
                let src = self.register(op.inputs[1])?;
                let tmp = self.set.create_dummy_register()?;
                self.constraints.add(Constraint::load(tmp, src));
                self.constraints.add(Constraint::store(dst, tmp));
            }
            OperationKind::Call => {
                let callee = self.register(op.inputs[0])?;
                let arguments = self.pointer_registers(op.arguments())?;
                let results = self.pointer_registers(&op.outputs)?;
                self.constraints.add(Constraint::Call {
                    callee,
                    arguments,
                    results,
                });
            }
            OperationKind::GetElementPtr | OperationKind::Bitcast => {
                let (input, output) = (op.inputs[0], op.outputs[0]);
                if !self.is_pointer(output) {
                    return Ok(());
                }
                if !self.is_pointer(input) {
                    let register = self.register(output)?;
                    self.constraints.add(Constraint::PointsToExternal { pointer: register });
                    return Ok(());
                }
                let base = self.register(input)?;
                match self.set.register_entity(output) {
                    // already referenced by an earlier phi
                    Some(existing) => self.constraints.add(Constraint::superset(existing, base)),
                    None => self.set.map_register_to_existing(output, base),
                }
            }
            OperationKind::IntToPtr => {
                let register = self.register(op.outputs[0])?;
                self.constraints.add(Constraint::PointsToExternal { pointer: register });
            }
            OperationKind::NullPointer | OperationKind::Undef => {
                let output = op.outputs[0];
                if self.is_pointer(output) {
                    self.register(output)?;
                }
            }
            OperationKind::Phi => {
                let output = op.outputs[0];
                if !self.is_pointer(output) {
                    return Ok(());
                }
                let register = self.register(output)?;
                for &input in &op.inputs {
                    if self.is_pointer(input) {
                        let input = self.register(input)?;
                        if input != register {
                            self.constraints.add(Constraint::superset(register, input));
                        }
                    }
                }
            }
            OperationKind::Opaque => {
                for &input in &op.inputs {
                    if self.is_pointer(input) {
                        let register = self.register(input)?;
                        self.constraints.add(Constraint::Escapes { pointer: register });
                    }
                }
                for &output in &op.outputs {
                    if self.is_pointer(output) {
                        let register = self.register(output)?;
                        // the operation may hand back any escaped object, including its inputs
                        self.constraints.add(Constraint::PointsToExternal { pointer: register });
                        self.constraints.add(Constraint::PointsToUnknown { pointer: register });
                    }
                }
            }
        }
        Ok(())
    }
}
