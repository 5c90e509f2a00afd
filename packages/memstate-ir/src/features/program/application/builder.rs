//! Program builder
//!
//! Ergonomic construction of [`Program`] units. Value-producing operations
//! return the produced value; operations without pointer results return their
//! [`OperationId`]. Operation ids are allocated in insertion order across the
//! whole program.

use crate::features::program::domain::{
    Function, FunctionId, Import, Operation, OperationId, OperationKind, Program, Value,
    ValueDefinition, ValueId, ValueType,
};

/// Builder for [`Program`]
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_value(&mut self, name: Option<&str>, ty: ValueType, definition: ValueDefinition) -> ValueId {
        let id = ValueId(self.program.values.len() as u32);
        let name = match name {
            Some(name) => name.to_string(),
            None => id.to_string(),
        };
        self.program.values.push(Value {
            id,
            name,
            ty,
            definition,
        });
        id
    }

    /// Declare an imported symbol; returns its address value
    pub fn import(&mut self, name: &str) -> ValueId {
        let index = self.program.imports.len();
        let value = self.new_value(Some(name), ValueType::Pointer, ValueDefinition::Import(index));
        self.program.imports.push(Import {
            name: name.to_string(),
            value,
        });
        value
    }

    /// Declare a function with the given parameter types
    pub fn function(&mut self, name: &str, param_types: &[ValueType]) -> FunctionId {
        let id = FunctionId(self.program.functions.len() as u32);
        let address = self.new_value(Some(name), ValueType::Pointer, ValueDefinition::FunctionAddress(id));
        let params = param_types
            .iter()
            .enumerate()
            .map(|(index, ty)| {
                let param_name = format!("{}.arg{}", name, index);
                self.new_value(
                    Some(&param_name),
                    *ty,
                    ValueDefinition::Parameter {
                        function: id,
                        index,
                    },
                )
            })
            .collect();
        self.program.functions.push(Function {
            id,
            name: name.to_string(),
            address,
            params,
            results: Vec::new(),
            body: Vec::new(),
        });
        id
    }

    /// Address value of a function
    pub fn address_of(&self, function: FunctionId) -> ValueId {
        self.program.functions[function.as_usize()].address
    }

    /// Parameter `index` of a function
    pub fn param(&self, function: FunctionId, index: usize) -> ValueId {
        self.program.functions[function.as_usize()].params[index]
    }

    pub fn set_results(&mut self, function: FunctionId, results: &[ValueId]) {
        self.program.functions[function.as_usize()].results = results.to_vec();
    }

    /// Make a value visible outside the unit
    pub fn export(&mut self, value: ValueId) {
        if !self.program.exports.contains(&value) {
            self.program.exports.push(value);
        }
    }

    pub fn export_function(&mut self, function: FunctionId) {
        let address = self.address_of(function);
        self.export(address);
    }

    /// Append an operation; outputs are created with the given types
    fn push(
        &mut self,
        function: FunctionId,
        kind: OperationKind,
        inputs: Vec<ValueId>,
        outputs: &[(Option<&str>, ValueType)],
    ) -> (OperationId, Vec<ValueId>) {
        let op_id = OperationId(self.program.op_locations.len() as u32);
        let outputs: Vec<ValueId> = outputs
            .iter()
            .enumerate()
            .map(|(index, (name, ty))| {
                self.new_value(
                    *name,
                    *ty,
                    ValueDefinition::Operation {
                        operation: op_id,
                        index,
                    },
                )
            })
            .collect();
        let body = &mut self.program.functions[function.as_usize()].body;
        self.program.op_locations.push((function, body.len()));
        body.push(Operation::new(op_id, kind, inputs, outputs.clone()));
        (op_id, outputs)
    }

    fn push_single(
        &mut self,
        function: FunctionId,
        kind: OperationKind,
        inputs: Vec<ValueId>,
        name: Option<&str>,
        ty: ValueType,
    ) -> ValueId {
        let (_, outputs) = self.push(function, kind, inputs, &[(name, ty)]);
        outputs[0]
    }

    pub fn alloca(&mut self, function: FunctionId, name: &str) -> ValueId {
        self.push_single(function, OperationKind::Alloca, vec![], Some(name), ValueType::Pointer)
    }

    pub fn malloc(&mut self, function: FunctionId, name: &str) -> ValueId {
        self.push_single(function, OperationKind::Malloc, vec![], Some(name), ValueType::Pointer)
    }

    pub fn free(&mut self, function: FunctionId, address: ValueId) -> OperationId {
        self.push(function, OperationKind::Free, vec![address], &[]).0
    }

    pub fn load(&mut self, function: FunctionId, address: ValueId, ty: ValueType) -> ValueId {
        self.push_single(function, OperationKind::Load, vec![address], None, ty)
    }

    pub fn store(&mut self, function: FunctionId, address: ValueId, value: ValueId) -> OperationId {
        self.push(function, OperationKind::Store, vec![address, value], &[]).0
    }

    pub fn memcpy(&mut self, function: FunctionId, dst: ValueId, src: ValueId) -> OperationId {
        self.push(function, OperationKind::Memcpy, vec![dst, src], &[]).0
    }

    /// Call `callee` with `args`; returns the call and its results
    pub fn call(
        &mut self,
        function: FunctionId,
        callee: ValueId,
        args: &[ValueId],
        result_types: &[ValueType],
    ) -> (OperationId, Vec<ValueId>) {
        let mut inputs = Vec::with_capacity(args.len() + 1);
        inputs.push(callee);
        inputs.extend_from_slice(args);
        let outputs: Vec<(Option<&str>, ValueType)> = result_types.iter().map(|ty| (None, *ty)).collect();
        self.push(function, OperationKind::Call, inputs, &outputs)
    }

    pub fn gep(&mut self, function: FunctionId, base: ValueId) -> ValueId {
        self.push_single(function, OperationKind::GetElementPtr, vec![base], None, ValueType::Pointer)
    }

    pub fn bitcast(&mut self, function: FunctionId, value: ValueId) -> ValueId {
        let ty = self.program.value(value).ty;
        self.push_single(function, OperationKind::Bitcast, vec![value], None, ty)
    }

    pub fn int_to_ptr(&mut self, function: FunctionId, int: ValueId) -> ValueId {
        self.push_single(function, OperationKind::IntToPtr, vec![int], None, ValueType::Pointer)
    }

    pub fn null(&mut self, function: FunctionId) -> ValueId {
        self.push_single(function, OperationKind::NullPointer, vec![], None, ValueType::Pointer)
    }

    pub fn undef(&mut self, function: FunctionId, ty: ValueType) -> ValueId {
        self.push_single(function, OperationKind::Undef, vec![], None, ty)
    }

    pub fn phi(&mut self, function: FunctionId, inputs: &[ValueId], ty: ValueType) -> ValueId {
        self.push_single(function, OperationKind::Phi, inputs.to_vec(), None, ty)
    }

    /// Append an input to an existing phi (back edges)
    ///
    /// # Panics
    /// If `phi` is not the output of a phi operation.
    pub fn add_phi_input(&mut self, phi: ValueId, input: ValueId) {
        let op = self
            .program
            .defining_operation(phi)
            .and_then(|id| self.program.operation_mut(id))
            .filter(|op| op.kind == OperationKind::Phi);
        match op {
            Some(op) => op.inputs.push(input),
            None => panic!("{} is not defined by a phi", phi),
        }
    }

    /// Unmodelled operation
    pub fn opaque(
        &mut self,
        function: FunctionId,
        inputs: &[ValueId],
        output_types: &[ValueType],
    ) -> (OperationId, Vec<ValueId>) {
        let outputs: Vec<(Option<&str>, ValueType)> = output_types.iter().map(|ty| (None, *ty)).collect();
        self.push(function, OperationKind::Opaque, inputs.to_vec(), &outputs)
    }

    pub fn build(self) -> Program {
        self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::program::domain::MemoryState;

    #[test]
    fn test_build_simple_function() {
        let mut b = ProgramBuilder::new();
        let f = b.function("f", &[ValueType::Pointer]);
        let p = b.param(f, 0);
        let a = b.alloca(f, "a");
        let store = b.store(f, a, p);
        let v = b.load(f, a, ValueType::Pointer);
        b.set_results(f, &[v]);
        let program = b.build();

        assert_eq!(program.functions().len(), 1);
        assert_eq!(program.num_operations(), 3);
        assert_eq!(program.value(a).name, "a");
        assert_eq!(program.value(p).name, "f.arg0");
        assert_eq!(program.operation(store).map(|op| op.kind), Some(OperationKind::Store));
        assert_eq!(program.function(f).results, vec![v]);
        assert_eq!(program.num_memory_operations(), 3);
    }

    #[test]
    fn test_defining_operation() {
        let mut b = ProgramBuilder::new();
        let f = b.function("f", &[]);
        let a = b.alloca(f, "a");
        let g = b.gep(f, a);
        let program = b.build();

        let gep = program.defining_operation(g).and_then(|id| program.operation(id));
        assert_eq!(gep.map(|op| op.kind), Some(OperationKind::GetElementPtr));
        assert_eq!(gep.map(|op| op.state.clone()), Some(MemoryState::None));
        assert_eq!(program.defining_operation(program.function(f).address), None);
    }

    #[test]
    fn test_phi_back_edge() {
        let mut b = ProgramBuilder::new();
        let f = b.function("f", &[]);
        let a = b.alloca(f, "a");
        let p = b.phi(f, &[a], ValueType::Pointer);
        let q = b.gep(f, p);
        b.add_phi_input(p, q);
        let program = b.build();

        let phi = program.defining_operation(p).and_then(|id| program.operation(id));
        assert_eq!(phi.map(|op| op.inputs.clone()), Some(vec![a, q]));
    }

    #[test]
    fn test_exports_are_deduplicated() {
        let mut b = ProgramBuilder::new();
        let f = b.function("f", &[]);
        b.export_function(f);
        b.export_function(f);
        let program = b.build();

        assert_eq!(program.exports().len(), 1);
        assert!(program.is_exported(program.function(f).address));
    }
}
