//! Test data builders
//!
//! - Program fixtures built with [`ProgramBuilder`]
//! - Random constraint problems over registers and stack objects, with a
//!   proptest strategy

use memstate_ir::features::points_to::{Constraint, ConstraintSet, EntityIndex, EntityKind, NodeSet};
use memstate_ir::features::program::{FunctionId, ValueId, ValueType};
use memstate_ir::{Program, ProgramBuilder};
use proptest::prelude::*;

// ============================================================================
// Program fixtures
// ============================================================================

/// `slot = alloca; heap = malloc; *slot = heap; loaded = *slot; free(loaded)`
pub struct StoreLoadFixture {
    pub program: Program,
    pub main: FunctionId,
    pub slot: ValueId,
    pub heap: ValueId,
    pub loaded: ValueId,
}

pub fn store_load_program() -> StoreLoadFixture {
    let mut b = ProgramBuilder::new();
    let main = b.function("main", &[]);
    let slot = b.alloca(main, "slot");
    let heap = b.malloc(main, "heap");
    b.store(main, slot, heap);
    let loaded = b.load(main, slot, ValueType::Pointer);
    b.free(main, loaded);
    StoreLoadFixture {
        program: b.build(),
        main,
        slot,
        heap,
        loaded,
    }
}

/// Two allocations that never meet: `a`, `b` with a store and load each
pub struct DisjointFixture {
    pub program: Program,
    pub a: ValueId,
    pub b: ValueId,
}

pub fn disjoint_program() -> DisjointFixture {
    let mut builder = ProgramBuilder::new();
    let main = builder.function("main", &[]);
    let int = builder.undef(main, ValueType::Scalar);
    let a = builder.alloca(main, "a");
    let b = builder.alloca(main, "b");
    builder.store(main, a, int);
    builder.store(main, b, int);
    builder.load(main, a, ValueType::Scalar);
    builder.load(main, b, ValueType::Scalar);
    DisjointFixture {
        program: builder.build(),
        a,
        b,
    }
}

/// `id(p) = p` called through its address from `main`
pub struct IdentityCallFixture {
    pub program: Program,
    pub id: FunctionId,
    pub argument: ValueId,
    pub result: ValueId,
    pub other: ValueId,
}

pub fn identity_call_program() -> IdentityCallFixture {
    let mut b = ProgramBuilder::new();
    let id = b.function("id", &[ValueType::Pointer]);
    let p = b.param(id, 0);
    b.set_results(id, &[p]);

    let main = b.function("main", &[]);
    let argument = b.alloca(main, "x");
    let other = b.alloca(main, "y");
    let callee = b.address_of(id);
    let (_, results) = b.call(main, callee, &[argument], &[ValueType::Pointer]);
    IdentityCallFixture {
        program: b.build(),
        id,
        argument,
        result: results[0],
        other,
    }
}

/// A chain of `len` heap cells linked through stores, then walked with loads
pub fn linked_list_program(len: usize) -> Program {
    let mut b = ProgramBuilder::new();
    let main = b.function("main", &[]);
    let cells: Vec<ValueId> = (0..len).map(|i| b.malloc(main, &format!("cell{}", i))).collect();
    for pair in cells.windows(2) {
        b.store(main, pair[0], pair[1]);
    }
    let mut cursor = cells[0];
    for _ in 1..len {
        cursor = b.load(main, cursor, ValueType::Pointer);
    }
    b.set_results(main, &[cursor]);
    b.build()
}

// ============================================================================
// Random constraint problems
// ============================================================================

/// Constraint over register / object ordinals
#[derive(Debug, Clone, Copy)]
pub enum RawConstraint {
    /// register → object
    PointsTo(usize, usize),
    /// pts(register) ⊇ pts(register)
    Copy(usize, usize),
    /// register = *register
    Load(usize, usize),
    /// *register = register
    Store(usize, usize),
}

#[derive(Debug, Clone)]
pub struct Problem {
    pub registers: usize,
    pub objects: usize,
    pub constraints: Vec<RawConstraint>,
}

/// A problem materialized on a fresh node set
pub struct Instance {
    pub set: NodeSet,
    pub constraints: ConstraintSet,
    pub registers: Vec<EntityIndex>,
    pub objects: Vec<EntityIndex>,
}

impl Problem {
    pub fn instantiate(&self) -> Instance {
        let mut set = NodeSet::new();
        let registers: Vec<EntityIndex> = (0..self.registers)
            .map(|i| set.create_entity(EntityKind::Register, format!("r{}", i)).unwrap())
            .collect();
        let objects: Vec<EntityIndex> = (0..self.objects)
            .map(|i| set.create_entity(EntityKind::AllocaObject, format!("alloca:o{}", i)).unwrap())
            .collect();

        let mut constraints = ConstraintSet::new();
        for raw in &self.constraints {
            constraints.add(match *raw {
                RawConstraint::PointsTo(p, o) => Constraint::points_to(registers[p], objects[o]),
                RawConstraint::Copy(a, b) => Constraint::superset(registers[a], registers[b]),
                RawConstraint::Load(v, a) => Constraint::load(registers[v], registers[a]),
                RawConstraint::Store(a, v) => Constraint::store(registers[a], registers[v]),
            });
        }

        Instance {
            set,
            constraints,
            registers,
            objects,
        }
    }
}

pub fn problem_strategy() -> impl Strategy<Value = Problem> {
    (1usize..8, 1usize..6).prop_flat_map(|(registers, objects)| {
        let raw = prop_oneof![
            (0..registers, 0..objects).prop_map(|(p, o)| RawConstraint::PointsTo(p, o)),
            (0..registers, 0..registers).prop_map(|(a, b)| RawConstraint::Copy(a, b)),
            (0..registers, 0..registers).prop_map(|(v, a)| RawConstraint::Load(v, a)),
            (0..registers, 0..registers).prop_map(|(a, v)| RawConstraint::Store(a, v)),
        ];
        prop::collection::vec(raw, 0..24).prop_map(move |constraints| Problem {
            registers,
            objects,
            constraints,
        })
    })
}
