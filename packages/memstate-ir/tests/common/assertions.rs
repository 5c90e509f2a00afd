//! Custom assertions for solver and encoder results

use memstate_ir::features::memory_state::ChannelId;
use memstate_ir::features::points_to::{Constraint, ConstraintSet, EntityIndex, EntityKind, NodeSet};
use memstate_ir::features::program::{MemoryState, OperationKind, Program, ValueId};
use std::collections::BTreeSet;

/// Points-to set of an entity, sorted
pub fn pts(set: &NodeSet, index: EntityIndex) -> BTreeSet<EntityIndex> {
    set.points_to_of(index).iter().copied().collect()
}

/// Assert that every inclusion constraint holds on the solved node set
///
/// Dereferences through function objects are ignored, as the solvers skip
/// them.
pub fn assert_inclusion_fixpoint(set: &NodeSet, constraints: &ConstraintSet) {
    let data_pointees = |address: EntityIndex| -> Vec<EntityIndex> {
        pts(set, address)
            .into_iter()
            .filter(|o| set.kind(*o) != EntityKind::FunctionObject)
            .collect()
    };

    for constraint in constraints {
        match constraint {
            Constraint::PointsTo { pointer, pointee } => {
                assert!(
                    pts(set, *pointer).contains(pointee),
                    "{:?} violated: {:?}",
                    constraint,
                    pts(set, *pointer)
                );
            }
            Constraint::Superset { superset, subset } => {
                assert!(
                    pts(set, *subset).is_subset(&pts(set, *superset)),
                    "{:?} violated",
                    constraint
                );
            }
            Constraint::Load { value, address } => {
                for object in data_pointees(*address) {
                    assert!(
                        pts(set, object).is_subset(&pts(set, *value)),
                        "{:?} violated through {}",
                        constraint,
                        object
                    );
                }
            }
            Constraint::Store { address, value } => {
                for object in data_pointees(*address) {
                    assert!(
                        pts(set, *value).is_subset(&pts(set, object)),
                        "{:?} violated through {}",
                        constraint,
                        object
                    );
                }
            }
            _ => {}
        }
    }
}

/// Assert that no memory operation kept the coarse state
pub fn assert_fully_encoded(program: &Program) {
    for op in program.operations() {
        if op.kind.touches_memory() {
            assert!(
                matches!(op.state, MemoryState::Encoded { .. }),
                "{} {} not encoded: {:?}",
                op.kind.as_str(),
                op.id,
                op.state
            );
        } else {
            assert_eq!(op.state, MemoryState::None, "{} {}", op.kind.as_str(), op.id);
        }
    }
}

/// Assert that every memory operation is still coarse
pub fn assert_all_coarse(program: &Program) {
    for op in program.operations().filter(|op| op.kind.touches_memory()) {
        assert!(op.state.is_coarse(), "{} {} was rewritten", op.kind.as_str(), op.id);
    }
}

/// Channels of the first operation of `kind` whose first input is `address`
pub fn channels_at(program: &Program, kind: OperationKind, address: ValueId) -> BTreeSet<ChannelId> {
    let op = program
        .operations()
        .find(|op| op.kind == kind && op.inputs.first() == Some(&address))
        .unwrap_or_else(|| panic!("no {} on {}", kind.as_str(), address));
    op.state.channels()
}
