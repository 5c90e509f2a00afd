//! Points-to graph construction from a solved node set
//!
//! - One memory node per memory-object entity; members of a unified
//!   partition share their root's targets
//! - One register node per modelled program value (values aliased to the
//!   same entity get separate nodes with identical targets)
//! - Sentinel entities map onto the graph's sentinel nodes
//! - An edge for every member of each node's resolved points-to set
//!
//! Nodes are created in entity order, then value order, so identical inputs
//! give identical graphs.

use tracing::debug;

use super::node_set::NodeSet;
use crate::features::points_to::domain::entity::{EntityIndex, EntityKind};
use crate::features::points_to::domain::points_to_graph::{NodeIndex, PointsToGraph, PointsToNodeKind};
use crate::features::program::Program;

fn node_kind(kind: EntityKind) -> Option<PointsToNodeKind> {
    match kind {
        EntityKind::AllocaObject => Some(PointsToNodeKind::Alloca),
        EntityKind::HeapObject => Some(PointsToNodeKind::Malloc),
        EntityKind::FunctionObject => Some(PointsToNodeKind::Allocator),
        EntityKind::ImportObject => Some(PointsToNodeKind::Import),
        EntityKind::Register | EntityKind::UnknownMemory | EntityKind::ExternalMemory => None,
    }
}

/// Build the graph for a solved node set; register labels come from `program`
pub fn build_points_to_graph(set: &NodeSet, program: &Program) -> PointsToGraph {
    let mut graph = PointsToGraph::new();
    let mut memory_nodes: Vec<Option<NodeIndex>> = vec![None; set.num_entities()];
    memory_nodes[set.unknown_memory().as_usize()] = Some(graph.unknown_memory_node());
    memory_nodes[set.external_memory().as_usize()] = Some(graph.external_memory_node());

    for index in set.indices() {
        let entity = set.entity(index);
        if let Some(kind) = node_kind(entity.kind) {
            memory_nodes[index.as_usize()] = Some(graph.add_memory_node(kind, entity.label.clone(), entity.origin));
        }
    }

    let mut sources: Vec<(NodeIndex, EntityIndex)> = set
        .indices()
        .filter_map(|index| memory_nodes[index.as_usize()].map(|node| (node, index)))
        .collect();

    for (value, entity) in set.registers() {
        let node = graph.add_register_node(value, program.value(value).name.clone());
        sources.push((node, entity));
    }

    for (node, entity) in sources {
        let mut targets: Vec<NodeIndex> = set
            .points_to_of(entity)
            .iter()
            .map(|pointee| match memory_nodes[pointee.as_usize()] {
                Some(target) => target,
                None => panic!("points-to target {} has no memory node", pointee),
            })
            .collect();
        targets.sort_unstable();
        for target in targets {
            graph.insert_edge(node, target);
        }
    }

    debug!(
        nodes = graph.num_nodes(),
        edges = graph.num_edges(),
        "points-to graph built"
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::points_to::domain::entity::EntityOrigin;
    use crate::features::program::{ProgramBuilder, ValueType};

    #[test]
    fn test_build_from_node_set() {
        let mut b = ProgramBuilder::new();
        let f = b.function("f", &[]);
        let p = b.alloca(f, "p");
        let q = b.gep(f, p);
        let program = b.build();
        let alloca_op = program.defining_operation(p).unwrap();

        let mut set = NodeSet::new();
        let object = set
            .create_entity_with_origin(EntityKind::AllocaObject, "alloca:p", EntityOrigin::Operation(alloca_op))
            .unwrap();
        let register = set.create_register(p, "p").unwrap();
        set.map_register_to_existing(q, register);
        set.add_to_points_to_set(register, object);

        let graph = build_points_to_graph(&set, &program);
        let a = graph.allocation_node(alloca_op).unwrap();
        let pn = graph.register_node(p).unwrap();
        let qn = graph.register_node(q).unwrap();

        assert_eq!(graph.node(a).kind(), PointsToNodeKind::Alloca);
        assert!(graph.targets(pn).contains(&a));
        assert_eq!(graph.targets(pn), graph.targets(qn));
        assert_eq!(graph.node(qn).label(), program.value(q).name);
        assert_eq!(graph.sources(a).len(), 2);
    }

    #[test]
    fn test_sentinel_entities_map_to_sentinel_nodes() {
        let program = ProgramBuilder::new().build();
        let mut set = NodeSet::new();
        let (unknown, external) = (set.unknown_memory(), set.external_memory());
        set.add_to_points_to_set(external, external);
        set.add_to_points_to_set(unknown, external);

        let graph = build_points_to_graph(&set, &program);
        let (u, e) = (graph.unknown_memory_node(), graph.external_memory_node());

        assert_eq!(graph.num_nodes(), 2);
        assert!(graph.targets(e).contains(&e));
        assert!(graph.targets(u).contains(&e));
    }

    #[test]
    fn test_unified_members_share_targets() {
        let mut b = ProgramBuilder::new();
        let f = b.function("f", &[]);
        let x = b.alloca(f, "x");
        let y = b.alloca(f, "y");
        let program = b.build();
        let (xo, yo) = (
            program.defining_operation(x).unwrap(),
            program.defining_operation(y).unwrap(),
        );

        let mut set = NodeSet::new();
        let a = set
            .create_entity_with_origin(EntityKind::AllocaObject, "alloca:x", EntityOrigin::Operation(xo))
            .unwrap();
        let c = set
            .create_entity_with_origin(EntityKind::AllocaObject, "alloca:y", EntityOrigin::Operation(yo))
            .unwrap();
        let h = set.create_entity(EntityKind::HeapObject, "malloc:h").unwrap();
        set.add_to_points_to_set(a, h);
        set.unify(a, c);

        let graph = build_points_to_graph(&set, &program);
        let an = graph.allocation_node(xo).unwrap();
        let cn = graph.allocation_node(yo).unwrap();

        assert_eq!(graph.targets(an).len(), 1);
        assert_eq!(graph.targets(an), graph.targets(cn));
        assert_eq!(program.value(x).ty, ValueType::Pointer);
    }
}
