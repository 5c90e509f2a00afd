//! Points-to analysis through the public API
//!
//! Programs in, graphs out: alias queries, escape, calls through function
//! pointers, dot output and graph editing errors.

mod common;

use common::*;
use memstate_ir::config::{AnalysisConfig, PtaMode};
use memstate_ir::features::points_to::domain::EntityOrigin;
use memstate_ir::features::points_to::{AnalysisError, PointsToGraphError, PointsToNodeKind, SolverStats};
use memstate_ir::features::program::{OperationId, ValueId, ValueType};
use memstate_ir::{PointsToAnalyzer, PointsToGraph, ProgramBuilder};
use pretty_assertions::assert_eq;

fn analyzer(mode: PtaMode) -> PointsToAnalyzer {
    PointsToAnalyzer::new(AnalysisConfig::default().mode(mode))
}

#[test]
fn test_store_then_load_recovers_stored_pointer() {
    let fixture = store_load_program();

    for mode in [PtaMode::Fast, PtaMode::Precise] {
        let result = analyzer(mode).analyze(&fixture.program).unwrap();
        assert!(result.may_alias(fixture.loaded, fixture.heap), "{}", mode);
    }

    let precise = analyzer(PtaMode::Precise).analyze(&fixture.program).unwrap();
    assert!(!precise.may_alias(fixture.loaded, fixture.slot));
    assert!(precise.graph.escaped_memory_nodes().is_empty());
}

#[test]
fn test_linked_list_walk() {
    let program = linked_list_program(4);
    let result = analyzer(PtaMode::Precise).analyze(&program).unwrap();
    let graph = &result.graph;

    let main = program.function_by_name("main").unwrap();
    let cursor = main.results[0];
    let targets: Vec<&str> = graph
        .targets(graph.register_node(cursor).unwrap())
        .iter()
        .map(|n| graph.node(*n).label())
        .collect();
    assert_eq!(targets, vec!["malloc:cell3"]);
}

#[test]
fn test_call_through_function_pointer() {
    let fixture = identity_call_program();
    let result = analyzer(PtaMode::Precise).analyze(&fixture.program).unwrap();

    assert!(result.may_alias(fixture.result, fixture.argument));
    assert!(!result.may_alias(fixture.result, fixture.other));
    match &result.stats.solver {
        SolverStats::Andersen(stats) => assert_eq!(stats.calls_bound, 1),
        other => panic!("unexpected solver {:?}", other),
    }

    let graph = &result.graph;
    let function = graph.function_node(fixture.id).unwrap();
    assert_eq!(graph.node(function).kind(), PointsToNodeKind::Allocator);
    assert!(graph.escaped_memory_nodes().is_empty());
}

#[test]
fn test_exported_function_receives_external_memory() {
    let mut b = ProgramBuilder::new();
    let callback = b.function("callback", &[ValueType::Pointer]);
    let param = b.param(callback, 0);
    let local = b.malloc(callback, "local");
    b.store(callback, param, local);
    b.export_function(callback);
    let program = b.build();

    for mode in [PtaMode::Fast, PtaMode::Precise] {
        let result = analyzer(mode).analyze(&program).unwrap();
        let graph = &result.graph;
        let param_node = graph.register_node(param).unwrap();
        assert!(graph.targets(param_node).contains(&graph.external_memory_node()), "{}", mode);

        // Stored through an external pointer
        let local_node = graph.allocation_node(program.defining_operation(local).unwrap()).unwrap();
        assert!(graph.escaped_memory_nodes().contains(&local_node), "{}", mode);
    }
}

#[test]
fn test_forged_pointers_point_to_sentinels() {
    let mut b = ProgramBuilder::new();
    let main = b.function("main", &[]);
    let int = b.undef(main, ValueType::Scalar);
    let forged = b.int_to_ptr(main, int);
    let (_, outputs) = b.opaque(main, &[int], &[ValueType::Pointer]);
    let program = b.build();

    let result = analyzer(PtaMode::Precise).analyze(&program).unwrap();
    let graph = &result.graph;
    let forged_targets = graph.targets(graph.register_node(forged).unwrap());
    assert!(forged_targets.contains(&graph.external_memory_node()));

    let opaque_targets = graph.targets(graph.register_node(outputs[0]).unwrap());
    assert!(opaque_targets.contains(&graph.unknown_memory_node()));
    assert!(opaque_targets.contains(&graph.external_memory_node()));
}

#[test]
fn test_entity_budget() {
    let program = linked_list_program(8);

    let err = PointsToAnalyzer::new(AnalysisConfig::default().max_entities(Some(6)))
        .analyze(&program)
        .unwrap_err();
    assert!(matches!(err, AnalysisError::ResourceExhausted { limit: 6 }));

    let ok = PointsToAnalyzer::new(AnalysisConfig::default().max_entities(Some(10_000))).analyze(&program);
    assert!(ok.is_ok());
}

#[test]
fn test_dot_is_deterministic() {
    let fixture = identity_call_program();
    let first = analyzer(PtaMode::Precise).analyze(&fixture.program).unwrap();
    let second = analyzer(PtaMode::Precise).analyze(&fixture.program).unwrap();

    assert_ne!(first.graph.id(), second.graph.id());
    assert_eq!(first.graph.to_dot(), second.graph.to_dot());
}

#[test]
fn test_dot_golden() {
    let mut graph = PointsToGraph::new();
    let buf = graph.add_memory_node(PointsToNodeKind::Malloc, "malloc:buf", EntityOrigin::Operation(OperationId(1)));
    let p = graph.add_register_node(ValueId(0), "p");
    let q = graph.add_register_node(ValueId(1), "q");
    let external = graph.external_memory_node();

    graph.add_edge(graph.node_ref(p), graph.node_ref(buf)).unwrap();
    graph.add_edge(graph.node_ref(q), graph.node_ref(buf)).unwrap();
    graph.add_edge(graph.node_ref(q), graph.node_ref(external)).unwrap();

    let expected = [
        "digraph PointsToGraph {",
        "  3 [label = \"p\", shape = \"oval\"];",
        "  3 -> 2;",
        "  4 [label = \"q\", shape = \"oval\"];",
        "  4 -> 1;",
        "  4 -> 2;",
        "  2 [label = \"malloc:buf\", shape = \"box\"];",
        "  0 [label = \"unknown\", shape = \"box\"];",
        "  1 [label = \"external\", shape = \"box\"];",
        "}",
        "",
    ]
    .join("\n");
    assert_eq!(graph.to_dot(), expected);
}

#[test]
fn test_edges_are_unique_and_indexed_both_ways() {
    let mut graph = PointsToGraph::new();
    let a = graph.add_memory_node(PointsToNodeKind::Alloca, "alloca:a", EntityOrigin::Operation(OperationId(0)));
    let p = graph.add_register_node(ValueId(0), "p");

    assert_eq!(graph.add_edge(graph.node_ref(p), graph.node_ref(a)), Ok(true));
    assert_eq!(graph.add_edge(graph.node_ref(p), graph.node_ref(a)), Ok(false));
    assert_eq!(graph.num_edges(), 1);
    assert!(graph.sources(a).contains(&p));

    assert_eq!(graph.remove_edge(graph.node_ref(p), graph.node_ref(a)), Ok(true));
    assert_eq!(graph.num_edges(), 0);
    assert!(graph.sources(a).is_empty());
}

#[test]
fn test_graph_editing_errors() {
    let mut graph = PointsToGraph::new();
    let p = graph.add_register_node(ValueId(0), "p");
    let q = graph.add_register_node(ValueId(1), "q");

    let mut other = PointsToGraph::new();
    let foreign = other.add_memory_node(PointsToNodeKind::Alloca, "alloca:x", EntityOrigin::Operation(OperationId(0)));

    let err = graph.add_edge(graph.node_ref(p), other.node_ref(foreign)).unwrap_err();
    assert_eq!(
        err,
        PointsToGraphError::CrossGraph {
            graph: graph.id(),
            source_graph: graph.id(),
            target_graph: other.id(),
        }
    );

    let err = graph.add_edge(graph.node_ref(p), graph.node_ref(q)).unwrap_err();
    assert_eq!(err, PointsToGraphError::RegisterTarget(q));
    assert_eq!(graph.num_edges(), 0);
}
