//! Dot dump of a points-to graph
//!
//! ```text
//! digraph PointsToGraph {
//!   2 [label = "p", shape = "oval"];
//!   2 -> 3;
//!   3 [label = "alloca:a", shape = "box"];
//!   0 [label = "unknown", shape = "box"];
//!   1 [label = "external", shape = "box"];
//! }
//! ```
//!
//! Node order: registers, allocas, mallocs, allocators, imports, unknown
//! memory, external memory; by node index within a group. Each node record
//! is followed by its outgoing edges in target order. Ids are node indices.
//!
//! The unknown and external memory records are dumped with their edges like
//! any other node, so a solved graph shows `1 -> 1` (external memory points
//! to itself) and every escaped object external memory may point to. Golden
//! outputs include those lines.

use std::fmt::Write;

use crate::features::points_to::domain::points_to_graph::{PointsToGraph, PointsToNodeKind};

fn shape(kind: PointsToNodeKind) -> &'static str {
    match kind {
        PointsToNodeKind::Register => "oval",
        PointsToNodeKind::Alloca
        | PointsToNodeKind::Malloc
        | PointsToNodeKind::Allocator
        | PointsToNodeKind::Import
        | PointsToNodeKind::UnknownMemory
        | PointsToNodeKind::ExternalMemory => "box",
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn to_dot(graph: &PointsToGraph) -> String {
    let mut dot = String::from("digraph PointsToGraph {\n");
    for index in graph.nodes_in_dump_order() {
        let node = graph.node(index);
        // Writing into a String cannot fail
        let _ = writeln!(
            dot,
            "  {} [label = \"{}\", shape = \"{}\"];",
            index.0,
            escape(node.label()),
            shape(node.kind())
        );
        for target in node.targets() {
            let _ = writeln!(dot, "  {} -> {};", index.0, target.0);
        }
    }
    dot.push_str("}\n");
    dot
}
