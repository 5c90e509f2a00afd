//! Memory State Encoder
//!
//! Rewrites the coarse memory dependency of every memory operation into
//! explicit channel uses/defs derived from the points-to graph:
//!
//! | Operation     | uses                     | defs              |
//! |---------------|--------------------------|-------------------|
//! | load          | channels(address)        | -                 |
//! | store, free   | channels(address)        | channels(address) |
//! | memcpy        | channels(src ∪ dst)      | channels(dst)     |
//! | alloca/malloc | -                        | own channel       |
//! | call          | live set                 | live set          |
//!
//! `channels(p)` maps the targets of `p`'s register node through the policy;
//! an empty target set maps to the unknown-memory channel. Addresses with no
//! targets at all (null, undef) therefore share that channel with each other
//! and with anything that may point to unknown memory, even under a
//! per-object policy where their empty sets are trivially disjoint.
//!
//! A call's live set holds the channels of every memory node reachable from
//! its pointer arguments and results, plus the transitive channel summary of
//! every callee defined in the unit. When the callee set is not fully known
//! the live set is widened with the external/unknown channels and the
//! channels of every escaped memory node.
//!
//! A register node missing for a pointer operand means the analysis did not
//! model the program it is encoding; this is a bug and panics.

use std::collections::{BTreeSet, VecDeque};
use std::time::Instant;

use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::features::memory_state::domain::{ChannelId, EncodingStats};
use crate::features::memory_state::ports::ChannelPolicy;
use crate::features::points_to::domain::entity::EntityOrigin;
use crate::features::points_to::domain::points_to_graph::{NodeIndex, PointsToGraph, PointsToNodeKind};
use crate::features::program::{FunctionId, MemoryState, Operation, OperationId, OperationKind, Program, ValueId};

type ChannelSet = BTreeSet<ChannelId>;

/// Encoded state of one non-call operation
struct Encoded {
    operation: OperationId,
    uses: ChannelSet,
    defs: ChannelSet,
}

/// A call awaiting the callee summaries
struct PendingCall {
    operation: OperationId,
    caller: FunctionId,
    local: ChannelSet,
    callees: Vec<FunctionId>,
}

/// Memory state encoder
///
/// Stateless apart from the statistics of the last run.
#[derive(Debug, Default)]
pub struct MemoryStateEncoder {
    stats: EncodingStats,
}

impl MemoryStateEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of the last [`encode`](Self::encode)
    pub fn stats(&self) -> &EncodingStats {
        &self.stats
    }

    /// Rewrite every memory operation of `program` in place
    ///
    /// # Panics
    /// If a pointer operand has no register node in `graph`, or an
    /// allocation has no memory node.
    pub fn encode(&mut self, program: &mut Program, graph: &PointsToGraph, policy: &dyn ChannelPolicy) -> EncodingStats {
        let start = Instant::now();
        let mut stats = EncodingStats {
            policy: policy.name().to_string(),
            channel_count: policy.channel_count(),
            ..Default::default()
        };

        let view = GraphView { graph, policy };
        let num_functions = program.functions().len();
        let mut summaries: Vec<ChannelSet> = vec![ChannelSet::new(); num_functions];
        let mut encoded = Vec::new();
        let mut calls = Vec::new();

        for function in program.functions() {
            for op in &function.body {
                if !op.kind.touches_memory() {
                    continue;
                }
                if op.kind == OperationKind::Call {
                    let call = view.pending_call(program, function.id, op, &mut stats);
                    summaries[function.id.as_usize()].extend(call.local.iter().copied());
                    calls.push(call);
                } else {
                    let state = view.encode_operation(op, &mut stats);
                    summaries[function.id.as_usize()].extend(state.uses.iter().chain(&state.defs).copied());
                    encoded.push(state);
                }
            }
        }

        stats.summary_rounds = close_summaries(&mut summaries, &calls);

        for state in encoded {
            apply(program, state.operation, state.uses, state.defs, &mut stats);
        }
        for call in calls {
            let mut live = call.local;
            for callee in &call.callees {
                live.extend(summaries[callee.as_usize()].iter().copied());
            }
            if live.is_empty() {
                live.insert(view.unknown_channel());
                stats.unknown_fallbacks += 1;
            }
            debug!(call = %call.operation, caller = call.caller.0, channels = live.len(), "call encoded");
            apply(program, call.operation, live.clone(), live, &mut stats);
        }

        stats.channels_used = program
            .operations()
            .flat_map(|op| op.state.channels())
            .collect::<FxHashSet<_>>()
            .len();
        stats.duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        info!(
            policy = %stats.policy,
            operations = stats.operations_encoded,
            channels_used = stats.channels_used,
            calls_widened = stats.calls_widened,
            duration_ms = stats.duration_ms,
            "memory state encoded"
        );
        self.stats = stats.clone();
        stats
    }
}

/// Propagate callee summaries into callers until nothing changes;
/// returns the number of rounds
fn close_summaries(summaries: &mut [ChannelSet], calls: &[PendingCall]) -> usize {
    let mut rounds = 0;
    loop {
        rounds += 1;
        let mut changed = false;
        for call in calls {
            for callee in &call.callees {
                if *callee == call.caller {
                    continue;
                }
                let missing: Vec<ChannelId> = summaries[callee.as_usize()]
                    .difference(&summaries[call.caller.as_usize()])
                    .copied()
                    .collect();
                if !missing.is_empty() {
                    summaries[call.caller.as_usize()].extend(missing);
                    changed = true;
                }
            }
        }
        if !changed {
            return rounds;
        }
    }
}

fn apply(program: &mut Program, operation: OperationId, uses: ChannelSet, defs: ChannelSet, stats: &mut EncodingStats) {
    let width = uses.union(&defs).count();
    stats.max_channels_per_operation = stats.max_channels_per_operation.max(width);
    stats.operations_encoded += 1;
    if let Some(op) = program.operation_mut(operation) {
        op.state = MemoryState::Encoded { uses, defs };
    }
}

struct GraphView<'a> {
    graph: &'a PointsToGraph,
    policy: &'a dyn ChannelPolicy,
}

impl<'a> GraphView<'a> {
    fn unknown_channel(&self) -> ChannelId {
        self.policy.channel_of(self.graph.unknown_memory_node())
    }

    fn register(&self, value: ValueId) -> NodeIndex {
        match self.graph.register_node(value) {
            Some(node) => node,
            None => panic!("pointer operand {} has no register node in the points-to graph", value),
        }
    }

    /// Channels of the targets of `value`; unknown channel when empty
    ///
    /// Every target-less address lands on the same channel, so two of them
    /// stay ordered against each other.
    fn address_channels(&self, value: ValueId, stats: &mut EncodingStats) -> ChannelSet {
        let targets = self.graph.targets(self.register(value));
        if targets.is_empty() {
            stats.unknown_fallbacks += 1;
            return ChannelSet::from([self.unknown_channel()]);
        }
        targets.iter().map(|t| self.policy.channel_of(*t)).collect()
    }

    /// Channels of every memory node reachable from `value`
    fn reachable_channels(&self, value: ValueId, into: &mut ChannelSet) {
        let mut visited = FxHashSet::default();
        let mut queue: VecDeque<NodeIndex> = self.graph.targets(self.register(value)).iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            into.insert(self.policy.channel_of(node));
            queue.extend(self.graph.targets(node).iter().copied());
        }
    }

    fn widen(&self, into: &mut ChannelSet) {
        into.insert(self.unknown_channel());
        into.insert(self.policy.channel_of(self.graph.external_memory_node()));
        for node in self.graph.escaped_memory_nodes() {
            into.insert(self.policy.channel_of(node));
        }
    }

    fn encode_operation(&self, op: &Operation, stats: &mut EncodingStats) -> Encoded {
        let (uses, defs) = match op.kind {
            OperationKind::Load => {
                stats.loads += 1;
                (self.address_channels(op.inputs[0], stats), ChannelSet::new())
            }
            OperationKind::Store | OperationKind::Free => {
                if op.kind == OperationKind::Store {
                    stats.stores += 1;
                } else {
                    stats.frees += 1;
                }
                let channels = self.address_channels(op.inputs[0], stats);
                (channels.clone(), channels)
            }
            OperationKind::Memcpy => {
                stats.memcpys += 1;
                let dst = self.address_channels(op.inputs[0], stats);
                let src = self.address_channels(op.inputs[1], stats);
                (src.union(&dst).copied().collect(), dst)
            }
            OperationKind::Alloca | OperationKind::Malloc => {
                stats.allocations += 1;
                let node = match self.graph.allocation_node(op.id) {
                    Some(node) => node,
                    None => panic!("allocation {} has no memory node in the points-to graph", op.id),
                };
                (ChannelSet::new(), ChannelSet::from([self.policy.channel_of(node)]))
            }
            kind => unreachable!("{} is not a non-call memory operation", kind.as_str()),
        };
        Encoded {
            operation: op.id,
            uses,
            defs,
        }
    }

    fn pending_call(&self, program: &Program, caller: FunctionId, op: &Operation, stats: &mut EncodingStats) -> PendingCall {
        stats.calls += 1;
        let mut local = ChannelSet::new();
        let mut callees = Vec::new();
        let mut fully_known = true;

        let callee = match op.callee() {
            Some(callee) => callee,
            None => panic!("call {} has no callee operand", op.id),
        };
        let targets = self.graph.targets(self.register(callee));
        if targets.is_empty() {
            fully_known = false;
        }
        for &target in targets {
            let node = self.graph.node(target);
            match (node.kind(), node.origin()) {
                (PointsToNodeKind::Allocator, EntityOrigin::Function(function)) => callees.push(function),
                _ => fully_known = false,
            }
        }

        for &value in op.arguments().iter().chain(&op.outputs) {
            if program.value(value).is_pointer() {
                self.reachable_channels(value, &mut local);
            }
        }

        if !fully_known {
            stats.calls_widened += 1;
            self.widen(&mut local);
        }

        PendingCall {
            operation: op.id,
            caller,
            local,
            callees,
        }
    }
}
