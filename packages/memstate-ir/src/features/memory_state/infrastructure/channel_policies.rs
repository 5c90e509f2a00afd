//! Channel policies
//!
//! - [`SingleChannelPolicy`]: every memory node on channel 0 (the coarse
//!   model, expressed as channels)
//! - [`PerObjectPolicy`]: one channel per memory node
//! - [`BoundedChannelPolicy`]: per-object numbering folded onto at most
//!   `max_channels` channels
//!
//! Per-object numbering follows the graph's dump order, so the sentinels get
//! the last two channels.

use crate::config::ChannelPolicyKind;
use crate::features::memory_state::domain::ChannelId;
use crate::features::memory_state::ports::ChannelPolicy;
use crate::features::points_to::domain::points_to_graph::{NodeIndex, PointsToGraph};

/// One channel for all of memory
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleChannelPolicy;

impl SingleChannelPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl ChannelPolicy for SingleChannelPolicy {
    fn name(&self) -> &'static str {
        "single"
    }

    fn channel_count(&self) -> usize {
        1
    }

    fn channel_of(&self, _node: NodeIndex) -> ChannelId {
        ChannelId(0)
    }
}

/// One channel per memory-object node
#[derive(Debug, Clone)]
pub struct PerObjectPolicy {
    /// Indexed by node; `None` for register nodes
    ordinals: Vec<Option<u32>>,
    count: usize,
}

impl PerObjectPolicy {
    pub fn new(graph: &PointsToGraph) -> Self {
        let mut ordinals = vec![None; graph.num_nodes()];
        let memory = graph.memory_nodes();
        for (ordinal, node) in memory.iter().enumerate() {
            ordinals[node.as_usize()] = Some(ordinal as u32);
        }
        Self {
            ordinals,
            count: memory.len(),
        }
    }

    fn ordinal(&self, node: NodeIndex) -> u32 {
        match self.ordinals.get(node.as_usize()).copied().flatten() {
            Some(ordinal) => ordinal,
            None => panic!("node {} is not a memory node of this policy's graph", node.0),
        }
    }
}

impl ChannelPolicy for PerObjectPolicy {
    fn name(&self) -> &'static str {
        "per_object"
    }

    fn channel_count(&self) -> usize {
        self.count
    }

    fn channel_of(&self, node: NodeIndex) -> ChannelId {
        ChannelId(self.ordinal(node))
    }
}

/// Per-object channels folded modulo `max_channels`
#[derive(Debug, Clone)]
pub struct BoundedChannelPolicy {
    per_object: PerObjectPolicy,
    max_channels: u32,
}

impl BoundedChannelPolicy {
    /// # Panics
    /// If `max_channels` is zero or does not fit in `u32`.
    pub fn new(graph: &PointsToGraph, max_channels: usize) -> Self {
        assert!(max_channels > 0, "bounded policy needs at least one channel");
        let max_channels = u32::try_from(max_channels).unwrap_or_else(|_| panic!("max_channels {} too large", max_channels));
        Self {
            per_object: PerObjectPolicy::new(graph),
            max_channels,
        }
    }
}

impl ChannelPolicy for BoundedChannelPolicy {
    fn name(&self) -> &'static str {
        "bounded"
    }

    fn channel_count(&self) -> usize {
        self.per_object.count.min(self.max_channels as usize)
    }

    fn channel_of(&self, node: NodeIndex) -> ChannelId {
        ChannelId(self.per_object.ordinal(node) % self.max_channels)
    }
}

/// Policy for a configured kind
pub fn create_policy(kind: ChannelPolicyKind, graph: &PointsToGraph, max_channels: usize) -> Box<dyn ChannelPolicy> {
    match kind {
        ChannelPolicyKind::Single => Box::new(SingleChannelPolicy::new()),
        ChannelPolicyKind::PerObject => Box::new(PerObjectPolicy::new(graph)),
        ChannelPolicyKind::Bounded => Box::new(BoundedChannelPolicy::new(graph, max_channels)),
    }
}
