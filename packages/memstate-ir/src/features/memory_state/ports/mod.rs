//! Ports for memory state encoding

use crate::features::memory_state::domain::ChannelId;
use crate::features::points_to::domain::points_to_graph::NodeIndex;

/// Partition of memory-object nodes into channels
///
/// A policy is built for one [`PointsToGraph`](crate::features::points_to::PointsToGraph)
/// and must only be queried with memory nodes of that graph.
pub trait ChannelPolicy {
    fn name(&self) -> &'static str;

    /// Number of distinct channels `channel_of` can return
    fn channel_count(&self) -> usize;

    /// Channel of a memory-object node
    ///
    /// # Panics
    /// If `node` is not a memory-object node of the policy's graph.
    fn channel_of(&self, node: NodeIndex) -> ChannelId;
}
