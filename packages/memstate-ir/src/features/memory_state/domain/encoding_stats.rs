//! Encoder statistics

use serde::{Deserialize, Serialize};

/// Statistics for one encoding run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingStats {
    /// Policy that assigned the channels
    pub policy: String,
    /// Channels the policy provides
    pub channel_count: usize,
    /// Memory operations rewritten
    pub operations_encoded: usize,
    pub loads: usize,
    pub stores: usize,
    pub allocations: usize,
    pub frees: usize,
    pub memcpys: usize,
    pub calls: usize,
    /// Calls whose callee set was not fully known
    pub calls_widened: usize,
    /// Operations whose address had no targets
    pub unknown_fallbacks: usize,
    /// Distinct channels referenced by at least one operation
    pub channels_used: usize,
    /// Largest uses ∪ defs of a single operation
    pub max_channels_per_operation: usize,
    /// Fixpoint rounds of the call summary
    pub summary_rounds: usize,
    pub duration_ms: f64,
}
