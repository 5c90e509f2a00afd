//! Domain models for memory state encoding

pub mod channel;
pub mod encoding_stats;

pub use channel::ChannelId;
pub use encoding_stats::EncodingStats;
