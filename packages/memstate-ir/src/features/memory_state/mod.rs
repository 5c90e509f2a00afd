//! # Memory State Encoding
//!
//! Splits the single implicit memory dependency of a program into channels.
//! A [`ChannelPolicy`] partitions the memory nodes of a [`PointsToGraph`]
//! into channels; the [`MemoryStateEncoder`] then gives every memory
//! operation explicit uses/defs on only the channels its address operands
//! may reach.
//!
//! [`PointsToGraph`]: crate::features::points_to::PointsToGraph
//!
//! ## Usage
//! ```text
//! let analysis = PointsToAnalyzer::new(AnalysisConfig::default()).analyze(&program)?;
//! let policy = PerObjectPolicy::new(&analysis.graph);
//! let stats = MemoryStateEncoder::new().encode(&mut program, &analysis.graph, &policy);
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{MemoryStateEncoder, MemoryStateEncodingPass, PassOutput, PassReport};
pub use domain::{ChannelId, EncodingStats};
pub use infrastructure::{create_policy, BoundedChannelPolicy, PerObjectPolicy, SingleChannelPolicy};
pub use ports::ChannelPolicy;
