//! Channel policy implementations

pub mod channel_policies;

pub use channel_policies::{create_policy, BoundedChannelPolicy, PerObjectPolicy, SingleChannelPolicy};
