//! Application layer for memory state encoding

pub mod encoder;
pub mod pass;

pub use encoder::MemoryStateEncoder;
pub use pass::{MemoryStateEncodingPass, PassOutput, PassReport};
