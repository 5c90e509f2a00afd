//! Program construction

pub mod builder;

pub use builder::ProgramBuilder;
