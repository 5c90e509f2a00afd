//! Common test utilities for memstate-ir
//!
//! Shared program fixtures, random constraint problems and solver assertions
//! for the integration tests.

#![allow(dead_code)]

mod assertions;
mod builders;

pub use assertions::*;
pub use builders::*;
