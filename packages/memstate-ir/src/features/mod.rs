//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/     - Pure business logic (no external dependencies)
//! - ports/      - Interface definitions (traits)
//! - application/ - Use cases
//! - infrastructure/ - External dependency implementations

// Program representation the analyses run over
pub mod program;

// Steensgaard / Andersen points-to analysis with lazy cycle detection
pub mod points_to;

// Channel-based memory state encoding driven by the points-to graph
pub mod memory_state;
