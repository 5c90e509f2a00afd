/*
 * memstate-ir - Alias Analysis and Memory State Encoding
 *
 * Feature-First Hexagonal Architecture:
 * - features/program/      : Program model (values, operations, memory states)
 * - features/points_to/    : Constraint generation, Steensgaard/Andersen solvers, points-to graph
 * - features/memory_state/ : Channel policies and the memory state encoder
 * - config/                : Presets, stage configs, versioned YAML
 */

// Crate-level lint configuration
#![allow(clippy::should_implement_trait)] // from_str naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::type_complexity)] // Solver tables
#![allow(clippy::needless_range_loop)] // Range loop for indexing
#![allow(clippy::derivable_impls)] // Manual impl for documentation

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Configuration (presets, stage configs, YAML)
pub mod config;

/// Error types
pub mod errors;

/// Feature modules
pub mod features;

pub use config::{AnalysisConfig, EncoderConfig, MemstateConfig, Preset};
pub use errors::{MemstateError, Result};
pub use features::memory_state::{ChannelPolicy, MemoryStateEncoder, MemoryStateEncodingPass};
pub use features::points_to::{AnalysisResult, PointsToAnalyzer, PointsToGraph};
pub use features::program::{Program, ProgramBuilder};
