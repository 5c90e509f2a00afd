//! Configuration
//!
//! Two levels:
//! - Level 1: [`Preset`] - one value selects analysis and encoder defaults
//! - Level 2: stage overrides via closures or a versioned YAML file
//!
//! ```rust,ignore
//! use memstate_ir::config::{MemstateConfig, Preset, WorklistPolicy};
//!
//! let config = MemstateConfig::preset(Preset::Balanced)
//!     .analysis(|c| c.worklist(WorklistPolicy::Lifo));
//! config.validate()?;
//! ```

pub mod error;
pub mod io;
pub mod memstate_config;
pub mod preset;
pub mod stage_configs;
pub mod validation;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use io::ConfigExportV1;
pub use memstate_config::MemstateConfig;
pub use preset::Preset;
pub use stage_configs::{AnalysisConfig, ChannelPolicyKind, EncoderConfig, PtaMode, WorklistPolicy};
pub use validation::{Validatable, ValidatableCollection};
