//! Configuration I/O (YAML schema)
//!
//! Defines the on-disk schema. Loading and export live on
//! [`MemstateConfig`](super::MemstateConfig).

use super::stage_configs::{AnalysisConfig, EncoderConfig};
use serde::{Deserialize, Serialize};

/// Schema versions this crate reads
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1); optional only so a missing
    /// field gets a dedicated error
    #[serde(default)]
    pub version: Option<u32>,

    /// Base preset
    pub preset: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder: Option<EncoderConfig>,
}
