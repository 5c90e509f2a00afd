//! Preset configurations
//!
//! Presets provide complete default configurations for both the points-to
//! analysis and the memory state encoder.

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Large inputs: cheapest analysis
    ///
    /// - Analysis: unification (Steensgaard)
    /// - Encoder: bounded, 8 channels
    Fast,

    /// Default
    ///
    /// - Analysis: auto (inclusion below the entity threshold), cycle detection on
    /// - Encoder: bounded, 64 channels
    Balanced,

    /// Maximum precision
    ///
    /// - Analysis: inclusion (Andersen) always, cycle detection on
    /// - Encoder: one channel per memory object
    Thorough,
}

impl Preset {
    /// Parse preset from string (case-insensitive)
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "thorough" => Ok(Self::Thorough),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Thorough => "thorough",
        }
    }

    pub fn all() -> [Preset; 3] {
        [Self::Fast, Self::Balanced, Self::Thorough]
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::Balanced
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
