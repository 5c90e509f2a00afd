//! Top-level configuration
//!
//! ```rust,ignore
//! use memstate_ir::config::{MemstateConfig, Preset, PtaMode};
//!
//! // Preset only
//! let config = MemstateConfig::preset(Preset::Fast);
//!
//! // Preset with a stage override
//! let config = MemstateConfig::preset(Preset::Balanced)
//!     .analysis(|c| c.mode(PtaMode::Precise))
//!     .encoder(|c| c.max_channels(16));
//!
//! // From a versioned YAML file
//! let config = MemstateConfig::from_yaml("memstate.yaml")?;
//! ```

use super::error::{ConfigError, ConfigResult};
use super::io::{ConfigExportV1, SUPPORTED_VERSIONS};
use super::preset::Preset;
use super::stage_configs::{AnalysisConfig, EncoderConfig};
use super::validation::ValidatableCollection;
use std::path::Path;

/// Preset plus optional per-stage overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemstateConfig {
    preset: Preset,
    analysis: Option<AnalysisConfig>,
    encoder: Option<EncoderConfig>,
}

impl MemstateConfig {
    /// Start from a preset with no overrides
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset,
            analysis: None,
            encoder: None,
        }
    }

    /// Override the analysis stage, starting from the preset's values
    pub fn analysis<F>(mut self, f: F) -> Self
    where
        F: FnOnce(AnalysisConfig) -> AnalysisConfig,
    {
        let base = self
            .analysis
            .take()
            .unwrap_or_else(|| AnalysisConfig::from_preset(self.preset));
        self.analysis = Some(f(base));
        self
    }

    /// Override the encoder stage, starting from the preset's values
    pub fn encoder<F>(mut self, f: F) -> Self
    where
        F: FnOnce(EncoderConfig) -> EncoderConfig,
    {
        let base = self
            .encoder
            .take()
            .unwrap_or_else(|| EncoderConfig::from_preset(self.preset));
        self.encoder = Some(f(base));
        self
    }

    pub fn get_preset(&self) -> Preset {
        self.preset
    }

    /// Effective analysis configuration
    pub fn analysis_config(&self) -> AnalysisConfig {
        self.analysis
            .clone()
            .unwrap_or_else(|| AnalysisConfig::from_preset(self.preset))
    }

    /// Effective encoder configuration
    pub fn encoder_config(&self) -> EncoderConfig {
        self.encoder
            .clone()
            .unwrap_or_else(|| EncoderConfig::from_preset(self.preset))
    }

    pub fn has_overrides(&self) -> bool {
        self.analysis.is_some() || self.encoder.is_some()
    }

    /// Validate every override
    pub fn validate(&self) -> ConfigResult<()> {
        self.analysis.validate_all()?;
        self.encoder.validate_all()?;
        Ok(())
    }

    /// Load and validate a YAML v1 file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML v1 document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        let version = export.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let config = Self {
            preset: Preset::from_str(&export.preset)?,
            analysis: export.analysis,
            encoder: export.encoder,
        };
        config.validate()?;
        Ok(config)
    }

    /// Export to YAML v1
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: Some(1),
            preset: self.preset.to_string(),
            analysis: self.analysis.clone(),
            encoder: self.encoder.clone(),
        };

        Ok(serde_yaml::to_string(&export)?)
    }

    /// Get a human-readable description of the configuration
    pub fn describe(&self) -> String {
        let analysis = self.analysis_config();
        let encoder = self.encoder_config();
        format!(
            "preset={} mode={} cycle_detection={} worklist={:?} channels={:?}/{}{}",
            self.preset,
            analysis.mode,
            analysis.enable_cycle_detection,
            analysis.worklist,
            encoder.policy,
            encoder.max_channels,
            if self.has_overrides() { " (overridden)" } else { "" }
        )
    }
}

impl Default for MemstateConfig {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}
