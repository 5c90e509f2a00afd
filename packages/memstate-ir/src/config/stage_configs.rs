//! Stage configurations
//!
//! One struct per stage: [`AnalysisConfig`] drives constraint generation and
//! solving, [`EncoderConfig`] drives channel assignment. Both follow the same
//! shape: `#[serde(default)]` fields, builder setters, `validate()`, and
//! `from_preset()`.

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::Validatable;
use serde::{Deserialize, Serialize};

// ============================================================================
// Points-to Analysis Configuration
// ============================================================================

/// Points-to algorithm mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PtaMode {
    /// Steensgaard (unification-based)
    Fast,
    /// Andersen (inclusion-based)
    Precise,
    /// Precise below `auto_threshold` entities, Fast otherwise
    Auto,
}

impl PtaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Precise => "precise",
            Self::Auto => "auto",
        }
    }
}

impl std::fmt::Display for PtaMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order in which the inclusion solver drains changed roots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorklistPolicy {
    #[default]
    Fifo,
    Lifo,
}

/// Points-to analysis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Algorithm selection
    pub mode: PtaMode,

    /// Lazy cycle detection in the inclusion solver
    pub enable_cycle_detection: bool,

    /// Worklist discipline for the inclusion solver
    pub worklist: WorklistPolicy,

    /// Inclusion solver propagates only the pointees added since a root was
    /// last processed
    pub difference_propagation: bool,

    /// Entity budget, sentinels included (None = unlimited)
    pub max_entities: Option<usize>,

    /// Auto mode threshold: use Precise below this many entities
    pub auto_threshold: usize,

    /// Emit the finished graph in dot format at debug level
    pub dump_dot: bool,
}

impl AnalysisConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(n) = self.max_entities {
            if n < 2 || n > u32::MAX as usize {
                return Err(ConfigError::range_with_hint(
                    "max_entities",
                    n,
                    2,
                    u32::MAX,
                    "The budget must leave room for the unknown and external memory entities",
                ));
            }
        }

        if self.auto_threshold == 0 || self.auto_threshold > 10_000_000 {
            return Err(ConfigError::range_with_hint(
                "auto_threshold",
                self.auto_threshold,
                1,
                10_000_000,
                "Auto threshold must be reasonable",
            ));
        }

        Ok(())
    }

    /// Builder: Set mode
    pub fn mode(mut self, v: PtaMode) -> Self {
        self.mode = v;
        self
    }

    /// Builder: Set enable_cycle_detection
    pub fn enable_cycle_detection(mut self, v: bool) -> Self {
        self.enable_cycle_detection = v;
        self
    }

    /// Builder: Set worklist
    pub fn worklist(mut self, v: WorklistPolicy) -> Self {
        self.worklist = v;
        self
    }

    /// Builder: Set difference_propagation
    pub fn difference_propagation(mut self, v: bool) -> Self {
        self.difference_propagation = v;
        self
    }

    /// Builder: Set max_entities
    pub fn max_entities(mut self, v: Option<usize>) -> Self {
        self.max_entities = v;
        self
    }

    /// Builder: Set auto_threshold
    pub fn auto_threshold(mut self, v: usize) -> Self {
        self.auto_threshold = v;
        self
    }

    /// Builder: Set dump_dot
    pub fn dump_dot(mut self, v: bool) -> Self {
        self.dump_dot = v;
        self
    }

    /// Concrete mode for a constraint system of `entities` entities.
    /// Never returns [`PtaMode::Auto`].
    pub fn resolve_mode(&self, entities: usize) -> PtaMode {
        match self.mode {
            PtaMode::Auto if entities < self.auto_threshold => PtaMode::Precise,
            PtaMode::Auto => PtaMode::Fast,
            mode => mode,
        }
    }

    /// Get preset configuration
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                mode: PtaMode::Fast,
                enable_cycle_detection: false,
                worklist: WorklistPolicy::Fifo,
                difference_propagation: true,
                max_entities: None,
                auto_threshold: 5_000,
                dump_dot: false,
            },
            Preset::Balanced => Self {
                mode: PtaMode::Auto,
                enable_cycle_detection: true,
                worklist: WorklistPolicy::Fifo,
                difference_propagation: true,
                max_entities: None,
                auto_threshold: 100_000,
                dump_dot: false,
            },
            Preset::Thorough => Self {
                mode: PtaMode::Precise,
                enable_cycle_detection: true,
                worklist: WorklistPolicy::Fifo,
                difference_propagation: true,
                max_entities: None,
                auto_threshold: 100_000,
                dump_dot: false,
            },
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

// ============================================================================
// Memory State Encoder Configuration
// ============================================================================

/// Channel assignment policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPolicyKind {
    /// Every memory node shares channel 0
    Single,
    /// One channel per memory node
    PerObject,
    /// One channel per memory node, folded modulo `max_channels`
    Bounded,
}

/// Memory state encoder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub policy: ChannelPolicyKind,

    /// Channel cap for [`ChannelPolicyKind::Bounded`]
    pub max_channels: usize,
}

impl EncoderConfig {
    pub const MAX_CHANNELS_LIMIT: usize = 65_536;

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_channels == 0 || self.max_channels > Self::MAX_CHANNELS_LIMIT {
            return Err(ConfigError::range_with_hint(
                "max_channels",
                self.max_channels,
                1,
                Self::MAX_CHANNELS_LIMIT,
                "Use policy 'single' for one channel or 'per_object' for no cap",
            ));
        }
        Ok(())
    }

    /// Builder: Set policy
    pub fn policy(mut self, v: ChannelPolicyKind) -> Self {
        self.policy = v;
        self
    }

    /// Builder: Set max_channels
    pub fn max_channels(mut self, v: usize) -> Self {
        self.max_channels = v;
        self
    }

    /// Get preset configuration
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                policy: ChannelPolicyKind::Bounded,
                max_channels: 8,
            },
            Preset::Balanced => Self {
                policy: ChannelPolicyKind::Bounded,
                max_channels: 64,
            },
            Preset::Thorough => Self {
                policy: ChannelPolicyKind::PerObject,
                max_channels: Self::MAX_CHANNELS_LIMIT,
            },
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

// ============================================================================
// Validatable implementations
// ============================================================================

impl Validatable for AnalysisConfig {
    fn validate(&self) -> ConfigResult<()> {
        AnalysisConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "AnalysisConfig"
    }
}

impl Validatable for EncoderConfig {
    fn validate(&self) -> ConfigResult<()> {
        EncoderConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "EncoderConfig"
    }
}
