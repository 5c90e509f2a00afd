//! End-to-end memory state encoding pass
//!
//! analysis → graph → channel policy → encoder, driven by one
//! [`MemstateConfig`].

use serde::Serialize;
use tracing::info;

use super::encoder::MemoryStateEncoder;
use crate::config::MemstateConfig;
use crate::errors::Result;
use crate::features::memory_state::domain::EncodingStats;
use crate::features::memory_state::infrastructure::channel_policies::create_policy;
use crate::features::points_to::{AnalysisStats, PointsToAnalyzer, PointsToGraph};
use crate::features::program::Program;

/// Outcome of one pass
#[derive(Debug)]
pub struct PassOutput {
    pub graph: PointsToGraph,
    pub report: PassReport,
}

/// Statistics of both stages
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub analysis: AnalysisStats,
    pub encoding: EncodingStats,
}

/// Runs the points-to analysis and encodes the program's memory state
#[derive(Debug, Clone, Default)]
pub struct MemoryStateEncodingPass {
    config: MemstateConfig,
}

impl MemoryStateEncodingPass {
    pub fn new(config: MemstateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MemstateConfig {
        &self.config
    }

    pub fn run(&self, program: &mut Program) -> Result<PassOutput> {
        self.config.validate()?;
        let encoder_config = self.config.encoder_config();

        let analysis = PointsToAnalyzer::new(self.config.analysis_config()).analyze(program)?;
        let policy = create_policy(encoder_config.policy, &analysis.graph, encoder_config.max_channels);
        let encoding = MemoryStateEncoder::new().encode(program, &analysis.graph, policy.as_ref());

        info!(config = %self.config.describe(), "memory state encoding pass finished");
        Ok(PassOutput {
            graph: analysis.graph,
            report: PassReport {
                analysis: analysis.stats,
                encoding,
            },
        })
    }
}
