//! Pipeline configuration files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::ReferenceSpectrum;
use crate::error::{invalid, ProcessResult};
use crate::pipeline::baseline::BaselineParams;
use crate::pipeline::ops::ProcessingOp;
use crate::pipeline::smoothing::Smoother;
use crate::pipeline::spikes::SpikeParams;

/// An ordered operation list plus where and how to write results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ops: Vec<ProcessingOp>,
    /// Two-column reference water spectrum; required by water normalization
    pub reference: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Appended to output file names
    pub tag: Option<String>,
    /// Write the reproducibility log next to each output
    pub save_log: bool,
    /// Write decomposition components as text tables
    pub export_components: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ops: vec![
                ProcessingOp::RemoveSpikes(SpikeParams::default()),
                ProcessingOp::RemoveBackground(BaselineParams::default()),
                ProcessingOp::Smooth(Smoother::SavitzkyGolay {
                    window: 9,
                    order: 3,
                }),
            ],
            reference: None,
            output_dir: PathBuf::from("processed"),
            tag: None,
            save_log: true,
            export_components: true,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> ProcessResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        log::info!(
            "Loaded pipeline config {} ({} operations)",
            path.display(),
            config.ops.len()
        );
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> ProcessResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> ProcessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations that cannot run on any input.
    pub fn validate(&self) -> ProcessResult<()> {
        if self.reference.is_none() {
            if let Some(op) = self.ops.iter().find(|op| op.needs_reference()) {
                return invalid(format!(
                    "'{}' needs a reference spectrum but `reference` is not set",
                    op
                ));
            }
        }
        Ok(())
    }

    /// Load the configured reference spectrum, if any.
    pub fn reference_spectrum(&self) -> ProcessResult<Option<ReferenceSpectrum>> {
        self.reference
            .as_deref()
            .map(ReferenceSpectrum::load)
            .transpose()
    }
}
