pub mod config;
pub mod info;
pub mod replay;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use lumina_core::filters::FrameFilter;
use lumina_core::io::load_frame;
use lumina_core::pipeline::config::PipelineConfig;
use lumina_core::pipeline::LiveProcessor;

/// Options shared by the commands that drive the live pipeline.
#[derive(Args)]
pub struct PipelineArgs {
    /// TOML pipeline config (defaults when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Mask image; pixels selected by the zero-mask rule are blanked
    #[arg(long)]
    pub mask: Option<PathBuf>,

    /// Background image subtracted from every frame
    #[arg(long)]
    pub background: Option<PathBuf>,
}

impl PipelineArgs {
    pub fn load_config(&self) -> Result<PipelineConfig> {
        let Some(path) = &self.config else {
            return Ok(PipelineConfig::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).context("Invalid pipeline config")
    }

    /// A processor with the configured filters and the mask and background
    /// images loaded.
    pub fn processor(&self, config: &PipelineConfig) -> Result<LiveProcessor> {
        let mut processor = LiveProcessor::new();
        let filters = config
            .filters
            .iter()
            .cloned()
            .map(|step| Box::new(step) as Box<dyn FrameFilter>)
            .collect();
        processor.set_filters(filters);
        if let Some(path) = &self.mask {
            processor.set_mask_image(Some(load_image(path)?), config.mask.zero_mask);
        }
        if let Some(path) = &self.background {
            processor.set_background(Some(load_image(path)?));
        }
        Ok(processor)
    }
}

fn load_image(path: &Path) -> Result<lumina_core::frame::Frame> {
    load_frame(path).with_context(|| format!("Failed to load {}", path.display()))
}
