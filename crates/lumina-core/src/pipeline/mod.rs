pub mod config;
mod processor;
mod types;

pub use processor::LiveProcessor;
pub use types::{ConfigAdjustment, IngestOutcome, PipelineStage, PipelineWarning, ProcessedFrame};
