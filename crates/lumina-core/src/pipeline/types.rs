use std::fmt;

use serde_json::Value;

use crate::display::geometry::CoordinateFlags;
use crate::display::stats::Statistics;
use crate::frame::Frame;
use crate::window::RangeReport;

/// Pipeline stage, used to attribute warnings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Merging,
    Filtering,
    RangeWindow,
    Downsampling,
    ChannelComposition,
    BackgroundSubtraction,
    Masking,
    HighValueMasking,
    Transforming,
    Scaling,
    Statistics,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merging => write!(f, "Merging partial frames"),
            Self::Filtering => write!(f, "Applying filters"),
            Self::RangeWindow => write!(f, "Cropping to range window"),
            Self::Downsampling => write!(f, "Downsampling"),
            Self::ChannelComposition => write!(f, "Composing channels"),
            Self::BackgroundSubtraction => write!(f, "Subtracting background"),
            Self::Masking => write!(f, "Masking"),
            Self::HighValueMasking => write!(f, "Masking high values"),
            Self::Transforming => write!(f, "Transforming"),
            Self::Scaling => write!(f, "Scaling"),
            Self::Statistics => write!(f, "Computing statistics"),
        }
    }
}

/// Recoverable problem hit during a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineWarning {
    pub stage: PipelineStage,
    pub message: String,
}

impl PipelineWarning {
    pub fn new(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}

/// Configuration change requested by a tick, folded into the next snapshot
/// with [`PipelineConfig::adjusted`](super::config::PipelineConfig::adjusted).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigAdjustment {
    /// Selected channel does not exist; go back to summing all channels.
    ResetChannel,
    DisableBackground,
    DisableMask,
    /// Requested downsampling factor does not fit the frame.
    SetDownsampleFactor(usize),
    DisableFilters,
}

/// Everything one tick produces for the display layer.
#[derive(Clone, Debug, Default)]
pub struct ProcessedFrame {
    /// Frame after transform and intensity scaling.
    pub display: Option<Frame>,
    /// Frame after masking and transform, before intensity scaling.
    pub raw_display: Option<Frame>,
    /// Frame right after channel composition.
    pub raw_grey: Option<Frame>,
    /// `display` is a pseudo-RGB frame.
    pub rgb: bool,
    pub flags: CoordinateFlags,
    /// Range-window origin and scale in displayed axis order.
    pub range: RangeReport,
    pub statistics: Statistics,
    /// Channel labels published in the frame metadata.
    pub channel_labels: Option<Value>,
    pub warnings: Vec<PipelineWarning>,
    pub adjustments: Vec<ConfigAdjustment>,
}

/// What ingesting a merged frame changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Nothing new arrived; the display keeps its frame.
    Unchanged,
    /// New data or metadata is stored and should be processed.
    Updated,
    /// A source reported an error. With `interrupt` acquisition should stop.
    Error { message: String, interrupt: bool },
}
