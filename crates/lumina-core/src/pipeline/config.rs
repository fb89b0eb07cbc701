use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_REFRESH_RATE;
use crate::display::geometry::Transform;
use crate::display::scaling::ScalingKind;
use crate::display::stats::StatsRequest;
use crate::filters::FilterStep;
use crate::frame::FloatType;
use crate::prepare::channel::{ChannelMode, DEFAULT_RGB};
use crate::window::{RangeWindow, Reduction};

use super::types::ConfigAdjustment;

/// Read-only configuration snapshot consumed by one pipeline tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Type of every result that may carry NaN values.
    pub float_type: FloatType,
    /// Apply the user filter chain.
    pub filters_enabled: bool,
    /// Stop acquisition when a source reports an error.
    pub interrupt_on_error: bool,
    /// Source polling period in seconds.
    pub refresh_rate: f64,
    pub range: RangeConfig,
    pub channels: ChannelConfig,
    pub background: BackgroundConfig,
    pub mask: MaskConfig,
    pub display: DisplayConfig,
    pub stats: StatsConfig,
    /// Built-in filter chain, run when `filters_enabled` is set.
    pub filters: Vec<FilterStep>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            float_type: FloatType::default(),
            filters_enabled: false,
            interrupt_on_error: true,
            refresh_rate: DEFAULT_REFRESH_RATE,
            range: RangeConfig::default(),
            channels: ChannelConfig::default(),
            background: BackgroundConfig::default(),
            mask: MaskConfig::default(),
            display: DisplayConfig::default(),
            stats: StatsConfig::default(),
            filters: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Next snapshot with the adjustments of a tick folded in.
    pub fn adjusted(&self, adjustments: &[ConfigAdjustment]) -> Self {
        let mut next = self.clone();
        for adjustment in adjustments {
            match *adjustment {
                ConfigAdjustment::ResetChannel => next.channels.mode = ChannelMode::SumAll,
                ConfigAdjustment::DisableBackground => next.background.apply = false,
                ConfigAdjustment::DisableMask => next.mask.apply = false,
                ConfigAdjustment::SetDownsampleFactor(factor) => next.range.factor = factor,
                ConfigAdjustment::DisableFilters => next.filters_enabled = false,
            }
        }
        next
    }

    /// Canvas for multi-source merges is NaN-filled under the NaN mask policy.
    pub fn nan_fill(&self) -> bool {
        self.mask.nan_mask
    }
}

/// Range window and downsampling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    pub enabled: bool,
    pub factor: usize,
    pub reduction: Reduction,
    pub window: RangeWindow,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            factor: 1,
            reduction: Reduction::default(),
            window: RangeWindow::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub mode: ChannelMode,
    /// Channel indices of the red, green and blue planes; `-1` is a zero plane.
    pub rgb: [i32; 3],
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            mode: ChannelMode::default(),
            rgb: DEFAULT_RGB,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub apply: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    pub apply: bool,
    /// Mask the zero pixels of the mask image instead of the non-zero ones.
    pub zero_mask: bool,
    /// Write NaN into masked pixels instead of zero.
    pub nan_mask: bool,
    /// Mask every pixel above this value.
    pub high_value: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub scaling: ScalingKind,
    pub transform: Transform,
    /// Report transforms as renderer flags instead of moving pixels.
    pub keep_coords: bool,
    /// Cast unscaled frames to the float type for renderers without integer support.
    pub legacy_float_cast: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Compute max/mean/variance before intensity scaling.
    pub without_scaling: bool,
    /// Statistics display is shown.
    pub display: bool,
    pub calc_variance: bool,
    /// Telemetry stream is active.
    pub stream: bool,
    pub auto_levels: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            without_scaling: true,
            display: true,
            calc_variance: false,
            stream: false,
            auto_levels: true,
        }
    }
}

impl StatsConfig {
    /// Reductions the configured consumers need.
    pub fn request(&self) -> StatsRequest {
        StatsRequest::for_consumers(self.stream, self.display, self.calc_variance, self.auto_levels)
    }
}
