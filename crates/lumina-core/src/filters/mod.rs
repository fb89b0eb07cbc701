//! User filters applied to the raw frame after the range window.

pub mod clip;
pub mod gaussian_blur;

use std::fmt;

use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LuminaError, Result};
use crate::frame::{ranked, Frame, Ranked};

use self::clip::clip;
use self::gaussian_blur::gaussian_blur_array;

/// What a filter hands back for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterOutput {
    /// Replacement frame; `None` keeps the input.
    pub frame: Option<Frame>,
    /// Entries merged into the frame metadata.
    pub metadata: Option<Map<String, Value>>,
}

impl FilterOutput {
    pub fn frame(frame: Frame) -> Self {
        Self {
            frame: Some(frame),
            metadata: None,
        }
    }
}

/// A stage of the user filter chain.
///
/// Filters run on the coordinating thread once per tick, in chain order.
/// `initialize` runs when the chain is switched on and `terminate` when it is
/// switched off.
pub trait FrameFilter: Send {
    fn name(&self) -> &str;

    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn apply(&mut self, frame: &Frame, image_name: Option<&str>, metadata: Option<&str>) -> Result<FilterOutput>;

    fn terminate(&mut self) {}
}

/// Built-in filters selectable from the configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterStep {
    GaussianBlur { sigma: f64 },
    Clip { low: Option<f64>, high: Option<f64> },
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GaussianBlur { sigma } => write!(f, "Gaussian Blur (sigma={sigma})"),
            Self::Clip { low, high } => {
                let bound = |b: &Option<f64>| b.map_or_else(|| "-".to_string(), |v| v.to_string());
                write!(f, "Clip [{}, {}]", bound(low), bound(high))
            }
        }
    }
}

/// Apply one built-in filter step.
pub fn apply_filter_step(frame: &Frame, step: &FilterStep) -> Result<Frame> {
    match step {
        FilterStep::GaussianBlur { sigma } => blur(frame, *sigma),
        FilterStep::Clip { low, high } => Ok(clip(frame, *low, *high)),
    }
}

/// Blur images, or every plane of a channel-first stack, in `float64`.
fn blur(frame: &Frame, sigma: f64) -> Result<Frame> {
    let data = frame.to_f64();
    match ranked(&data)? {
        Ranked::Vector(_) => Err(LuminaError::Filter(
            "Gaussian blur needs an image or a channel stack".into(),
        )),
        Ranked::Image(img) => Ok(Frame::from_array(gaussian_blur_array(img, sigma).into_dyn())),
        Ranked::Stack(stack) => {
            let mut out = Array3::<f64>::zeros(stack.dim());
            for (src, mut dst) in stack.outer_iter().zip(out.axis_iter_mut(Axis(0))) {
                dst.assign(&gaussian_blur_array(src, sigma));
            }
            Ok(Frame::from_array(out.into_dyn()))
        }
    }
}

impl FrameFilter for FilterStep {
    fn name(&self) -> &str {
        match self {
            Self::GaussianBlur { .. } => "gaussian_blur",
            Self::Clip { .. } => "clip",
        }
    }

    fn apply(&mut self, frame: &Frame, _image_name: Option<&str>, _metadata: Option<&str>) -> Result<FilterOutput> {
        apply_filter_step(frame, self).map(FilterOutput::frame)
    }
}
