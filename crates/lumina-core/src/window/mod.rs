mod crop;
mod downsample;

use serde::{Deserialize, Serialize};

use crate::display::geometry::Transform;

pub use crop::crop;
pub use downsample::{downsample, Downsampled, Reduction};

/// Rectangular sub-window of a frame. Absent bounds are open on that side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeWindow {
    pub x1: Option<usize>,
    pub y1: Option<usize>,
    pub x2: Option<usize>,
    pub y2: Option<usize>,
}

impl RangeWindow {
    pub fn new(x1: Option<usize>, y1: Option<usize>, x2: Option<usize>, y2: Option<usize>) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn is_unbounded(&self) -> bool {
        self.x1.is_none() && self.y1.is_none() && self.x2.is_none() && self.y2.is_none()
    }
}

/// Origin and scale of the range-window view, for coordinate bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeReport {
    pub origin: (usize, usize),
    pub scale: (usize, usize),
}

impl Default for RangeReport {
    fn default() -> Self {
        Self {
            origin: (0, 0),
            scale: (1, 1),
        }
    }
}

impl RangeReport {
    /// Express the report in displayed axis order: transforms that swap the
    /// two leading axes also swap origin and scale components.
    pub fn oriented(self, transform: Transform) -> Self {
        if transform.swaps_axes() {
            Self {
                origin: (self.origin.1, self.origin.0),
                scale: (self.scale.1, self.scale.0),
            }
        } else {
            self
        }
    }
}
