use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::LOG_SCALE_FLOOR;
use crate::error::LuminaError;
use crate::frame::{FloatType, Frame};

/// Intensity scaling applied to the display frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingKind {
    #[default]
    #[serde(alias = "none")]
    Linear,
    Sqrt,
    Log,
}

impl fmt::Display for ScalingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Sqrt => write!(f, "sqrt"),
            Self::Log => write!(f, "log"),
        }
    }
}

impl FromStr for ScalingKind {
    type Err = LuminaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "linear" | "none" => Ok(Self::Linear),
            "sqrt" => Ok(Self::Sqrt),
            "log" => Ok(Self::Log),
            other => Err(LuminaError::InvalidConfig(format!(
                "unknown scaling '{other}'"
            ))),
        }
    }
}

/// Scale a display frame.
///
/// `sqrt` clips to `[0, inf)` and `log` to `[10e-3, inf)` before applying
/// the function, so every finite input maps to a finite output. Results are
/// `float32` for `float32` input and `float64` otherwise.
///
/// `legacy_cast` reproduces viewers that could only render floating-point
/// images: linear frames are then cast to that type.
pub fn scale(frame: Option<Frame>, kind: ScalingKind, legacy_cast: Option<FloatType>) -> Option<Frame> {
    let frame = frame?;
    let scaled = match kind {
        ScalingKind::Linear => match legacy_cast {
            Some(float) => frame.into_dtype(float.dtype()),
            None => frame,
        },
        ScalingKind::Sqrt => map_float(frame, |v| v.max(0.0).sqrt()),
        ScalingKind::Log => map_float(frame, |v| v.max(LOG_SCALE_FLOOR).log10()),
    };
    Some(scaled)
}

/// NaN inputs stay NaN so masked pixels remain masked after clipping.
fn map_float(frame: Frame, f: impl Fn(f64) -> f64) -> Frame {
    let apply = |v: f64| if v.is_nan() { v } else { f(v) };
    match frame {
        Frame::F32(a) => Frame::F32(a.mapv(|v| apply(v as f64) as f32)),
        Frame::F64(a) => Frame::F64(a.mapv(apply)),
        other => Frame::F64(other.to_f64().mapv(apply)),
    }
}
