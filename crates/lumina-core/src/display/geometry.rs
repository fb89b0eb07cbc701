use std::fmt;
use std::str::FromStr;

use ndarray::Axis;
use serde::{Deserialize, Serialize};

use crate::error::LuminaError;
use crate::frame::{map_frame, Frame};

/// Rigid display transform of the two leading frame axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transform {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "flip (up-down)")]
    FlipUpDown,
    #[serde(rename = "flip (left-right)")]
    FlipLeftRight,
    #[serde(rename = "transpose")]
    Transpose,
    #[serde(rename = "rot90 (clockwise)")]
    Rot90,
    #[serde(rename = "rot180")]
    Rot180,
    #[serde(rename = "rot270 (clockwise)")]
    Rot270,
    #[serde(rename = "rot180 + transpose")]
    Rot180Transpose,
}

impl Transform {
    pub const ALL: [Transform; 8] = [
        Transform::None,
        Transform::FlipUpDown,
        Transform::FlipLeftRight,
        Transform::Transpose,
        Transform::Rot90,
        Transform::Rot180,
        Transform::Rot270,
        Transform::Rot180Transpose,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::FlipUpDown => "flip (up-down)",
            Self::FlipLeftRight => "flip (left-right)",
            Self::Transpose => "transpose",
            Self::Rot90 => "rot90 (clockwise)",
            Self::Rot180 => "rot180",
            Self::Rot270 => "rot270 (clockwise)",
            Self::Rot180Transpose => "rot180 + transpose",
        }
    }

    /// Transforms whose displayed x/y axes are the frame's y/x axes.
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rot90 | Self::Rot270 | Self::Rot180Transpose
        )
    }

    /// Coordinate flags and the physical axis operations for this transform.
    ///
    /// Axis operations are applied in order. "flip (up-down)" reverses axis 1
    /// and "flip (left-right)" reverses axis 0, matching the axis convention
    /// of frames stored as `[x, y]`. With `keep_coords` the rotations built
    /// on a transpose still swap the axes physically; the renderer only
    /// applies the flips virtually.
    pub fn plan(self, keep_coords: bool) -> (CoordinateFlags, Vec<AxisOp>) {
        use AxisOp::{InvertX, InvertY, SwapAxes};

        let mut flags = CoordinateFlags::default();
        let ops = match self {
            Self::None => vec![],
            Self::FlipUpDown => {
                flags.org_ud_flip = true;
                if keep_coords {
                    flags.crd_ud_flip = true;
                    vec![]
                } else {
                    vec![InvertY]
                }
            }
            Self::FlipLeftRight => {
                flags.org_lr_flip = true;
                if keep_coords {
                    flags.crd_lr_flip = true;
                    vec![]
                } else {
                    vec![InvertX]
                }
            }
            Self::Transpose => {
                flags.org_transpose = true;
                if keep_coords {
                    flags.crd_transpose = true;
                    vec![]
                } else {
                    vec![SwapAxes]
                }
            }
            Self::Rot90 => {
                flags.org_transpose = true;
                flags.org_ud_flip = true;
                if keep_coords {
                    flags.crd_transpose = true;
                    flags.crd_ud_flip = true;
                    vec![SwapAxes]
                } else {
                    vec![InvertX, SwapAxes]
                }
            }
            Self::Rot180 => {
                flags.org_ud_flip = true;
                flags.org_lr_flip = true;
                if keep_coords {
                    flags.crd_ud_flip = true;
                    flags.crd_lr_flip = true;
                    vec![]
                } else {
                    vec![InvertY, InvertX]
                }
            }
            Self::Rot270 => {
                flags.org_transpose = true;
                flags.org_lr_flip = true;
                if keep_coords {
                    flags.crd_transpose = true;
                    flags.crd_lr_flip = true;
                    vec![SwapAxes]
                } else {
                    vec![InvertY, SwapAxes]
                }
            }
            Self::Rot180Transpose => {
                flags.org_transpose = true;
                flags.org_ud_flip = true;
                flags.org_lr_flip = true;
                if keep_coords {
                    flags.crd_transpose = true;
                    flags.crd_ud_flip = true;
                    flags.crd_lr_flip = true;
                    vec![SwapAxes]
                } else {
                    vec![InvertX, InvertY, SwapAxes]
                }
            }
        };
        (flags, ops)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transform {
    type Err = LuminaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Transform::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s.trim())
            .ok_or_else(|| LuminaError::InvalidConfig(format!("unknown transformation '{s}'")))
    }
}

/// Physical array operation on the two leading axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisOp {
    /// Reverse axis 0.
    InvertX,
    /// Reverse axis 1.
    InvertY,
    /// Swap axes 0 and 1.
    SwapAxes,
}

/// Transform flags handed to the renderer.
///
/// `crd_*` flags ask the renderer to apply the operation virtually; `org_*`
/// flags describe the transform relative to the original detector layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoordinateFlags {
    pub crd_transpose: bool,
    pub crd_lr_flip: bool,
    pub crd_ud_flip: bool,
    pub org_transpose: bool,
    pub org_lr_flip: bool,
    pub org_ud_flip: bool,
}

impl CoordinateFlags {
    pub fn as_array(&self) -> [bool; 6] {
        [
            self.crd_transpose,
            self.crd_lr_flip,
            self.crd_ud_flip,
            self.org_transpose,
            self.org_lr_flip,
            self.org_ud_flip,
        ]
    }
}

/// Apply `transform` to a display frame.
///
/// Frames with fewer than two axes are returned unchanged. The result is laid
/// out contiguously.
pub fn apply_transform(frame: Frame, transform: Transform, keep_coords: bool) -> (Frame, CoordinateFlags) {
    let (flags, ops) = transform.plan(keep_coords);
    if ops.is_empty() || frame.ndim() < 2 {
        return (frame, flags);
    }
    let transformed = map_frame!(frame, a => {
        let mut a = a;
        for op in &ops {
            match op {
                AxisOp::InvertX => a.invert_axis(Axis(0)),
                AxisOp::InvertY => a.invert_axis(Axis(1)),
                AxisOp::SwapAxes => a.swap_axes(0, 1),
            }
        }
        a
    });
    (transformed.into_standard_layout(), flags)
}
