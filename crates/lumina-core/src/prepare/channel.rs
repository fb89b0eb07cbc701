use std::fmt;
use std::str::FromStr;

use ndarray::{s, Array2, Array3, ArrayD, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::RGB_PLANES;
use crate::error::{LuminaError, Result};
use crate::frame::{ranked, with_frame, DType, Frame, Pixel, Ranked};

/// Channel selection for multi-channel frames.
///
/// Channel indices are 1-based. Index `C + 1` (or [`ChannelMode::Mean`])
/// averages all `C` channels; any larger index (or [`ChannelMode::Rgb`])
/// composes a pseudo-RGB frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChannelMode {
    #[default]
    SumAll,
    Index(usize),
    Mean,
    Rgb,
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SumAll => write!(f, "sum"),
            Self::Index(k) => write!(f, "{k}"),
            Self::Mean => write!(f, "mean"),
            Self::Rgb => write!(f, "rgb"),
        }
    }
}

impl FromStr for ChannelMode {
    type Err = LuminaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "sum" | "0" => Ok(Self::SumAll),
            "mean" => Ok(Self::Mean),
            "rgb" => Ok(Self::Rgb),
            other => other
                .parse::<usize>()
                .map(Self::Index)
                .map_err(|_| LuminaError::InvalidConfig(format!("unknown channel selection '{other}'"))),
        }
    }
}

impl TryFrom<String> for ChannelMode {
    type Error = LuminaError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ChannelMode> for String {
    fn from(mode: ChannelMode) -> String {
        mode.to_string()
    }
}

/// Default pseudo-RGB channel triple.
pub const DEFAULT_RGB: [i32; 3] = [0, 1, 2];

/// Output of [`compose`].
#[derive(Clone, Debug, PartialEq)]
pub struct Composed {
    pub frame: Frame,
    /// The frame is a pseudo-RGB image of shape `(x, y, 3)`.
    pub rgb: bool,
}

/// How a stack of `C` channels is reduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reduce {
    Sum,
    Select(usize),
    Mean,
    Rgb,
    Sole,
}

impl Reduce {
    fn resolve(mode: ChannelMode, channels: usize) -> Self {
        match mode {
            ChannelMode::SumAll | ChannelMode::Index(0) => Self::Sum,
            ChannelMode::Index(k) if k <= channels => Self::Select(k - 1),
            ChannelMode::Index(k) if k == channels + 1 => Self::Mean,
            ChannelMode::Mean => Self::Mean,
            _ if channels > 1 => Self::Rgb,
            _ if channels == 1 => Self::Sole,
            _ => Self::Sum,
        }
    }
}

/// Reduce a frame to a grey image or compose a pseudo-RGB image.
///
/// One-dimensional frames become a single column and images pass through.
/// Channel-first stacks are summed, averaged, selected from or composed into
/// RGB according to `mode`. With `skip_first` the sum and mean leave channel
/// 0 out. An `rgb` entry of `-1` yields a zero plane.
///
/// Fails with [`LuminaError::InvalidChannel`] when an RGB index does not
/// exist; the caller then falls back to [`ChannelMode::SumAll`].
pub fn compose(frame: &Frame, mode: ChannelMode, rgb: [i32; 3], skip_first: bool) -> Result<Composed> {
    with_frame!(frame, a => compose_array(a, mode, rgb, skip_first))
}

fn compose_array<T: Pixel>(a: &ArrayD<T>, mode: ChannelMode, rgb: [i32; 3], skip_first: bool) -> Result<Composed> {
    let grey = |frame: Frame| Composed { frame, rgb: false };
    match ranked(a)? {
        Ranked::Vector(v) => {
            let column = v.to_owned().insert_axis(Axis(1));
            Ok(grey(T::into_frame(column.into_dyn())))
        }
        Ranked::Image(_) => Ok(grey(T::into_frame(a.clone()))),
        Ranked::Stack(stack) => {
            let channels = stack.len_of(Axis(0));
            let reduce = Reduce::resolve(mode, channels);
            debug!(?reduce, channels, skip_first, "Composing channels");
            let used = if skip_first && channels > 0 {
                stack.slice_move(s![1.., .., ..])
            } else {
                stack
            };
            match reduce {
                Reduce::Sum => Ok(grey(nan_sum(used))),
                Reduce::Mean => Ok(grey(nan_mean(used))),
                Reduce::Select(k) => Ok(grey(T::into_frame(stack.index_axis(Axis(0), k).to_owned().into_dyn()))),
                Reduce::Sole => Ok(grey(T::into_frame(stack.index_axis(Axis(0), 0).to_owned().into_dyn()))),
                Reduce::Rgb => Ok(Composed {
                    frame: T::into_frame(compose_rgb(stack, rgb)?.into_dyn()),
                    rgb: true,
                }),
            }
        }
    }
}

/// Sum over the channel axis ignoring NaN. Integers accumulate in 64 bits.
fn nan_sum<T: Pixel>(stack: ArrayView3<T>) -> Frame {
    let (_, nx, ny) = stack.dim();
    let plane = |i: usize, j: usize| stack.slice(s![.., i, j]);
    if T::DTYPE.is_unsigned() {
        let out = Array2::from_shape_fn((nx, ny), |(i, j)| {
            plane(i, j).iter().fold(0u64, |acc, v| acc.wrapping_add(v.cast::<u64>()))
        });
        Frame::from_array(out.into_dyn())
    } else if T::DTYPE.is_signed() {
        let out = Array2::from_shape_fn((nx, ny), |(i, j)| {
            plane(i, j).iter().fold(0i64, |acc, v| acc.wrapping_add(v.cast::<i64>()))
        });
        Frame::from_array(out.into_dyn())
    } else {
        let out = Array2::from_shape_fn((nx, ny), |(i, j)| {
            plane(i, j)
                .iter()
                .filter(|v| !v.is_nan())
                .map(|v| v.as_f64())
                .sum::<f64>()
                .cast::<T>()
        });
        T::into_frame(out.into_dyn())
    }
}

/// Mean over the channel axis ignoring NaN; NaN where no channel has a value.
fn nan_mean<T: Pixel>(stack: ArrayView3<T>) -> Frame {
    let (_, nx, ny) = stack.dim();
    let mean = |i: usize, j: usize| {
        let (sum, n) = stack
            .slice(s![.., i, j])
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0f64, 0usize), |(sum, n), v| (sum + v.as_f64(), n + 1));
        if n == 0 {
            f64::NAN
        } else {
            sum / n as f64
        }
    };
    let out = Array2::from_shape_fn((nx, ny), |(i, j)| mean(i, j));
    match T::DTYPE {
        DType::F32 => Frame::from_array(out.mapv(|v| v as f32).into_dyn()),
        _ => Frame::from_array(out.into_dyn()),
    }
}

/// Build an `(x, y, 3)` image from a channel-first stack.
fn compose_rgb<T: Pixel>(stack: ArrayView3<T>, rgb: [i32; 3]) -> Result<Array3<T>> {
    let (channels, nx, ny) = stack.dim();
    let zeros = Array2::<T>::zeros((nx, ny));

    let planes: Vec<ArrayView2<T>> = if rgb == DEFAULT_RGB {
        // Default triple: first three channels, zero-padded when only two exist.
        let mut planes: Vec<ArrayView2<T>> = stack.outer_iter().take(RGB_PLANES).collect();
        while planes.len() < RGB_PLANES {
            planes.push(zeros.view());
        }
        planes
    } else {
        rgb.iter()
            .map(|&index| match index {
                -1 => Ok(zeros.view()),
                k if k >= 0 && (k as usize) < channels => Ok(stack.index_axis(Axis(0), k as usize)),
                k => Err(LuminaError::InvalidChannel {
                    index: k as i64,
                    channels,
                }),
            })
            .collect::<Result<_>>()?
    };

    ndarray::stack(Axis(2), &planes).map_err(|_| LuminaError::ShapeMismatch {
        expected: vec![nx, ny, RGB_PLANES],
        found: vec![channels, nx, ny],
    })
}
