use std::fmt;
use std::str::FromStr;

use ndarray::{s, Array3, ArrayD, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LuminaError;
use crate::frame::{ranked, with_frame, Frame, Pixel, Ranked};

/// Block reduction used when downsampling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    #[default]
    Mean,
    Sum,
    Max,
    Min,
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Sum => write!(f, "sum"),
            Self::Max => write!(f, "max"),
            Self::Min => write!(f, "min"),
        }
    }
}

impl FromStr for Reduction {
    type Err = LuminaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mean" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            other => Err(LuminaError::InvalidConfig(format!(
                "unknown reduction function '{other}'"
            ))),
        }
    }
}

/// Result of [`downsample`].
#[derive(Clone, Debug, PartialEq)]
pub struct Downsampled {
    pub frame: Frame,
    /// Factor actually applied along (x, y); `(1, 1)` when nothing was reduced.
    pub scale: (usize, usize),
    /// Factor the caller should adopt because the requested one did not fit.
    pub adjusted_factor: Option<usize>,
}

/// Whether `factor`-sized blocks tile an axis of length `len` usefully.
///
/// Zero blocks never fit. A single block that leaves a remainder would crop
/// the frame down to one partial corner, so it is rejected as well.
fn blocks_fit(len: usize, factor: usize) -> bool {
    match len / factor {
        0 => false,
        1 => len % factor == 0,
        _ => true,
    }
}

/// Reduce the two spatial axes by `factor` with a blockwise `reduction`.
///
/// Works on images and channel-first stacks; the trailing remainder of each
/// axis is dropped. When the blocks do not fit, the frame is returned as is
/// and the largest factor that fits is reported back.
pub fn downsample(frame: Frame, factor: usize, reduction: Reduction) -> Downsampled {
    let shape = frame.shape().to_vec();
    if shape.len() < 2 || factor <= 1 {
        return Downsampled {
            frame,
            scale: (1, 1),
            adjusted_factor: None,
        };
    }
    let (nx, ny) = (shape[shape.len() - 2], shape[shape.len() - 1]);
    if !blocks_fit(nx, factor) || !blocks_fit(ny, factor) {
        let adjusted = nx.min(ny).max(1);
        debug!(factor, adjusted, shape = ?shape, "Downsampling factor does not fit frame");
        return Downsampled {
            frame,
            scale: (1, 1),
            adjusted_factor: Some(adjusted),
        };
    }
    if shape.len() > 3 {
        return Downsampled {
            frame,
            scale: (1, 1),
            adjusted_factor: None,
        };
    }

    let reduced = with_frame!(&frame, a => reduce_frame(a, factor, reduction));
    Downsampled {
        frame: reduced,
        scale: (factor, factor),
        adjusted_factor: None,
    }
}

fn reduce_frame<T: Pixel>(a: &ArrayD<T>, f: usize, reduction: Reduction) -> Frame {
    let (stack, image): (ArrayView3<T>, bool) = match ranked(a) {
        Ok(Ranked::Image(img)) => (img.insert_axis(Axis(0)), true),
        Ok(Ranked::Stack(stack)) => (stack, false),
        _ => return T::into_frame(a.clone()),
    };
    let (c, nx, ny) = stack.dim();
    let dim = (c, nx / f, ny / f);
    let block = |k: usize, i: usize, j: usize| stack.slice(s![k, i * f..(i + 1) * f, j * f..(j + 1) * f]);

    match reduction {
        Reduction::Mean => finish(
            Array3::from_shape_fn(dim, |(k, i, j)| block_mean(block(k, i, j))),
            image,
        ),
        Reduction::Max => finish(
            Array3::from_shape_fn(dim, |(k, i, j)| block_extreme(block(k, i, j), true)),
            image,
        ),
        Reduction::Min => finish(
            Array3::from_shape_fn(dim, |(k, i, j)| block_extreme(block(k, i, j), false)),
            image,
        ),
        // Integer sums accumulate in 64 bits like NumPy's default accumulator.
        Reduction::Sum if T::DTYPE.is_unsigned() => finish(
            Array3::from_shape_fn(dim, |(k, i, j)| {
                block(k, i, j)
                    .iter()
                    .fold(0u64, |acc, v| acc.wrapping_add(v.cast::<u64>()))
            }),
            image,
        ),
        Reduction::Sum if T::DTYPE.is_signed() => finish(
            Array3::from_shape_fn(dim, |(k, i, j)| {
                block(k, i, j)
                    .iter()
                    .fold(0i64, |acc, v| acc.wrapping_add(v.cast::<i64>()))
            }),
            image,
        ),
        Reduction::Sum => finish(
            Array3::from_shape_fn(dim, |(k, i, j)| {
                block(k, i, j).iter().map(|v| v.as_f64()).sum::<f64>().cast::<T>()
            }),
            image,
        ),
    }
}

fn finish<U: Pixel>(out: Array3<U>, image: bool) -> Frame {
    if image {
        Frame::from_array(out.index_axis_move(Axis(0), 0).into_dyn())
    } else {
        Frame::from_array(out.into_dyn())
    }
}

fn block_mean<T: Pixel>(block: ArrayView2<T>) -> f64 {
    let n = block.len();
    if n == 0 {
        return f64::NAN;
    }
    block.iter().map(|v| v.as_f64()).sum::<f64>() / n as f64
}

/// Block maximum or minimum; NaN propagates like NumPy's `max`/`min`.
fn block_extreme<T: Pixel>(block: ArrayView2<T>, max: bool) -> T {
    let mut values = block.iter().copied();
    let Some(first) = values.next() else {
        return T::zero();
    };
    values.fold(first, |acc, v| {
        if acc.is_nan() {
            acc
        } else if v.is_nan() || (max && v > acc) || (!max && v < acc) {
            v
        } else {
            acc
        }
    })
}
