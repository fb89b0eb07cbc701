use ndarray::{ArrayD, Axis, IxDyn, Zip};

use crate::error::{LuminaError, Result};
use crate::frame::{map_frame, with_frame, FloatType, Frame, Pixel};

/// Value written into masked pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskFill {
    /// Zero in the frame's own type.
    Zero,
    /// NaN, after casting the frame to the given float type.
    Nan(FloatType),
}

impl MaskFill {
    pub fn new(nan_mask: bool, float_type: FloatType) -> Self {
        if nan_mask {
            Self::Nan(float_type)
        } else {
            Self::Zero
        }
    }

    fn prepare(self, frame: &Frame) -> Frame {
        match self {
            Self::Zero => frame.clone(),
            Self::Nan(float) => frame.cast(float.dtype()),
        }
    }
}

/// Mask image together with the pixel selection derived from it.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskFrame {
    image: Frame,
    indices: ArrayD<bool>,
    zero_mask: bool,
}

impl MaskFrame {
    /// Masked pixels are the zero pixels of `image` with `zero_mask`, the
    /// non-zero ones otherwise.
    pub fn new(image: Frame, zero_mask: bool) -> Self {
        let indices = select(&image, zero_mask);
        Self {
            image,
            indices,
            zero_mask,
        }
    }

    /// Change the interpretation of the mask image and recompute the selection.
    pub fn remask(&mut self, zero_mask: bool) {
        if zero_mask != self.zero_mask {
            self.zero_mask = zero_mask;
            self.indices = select(&self.image, zero_mask);
        }
    }

    pub fn image(&self) -> &Frame {
        &self.image
    }

    pub fn indices(&self) -> &ArrayD<bool> {
        &self.indices
    }

    pub fn zero_mask(&self) -> bool {
        self.zero_mask
    }
}

fn select(image: &Frame, zero_mask: bool) -> ArrayD<bool> {
    with_frame!(image, a => a.mapv(|v| (v.as_f64() == 0.0) == zero_mask))
}

/// Write the fill value into every pixel selected by `indices`.
///
/// `indices` must have the frame's shape, or the shape of the two leading
/// axes of an `(x, y, 3)` frame, in which case all planes are masked. On a
/// mismatch the frame is left untouched and an error is returned.
pub fn apply_mask(frame: &Frame, indices: &ArrayD<bool>, fill: MaskFill) -> Result<Frame> {
    let shape = frame.shape();
    let selection = if indices.shape() == shape {
        indices.view()
    } else if shape.len() == 3 && indices.ndim() == 2 && indices.shape() == &shape[..2] {
        indices.view().insert_axis(Axis(2))
    } else {
        return Err(LuminaError::ShapeMismatch {
            expected: shape.to_vec(),
            found: indices.shape().to_vec(),
        });
    };
    let selection = selection
        .broadcast(IxDyn(shape))
        .ok_or_else(|| LuminaError::ShapeMismatch {
            expected: shape.to_vec(),
            found: indices.shape().to_vec(),
        })?;

    Ok(map_frame!(fill.prepare(frame), a => {
        let mut a = a;
        Zip::from(&mut a).and(&selection).for_each(|v, &masked| {
            if masked {
                *v = fill_value(fill);
            }
        });
        a
    }))
}

/// Write the fill value wherever the frame exceeds `threshold`.
pub fn apply_high_value_mask(frame: &Frame, threshold: f64, fill: MaskFill) -> Result<Frame> {
    Ok(map_frame!(fill.prepare(frame), a => {
        let mut a = a;
        a.mapv_inplace(|v| if v.as_f64() > threshold { fill_value(fill) } else { v });
        a
    }))
}

fn fill_value<T: Pixel>(fill: MaskFill) -> T {
    match fill {
        MaskFill::Zero => T::zero(),
        MaskFill::Nan(_) => f64::NAN.cast::<T>(),
    }
}
