use ndarray::{ArrayD, Zip};
use tracing::debug;

use crate::error::{LuminaError, Result};
use crate::frame::{with_frame_pair, Frame, Pixel};

/// Subtract a stored background from a frame.
///
/// When both frames are unsigned, both are first widened to the signed type
/// one size class above the wider of the two (`uint8` to `int16`, ...,
/// `uint64` to `int64`), so negative differences survive. Other pairs are
/// promoted to a common type. Shapes must match exactly.
pub fn subtract_background(frame: &Frame, background: &Frame) -> Result<Frame> {
    if frame.shape() != background.shape() {
        return Err(LuminaError::ShapeMismatch {
            expected: frame.shape().to_vec(),
            found: background.shape().to_vec(),
        });
    }

    let (fd, bd) = (frame.dtype(), background.dtype());
    let promoted = fd.promote(bd);
    let target = match promoted.widened_signed() {
        Some(wide) if fd.is_unsigned() && bd.is_unsigned() => wide,
        _ => promoted,
    };
    debug!(frame = %fd, background = %bd, result = %target, "Subtracting background");

    let lhs = frame.cast(target);
    let rhs = background.cast(target);
    with_frame_pair!(&lhs, &rhs, (a, b) => Ok(difference(a, b)), _ => {
        Err(LuminaError::UnsupportedDtype(format!(
            "cannot subtract {bd} background from {fd} frame"
        )))
    })
}

fn difference<T: Pixel>(a: &ArrayD<T>, b: &ArrayD<T>) -> Frame {
    let out = Zip::from(a).and(b).map_collect(|&x, &y| x.diff(y));
    T::into_frame(out)
}
