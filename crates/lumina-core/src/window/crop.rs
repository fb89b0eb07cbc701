use ndarray::{ArrayD, Slice};
use tracing::debug;

use crate::frame::{with_frame, Frame, Pixel};

use super::RangeWindow;

/// Crop a frame to `window`.
///
/// One-dimensional frames are cut along x, images along x and y, and
/// channel-first stacks along their two trailing axes. An empty result is
/// rejected: the input is returned untouched with origin `(0, 0)`.
pub fn crop(frame: Frame, window: &RangeWindow) -> (Frame, (usize, usize)) {
    let cropped = with_frame!(&frame, a => crop_array(a, window));
    match cropped {
        Some(cropped) if !cropped.is_empty() => {
            let origin = (window.x1.unwrap_or(0), window.y1.unwrap_or(0));
            (cropped, origin)
        }
        _ => {
            debug!(window = ?window, shape = ?frame.shape(), "Ignoring empty range window");
            (frame, (0, 0))
        }
    }
}

/// Python-style slice bounds clamped to the axis length.
fn bounds(start: Option<usize>, end: Option<usize>, len: usize) -> Slice {
    let start = start.unwrap_or(0).min(len);
    let end = end.unwrap_or(len).min(len).max(start);
    Slice::from(start..end)
}

fn crop_array<T: Pixel>(a: &ArrayD<T>, w: &RangeWindow) -> Option<Frame> {
    let view = match a.ndim() {
        1 if a.shape()[0] > 0 => a.slice_each_axis(|ax| bounds(w.x1, w.x2, ax.len)),
        2 => a.slice_each_axis(|ax| match ax.axis.index() {
            0 => bounds(w.x1, w.x2, ax.len),
            _ => bounds(w.y1, w.y2, ax.len),
        }),
        3 => a.slice_each_axis(|ax| match ax.axis.index() {
            0 => Slice::from(..),
            1 => bounds(w.x1, w.x2, ax.len),
            _ => bounds(w.y1, w.y2, ax.len),
        }),
        _ => return None,
    };
    Some(T::into_frame(view.to_owned()))
}
