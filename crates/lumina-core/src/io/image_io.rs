use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};
use ndarray::{Array3, ArrayD, Axis};
use tracing::debug;

use crate::consts::RGB_PLANES;
use crate::error::{LuminaError, Result};
use crate::frame::{ranked, with_frame, Frame, Pixel, Ranked};

/// Load an image file into a frame in `[x, y]` axis order.
///
/// Grey images keep their 8- or 16-bit type. Colour images become
/// channel-first `(3, x, y)` stacks; alpha is dropped.
pub fn load_frame(path: &Path) -> Result<Frame> {
    let img = image::open(path)?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    let frame = match img {
        DynamicImage::ImageLuma8(buf) => planes(buf.into_raw(), w, h, 1)?,
        DynamicImage::ImageLuma16(buf) => planes(buf.into_raw(), w, h, 1)?,
        DynamicImage::ImageLumaA8(_) => planes(img.to_luma8().into_raw(), w, h, 1)?,
        DynamicImage::ImageRgb8(buf) => planes(buf.into_raw(), w, h, RGB_PLANES)?,
        DynamicImage::ImageRgba8(_) => planes(img.to_rgb8().into_raw(), w, h, RGB_PLANES)?,
        DynamicImage::ImageRgb16(buf) => planes(buf.into_raw(), w, h, RGB_PLANES)?,
        DynamicImage::ImageRgba16(_) => planes(img.to_rgb16().into_raw(), w, h, RGB_PLANES)?,
        DynamicImage::ImageRgb32F(buf) => planes(buf.into_raw(), w, h, RGB_PLANES)?,
        DynamicImage::ImageRgba32F(_) => planes(img.to_rgb32f().into_raw(), w, h, RGB_PLANES)?,
        _ => planes(img.to_luma16().into_raw(), w, h, 1)?,
    };
    debug!(path = %path.display(), shape = ?frame.shape(), dtype = %frame.dtype(), "Loaded image");
    Ok(frame)
}

/// Turn row-major interleaved samples into a transposed frame.
fn planes<T: Pixel>(raw: Vec<T>, w: usize, h: usize, channels: usize) -> Result<Frame> {
    let found = raw.len();
    let interleaved = Array3::from_shape_vec((h, w, channels), raw).map_err(|_| LuminaError::ShapeMismatch {
        expected: vec![h, w, channels],
        found: vec![found],
    })?;
    // (y, x, c) -> (c, x, y)
    let stack = interleaved.permuted_axes([2, 1, 0]);
    let data: ArrayD<T> = if channels == 1 {
        stack.index_axis_move(Axis(0), 0).as_standard_layout().into_owned().into_dyn()
    } else {
        stack.as_standard_layout().into_owned().into_dyn()
    };
    Ok(T::into_frame(data))
}

/// Save a grey `[x, y]` or pseudo-RGB `(x, y, 3)` frame, choosing the
/// format from the file extension: 16-bit TIFF (the default) or 8-bit PNG.
///
/// `levels` maps to black and full white; NaN pixels are written black.
pub fn save_frame(frame: &Frame, levels: (f64, f64), path: &Path) -> Result<()> {
    let deep = !matches!(path.extension().and_then(|e| e.to_str()), Some("png"));
    let full = if deep { u16::MAX as f64 } else { u8::MAX as f64 };
    let (lo, hi) = levels;
    let span = if (hi - lo).abs() > f64::EPSILON { hi - lo } else { 1.0 };
    let level = |v: f64| {
        if v.is_nan() {
            0.0
        } else {
            ((v - lo) / span).clamp(0.0, 1.0) * full
        }
    };

    let (w, h, channels, samples) = with_frame!(frame, a => interleave(a, &level)?);
    let (w, h) = (w as u32, h as u32);
    let size_error = || LuminaError::ShapeMismatch {
        expected: frame.shape().to_vec(),
        found: vec![h as usize, w as usize, channels],
    };

    match (deep, channels) {
        (true, 1) => {
            let px: Vec<u16> = samples.iter().map(|&v| v.round() as u16).collect();
            let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w, h, px).ok_or_else(size_error)?;
            img.save_with_format(path, ImageFormat::Tiff)?;
        }
        (true, _) => {
            let px: Vec<u16> = samples.iter().map(|&v| v.round() as u16).collect();
            let img = ImageBuffer::<Rgb<u16>, Vec<u16>>::from_raw(w, h, px).ok_or_else(size_error)?;
            img.save_with_format(path, ImageFormat::Tiff)?;
        }
        (false, 1) => {
            let px: Vec<u8> = samples.iter().map(|&v| v.round() as u8).collect();
            let img = ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(w, h, px).ok_or_else(size_error)?;
            img.save_with_format(path, ImageFormat::Png)?;
        }
        (false, _) => {
            let px: Vec<u8> = samples.iter().map(|&v| v.round() as u8).collect();
            let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(w, h, px).ok_or_else(size_error)?;
            img.save_with_format(path, ImageFormat::Png)?;
        }
    }
    debug!(path = %path.display(), deep, "Saved frame");
    Ok(())
}

/// Row-major `(y, x, c)` samples of a frame, passed through `level`.
fn interleave<T: Pixel>(a: &ArrayD<T>, level: &impl Fn(f64) -> f64) -> Result<(usize, usize, usize, Vec<f64>)> {
    match ranked(a)? {
        Ranked::Image(img) => {
            let (w, h) = img.dim();
            let samples = img.t().iter().map(|&v| level(v.as_f64())).collect();
            Ok((w, h, 1, samples))
        }
        Ranked::Stack(stack) if stack.len_of(Axis(2)) == RGB_PLANES => {
            let (w, h, c) = stack.dim();
            let samples = stack
                .permuted_axes([1, 0, 2])
                .iter()
                .map(|&v| level(v.as_f64()))
                .collect();
            Ok((w, h, c, samples))
        }
        _ => Err(LuminaError::UnsupportedRank(a.ndim())),
    }
}
