#![allow(dead_code)]

use ndarray::{Array2, Array3, ArrayD, Ix2, Ix3};

use lumina_core::frame::{Frame, Pixel};

/// Image in `[x, y]` order with `f(x, y)` at every pixel.
pub fn image<T: Pixel>(nx: usize, ny: usize, f: impl Fn(usize, usize) -> T) -> Frame {
    Frame::from_array(Array2::from_shape_fn((nx, ny), |(x, y)| f(x, y)).into_dyn())
}

/// Channel-first stack `(c, x, y)` with `f(c, x, y)` at every pixel.
pub fn stack<T: Pixel>(c: usize, nx: usize, ny: usize, f: impl Fn(usize, usize, usize) -> T) -> Frame {
    Frame::from_array(Array3::from_shape_fn((c, nx, ny), |(k, x, y)| f(k, x, y)).into_dyn())
}

/// Ramp image `10 * x + y` as `uint16`.
pub fn ramp_u16(nx: usize, ny: usize) -> Frame {
    image(nx, ny, |x, y| (10 * x + y) as u16)
}

pub fn to_f64(frame: &Frame) -> ArrayD<f64> {
    frame.to_f64()
}

pub fn to_f64_2d(frame: &Frame) -> Array2<f64> {
    frame.to_f64().into_dimensionality::<Ix2>().unwrap()
}

pub fn to_f64_3d(frame: &Frame) -> Array3<f64> {
    frame.to_f64().into_dimensionality::<Ix3>().unwrap()
}
