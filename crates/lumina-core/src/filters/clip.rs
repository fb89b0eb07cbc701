use ndarray::ArrayD;

use crate::frame::{map_frame, Frame, Pixel};

/// Clamp every pixel into `[low, high]`; an absent bound is open.
///
/// The frame keeps its type; bounds beyond its range saturate. NaN pixels
/// stay NaN.
pub fn clip(frame: &Frame, low: Option<f64>, high: Option<f64>) -> Frame {
    map_frame!(frame, a => clip_array(a, low, high))
}

fn clip_array<T: Pixel>(a: &ArrayD<T>, low: Option<f64>, high: Option<f64>) -> ArrayD<T> {
    a.mapv(|v| {
        let x = v.as_f64();
        match (low, high) {
            (Some(lo), _) if x < lo => T::saturate(lo),
            (_, Some(hi)) if x > hi => T::saturate(hi),
            _ => v,
        }
    })
}
