use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Apply a Gaussian blur to an image using separable 1D convolution.
///
/// Borders are clamped. NaN pixels propagate into their neighbourhood.
pub fn gaussian_blur_array(data: ArrayView2<f64>, sigma: f64) -> Array2<f64> {
    if sigma <= 0.0 {
        return data.to_owned();
    }
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve(data, &kernel, Axis(1));
    convolve(row_pass.view(), &kernel, Axis(0))
}

fn make_gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (sigma * 3.0).ceil() as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![0.0f64; size];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f64;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f64 - radius as f64;
        *k = (-x * x / s2).exp();
        sum += *k;
    }

    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

/// Convolve every lane along `axis` with `kernel`.
fn convolve(data: ArrayView2<f64>, kernel: &[f64], axis: Axis) -> Array2<f64> {
    let radius = kernel.len() / 2;
    let mut result = Array2::<f64>::zeros(data.dim());

    let convolve_lane = |(src, mut dst): (ArrayView1<f64>, ArrayViewMut1<f64>)| {
        let n = src.len();
        for (i, out) in dst.iter_mut().enumerate() {
            let mut sum = 0.0f64;
            for (ki, &kv) in kernel.iter().enumerate() {
                let j = (i as isize + ki as isize - radius as isize).clamp(0, n as isize - 1) as usize;
                sum += src[j] * kv;
            }
            *out = sum;
        }
    };

    let lanes = data.lanes(axis).into_iter().zip(result.lanes_mut(axis));
    if data.len() >= PARALLEL_PIXEL_THRESHOLD {
        lanes.collect::<Vec<_>>().into_par_iter().for_each(convolve_lane);
    } else {
        lanes.for_each(convolve_lane);
    }
    result
}
