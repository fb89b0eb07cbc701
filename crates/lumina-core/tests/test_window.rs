mod common;

use lumina_core::display::Transform;
use lumina_core::frame::{DType, Frame};
use lumina_core::window::{crop, downsample, RangeReport, RangeWindow, Reduction};
use ndarray::Array1;

use common::{image, ramp_u16, stack, to_f64_2d, to_f64_3d};

// ---------------------------------------------------------------------------
// crop
// ---------------------------------------------------------------------------

#[test]
fn test_crop_image() {
    let frame = ramp_u16(6, 4);
    let window = RangeWindow::new(Some(1), Some(0), Some(4), Some(2));

    let (cropped, origin) = crop(frame, &window);

    assert_eq!(cropped.shape(), &[3, 2]);
    assert_eq!(origin, (1, 0));
    let v = to_f64_2d(&cropped);
    assert_eq!(v[[0, 0]], 10.0);
    assert_eq!(v[[2, 1]], 31.0);
}

#[test]
fn test_crop_open_bounds() {
    let frame = ramp_u16(6, 4);
    let window = RangeWindow::new(Some(4), None, None, Some(1));

    let (cropped, origin) = crop(frame, &window);

    assert_eq!(cropped.shape(), &[2, 1]);
    assert_eq!(origin, (4, 0));
    assert_eq!(to_f64_2d(&cropped)[[1, 0]], 50.0);
}

#[test]
fn test_crop_bounds_beyond_frame_are_clamped() {
    let frame = ramp_u16(3, 3);
    let window = RangeWindow::new(Some(1), Some(1), Some(100), Some(100));

    let (cropped, _) = crop(frame, &window);
    assert_eq!(cropped.shape(), &[2, 2]);
}

#[test]
fn test_crop_empty_window_is_noop() {
    let frame = ramp_u16(6, 4);
    let window = RangeWindow::new(Some(5), None, Some(2), None);

    let (cropped, origin) = crop(frame.clone(), &window);

    assert_eq!(cropped, frame);
    assert_eq!(origin, (0, 0));
}

#[test]
fn test_crop_stack_keeps_channels() {
    let frame = stack(2, 6, 4, |c, x, y| (100 * c + 10 * x + y) as u16);
    let window = RangeWindow::new(Some(2), Some(1), Some(5), Some(3));

    let (cropped, origin) = crop(frame, &window);

    assert_eq!(cropped.shape(), &[2, 3, 2]);
    assert_eq!(origin, (2, 1));
    assert_eq!(to_f64_3d(&cropped)[[1, 0, 0]], 121.0);
}

#[test]
fn test_crop_vector_along_x() {
    let frame = Frame::from_array(Array1::from_iter(0..10i32).into_dyn());
    let window = RangeWindow::new(Some(2), Some(7), Some(5), Some(9));

    let (cropped, origin) = crop(frame, &window);

    assert_eq!(cropped.shape(), &[3]);
    assert_eq!(cropped.values_f64(), vec![2.0, 3.0, 4.0]);
    assert_eq!(origin, (2, 7));
}

// ---------------------------------------------------------------------------
// downsample
// ---------------------------------------------------------------------------

#[test]
fn test_downsample_mean() {
    let frame = image(4, 2, |x, y| (x + 4 * y) as u16);

    let out = downsample(frame, 2, Reduction::Mean);

    assert_eq!(out.scale, (2, 2));
    assert_eq!(out.adjusted_factor, None);
    assert_eq!(out.frame.shape(), &[2, 1]);
    assert_eq!(out.frame.dtype(), DType::F64);
    // blocks {0, 1, 4, 5} and {2, 3, 6, 7}
    assert_eq!(out.frame.values_f64(), vec![2.5, 4.5]);
}

#[test]
fn test_downsample_sum_widens_integers() {
    let frame = image(2, 2, |_, _| 200u8);
    let out = downsample(frame, 2, Reduction::Sum);

    assert_eq!(out.frame.dtype(), DType::U64);
    assert_eq!(out.frame.values_f64(), vec![800.0]);
}

#[test]
fn test_downsample_max_min_keep_type() {
    let frame = image(4, 4, |x, y| (x * 4 + y) as i16 - 8);

    let max = downsample(frame.clone(), 2, Reduction::Max);
    assert_eq!(max.frame.dtype(), DType::I16);
    assert_eq!(max.frame.values_f64(), vec![-3.0, -1.0, 5.0, 7.0]);

    let min = downsample(frame, 2, Reduction::Min);
    assert_eq!(min.frame.values_f64(), vec![-8.0, -6.0, 0.0, 2.0]);
}

#[test]
fn test_downsample_drops_remainder() {
    let frame = ramp_u16(7, 7);
    let out = downsample(frame, 2, Reduction::Max);
    assert_eq!(out.frame.shape(), &[3, 3]);
    assert_eq!(out.scale, (2, 2));
}

#[test]
fn test_downsample_factor_too_large_is_adjusted() {
    let frame = ramp_u16(3, 3);

    let out = downsample(frame.clone(), 4, Reduction::Mean);

    assert_eq!(out.frame, frame);
    assert_eq!(out.scale, (1, 1));
    assert_eq!(out.adjusted_factor, Some(3));

    // the adjusted factor fits
    let retry = downsample(frame, 3, Reduction::Mean);
    assert_eq!(retry.adjusted_factor, None);
    assert_eq!(retry.frame.shape(), &[1, 1]);
}

#[test]
fn test_downsample_single_partial_block_is_adjusted() {
    let frame = ramp_u16(5, 5);

    let out = downsample(frame.clone(), 3, Reduction::Mean);

    assert_eq!(out.frame, frame);
    assert_eq!(out.scale, (1, 1));
    assert_eq!(out.adjusted_factor, Some(5));

    // two whole blocks per axis still reduce
    let out = downsample(ramp_u16(6, 6), 3, Reduction::Mean);
    assert_eq!(out.adjusted_factor, None);
    assert_eq!(out.frame.shape(), &[2, 2]);
    assert_eq!(out.scale, (3, 3));
}

#[test]
fn test_downsample_stack_per_channel() {
    let frame = stack(2, 4, 4, |c, _, _| (c + 1) as f32);
    let out = downsample(frame, 2, Reduction::Sum);

    assert_eq!(out.frame.shape(), &[2, 2, 2]);
    assert_eq!(out.frame.dtype(), DType::F32);
    let v = to_f64_3d(&out.frame);
    assert_eq!(v[[0, 1, 1]], 4.0);
    assert_eq!(v[[1, 0, 0]], 8.0);
}

#[test]
fn test_downsample_vector_is_noop() {
    let frame = Frame::from_array(Array1::from_iter(0..8u8).into_dyn());
    let out = downsample(frame.clone(), 2, Reduction::Mean);
    assert_eq!(out.frame, frame);
    assert_eq!(out.adjusted_factor, None);
}

#[test]
fn test_crop_then_unit_downsample_round_trip() {
    let frame = ramp_u16(5, 4);
    let window = RangeWindow::new(Some(0), Some(0), Some(5), Some(4));

    let (cropped, origin) = crop(frame.clone(), &window);
    let out = downsample(cropped, 1, Reduction::Sum);

    assert_eq!(origin, (0, 0));
    assert_eq!(out.scale, (1, 1));
    assert_eq!(out.frame, frame);
}

#[test]
fn test_reduction_names() {
    for r in [Reduction::Mean, Reduction::Sum, Reduction::Max, Reduction::Min] {
        assert_eq!(r.to_string().parse::<Reduction>().unwrap(), r);
    }
    assert!("median".parse::<Reduction>().is_err());
}

// ---------------------------------------------------------------------------
// RangeReport
// ---------------------------------------------------------------------------

#[test]
fn test_range_report_follows_axis_swap() {
    let report = RangeReport {
        origin: (4, 1),
        scale: (2, 3),
    };

    assert_eq!(report.oriented(Transform::FlipUpDown), report);
    let swapped = report.oriented(Transform::Rot90);
    assert_eq!(swapped.origin, (1, 4));
    assert_eq!(swapped.scale, (3, 2));
}
