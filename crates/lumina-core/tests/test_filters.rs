mod common;

use approx::assert_abs_diff_eq;
use lumina_core::error::LuminaError;
use lumina_core::filters::clip::clip;
use lumina_core::filters::gaussian_blur::gaussian_blur_array;
use lumina_core::filters::{apply_filter_step, FilterStep, FrameFilter};
use lumina_core::frame::{DType, Frame};
use ndarray::{Array1, Array2};

use common::{image, stack, to_f64_2d, to_f64_3d};

// ---------------------------------------------------------------------------
// gaussian_blur_array
// ---------------------------------------------------------------------------

#[test]
fn test_blur_zero_sigma_is_copy() {
    let data = Array2::from_shape_fn((4, 5), |(x, y)| (x * 5 + y) as f64);
    let blurred = gaussian_blur_array(data.view(), 0.0);
    assert_eq!(blurred, data);
}

#[test]
fn test_blur_uniform_unchanged() {
    let data = Array2::from_elem((8, 6), 0.75f64);
    let blurred = gaussian_blur_array(data.view(), 2.0);
    for v in blurred.iter() {
        assert_abs_diff_eq!(*v, 0.75, epsilon = 1e-12);
    }
}

#[test]
fn test_blur_spreads_impulse() {
    let mut data = Array2::<f64>::zeros((15, 15));
    data[[7, 7]] = 1.0;

    let blurred = gaussian_blur_array(data.view(), 1.0);

    // far from the border the kernel mass is conserved
    assert_abs_diff_eq!(blurred.sum(), 1.0, epsilon = 1e-12);
    assert!(blurred[[7, 7]] < 1.0);
    assert!(blurred[[7, 8]] > 0.0);
    assert_abs_diff_eq!(blurred[[6, 7]], blurred[[8, 7]], epsilon = 1e-15);
    assert_abs_diff_eq!(blurred[[7, 6]], blurred[[6, 7]], epsilon = 1e-15);
}

// ---------------------------------------------------------------------------
// Filter steps on frames
// ---------------------------------------------------------------------------

#[test]
fn test_blur_step_on_image() {
    let frame = image(6, 6, |_, _| 10u16);
    let out = apply_filter_step(&frame, &FilterStep::GaussianBlur { sigma: 1.0 }).unwrap();

    assert_eq!(out.dtype(), DType::F64);
    assert_eq!(out.shape(), &[6, 6]);
    for v in out.values_f64() {
        assert_abs_diff_eq!(v, 10.0, epsilon = 1e-9);
    }
}

#[test]
fn test_blur_step_on_stack_keeps_planes_apart() {
    let frame = stack(2, 5, 5, |c, _, _| if c == 0 { 1.0f32 } else { 3.0 });
    let out = apply_filter_step(&frame, &FilterStep::GaussianBlur { sigma: 1.5 }).unwrap();

    assert_eq!(out.shape(), &[2, 5, 5]);
    let v = to_f64_3d(&out);
    assert_abs_diff_eq!(v[[0, 2, 2]], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(v[[1, 0, 4]], 3.0, epsilon = 1e-9);
}

#[test]
fn test_blur_step_rejects_vector() {
    let frame = Frame::from_array(Array1::from_vec(vec![1.0f64, 2.0]).into_dyn());
    let err = apply_filter_step(&frame, &FilterStep::GaussianBlur { sigma: 1.0 }).unwrap_err();
    assert!(matches!(err, LuminaError::Filter(_)));
}

#[test]
fn test_clip_saturates_to_type() {
    let frame = image(3, 1, |x, _| (x * 100) as u8);
    let out = clip(&frame, Some(-5.0), Some(150.0));

    assert_eq!(out.dtype(), DType::U8);
    assert_eq!(out.values_f64(), vec![0.0, 100.0, 150.0]);
}

#[test]
fn test_clip_open_bounds_and_nan() {
    let frame = image(4, 1, |x, _| match x {
        0 => -3.0f32,
        1 => f32::NAN,
        2 => 2.0,
        _ => 9.0,
    });
    let out = clip(&frame, None, Some(5.0));
    let v = to_f64_2d(&out);

    assert_eq!(v[[0, 0]], -3.0);
    assert!(v[[1, 0]].is_nan());
    assert_eq!(v[[2, 0]], 2.0);
    assert_eq!(v[[3, 0]], 5.0);
}

#[test]
fn test_filter_step_as_frame_filter() {
    let mut step = FilterStep::Clip {
        low: Some(1.0),
        high: None,
    };
    assert_eq!(step.name(), "clip");

    let output = step.apply(&image(2, 1, |x, _| x as i16), None, None).unwrap();
    assert!(output.metadata.is_none());
    assert_eq!(output.frame.unwrap().values_f64(), vec![1.0, 1.0]);
}

// ---------------------------------------------------------------------------
// FilterStep serialization and names
// ---------------------------------------------------------------------------

#[test]
fn test_filter_step_serde() {
    let json = serde_json::to_string(&FilterStep::GaussianBlur { sigma: 1.5 }).unwrap();
    assert_eq!(json, r#"{"kind":"gaussian_blur","sigma":1.5}"#);

    let back: FilterStep = serde_json::from_str(r#"{"kind":"clip","high":10.0}"#).unwrap();
    assert_eq!(
        back,
        FilterStep::Clip {
            low: None,
            high: Some(10.0)
        }
    );
}

#[test]
fn test_filter_step_display() {
    assert_eq!(FilterStep::GaussianBlur { sigma: 2.0 }.to_string(), "Gaussian Blur (sigma=2)");
    let clip = FilterStep::Clip {
        low: None,
        high: Some(7.5),
    };
    assert_eq!(clip.to_string(), "Clip [-, 7.5]");
}
