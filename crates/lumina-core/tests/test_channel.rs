mod common;

use lumina_core::error::LuminaError;
use lumina_core::frame::{DType, Frame};
use lumina_core::prepare::{compose, ChannelMode, DEFAULT_RGB};
use ndarray::Array1;

use common::{image, stack, to_f64_2d, to_f64_3d};

/// Three channels holding 1, 2 and 3 everywhere.
fn three_channels() -> Frame {
    stack(3, 2, 2, |c, _, _| (c + 1) as u16)
}

// ---------------------------------------------------------------------------
// Grey reductions
// ---------------------------------------------------------------------------

#[test]
fn test_sum_all_channels() {
    let out = compose(&three_channels(), ChannelMode::SumAll, DEFAULT_RGB, false).unwrap();

    assert!(!out.rgb);
    assert_eq!(out.frame.shape(), &[2, 2]);
    assert_eq!(out.frame.dtype(), DType::U64);
    assert!(out.frame.values_f64().iter().all(|&v| v == 6.0));
}

#[test]
fn test_index_zero_sums() {
    let out = compose(&three_channels(), ChannelMode::Index(0), DEFAULT_RGB, false).unwrap();
    assert!(out.frame.values_f64().iter().all(|&v| v == 6.0));
}

#[test]
fn test_sum_skips_first_channel() {
    let out = compose(&three_channels(), ChannelMode::SumAll, DEFAULT_RGB, true).unwrap();
    assert!(out.frame.values_f64().iter().all(|&v| v == 5.0));
}

#[test]
fn test_select_one_based_channel() {
    let out = compose(&three_channels(), ChannelMode::Index(2), DEFAULT_RGB, false).unwrap();

    assert_eq!(out.frame.dtype(), DType::U16);
    assert!(out.frame.values_f64().iter().all(|&v| v == 2.0));
}

#[test]
fn test_select_ignores_skip_first() {
    let out = compose(&three_channels(), ChannelMode::Index(1), DEFAULT_RGB, true).unwrap();
    assert!(out.frame.values_f64().iter().all(|&v| v == 1.0));
}

#[test]
fn test_index_after_last_channel_is_mean() {
    let out = compose(&three_channels(), ChannelMode::Index(4), DEFAULT_RGB, false).unwrap();

    assert_eq!(out.frame.dtype(), DType::F64);
    assert!(out.frame.values_f64().iter().all(|&v| v == 2.0));

    let named = compose(&three_channels(), ChannelMode::Mean, DEFAULT_RGB, false).unwrap();
    assert_eq!(named, out);
}

#[test]
fn test_mean_skipping_first_channel() {
    let out = compose(&three_channels(), ChannelMode::Mean, DEFAULT_RGB, true).unwrap();
    assert!(out.frame.values_f64().iter().all(|&v| v == 2.5));
}

#[test]
fn test_float_sum_ignores_nan() {
    let frame = stack(2, 1, 2, |c, _, y| if c == 1 && y == 0 { f32::NAN } else { 1.5 });
    let out = compose(&frame, ChannelMode::SumAll, DEFAULT_RGB, false).unwrap();

    assert_eq!(out.frame.dtype(), DType::F32);
    assert_eq!(out.frame.values_f64(), vec![1.5, 3.0]);
}

#[test]
fn test_float_mean_all_nan_is_nan() {
    let frame = stack(2, 1, 1, |_, _, _| f64::NAN);
    let out = compose(&frame, ChannelMode::Mean, DEFAULT_RGB, false).unwrap();
    assert!(out.frame.values_f64()[0].is_nan());
}

#[test]
fn test_image_passes_through() {
    let frame = image(3, 2, |x, y| (x * y) as i32);
    let out = compose(&frame, ChannelMode::Index(2), DEFAULT_RGB, false).unwrap();
    assert_eq!(out.frame, frame);
    assert!(!out.rgb);
}

#[test]
fn test_vector_becomes_column() {
    let frame = Frame::from_array(Array1::from_vec(vec![1u8, 2, 3, 4]).into_dyn());
    let out = compose(&frame, ChannelMode::SumAll, DEFAULT_RGB, false).unwrap();

    assert_eq!(out.frame.shape(), &[4, 1]);
    assert_eq!(to_f64_2d(&out.frame)[[2, 0]], 3.0);
}

#[test]
fn test_single_channel_stack_with_rgb_request() {
    let frame = stack(1, 2, 3, |_, x, y| (x + y) as u8);
    let out = compose(&frame, ChannelMode::Rgb, DEFAULT_RGB, false).unwrap();

    assert!(!out.rgb);
    assert_eq!(out.frame.shape(), &[2, 3]);
    assert_eq!(out.frame.dtype(), DType::U8);
}

// ---------------------------------------------------------------------------
// Pseudo-RGB
// ---------------------------------------------------------------------------

#[test]
fn test_rgb_default_triple() {
    let out = compose(&three_channels(), ChannelMode::Rgb, DEFAULT_RGB, false).unwrap();

    assert!(out.rgb);
    assert_eq!(out.frame.shape(), &[2, 2, 3]);
    assert_eq!(out.frame.dtype(), DType::U16);
    let v = to_f64_3d(&out.frame);
    assert_eq!(v[[0, 0, 0]], 1.0);
    assert_eq!(v[[1, 0, 1]], 2.0);
    assert_eq!(v[[1, 1, 2]], 3.0);
}

#[test]
fn test_index_beyond_mean_composes_rgb() {
    let out = compose(&three_channels(), ChannelMode::Index(5), DEFAULT_RGB, false).unwrap();
    assert!(out.rgb);
}

#[test]
fn test_rgb_custom_order_with_blank_plane() {
    let out = compose(&three_channels(), ChannelMode::Rgb, [2, -1, 0], false).unwrap();
    let v = to_f64_3d(&out.frame);

    assert_eq!(v[[0, 1, 0]], 3.0);
    assert_eq!(v[[0, 1, 1]], 0.0);
    assert_eq!(v[[0, 1, 2]], 1.0);
}

#[test]
fn test_rgb_two_channels_pads_zero_plane() {
    let frame = stack(2, 3, 2, |c, _, _| (c + 7) as u8);
    let out = compose(&frame, ChannelMode::Rgb, DEFAULT_RGB, false).unwrap();

    assert_eq!(out.frame.shape(), &[3, 2, 3]);
    let v = to_f64_3d(&out.frame);
    assert_eq!(v[[2, 1, 0]], 7.0);
    assert_eq!(v[[2, 1, 1]], 8.0);
    assert_eq!(v[[2, 1, 2]], 0.0);
}

#[test]
fn test_rgb_invalid_channel() {
    let err = compose(&three_channels(), ChannelMode::Rgb, [0, 1, 7], false).unwrap_err();
    match err {
        LuminaError::InvalidChannel { index, channels } => {
            assert_eq!(index, 7);
            assert_eq!(channels, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// ChannelMode parsing
// ---------------------------------------------------------------------------

#[test]
fn test_channel_mode_from_str() {
    assert_eq!("sum".parse::<ChannelMode>().unwrap(), ChannelMode::SumAll);
    assert_eq!("0".parse::<ChannelMode>().unwrap(), ChannelMode::SumAll);
    assert_eq!(" 3 ".parse::<ChannelMode>().unwrap(), ChannelMode::Index(3));
    assert_eq!("mean".parse::<ChannelMode>().unwrap(), ChannelMode::Mean);
    assert_eq!("rgb".parse::<ChannelMode>().unwrap(), ChannelMode::Rgb);
    assert!("red".parse::<ChannelMode>().is_err());
    assert!("-1".parse::<ChannelMode>().is_err());
}

#[test]
fn test_channel_mode_display_round_trip() {
    for mode in [ChannelMode::SumAll, ChannelMode::Index(2), ChannelMode::Mean, ChannelMode::Rgb] {
        assert_eq!(mode.to_string().parse::<ChannelMode>().unwrap(), mode);
    }
}
