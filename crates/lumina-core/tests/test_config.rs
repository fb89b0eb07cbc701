use lumina_core::display::{ScalingKind, Transform};
use lumina_core::filters::FilterStep;
use lumina_core::frame::FloatType;
use lumina_core::pipeline::config::PipelineConfig;
use lumina_core::pipeline::ConfigAdjustment;
use lumina_core::prepare::ChannelMode;
use lumina_core::window::{RangeWindow, Reduction};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_defaults() {
    let config = PipelineConfig::default();

    assert_eq!(config.float_type, FloatType::Float32);
    assert!(config.interrupt_on_error);
    assert!(!config.filters_enabled);
    assert_eq!(config.refresh_rate, 0.2);
    assert!(!config.range.enabled);
    assert_eq!(config.range.factor, 1);
    assert_eq!(config.range.reduction, Reduction::Mean);
    assert_eq!(config.channels.mode, ChannelMode::SumAll);
    assert_eq!(config.channels.rgb, [0, 1, 2]);
    assert_eq!(config.display.scaling, ScalingKind::Linear);
    assert_eq!(config.display.transform, Transform::None);
    assert!(config.stats.without_scaling);
    assert!(config.mask.high_value.is_none());
}

#[test]
fn test_stats_request_follows_consumers() {
    let mut config = PipelineConfig::default();
    config.stats.stream = true;
    config.stats.display = false;
    config.stats.auto_levels = false;

    let request = config.stats.request();
    assert!(request.max_raw);
    assert!(request.min);
    assert!(!request.max_scaled);
    assert!(!request.variance);
}

// ---------------------------------------------------------------------------
// TOML
// ---------------------------------------------------------------------------

#[test]
fn test_toml_round_trip() {
    let mut config = PipelineConfig::default();
    config.float_type = FloatType::Float64;
    config.filters_enabled = true;
    config.range.enabled = true;
    config.range.factor = 4;
    config.range.reduction = Reduction::Max;
    config.range.window = RangeWindow::new(Some(10), None, Some(200), Some(120));
    config.channels.mode = ChannelMode::Index(2);
    config.mask.high_value = Some(4000.0);
    config.display.transform = Transform::Rot180Transpose;
    config.display.scaling = ScalingKind::Log;
    config.filters = vec![
        FilterStep::GaussianBlur { sigma: 1.5 },
        FilterStep::Clip {
            low: Some(0.0),
            high: None,
        },
    ];

    let text = toml::to_string(&config).unwrap();
    let back: PipelineConfig = toml::from_str(&text).unwrap();

    assert_eq!(back, config);
}

#[test]
fn test_partial_toml() {
    let text = r#"
float_type = "float64"
interrupt_on_error = false

[range]
enabled = true
factor = 2
reduction = "sum"

[range.window]
x1 = 4
x2 = 12

[channels]
mode = "3"

[display]
scaling = "none"
transform = "rot90 (clockwise)"

[[filters]]
kind = "gaussian_blur"
sigma = 2.0
"#;
    let config: PipelineConfig = toml::from_str(text).unwrap();

    assert_eq!(config.float_type, FloatType::Float64);
    assert!(!config.interrupt_on_error);
    assert_eq!(config.range.factor, 2);
    assert_eq!(config.range.reduction, Reduction::Sum);
    assert_eq!(config.range.window, RangeWindow::new(Some(4), None, Some(12), None));
    assert_eq!(config.channels.mode, ChannelMode::Index(3));
    assert_eq!(config.channels.rgb, [0, 1, 2]);
    assert_eq!(config.display.scaling, ScalingKind::Linear);
    assert_eq!(config.display.transform, Transform::Rot90);
    assert_eq!(config.filters, vec![FilterStep::GaussianBlur { sigma: 2.0 }]);
    // untouched sections keep their defaults
    assert!(config.stats.auto_levels);
    assert_eq!(config.refresh_rate, 0.2);
}

#[test]
fn test_invalid_channel_mode_rejected() {
    let result = toml::from_str::<PipelineConfig>("[channels]\nmode = \"red\"\n");
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Adjustments
// ---------------------------------------------------------------------------

#[test]
fn test_adjusted_applies_every_change() {
    let mut config = PipelineConfig::default();
    config.channels.mode = ChannelMode::Rgb;
    config.background.apply = true;
    config.mask.apply = true;
    config.range.factor = 8;
    config.filters_enabled = true;

    let next = config.adjusted(&[
        ConfigAdjustment::ResetChannel,
        ConfigAdjustment::DisableBackground,
        ConfigAdjustment::DisableMask,
        ConfigAdjustment::SetDownsampleFactor(3),
        ConfigAdjustment::DisableFilters,
    ]);

    assert_eq!(next.channels.mode, ChannelMode::SumAll);
    assert!(!next.background.apply);
    assert!(!next.mask.apply);
    assert_eq!(next.range.factor, 3);
    assert!(!next.filters_enabled);
    // the snapshot itself is left alone
    assert_eq!(config.channels.mode, ChannelMode::Rgb);
    assert_eq!(config.range.factor, 8);
}

#[test]
fn test_adjusted_without_changes() {
    let config = PipelineConfig::default();
    assert_eq!(config.adjusted(&[]), config);
}

#[test]
fn test_nan_fill_follows_mask_policy() {
    let mut config = PipelineConfig::default();
    assert!(!config.nan_fill());
    config.mask.nan_mask = true;
    assert!(config.nan_fill());
}
