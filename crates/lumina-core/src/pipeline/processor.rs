use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::consts::{CHANNEL_LABELS_KEY, SKIP_FIRST_KEY};
use crate::display::geometry::apply_transform;
use crate::display::scaling::scale;
use crate::display::stats::{compute_statistics, StatsRequest};
use crate::filters::FrameFilter;
use crate::frame::{Frame, MergedFrame, PartialFrame, Payload};
use crate::merge::FrameMerger;
use crate::prepare::background::subtract_background;
use crate::prepare::channel::{compose, ChannelMode, Composed};
use crate::prepare::mask::{apply_high_value_mask, apply_mask, MaskFill, MaskFrame};
use crate::window::{crop, downsample, RangeReport};

use super::config::PipelineConfig;
use super::types::{ConfigAdjustment, IngestOutcome, PipelineStage, PipelineWarning, ProcessedFrame};

/// State of a live view between ticks: the last raw frame with its name and
/// metadata, the stored background and mask, and the user filter chain.
///
/// All mutation happens on the coordinating thread between ticks; every
/// stage of [`LiveProcessor::process`] works on owned copies.
#[derive(Default)]
pub struct LiveProcessor {
    image_name: Option<String>,
    metadata: Option<String>,
    mdata: Map<String, Value>,
    raw: Option<Frame>,
    raw_grey: Option<Frame>,
    background: Option<Frame>,
    mask: Option<MaskFrame>,
    filters: Vec<Box<dyn FrameFilter>>,
    filters_active: bool,
}

/// Collects the warnings and adjustments of one tick.
#[derive(Default)]
struct TickLog {
    warnings: Vec<PipelineWarning>,
    adjustments: Vec<ConfigAdjustment>,
}

impl TickLog {
    fn warn(&mut self, stage: PipelineStage, message: impl Into<String>) {
        let warning = PipelineWarning::new(stage, message);
        warn!(stage = %warning.stage, "{}", warning.message);
        self.warnings.push(warning);
    }

    fn adjust(&mut self, adjustment: ConfigAdjustment) {
        if !self.adjustments.contains(&adjustment) {
            self.adjustments.push(adjustment);
        }
    }
}

impl LiveProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the stored frame, used to detect ticks without new data.
    pub fn previous_name(&self) -> Option<&str> {
        self.image_name.as_deref()
    }

    pub fn raw_frame(&self) -> Option<&Frame> {
        self.raw.as_ref()
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    /// Parsed frame metadata, including entries added by filters.
    pub fn metadata_map(&self) -> &Map<String, Value> {
        &self.mdata
    }

    pub fn background(&self) -> Option<&Frame> {
        self.background.as_ref()
    }

    pub fn set_background(&mut self, background: Option<Frame>) {
        self.background = background;
    }

    /// Store the last channel-composed frame as background. Returns whether
    /// there was a frame to store.
    pub fn freeze_background(&mut self) -> bool {
        match &self.raw_grey {
            Some(grey) => {
                debug!(shape = ?grey.shape(), "Freezing background");
                self.background = Some(grey.clone());
                true
            }
            None => false,
        }
    }

    pub fn mask(&self) -> Option<&MaskFrame> {
        self.mask.as_ref()
    }

    pub fn set_mask_image(&mut self, image: Option<Frame>, zero_mask: bool) {
        self.mask = image.map(|image| MaskFrame::new(image, zero_mask));
    }

    /// Recompute the mask selection for a new zero-mask setting.
    pub fn remask(&mut self, zero_mask: bool) {
        if let Some(mask) = self.mask.as_mut() {
            mask.remask(zero_mask);
        }
    }

    /// Replace the filter chain, terminating the previous one if it was active.
    pub fn set_filters(&mut self, filters: Vec<Box<dyn FrameFilter>>) {
        if self.filters_active {
            self.filters.iter_mut().for_each(|f| f.terminate());
            self.filters_active = false;
        }
        self.filters = filters;
    }

    /// Merge one tick's partial frames, store the result and process it.
    ///
    /// Returns the ingest outcome and, when something new was stored, the
    /// processed frame.
    pub fn tick(
        &mut self,
        partials: Vec<PartialFrame>,
        config: &PipelineConfig,
        request: &StatsRequest,
    ) -> (IngestOutcome, Option<ProcessedFrame>) {
        let merger = FrameMerger::new(config.float_type, config.nan_fill());
        let merged = merger.merge(partials, self.previous_name());
        let outcome = self.ingest(merged, config);
        match outcome {
            IngestOutcome::Updated => {
                let processed = self.process(config, request);
                (outcome, Some(processed))
            }
            _ => (outcome, None),
        }
    }

    /// Store a merged frame.
    ///
    /// New metadata always replaces the stored metadata. Without new
    /// metadata a frame is stored when its name differs from the stored one.
    /// A non-empty pixel payload replaces the stored frame and a missing
    /// payload clears it; empty frames and messages leave it in place.
    /// Error messages never replace the stored frame.
    pub fn ingest(&mut self, merged: MergedFrame, config: &PipelineConfig) -> IngestOutcome {
        let new_metadata = merged.metadata.clone().unwrap_or_default();
        let name_trimmed = merged.name.as_deref().map(str::trim);
        if name_trimmed == self.image_name.as_deref().map(str::trim) && new_metadata.is_empty() {
            return IngestOutcome::Unchanged;
        }
        if merged.is_error() {
            let message = merged.payload.as_ref().map(Payload::text).unwrap_or_default();
            if config.interrupt_on_error {
                warn!(%message, "Source error, interrupting acquisition");
            } else {
                warn!(%message, "Source error");
            }
            return IngestOutcome::Error {
                message,
                interrupt: config.interrupt_on_error,
            };
        }
        let Some(name) = merged.name else {
            return IngestOutcome::Unchanged;
        };
        // `Some(None)` clears the stored frame, `None` keeps it.
        let replacement = match merged.payload {
            None => Some(None),
            Some(Payload::Pixels(frame)) if !frame.is_empty() => Some(Some(frame)),
            Some(_) => None,
        };

        if self.metadata.as_deref().unwrap_or("") != new_metadata && !new_metadata.trim().is_empty() {
            if !name.trim().is_empty() {
                if let Some(raw) = replacement {
                    self.image_name = Some(name);
                    self.raw = raw;
                }
            }
            self.mdata = parse_metadata(&new_metadata);
            self.metadata = merged.metadata;
        } else if !name.trim().is_empty() && self.image_name.as_deref() != Some(name.as_str()) {
            self.image_name = Some(name);
            self.metadata = merged.metadata;
            if let Some(raw) = replacement {
                self.raw = raw;
            }
        }
        if new_metadata.trim().is_empty() {
            self.mdata.clear();
        }
        debug!(name = ?self.image_name, "Stored new frame");
        IngestOutcome::Updated
    }

    /// Run the transform chain on the stored raw frame.
    ///
    /// Recoverable failures disable the offending feature for the rest of
    /// the tick; the matching [`ConfigAdjustment`]s are returned so the next
    /// snapshot keeps it disabled.
    pub fn process(&mut self, config: &PipelineConfig, request: &StatsRequest) -> ProcessedFrame {
        let mut log = TickLog::default();
        let mut out = ProcessedFrame::default();
        self.sync_filters(config, &mut log);

        let Some(mut frame) = self.raw.clone() else {
            out.warnings = log.warnings;
            out.adjustments = log.adjustments;
            return out;
        };

        // Range window and downsampling.
        let mut range = RangeReport::default();
        if config.range.enabled {
            if !config.range.window.is_unbounded() {
                let (cropped, origin) = crop(frame, &config.range.window);
                frame = cropped;
                range.origin = origin;
            }
            if config.range.factor > 1 {
                let reduced = downsample(frame, config.range.factor, config.range.reduction);
                if let Some(factor) = reduced.adjusted_factor {
                    debug!(factor, "Downsampling factor adjusted");
                    log.adjust(ConfigAdjustment::SetDownsampleFactor(factor));
                }
                frame = reduced.frame;
                range.scale = reduced.scale;
            }
        }
        out.range = range.oriented(config.display.transform);

        if config.filters_enabled && self.filters_active {
            frame = self.apply_filters(frame, &mut log);
        }
        out.channel_labels = self.mdata.get(CHANNEL_LABELS_KEY).cloned();

        // Channel composition.
        let skip_first = self.mdata.get(SKIP_FIRST_KEY).is_some_and(is_truthy);
        let composed = match compose(&frame, config.channels.mode, config.channels.rgb, skip_first) {
            Ok(composed) => Some(composed),
            Err(e) => {
                log.warn(
                    PipelineStage::ChannelComposition,
                    format!("{e}; reset to grey scale"),
                );
                log.adjust(ConfigAdjustment::ResetChannel);
                match compose(&frame, ChannelMode::SumAll, config.channels.rgb, skip_first) {
                    Ok(composed) => Some(composed),
                    Err(e) => {
                        log.warn(PipelineStage::ChannelComposition, e.to_string());
                        None
                    }
                }
            }
        };
        let Some(Composed { frame: grey, rgb }) = composed else {
            out.warnings = log.warnings;
            out.adjustments = log.adjustments;
            return out;
        };
        out.rgb = rgb;
        self.raw_grey = Some(grey.clone());

        let mut display = grey.clone();

        if config.background.apply {
            if let Some(background) = &self.background {
                match subtract_background(&display, background) {
                    Ok(subtracted) => display = subtracted,
                    Err(e) => {
                        log.warn(
                            PipelineStage::BackgroundSubtraction,
                            format!("Background image does not match the current image: {e}"),
                        );
                        log.adjust(ConfigAdjustment::DisableBackground);
                        self.background = None;
                    }
                }
            }
        }

        let fill = MaskFill::new(config.mask.nan_mask, config.float_type);
        if config.mask.apply {
            if let Some(mask) = self.mask.as_mut() {
                mask.remask(config.mask.zero_mask);
                match apply_mask(&display, mask.indices(), fill) {
                    Ok(masked) => display = masked,
                    Err(e) => {
                        log.warn(
                            PipelineStage::Masking,
                            format!("Mask image does not match the current image: {e}"),
                        );
                        log.adjust(ConfigAdjustment::DisableMask);
                    }
                }
            }
        }
        if let Some(threshold) = config.mask.high_value {
            match apply_high_value_mask(&display, threshold, fill) {
                Ok(masked) => display = masked,
                Err(e) => log.warn(
                    PipelineStage::HighValueMasking,
                    format!("Cannot apply high value mask to the current image: {e}"),
                ),
            }
        }

        let (display, flags) = apply_transform(display, config.display.transform, config.display.keep_coords);
        out.flags = flags;

        let legacy_cast = config.display.legacy_float_cast.then_some(config.float_type);
        let scaled = scale(Some(display.clone()), config.display.scaling, legacy_cast);

        out.statistics = compute_statistics(
            Some(&display),
            scaled.as_ref(),
            Some(&grey),
            request,
            config.stats.without_scaling,
        );
        let (display_shape, display_dtype) = (display.shape(), display.dtype());
        debug!(
            shape = ?display_shape,
            dtype = %display_dtype,
            max = out.statistics.max,
            "Processed frame"
        );

        out.display = scaled;
        out.raw_display = Some(display);
        out.raw_grey = Some(grey);
        out.warnings = log.warnings;
        out.adjustments = log.adjustments;
        out
    }

    /// Start or stop the filter chain to match the configuration.
    fn sync_filters(&mut self, config: &PipelineConfig, log: &mut TickLog) {
        let wanted = config.filters_enabled && !self.filters.is_empty();
        if wanted && !self.filters_active {
            for i in 0..self.filters.len() {
                if let Err(e) = self.filters[i].initialize() {
                    log.warn(
                        PipelineStage::Filtering,
                        format!("Filter '{}' cannot be initialized: {e}", self.filters[i].name()),
                    );
                    log.adjust(ConfigAdjustment::DisableFilters);
                    self.filters[..i].iter_mut().for_each(|f| f.terminate());
                    return;
                }
            }
            info!(filters = self.filters.len(), "Filter chain started");
            self.filters_active = true;
        } else if !wanted && self.filters_active {
            self.stop_filters();
        }
    }

    fn stop_filters(&mut self) {
        self.filters.iter_mut().for_each(|f| f.terminate());
        self.filters_active = false;
        info!("Filter chain stopped");
    }

    fn apply_filters(&mut self, mut frame: Frame, log: &mut TickLog) -> Frame {
        for i in 0..self.filters.len() {
            let filter = &mut self.filters[i];
            match filter.apply(&frame, self.image_name.as_deref(), self.metadata.as_deref()) {
                Ok(output) => {
                    if let Some(filtered) = output.frame.filter(|f| f.len() > 1) {
                        frame = filtered;
                    }
                    if let Some(extra) = output.metadata {
                        self.mdata.extend(extra);
                    }
                }
                Err(e) => {
                    let name = filter.name().to_string();
                    log.warn(PipelineStage::Filtering, format!("Filter '{name}' failed: {e}"));
                    log.adjust(ConfigAdjustment::DisableFilters);
                    self.stop_filters();
                    break;
                }
            }
        }
        frame
    }
}

impl Drop for LiveProcessor {
    fn drop(&mut self) {
        if self.filters_active {
            self.filters.iter_mut().for_each(|f| f.terminate());
        }
    }
}

fn parse_metadata(text: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed frame metadata");
            Map::new()
        }
    }
}

/// Truthiness of a metadata value as the publishing sources intend it.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
