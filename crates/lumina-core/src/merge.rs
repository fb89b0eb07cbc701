use ndarray::{ArrayD, Slice};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::consts::ERROR_MARKER;
use crate::error::{LuminaError, Result};
use crate::frame::{with_frame_pair, FloatType, Frame, MergedFrame, PartialFrame, Payload, Pixel};

/// Combines the partial frames delivered by all sources in one tick into a
/// single logical raw frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameMerger {
    /// Type used for mixed-type tiles and NaN-filled canvases.
    pub float_type: FloatType,
    /// Pre-fill the tiling canvas with NaN instead of zero.
    pub nan_fill: bool,
}

impl FrameMerger {
    pub fn new(float_type: FloatType, nan_fill: bool) -> Self {
        Self {
            float_type,
            nan_fill,
        }
    }

    /// Merge one tick's partial frames.
    ///
    /// Sources that contributed nothing appear as empty entries. An empty
    /// result means nothing new arrived since `previous_name`.
    pub fn merge(&self, mut partials: Vec<PartialFrame>, previous_name: Option<&str>) -> MergedFrame {
        if partials.iter().any(PartialFrame::is_error) {
            let text = partials
                .iter()
                .filter(|p| p.is_error())
                .map(|p| p.payload.as_ref().map_or_else(|| "None".to_string(), Payload::text))
                .collect::<Vec<_>>()
                .join(" ");
            return MergedFrame {
                name: Some(ERROR_MARKER.to_string()),
                payload: Some(Payload::Message(text)),
                metadata: None,
            };
        }

        let joined = partials
            .iter()
            .filter(|p| p.has_name())
            .filter_map(|p| p.name.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        let joined = joined.trim();
        let name = (!joined.is_empty()).then(|| joined.to_string());

        let has_metadata = partials.iter().any(PartialFrame::has_metadata);
        if !has_metadata && name.as_deref() == previous_name.map(str::trim) {
            return MergedFrame::default();
        }
        let metadata = has_metadata.then(|| merge_metadata(&partials));

        let Some(name) = name else {
            return MergedFrame {
                name: None,
                payload: None,
                metadata,
            };
        };

        let named: Vec<usize> = partials
            .iter()
            .enumerate()
            .filter(|(_, p)| p.has_name())
            .map(|(i, _)| i)
            .collect();
        if let &[only] = named.as_slice() {
            let single = partials.swap_remove(only);
            return MergedFrame {
                name: single.name,
                payload: single.payload,
                metadata: single.metadata,
            };
        }

        let tiles: Vec<&PartialFrame> = named.iter().map(|&i| &partials[i]).collect();
        let payload = match self.tile(&tiles) {
            Ok(frame) => Some(Payload::Pixels(frame)),
            Err(e) => {
                warn!(error = %e, "Partial frames cannot be merged");
                None
            }
        };
        MergedFrame {
            name: Some(name),
            payload,
            metadata,
        }
    }

    /// Paste every tile into a canvas sized to their bounding box.
    fn tile(&self, tiles: &[&PartialFrame]) -> Result<Frame> {
        let mut placed: Vec<(Frame, usize, usize)> = Vec::with_capacity(tiles.len());
        let mut extent = [0usize; 2];
        let mut trailing: Vec<usize> = Vec::new();
        let mut dtype = None;
        let mut mixed = false;

        for tile in tiles {
            let Some(frame) = tile.pixels() else {
                debug!(name = ?tile.name, "Skipping partial frame without pixels");
                continue;
            };
            let frame = as_tile(frame)?;
            let (sx, sy) = (frame.shape()[0], frame.shape()[1]);
            let x = tile.x_offset.unwrap_or(0);
            // Tiles without a y offset stack below what has been placed so far.
            let y = match (tile.y_offset, placed.is_empty()) {
                (Some(y), _) => y,
                (None, true) => 0,
                (None, false) => extent[1],
            };
            match dtype {
                None => {
                    dtype = Some(frame.dtype());
                    trailing = frame.shape()[2..].to_vec();
                }
                Some(first) if first != frame.dtype() => mixed = true,
                Some(_) => {}
            }
            extent[0] = extent[0].max(x + sx);
            extent[1] = extent[1].max(y + sy);
            placed.push((frame, x, y));
        }

        let Some(dtype) = dtype else {
            return Err(LuminaError::Source("no partial frame carries pixels".into()));
        };
        let mut shape = extent.to_vec();
        shape.extend_from_slice(&trailing);

        let mut canvas = if self.nan_fill {
            Frame::nan_filled(self.float_type, &shape)
        } else if mixed {
            Frame::zeros(self.float_type.dtype(), &shape)
        } else {
            Frame::zeros(dtype, &shape)
        };
        let canvas_dtype = canvas.dtype();
        debug!(shape = ?shape, dtype = %canvas_dtype, tiles = placed.len(), "Merging partial frames");

        for (frame, x, y) in placed {
            let frame = frame.into_dtype(canvas_dtype);
            paste(&mut canvas, &frame, x, y)?;
        }
        Ok(canvas)
    }
}

/// Give one-dimensional tiles a unit y extent.
fn as_tile(frame: &Frame) -> Result<Frame> {
    match frame.ndim() {
        0 => Err(LuminaError::UnsupportedRank(0)),
        1 => frame.clone().into_shape(&[frame.shape()[0], 1]),
        _ => Ok(frame.clone()),
    }
}

fn paste(canvas: &mut Frame, tile: &Frame, x: usize, y: usize) -> Result<()> {
    let canvas_dtype = canvas.dtype();
    let tile_dtype = tile.dtype();
    with_frame_pair!(canvas, tile, (dst, src) => paste_array(dst, src, x, y), _ => {
        Err(LuminaError::UnsupportedDtype(format!(
            "cannot paste {tile_dtype} tile into {canvas_dtype} frame"
        )))
    })
}

fn paste_array<T: Pixel>(dst: &mut ArrayD<T>, src: &ArrayD<T>, x: usize, y: usize) -> Result<()> {
    if dst.ndim() != src.ndim() || dst.shape()[2..] != src.shape()[2..] {
        return Err(LuminaError::ShapeMismatch {
            expected: dst.shape().to_vec(),
            found: src.shape().to_vec(),
        });
    }
    let (sx, sy) = (src.shape()[0], src.shape()[1]);
    let mut region = dst.slice_each_axis_mut(|ax| match ax.axis.index() {
        0 => Slice::from(x..x + sx),
        1 => Slice::from(y..y + sy),
        _ => Slice::from(..),
    });
    region.assign(src);
    Ok(())
}

/// Union of the JSON objects carried by the partial frames; later keys win.
fn merge_metadata(partials: &[PartialFrame]) -> String {
    let mut merged = Map::new();
    for text in partials.iter().filter_map(|p| p.metadata.as_deref()) {
        if text.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => merged.extend(map),
            Ok(other) => warn!(metadata = %other, "Ignoring non-object frame metadata"),
            Err(e) => warn!(error = %e, "Ignoring malformed frame metadata"),
        }
    }
    Value::Object(merged).to_string()
}
