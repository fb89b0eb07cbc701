use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{LuminaError, Result};
use crate::frame::PartialFrame;
use crate::io::load_frame;

use super::FrameSource;

const IMAGE_EXTENSIONS: &[&str] = &["png", "tif", "tiff", "bmp", "jpg", "jpeg", "pgm", "ppm"];

/// Replays image files in order, one per fetch.
pub struct ImageSequenceSource {
    name: String,
    paths: Vec<PathBuf>,
    next: usize,
    looping: bool,
}

impl ImageSequenceSource {
    pub fn new(name: impl Into<String>, paths: Vec<PathBuf>, looping: bool) -> Self {
        Self {
            name: name.into(),
            paths,
            next: 0,
            looping,
        }
    }

    /// All image files directly inside `dir`, sorted by file name.
    pub fn from_dir(dir: &Path, looping: bool) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        if paths.is_empty() {
            return Err(LuminaError::Source(format!("No images in {}", dir.display())));
        }
        paths.sort();
        let name = dir
            .file_name()
            .map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, paths, looping))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

impl FrameSource for ImageSequenceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self) -> Result<Option<PartialFrame>> {
        if self.next >= self.paths.len() {
            if !self.looping || self.paths.is_empty() {
                return Ok(None);
            }
            self.next = 0;
        }
        let path = &self.paths[self.next];
        self.next += 1;

        let frame = load_frame(path)?;
        let image_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        debug!(source = %self.name, image = %image_name, "Fetched");
        Ok(Some(PartialFrame::new(image_name, frame)))
    }

    fn is_exhausted(&self) -> bool {
        !self.looping && self.next >= self.paths.len()
    }
}
