//! Data sources and the acquisition hub that polls them.

pub mod hub;
pub mod sequence;

use std::fmt;
use std::str::FromStr;

use crate::error::{LuminaError, Result};
use crate::frame::PartialFrame;

pub use hub::SourceHub;
pub use sequence::ImageSequenceSource;

/// Something that produces partial frames, polled from its own worker thread.
pub trait FrameSource: Send {
    fn name(&self) -> &str;

    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Next contribution, or `None` when nothing new is available yet.
    fn fetch(&mut self) -> Result<Option<PartialFrame>>;

    /// The source will never produce another frame.
    fn is_exhausted(&self) -> bool {
        false
    }

    fn disconnect(&mut self) {}
}

/// Offset of a source's frame inside the merged frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Translation {
    pub x: Option<usize>,
    pub y: Option<usize>,
}

impl Translation {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x: Some(x), y: Some(y) }
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |v: Option<usize>| v.map_or_else(String::new, |v| v.to_string());
        write!(f, "{},{}", part(self.x), part(self.y))
    }
}

/// Parses `"x,y"`. Empty or non-numeric parts leave that offset unset; more
/// than two parts is an error.
impl FromStr for Translation {
    type Err = LuminaError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() > 2 {
            return Err(LuminaError::InvalidConfig(format!("Invalid translation: {s:?}")));
        }
        let offset = |i: usize| parts.get(i).and_then(|p| p.parse().ok());
        Ok(Self { x: offset(0), y: offset(1) })
    }
}
