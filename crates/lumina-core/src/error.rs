use thiserror::Error;

#[derive(Error, Debug)]
pub enum LuminaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Unsupported frame rank: {0}")]
    UnsupportedRank(usize),

    #[error("Unsupported pixel type: {0}")]
    UnsupportedDtype(String),

    #[error("Color channel {index} does not exist (frame has {channels} channels)")]
    InvalidChannel { index: i64, channels: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Filter error: {0}")]
    Filter(String),

    #[error("Source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, LuminaError>;
