//! Frame preparation: channel composition, background subtraction and masking.

pub mod background;
pub mod channel;
pub mod mask;

pub use background::subtract_background;
pub use channel::{compose, ChannelMode, Composed, DEFAULT_RGB};
pub use mask::{apply_high_value_mask, apply_mask, MaskFill, MaskFrame};
