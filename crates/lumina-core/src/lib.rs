pub mod consts;
pub mod display;
pub mod error;
pub mod filters;
pub mod frame;
pub mod io;
pub mod merge;
pub mod pipeline;
pub mod prepare;
pub mod source;
pub mod window;
