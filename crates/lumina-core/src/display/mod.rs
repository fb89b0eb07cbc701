pub mod geometry;
pub mod report;
pub mod scaling;
pub mod stats;

pub use geometry::{apply_transform, AxisOp, CoordinateFlags, Transform};
pub use report::{StatsReport, Telemetry};
pub use scaling::{scale, ScalingKind};
pub use stats::{clip_outlier_max, compute_statistics, Statistics, StatsRequest};
