/// Minimum element count to use Rayon parallelism in frame reductions.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Name reported by a source when its payload carries an error message
/// instead of pixel data.
pub const ERROR_MARKER: &str = "__ERROR__";

/// Lower clip bound applied before the base-10 logarithm in log scaling.
pub const LOG_SCALE_FLOOR: f64 = 10e-3;

/// Number of standard deviations above the mean beyond which the reported
/// maximum is treated as an outlier and clipped.
pub const OUTLIER_SIGMA: f64 = 10.0;

/// Topic prefix of the "alive" telemetry message.
pub const ALIVE_TOPIC: u32 = 10001;

/// Number of polling intervals a coordinator waits for a source per tick.
pub const SOURCE_RETRY_BUDGET: u32 = 100;

/// Default source refresh period in seconds.
pub const DEFAULT_REFRESH_RATE: f64 = 0.2;

/// Number of planes in a pseudo-RGB frame.
pub const RGB_PLANES: usize = 3;

/// Metadata key asking channel reductions to ignore the first channel.
pub const SKIP_FIRST_KEY: &str = "skipfirst";

/// Metadata key carrying human-readable channel labels.
pub const CHANNEL_LABELS_KEY: &str = "channellabels";
