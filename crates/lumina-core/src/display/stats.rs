use ndarray::ArrayD;
use rayon::prelude::*;
use serde::Serialize;

use crate::consts::{OUTLIER_SIGMA, PARALLEL_PIXEL_THRESHOLD};
use crate::frame::{with_frame, Frame, Pixel};

/// Which statistics a tick has to compute.
///
/// Unrequested values are reported as `0.0`, so consumers that are switched
/// off cost no reductions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsRequest {
    pub max: bool,
    pub mean: bool,
    pub variance: bool,
    pub min: bool,
    pub max_raw: bool,
    pub max_scaled: bool,
}

impl StatsRequest {
    pub fn all() -> Self {
        Self {
            max: true,
            mean: true,
            variance: true,
            min: true,
            max_raw: true,
            max_scaled: true,
        }
    }

    /// Reductions needed by the active consumers: the telemetry stream, the
    /// statistics display (optionally with variance) and auto-levelling.
    pub fn for_consumers(stream: bool, display: bool, calc_variance: bool, auto_levels: bool) -> Self {
        Self {
            max: stream || display,
            mean: stream || display,
            variance: display && calc_variance,
            min: stream || auto_levels,
            max_raw: stream,
            max_scaled: auto_levels,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub max: f64,
    pub mean: f64,
    pub variance: f64,
    pub min: f64,
    pub max_raw: f64,
    pub max_scaled: f64,
}

impl Statistics {
    /// Maximum with outliers above `mean + 10·σ` clipped.
    pub fn clipped_max(&self) -> f64 {
        clip_outlier_max(self.max, self.mean, self.variance)
    }

    /// `(low, high)` levels for auto-levelling the scaled display frame.
    pub fn auto_levels(&self) -> (f64, f64) {
        (self.min, self.max_scaled)
    }
}

/// Replace `max` by `mean + 10·sqrt(variance)` when it exceeds that bound.
///
/// A variance that was not computed (zero) or is NaN leaves `max` alone.
pub fn clip_outlier_max(max: f64, mean: f64, variance: f64) -> f64 {
    if variance.is_nan() || variance <= 0.0 {
        return max;
    }
    let bound = mean + OUTLIER_SIGMA * variance.sqrt();
    if max > bound {
        bound
    } else {
        max
    }
}

/// Compute the requested statistics of one tick.
///
/// With `use_prescale` the max/mean/variance describe the display frame
/// before intensity scaling, otherwise the scaled frame. `min` always comes
/// from the scaled frame and `max_raw` from the channel-composed frame.
/// NaN entries are ignored. Absent or empty frames yield all zeros.
pub fn compute_statistics(
    pre_scale: Option<&Frame>,
    post_scale: Option<&Frame>,
    raw_grey: Option<&Frame>,
    want: &StatsRequest,
    use_prescale: bool,
) -> Statistics {
    let mut stats = Statistics::default();
    match (pre_scale, post_scale) {
        (Some(pre), _) if use_prescale && !pre.is_empty() => {
            let summary = summarize(pre, want.variance);
            if want.max {
                stats.max = summary.max();
            }
            if want.mean {
                stats.mean = summary.mean();
            }
            if want.variance {
                stats.variance = summary.variance();
            }
            if want.max_scaled {
                stats.max_scaled = post_scale.map_or(0.0, |f| summarize(f, false).max());
            }
        }
        (_, Some(post)) if !use_prescale && !post.is_empty() => {
            let summary = summarize(post, want.variance);
            if want.max || want.max_scaled {
                stats.max = summary.max();
            }
            if want.mean {
                stats.mean = summary.mean();
            }
            if want.variance {
                stats.variance = summary.variance();
            }
            stats.max_scaled = stats.max;
        }
        _ => return stats,
    }
    if want.max_raw {
        stats.max_raw = raw_grey.map_or(0.0, |f| summarize(f, false).max());
    }
    if want.min {
        stats.min = post_scale.map_or(0.0, |f| summarize(f, false).min());
    }
    stats
}

/// NaN-aware running summary of a frame.
#[derive(Clone, Copy, Debug)]
struct Summary {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
    sq_dev: f64,
}

impl Summary {
    fn empty() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sq_dev: 0.0,
        }
    }

    fn push(mut self, v: f64) -> Self {
        if !v.is_nan() {
            self.count += 1;
            self.sum += v;
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self
    }

    fn combine(self, other: Self) -> Self {
        Self {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            sq_dev: self.sq_dev + other.sq_dev,
        }
    }

    fn max(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.max
        }
    }

    fn min(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.min
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sum / self.count as f64
        }
    }

    /// Population variance, as `numpy.nanvar` with `ddof=0`.
    fn variance(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.sq_dev / self.count as f64
        }
    }
}

fn summarize(frame: &Frame, with_variance: bool) -> Summary {
    with_frame!(frame, a => summarize_array(a, with_variance))
}

fn summarize_array<T: Pixel>(a: &ArrayD<T>, with_variance: bool) -> Summary {
    let parallel = a.len() >= PARALLEL_PIXEL_THRESHOLD;
    let contiguous = a.as_slice_memory_order();

    let mut summary = match (parallel, contiguous) {
        (true, Some(values)) => values
            .par_iter()
            .fold(Summary::empty, |s, v| s.push(v.as_f64()))
            .reduce(Summary::empty, Summary::combine),
        _ => a.iter().fold(Summary::empty(), |s, v| s.push(v.as_f64())),
    };

    if with_variance && summary.count > 0 {
        let mean = summary.mean();
        let sq_dev = |v: &T| {
            let v = v.as_f64();
            if v.is_nan() {
                0.0
            } else {
                (v - mean) * (v - mean)
            }
        };
        summary.sq_dev = match (parallel, contiguous) {
            (true, Some(values)) => values.par_iter().map(sq_dev).sum(),
            _ => a.iter().map(sq_dev).sum(),
        };
    }
    summary
}
