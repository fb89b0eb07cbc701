use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::consts::ALIVE_TOPIC;
use crate::error::Result;

use super::scaling::ScalingKind;
use super::stats::Statistics;

/// Statistics formatted for the statistics display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub max: String,
    pub mean: String,
    pub variance: String,
    pub min: String,
    pub max_raw: String,
    /// Scaling the values refer to.
    pub scaling: String,
}

impl StatsReport {
    /// Format `stats`, with the outlier clip applied to the maximum. Values
    /// computed before intensity scaling are labelled `linear` whatever
    /// scaling is displayed.
    pub fn new(stats: &Statistics, scaling: ScalingKind, without_scaling: bool) -> Self {
        let scaling = if without_scaling {
            ScalingKind::Linear
        } else {
            scaling
        };
        Self {
            max: format!("{:.4}", stats.clipped_max()),
            mean: format!("{:.4}", stats.mean),
            variance: format!("{:.4}", stats.variance),
            min: format!("{:.3}", stats.min),
            max_raw: format!("{:.4}", stats.max_raw),
            scaling: scaling.to_string(),
        }
    }
}

/// Message published on the telemetry stream.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Telemetry {
    Start {
        calctime: f64,
        pid: u32,
    },
    Stop {
        calctime: f64,
        pid: u32,
    },
    Alive {
        calctime: f64,
        maxval: String,
        maxrawval: String,
        minval: String,
        meanval: String,
        pid: u32,
        scaling: String,
    },
}

impl Telemetry {
    pub fn start() -> Self {
        Self::Start {
            calctime: now(),
            pid: std::process::id(),
        }
    }

    pub fn stop() -> Self {
        Self::Stop {
            calctime: now(),
            pid: std::process::id(),
        }
    }

    pub fn alive(report: &StatsReport) -> Self {
        Self::Alive {
            calctime: now(),
            maxval: report.max.clone(),
            maxrawval: report.max_raw.clone(),
            minval: report.min.clone(),
            meanval: report.mean.clone(),
            pid: std::process::id(),
            scaling: report.scaling.clone(),
        }
    }

    /// Wire form: the topic number, a space and the JSON document.
    pub fn to_message(&self) -> Result<String> {
        Ok(format!("{ALIVE_TOPIC} {}", serde_json::to_string(self)?))
    }
}

/// Seconds since the Unix epoch.
fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}
