//! Message types for the sampler actor
//!
//! ## Design Principles
//!
//! 1. **Reports**: everything the sampler produces reaches a sink as a [`Report`]
//! 2. **Commands**: control messages sent to the actor via mpsc
//! 3. **Immutability**: reports are cloneable for multi-subscriber sinks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{
    Forecast, MetricReading, Resource, config::ProfileName, monitors::resources::HealthStatus,
};

/// Per-tick verdict of the sampler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,

    /// Profile the report was evaluated under
    pub profile: ProfileName,

    pub readings: MetricReading,

    pub status: HealthStatus,

    /// Resources above the threshold, in cpu, memory, disk order
    pub triggered_alerts: Vec<Resource>,

    /// Threshold the readings were compared against
    pub threshold: f64,
}

/// Output of one forecasting tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub timestamp: DateTime<Utc>,

    /// How far ahead the forecast looks
    pub window_secs: u64,

    pub forecast: Forecast,

    /// Forecast resources expected to cross the threshold
    pub predictive_alerts: Vec<Resource>,
}

/// Where a degraded tick originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
    Metrics,
}

/// Notice that a tick could not produce a health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub timestamp: DateTime<Utc>,
    pub origin: ErrorOrigin,
    pub message: String,
}

/// Anything a sampler forwards to a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Report {
    Health(HealthReport),
    Forecast(ForecastReport),
    Error(ErrorReport),
}

impl Report {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Report::Health(report) => report.timestamp,
            Report::Forecast(report) => report.timestamp,
            Report::Error(report) => report.timestamp,
        }
    }

    pub fn as_health(&self) -> Option<&HealthReport> {
        match self {
            Report::Health(report) => Some(report),
            _ => None,
        }
    }
}

/// Lifecycle of a sampler
///
/// ```text
/// Idle ──run──▶ Running ──cancel──▶ Stopped
/// ```
///
/// There is no way back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplerState {
    Idle,
    Running,
    Stopped,
}

/// Commands that can be sent to a running sampler
#[derive(Debug)]
pub enum SamplerCommand {
    /// Run one health tick immediately (bypassing the interval timer)
    SampleNow {
        /// Channel to send the emitted report back
        respond_to: oneshot::Sender<Report>,
    },

    /// Stop the sampler
    ///
    /// A tick in progress finishes first; no tick fires after the acknowledgement.
    Shutdown { respond_to: oneshot::Sender<()> },
}
