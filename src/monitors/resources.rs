use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{MetricReading, Resource};

/// Verdict of a single health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Warning,
}

impl HealthStatus {
    pub fn from_alerts(alerts: &[Resource]) -> HealthStatus {
        if alerts.is_empty() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Warning
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => f.write_str("HEALTHY"),
            HealthStatus::Warning => f.write_str("WARNING"),
        }
    }
}

/// Whether a value is over the alert threshold
///
/// A value exactly at the threshold does not alert.
pub fn exceeds(value: f64, threshold: f64) -> bool {
    value > threshold
}

/// Resources of `reading` above `threshold`, in cpu, memory, disk order
pub fn exceeding_resources(reading: &MetricReading, threshold: f64) -> Vec<Resource> {
    Resource::ALL
        .into_iter()
        .filter(|resource| exceeds(reading.value(*resource), threshold))
        .collect()
}
