pub mod actors;
pub mod config;
pub mod error;
pub mod monitors;
pub mod sink;
pub mod util;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use actors::messages::{ErrorReport, ForecastReport, HealthReport, Report, SamplerState};
pub use actors::sampler::{HealthSampler, SamplerHandle};
pub use config::{Capability, PredictiveWindow, Profile, ProfileName};
pub use error::{ForecastError, MetricSourceError, ProfileError};
pub use monitors::{ForecastSource, MetricSource};
pub use monitors::resources::HealthStatus;

/// A resource the sampler tracks as a utilisation percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Cpu,
    Memory,
    Disk,
}

impl Resource {
    /// All resources, in the order alerts are reported
    pub const ALL: [Resource; 3] = [Resource::Cpu, Resource::Memory, Resource::Disk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Cpu => "cpu",
            Resource::Memory => "memory",
            Resource::Disk => "disk",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One snapshot of resource utilisation, all values in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub timestamp: DateTime<Utc>,
}

impl MetricReading {
    /// Create a reading stamped with the current time
    pub fn new(cpu: f64, memory: f64, disk: f64) -> Self {
        Self {
            cpu,
            memory,
            disk,
            timestamp: Utc::now(),
        }
    }

    pub fn value(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Cpu => self.cpu,
            Resource::Memory => self.memory,
            Resource::Disk => self.disk,
        }
    }

    /// Highest utilisation across all resources
    pub fn max_usage(&self) -> f64 {
        self.cpu.max(self.memory).max(self.disk)
    }

    /// Check that every value is a percentage
    pub fn validate(&self) -> Result<(), MetricSourceError> {
        for resource in Resource::ALL {
            let value = self.value(resource);
            if !(0.0..=100.0).contains(&value) {
                return Err(MetricSourceError::InvalidReading { resource, value });
            }
        }
        Ok(())
    }
}

/// Predicted utilisation at the end of a forecast window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub cpu: f64,
    pub memory: f64,

    /// Requests per second, when the forecaster has a traffic signal
    pub traffic: Option<f64>,

    /// Confidence in percent
    pub confidence: f64,
}
