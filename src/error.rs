//! Error types for profile resolution and the sampler's collaborators

use std::fmt;

use crate::Resource;

/// Errors raised while resolving a monitoring profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    /// The environment name matches none of the known profiles
    Unknown(String),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::Unknown(name) => write!(
                f,
                "unknown profile '{}' (expected production, development or experimental)",
                name
            ),
        }
    }
}

impl std::error::Error for ProfileError {}

/// Errors a `MetricSource` can report for a single sampling tick
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSourceError {
    /// The source could not produce a reading at all
    Unavailable(String),

    /// The source produced a value that is not a percentage
    InvalidReading { resource: Resource, value: f64 },
}

impl fmt::Display for MetricSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricSourceError::Unavailable(msg) => write!(f, "metric source unavailable: {}", msg),
            MetricSourceError::InvalidReading { resource, value } => {
                write!(f, "invalid {} reading: {} is not within 0-100%", resource, value)
            }
        }
    }
}

impl std::error::Error for MetricSourceError {}

/// Errors a `ForecastSource` can report
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Not enough history has been gathered yet
    InsufficientData { needed: usize, available: usize },

    /// The readings backing the forecast could not be gathered
    Source(MetricSourceError),

    /// Any other forecaster failure
    Unavailable(String),
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastError::InsufficientData { needed, available } => write!(
                f,
                "not enough history to forecast: need {} readings, have {}",
                needed, available
            ),
            ForecastError::Source(err) => write!(f, "forecast input failed: {}", err),
            ForecastError::Unavailable(msg) => write!(f, "forecaster unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ForecastError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ForecastError::Source(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MetricSourceError> for ForecastError {
    fn from(err: MetricSourceError) -> Self {
        ForecastError::Source(err)
    }
}
