//! Collaborators the sampler gathers data from
//!
//! The sampler never measures anything itself. Readings come from a
//! [`MetricSource`] and predictions from a [`ForecastSource`], so both can be
//! backed by real instrumentation or by a test double.

pub mod forecast;
pub mod resources;
pub mod system;

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    Forecast, MetricReading,
    error::{ForecastError, MetricSourceError},
};

/// Source of resource utilisation readings
///
/// Implementations must be `Send + Sync` as they are shared with the sampler task.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Take one snapshot of cpu, memory and disk utilisation
    async fn get_readings(&self) -> Result<MetricReading, MetricSourceError>;
}

/// Predicts utilisation some time ahead
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Forecast the utilisation `window` from now
    async fn predict(&self, window: Duration) -> Result<Forecast, ForecastError>;
}
