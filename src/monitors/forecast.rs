//! Trend-based forecasting over recent readings

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::{Forecast, MetricReading, Resource, error::ForecastError};

use super::{ForecastSource, MetricSource};

const DEFAULT_HISTORY: usize = 10;

const MIN_HISTORY: usize = 2;

/// Extrapolates cpu and memory along a least-squares line
///
/// Every prediction takes a fresh reading from the wrapped source and keeps the
/// last `capacity` readings. Confidence is the share of the history that is
/// filled, so it grows as the forecaster warms up. There is no traffic signal.
pub struct TrendForecaster {
    source: Arc<dyn MetricSource>,
    history: Mutex<VecDeque<MetricReading>>,
    capacity: usize,
}

impl TrendForecaster {
    pub fn new(source: Arc<dyn MetricSource>) -> Self {
        Self::with_capacity(source, DEFAULT_HISTORY)
    }

    pub fn with_capacity(source: Arc<dyn MetricSource>, capacity: usize) -> Self {
        let capacity = capacity.max(MIN_HISTORY);
        Self {
            source,
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn record(&self, reading: MetricReading) -> Result<Vec<MetricReading>, ForecastError> {
        let mut history = self
            .history
            .lock()
            .map_err(|_| ForecastError::Unavailable("history poisoned".to_string()))?;
        if history.len() == self.capacity {
            history.pop_front();
        }
        history.push_back(reading);
        Ok(history.iter().copied().collect())
    }
}

/// Least-squares estimate of `resource` at `window` past the newest reading
fn extrapolate(history: &[MetricReading], resource: Resource, window: Duration) -> f64 {
    let origin = history[0].timestamp;
    let points: Vec<(f64, f64)> = history
        .iter()
        .map(|reading| {
            let x = (reading.timestamp - origin).num_milliseconds() as f64 / 1000.0;
            (x, reading.value(resource))
        })
        .collect();

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let variance = points.iter().map(|(x, _)| (x - mean_x).powi(2)).sum::<f64>();
    let slope = if variance > f64::EPSILON {
        points
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum::<f64>()
            / variance
    } else {
        0.0
    };

    let last_x = points.last().map(|(x, _)| *x).unwrap_or_default();
    let target = last_x + window.as_secs_f64();
    (mean_y + slope * (target - mean_x)).clamp(0.0, 100.0)
}

#[async_trait]
impl ForecastSource for TrendForecaster {
    #[instrument(skip(self))]
    async fn predict(&self, window: Duration) -> Result<Forecast, ForecastError> {
        let reading = self.source.get_readings().await?;
        reading.validate()?;
        let history = self.record(reading)?;

        if history.len() < MIN_HISTORY {
            return Err(ForecastError::InsufficientData {
                needed: MIN_HISTORY,
                available: history.len(),
            });
        }

        let forecast = Forecast {
            cpu: extrapolate(&history, Resource::Cpu, window),
            memory: extrapolate(&history, Resource::Memory, window),
            traffic: None,
            confidence: history.len() as f64 / self.capacity as f64 * 100.0,
        };
        debug!("forecast from {} readings: {forecast:?}", history.len());
        Ok(forecast)
    }
}
