//! HealthSampler - periodic health checks with threshold alerting
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → MetricSource → evaluate against threshold → Report → sink
//!     ↑
//!     ├─── Forecast timer (AiEnabled profiles) → ForecastSource → Report → sink
//!     └─── Commands (SampleNow, Shutdown)
//! ```
//!
//! Both timers and all commands are served by one task, so ticks never overlap
//! and the sink is never written to concurrently by the same sampler.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, instrument, trace, warn};

use crate::{
    MetricReading, Resource,
    config::{Profile, ProfileName},
    error::{ForecastError, MetricSourceError},
    monitors::{
        ForecastSource, MetricSource,
        resources::{HealthStatus, exceeding_resources, exceeds},
    },
    sink::ReportSink,
};

use super::messages::{
    ErrorOrigin, ErrorReport, ForecastReport, HealthReport, Report, SamplerCommand, SamplerState,
};

/// Samples a metric source and judges the readings against a profile
pub struct HealthSampler {
    profile: Profile,
    source: Arc<dyn MetricSource>,
    forecaster: Option<Arc<dyn ForecastSource>>,
}

impl HealthSampler {
    pub fn new(profile: Profile, source: Arc<dyn MetricSource>) -> Self {
        Self {
            profile,
            source,
            forecaster: None,
        }
    }

    /// Attach the collaborator used by the forecasting timer
    pub fn with_forecaster(mut self, forecaster: Arc<dyn ForecastSource>) -> Self {
        self.forecaster = Some(forecaster);
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Take one reading from the metric source
    pub async fn sample(&self) -> Result<MetricReading, MetricSourceError> {
        let reading = self.source.get_readings().await?;
        reading.validate()?;
        Ok(reading)
    }

    /// Judge a reading against the profile's alert threshold
    pub fn evaluate(&self, reading: MetricReading) -> HealthReport {
        let threshold = self.profile.alert_threshold();
        let triggered_alerts = exceeding_resources(&reading, threshold);

        HealthReport {
            timestamp: reading.timestamp,
            profile: self.profile.name(),
            readings: reading,
            status: HealthStatus::from_alerts(&triggered_alerts),
            triggered_alerts,
            threshold,
        }
    }

    /// One health tick: `evaluate(sample())`, or a degraded-tick notice
    pub async fn tick(&self) -> Report {
        match self.sample().await {
            Ok(reading) => {
                let report = self.evaluate(reading);
                trace!(
                    "max usage {:.2}% (threshold {}%) -> {}",
                    reading.max_usage(),
                    report.threshold,
                    report.status
                );
                Report::Health(report)
            }
            Err(e) => {
                warn!("metric source failed: {e}");
                Report::Error(ErrorReport {
                    timestamp: Utc::now(),
                    origin: ErrorOrigin::Metrics,
                    message: e.to_string(),
                })
            }
        }
    }

    /// One forecasting tick
    ///
    /// Returns `None` when the profile or sampler has no forecasting configured.
    pub async fn forecast(&self) -> Option<Result<ForecastReport, ForecastError>> {
        let window = self.profile.predictive_window()?;
        let forecaster = self.forecaster.as_ref()?;

        let result = forecaster.predict(window.horizon).await.map(|forecast| {
            let threshold = self.profile.alert_threshold();
            let predictive_alerts = [
                (Resource::Cpu, forecast.cpu),
                (Resource::Memory, forecast.memory),
            ]
            .into_iter()
            .filter(|(_, value)| exceeds(*value, threshold))
            .map(|(resource, _)| resource)
            .collect();

            ForecastReport {
                timestamp: Utc::now(),
                window_secs: window.horizon.as_secs(),
                forecast,
                predictive_alerts,
            }
        });
        Some(result)
    }

    fn forecasting_enabled(&self) -> bool {
        self.forecaster.is_some() && self.profile.predictive_window().is_some()
    }

    /// Start sampling in the background
    ///
    /// The first health tick fires immediately, then every profile interval.
    pub fn spawn(self, sink: Arc<dyn ReportSink>) -> SamplerHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(SamplerState::Idle);
        let (report_tx, report_rx) = watch::channel(None);

        let profile = self.profile.name();
        let actor = SamplerActor {
            sampler: self,
            sink,
            command_rx: cmd_rx,
            state_tx,
            report_tx,
        };

        tokio::spawn(actor.run());

        SamplerHandle {
            sender: cmd_tx,
            state_rx,
            report_rx,
            profile,
        }
    }

    /// Sample until `cancel` resolves, then stop
    pub async fn run<F>(self, sink: Arc<dyn ReportSink>, cancel: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let handle = self.spawn(sink);
        cancel.await;
        handle.shutdown().await
    }
}

/// Task owning a `HealthSampler` while it runs
struct SamplerActor {
    sampler: HealthSampler,

    /// Destination of every report
    sink: Arc<dyn ReportSink>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<SamplerCommand>,

    state_tx: watch::Sender<SamplerState>,

    /// Latest health report, readable from handles
    report_tx: watch::Sender<Option<HealthReport>>,
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => futures::future::pending::<()>().await,
    }
}

fn ticker(period: std::time::Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

impl SamplerActor {
    /// Run the actor's main loop
    ///
    /// This runs until:
    /// - A Shutdown command is received
    /// - Every handle has been dropped
    ///
    /// Commands are polled first, so once a shutdown is queued no further
    /// tick starts.
    #[instrument(skip(self), fields(profile = %self.sampler.profile.name()))]
    async fn run(mut self) {
        let profile = &self.sampler.profile;
        debug!(
            "starting sampler: interval {:?}, threshold {}%",
            profile.interval(),
            profile.alert_threshold()
        );
        self.state_tx.send_replace(SamplerState::Running);

        let mut health_ticker = ticker(profile.interval());
        let mut forecast_ticker = profile
            .predictive_window()
            .filter(|_| self.sampler.forecasting_enabled())
            .map(|window| ticker(window.interval));

        let mut acknowledge = None;

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SamplerCommand::SampleNow { respond_to }) => {
                            debug!("received SampleNow command");
                            let report = self.health_tick().await;
                            let _ = respond_to.send(report);
                        }

                        Some(SamplerCommand::Shutdown { respond_to }) => {
                            debug!("received shutdown command");
                            acknowledge = Some(respond_to);
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = health_ticker.tick() => {
                    self.health_tick().await;
                }

                _ = next_tick(&mut forecast_ticker) => {
                    self.forecast_tick().await;
                }
            }
        }

        self.state_tx.send_replace(SamplerState::Stopped);
        if let Some(acknowledge) = acknowledge {
            let _ = acknowledge.send(());
        }

        // shutdowns queued behind the first one are acknowledged too
        self.command_rx.close();
        while let Ok(cmd) = self.command_rx.try_recv() {
            if let SamplerCommand::Shutdown { respond_to } = cmd {
                let _ = respond_to.send(());
            }
        }
        debug!("sampler stopped");
    }

    async fn health_tick(&self) -> Report {
        let report = self.sampler.tick().await;
        if let Report::Health(health) = &report {
            self.report_tx.send_replace(Some(health.clone()));
        }
        self.sink.emit(&report).await;
        report
    }

    async fn forecast_tick(&self) {
        match self.sampler.forecast().await {
            Some(Ok(report)) => self.sink.emit(&Report::Forecast(report)).await,
            Some(Err(e)) => warn!("forecast skipped: {e}"),
            None => {}
        }
    }
}

/// Handle for controlling a running sampler
///
/// It can be cloned and shared across tasks. The sampler stops when
/// `shutdown` is called or every handle is dropped.
#[derive(Clone)]
pub struct SamplerHandle {
    /// Command sender
    sender: mpsc::Sender<SamplerCommand>,

    state_rx: watch::Receiver<SamplerState>,

    report_rx: watch::Receiver<Option<HealthReport>>,

    /// Profile the sampler runs under
    pub profile: ProfileName,
}

impl SamplerHandle {
    /// Run one health tick now and return its report
    ///
    /// The report is also forwarded to the sink.
    #[instrument(skip(self), fields(profile = %self.profile))]
    pub async fn sample_now(&self) -> Result<Report> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SamplerCommand::SampleNow { respond_to: tx })
            .await
            .context("failed to send SampleNow command")?;

        rx.await.context("failed to receive report")
    }

    /// Stop the sampler
    ///
    /// Resolves once the sampler is `Stopped`; nothing is emitted afterwards.
    /// Safe to call from several clones at once.
    #[instrument(skip(self), fields(profile = %self.profile))]
    pub async fn shutdown(&self) -> Result<()> {
        if self.state() == SamplerState::Stopped {
            return Ok(());
        }

        let (tx, rx) = oneshot::channel();
        let acknowledged = match self
            .sender
            .send(SamplerCommand::Shutdown { respond_to: tx })
            .await
        {
            Ok(()) => rx.await.is_ok(),
            Err(_) => false,
        };

        if !acknowledged {
            // another shutdown won the race and the actor dropped our command
            debug!("shutdown not acknowledged, waiting for sampler to stop");
            self.stopped().await;
            if self.state() != SamplerState::Stopped {
                anyhow::bail!("sampler exited without stopping");
            }
        }
        Ok(())
    }

    /// Wait until the sampler has stopped
    pub async fn stopped(&self) {
        let mut state_rx = self.state_rx.clone();
        let _ = state_rx
            .wait_for(|state| *state == SamplerState::Stopped)
            .await;
    }

    pub fn state(&self) -> SamplerState {
        *self.state_rx.borrow()
    }

    /// Most recent health report, if any tick succeeded yet
    pub fn last_report(&self) -> Option<HealthReport> {
        self.report_rx.borrow().clone()
    }
}
