//! Consumers of sampler output
//!
//! A sink receives every [`Report`] a sampler produces. The sampler serializes
//! its ticks, so a sink never sees two `emit` calls from the same sampler at once.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::broadcast;
use tracing::{error, info, trace, warn};

use crate::{
    Resource,
    actors::messages::{ErrorReport, ForecastReport, HealthReport, Report},
    config::{Capability, Profile},
    monitors::resources::HealthStatus,
};

/// Anything that accepts sampler reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn emit(&self, report: &Report);
}

/// How a `ConsoleSink` renders reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleFormat {
    /// Human readable blocks
    Text { detailed: bool },

    /// One JSON object per line
    Json,
}

/// Writes reports to a text stream
pub struct ConsoleSink<W> {
    writer: Mutex<W>,
    format: ConsoleFormat,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout(format: ConsoleFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(writer: W, format: ConsoleFormat) -> Self {
        Self {
            writer: Mutex::new(writer),
            format,
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn render(&self, report: &Report) -> String {
        match self.format {
            ConsoleFormat::Text { detailed } => render_text(report, detailed),
            ConsoleFormat::Json => match serde_json::to_string(report) {
                Ok(line) => line + "\n",
                Err(e) => {
                    error!("failed to serialize report: {e}");
                    String::new()
                }
            },
        }
    }
}

#[async_trait]
impl<W: Write + Send> ReportSink for ConsoleSink<W> {
    async fn emit(&self, report: &Report) {
        let rendered = self.render(report);
        let Ok(mut writer) = self.writer.lock() else {
            error!("console writer poisoned, dropping report");
            return;
        };
        if let Err(e) = writer.write_all(rendered.as_bytes()) {
            error!("failed to write report: {e}");
            return;
        }
        if let Err(e) = writer.flush() {
            error!("failed to flush report: {e}");
        }
    }
}

/// Logs every report as a structured `tracing` event
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

#[async_trait]
impl ReportSink for TracingSink {
    async fn emit(&self, report: &Report) {
        match report {
            Report::Health(health) => {
                let alerts = join_resources(&health.triggered_alerts);
                match health.status {
                    HealthStatus::Healthy => info!(
                        cpu = health.readings.cpu,
                        memory = health.readings.memory,
                        disk = health.readings.disk,
                        status = %health.status,
                        "health check"
                    ),
                    HealthStatus::Warning => warn!(
                        cpu = health.readings.cpu,
                        memory = health.readings.memory,
                        disk = health.readings.disk,
                        status = %health.status,
                        alerts = %alerts,
                        "health check"
                    ),
                }
            }
            Report::Forecast(forecast) => info!(
                window_secs = forecast.window_secs,
                cpu = forecast.forecast.cpu,
                memory = forecast.forecast.memory,
                traffic = ?forecast.forecast.traffic,
                confidence = forecast.forecast.confidence,
                alerts = %join_resources(&forecast.predictive_alerts),
                "forecast"
            ),
            Report::Error(err) => warn!(origin = ?err.origin, message = %err.message, "degraded tick"),
        }
    }
}

/// Fans reports out to any number of subscribers
///
/// Slow subscribers may lag and miss reports; this is acceptable for live output.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: broadcast::Sender<Report>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Report> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl ReportSink for ChannelSink {
    async fn emit(&self, report: &Report) {
        match self.sender.send(report.clone()) {
            Ok(receivers) => trace!("published report to {receivers} receivers"),
            Err(_) => trace!("no receivers for report (this is OK)"),
        }
    }
}

fn label(resource: Resource) -> &'static str {
    match resource {
        Resource::Cpu => "CPU",
        Resource::Memory => "Memory",
        Resource::Disk => "Disk",
    }
}

fn join_resources(resources: &[Resource]) -> String {
    resources
        .iter()
        .map(Resource::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Human readable rendering of a report
pub fn render_text(report: &Report, detailed: bool) -> String {
    match report {
        Report::Health(health) => render_health(health, detailed),
        Report::Forecast(forecast) => render_forecast(forecast),
        Report::Error(err) => render_error(err),
    }
}

fn render_health(report: &HealthReport, detailed: bool) -> String {
    let timestamp = format_timestamp(report.timestamp);
    let mut out = String::new();

    if detailed {
        let _ = writeln!(out, "\n[{timestamp}] === DETAILED HEALTH CHECK ===");
        let _ = writeln!(out, "Alert threshold: {}%", report.threshold);
    } else {
        let _ = writeln!(out, "[{timestamp}] Checking system health...");
    }

    for resource in Resource::ALL {
        let value = report.readings.value(resource);
        if report.triggered_alerts.contains(&resource) {
            let _ = writeln!(
                out,
                "⚠ {} usage: {value:.2}% (above {}%)",
                label(resource),
                report.threshold
            );
        } else {
            let _ = writeln!(out, "✓ {} usage: {value:.2}%", label(resource));
        }
    }

    match report.status {
        HealthStatus::Healthy => {
            let _ = writeln!(out, "System Status: HEALTHY");
        }
        HealthStatus::Warning => {
            let _ = writeln!(
                out,
                "System Status: WARNING - high resource usage ({})",
                join_resources(&report.triggered_alerts)
            );
        }
    }
    out
}

fn render_forecast(report: &ForecastReport) -> String {
    let forecast = &report.forecast;
    let confidence = forecast.confidence;
    let mut out = String::new();

    let _ = writeln!(out, "\nPredicted metrics in {}s:", report.window_secs);
    let _ = writeln!(out, "   CPU: {:.2}% (confidence: {confidence:.2}%)", forecast.cpu);
    let _ = writeln!(
        out,
        "   Memory: {:.2}% (confidence: {confidence:.2}%)",
        forecast.memory
    );
    if let Some(traffic) = forecast.traffic {
        let _ = writeln!(
            out,
            "   Traffic: {traffic:.0} req/s (confidence: {confidence:.2}%)"
        );
    }
    for resource in &report.predictive_alerts {
        let _ = writeln!(out, "⚠ PREDICTIVE ALERT: high {resource} expected");
    }
    out
}

fn render_error(report: &ErrorReport) -> String {
    format!(
        "[{}] Health check degraded: {}\n",
        format_timestamp(report.timestamp),
        report.message
    )
}

/// Startup banner describing the resolved profile
pub fn render_banner(profile: &Profile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=================================");
    let _ = writeln!(out, "Environment Monitor");
    let _ = writeln!(out, "Environment: {}", profile.name());
    if profile.has(Capability::AiEnabled) {
        let _ = writeln!(out, "AI-Powered Predictive Monitoring ENABLED");
    } else {
        let debug = if profile.has(Capability::DebugMode) {
            "ENABLED"
        } else {
            "DISABLED"
        };
        let _ = writeln!(out, "Debug: {debug}");
    }
    let _ = writeln!(out, "=================================");
    let _ = writeln!(out, "Monitoring interval: {}ms", profile.interval().as_millis());
    let _ = writeln!(out, "Alert threshold: {}%", profile.alert_threshold());
    if let Some(window) = profile.predictive_window() {
        let _ = writeln!(out, "AI predictions: {}s ahead", window.horizon.as_secs());
    }
    out
}
