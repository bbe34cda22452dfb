use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use env_monitor::{
    HealthSampler,
    config::{Capability, Profile},
    monitors::{forecast::TrendForecaster, system::SystemMetricSource},
    sink::{ConsoleFormat, ConsoleSink, ReportSink, TracingSink, render_banner},
    util::get_environment,
};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Human readable console output
    Text,
    /// One JSON report per line
    Json,
    /// Structured log events on stderr
    Log,
}

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Periodic health sampler with environment profiles")]
struct Args {
    /// Profile to run (production, development, experimental).
    /// Defaults to MONITOR_ENV, then NODE_ENV, then production.
    #[arg(short, long)]
    env: Option<String>,

    /// Sampling interval in seconds, overriding the profile
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Run a single health check and exit
    #[arg(long)]
    once: bool,

    /// Debug logging regardless of profile
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![("env_monitor", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("unable to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("interrupt received, stopping");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let environment = args.env.clone().unwrap_or_else(get_environment);
    let mut profile = Profile::resolve(&environment)
        .with_context(|| format!("cannot start monitor for environment '{environment}'"))?;
    if let Some(secs) = args.interval {
        profile = profile.with_interval(Duration::from_secs(secs));
    }

    init(args.verbose || profile.has(Capability::VerboseLogging));
    trace!("started with args: {args:?}");

    let sink: Arc<dyn ReportSink> = match args.format {
        Format::Text => {
            print!("{}", render_banner(&profile));
            Arc::new(ConsoleSink::stdout(ConsoleFormat::Text {
                detailed: profile.has(Capability::DebugMode),
            }))
        }
        Format::Json => Arc::new(ConsoleSink::stdout(ConsoleFormat::Json)),
        Format::Log => {
            info!(profile = %profile.name(), interval = ?profile.interval(), "starting monitor");
            Arc::new(TracingSink)
        }
    };

    let source = Arc::new(SystemMetricSource::new());
    let mut sampler = HealthSampler::new(profile.clone(), source.clone());
    if profile.predictive_window().is_some() {
        sampler = sampler.with_forecaster(Arc::new(TrendForecaster::new(source)));
    }

    if args.once {
        let report = sampler.tick().await;
        sink.emit(&report).await;
        return Ok(());
    }

    sampler.run(sink, interrupted()).await
}
