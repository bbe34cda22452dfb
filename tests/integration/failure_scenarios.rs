//! Failure tests: degraded ticks must not stop sampling

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use assert_matches::assert_matches;
use env_monitor::{
    ErrorReport, HealthSampler, MetricReading, MetricSourceError, PredictiveWindow, Profile,
    ProfileName, Report, SamplerState, actors::messages::ErrorOrigin, sink::ChannelSink,
};
use tokio_test::assert_ok;

use crate::helpers::*;

#[tokio::test]
async fn test_failed_tick_does_not_prevent_next_tick() {
    let source = ScriptedSource::new(vec![
        Err(MetricSourceError::Unavailable("collector restarting".into())),
        Ok(MetricReading::new(30.0, 30.0, 30.0)),
    ]);
    let sampler = HealthSampler::new(idle_profile(), source.clone());
    let sink = ChannelSink::new(16);
    let mut reports = sink.subscribe();
    let handle = sampler.spawn(Arc::new(sink));

    // immediate first tick hits the failure
    let first = tokio::time::timeout(Duration::from_secs(1), reports.recv())
        .await
        .unwrap()
        .unwrap();
    assert_matches!(
        first,
        Report::Error(ErrorReport { origin: ErrorOrigin::Metrics, ref message, .. })
            if message.contains("collector restarting")
    );
    assert_eq!(handle.state(), SamplerState::Running);

    let second = assert_ok!(handle.sample_now().await);
    assert!(second.as_health().is_some());
    assert_eq!(source.calls(), 2);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_timer_recovers_after_failure() {
    let source = ScriptedSource::new(vec![
        Err(MetricSourceError::Unavailable("flaky".into())),
        Ok(MetricReading::new(30.0, 30.0, 30.0)),
        Ok(MetricReading::new(31.0, 30.0, 30.0)),
    ]);
    let sampler = HealthSampler::new(fast_profile(10), source);
    let sink = CollectingSink::new();
    let handle = sampler.spawn(sink.clone());

    assert!(wait_until(Duration::from_secs(2), || sink.count() >= 3).await);
    handle.shutdown().await.unwrap();

    let reports = sink.reports();
    assert_matches!(reports[0], Report::Error(_));
    assert!(reports[1].as_health().is_some());
    assert!(reports[2].as_health().is_some());
}

#[tokio::test]
async fn test_persistent_failures_keep_sampling() {
    let source = ScriptedSource::new(vec![]);
    let sampler = HealthSampler::new(fast_profile(10), source.clone());
    let sink = CollectingSink::new();
    let handle = sampler.spawn(sink.clone());

    assert!(wait_until(Duration::from_secs(2), || sink.count() >= 3).await);
    assert_eq!(handle.state(), SamplerState::Running);
    assert!(handle.last_report().is_none());
    assert!(
        sink.reports()
            .iter()
            .all(|report| matches!(report, Report::Error(_)))
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_reading_is_degraded_tick() {
    let source = ScriptedSource::new(vec![Ok(MetricReading::new(30.0, 130.0, 30.0))]);
    let sampler = HealthSampler::new(idle_profile(), source);
    let handle = sampler.spawn(CollectingSink::new());

    // whichever tick takes the invalid reading, no health report comes out
    let report = assert_ok!(handle.sample_now().await);
    assert_matches!(report, Report::Error(_));
    assert!(handle.last_report().is_none());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_forecast_failure_skips_only_the_forecast() {
    let profile = Profile::for_name(ProfileName::Experimental)
        .with_interval(Duration::from_millis(10))
        .with_predictive_window(PredictiveWindow {
            horizon: Duration::from_secs(300),
            interval: Duration::from_millis(10),
        });
    let forecaster = FailingForecaster::new();
    let sampler = HealthSampler::new(profile, Arc::new(SteadySource(20.0, 20.0, 20.0)))
        .with_forecaster(forecaster.clone());
    let sink = CollectingSink::new();
    let handle = sampler.spawn(sink.clone());

    assert!(
        wait_until(Duration::from_secs(2), || {
            forecaster.calls.load(Ordering::SeqCst) >= 3 && sink.count() >= 3
        })
        .await
    );
    handle.shutdown().await.unwrap();

    let reports = sink.reports();
    assert!(reports.iter().all(|report| report.as_health().is_some()));
}
