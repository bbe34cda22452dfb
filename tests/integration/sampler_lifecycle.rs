//! Lifecycle tests: ticking, reporting and cancellation

use std::sync::Arc;
use std::time::Duration;

use env_monitor::{
    HealthSampler, HealthStatus, MetricReading, Report, Resource, SamplerState, sink::ChannelSink,
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_cpu_over_threshold_is_warning() {
    let sampler = HealthSampler::new(idle_profile(), Arc::new(SteadySource(85.0, 40.0, 50.0)));
    let sink = ChannelSink::new(16);
    let mut reports = sink.subscribe();
    let handle = sampler.spawn(Arc::new(sink));

    let report = tokio::time::timeout(Duration::from_secs(1), reports.recv())
        .await
        .unwrap()
        .unwrap();
    let health = report.as_health().expect("health report");
    assert_eq!(health.threshold, 80.0);
    assert_eq!(health.status, HealthStatus::Warning);
    assert_eq!(health.triggered_alerts, vec![Resource::Cpu]);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_readings_below_threshold_are_healthy() {
    let sampler = HealthSampler::new(idle_profile(), Arc::new(SteadySource(50.0, 40.0, 50.0)));
    let sink = CollectingSink::new();
    let handle = sampler.spawn(sink.clone());

    let report = handle.sample_now().await.unwrap();
    let health = report.as_health().expect("health report");
    assert_eq!(health.status, HealthStatus::Healthy);
    assert!(health.triggered_alerts.is_empty());
    assert_eq!(handle.last_report().as_ref(), Some(health));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_first_tick_is_immediate_then_periodic() {
    let sampler = HealthSampler::new(fast_profile(10), Arc::new(SteadySource(10.0, 10.0, 10.0)));
    let sink = CollectingSink::new();
    let handle = sampler.spawn(sink.clone());

    assert!(wait_until(Duration::from_secs(1), || sink.count() >= 1).await);
    assert!(wait_until(Duration::from_secs(2), || sink.count() >= 4).await);
    assert!(sink.reports().iter().all(|report| report.as_health().is_some()));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_no_reports_after_shutdown() {
    let interval = Duration::from_millis(20);
    let sampler = HealthSampler::new(fast_profile(20), Arc::new(SteadySource(10.0, 10.0, 10.0)));
    let sink = CollectingSink::new();
    let handle = sampler.spawn(sink.clone());

    assert!(wait_until(Duration::from_secs(1), || sink.count() >= 2).await);

    handle.shutdown().await.unwrap();
    assert_eq!(handle.state(), SamplerState::Stopped);
    let emitted = sink.count();

    tokio::time::sleep(interval * 3).await;
    assert_eq!(sink.count(), emitted);
}

#[tokio::test]
async fn test_shutdown_waits_for_tick_in_progress() {
    let source = SlowSource::new(Duration::from_millis(100));
    let sampler = HealthSampler::new(idle_profile(), source.clone());
    let sink = CollectingSink::new();
    let handle = sampler.spawn(sink.clone());

    // the immediate tick is blocked inside the source
    assert!(wait_until(Duration::from_secs(1), || source.in_flight() == 1).await);
    assert_eq!(sink.count(), 0);

    handle.shutdown().await.unwrap();
    assert_eq!(handle.state(), SamplerState::Stopped);
    assert_eq!(sink.count(), 1);
    assert!(sink.reports()[0].as_health().is_some());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(sink.count(), 1);
    assert_eq!(source.in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_during_sample_now_delivers_its_report() {
    let source = SlowSource::new(Duration::from_millis(100));
    let sampler = HealthSampler::new(idle_profile(), source.clone());
    let sink = CollectingSink::new();
    let handle = sampler.spawn(sink.clone());

    // let the immediate tick finish so the next one is the requested sample
    assert!(wait_until(Duration::from_secs(1), || sink.count() == 1).await);

    let requester = handle.clone();
    let request = tokio::spawn(async move { requester.sample_now().await });
    assert!(wait_until(Duration::from_secs(1), || source.in_flight() == 1).await);

    handle.shutdown().await.unwrap();
    assert_eq!(sink.count(), 2);

    let report = request.await.unwrap().unwrap();
    assert!(report.as_health().is_some());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(sink.count(), 2);
}

#[tokio::test]
async fn test_dropping_handles_stops_sampler() {
    let sampler = HealthSampler::new(fast_profile(10), Arc::new(SteadySource(10.0, 10.0, 10.0)));
    let sink = CollectingSink::new();
    let handle = sampler.spawn(sink.clone());
    assert!(wait_until(Duration::from_secs(1), || sink.count() >= 1).await);

    drop(handle);
    tokio::time::sleep(Duration::from_millis(30)).await;
    let emitted = sink.count();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.count(), emitted);
}

#[tokio::test]
async fn test_run_until_cancelled() {
    let sampler = HealthSampler::new(fast_profile(10), Arc::new(SteadySource(10.0, 10.0, 10.0)));
    let sink = CollectingSink::new();

    sampler
        .run(sink.clone(), tokio::time::sleep(Duration::from_millis(60)))
        .await
        .unwrap();

    let emitted = sink.count();
    assert!(emitted >= 1);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(sink.count(), emitted);
}

#[tokio::test]
async fn test_stopped_resolves_after_shutdown() {
    let sampler = HealthSampler::new(idle_profile(), Arc::new(SteadySource(10.0, 10.0, 10.0)));
    let handle = sampler.spawn(CollectingSink::new());

    let waiter = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.stopped().await })
    };

    handle.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_report_timestamp_matches_reading() {
    let sampler = HealthSampler::new(idle_profile(), Arc::new(SteadySource(10.0, 10.0, 10.0)));
    let reading = MetricReading::new(30.0, 20.0, 10.0);

    let report = sampler.evaluate(reading);
    assert_eq!(report.timestamp, reading.timestamp);
    assert_eq!(Report::Health(report.clone()).timestamp(), reading.timestamp);
}
