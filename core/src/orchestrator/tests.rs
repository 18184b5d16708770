//! Tests for the Orchestrator module

use super::aggregator::{aggregate_worker_stats, AggregatedStats};
use super::builder::OrchestratorBuilder;
use crate::channel::ChannelConfig;
use crate::codec::CodecKind;
use crate::config::ExperimentConfig;
use crate::request::SampleRequest;
use crate::response::ResponseCode;
use crate::testing::MockConnector;
use crate::traits::StopCondition;
use crate::worker::WorkerStats;

use std::sync::Arc;
use std::time::{Duration, Instant};

fn test_request() -> SampleRequest {
    SampleRequest::new("broker.local", "bench/load")
        .with_client_id("bench-{worker}")
        .with_message_body(r#"{"temp": 21}"#)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_aggregated_stats_default() {
    let stats = AggregatedStats::default();
    assert_eq!(stats.total_workers, 0);
    assert_eq!(stats.total_completed, 0);
    assert_eq!(stats.total_errors, 0);
    assert_eq!(stats.success_rate(), 0.0);
    assert_eq!(stats.error_rate(), 0.0);
}

#[test]
fn test_aggregated_stats_success_rate() {
    let stats = AggregatedStats {
        total_completed: 90,
        total_errors: 10,
        ..Default::default()
    };
    assert!((stats.success_rate() - 0.9).abs() < 0.001);
    assert!((stats.error_rate() - 0.1).abs() < 0.001);
}

#[test]
fn test_aggregate_worker_stats_empty() {
    let stats = aggregate_worker_stats(&[]);
    assert_eq!(stats.total_workers, 0);
    assert_eq!(stats.total_completed, 0);
}

#[test]
fn test_aggregate_worker_stats() {
    let mut s1 = WorkerStats::new();
    s1.completed = 50;
    s1.errors = 5;
    s1.connect_failures = 5;
    s1.bytes_published = 5000;
    s1.start();
    std::thread::sleep(Duration::from_millis(10));
    s1.stop();

    let mut s2 = WorkerStats::new();
    s2.completed = 50;
    s2.errors = 5;
    s2.publish_failures = 5;
    s2.bytes_published = 5000;
    s2.start();
    std::thread::sleep(Duration::from_millis(10));
    s2.stop();

    let aggregated = aggregate_worker_stats(&[s1, s2]);

    assert_eq!(aggregated.total_workers, 2);
    assert_eq!(aggregated.total_completed, 100);
    assert_eq!(aggregated.total_errors, 10);
    assert_eq!(aggregated.connect_failures, 5);
    assert_eq!(aggregated.publish_failures, 5);
    assert_eq!(aggregated.bytes_published, 10000);
    assert!(aggregated.total_duration >= Duration::from_millis(10));
    assert!(aggregated.samples_per_second > 0.0);
}

#[test]
fn test_builder_missing_connector() {
    let result = OrchestratorBuilder::new()
        .request(test_request())
        .concurrency(1)
        .build();

    assert!(result.unwrap_err().message.contains("connector"));
}

#[test]
fn test_builder_missing_request() {
    let result = OrchestratorBuilder::new()
        .connector(Arc::new(MockConnector::new()))
        .concurrency(1)
        .build();

    assert!(result.unwrap_err().message.contains("request"));
}

#[test]
fn test_builder_invalid_config() {
    let result = OrchestratorBuilder::new()
        .connector(Arc::new(MockConnector::new()))
        .request(test_request())
        .concurrency(0)
        .build();

    assert!(result.is_err());
}

#[test]
fn test_builder_invalid_request() {
    let result = OrchestratorBuilder::new()
        .connector(Arc::new(MockConnector::new()))
        .request(test_request().with_topic("sensors/+/temp"))
        .concurrency(1)
        .build();

    assert!(result.unwrap_err().message.contains("wildcard"));
}

// ============================================================================
// Integration Tests
// ============================================================================

#[tokio::test]
async fn test_orchestrator_run_basic() {
    let connector = Arc::new(MockConnector::new());

    let (orchestrator, mut records_rx) = OrchestratorBuilder::new()
        .connector(connector.clone())
        .request(test_request())
        .concurrency(2)
        .stop_condition(StopCondition::SampleCount(10))
        .build()
        .expect("Failed to build orchestrator");

    let drain_handle = tokio::spawn(async move {
        let mut count = 0;
        while records_rx.recv().await.is_some() {
            count += 1;
        }
        count
    });

    let stats = orchestrator.run().await.expect("Run failed");

    // Drop orchestrator to close the record channel
    drop(orchestrator);

    let record_count = drain_handle.await.expect("Drain task failed");

    assert_eq!(stats.len(), 2);
    let total: usize = stats.iter().map(|s| s.completed).sum();
    assert_eq!(total, 10);
    assert_eq!(record_count, 10);

    // One session per worker, all retired at the end
    assert!(connector.connect_count() <= 2);
    assert_eq!(connector.open_count(), 0);
}

#[tokio::test]
async fn test_orchestrator_small_record_channel_applies_backpressure() {
    let connector = Arc::new(MockConnector::new());

    let (orchestrator, mut records_rx) = OrchestratorBuilder::new()
        .connector(connector.clone())
        .request(test_request())
        .concurrency(3)
        .stop_condition(StopCondition::SampleCount(30))
        .channel_config(ChannelConfig::default().with_records_buffer(1))
        .build()
        .expect("Failed to build orchestrator");

    let drain_handle = tokio::spawn(async move {
        let mut count = 0;
        while records_rx.recv().await.is_some() {
            tokio::task::yield_now().await;
            count += 1;
        }
        count
    });

    let stats = orchestrator.run().await.expect("Run failed");
    drop(orchestrator);

    let total: usize = stats.iter().map(|s| s.completed).sum();
    assert_eq!(total, 30);
    assert_eq!(drain_handle.await.unwrap(), 30);
}

#[tokio::test]
async fn test_orchestrator_applies_experiment_defaults() {
    let connector = Arc::new(MockConnector::new());
    let config = ExperimentConfig::new(1)
        .with_stop_condition(StopCondition::SampleCount(3))
        .with_close_connection_default(true)
        .with_codec(CodecKind::Json);

    let (orchestrator, mut records_rx) = OrchestratorBuilder::new()
        .connector(connector.clone())
        .request(test_request())
        .config(config)
        .build()
        .unwrap();

    orchestrator.run().await.unwrap();
    drop(orchestrator);

    let mut records = Vec::new();
    while let Some(record) = records_rx.recv().await {
        records.push(record);
    }

    // Unset close flag resolved to the configured default
    assert_eq!(connector.connect_count(), 3);
    assert!(records[0].outcome.sampler_data.contains("Close: true"));
    // JSON codec compacts the body
    assert_eq!(records[0].outcome.payload_bytes, r#"{"temp":21}"#.len());
}

#[tokio::test]
async fn test_orchestrator_shutdown() {
    let connector = Arc::new(MockConnector::new().with_publish_delay(Duration::from_millis(50)));

    let (orchestrator, _records_rx) = OrchestratorBuilder::new()
        .connector(connector.clone())
        .request(test_request())
        .concurrency(2)
        .stop_condition(StopCondition::Indefinite)
        .build()
        .expect("Failed to build orchestrator");

    let shutdown_tx = orchestrator.shutdown_tx.clone();

    let run_handle = tokio::spawn(async move { orchestrator.run().await });

    tokio::time::sleep(Duration::from_millis(120)).await;
    let _ = shutdown_tx.send(());

    let stats = run_handle
        .await
        .expect("Run task panicked")
        .expect("Run failed");

    assert_eq!(stats.len(), 2);
    let total: usize = stats.iter().map(|s| s.completed).sum();
    assert!(total > 0);
    assert_eq!(connector.open_count(), 0);
}

#[tokio::test]
async fn test_orchestrator_with_timeout() {
    let connector = Arc::new(MockConnector::new().with_publish_delay(Duration::from_millis(20)));

    let (orchestrator, mut records_rx) = OrchestratorBuilder::new()
        .connector(connector)
        .request(test_request())
        .concurrency(2)
        .stop_condition(StopCondition::Indefinite)
        .build()
        .expect("Failed to build orchestrator");

    let drain_handle = tokio::spawn(async move { while records_rx.recv().await.is_some() {} });

    let start = Instant::now();
    let stats = orchestrator
        .run_with_timeout(Duration::from_millis(100))
        .await
        .expect("Run failed");
    let elapsed = start.elapsed();

    drop(orchestrator);
    let _ = drain_handle.await;

    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(300));

    let total: usize = stats.iter().map(|s| s.completed).sum();
    assert!(total > 0);
}

#[tokio::test]
async fn test_orchestrator_concurrency() {
    let connector = Arc::new(MockConnector::new().with_publish_delay(Duration::from_millis(50)));

    let (orchestrator, mut records_rx) = OrchestratorBuilder::new()
        .connector(connector)
        .request(test_request())
        .concurrency(5)
        .stop_condition(StopCondition::SampleCount(10))
        .build()
        .expect("Failed to build orchestrator");

    let drain_handle = tokio::spawn(async move { while records_rx.recv().await.is_some() {} });

    let start = Instant::now();
    let stats = orchestrator.run().await.expect("Run failed");
    let elapsed = start.elapsed();

    drop(orchestrator);
    let _ = drain_handle.await;

    // 5 workers, 10 samples at 50ms each: two rounds rather than ten
    assert!(elapsed < Duration::from_millis(300));
    assert_eq!(stats.len(), 5);
    let total: usize = stats.iter().map(|s| s.total_samples()).sum();
    assert_eq!(total, 10);
}

#[tokio::test]
async fn test_orchestrator_rate_limit() {
    let (orchestrator, mut records_rx) = OrchestratorBuilder::new()
        .connector(Arc::new(MockConnector::new()))
        .request(test_request())
        .concurrency(1)
        .stop_condition(StopCondition::SampleCount(5))
        .rate_limit(Some(100.0))
        .build()
        .expect("Failed to build orchestrator");

    let drain_handle = tokio::spawn(async move { while records_rx.recv().await.is_some() {} });

    let stats = orchestrator.run().await.expect("Run failed");

    drop(orchestrator);
    let _ = drain_handle.await;

    let total: usize = stats.iter().map(|s| s.completed).sum();
    assert_eq!(total, 5);
}

#[tokio::test]
async fn test_orchestrator_interrupt_all() {
    let connector = Arc::new(MockConnector::new().with_publish_delay(Duration::from_secs(30)));

    let (orchestrator, mut records_rx) = OrchestratorBuilder::new()
        .connector(connector.clone())
        .request(test_request())
        .concurrency(2)
        .stop_condition(StopCondition::Indefinite)
        .build()
        .expect("Failed to build orchestrator");
    let orchestrator = Arc::new(orchestrator);

    let runner = Arc::clone(&orchestrator);
    let run_handle = tokio::spawn(async move { runner.run().await });

    let handles = orchestrator.interrupt_handles();
    while !handles.iter().all(|h| h.is_active()) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(orchestrator.interrupt_all(), 2);

    for _ in 0..2 {
        let record = records_rx.recv().await.unwrap();
        assert_eq!(record.outcome.response_code, ResponseCode::PublishFailed);
    }

    orchestrator.shutdown();
    let stats = run_handle.await.unwrap().unwrap();

    let failures: usize = stats.iter().map(|s| s.publish_failures).sum();
    assert_eq!(failures, 2);
    assert_eq!(connector.open_count(), 0);
}

#[tokio::test]
async fn test_orchestrator_interrupt_worker() {
    let connector = Arc::new(MockConnector::new().with_publish_delay(Duration::from_secs(30)));

    let (orchestrator, mut records_rx) = OrchestratorBuilder::new()
        .connector(connector.clone())
        .request(test_request())
        .concurrency(2)
        .stop_condition(StopCondition::Indefinite)
        .build()
        .unwrap();
    let orchestrator = Arc::new(orchestrator);

    // Idle and unknown workers have nothing to interrupt
    assert!(!orchestrator.interrupt_worker(0));
    assert!(!orchestrator.interrupt_worker(99));
    assert!(orchestrator.interrupt_handle(99).is_none());

    let runner = Arc::clone(&orchestrator);
    let run_handle = tokio::spawn(async move { runner.run().await });

    let handles = orchestrator.interrupt_handles();
    while !handles.iter().all(|h| h.is_active()) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(orchestrator.interrupt_worker(1));

    let record = records_rx.recv().await.unwrap();
    assert_eq!(record.worker_id, 1);
    assert_eq!(record.outcome.response_code, ResponseCode::PublishFailed);
    assert!(handles[0].is_active());

    orchestrator.shutdown();
    let stats = run_handle.await.unwrap().unwrap();
    assert_eq!(stats.iter().map(|s| s.publish_failures).sum::<usize>(), 1);
}

#[tokio::test]
async fn test_orchestrator_debug_format() {
    let (orchestrator, _rx) = OrchestratorBuilder::new()
        .connector(Arc::new(MockConnector::new()))
        .request(test_request())
        .concurrency(1)
        .build()
        .expect("Failed to build");

    let debug = format!("{:?}", orchestrator);
    assert!(debug.contains("Orchestrator"));
    assert!(debug.contains("mock"));
    assert!(debug.contains("broker.local"));
}
