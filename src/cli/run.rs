//! The `run` command

use anyhow::{Context, Result};
use mqtt_bench_broker::RumqttConnector;
use mqtt_bench_core::{
    aggregate_worker_stats, AggregatedStats, MetricsCollector, MetricsSummary,
    OrchestratorBuilder, ResponseCode,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::{BenchConfig, RunArgs};

/// What `--output` writes
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    config: &'a BenchConfig,
    workers: AggregatedStats,
    summary: MetricsSummary,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config = BenchConfig::from_args(&args)?;
    config.validate()?;

    let connector =
        RumqttConnector::new(config.broker.clone()).context("invalid broker options")?;

    let (orchestrator, mut records_rx) = OrchestratorBuilder::new()
        .config(config.experiment.clone())
        .connector(Arc::new(connector))
        .request(config.request.clone())
        .build()?;

    let mut metrics = MetricsCollector::new()?;
    let collector = tokio::spawn(async move {
        while let Some(record) = records_rx.recv().await {
            metrics.record(&record);
        }
        metrics
    });

    let started = Instant::now();
    let stats = orchestrator.run_with_signal_handling().await?;
    let elapsed = started.elapsed();

    // Closes the record channel so the collector finishes
    drop(orchestrator);
    let metrics = collector.await.context("record collector failed")?;

    let workers = aggregate_worker_stats(&stats);
    let summary = metrics.summary(elapsed);
    print_summary(&config, &summary);

    if let Some(path) = &args.output {
        let report = RunReport {
            config: &config,
            workers,
            summary,
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report written");
    }

    Ok(())
}

fn print_summary(config: &BenchConfig, summary: &MetricsSummary) {
    println!();
    println!("Target:       {} ({})", config.request.label(), config.request.topic);
    println!(
        "Samples:      {} ({} ok, {} connect failed, {} publish failed)",
        summary.total_samples,
        summary.count(ResponseCode::Ok),
        summary.count(ResponseCode::ConnectFailed),
        summary.count(ResponseCode::PublishFailed)
    );
    println!("Error rate:   {:.2}%", summary.error_rate * 100.0);
    println!(
        "Throughput:   {:.1} samples/s, {:.1} bytes/s",
        summary.samples_per_second, summary.bytes_per_second
    );
    println!(
        "Connect (ms): p50 {:.2}  p95 {:.2}  p99 {:.2}  max {:.2}",
        summary.connect.p50, summary.connect.p95, summary.connect.p99, summary.connect.max
    );
    println!(
        "Latency (ms): p50 {:.2}  p95 {:.2}  p99 {:.2}  max {:.2}",
        summary.latency.p50, summary.latency.p95, summary.latency.p99, summary.latency.max
    );
    println!("Duration:     {:.2}s", summary.total_duration_secs);
}
