//! Result aggregation from multiple workers

use std::time::Duration;

use serde::Serialize;

use crate::worker::WorkerStats;

/// Aggregated statistics from all workers
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedStats {
    /// Number of workers that completed
    pub total_workers: usize,

    /// Total successful samples
    pub total_completed: usize,

    /// Total failed samples
    pub total_errors: usize,

    /// Samples that could not obtain a connection
    pub connect_failures: usize,

    /// Samples whose publish failed
    pub publish_failures: usize,

    /// Total payload bytes published
    pub bytes_published: usize,

    /// Maximum duration across all workers
    pub total_duration: Duration,

    /// Overall samples per second
    pub samples_per_second: f64,

    /// Overall payload bytes per second
    pub bytes_per_second: f64,
}

impl AggregatedStats {
    /// Get the total number of samples (completed + errors)
    pub fn total_samples(&self) -> usize {
        self.total_completed + self.total_errors
    }

    /// Get the success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        let total = self.total_samples();
        if total > 0 {
            self.total_completed as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Get the error rate (0.0 - 1.0)
    pub fn error_rate(&self) -> f64 {
        if self.total_samples() == 0 {
            0.0
        } else {
            1.0 - self.success_rate()
        }
    }
}

/// Aggregate statistics from multiple workers
pub fn aggregate_worker_stats(stats: &[WorkerStats]) -> AggregatedStats {
    if stats.is_empty() {
        return AggregatedStats::default();
    }

    let mut totals = WorkerStats::new();
    for worker in stats {
        totals.merge(worker);
    }

    // Workers run in parallel, so the slowest one bounds the experiment
    let total_duration = stats
        .iter()
        .filter_map(|s| s.elapsed())
        .max()
        .unwrap_or(Duration::ZERO);

    let secs = total_duration.as_secs_f64();
    let rate_multiplier = if secs > 0.0 { 1.0 / secs } else { 0.0 };

    AggregatedStats {
        total_workers: stats.len(),
        total_completed: totals.completed,
        total_errors: totals.errors,
        connect_failures: totals.connect_failures,
        publish_failures: totals.publish_failures,
        bytes_published: totals.bytes_published,
        total_duration,
        samples_per_second: totals.total_samples() as f64 * rate_multiplier,
        bytes_per_second: totals.bytes_published as f64 * rate_multiplier,
    }
}
