//! Worker execution loop

use crate::error::BenchResult;
use crate::metrics::SampleRecord;
use crate::request::SampleRequest;
use crate::traits::StopCondition;

use super::current::InterruptHandle;
use super::lifecycle::WorkerLifecycle;
use super::rate_limiter::PublishRateLimiter;
use super::stats::WorkerStats;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Worker executes samples in a loop: claim -> publish -> report -> repeat
///
/// Each worker owns its lifecycle (and with it its connection cache), so
/// workers never contend for connections. Outcomes go to the aggregator
/// through an mpsc channel.
pub struct Worker {
    /// Unique worker identifier
    id: usize,

    /// Cache, in-flight slot and sample executor
    lifecycle: WorkerLifecycle,

    /// Request this worker repeats
    request: SampleRequest,

    /// Channel sender for sample records
    records_tx: mpsc::Sender<SampleRecord>,

    /// Rate limiter (shared across workers)
    rate_limiter: PublishRateLimiter,

    /// Stop condition
    stop_condition: StopCondition,

    /// Concurrency level (for per-worker sample counts)
    concurrency: usize,

    /// Shared sample counter for fair distribution
    sample_counter: Option<Arc<AtomicUsize>>,

    /// Total samples (when using counter-based distribution)
    total_samples: Option<usize>,
}

impl Worker {
    /// Create a new worker
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        lifecycle: WorkerLifecycle,
        request: SampleRequest,
        records_tx: mpsc::Sender<SampleRecord>,
        rate_limiter: PublishRateLimiter,
        stop_condition: StopCondition,
        concurrency: usize,
    ) -> Self {
        Self {
            id,
            lifecycle,
            request,
            records_tx,
            rate_limiter,
            stop_condition,
            concurrency,
            sample_counter: None,
            total_samples: None,
        }
    }

    /// Claim samples from a counter shared with the other workers
    ///
    /// Guarantees exactly `total_samples` run even when the total does not
    /// divide evenly by the concurrency.
    pub fn with_sample_counter(mut self, counter: Arc<AtomicUsize>, total_samples: usize) -> Self {
        self.sample_counter = Some(counter);
        self.total_samples = Some(total_samples);
        self
    }

    /// Handle for cancelling this worker's in-flight publish
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.lifecycle.interrupt_handle()
    }

    /// Run the worker loop
    ///
    /// Returns WorkerStats when the stop condition is met or the shutdown
    /// signal fires. Cached connections are retired in both cases.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> BenchResult<WorkerStats> {
        let mut stats = WorkerStats::new();
        stats.start();
        self.lifecycle.on_worker_start();

        let mut sequence = 0u64;
        loop {
            if self.should_stop(&stats) {
                tracing::debug!(
                    worker_id = self.id,
                    completed = stats.completed,
                    errors = stats.errors,
                    "Worker reached stop condition"
                );
                break;
            }

            if !self.try_claim_sample() {
                tracing::debug!(worker_id = self.id, "No more samples to claim, worker stopping");
                break;
            }

            let outcome = tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    tracing::debug!(worker_id = self.id, "Worker received shutdown signal");
                    break;
                }

                outcome = async {
                    self.rate_limiter.wait().await;
                    self.lifecycle.execute(&self.request).await
                } => outcome,
            };

            stats.record(&outcome);
            if outcome.is_error() {
                tracing::debug!(
                    worker_id = self.id,
                    code = %outcome.response_code,
                    error = %outcome.message,
                    "Sample failed"
                );
            }

            let record = SampleRecord {
                worker_id: self.id,
                sequence,
                outcome,
            };
            sequence += 1;

            if self.records_tx.send(record).await.is_err() {
                tracing::debug!(worker_id = self.id, "Record channel closed, worker stopping");
                break;
            }
        }

        self.lifecycle.on_worker_end();
        stats.stop();
        tracing::debug!(
            worker_id = self.id,
            completed = stats.completed,
            errors = stats.errors,
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        Ok(stats)
    }

    /// Try to claim a sample slot from the shared counter
    ///
    /// Always succeeds without counter-based distribution.
    fn try_claim_sample(&self) -> bool {
        if let (Some(counter), Some(total)) = (&self.sample_counter, self.total_samples) {
            let claimed = counter.fetch_add(1, Ordering::SeqCst);
            if claimed >= total {
                // Over-claimed near the limit; give the slot back.
                counter.fetch_sub(1, Ordering::SeqCst);
                return false;
            }
            true
        } else {
            true
        }
    }

    /// Check if the worker should stop based on stop condition
    fn should_stop(&self, stats: &WorkerStats) -> bool {
        match &self.stop_condition {
            StopCondition::SampleCount(total) => {
                // With a shared counter the limit is enforced by try_claim_sample.
                if self.sample_counter.is_some() {
                    false
                } else {
                    stats.total_samples() >= self.sample_share(*total)
                }
            }
            StopCondition::Duration(duration) => stats
                .started_at
                .map(|start| start.elapsed() >= *duration)
                .unwrap_or(false),
            StopCondition::Indefinite => false,
        }
    }

    /// This worker's part of `total` when there is no shared counter
    ///
    /// The remainder goes to the lowest ids, so workers `0..concurrency`
    /// together run exactly `total` samples.
    fn sample_share(&self, total: usize) -> usize {
        let concurrency = self.concurrency.max(1);
        let extra = usize::from(self.id % concurrency < total % concurrency);
        total / concurrency + extra
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle)
            .field("request", &self.request)
            .field("rate_limiter", &self.rate_limiter)
            .field("stop_condition", &self.stop_condition)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
