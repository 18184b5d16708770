//! Orchestrator execution logic

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};

use crate::config::ExperimentConfig;
use crate::error::{BenchError, BenchResult};
use crate::metrics::SampleRecord;
use crate::request::SampleRequest;
use crate::traits::StopCondition;
use crate::worker::{
    CurrentOperation, InterruptHandle, PublishRateLimiter, SampleExecutor, WorkerBuilder,
    WorkerStats,
};

use super::aggregator::aggregate_worker_stats;

/// Orchestrator manages the experiment lifecycle
///
/// Responsible for spawning workers, coordinating shutdown and interrupts,
/// and collecting results. Every worker slot exists from construction on,
/// so interrupts can be issued from another task while [`run`] is pending.
///
/// [`run`]: Orchestrator::run
pub struct Orchestrator {
    /// Experiment configuration
    pub(crate) config: ExperimentConfig,

    /// Sample executor (cloned for each worker)
    pub(crate) executor: SampleExecutor,

    /// Request template; `{worker}` is substituted per worker
    pub(crate) request: SampleRequest,

    /// Record sender (cloned for each worker)
    pub(crate) records_tx: mpsc::Sender<SampleRecord>,

    /// In-flight slot per worker id
    pub(crate) slots: Vec<Arc<CurrentOperation>>,

    /// Publish rate limiter shared by all workers
    pub(crate) rate_limiter: PublishRateLimiter,

    /// Shutdown signal sender
    pub(crate) shutdown_tx: broadcast::Sender<()>,

    /// Shared sample counter for fair work distribution
    pub(crate) sample_counter: Arc<AtomicUsize>,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        config: ExperimentConfig,
        executor: SampleExecutor,
        request: SampleRequest,
        records_tx: mpsc::Sender<SampleRecord>,
    ) -> Self {
        let slots = (0..config.concurrency)
            .map(|_| Arc::new(CurrentOperation::new()))
            .collect();
        let rate_limiter = PublishRateLimiter::new(config.rate_limit);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            executor,
            request,
            records_tx,
            slots,
            rate_limiter,
            shutdown_tx,
            sample_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get a shutdown signal receiver
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Trigger shutdown of all workers
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get the experiment configuration
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Interrupt handle for worker `worker_id`
    pub fn interrupt_handle(&self, worker_id: usize) -> Option<InterruptHandle> {
        self.slots
            .get(worker_id)
            .map(|slot| InterruptHandle::new(worker_id, Arc::clone(slot)))
    }

    /// Interrupt handles for every worker, indexed by worker id
    pub fn interrupt_handles(&self) -> Vec<InterruptHandle> {
        (0..self.slots.len())
            .filter_map(|id| self.interrupt_handle(id))
            .collect()
    }

    /// Cancel the in-flight publish of one worker
    ///
    /// Returns whether a publish was in flight. Unknown ids are a no-op.
    pub fn interrupt_worker(&self, worker_id: usize) -> bool {
        self.interrupt_handle(worker_id)
            .map(|handle| handle.interrupt())
            .unwrap_or(false)
    }

    /// Cancel every in-flight publish; returns how many were cancelled
    pub fn interrupt_all(&self) -> usize {
        let interrupted = self
            .interrupt_handles()
            .iter()
            .filter(|handle| handle.interrupt())
            .count();
        tracing::info!(interrupted, "Interrupted in-flight publishes");
        interrupted
    }

    /// Run the experiment
    ///
    /// Spawns worker tasks, waits for completion, and returns per-worker stats.
    pub async fn run(&self) -> BenchResult<Vec<WorkerStats>> {
        let start = Instant::now();
        let mut handles = Vec::with_capacity(self.config.concurrency);

        // Determine total sample count for counter-based distribution
        let total_samples = match self.config.stop_condition {
            StopCondition::SampleCount(n) => Some(n),
            _ => None,
        };
        self.sample_counter.store(0, Ordering::SeqCst);

        tracing::info!(
            concurrency = self.config.concurrency,
            stop_condition = ?self.config.stop_condition,
            rate_limit = ?self.config.rate_limit,
            target = %self.request.label(),
            topic = %self.request.topic,
            "Starting experiment"
        );

        for (worker_id, slot) in self.slots.iter().enumerate() {
            let mut builder = WorkerBuilder::new(worker_id)
                .executor(self.executor.clone())
                .current(Arc::clone(slot))
                .request(self.request.clone())
                .records_tx(self.records_tx.clone())
                .rate_limiter(self.rate_limiter.clone())
                .stop_condition(self.config.stop_condition.clone())
                .concurrency(self.config.concurrency);

            if let Some(total) = total_samples {
                builder = builder.sample_counter(Arc::clone(&self.sample_counter), total);
            }

            let worker = builder.build()?;
            let shutdown_rx = self.shutdown_tx.subscribe();

            handles.push(tokio::spawn(async move { worker.run(shutdown_rx).await }));
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut worker_failures = 0;
        for (idx, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(stats)) => {
                    tracing::debug!(
                        worker_id = idx,
                        completed = stats.completed,
                        errors = stats.errors,
                        "Worker completed"
                    );
                    results.push(stats);
                }
                Ok(Err(e)) => {
                    worker_failures += 1;
                    tracing::error!(worker_id = idx, error = %e, "Worker returned error");
                }
                Err(e) => {
                    worker_failures += 1;
                    tracing::error!(worker_id = idx, error = %e, "Worker task panicked");
                }
            }
        }

        if results.is_empty() && worker_failures > 0 {
            return Err(BenchError::orchestration(format!(
                "All {} workers failed to complete",
                worker_failures
            )));
        }

        let elapsed = start.elapsed();
        let aggregated = aggregate_worker_stats(&results);
        tracing::info!(
            elapsed_secs = elapsed.as_secs_f64(),
            total_completed = aggregated.total_completed,
            total_errors = aggregated.total_errors,
            connect_failures = aggregated.connect_failures,
            publish_failures = aggregated.publish_failures,
            samples_per_second = aggregated.samples_per_second,
            "Experiment completed"
        );

        Ok(results)
    }

    /// Run with Ctrl+C signal handling
    ///
    /// The first Ctrl+C cancels in-flight publishes and triggers graceful
    /// shutdown.
    pub async fn run_with_signal_handling(&self) -> BenchResult<Vec<WorkerStats>> {
        let shutdown_tx = self.shutdown_tx.clone();
        let handles = self.interrupt_handles();

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
                    let _ = shutdown_tx.send(());
                    for handle in &handles {
                        handle.interrupt();
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        });

        let result = self.run().await;

        signal_handle.abort();

        result
    }

    /// Run with a timeout
    ///
    /// Automatically triggers shutdown when timeout is reached.
    pub async fn run_with_timeout(&self, timeout: Duration) -> BenchResult<Vec<WorkerStats>> {
        let shutdown_tx = self.shutdown_tx.clone();

        let timeout_handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::info!("Timeout reached, initiating shutdown...");
            let _ = shutdown_tx.send(());
        });

        let result = self.run().await;

        timeout_handle.abort();

        result
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .field("request", &self.request)
            .field("workers", &self.slots.len())
            .finish()
    }
}
