//! Builder pattern for Worker construction

use crate::error::{BenchError, BenchResult};
use crate::metrics::SampleRecord;
use crate::request::SampleRequest;
use crate::traits::StopCondition;

use super::current::CurrentOperation;
use super::executor::Worker;
use super::lifecycle::WorkerLifecycle;
use super::rate_limiter::PublishRateLimiter;
use super::sample::SampleExecutor;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .executor(executor)
///     .request(request)
///     .records_tx(tx)
///     .stop_condition(StopCondition::SampleCount(100))
///     .concurrency(10)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    executor: Option<SampleExecutor>,
    current: Option<Arc<CurrentOperation>>,
    request: Option<SampleRequest>,
    records_tx: Option<mpsc::Sender<SampleRecord>>,
    rate_limiter: PublishRateLimiter,
    stop_condition: Option<StopCondition>,
    concurrency: Option<usize>,
    sample_counter: Option<Arc<AtomicUsize>>,
    total_samples: Option<usize>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            executor: None,
            current: None,
            request: None,
            records_tx: None,
            rate_limiter: PublishRateLimiter::unlimited(),
            stop_condition: None,
            concurrency: None,
            sample_counter: None,
            total_samples: None,
        }
    }

    /// Set the sample executor
    pub fn executor(mut self, executor: SampleExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Use an in-flight slot created by the caller
    pub fn current(mut self, current: Arc<CurrentOperation>) -> Self {
        self.current = Some(current);
        self
    }

    /// Set the request the worker repeats
    ///
    /// A `{worker}` placeholder in the client id is replaced with the id.
    pub fn request(mut self, request: SampleRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Set the record channel sender
    pub fn records_tx(mut self, tx: mpsc::Sender<SampleRecord>) -> Self {
        self.records_tx = Some(tx);
        self
    }

    /// Share a rate limiter with other workers
    pub fn rate_limiter(mut self, limiter: PublishRateLimiter) -> Self {
        self.rate_limiter = limiter;
        self
    }

    /// Set the stop condition
    pub fn stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = Some(condition);
        self
    }

    /// Set the concurrency level
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Set a shared sample counter for fair work distribution
    pub fn sample_counter(mut self, counter: Arc<AtomicUsize>, total: usize) -> Self {
        self.sample_counter = Some(counter);
        self.total_samples = Some(total);
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing.
    pub fn build(self) -> BenchResult<Worker> {
        let executor = self
            .executor
            .ok_or(BenchError::missing_config("executor"))?;
        let request = self.request.ok_or(BenchError::missing_config("request"))?;
        let records_tx = self
            .records_tx
            .ok_or(BenchError::missing_config("records_tx"))?;
        let stop_condition = self
            .stop_condition
            .ok_or(BenchError::missing_config("stop_condition"))?;
        let concurrency = self
            .concurrency
            .ok_or(BenchError::missing_config("concurrency"))?;

        let current = self
            .current
            .unwrap_or_else(|| Arc::new(CurrentOperation::new()));
        let lifecycle = WorkerLifecycle::with_current(self.id, executor, current);

        let mut worker = Worker::new(
            self.id,
            lifecycle,
            request.for_worker(self.id),
            records_tx,
            self.rate_limiter,
            stop_condition,
            concurrency,
        );

        if let (Some(counter), Some(total)) = (self.sample_counter, self.total_samples) {
            worker = worker.with_sample_counter(counter, total);
        }

        Ok(worker)
    }
}
