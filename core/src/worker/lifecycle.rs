//! Worker start/end handling around the sample executor

use crate::cache::{CacheStats, ConnectionCache};
use crate::request::SampleRequest;
use crate::response::SampleOutcome;

use super::current::{CurrentOperation, InterruptHandle};
use super::sample::SampleExecutor;

use std::sync::Arc;

/// Binds a worker's connection cache and in-flight slot to its lifetime
///
/// The four operations a driver needs are [`on_worker_start`],
/// [`execute`], [`interrupt`] and [`on_worker_end`]. Dropping a started
/// lifecycle without ending it still retires every cached connection.
///
/// [`on_worker_start`]: WorkerLifecycle::on_worker_start
/// [`execute`]: WorkerLifecycle::execute
/// [`interrupt`]: WorkerLifecycle::interrupt
/// [`on_worker_end`]: WorkerLifecycle::on_worker_end
pub struct WorkerLifecycle {
    worker_id: usize,
    executor: SampleExecutor,
    current: Arc<CurrentOperation>,
    cache: Option<ConnectionCache>,
    first_sample: bool,
}

impl WorkerLifecycle {
    /// Lifecycle for `worker_id` with its own in-flight slot
    pub fn new(worker_id: usize, executor: SampleExecutor) -> Self {
        Self::with_current(worker_id, executor, Arc::new(CurrentOperation::new()))
    }

    /// Lifecycle using a slot created by the caller
    ///
    /// Lets an orchestrator hand out [`InterruptHandle`]s before the worker
    /// task exists.
    pub fn with_current(
        worker_id: usize,
        executor: SampleExecutor,
        current: Arc<CurrentOperation>,
    ) -> Self {
        Self {
            worker_id,
            executor,
            current,
            cache: None,
            first_sample: false,
        }
    }

    /// Allocate a fresh cache and an empty slot
    ///
    /// Calling it on a running worker ends the previous run first.
    pub fn on_worker_start(&mut self) {
        if self.cache.is_some() {
            self.on_worker_end();
        }
        tracing::debug!(worker_id = self.worker_id, "Worker started");
        self.current.clear();
        self.cache = Some(ConnectionCache::new(self.worker_id));
        self.first_sample = true;
    }

    /// Run one sample
    ///
    /// Starts the worker implicitly when [`on_worker_start`] was not called.
    ///
    /// [`on_worker_start`]: WorkerLifecycle::on_worker_start
    pub async fn execute(&mut self, request: &SampleRequest) -> SampleOutcome {
        if self.cache.is_none() {
            self.on_worker_start();
        }
        if self.first_sample {
            self.init_sampling(request);
            self.first_sample = false;
        }

        let worker_id = self.worker_id;
        let cache = self
            .cache
            .get_or_insert_with(|| ConnectionCache::new(worker_id));
        self.executor.execute(request, cache, &self.current).await
    }

    // Runs once per start, before the first sample.
    fn init_sampling(&self, request: &SampleRequest) {
        tracing::debug!(
            worker_id = self.worker_id,
            label = %request.label(),
            topic = %request.topic,
            "First sample"
        );
    }

    /// Cancel the in-flight publish, if any
    pub fn interrupt(&self) -> bool {
        self.interrupt_handle().interrupt()
    }

    /// Handle usable from other threads
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle::new(self.worker_id, Arc::clone(&self.current))
    }

    /// Retire every cached connection and discard the cache
    ///
    /// Safe to call more than once.
    pub fn on_worker_end(&mut self) {
        self.current.clear();
        if let Some(mut cache) = self.cache.take() {
            cache.retire_all();
            let stats = cache.stats();
            tracing::debug!(
                worker_id = self.worker_id,
                connects = stats.connects,
                reuses = stats.reuses,
                retired = stats.retired,
                retire_failures = stats.retire_failures,
                "Worker ended"
            );
        }
    }

    /// Whether the worker is between start and end
    pub fn is_running(&self) -> bool {
        self.cache.is_some()
    }

    /// Cache counters for the current run
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ConnectionCache::stats)
    }

    /// Number of cached connections
    pub fn cached_connections(&self) -> usize {
        self.cache.as_ref().map_or(0, ConnectionCache::len)
    }

    /// Worker id
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }
}

impl Drop for WorkerLifecycle {
    fn drop(&mut self) {
        self.on_worker_end();
    }
}

impl std::fmt::Debug for WorkerLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerLifecycle")
            .field("worker_id", &self.worker_id)
            .field("executor", &self.executor)
            .field("cache", &self.cache)
            .field("current", &self.current)
            .finish()
    }
}
