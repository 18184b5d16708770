//! Worker module for executing publish samples
//!
//! A Worker runs the loop **claim -> publish -> report -> repeat**. Each
//! Worker is a tokio task that exclusively owns:
//!
//! 1. A [`WorkerLifecycle`] holding its connection cache
//! 2. A [`CurrentOperation`] slot naming the connection currently publishing
//!
//! Per sample it waits on the shared [`PublishRateLimiter`], runs the
//! [`SampleExecutor`] against its cache, folds the outcome into
//! [`WorkerStats`] and sends a record to the aggregator. Other tasks or
//! threads cancel the in-flight publish through an [`InterruptHandle`].
//!
//! # Example
//!
//! ```ignore
//! use mqtt_bench_core::worker::{SampleExecutor, WorkerBuilder};
//! use mqtt_bench_core::traits::StopCondition;
//!
//! let worker = WorkerBuilder::new(0)
//!     .executor(SampleExecutor::new(connector, codec))
//!     .request(request)
//!     .records_tx(tx)
//!     .stop_condition(StopCondition::SampleCount(100))
//!     .concurrency(10)
//!     .build()?;
//!
//! let stats = worker.run(shutdown_rx).await?;
//! println!("Completed: {}", stats.completed);
//! ```

mod builder;
mod current;
mod executor;
mod lifecycle;
mod rate_limiter;
mod sample;
mod stats;

pub use builder::WorkerBuilder;
pub use current::{CurrentGuard, CurrentOperation, InterruptHandle};
pub use executor::Worker;
pub use lifecycle::WorkerLifecycle;
pub use rate_limiter::PublishRateLimiter;
pub use sample::SampleExecutor;
pub use stats::WorkerStats;
