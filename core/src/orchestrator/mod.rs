//! Orchestrator for experiment lifecycle management
//!
//! The Orchestrator coordinates a complete load run:
//! - Spawning one worker task per concurrency slot
//! - Sharing one publish rate limiter across workers
//! - Managing graceful shutdown via a broadcast channel
//! - Interrupting in-flight publishes per worker or all at once
//! - Collecting results from all workers
//!
//! # Example
//!
//! ```ignore
//! use mqtt_bench_core::{OrchestratorBuilder, StopCondition};
//!
//! let (orchestrator, records_rx) = OrchestratorBuilder::new()
//!     .concurrency(10)
//!     .stop_condition(StopCondition::SampleCount(1000))
//!     .connector(connector)
//!     .request(request)
//!     .build()?;
//!
//! let stats = orchestrator.run_with_signal_handling().await?;
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{aggregate_worker_stats, AggregatedStats};
pub use builder::OrchestratorBuilder;
pub use executor::Orchestrator;

#[cfg(test)]
mod tests;
