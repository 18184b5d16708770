//! Worker statistics tracking

use crate::response::{ResponseCode, SampleOutcome};
use std::time::Instant;

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Number of successful samples
    pub completed: usize,

    /// Number of failed samples
    pub errors: usize,

    /// Failures while obtaining a connection
    pub connect_failures: usize,

    /// Failures while publishing
    pub publish_failures: usize,

    /// Total payload bytes published
    pub bytes_published: usize,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Total number of samples (completed + errors)
    pub fn total_samples(&self) -> usize {
        self.completed + self.errors
    }

    /// Success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_samples() == 0 {
            0.0
        } else {
            self.completed as f64 / self.total_samples() as f64
        }
    }

    /// Error rate (0.0 - 1.0)
    pub fn error_rate(&self) -> f64 {
        if self.total_samples() == 0 {
            0.0
        } else {
            1.0 - self.success_rate()
        }
    }

    /// Elapsed time since start
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Samples per second
    pub fn samples_per_second(&self) -> f64 {
        self.elapsed()
            .map(|d| {
                let secs = d.as_secs_f64();
                if secs > 0.0 {
                    self.total_samples() as f64 / secs
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0)
    }

    /// Fold one sample outcome into the counters
    pub fn record(&mut self, outcome: &SampleOutcome) {
        match outcome.response_code {
            ResponseCode::Ok => {
                self.completed += 1;
                self.bytes_published += outcome.payload_bytes;
            }
            ResponseCode::ConnectFailed => {
                self.errors += 1;
                self.connect_failures += 1;
            }
            ResponseCode::PublishFailed => {
                self.errors += 1;
                self.publish_failures += 1;
            }
        }
    }

    /// Merge stats from another worker
    pub fn merge(&mut self, other: &WorkerStats) {
        self.completed += other.completed;
        self.errors += other.errors;
        self.connect_failures += other.connect_failures;
        self.publish_failures += other.publish_failures;
        self.bytes_published += other.bytes_published;
    }
}
