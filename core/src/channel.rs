//! Sizing of the worker -> collector record channel
//!
//! The channel is bounded: when the collector falls behind, workers block on
//! `send` instead of queueing records without limit.

use crate::metrics::SampleRecord;
use tokio::sync::mpsc;

/// Record channel sizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Fixed capacity; `None` scales with the number of workers
    pub records_buffer: Option<usize>,
}

impl ChannelConfig {
    /// Records each worker may have in flight before it blocks
    pub const PER_WORKER: usize = 256;
    /// Lower bound for the scaled capacity
    pub const MIN_BUFFER: usize = 1_024;
    /// Upper bound for the scaled capacity
    pub const MAX_BUFFER: usize = 65_536;

    /// Pin the capacity; zero is treated as one
    pub fn with_records_buffer(mut self, size: usize) -> Self {
        self.records_buffer = Some(size.max(1));
        self
    }

    /// Capacity for an experiment with `concurrency` workers
    pub fn capacity(&self, concurrency: usize) -> usize {
        match self.records_buffer {
            Some(size) => size,
            None => concurrency
                .saturating_mul(Self::PER_WORKER)
                .clamp(Self::MIN_BUFFER, Self::MAX_BUFFER),
        }
    }

    /// Open the channel
    pub fn open(
        &self,
        concurrency: usize,
    ) -> (mpsc::Sender<SampleRecord>, mpsc::Receiver<SampleRecord>) {
        mpsc::channel(self.capacity(concurrency))
    }
}
