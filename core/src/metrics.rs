//! Metrics aggregation and percentile calculation
//!
//! Records are folded into a [`MetricsCollector`] as they arrive, so memory
//! stays flat no matter how long an experiment runs.

use crate::response::{ResponseCode, SampleOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// One executed sample as delivered to the aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Worker that ran the sample
    pub worker_id: usize,
    /// Position in the worker's sample sequence
    pub sequence: u64,
    /// What happened
    pub outcome: SampleOutcome,
}

/// Metrics setup failure
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Histogram bounds were rejected
    #[error("failed to create histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

/// Summary statistics for an experiment
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetricsSummary {
    /// Total samples executed
    pub total_samples: usize,
    /// Samples that published successfully
    pub successful_samples: usize,
    /// Samples that failed
    pub failed_samples: usize,
    /// Error rate (0.0 - 1.0)
    pub error_rate: f64,

    /// Sample count per response code
    pub response_codes: BTreeMap<ResponseCode, usize>,

    /// Total payload bytes published
    pub total_bytes: usize,

    /// Samples per second
    pub samples_per_second: f64,
    /// Payload bytes per second
    pub bytes_per_second: f64,

    /// Connect time percentiles (milliseconds)
    pub connect: LatencyPercentiles,
    /// End-to-end latency percentiles (milliseconds)
    pub latency: LatencyPercentiles,

    /// Total duration in seconds
    pub total_duration_secs: f64,
}

impl MetricsSummary {
    /// Samples that ended with `code`
    pub fn count(&self, code: ResponseCode) -> usize {
        self.response_codes.get(&code).copied().unwrap_or(0)
    }
}

/// Running totals over a stream of [`SampleRecord`]s
///
/// Keeps one counter per response code and two histograms; nothing grows
/// with the number of samples.
#[derive(Debug)]
pub struct MetricsCollector {
    total_samples: usize,
    successful_samples: usize,
    response_codes: BTreeMap<ResponseCode, usize>,
    total_bytes: usize,
    connect: LatencyHistogram,
    latency: LatencyHistogram,
}

impl MetricsCollector {
    /// Empty collector
    pub fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            total_samples: 0,
            successful_samples: 0,
            response_codes: BTreeMap::new(),
            total_bytes: 0,
            connect: LatencyHistogram::new()?,
            latency: LatencyHistogram::new()?,
        })
    }

    /// Fold one record in
    pub fn record(&mut self, record: &SampleRecord) {
        let outcome = &record.outcome;
        self.total_samples += 1;
        *self.response_codes.entry(outcome.response_code).or_insert(0) += 1;
        if outcome.success {
            self.successful_samples += 1;
            self.total_bytes += outcome.payload_bytes;
        }
        self.connect.record_ms(outcome.timing.connect_ms);
        self.latency.record_ms(outcome.timing.latency_ms);
    }

    /// Number of records seen
    pub fn len(&self) -> usize {
        self.total_samples
    }

    /// Whether no record was seen yet
    pub fn is_empty(&self) -> bool {
        self.total_samples == 0
    }

    /// Summary over everything recorded so far
    pub fn summary(&self, duration: Duration) -> MetricsSummary {
        let total_samples = self.total_samples;
        let failed_samples = total_samples - self.successful_samples;
        let error_rate = if total_samples > 0 {
            failed_samples as f64 / total_samples as f64
        } else {
            0.0
        };

        let duration_secs = duration.as_secs_f64();
        let (samples_per_second, bytes_per_second) = if duration_secs > 0.0 {
            (
                total_samples as f64 / duration_secs,
                self.total_bytes as f64 / duration_secs,
            )
        } else {
            (0.0, 0.0)
        };

        MetricsSummary {
            total_samples,
            successful_samples: self.successful_samples,
            failed_samples,
            error_rate,
            response_codes: self.response_codes.clone(),
            total_bytes: self.total_bytes,
            samples_per_second,
            bytes_per_second,
            connect: self.connect.percentiles(),
            latency: self.latency.percentiles(),
            total_duration_secs: duration_secs,
        }
    }
}

/// Latency percentiles (all values in milliseconds)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct LatencyPercentiles {
    /// Minimum value
    pub min: f64,
    /// 50th percentile (median)
    pub p50: f64,
    /// 75th percentile
    pub p75: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
    /// Maximum value
    pub max: f64,
    /// Mean value
    pub mean: f64,
    /// Standard deviation
    pub stddev: f64,
}

/// Microsecond-resolution histogram of millisecond timings
pub struct LatencyHistogram {
    histogram: hdrhistogram::Histogram<u64>,
}

impl LatencyHistogram {
    // One hour in microseconds; longer samples saturate.
    const MAX_MICROS: u64 = 3_600_000_000;

    /// Empty histogram with three significant digits
    pub fn new() -> Result<Self, MetricsError> {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, Self::MAX_MICROS, 3)?;
        Ok(Self { histogram })
    }

    /// Record a duration
    pub fn record(&mut self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.histogram.saturating_record(micros);
    }

    /// Record a value in milliseconds
    pub fn record_ms(&mut self, ms: f64) {
        let micros = (ms.max(0.0) * 1000.0) as u64;
        self.histogram.saturating_record(micros);
    }

    /// Number of recorded values
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    /// Check if the histogram is empty
    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Percentiles in milliseconds
    pub fn percentiles(&self) -> LatencyPercentiles {
        if self.histogram.is_empty() {
            return LatencyPercentiles::default();
        }

        let ms = |micros: u64| micros as f64 / 1000.0;
        LatencyPercentiles {
            min: ms(self.histogram.min()),
            p50: ms(self.histogram.value_at_quantile(0.50)),
            p75: ms(self.histogram.value_at_quantile(0.75)),
            p90: ms(self.histogram.value_at_quantile(0.90)),
            p95: ms(self.histogram.value_at_quantile(0.95)),
            p99: ms(self.histogram.value_at_quantile(0.99)),
            max: ms(self.histogram.max()),
            mean: self.histogram.mean() / 1000.0,
            stddev: self.histogram.stdev() / 1000.0,
        }
    }
}

impl std::fmt::Debug for LatencyHistogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyHistogram")
            .field("len", &self.histogram.len())
            .finish()
    }
}
