//! Experiment configuration types

use crate::codec::CodecKind;
use crate::traits::StopCondition;
use serde::{Deserialize, Serialize};

/// Experiment configuration
///
/// Defines how a load run should be executed: concurrency level, stopping
/// condition, rate limiting, and the defaults applied to every sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Number of concurrent worker tasks
    pub concurrency: usize,

    /// Stop condition: sample count, duration, or indefinite
    pub stop_condition: StopCondition,

    /// Optional rate limiting (samples per second across all workers)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,

    /// What an unset close flag on a request resolves to
    pub close_connection_default: bool,

    /// Payload encoding
    pub codec: CodecKind,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            stop_condition: StopCondition::default(),
            rate_limit: None,
            close_connection_default: false,
            codec: CodecKind::default(),
        }
    }
}

impl ExperimentConfig {
    /// Create a new config with the given concurrency
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Default::default()
        }
    }

    /// Set the stop condition
    pub fn with_stop_condition(mut self, stop: StopCondition) -> Self {
        self.stop_condition = stop;
        self
    }

    /// Set the rate limit
    pub fn with_rate_limit(mut self, rps: f64) -> Self {
        self.rate_limit = Some(rps);
        self
    }

    /// Set the close default
    pub fn with_close_connection_default(mut self, close: bool) -> Self {
        self.close_connection_default = close;
        self
    }

    /// Set the payload codec
    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(
                "concurrency must be at least 1".into(),
            ));
        }

        if let Some(rps) = self.rate_limit {
            if !(rps > 0.0 && rps.is_finite()) {
                return Err(ConfigError::InvalidRateLimit(
                    "rate limit must be positive".into(),
                ));
            }
        }

        match self.stop_condition {
            StopCondition::SampleCount(0) => Err(ConfigError::InvalidStopCondition(
                "sample count must be at least 1".into(),
            )),
            StopCondition::Duration(d) if d.is_zero() => Err(ConfigError::InvalidStopCondition(
                "duration must be greater than zero".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid concurrency value
    #[error("Invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Invalid rate limit
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Invalid stop condition
    #[error("Invalid stop condition: {0}")]
    InvalidStopCondition(String),
}
