//! Error types for mqtt-bench-core
//!
//! Sample-level failures (connect, publish, codec) live next to the
//! collaborator traits in [`crate::traits`] and never escape a sample: they
//! are folded into a [`crate::SampleOutcome`]. The types here cover the
//! orchestration layer and the retirement path.

use crate::key::ConnectionKey;
use crate::traits::CloseError;
use thiserror::Error;

/// Category of an orchestration-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchErrorKind {
    /// A builder was missing a required field
    MissingConfig,
    /// Configuration failed validation
    InvalidConfig,
    /// The experiment could not complete
    Orchestration,
}

/// Orchestration error with a human-readable message
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BenchError {
    /// Failure category
    pub kind: BenchErrorKind,
    /// Description
    pub message: String,
}

impl BenchError {
    fn new(kind: BenchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A required builder field was never set
    pub fn missing_config(field: &str) -> Self {
        Self::new(
            BenchErrorKind::MissingConfig,
            format!("missing required configuration: {field}"),
        )
    }

    /// Configuration rejected by validation
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::InvalidConfig, message)
    }

    /// Experiment-wide failure
    pub fn orchestration(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Orchestration, message)
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;

/// Failure while closing a cached connection.
///
/// Retirement always succeeds structurally: the entry is gone from the cache
/// whether or not the close went through. This error is only logged and
/// counted, it never reaches a sample outcome.
#[derive(Debug, Error)]
#[error("failed to close connection {key}: {source}")]
pub struct RetireError {
    /// Key of the retired entry
    pub key: ConnectionKey,
    /// Underlying close failure
    #[source]
    pub source: CloseError,
}
