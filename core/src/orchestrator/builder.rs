//! Builder pattern for Orchestrator construction

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::channel::ChannelConfig;
use crate::codec::CodecKind;
use crate::config::ExperimentConfig;
use crate::error::{BenchError, BenchResult};
use crate::metrics::SampleRecord;
use crate::request::SampleRequest;
use crate::traits::{Connector, PayloadCodec, StopCondition};
use crate::worker::SampleExecutor;

use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let (orchestrator, records_rx) = OrchestratorBuilder::new()
///     .concurrency(10)
///     .stop_condition(StopCondition::SampleCount(1000))
///     .rate_limit(Some(100.0))
///     .connector(connector)
///     .request(request)
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: ExperimentConfig,
    connector: Option<Arc<dyn Connector>>,
    codec: Option<Arc<dyn PayloadCodec>>,
    request: Option<SampleRequest>,
    channel_config: ChannelConfig,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ExperimentConfig::default(),
            connector: None,
            codec: None,
            request: None,
            channel_config: ChannelConfig::default(),
        }
    }

    /// Set the full experiment configuration
    pub fn config(mut self, config: ExperimentConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the concurrency level
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set the stop condition
    pub fn stop_condition(mut self, stop: StopCondition) -> Self {
        self.config.stop_condition = stop;
        self
    }

    /// Set the rate limit (samples per second)
    pub fn rate_limit(mut self, rps: Option<f64>) -> Self {
        self.config.rate_limit = rps;
        self
    }

    /// Set the broker connector
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Use a custom payload codec instead of the configured kind
    pub fn codec(mut self, codec: Arc<dyn PayloadCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Set the request every worker repeats
    pub fn request(mut self, request: SampleRequest) -> Self {
        self.request = Some(request);
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Build the orchestrator and return it along with the record receiver
    ///
    /// # Errors
    ///
    /// Returns an error if the connector or request is not set, or if
    /// validation of the configuration or request fails.
    pub fn build(self) -> BenchResult<(Orchestrator, mpsc::Receiver<SampleRecord>)> {
        let connector = self
            .connector
            .ok_or_else(|| BenchError::missing_config("connector"))?;

        let request = self
            .request
            .ok_or_else(|| BenchError::missing_config("request"))?;

        self.config
            .validate()
            .map_err(|e| BenchError::config(e.to_string()))?;
        request
            .validate()
            .map_err(|e| BenchError::config(e.to_string()))?;

        let codec = self
            .codec
            .unwrap_or_else(|| CodecKind::build(self.config.codec));
        let executor = SampleExecutor::new(connector, codec)
            .with_close_connection_default(self.config.close_connection_default);

        let (records_tx, records_rx) = self.channel_config.open(self.config.concurrency);

        let orchestrator = Orchestrator::new(self.config, executor, request, records_tx);

        Ok((orchestrator, records_rx))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
