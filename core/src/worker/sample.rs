//! Single sample execution: connect-or-reuse, publish, apply close policy

use crate::cache::ConnectionCache;
use crate::key::ConnectionKey;
use crate::request::SampleRequest;
use crate::response::{ResponseCode, SampleOutcome};
use crate::traits::{BrokerConnection, Connector, PayloadCodec, PublishError};

use super::current::CurrentOperation;

use std::sync::Arc;
use std::time::Instant;

/// Runs one sample against a worker's cache
///
/// Stateless apart from its collaborators; the cache and the in-flight slot
/// are passed in by the owning worker.
#[derive(Clone)]
pub struct SampleExecutor {
    connector: Arc<dyn Connector>,
    codec: Arc<dyn PayloadCodec>,
    close_connection_default: bool,
}

impl SampleExecutor {
    /// Executor using `connector` for sessions and `codec` for bodies
    pub fn new(connector: Arc<dyn Connector>, codec: Arc<dyn PayloadCodec>) -> Self {
        Self {
            connector,
            codec,
            close_connection_default: false,
        }
    }

    /// Value an unset close flag resolves to
    pub fn with_close_connection_default(mut self, close: bool) -> Self {
        self.close_connection_default = close;
        self
    }

    /// Execute one sample
    ///
    /// Connect failures yield `CONNECT_FAILED`, everything after a usable
    /// connection was obtained yields `PUBLISH_FAILED` on error. The
    /// connection is visible in `current` only while the publish runs, and
    /// the slot is empty again before the cache is touched.
    pub async fn execute(
        &self,
        request: &SampleRequest,
        cache: &mut ConnectionCache,
        current: &CurrentOperation,
    ) -> SampleOutcome {
        let start = Instant::now();
        let mut outcome =
            SampleOutcome::begin(request, self.close_connection_default, chrono::Utc::now());

        let key = ConnectionKey::of(request);
        let reuse = request.reuse_connection;
        let close = request
            .close_connection
            .resolve(self.close_connection_default);

        let connected = cache
            .get_or_create(&key, self.connector.as_ref(), reuse)
            .await;
        outcome
            .timing
            .connect_ended(chrono::Utc::now(), start.elapsed());

        match connected {
            Err(e) => outcome.fail(ResponseCode::ConnectFailed, e.to_string()),
            Ok(connection) => {
                let guard = current.enter(Arc::clone(&connection));
                let published = self.publish(request, connection.as_ref()).await;
                drop(guard);

                match published {
                    Ok(bytes) => outcome.succeed(
                        bytes,
                        format!(
                            "MQTT message sent: topic={} qos={} retain={} bytes={}",
                            request.topic, request.qos, request.retain, bytes
                        ),
                    ),
                    Err(e) => {
                        tracing::debug!(%key, topic = %request.topic, error = %e, "Publish failed");
                        outcome.fail(ResponseCode::PublishFailed, e.to_string());
                    }
                }
            }
        }

        outcome
            .timing
            .finished(chrono::Utc::now(), start.elapsed());

        if !reuse || close {
            cache.retire(&key);
        }

        outcome
    }

    async fn publish(
        &self,
        request: &SampleRequest,
        connection: &dyn BrokerConnection,
    ) -> Result<usize, PublishError> {
        let payload = self.codec.encode(&request.message_body)?;
        let bytes = payload.len();
        connection
            .publish(&request.topic, payload, request.qos, request.retain)
            .await?;
        Ok(bytes)
    }
}

impl std::fmt::Debug for SampleExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleExecutor")
            .field("connector", &self.connector.name())
            .field("codec", &self.codec.name())
            .field("close_connection_default", &self.close_connection_default)
            .finish()
    }
}
