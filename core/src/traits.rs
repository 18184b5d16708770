//! Collaborator traits for broker connections and payload codecs
//!
//! The wire client and the body codec are consumed as capabilities. The
//! `broker` crate provides the production connector; tests use fakes.

use crate::key::ConnectionKey;
use crate::request::QoS;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Broker Connection
// ============================================================================

/// Lifecycle state of a broker session
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Usable for publishing
    Open,
    /// Torn down, terminal
    Closed,
}

/// One live session with a broker
///
/// A connection is owned by a single worker. The only operation another
/// thread may invoke is [`BrokerConnection::close`], which must be safe to
/// call concurrently with an in-flight publish and must not wait for it.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Key this session was established for
    fn key(&self) -> &ConnectionKey;

    /// Current lifecycle state
    fn state(&self) -> ConnectionState;

    /// Whether the session can publish
    fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Publish one message
    ///
    /// Fails with [`PublishError::Interrupted`] or [`PublishError::Closed`]
    /// when the session is closed before or during the call.
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), PublishError>;

    /// Tear the session down. Idempotent: closing twice is a no-op.
    fn close(&self) -> Result<(), CloseError>;
}

/// Establishes broker sessions
///
/// Every (re)connect uses a clean session.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connector identifier (e.g., "rumqttc")
    fn name(&self) -> &str;

    /// Open a new session for `key`
    async fn connect(
        &self,
        key: &ConnectionKey,
    ) -> Result<Arc<dyn BrokerConnection>, ConnectError>;
}

/// Failure while establishing a session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// Network level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Broker answered the handshake with a refusal
    #[error("connection refused: {0}")]
    Refused(String),

    /// Handshake did not complete in time
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// Options could not be turned into a session
    #[error("invalid connection options: {0}")]
    InvalidOptions(String),
}

/// Failure while sending a message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The session was closed while the publish was in flight
    #[error("publish interrupted: connection closed")]
    Interrupted,

    /// The session was already closed
    #[error("connection is closed")]
    Closed,

    /// Network level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Body could not be encoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Failure while closing a session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CloseError {
    /// Disconnect could not be delivered
    #[error("disconnect failed: {0}")]
    Transport(String),
}

// ============================================================================
// Payload Codec
// ============================================================================

/// Turns a textual message body into wire bytes
pub trait PayloadCodec: Send + Sync {
    /// Codec identifier
    fn name(&self) -> &str;

    /// Encode `text`; deterministic for equal input
    fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError>;
}

/// Codec failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Body is not valid for this codec
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

// ============================================================================
// Stop Condition
// ============================================================================

/// Experiment stop condition
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    /// Run exactly N samples total (shared among workers)
    SampleCount(usize),

    /// Run for the specified duration
    Duration(Duration),

    /// Run until explicitly stopped (Ctrl+C)
    Indefinite,
}

impl Default for StopCondition {
    fn default() -> Self {
        StopCondition::SampleCount(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_condition_default() {
        assert_eq!(StopCondition::default(), StopCondition::SampleCount(100));
    }

    #[test]
    fn test_codec_error_converts_to_publish_error() {
        let err: PublishError = CodecError::InvalidPayload("not json".into()).into();
        assert_eq!(err.to_string(), "invalid payload: not json");
    }

    #[test]
    fn test_connect_error_messages() {
        assert_eq!(
            ConnectError::Refused("bad credentials".into()).to_string(),
            "connection refused: bad credentials"
        );
        assert!(ConnectError::Timeout(Duration::from_secs(5))
            .to_string()
            .contains("5s"));
    }

    #[test]
    fn test_stop_condition_serialization() {
        let json = serde_json::to_string(&StopCondition::SampleCount(10)).unwrap();
        assert_eq!(json, r#"{"sample_count":10}"#);
        let parsed: StopCondition = serde_json::from_str(r#""indefinite""#).unwrap();
        assert_eq!(parsed, StopCondition::Indefinite);
    }
}
