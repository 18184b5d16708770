//! Sample request types
//!
//! A [`SampleRequest`] is the immutable description of one publish sample:
//! where to connect, with which identity, and what to send.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default broker port
pub const DEFAULT_PORT: u16 = 1883;

/// Placeholder replaced by the worker id in client ids and topics
pub const WORKER_PLACEHOLDER: &str = "{worker}";

/// Delivery guarantee requested for a published message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QoS {
    /// Fire and forget (level 0)
    #[default]
    AtMostOnce,
    /// Acknowledged delivery (level 1)
    AtLeastOnce,
    /// Assured single delivery (level 2)
    ExactlyOnce,
}

impl QoS {
    /// Numeric protocol level
    pub fn level(self) -> u8 {
        match self {
            QoS::AtMostOnce => 0,
            QoS::AtLeastOnce => 1,
            QoS::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for QoS {
    type Error = RequestError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(RequestError::InvalidQos(other)),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos.level()
    }
}

impl std::fmt::Display for QoS {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// Explicit close-after-sample flag
///
/// `Unset` is distinct from `KeepOpen`: only an unset flag falls back to the
/// experiment default. Stored as an optional boolean (`null`/absent, `true`,
/// `false`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum CloseConnection {
    /// No explicit choice, use the configured default
    #[default]
    Unset,
    /// Close the connection after the sample
    Close,
    /// Keep the connection after the sample
    KeepOpen,
}

impl CloseConnection {
    /// Resolve against `default` when unset
    pub fn resolve(self, default: bool) -> bool {
        match self {
            CloseConnection::Unset => default,
            CloseConnection::Close => true,
            CloseConnection::KeepOpen => false,
        }
    }

    /// Whether an explicit value was given
    pub fn is_set(self) -> bool {
        self != CloseConnection::Unset
    }
}

impl From<Option<bool>> for CloseConnection {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => CloseConnection::Unset,
            Some(true) => CloseConnection::Close,
            Some(false) => CloseConnection::KeepOpen,
        }
    }
}

impl From<CloseConnection> for Option<bool> {
    fn from(value: CloseConnection) -> Self {
        match value {
            CloseConnection::Unset => None,
            CloseConnection::Close => Some(true),
            CloseConnection::KeepOpen => Some(false),
        }
    }
}

/// A single publish sample
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleRequest {
    /// Broker host name or address
    pub server: String,

    /// Broker port
    pub port: u16,

    /// MQTT client identifier
    pub client_id: String,

    /// Username (empty for anonymous)
    pub username: String,

    /// Password; read from configuration but never written back out
    #[serde(skip_serializing)]
    pub password: String,

    /// Topic to publish to
    pub topic: String,

    /// Quality of service
    pub qos: QoS,

    /// Retain flag
    pub retain: bool,

    /// Reuse a cached connection when one is open
    pub reuse_connection: bool,

    /// Close the connection after the sample
    pub close_connection: CloseConnection,

    /// Textual message body, encoded by the payload codec
    pub message_body: String,
}

impl Default for SampleRequest {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: DEFAULT_PORT,
            client_id: String::new(),
            username: String::new(),
            password: String::new(),
            topic: String::new(),
            qos: QoS::default(),
            retain: false,
            reuse_connection: true,
            close_connection: CloseConnection::Unset,
            message_body: String::new(),
        }
    }
}

impl SampleRequest {
    /// Request against `server` publishing to `topic`, everything else default
    pub fn new(server: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            topic: topic.into(),
            ..Default::default()
        }
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client identifier
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set username and password
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the topic
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the quality of service
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Set the retain flag
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Set the reuse policy
    pub fn with_reuse_connection(mut self, reuse: bool) -> Self {
        self.reuse_connection = reuse;
        self
    }

    /// Set the close flag
    pub fn with_close_connection(mut self, close: impl Into<CloseConnection>) -> Self {
        self.close_connection = close.into();
        self
    }

    /// Set the message body
    pub fn with_message_body(mut self, body: impl Into<String>) -> Self {
        self.message_body = body.into();
        self
    }

    /// Copy of this request for one worker
    ///
    /// Replaces `{worker}` in the client id and topic with `worker_id`.
    pub fn for_worker(&self, worker_id: usize) -> Self {
        let id = worker_id.to_string();
        Self {
            client_id: self.client_id.replace(WORKER_PLACEHOLDER, &id),
            topic: self.topic.replace(WORKER_PLACEHOLDER, &id),
            ..self.clone()
        }
    }

    /// Sample label, e.g. `tcp://broker.local:1883`
    pub fn label(&self) -> String {
        format!("tcp://{}:{}", self.server, self.port)
    }

    /// Connection settings echoed into the outcome
    pub fn sampler_data(&self, close_default: bool) -> String {
        format!(
            "Host: {} Port: {}\nReuse: {} Close: {}",
            self.server,
            self.port,
            self.reuse_connection,
            self.close_connection.resolve(close_default)
        )
    }

    /// Check the invariants a sample relies on
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.server.trim().is_empty() {
            return Err(RequestError::MissingField("server"));
        }
        if self.port == 0 {
            return Err(RequestError::InvalidPort("0".into()));
        }
        if self.client_id.trim().is_empty() {
            return Err(RequestError::MissingField("client_id"));
        }
        if self.topic.is_empty() {
            return Err(RequestError::MissingField("topic"));
        }
        if self.topic.contains(['+', '#']) {
            return Err(RequestError::WildcardTopic(self.topic.clone()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SampleRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleRequest")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("topic", &self.topic)
            .field("qos", &self.qos)
            .field("retain", &self.retain)
            .field("reuse_connection", &self.reuse_connection)
            .field("close_connection", &self.close_connection)
            .field("message_body_len", &self.message_body.len())
            .finish()
    }
}

/// Parse a textual port; empty text resolves to [`DEFAULT_PORT`]
pub fn parse_port(text: &str) -> Result<u16, RequestError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(DEFAULT_PORT);
    }
    match text.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(RequestError::InvalidPort(text.to_string())),
    }
}

/// Request validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// A required field is empty
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Port is not a positive integer
    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    /// QoS outside 0..=2
    #[error("invalid QoS level: {0}")]
    InvalidQos(u8),

    /// Topic contains a subscription wildcard
    #[error("topic must not contain wildcards: {0}")]
    WildcardTopic(String),
}
