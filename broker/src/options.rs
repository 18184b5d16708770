//! Client options shared by every session a connector opens

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for sessions opened by [`crate::RumqttConnector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerOptions {
    /// MQTT keep-alive interval
    #[serde(with = "secs")]
    pub keep_alive: Duration,

    /// Upper bound on the CONNECT/CONNACK handshake
    #[serde(with = "secs")]
    pub connect_timeout: Duration,

    /// Capacity of the client's outgoing request queue
    pub channel_capacity: usize,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 10,
        }
    }
}

impl BrokerOptions {
    /// Set the keep-alive interval
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Set the handshake timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request queue capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Check the options can produce a client
    ///
    /// The keep-alive must be zero (disabled) or at least one second.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if !self.keep_alive.is_zero() && self.keep_alive < Duration::from_secs(1) {
            return Err(OptionsError::KeepAlive(self.keep_alive));
        }
        if self.connect_timeout.is_zero() {
            return Err(OptionsError::ConnectTimeout);
        }
        if self.channel_capacity == 0 {
            return Err(OptionsError::ChannelCapacity);
        }
        Ok(())
    }
}

/// Rejected [`BrokerOptions`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    /// Sub-second keep-alive
    #[error("keep-alive must be 0 or at least 1s, got {0:?}")]
    KeepAlive(Duration),

    /// Zero handshake timeout
    #[error("connect timeout must be greater than zero")]
    ConnectTimeout,

    /// Zero queue capacity
    #[error("channel capacity must be at least 1")]
    ChannelCapacity,
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
