//! rumqttc-backed connector and session

use crate::options::{BrokerOptions, OptionsError};

use async_trait::async_trait;
use mqtt_bench_core::{
    BrokerConnection, CloseError, ConnectError, ConnectionKey, ConnectionState, Connector,
    PublishError, QoS,
};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How long a closing session may take to flush its DISCONNECT
const DISCONNECT_FLUSH: Duration = Duration::from_millis(250);

/// Opens one rumqttc session per call
#[derive(Debug, Clone, Default)]
pub struct RumqttConnector {
    options: BrokerOptions,
}

impl RumqttConnector {
    /// Connector using `options` for every session
    pub fn new(options: BrokerOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Options applied to new sessions
    pub fn options(&self) -> &BrokerOptions {
        &self.options
    }

    /// Client options for `key`; always a clean session
    pub fn mqtt_options(&self, key: &ConnectionKey) -> Result<MqttOptions, ConnectError> {
        if key.server().is_empty() {
            return Err(ConnectError::InvalidOptions("server is empty".into()));
        }
        let client_id = key.client_id();
        if client_id.is_empty() || client_id.starts_with(' ') {
            return Err(ConnectError::InvalidOptions(format!(
                "client id {client_id:?} is empty or starts with a space"
            )));
        }

        let mut options = MqttOptions::new(client_id, key.server(), key.port());
        options
            .set_clean_session(true)
            .set_keep_alive(self.options.keep_alive);
        if key.has_credentials() {
            options.set_credentials(key.username(), key.password());
        }
        Ok(options)
    }
}

#[async_trait]
impl Connector for RumqttConnector {
    fn name(&self) -> &str {
        "rumqttc"
    }

    async fn connect(
        &self,
        key: &ConnectionKey,
    ) -> Result<Arc<dyn BrokerConnection>, ConnectError> {
        let options = self.mqtt_options(key)?;
        let (client, mut eventloop) = AsyncClient::new(options, self.options.channel_capacity);

        match tokio::time::timeout(self.options.connect_timeout, handshake(&mut eventloop)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(%key, error = %e, "Handshake failed");
                return Err(e);
            }
            Err(_) => return Err(ConnectError::Timeout(self.options.connect_timeout)),
        }

        let closed = CancellationToken::new();
        tokio::spawn(drive(key.clone(), eventloop, closed.clone()));
        tracing::debug!(%key, "Session established");

        Ok(Arc::new(RumqttConnection {
            key: key.clone(),
            client,
            closing: AtomicBool::new(false),
            closed,
        }))
    }
}

// Polls until the broker answers CONNECT.
async fn handshake(eventloop: &mut EventLoop) -> Result<(), ConnectError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(ConnectError::Refused(format!("{code:?}"))),
                };
            }
            Ok(_) => {}
            Err(ConnectionError::ConnectionRefused(code)) => {
                return Err(ConnectError::Refused(format!("{code:?}")));
            }
            Err(e) => return Err(ConnectError::Transport(e.to_string())),
        }
    }
}

// Keeps the event loop turning until the session is closed or drops.
async fn drive(key: ConnectionKey, mut eventloop: EventLoop, closed: CancellationToken) {
    loop {
        tokio::select! {
            _ = closed.cancelled() => break,
            event = eventloop.poll() => {
                if let Err(e) = event {
                    tracing::warn!(%key, error = %e, "Broker session lost");
                    closed.cancel();
                    return;
                }
            }
        }
    }

    let flush = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };
    if tokio::time::timeout(DISCONNECT_FLUSH, flush).await.is_err() {
        tracing::debug!(%key, "DISCONNECT not flushed before teardown");
    }
}

/// One rumqttc session
///
/// The event loop runs on its own task; the session counts as closed once
/// [`close`] was called or that task lost the broker.
///
/// [`close`]: BrokerConnection::close
pub struct RumqttConnection {
    key: ConnectionKey,
    client: AsyncClient,
    closing: AtomicBool,
    closed: CancellationToken,
}

#[async_trait]
impl BrokerConnection for RumqttConnection {
    fn key(&self) -> &ConnectionKey {
        &self.key
    }

    fn state(&self) -> ConnectionState {
        if self.closed.is_cancelled() {
            ConnectionState::Closed
        } else {
            ConnectionState::Open
        }
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: QoS,
        retain: bool,
    ) -> Result<(), PublishError> {
        if self.closed.is_cancelled() {
            return Err(PublishError::Closed);
        }

        tokio::select! {
            biased;

            _ = self.closed.cancelled() => Err(PublishError::Interrupted),
            sent = self.client.publish(topic, to_rumqttc(qos), retain, payload) => {
                sent.map_err(|e| PublishError::Transport(e.to_string()))
            }
        }
    }

    fn close(&self) -> Result<(), CloseError> {
        if self.closing.swap(true, Ordering::SeqCst) || self.closed.is_cancelled() {
            self.closed.cancel();
            return Ok(());
        }

        let sent = self.client.try_disconnect();
        self.closed.cancel();
        sent.map_err(|e| CloseError::Transport(e.to_string()))
    }
}

impl std::fmt::Debug for RumqttConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RumqttConnection")
            .field("key", &self.key)
            .field("state", &self.state())
            .finish()
    }
}

fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}
