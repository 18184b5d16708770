//! In-crate fakes for the connector and connection traits

use crate::key::ConnectionKey;
use crate::request::QoS;
use crate::traits::{
    BrokerConnection, CloseError, ConnectError, ConnectionState, Connector, PublishError,
};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Connection
// ============================================================================

pub(crate) struct MockConnection {
    key: ConnectionKey,
    closed: CancellationToken,
    publish_delay: Option<Duration>,
    fail_publish: AtomicBool,
    fail_close: AtomicBool,
    publishes: AtomicUsize,
    closes: AtomicUsize,
    last_payload: Mutex<Option<(String, Vec<u8>, QoS, bool)>>,
}

impl MockConnection {
    fn new(key: ConnectionKey, publish_delay: Option<Duration>) -> Self {
        Self {
            key,
            closed: CancellationToken::new(),
            publish_delay,
            fail_publish: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            publishes: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
        }
    }

    pub(crate) fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }

    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub(crate) fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn last_payload(&self) -> Option<(String, Vec<u8>, QoS, bool)> {
        self.last_payload.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerConnection for MockConnection {
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
        if let Some(delay) = self.publish_delay {
            tokio::select! {
                _ = self.closed.cancelled() => return Err(PublishError::Interrupted),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(PublishError::Transport("simulated publish failure".into()));
        }
        self.publishes.fetch_add(1, Ordering::SeqCst);
        *self.last_payload.lock().unwrap() = Some((topic.to_string(), payload, qos, retain));
        Ok(())
    }

    fn close(&self) -> Result<(), CloseError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.cancel();
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(CloseError::Transport("simulated close failure".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Mock Connector
// ============================================================================

pub(crate) struct MockConnector {
    connections: Mutex<Vec<Arc<MockConnection>>>,
    attempts: AtomicUsize,
    fail: AtomicBool,
    connect_delay: Option<Duration>,
    publish_delay: Option<Duration>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            connect_delay: None,
            publish_delay: None,
        }
    }

    pub(crate) fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub(crate) fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = Some(delay);
        self
    }

    pub(crate) fn fail_connects(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Successful connects
    pub(crate) fn connect_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    /// All connect attempts, including failures
    pub(crate) fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn connection(&self, index: usize) -> Arc<MockConnection> {
        Arc::clone(&self.connections.lock().unwrap()[index])
    }

    pub(crate) fn open_count(&self) -> usize {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !c.is_closed())
            .count()
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(
        &self,
        key: &ConnectionKey,
    ) -> Result<Arc<dyn BrokerConnection>, ConnectError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConnectError::Refused("simulated refusal".into()));
        }
        let connection = Arc::new(MockConnection::new(key.clone(), self.publish_delay));
        self.connections.lock().unwrap().push(Arc::clone(&connection));
        Ok(connection)
    }
}
