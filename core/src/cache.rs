//! Per-worker connection cache
//!
//! Each worker owns exactly one [`ConnectionCache`]; it is never shared, so
//! no locking is involved. Entries are created lazily, replaced when found
//! unusable and removed on retirement. A failed connect leaves no entry
//! behind, so the next sample reconnects from scratch.

use crate::error::RetireError;
use crate::key::ConnectionKey;
use crate::traits::{BrokerConnection, ConnectError, Connector};

use std::collections::HashMap;
use std::sync::Arc;

/// Counters describing cache activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// New sessions established
    pub connects: usize,
    /// Samples served by an existing session
    pub reuses: usize,
    /// Failed connect attempts
    pub connect_failures: usize,
    /// Entries removed and closed
    pub retired: usize,
    /// Close failures swallowed during retirement
    pub retire_failures: usize,
}

/// Mapping from [`ConnectionKey`] to a live session, owned by one worker
pub struct ConnectionCache {
    worker_id: usize,
    entries: HashMap<ConnectionKey, Arc<dyn BrokerConnection>>,
    stats: CacheStats,
}

impl ConnectionCache {
    /// Empty cache for `worker_id`
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Return a usable session for `key`, connecting when needed
    ///
    /// With `reuse` set, an open cached session is returned as-is. In every
    /// other case an existing entry is retired first and `connector` opens a
    /// fresh session, which is cached only if the connect succeeds.
    pub async fn get_or_create(
        &mut self,
        key: &ConnectionKey,
        connector: &dyn Connector,
        reuse: bool,
    ) -> Result<Arc<dyn BrokerConnection>, ConnectError> {
        if reuse {
            if let Some(connection) = self.entries.get(key) {
                if connection.is_open() {
                    self.stats.reuses += 1;
                    tracing::debug!(worker_id = self.worker_id, %key, "Reusing cached connection");
                    return Ok(Arc::clone(connection));
                }
                tracing::debug!(
                    worker_id = self.worker_id,
                    %key,
                    state = ?connection.state(),
                    "Cached connection unusable, replacing"
                );
            }
        }

        self.retire(key);

        match connector.connect(key).await {
            Ok(connection) => {
                self.stats.connects += 1;
                tracing::debug!(
                    worker_id = self.worker_id,
                    %key,
                    connector = connector.name(),
                    "Created new connection"
                );
                self.entries.insert(key.clone(), Arc::clone(&connection));
                Ok(connection)
            }
            Err(e) => {
                self.stats.connect_failures += 1;
                tracing::warn!(worker_id = self.worker_id, %key, error = %e, "Could not connect");
                Err(e)
            }
        }
    }

    /// Remove and close the entry for `key`, if any
    ///
    /// Close failures are logged and counted, never returned.
    pub fn retire(&mut self, key: &ConnectionKey) {
        if let Some(connection) = self.entries.remove(key) {
            self.close_entry(key.clone(), connection.as_ref());
        }
    }

    /// Close every entry and empty the cache
    pub fn retire_all(&mut self) {
        let entries: Vec<_> = self.entries.drain().collect();
        if !entries.is_empty() {
            tracing::debug!(
                worker_id = self.worker_id,
                count = entries.len(),
                "Retiring all cached connections"
            );
        }
        for (key, connection) in entries {
            self.close_entry(key, connection.as_ref());
        }
    }

    fn close_entry(&mut self, key: ConnectionKey, connection: &dyn BrokerConnection) {
        self.stats.retired += 1;
        tracing::debug!(worker_id = self.worker_id, %key, "Closing connection");
        if let Err(source) = connection.close() {
            self.stats.retire_failures += 1;
            let err = RetireError { key, source };
            tracing::warn!(worker_id = self.worker_id, error = %err, "Ignoring close failure");
        }
    }

    /// Whether an entry exists for `key`
    pub fn contains(&self, key: &ConnectionKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cached entries that are still open
    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|c| c.is_open()).count()
    }

    /// Activity counters
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Owning worker
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }
}

impl std::fmt::Debug for ConnectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionCache")
            .field("worker_id", &self.worker_id)
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .field("stats", &self.stats)
            .finish()
    }
}
