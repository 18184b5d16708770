//! In-flight operation slot and cross-thread interruption
//!
//! [`CurrentOperation`] holds the connection a worker is publishing on, or
//! nothing. The owning worker fills it through [`CurrentOperation::enter`]
//! and the returned guard empties it again, even when the sample future is
//! dropped. [`InterruptHandle`] is the only thing another thread touches: it
//! takes the connection out of the slot and closes it in one step, so a
//! connection is never acted on twice.

use crate::traits::BrokerConnection;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Slot = Option<Arc<dyn BrokerConnection>>;

/// Single mutable slot per worker for the connection in use
#[derive(Default)]
pub struct CurrentOperation {
    slot: Mutex<Slot>,
}

impl CurrentOperation {
    /// Empty slot
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `connection` as in flight until the guard is dropped
    pub fn enter(&self, connection: Arc<dyn BrokerConnection>) -> CurrentGuard<'_> {
        *self.lock() = Some(connection);
        CurrentGuard { current: self }
    }

    /// Atomically take the connection out of the slot
    pub fn take(&self) -> Option<Arc<dyn BrokerConnection>> {
        self.lock().take()
    }

    /// Empty the slot without acting on its content
    pub fn clear(&self) {
        self.lock().take();
    }

    /// Whether a connection is currently in flight
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }
}

impl std::fmt::Debug for CurrentOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentOperation")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Clears the slot on drop
#[must_use = "dropping the guard immediately clears the in-flight slot"]
pub struct CurrentGuard<'a> {
    current: &'a CurrentOperation,
}

impl Drop for CurrentGuard<'_> {
    fn drop(&mut self) {
        self.current.clear();
    }
}

/// Cloneable handle that cancels a worker's in-flight publish
///
/// Safe to call from any thread at any time; never waits for the publish.
#[derive(Clone)]
pub struct InterruptHandle {
    worker_id: usize,
    current: Arc<CurrentOperation>,
}

impl InterruptHandle {
    /// Handle over `current` for `worker_id`
    pub fn new(worker_id: usize, current: Arc<CurrentOperation>) -> Self {
        Self { worker_id, current }
    }

    /// Close the in-flight connection, if any
    ///
    /// Returns `false` when nothing was in flight. Close failures are logged;
    /// the connection counts as interrupted either way.
    pub fn interrupt(&self) -> bool {
        let Some(connection) = self.current.take() else {
            return false;
        };
        let key = connection.key();
        tracing::debug!(worker_id = self.worker_id, %key, "Interrupting in-flight publish");
        if let Err(e) = connection.close() {
            tracing::warn!(
                worker_id = self.worker_id,
                %key,
                error = %e,
                "Close failed while interrupting"
            );
        }
        true
    }

    /// Whether the worker has a publish in flight
    pub fn is_active(&self) -> bool {
        self.current.is_active()
    }

    /// Worker this handle targets
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }
}

impl std::fmt::Debug for InterruptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptHandle")
            .field("worker_id", &self.worker_id)
            .field("active", &self.is_active())
            .finish()
    }
}
