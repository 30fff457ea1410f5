//! Connection supervision.
//!
//! Owns both dependency handles exclusively. Before each relay iteration the
//! loop calls [`ConnectionSupervisor::ensure_connected`]; a handle that
//! reports dead is reconnected inline, synchronously, before any operation
//! runs. Reconnecting blocks vote processing, which is deliberate: the loop
//! never operates on a stale handle, and there is no background reconnect
//! racing the loop.

use crate::error::Result;
use crate::queue::VoteQueue;
use crate::shutdown::Shutdown;
use crate::store::VoteStore;
use tracing::warn;

/// Holds the queue and store handles for the relay loop.
///
/// Handles are replaced wholesale by their connectors on reconnect, never
/// mutated in place, and never shared across dependencies.
pub struct ConnectionSupervisor<Q: VoteQueue, S: VoteStore> {
    queue: Q,
    store: S,
}

impl<Q: VoteQueue, S: VoteStore> ConnectionSupervisor<Q, S> {
    pub fn new(queue: Q, store: S) -> Self {
        Self { queue, store }
    }

    /// Check both handles and reconnect any that report dead.
    ///
    /// Returns `ShutdownInProgress` if a reconnect wait was interrupted by
    /// a shutdown request; any other outcome is a healthy pair of handles.
    pub async fn ensure_connected(&mut self, shutdown: &Shutdown) -> Result<()> {
        if !self.queue.is_connected() {
            warn!(dependency = "redis", "Reconnecting queue");
            self.queue.reconnect(shutdown).await?;
        }

        if !self.store.is_open() {
            warn!(dependency = "db", "Reconnecting store");
            self.store.reconnect(shutdown).await?;
        }

        Ok(())
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut Q {
        &mut self.queue
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
