//! The relay loop.
//!
//! A strictly sequential state machine with two states, Idle and Processing,
//! both entered through the connection supervisor's health check. In Idle it
//! attempts a non-blocking pop; empty means a store liveness probe (the
//! keep-alive doubles as an early failure detector) and a poll-tick sleep.
//! A popped event moves the loop to Processing, which applies the idempotent
//! upsert. No operation failure terminates the loop; each one is logged and
//! resolved by the next iteration's reconnect check. The only exits are a
//! shutdown request — the loop itself has no terminal state.

use crate::error::{Result, WorkerError};
use crate::queue::VoteQueue;
use crate::shutdown::Shutdown;
use crate::store::VoteStore;
use crate::supervisor::ConnectionSupervisor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of one relay iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// An event was popped and written to the store.
    Applied,
    /// The queue was empty; the store liveness probe ran instead.
    Idle,
    /// An event was popped but dropped (malformed payload, or a store
    /// write failure that the next iteration's reconnect will resolve).
    Skipped,
    /// A shutdown request interrupted the iteration.
    Shutdown,
}

/// The vote relay worker: supervisor-owned handles plus the poll cadence.
pub struct RelayWorker<Q: VoteQueue, S: VoteStore> {
    supervisor: ConnectionSupervisor<Q, S>,
    poll_interval: Duration,
    shutdown: Arc<Shutdown>,
}

impl<Q: VoteQueue, S: VoteStore> RelayWorker<Q, S> {
    pub fn new(
        supervisor: ConnectionSupervisor<Q, S>,
        poll_interval: Duration,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        Self {
            supervisor,
            poll_interval,
            shutdown,
        }
    }

    /// Run one loop iteration: health check, pop, then apply or probe.
    pub async fn step(&mut self) -> Result<Tick> {
        match self.supervisor.ensure_connected(&self.shutdown).await {
            Ok(()) => {}
            Err(WorkerError::ShutdownInProgress) => return Ok(Tick::Shutdown),
            Err(e) => return Err(e),
        }

        match self.supervisor.queue_mut().try_pop().await {
            Ok(Some(event)) => {
                info!(vote = %event.vote, voter_id = %event.voter_id, "Processing vote");
                if let Err(e) = self.supervisor.store_mut().apply(&event).await {
                    // The event was already popped; it is lost, which is the
                    // documented at-least-once-per-successful-write boundary.
                    warn!(
                        dependency = "db",
                        voter_id = %event.voter_id,
                        error = %e,
                        "Vote write failed, store will be reconnected"
                    );
                    return Ok(Tick::Skipped);
                }
                Ok(Tick::Applied)
            }
            Ok(None) => {
                if let Err(e) = self.supervisor.store_mut().probe().await {
                    warn!(
                        dependency = "db",
                        error = %e,
                        "Store liveness probe failed, store will be reconnected"
                    );
                }
                Ok(Tick::Idle)
            }
            Err(WorkerError::MalformedPayload(reason)) => {
                warn!(error = %reason, "Dropping malformed vote payload");
                Ok(Tick::Skipped)
            }
            Err(e) => {
                warn!(
                    dependency = "redis",
                    error = %e,
                    "Queue pop failed, queue will be reconnected"
                );
                Ok(Tick::Idle)
            }
        }
    }

    /// Run until shutdown is requested.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Starting relay loop"
        );

        loop {
            if !self.shutdown.sleep(self.poll_interval).await {
                break;
            }
            if self.step().await? == Tick::Shutdown {
                break;
            }
        }

        info!("Relay loop stopped");
        Ok(())
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor<Q, S> {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut ConnectionSupervisor<Q, S> {
        &mut self.supervisor
    }
}
