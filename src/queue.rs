//! Queue store connector.
//!
//! Pops vote events from the head of the `votes` list. Connecting uses the
//! same unbounded fixed-backoff retry policy as the relational store. The
//! handle carries a connected flag: set on connect, cleared whenever a
//! command fails, checked by the supervisor before every poll.

use crate::error::{Result, WorkerError};
use crate::shutdown::Shutdown;
use crate::types::VoteEvent;
use redis::aio::MultiplexedConnection;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Name of the FIFO list the voting front end pushes to.
pub const VOTES_QUEUE: &str = "votes";

/// Vote event source.
///
/// Implemented by the Redis connector and by the in-memory provider in
/// [`crate::testing`].
pub trait VoteQueue: Send {
    /// Last known liveness of the handle.
    fn is_connected(&self) -> bool;

    /// Replace the underlying connection, blocking until it succeeds or
    /// shutdown is requested.
    fn reconnect(&mut self, shutdown: &Shutdown) -> impl Future<Output = Result<()>> + Send;

    /// Non-blocking pop from the head of the queue.
    ///
    /// `Ok(None)` when the queue is empty. A popped payload that does not
    /// parse as a [`VoteEvent`] yields `MalformedPayload`; the element is
    /// already consumed by the pop.
    fn try_pop(&mut self) -> impl Future<Output = Result<Option<VoteEvent>>> + Send;
}

/// Redis-backed vote queue over one exclusively owned connection.
pub struct RedisVoteQueue {
    url: String,
    backoff: Duration,
    conn: MultiplexedConnection,
    connected: bool,
}

impl RedisVoteQueue {
    /// Connect to the queue store, retrying without bound.
    pub async fn connect(
        host: &str,
        port: u16,
        backoff: Duration,
        shutdown: &Shutdown,
    ) -> Result<Self> {
        let url = format!("redis://{host}:{port}");
        info!(url = %url, "Connecting to redis");
        let conn = Self::open_with_retry(&url, backoff, shutdown).await?;
        Ok(Self {
            url,
            backoff,
            conn,
            connected: true,
        })
    }

    async fn open(url: &str) -> redis::RedisResult<MultiplexedConnection> {
        let client = redis::Client::open(url)?;
        client.get_multiplexed_async_connection().await
    }

    async fn open_with_retry(
        url: &str,
        backoff: Duration,
        shutdown: &Shutdown,
    ) -> Result<MultiplexedConnection> {
        loop {
            if shutdown.is_requested() {
                return Err(WorkerError::ShutdownInProgress);
            }

            match Self::open(url).await {
                Ok(conn) => {
                    info!("Connected to redis");
                    return Ok(conn);
                }
                Err(e) => warn!(dependency = "redis", error = %e, "Waiting for redis"),
            }

            if !shutdown.sleep(backoff).await {
                return Err(WorkerError::ShutdownInProgress);
            }
        }
    }
}

impl VoteQueue for RedisVoteQueue {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn reconnect(&mut self, shutdown: &Shutdown) -> Result<()> {
        self.connected = false;
        let url = self.url.clone();
        self.conn = Self::open_with_retry(&url, self.backoff, shutdown).await?;
        self.connected = true;
        Ok(())
    }

    async fn try_pop(&mut self) -> Result<Option<VoteEvent>> {
        let raw = match redis::cmd("LPOP")
            .arg(VOTES_QUEUE)
            .query_async::<Option<String>>(&mut self.conn)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                self.connected = false;
                return Err(e.into());
            }
        };

        match raw {
            Some(raw) => Ok(Some(VoteEvent::from_payload(&raw)?)),
            None => Ok(None),
        }
    }
}
