//! Relational store connector.
//!
//! Owns the single database connection for the worker. Connecting blocks
//! with unbounded fixed-backoff retries: during cluster bring-up the store
//! is expected to become reachable eventually, so there is no fatal branch.
//! The handle carries an open flag; any failed operation marks it closed and
//! the supervisor replaces it wholesale on the next loop iteration.

use crate::error::{Result, WorkerError};
use crate::secrets::ConnectionDescriptor;
use crate::shutdown::Shutdown;
use crate::types::VoteEvent;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::ConnectOptions;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

const CREATE_VOTES_TABLE: &str = "CREATE TABLE IF NOT EXISTS votes (\
                                      id VARCHAR(255) NOT NULL UNIQUE, \
                                      vote VARCHAR(255) NOT NULL\
                                  )";
const INSERT_VOTE: &str = "INSERT INTO votes (id, vote) VALUES ($1, $2)";
const UPDATE_VOTE: &str = "UPDATE votes SET vote = $2 WHERE id = $1";
const LIVENESS_PROBE: &str = "SELECT 1";

/// Durable vote ledger operations.
///
/// Implemented by the Postgres connector and by the in-memory provider in
/// [`crate::testing`]. `&mut` receivers make the single-mutator ownership
/// rule a compile-time property.
pub trait VoteStore: Send {
    /// Last known liveness of the handle.
    fn is_open(&self) -> bool;

    /// Replace the underlying connection, blocking until it succeeds or
    /// shutdown is requested.
    fn reconnect(&mut self, shutdown: &Shutdown) -> impl Future<Output = Result<()>> + Send;

    /// Apply one vote idempotently: insert, or update the existing row for
    /// the same voter (last write wins).
    fn apply(&mut self, event: &VoteEvent) -> impl Future<Output = Result<()>> + Send;

    /// Keep-alive query; detects a silently-dropped connection while idle.
    fn probe(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Postgres-backed vote store over one exclusively owned connection.
pub struct PostgresVoteStore {
    options: PgConnectOptions,
    backoff: Duration,
    conn: PgConnection,
    open: bool,
}

impl PostgresVoteStore {
    /// Connect to the store, retrying without bound, and ensure the votes
    /// table exists before handing the connection to the relay loop.
    pub async fn connect(
        descriptor: &ConnectionDescriptor,
        backoff: Duration,
        shutdown: &Shutdown,
    ) -> Result<Self> {
        let options = descriptor.connect_options()?;
        info!(store = %descriptor, "Connecting to db");
        let conn = Self::open_with_retry(&options, backoff, shutdown).await?;
        Ok(Self {
            options,
            backoff,
            conn,
            open: true,
        })
    }

    async fn open_with_retry(
        options: &PgConnectOptions,
        backoff: Duration,
        shutdown: &Shutdown,
    ) -> Result<PgConnection> {
        loop {
            if shutdown.is_requested() {
                return Err(WorkerError::ShutdownInProgress);
            }

            match options.connect().await {
                Ok(mut conn) => match sqlx::query(CREATE_VOTES_TABLE).execute(&mut conn).await {
                    Ok(_) => {
                        info!("Connected to db");
                        return Ok(conn);
                    }
                    Err(e) => {
                        warn!(dependency = "db", error = %e, "Failed to prepare votes table, retrying")
                    }
                },
                Err(e) => warn!(dependency = "db", error = %e, "Waiting for db"),
            }

            if !shutdown.sleep(backoff).await {
                return Err(WorkerError::ShutdownInProgress);
            }
        }
    }
}

impl VoteStore for PostgresVoteStore {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn reconnect(&mut self, shutdown: &Shutdown) -> Result<()> {
        self.open = false;
        self.conn = Self::open_with_retry(&self.options, self.backoff, shutdown).await?;
        self.open = true;
        Ok(())
    }

    async fn apply(&mut self, event: &VoteEvent) -> Result<()> {
        let insert = sqlx::query(INSERT_VOTE)
            .bind(&event.voter_id)
            .bind(event.vote.as_str())
            .execute(&mut self.conn)
            .await;

        match insert {
            Ok(_) => Ok(()),
            // Voter already recorded: expected signal to update instead,
            // not a failure.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                debug!(voter_id = %event.voter_id, "Vote already recorded, updating");
                if let Err(e) = sqlx::query(UPDATE_VOTE)
                    .bind(&event.voter_id)
                    .bind(event.vote.as_str())
                    .execute(&mut self.conn)
                    .await
                {
                    self.open = false;
                    return Err(e.into());
                }
                Ok(())
            }
            Err(e) => {
                self.open = false;
                Err(e.into())
            }
        }
    }

    async fn probe(&mut self) -> Result<()> {
        if let Err(e) = sqlx::query(LIVENESS_PROBE).execute(&mut self.conn).await {
            self.open = false;
            return Err(e.into());
        }
        Ok(())
    }
}
