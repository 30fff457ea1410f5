#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Vote Relay Worker
//!
//! Relays vote events from a transient Redis list into a durable PostgreSQL
//! table, assuming either store may be unavailable at any moment and that
//! the queue delivers each event at-least-once.
//!
//! ## Architecture
//!
//! One strictly sequential relay loop owns both connections through a
//! supervisor. Each iteration checks connection health (reconnecting inline
//! with unbounded fixed-backoff retries), pops at most one event, and
//! applies an idempotent insert-else-update keyed by voter id. Last write
//! wins per voter, which is what makes at-least-once delivery safe.
//!
//! ## Module Organization
//!
//! - [`config`] - Environment-sourced configuration
//! - [`secrets`] - Store credential resolution (Secrets Manager or inline)
//! - [`store`] - Relational store connector and upsert protocol
//! - [`queue`] - Queue store connector and payload parsing
//! - [`supervisor`] - Connection health supervision
//! - [`relay`] - The dequeue-apply loop
//! - [`shutdown`] - Cooperative shutdown signal
//! - [`testing`] - In-memory providers for tests
//! - [`error`] - Structured error handling

pub mod config;
pub mod error;
pub mod logging;
pub mod queue;
pub mod relay;
pub mod secrets;
pub mod shutdown;
pub mod store;
pub mod supervisor;
pub mod testing;
pub mod types;

pub use config::{DatabaseConfig, QueueConfig, WorkerConfig};
pub use error::{Result, WorkerError};
pub use queue::{RedisVoteQueue, VoteQueue, VOTES_QUEUE};
pub use relay::{RelayWorker, Tick};
pub use secrets::{ConnectionDescriptor, DbCredentials};
pub use shutdown::Shutdown;
pub use store::{PostgresVoteStore, VoteStore};
pub use supervisor::ConnectionSupervisor;
pub use types::{Ballot, VoteEvent};
