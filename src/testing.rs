//! In-memory queue and store providers for tests.
//!
//! Behavioral stand-ins for the Redis and Postgres connectors: same liveness
//! flags, same reconnect contract (including the shutdown early-exit), same
//! upsert semantics, plus counters and failure injection so tests can assert
//! what the relay loop actually did.

use crate::error::{Result, WorkerError};
use crate::queue::VoteQueue;
use crate::shutdown::Shutdown;
use crate::store::VoteStore;
use crate::types::{Ballot, VoteEvent};
use std::collections::{HashMap, VecDeque};

/// FIFO queue of raw payloads with a connected flag.
#[derive(Debug)]
pub struct InMemoryVoteQueue {
    items: VecDeque<String>,
    connected: bool,
    /// Pops attempted while the handle reported disconnected. The relay
    /// loop must keep this at zero.
    pub pops_while_disconnected: usize,
    pub reconnects: usize,
}

impl Default for InMemoryVoteQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVoteQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
            connected: true,
            pops_while_disconnected: 0,
            reconnects: 0,
        }
    }

    /// Enqueue a raw payload, well-formed or not.
    pub fn push_raw(&mut self, payload: impl Into<String>) {
        self.items.push_back(payload.into());
    }

    /// Enqueue a well-formed vote event.
    pub fn push_event(&mut self, event: &VoteEvent) {
        self.items
            .push_back(serde_json::to_string(event).expect("vote event serializes"));
    }

    /// Drop the connection; pops fail until the supervisor reconnects.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl VoteQueue for InMemoryVoteQueue {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn reconnect(&mut self, shutdown: &Shutdown) -> Result<()> {
        if shutdown.is_requested() {
            return Err(WorkerError::ShutdownInProgress);
        }
        self.reconnects += 1;
        self.connected = true;
        Ok(())
    }

    async fn try_pop(&mut self) -> Result<Option<VoteEvent>> {
        if !self.connected {
            self.pops_while_disconnected += 1;
            return Err(WorkerError::Queue("not connected".to_string()));
        }

        match self.items.pop_front() {
            Some(raw) => Ok(Some(VoteEvent::from_payload(&raw)?)),
            None => Ok(None),
        }
    }
}

/// Vote ledger held in a map, with the connector's open-flag lifecycle.
#[derive(Debug)]
pub struct InMemoryVoteStore {
    rows: HashMap<String, Ballot>,
    open: bool,
    severed: bool,
    pub probes: usize,
    pub reconnects: usize,
    pub inserts: usize,
    pub updates: usize,
}

impl Default for InMemoryVoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVoteStore {
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
            open: true,
            severed: false,
            probes: 0,
            reconnects: 0,
            inserts: 0,
            updates: 0,
        }
    }

    /// Mark the handle closed, as a failed operation would.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Sever the backing connection: writes and probes fail and close the
    /// handle until [`restore`](Self::restore) is called.
    pub fn sever(&mut self) {
        self.severed = true;
    }

    pub fn restore(&mut self) {
        self.severed = false;
    }

    /// Synchronous upsert core: insert-if-absent, else overwrite.
    ///
    /// Exposed so property tests can drive long event sequences without an
    /// async runtime.
    pub fn upsert(&mut self, voter_id: &str, vote: Ballot) {
        match self.rows.entry(voter_id.to_string()) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                entry.insert(vote);
                self.updates += 1;
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(vote);
                self.inserts += 1;
            }
        }
    }

    pub fn vote_for(&self, voter_id: &str) -> Option<Ballot> {
        self.rows.get(voter_id).copied()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// What the results collaborator would see from
    /// `SELECT vote, COUNT(*) FROM votes GROUP BY vote`.
    pub fn tally(&self) -> HashMap<Ballot, usize> {
        let mut counts = HashMap::new();
        for ballot in self.rows.values() {
            *counts.entry(*ballot).or_insert(0) += 1;
        }
        counts
    }

    pub fn writes(&self) -> usize {
        self.inserts + self.updates
    }
}

impl VoteStore for InMemoryVoteStore {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn reconnect(&mut self, shutdown: &Shutdown) -> Result<()> {
        if shutdown.is_requested() {
            return Err(WorkerError::ShutdownInProgress);
        }
        self.reconnects += 1;
        self.open = true;
        Ok(())
    }

    async fn apply(&mut self, event: &VoteEvent) -> Result<()> {
        if self.severed || !self.open {
            self.open = false;
            return Err(WorkerError::Database("connection severed".to_string()));
        }
        self.upsert(&event.voter_id, event.vote);
        Ok(())
    }

    async fn probe(&mut self) -> Result<()> {
        self.probes += 1;
        if self.severed || !self.open {
            self.open = false;
            return Err(WorkerError::Database("connection severed".to_string()));
        }
        Ok(())
    }
}
