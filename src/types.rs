//! Vote event types.
//!
//! The queue payload is a JSON object `{"vote":"a"|"b","voter_id":"<id>"}`
//! pushed by the voting front end. Deserialization into a typed event is the
//! only validation the worker performs; anything that does not parse is a
//! malformed payload.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two ballot options, serialized lowercase on the wire and in
/// the votes table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ballot {
    A,
    B,
}

impl Ballot {
    /// Wire/table representation of the ballot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Ballot::A => "a",
            Ballot::B => "b",
        }
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single vote event popped from the queue.
///
/// Immutable; a later event for the same `voter_id` overwrites the earlier
/// result in the store (last write wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    pub voter_id: String,
    pub vote: Ballot,
}

impl VoteEvent {
    /// Parse a raw queue payload into a typed event.
    pub fn from_payload(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
