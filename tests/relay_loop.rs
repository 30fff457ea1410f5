//! Relay loop behavior against the in-memory providers.
//!
//! Drives single iterations through `RelayWorker::step` so each scenario
//! can assert exactly what the loop did: what was popped, what was written,
//! what was probed, and what was reconnected.

use std::sync::Arc;
use std::time::Duration;
use vote_worker::testing::{InMemoryVoteQueue, InMemoryVoteStore};
use vote_worker::{
    Ballot, ConnectionSupervisor, RelayWorker, Shutdown, Tick, VoteEvent, VoteStore,
};

type TestRelay = RelayWorker<InMemoryVoteQueue, InMemoryVoteStore>;

fn relay(queue: InMemoryVoteQueue, store: InMemoryVoteStore) -> (TestRelay, Arc<Shutdown>) {
    let shutdown = Arc::new(Shutdown::new());
    let supervisor = ConnectionSupervisor::new(queue, store);
    let relay = RelayWorker::new(supervisor, Duration::from_millis(1), Arc::clone(&shutdown));
    (relay, shutdown)
}

fn event(voter: &str, vote: Ballot) -> VoteEvent {
    VoteEvent {
        voter_id: voter.to_string(),
        vote,
    }
}

#[tokio::test]
async fn end_to_end_vote_then_revote_then_more_voters() {
    let mut queue = InMemoryVoteQueue::new();
    queue.push_raw(r#"{"vote":"a","voter_id":"v1"}"#);
    let (mut relay, _shutdown) = relay(queue, InMemoryVoteStore::new());

    assert_eq!(relay.step().await.unwrap(), Tick::Applied);
    assert_eq!(relay.supervisor().store().vote_for("v1"), Some(Ballot::A));
    assert_eq!(relay.supervisor().store().row_count(), 1);

    // The same voter votes again: single row, updated in place.
    relay
        .supervisor_mut()
        .queue_mut()
        .push_raw(r#"{"vote":"b","voter_id":"v1"}"#);
    assert_eq!(relay.step().await.unwrap(), Tick::Applied);
    assert_eq!(relay.supervisor().store().vote_for("v1"), Some(Ballot::B));
    assert_eq!(relay.supervisor().store().row_count(), 1);
    assert_eq!(relay.supervisor().store().updates, 1);

    // More voters with mixed ballots.
    for (voter, vote) in [
        ("v2", Ballot::A),
        ("v3", Ballot::B),
        ("v4", Ballot::A),
        ("v5", Ballot::A),
    ] {
        relay.supervisor_mut().queue_mut().push_event(&event(voter, vote));
        assert_eq!(relay.step().await.unwrap(), Tick::Applied);
    }

    let tally = relay.supervisor().store().tally();
    assert_eq!(tally.get(&Ballot::A), Some(&3)); // v2, v4, v5
    assert_eq!(tally.get(&Ballot::B), Some(&2)); // v1 (revoted), v3
    assert_eq!(relay.supervisor().store().row_count(), 5);
}

#[tokio::test]
async fn redelivered_event_is_idempotent() {
    let mut queue = InMemoryVoteQueue::new();
    let vote = event("v1", Ballot::A);
    queue.push_event(&vote);
    queue.push_event(&vote);
    let (mut relay, _shutdown) = relay(queue, InMemoryVoteStore::new());

    assert_eq!(relay.step().await.unwrap(), Tick::Applied);
    assert_eq!(relay.step().await.unwrap(), Tick::Applied);

    let store = relay.supervisor().store();
    assert_eq!(store.row_count(), 1);
    assert_eq!(store.vote_for("v1"), Some(Ballot::A));
}

#[tokio::test]
async fn idle_tick_probes_the_store_and_never_writes() {
    let (mut relay, _shutdown) = relay(InMemoryVoteQueue::new(), InMemoryVoteStore::new());

    assert_eq!(relay.step().await.unwrap(), Tick::Idle);
    assert_eq!(relay.step().await.unwrap(), Tick::Idle);

    let store = relay.supervisor().store();
    assert_eq!(store.probes, 2);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn malformed_payload_is_dropped_and_the_loop_continues() {
    let mut queue = InMemoryVoteQueue::new();
    queue.push_raw("{not json");
    queue.push_raw(r#"{"vote":"c","voter_id":"v1"}"#);
    queue.push_event(&event("v2", Ballot::B));
    let (mut relay, _shutdown) = relay(queue, InMemoryVoteStore::new());

    assert_eq!(relay.step().await.unwrap(), Tick::Skipped);
    assert_eq!(relay.step().await.unwrap(), Tick::Skipped);
    assert_eq!(relay.step().await.unwrap(), Tick::Applied);

    let store = relay.supervisor().store();
    assert_eq!(store.row_count(), 1);
    assert_eq!(store.vote_for("v2"), Some(Ballot::B));
}

#[tokio::test]
async fn severed_store_loses_at_most_the_inflight_event() {
    let mut queue = InMemoryVoteQueue::new();
    queue.push_event(&event("v1", Ballot::A));
    queue.push_event(&event("v2", Ballot::B));
    let (mut relay, _shutdown) = relay(queue, InMemoryVoteStore::new());

    // Sever the store before the first event is applied: the popped event
    // is lost (documented at-least-once-per-successful-write boundary) and
    // the handle is marked closed.
    relay.supervisor_mut().store_mut().sever();
    assert_eq!(relay.step().await.unwrap(), Tick::Skipped);
    assert!(!relay.supervisor().store().is_open());

    // Once the backing connection is restored, the next iteration
    // reconnects and applies the remaining events with no further loss.
    relay.supervisor_mut().store_mut().restore();
    assert_eq!(relay.step().await.unwrap(), Tick::Applied);

    let store = relay.supervisor().store();
    assert_eq!(store.reconnects, 1);
    assert_eq!(store.vote_for("v1"), None);
    assert_eq!(store.vote_for("v2"), Some(Ballot::B));
}

#[tokio::test]
async fn no_pop_is_attempted_while_the_queue_is_disconnected() {
    let mut queue = InMemoryVoteQueue::new();
    queue.push_event(&event("v1", Ballot::A));
    queue.disconnect();
    let (mut relay, _shutdown) = relay(queue, InMemoryVoteStore::new());

    // The supervisor reconnects before the loop polls; polling then
    // resumes from the current queue head.
    assert_eq!(relay.step().await.unwrap(), Tick::Applied);

    let queue = relay.supervisor().queue();
    assert_eq!(queue.pops_while_disconnected, 0);
    assert_eq!(queue.reconnects, 1);
    assert_eq!(
        relay.supervisor().store().vote_for("v1"),
        Some(Ballot::A)
    );
}

#[tokio::test]
async fn shutdown_interrupts_a_pending_reconnect() {
    let mut queue = InMemoryVoteQueue::new();
    queue.disconnect();
    let (mut relay, shutdown) = relay(queue, InMemoryVoteStore::new());

    shutdown.request();
    assert_eq!(relay.step().await.unwrap(), Tick::Shutdown);
}

#[tokio::test]
async fn run_stops_on_shutdown_request() {
    let mut queue = InMemoryVoteQueue::new();
    queue.push_event(&event("v1", Ballot::A));
    let (mut relay, shutdown) = relay(queue, InMemoryVoteStore::new());

    let handle = tokio::spawn(async move {
        relay.run().await.unwrap();
        relay
    });

    // Let the loop drain the queue before stopping it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.request();

    let relay = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("relay loop should stop promptly after shutdown")
        .unwrap();
    assert_eq!(relay.supervisor().store().vote_for("v1"), Some(Ballot::A));
    assert!(relay.supervisor().queue().is_empty());
}
