//! Retry Routing Tests
//!
//! Redelivery state machine over the `mb-retries` header:
//! - success acks exactly once and publishes nothing
//! - failure rejects without requeue and republishes with one retry fewer
//! - exhausted retries go to the failed exchange
//! - a failed delivery is never acked

use std::sync::Arc;

use searchsync::amqp::{
    decide, BrokerError, Delivery, Outcome, RetryDecision, RetryRouter, RETRIES_HEADER,
};
use searchsync::boot::Runtime;
use searchsync::config::SearchConfig;
use searchsync::testing::{ChannelCall, MemoryStore, RecordingChannel, RecordingSink};
use serde_json::json;
use tokio::sync::mpsc;

// =============================================================================
// Helper Functions
// =============================================================================

fn delivery(tag: u64) -> Delivery {
    Delivery::new(tag, "search.index", "artist", r#"{"_table": "artist", "id": 1}"#)
}

fn fail(_: &Delivery) -> Result<(), String> {
    Err("store unavailable".to_string())
}

fn succeed(_: &Delivery) -> Result<(), String> {
    Ok(())
}

// =============================================================================
// Pure Decision
// =============================================================================

#[test]
fn test_decision_table() {
    assert_eq!(decide(false, 0), RetryDecision::Ack);
    assert_eq!(decide(false, 4), RetryDecision::Ack);
    assert_eq!(decide(true, 4), RetryDecision::Retry { remaining: 3 });
    assert_eq!(decide(true, 1), RetryDecision::Retry { remaining: 0 });
    assert_eq!(decide(true, 0), RetryDecision::DeadLetter);
}

// =============================================================================
// Routing
// =============================================================================

/// Success: one ack, nothing else.
#[test]
fn test_success_acks_once() {
    let channel = RecordingChannel::new();
    let router = RetryRouter::default();

    let outcome = router.route(&channel, &delivery(7), succeed).unwrap();
    assert_eq!(outcome, Outcome::Acked);
    assert_eq!(channel.calls(), vec![ChannelCall::Ack { tag: 7 }]);
}

/// A message that always fails is tried 1 + max_retries times, then
/// dead-lettered with its body and routing key intact.
#[test]
fn test_failure_walks_the_retry_ladder() {
    let channel = RecordingChannel::new();
    let router = RetryRouter::default();

    let mut current = delivery(1);
    let mut outcomes = Vec::new();
    loop {
        let outcome = router.route(&channel, &current, fail).unwrap();
        outcomes.push(outcome);
        if outcome == Outcome::DeadLettered {
            break;
        }
        let published = channel.published().pop().unwrap();
        let mut next = published.delivery;
        next.tag = current.tag + 1;
        current = next;
    }

    assert_eq!(
        outcomes,
        vec![
            Outcome::Requeued { remaining: 3 },
            Outcome::Requeued { remaining: 2 },
            Outcome::Requeued { remaining: 1 },
            Outcome::Requeued { remaining: 0 },
            Outcome::DeadLettered,
        ]
    );
    assert_eq!(channel.acks(), 0);
    assert_eq!(channel.rejects(), 5);

    let published = channel.published();
    let exchanges: Vec<&str> = published.iter().map(|p| p.exchange.as_str()).collect();
    assert_eq!(
        exchanges,
        vec![
            "search.retry",
            "search.retry",
            "search.retry",
            "search.retry",
            "search.failed"
        ]
    );
    for p in &published {
        assert_eq!(p.routing_key, "artist");
        assert_eq!(p.delivery.body, delivery(0).body);
    }
    assert_eq!(published[4].delivery.retries(), Some(0));
}

/// Every failure rejects without requeue before republishing.
#[test]
fn test_reject_precedes_publish() {
    let channel = RecordingChannel::new();
    RetryRouter::default()
        .route(&channel, &delivery(3), fail)
        .unwrap();

    let calls = channel.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], ChannelCall::Reject { tag: 3, requeue: false });
    assert!(matches!(&calls[1], ChannelCall::Publish(p) if p.delivery.retries() == Some(3)));
}

#[test]
fn test_header_edge_cases() {
    let router = RetryRouter::default();
    let cases = [
        (json!(10), Outcome::Requeued { remaining: 3 }),
        (json!("2"), Outcome::Requeued { remaining: 1 }),
        (json!("many"), Outcome::Requeued { remaining: 3 }),
        (json!(-1), Outcome::Requeued { remaining: 3 }),
        (json!(0), Outcome::DeadLettered),
    ];

    for (header, expected) in cases {
        let channel = RecordingChannel::new();
        let d = delivery(1).with_header(RETRIES_HEADER, header.clone());
        assert_eq!(
            router.route(&channel, &d, fail).unwrap(),
            expected,
            "header {}",
            header
        );
    }
}

#[test]
fn test_custom_router() {
    let channel = RecordingChannel::new();
    let router = RetryRouter::new("mb.retry", "mb.dead", 1);

    let outcome = router.route(&channel, &delivery(1), fail).unwrap();
    assert_eq!(outcome, Outcome::Requeued { remaining: 0 });
    assert_eq!(channel.published()[0].exchange, "mb.retry");

    let again = channel.published()[0].delivery.clone();
    assert_eq!(router.route(&channel, &again, fail).unwrap(), Outcome::DeadLettered);
    assert_eq!(channel.published()[1].exchange, "mb.dead");
}

/// A closed channel surfaces as a broker error, not an outcome.
#[test]
fn test_closed_channel() {
    let channel = RecordingChannel::new();
    channel.set_closed(true);

    let err = RetryRouter::default()
        .route(&channel, &delivery(1), succeed)
        .unwrap_err();
    assert_eq!(err, BrokerError::Closed);
    assert!(channel.calls().is_empty());
}

// =============================================================================
// Worker
// =============================================================================

/// Deliveries are settled one at a time and counted.
#[tokio::test]
async fn test_worker_settles_every_delivery() {
    let runtime = Runtime::from_config(SearchConfig::default()).unwrap();
    let store = Arc::new(MemoryStore::new(Arc::clone(runtime.catalog())));
    store.insert("artist", json!({"id": 1, "gid": "artist-1", "name": "Autechre"}));
    let sink = Arc::new(RecordingSink::new());
    let channel = Arc::new(RecordingChannel::new());

    let dispatcher = Arc::new(runtime.dispatcher(store.clone(), sink.clone()));
    let worker = runtime.worker("worker-0", dispatcher, channel.clone());

    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(worker.run(rx));

    tx.send(delivery(1)).await.unwrap();
    tx.send(Delivery::new(2, "search.index", "artist", "not json"))
        .await
        .unwrap();
    tx.send(Delivery::new(
        3,
        "search.index",
        "recording",
        r#"{"_table": "recording", "id": 1}"#,
    ))
    .await
    .unwrap();
    tx.send(Delivery::new(
        4,
        "search.delete",
        "artist",
        r#"{"_table": "artist", "gid": "artist-1"}"#,
    ))
    .await
    .unwrap();
    drop(tx);

    assert_eq!(handle.await.unwrap().unwrap(), 4);

    assert_eq!(channel.acks(), 2);
    assert_eq!(channel.rejects(), 2);
    assert_eq!(sink.indexed().len(), 1);

    let metrics = runtime.metrics().snapshot();
    assert_eq!(metrics.messages_received, 4);
    assert_eq!(metrics.messages_acked, 2);
    assert_eq!(metrics.messages_requeued, 2);
    assert_eq!(metrics.documents_indexed, 1);
    assert_eq!(metrics.documents_deleted, 1);
}

/// A broker failure stops the worker.
#[tokio::test]
async fn test_worker_stops_on_closed_channel() {
    let runtime = Runtime::from_config(SearchConfig::default()).unwrap();
    let store = Arc::new(MemoryStore::new(Arc::clone(runtime.catalog())));
    let channel = Arc::new(RecordingChannel::new());
    channel.set_closed(true);

    let dispatcher = Arc::new(runtime.dispatcher(store, Arc::new(RecordingSink::new())));
    let worker = runtime.worker("worker-1", dispatcher, channel);

    let (tx, rx) = mpsc::channel(2);
    let handle = tokio::spawn(worker.run(rx));
    tx.send(delivery(1)).await.unwrap();

    assert_eq!(handle.await.unwrap().unwrap_err(), BrokerError::Closed);
}
