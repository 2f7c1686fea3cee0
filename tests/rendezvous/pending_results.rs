//! Pending Result Tests

use conduit::{
    Classify, ConduitConfig, ConduitError, ErrorKind, InMemoryBroadcast, InstanceId,
    PendingResultRegistry, ResultOffer, RetrySwitch, Runtime,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Quote {
    sku: String,
    cents: u64,
}

fn quote() -> Quote {
    Quote {
        sku: "widget".into(),
        cents: 1299,
    }
}

fn instances() -> (
    Arc<InMemoryBroadcast<ResultOffer>>,
    Arc<PendingResultRegistry<Quote>>,
    Arc<PendingResultRegistry<Quote>>,
) {
    let channel: Arc<InMemoryBroadcast<ResultOffer>> = Arc::new(InMemoryBroadcast::new());
    let a = PendingResultRegistry::new(channel.clone());
    let b = PendingResultRegistry::new(channel.clone());
    (channel, a, b)
}

#[test]
fn remote_instance_supplies_result_to_waiting_poller() {
    let (_, a, b) = instances();
    let id = a.create();

    let poller = {
        let a = Arc::clone(&a);
        thread::spawn(move || a.poll(id))
    };
    thread::sleep(Duration::from_millis(20));
    b.offer(id, quote()).unwrap();

    assert_eq!(poller.join().unwrap().unwrap(), quote());
    assert!(a.is_empty());
}

#[test]
fn only_owning_instance_applies_offer() {
    let (channel, a, b) = instances();
    let c: Arc<PendingResultRegistry<Quote>> = PendingResultRegistry::new(channel.clone());
    assert_eq!(channel.subscriber_count(), 3);

    let id = a.create();
    let other = c.create();
    b.offer(id, quote()).unwrap();

    assert_eq!(a.poll(id).unwrap(), quote());
    assert_eq!(c.len(), 1);
    assert!(matches!(
        c.state(other),
        Some(conduit::CellState::Unset)
    ));
}

#[test]
fn second_offer_is_noop_and_second_poll_is_protocol_error() {
    let (_, a, b) = instances();
    let id = a.create();

    b.offer(id, quote()).unwrap();
    b.offer(
        id,
        Quote {
            sku: "widget".into(),
            cents: 1,
        },
    )
    .unwrap();

    assert_eq!(a.poll(id).unwrap().cents, 1299);
    assert!(matches!(a.poll(id), Err(ConduitError::Protocol(_))));
}

#[test]
fn abort_offer_fails_poller_before_timeout() {
    let (_, a, b) = instances();
    let id = a.create();

    let poller = {
        let a = Arc::clone(&a);
        thread::spawn(move || a.poll(id))
    };
    thread::sleep(Duration::from_millis(20));
    b.abort_offer(id).unwrap();

    let err = poller.join().unwrap().unwrap_err();
    assert!(!matches!(err, ConduitError::Timeout { .. }));
}

#[test]
fn offer_to_unknown_instance_is_ignored() {
    let (_, a, _) = instances();
    let id = a.create();
    let stray = conduit::PendingId {
        instance: InstanceId::new(),
        cell: id.cell,
    };

    a.offer(stray, quote()).unwrap();
    assert_eq!(a.state(id), Some(conduit::CellState::Unset));
}

#[test]
fn runtime_registries_share_configured_timeout() {
    let runtime = Runtime::builder(ConduitConfig::default())
        .instance(InstanceId::new())
        .retry_switch(RetrySwitch::detached(true))
        .build()
        .unwrap();
    let channel: Arc<InMemoryBroadcast<ResultOffer>> = Arc::new(InMemoryBroadcast::new());
    let registry = runtime.pending_results::<Quote>(channel);
    assert_eq!(registry.timeout(), Duration::from_secs(30));
    assert_eq!(registry.instance(), runtime.instance());
}

#[test]
fn dropped_runtime_registries_leave_no_subscribers() {
    let runtime = Runtime::builder(ConduitConfig::default())
        .retry_switch(RetrySwitch::detached(true))
        .build()
        .unwrap();
    let channel: Arc<InMemoryBroadcast<ResultOffer>> = Arc::new(InMemoryBroadcast::new());

    for _ in 0..1000 {
        let registry = runtime.pending_results::<Quote>(channel.clone());
        registry.create();
    }
    assert_eq!(channel.subscriber_count(), 0);

    let live = runtime.pending_results::<Quote>(channel.clone());
    assert_eq!(channel.subscriber_count(), 1);
    let id = live.create();
    let producer: Arc<PendingResultRegistry<Quote>> = PendingResultRegistry::new(channel.clone());
    producer.offer(id, quote()).unwrap();
    assert_eq!(live.poll(id).unwrap(), quote());
}

#[test]
fn failure_class_is_the_same_for_local_and_remote_offers() {
    let (_, a, b) = instances();
    let local = a.create();
    let remote = a.create();
    let declined =
        || ConduitError::operation_failed_as(ErrorKind::Custom("declined"), "card declined");

    a.offer_error(local, declined()).unwrap();
    b.offer_error(remote, declined()).unwrap();

    assert_eq!(a.poll(local).unwrap_err().kind(), ErrorKind::Custom("declined"));
    assert_eq!(a.poll(remote).unwrap_err().kind(), ErrorKind::Custom("declined"));
}
