//! Continuation Tests

use conduit::{
    CellState, ConduitConfig, ConduitError, ContinuationRegistry, ManualClock, OperationContext,
    RetrySwitch, Runtime,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn runtime_with_clock(clock: Arc<ManualClock>) -> Runtime {
    Runtime::builder(ConduitConfig::default())
        .clock(clock)
        .retry_switch(RetrySwitch::detached(true))
        .build()
        .unwrap()
}

#[test]
fn worker_thread_completes_deferred_call() {
    let registry: Arc<ContinuationRegistry<u64>> = Arc::new(ContinuationRegistry::new());
    let mut ctx = OperationContext::new();
    let id = registry.create(&mut ctx).unwrap();

    let worker = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            let total: u64 = (1..=10).sum();
            registry.set_result(id, Ok(total)).unwrap();
            registry.signal_complete(id).unwrap()
        })
    };

    assert_eq!(registry.poll(&mut ctx).unwrap(), 55);
    assert!(worker.join().unwrap());
    assert!(registry.is_empty());
}

#[test]
fn worker_failure_is_returned_to_caller() {
    let registry: Arc<ContinuationRegistry<u64>> = Arc::new(ContinuationRegistry::new());
    let mut ctx = OperationContext::new();
    let id = registry.create(&mut ctx).unwrap();

    let registry_for_worker = Arc::clone(&registry);
    thread::spawn(move || {
        registry_for_worker
            .offer(id, Err(ConduitError::operation_failed("upstream rejected")))
            .unwrap()
    })
    .join()
    .unwrap();

    let err = registry.poll(&mut ctx).unwrap_err();
    assert!(err.to_string().contains("upstream rejected"));
}

#[test]
fn configured_timeout_elapses_on_manual_clock() {
    let clock = Arc::new(ManualClock::new());
    let runtime = runtime_with_clock(clock.clone());
    let registry: Arc<ContinuationRegistry<String>> = Arc::new(runtime.continuations());
    let timeout = runtime.config().rendezvous.continuation_timeout();
    assert_eq!(timeout, Duration::from_secs(120));

    let mut ctx = OperationContext::new();
    let id = registry.create(&mut ctx).unwrap();
    let poller = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.poll(&mut ctx))
    };

    thread::sleep(Duration::from_millis(50));
    clock.advance(timeout);
    let err = poller.join().unwrap().unwrap_err();
    assert!(matches!(err, ConduitError::Timeout { cell, .. } if cell == id));
    assert!(registry.state(id).is_none());
}

#[test]
fn late_offer_after_poll_is_rejected() {
    let registry: ContinuationRegistry<u8> = ContinuationRegistry::new();
    let mut ctx = OperationContext::new();
    let id = registry.create(&mut ctx).unwrap();

    assert!(registry.offer(id, Ok(1)).unwrap());
    assert!(!registry.offer(id, Ok(2)).unwrap());
    assert_eq!(registry.state(id), Some(CellState::Set));
    assert_eq!(registry.poll(&mut ctx).unwrap(), 1);

    assert!(matches!(
        registry.offer(id, Ok(3)),
        Err(ConduitError::Protocol(_))
    ));
}

#[test]
fn oversized_configured_timeout_is_rejected() {
    let err = ConduitConfig::from_toml_str(
        "[rendezvous]\ncontinuation_timeout_secs = 9223372036854775807\n",
    )
    .unwrap_err();
    assert!(matches!(err, ConduitError::Config(_)));

    let mut config = ConduitConfig::default();
    config.rendezvous.continuation_timeout_secs = u64::MAX;
    assert!(matches!(
        Runtime::builder(config).build(),
        Err(ConduitError::Config(_))
    ));
}

#[test]
fn longest_accepted_timeout_still_delivers_offer() {
    let mut config = ConduitConfig::default();
    config.rendezvous.continuation_timeout_secs = conduit::MAX_RENDEZVOUS_TIMEOUT_SECS;
    let runtime = Runtime::builder(config)
        .retry_switch(RetrySwitch::detached(true))
        .build()
        .unwrap();
    let registry = runtime.continuations::<u8>();
    let mut ctx = OperationContext::new();
    let id = registry.create(&mut ctx).unwrap();

    registry.offer(id, Ok(7)).unwrap();
    assert_eq!(registry.poll(&mut ctx).unwrap(), 7);
    assert!(registry.is_empty());
}
