//! Action Handler Tests
//!
//! Per-action recovery while a buffer drains at commit.

use crate::common::*;
use conduit::{
    ActionHandler, ConduitError, ErrorKind, OperationContext, ResourceError, ResourceKind,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn seed(t: &TestRuntime, key: &str) {
    let mut ctx = OperationContext::new();
    t.runtime
        .transaction(&mut ctx, |ctx| {
            t.runtime.items().unwrap().create(ctx, order(key, 1))?;
            Ok(())
        })
        .unwrap();
    t.journal.clear();
}

#[test]
fn matching_handler_suppresses_failure_and_drain_continues() {
    let t = TestRuntime::new();
    seed(&t, "dup");
    let items = t.runtime.items().unwrap();
    let mut ctx = OperationContext::new();

    t.runtime
        .transaction(&mut ctx, |ctx| {
            items.create_with(
                ctx,
                order("dup", 2),
                vec![ActionHandler::ignore(ErrorKind::Conflict)],
            )?;
            items.create(ctx, order("fresh", 3))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(
        t.journal.entries(),
        vec![
            "item-store:create:dup".to_string(),
            "item-store:create:fresh".to_string()
        ]
    );
    assert!(items.read("fresh").is_ok());
}

#[test]
fn unmatched_failure_stops_the_buffer() {
    let t = TestRuntime::new();
    seed(&t, "dup");
    let items = t.runtime.items().unwrap();
    let mut ctx = OperationContext::new();

    let result = t.runtime.transaction(&mut ctx, |ctx| {
        items.create_with(ctx, order("dup", 2), vec![ActionHandler::ignore(ErrorKind::NotFound)])?;
        items.create(ctx, order("never", 3))?;
        t.runtime.publisher().unwrap().publish(ctx, event("created"))?;
        Ok(())
    });

    match result {
        Err(ConduitError::TransactionalResource { resource, source }) => {
            assert_eq!(resource, ResourceKind::ItemStore);
            assert!(matches!(source, ResourceError::Conflict(_)));
        }
        other => panic!("expected item-store failure, got {:?}", other),
    }
    assert_eq!(t.journal.entries(), vec!["item-store:create:dup".to_string()]);
    assert!(t.broker.inner.published().is_empty());
}

#[test]
fn handlers_are_tried_in_order_until_one_succeeds() {
    let t = TestRuntime::new();
    t.blobs.outage.start();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut ctx = OperationContext::new();

    let first = {
        let calls = Arc::clone(&calls);
        ActionHandler::new("escalate", ErrorKind::Unavailable, move |e| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(e.clone())
        })
    };
    let second = {
        let calls = Arc::clone(&calls);
        ActionHandler::new("park", ErrorKind::Unavailable, move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    };

    t.runtime
        .transaction(&mut ctx, |ctx| {
            t.runtime
                .blobs()
                .unwrap()
                .write_with(ctx, "archive/1", b"x".to_vec(), vec![first, second])?;
            t.runtime.publisher().unwrap().publish(ctx, event("archived"))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(t.journal.count("publisher:publish"), 1);
}
