//! End-to-End Tests
//!
//! One logical operation touching every resource, observed through the
//! recording resources.

use crate::common::*;
use conduit::{ActionKind, BlobStore, Item, OperationContext, Query};
use serde_json::json;

#[test]
fn create_and_write_observed_once_in_order_with_publish_last() {
    let t = TestRuntime::new();
    let mut ctx = OperationContext::new();

    let published = event("order-created");
    let published_id = published.id;
    t.runtime
        .transaction(&mut ctx, |ctx| {
            // Queue the publish first; it must still be applied last.
            t.runtime.publisher().unwrap().publish(ctx, published)?;
            t.runtime
                .blobs()
                .unwrap()
                .write(ctx, "orders/42.json", br#"{"total":42}"#.to_vec())?;
            t.runtime.items().unwrap().create(ctx, order("order:42", 42))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(
        t.journal.entries(),
        vec![
            "item-store:create:order:42".to_string(),
            "blob-store:write:orders/42.json".to_string(),
            format!("publisher:publish:{}", published_id),
        ]
    );
    assert_eq!(t.broker.inner.published().len(), 1);
    assert_eq!(t.blobs.inner.read("orders/42.json").unwrap(), br#"{"total":42}"#.to_vec());
}

#[test]
fn update_and_delete_use_provisional_versions() {
    let t = TestRuntime::new();
    let items = t.runtime.items().unwrap();
    let mut ctx = OperationContext::new();

    t.runtime
        .transaction(&mut ctx, |ctx| {
            items.create(ctx, order("order:7", 7))?;
            Ok(())
        })
        .unwrap();

    let stored = items.read("order:7").unwrap();
    let updated = t
        .runtime
        .transaction(&mut ctx, |ctx| {
            items.update(
                ctx,
                Item::new("order:7", json!({"total": 8})).with_version(stored.version),
            )
        })
        .unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(items.read("order:7").unwrap().data, json!({"total": 8}));

    t.runtime
        .transaction(&mut ctx, |ctx| items.delete(ctx, updated.clone()))
        .unwrap();
    assert!(items.read("order:7").is_err());
    assert!(items.fetch(&Query::prefix("order:")).unwrap().is_empty());
}

#[test]
fn delayed_send_keeps_delay() {
    let t = TestRuntime::new();
    let mut ctx = OperationContext::new();

    t.runtime
        .transaction(&mut ctx, |ctx| {
            let sender = t.runtime.sender().unwrap();
            sender.send(ctx, event("now"))?;
            sender.send_delayed(ctx, event("later"), 90)?;
            let pending = sender.pending(ctx.active_transaction()?).unwrap();
            assert_eq!(pending.count(ActionKind::Send), 1);
            assert_eq!(pending.count(ActionKind::SendDelayed), 1);
            Ok(())
        })
        .unwrap();

    let delays: Vec<u64> = t
        .queue
        .inner
        .messages()
        .iter()
        .map(|queued| queued.delay_seconds)
        .collect();
    assert_eq!(delays, vec![0, 90]);
}

#[test]
fn separate_contexts_have_isolated_buffers() {
    let t = TestRuntime::new();
    let items = t.runtime.items().unwrap();
    let mut first = OperationContext::new();
    let mut second = OperationContext::new();

    t.runtime.coordinator().begin(&mut first).unwrap();
    t.runtime.coordinator().begin(&mut second).unwrap();
    items.create(&first, order("from-first", 1)).unwrap();
    items.create(&second, order("from-second", 2)).unwrap();

    t.runtime.coordinator().abort(&mut second).unwrap();
    t.runtime.coordinator().commit(&mut first).unwrap();

    assert_eq!(t.journal.entries(), vec!["item-store:create:from-first".to_string()]);
}
