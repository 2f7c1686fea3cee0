//! Transaction Lifecycle Tests
//!
//! Tests for the structural rules of a transaction:
//! - Begin-commit and begin-abort cycles
//! - Nested begin and missing transactions
//! - Partial commit followed by abort

use crate::common::*;
use conduit::{ConduitError, OperationContext, ResourceKind, TransactionStatus};

// ============================================================================
// Begin-Commit / Begin-Abort
// ============================================================================

#[test]
fn commit_applies_buffered_actions() {
    let t = TestRuntime::new();
    let items = t.runtime.items().unwrap();
    let mut ctx = OperationContext::new();

    t.runtime.coordinator().begin(&mut ctx).unwrap();
    let provisional = items.create(&ctx, order("order:1", 10)).unwrap();
    assert_eq!(provisional.version, 1);
    assert!(items.read("order:1").is_err(), "no read-your-own-writes");

    let txn = t.runtime.coordinator().commit(&mut ctx).unwrap();
    assert_eq!(txn.status(), TransactionStatus::Committed);
    assert!(!ctx.in_transaction());
    assert_eq!(items.read("order:1").unwrap().version, 1);
}

#[test]
fn abort_discards_buffered_actions() {
    let t = TestRuntime::new();
    let mut ctx = OperationContext::new();

    let txn_id = t.runtime.coordinator().begin(&mut ctx).unwrap();
    t.runtime
        .blobs()
        .unwrap()
        .write(&ctx, "invoices/1.pdf", b"%PDF".to_vec())
        .unwrap();
    t.runtime.sender().unwrap().send(&ctx, event("queued")).unwrap();
    assert_eq!(t.runtime.blobs().unwrap().pending(txn_id).unwrap().total(), 1);

    let report = t.runtime.coordinator().abort(&mut ctx).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.transaction.status(), TransactionStatus::Aborted);
    assert!(t.journal.entries().is_empty());
    assert!(t.runtime.blobs().unwrap().pending(txn_id).is_none());
}

#[test]
fn context_is_reusable_after_commit() {
    let t = TestRuntime::new();
    let items = t.runtime.items().unwrap();
    let mut ctx = OperationContext::new();

    for n in 0..3 {
        t.runtime.coordinator().begin(&mut ctx).unwrap();
        items.create(&ctx, order(&format!("order:{}", n), n)).unwrap();
        t.runtime.coordinator().commit(&mut ctx).unwrap();
    }
    assert_eq!(t.journal.count("item-store:create"), 3);
    assert_eq!(t.runtime.stats().committed, 3);
}

// ============================================================================
// Structural errors
// ============================================================================

#[test]
fn nested_begin_touches_no_resource() {
    let t = TestRuntime::new();
    let mut ctx = OperationContext::new();
    let first = t.runtime.coordinator().begin(&mut ctx).unwrap();

    let err = t.runtime.coordinator().begin(&mut ctx).unwrap_err();
    assert!(matches!(err, ConduitError::NestedTransaction(id) if id == first));
    assert_eq!(t.runtime.stats().started, 1);
}

#[test]
fn mutation_without_transaction_fails() {
    let t = TestRuntime::new();
    let ctx = OperationContext::new();

    assert!(matches!(
        t.runtime.items().unwrap().create(&ctx, order("a", 1)),
        Err(ConduitError::NonExistentTransaction)
    ));
    assert!(matches!(
        t.runtime.publisher().unwrap().publish(&ctx, event("e")),
        Err(ConduitError::NonExistentTransaction)
    ));
}

#[test]
fn commit_or_abort_without_transaction_fails() {
    let t = TestRuntime::new();
    let mut ctx = OperationContext::new();

    assert!(matches!(
        t.runtime.coordinator().commit(&mut ctx),
        Err(ConduitError::NonExistentTransaction)
    ));
    assert!(matches!(
        t.runtime.coordinator().abort(&mut ctx),
        Err(ConduitError::NonExistentTransaction)
    ));
}

// ============================================================================
// Partial commit
// ============================================================================

#[test]
fn failed_commit_keeps_transaction_for_abort() {
    let t = TestRuntime::new();
    let mut ctx = OperationContext::new();

    t.runtime.coordinator().begin(&mut ctx).unwrap();
    t.runtime.items().unwrap().create(&ctx, order("order:9", 9)).unwrap();
    t.runtime
        .blobs()
        .unwrap()
        .write(&ctx, "receipts/9.txt", b"paid".to_vec())
        .unwrap();
    t.runtime.sender().unwrap().send(&ctx, event("shipped")).unwrap();
    t.runtime.publisher().unwrap().publish(&ctx, event("paid")).unwrap();

    t.blobs.outage.start();
    let err = t.runtime.coordinator().commit(&mut ctx).unwrap_err();
    assert!(matches!(
        err,
        ConduitError::TransactionalResource {
            resource: ResourceKind::BlobStore,
            ..
        }
    ));
    assert!(ctx.in_transaction());

    // The item store already committed; its buffer is gone.
    let report = t.runtime.coordinator().abort(&mut ctx).unwrap();
    let failed: Vec<ResourceKind> = report.failures.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(failed, vec![ResourceKind::ItemStore, ResourceKind::BlobStore]);
    assert!(!ctx.in_transaction());

    assert_eq!(t.journal.entries(), vec!["item-store:create:order:9".to_string()]);
    assert!(t.queue.inner.messages().is_empty());
    assert!(t.broker.inner.published().is_empty());
}

#[test]
fn transaction_helper_aborts_on_business_error() {
    let t = TestRuntime::new();
    let mut ctx = OperationContext::new();

    let result: conduit::Result<()> = t.runtime.transaction(&mut ctx, |ctx| {
        t.runtime.items().unwrap().create(ctx, order("order:2", 2))?;
        Err(ConduitError::operation_failed("credit check failed"))
    });

    assert!(matches!(result, Err(ConduitError::OperationFailed { .. })));
    assert!(t.journal.entries().is_empty());
    assert_eq!(t.runtime.stats().aborted, 1);
    assert_eq!(t.runtime.stats().active, 0);
}
