//! Ordering Property Tests
//!
//! For any subset of configured resources:
//! - begin runs publisher → sender → blob-store → item-store
//! - commit and abort run item-store → blob-store → sender → publisher
//! - actions within one resource apply in queuing order

use crate::common::*;
use conduit::{
    InMemoryBlobStore, InMemoryItemStore, InMemoryPublisher, InMemoryQueue, OperationContext,
    ResourceKind, Result, TransactionCoordinator, TransactionId, TransactionalBlobStore,
    TransactionalItemStore, TransactionalPublisher, TransactionalResource, TransactionalSender,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Phase recorder
// ============================================================================

struct PhaseRecorder {
    kind: ResourceKind,
    log: Arc<Mutex<Vec<(&'static str, ResourceKind)>>>,
}

impl TransactionalResource for PhaseRecorder {
    fn resource_kind(&self) -> ResourceKind {
        self.kind
    }

    fn begin(&self, _: TransactionId) -> Result<()> {
        self.log.lock().push(("begin", self.kind));
        Ok(())
    }

    fn commit(&self, _: TransactionId) -> Result<()> {
        self.log.lock().push(("commit", self.kind));
        Ok(())
    }

    fn abort(&self, _: TransactionId) -> Result<()> {
        self.log.lock().push(("abort", self.kind));
        Ok(())
    }
}

fn selected(mask: [bool; 4]) -> Vec<ResourceKind> {
    ResourceKind::COMMIT_ORDER
        .iter()
        .zip(mask)
        .filter(|(_, on)| *on)
        .map(|(kind, _)| *kind)
        .collect()
}

fn phases(log: &[(&'static str, ResourceKind)], phase: &str) -> Vec<ResourceKind> {
    log.iter()
        .filter(|(p, _)| *p == phase)
        .map(|(_, kind)| *kind)
        .collect()
}

proptest! {
    #[test]
    fn phases_follow_fixed_order(mask in any::<[bool; 4]>(), abort in any::<bool>()) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let kinds = selected(mask);
        let coordinator = kinds
            .iter()
            .fold(TransactionCoordinator::builder(), |b, kind| {
                b.resource(Arc::new(PhaseRecorder { kind: *kind, log: Arc::clone(&log) }))
            })
            .build();

        let mut ctx = OperationContext::new();
        coordinator.begin(&mut ctx).unwrap();
        if abort {
            coordinator.abort(&mut ctx).unwrap();
        } else {
            coordinator.commit(&mut ctx).unwrap();
        }

        let log = log.lock().clone();
        let mut begin_order = kinds.clone();
        begin_order.reverse();
        prop_assert_eq!(phases(&log, "begin"), begin_order);
        let end_phase = if abort { "abort" } else { "commit" };
        prop_assert_eq!(phases(&log, end_phase), kinds);
        prop_assert_eq!(log.len(), 2 * mask.iter().filter(|on| **on).count());
    }

    #[test]
    fn commit_applies_resources_in_order(
        mask in any::<[bool; 4]>(),
        counts in proptest::array::uniform4(0usize..4),
    ) {
        let journal = Journal::new();
        let mut builder = TransactionCoordinator::builder();

        let items = mask[0].then(|| {
            Arc::new(TransactionalItemStore::new(Arc::new(RecordingItemStore {
                inner: InMemoryItemStore::new(),
                journal: journal.clone(),
                outage: Outage::default(),
            })))
        });
        let blobs = mask[1].then(|| {
            Arc::new(TransactionalBlobStore::new(Arc::new(RecordingBlobStore {
                inner: InMemoryBlobStore::new(),
                journal: journal.clone(),
                outage: Outage::default(),
            })))
        });
        let sender = mask[2].then(|| {
            Arc::new(TransactionalSender::new(Arc::new(RecordingQueue {
                inner: InMemoryQueue::new(),
                journal: journal.clone(),
                outage: Outage::default(),
            })))
        });
        let publisher = mask[3].then(|| {
            Arc::new(TransactionalPublisher::new(Arc::new(RecordingPublisher {
                inner: InMemoryPublisher::new(),
                journal: journal.clone(),
                outage: Outage::default(),
            })))
        });

        if let Some(r) = &items { builder = builder.resource(r.clone()); }
        if let Some(r) = &blobs { builder = builder.resource(r.clone()); }
        if let Some(r) = &sender { builder = builder.resource(r.clone()); }
        if let Some(r) = &publisher { builder = builder.resource(r.clone()); }
        let coordinator = builder.build();

        let mut ctx = OperationContext::new();
        coordinator.begin(&mut ctx).unwrap();
        // Queue in the reverse of commit order to show queuing order across
        // resources does not matter.
        if let Some(p) = &publisher {
            for n in 0..counts[3] { p.publish(&ctx, event(&format!("e{}", n))).unwrap(); }
        }
        if let Some(s) = &sender {
            for n in 0..counts[2] { s.send(&ctx, event(&format!("m{}", n))).unwrap(); }
        }
        if let Some(b) = &blobs {
            for n in 0..counts[1] { b.write(&ctx, format!("dir/{}", n), vec![n as u8]).unwrap(); }
        }
        if let Some(i) = &items {
            for n in 0..counts[0] { i.create(&ctx, order(&format!("k{}", n), n as u64)).unwrap(); }
        }
        coordinator.commit(&mut ctx).unwrap();

        let entries = journal.entries();
        let rank = |entry: &String| {
            ["item-store", "blob-store", "sender", "publisher"]
                .iter()
                .position(|name| entry.starts_with(name))
                .unwrap()
        };
        let ranks: Vec<usize> = entries.iter().map(rank).collect();
        prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]));

        let expected: usize = (0..4).filter(|i| mask[*i]).map(|i| counts[i]).sum();
        prop_assert_eq!(entries.len(), expected);

        let item_keys: Vec<String> = entries
            .iter()
            .filter_map(|e| e.strip_prefix("item-store:create:").map(str::to_string))
            .collect();
        let queued: Vec<String> = (0..if mask[0] { counts[0] } else { 0 })
            .map(|n| format!("k{}", n))
            .collect();
        prop_assert_eq!(item_keys, queued);
    }
}
