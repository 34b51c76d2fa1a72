//! Per-workflow mutual exclusion

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per workflow id. Operations on different workflows never
/// contend; load-mutate-save sequences on the same workflow are serialized.
///
/// Entries live only while some caller holds or waits on the lock, so ids
/// that never resolve to a workflow leave nothing behind.
#[derive(Default)]
pub struct WorkflowLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Exclusive access to one workflow, released on drop
pub struct WorkflowGuard<'a> {
    locks: &'a WorkflowLocks,
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WorkflowGuard<'_> {
    fn drop(&mut self) {
        // Release first so the map holds the only remaining reference
        self.guard.take();
        self.locks.release(self.id);
    }
}

impl WorkflowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to workflow `id`
    pub async fn acquire(&self, id: Uuid) -> WorkflowGuard<'_> {
        // Clone out of the map so no shard lock is held across the await
        let lock = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        WorkflowGuard {
            locks: self,
            id,
            guard: Some(guard),
        }
    }

    /// Drop the entry for `id` unless another caller still holds or waits on it
    fn release(&self, id: Uuid) {
        self.locks
            .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
