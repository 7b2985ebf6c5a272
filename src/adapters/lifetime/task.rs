use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use super::next_slot_id;
use crate::domain::ports::LifetimeSlot;
use crate::services::ScopedCache;

tokio::task_local! {
    static TASK_CACHES: RefCell<HashMap<u64, Arc<ScopedCache>>>;
}

/// Slot holding one cache per tokio task-local scope (a logical call
/// context such as one request).
///
/// A lifetime begins with [`TaskSlot::scope`] or [`TaskSlot::sync_scope`] and
/// ends when that future or closure completes. Outside any scope the slot is
/// always empty and writes are discarded, so the external-lifetime tier
/// recomputes on every call.
#[derive(Debug)]
pub struct TaskSlot {
    id: u64,
}

impl TaskSlot {
    /// Empty slot.
    pub fn new() -> Self {
        Self { id: next_slot_id() }
    }

    /// Runs `future` inside a fresh lifetime.
    pub async fn scope<F: Future>(future: F) -> F::Output {
        TASK_CACHES.scope(RefCell::new(HashMap::new()), future).await
    }

    /// Runs `f` inside a fresh lifetime on the current thread.
    pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
        TASK_CACHES.sync_scope(RefCell::new(HashMap::new()), f)
    }
}

impl Default for TaskSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl LifetimeSlot for TaskSlot {
    fn get(&self) -> Option<Arc<ScopedCache>> {
        TASK_CACHES
            .try_with(|caches| caches.borrow().get(&self.id).cloned())
            .ok()
            .flatten()
    }

    fn set(&self, cache: Arc<ScopedCache>) {
        let stored = TASK_CACHES.try_with(|caches| {
            caches.borrow_mut().insert(self.id, cache);
        });
        if stored.is_err() {
            warn!(slot = self.id, "task lifetime slot used outside TaskSlot::scope, value discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_value_lives_for_one_scope() {
        let slot = TaskSlot::new();

        let inside = TaskSlot::scope(async {
            slot.set(Arc::new(ScopedCache::new("request")));
            slot.get().map(|c| c.owner_token().to_string())
        })
        .await;
        assert_eq!(inside.as_deref(), Some("request"));

        let next = TaskSlot::scope(async { slot.get().is_none() }).await;
        assert!(next);
    }

    #[test]
    fn test_outside_scope_is_always_empty() {
        let slot = TaskSlot::new();
        slot.set(Arc::new(ScopedCache::new("lost")));
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_sync_scope() {
        let slot = TaskSlot::new();
        let seen = TaskSlot::sync_scope(|| {
            slot.set(Arc::new(ScopedCache::new("sync")));
            slot.get().is_some()
        });
        assert!(seen);
    }
}
