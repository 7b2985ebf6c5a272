use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::thread::{self, ThreadId};
use tracing::trace;

use crate::domain::ports::LifetimeSlot;
use crate::services::ScopedCache;

type PerThread = RwLock<HashMap<ThreadId, Arc<ScopedCache>>>;

/// Removes this thread's values from every live slot it wrote to when the
/// thread exits.
struct ExitHook {
    thread: ThreadId,
    slots: RefCell<Vec<Weak<PerThread>>>,
}

impl ExitHook {
    fn new() -> Self {
        Self {
            thread: thread::current().id(),
            slots: RefCell::new(Vec::new()),
        }
    }

    fn register(&self, values: &Arc<PerThread>) {
        let mut slots = self.slots.borrow_mut();
        slots.retain(|slot| slot.strong_count() > 0);
        slots.push(Arc::downgrade(values));
    }
}

impl Drop for ExitHook {
    fn drop(&mut self) {
        for slot in self.slots.get_mut().drain(..) {
            if let Some(values) = slot.upgrade() {
                values
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&self.thread);
            }
        }
    }
}

thread_local! {
    static EXIT_HOOK: ExitHook = ExitHook::new();
}

/// Slot holding one cache per OS thread.
///
/// The slot owns every thread's value: dropping it frees them all, whichever
/// thread drops it. A thread's value is also released when that thread exits.
#[derive(Debug, Default)]
pub struct ThreadSlot {
    values: Arc<PerThread>,
}

impl ThreadSlot {
    /// Empty slot; no thread holds a value yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads currently holding a value in this slot.
    pub fn thread_count(&self) -> usize {
        self.values.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl LifetimeSlot for ThreadSlot {
    fn get(&self) -> Option<Arc<ScopedCache>> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&thread::current().id())
            .cloned()
    }

    fn set(&self, cache: Arc<ScopedCache>) {
        let thread = thread::current().id();
        let first_for_thread = self
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(thread, cache)
            .is_none();

        if first_for_thread && EXIT_HOOK.try_with(|hook| hook.register(&self.values)).is_err() {
            // The thread is shutting down; nothing would release the value later.
            trace!(?thread, "thread exiting, lifetime value discarded");
            self.values
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&thread);
        }
    }
}
