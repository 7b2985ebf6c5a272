use std::sync::Arc;

use crate::services::ScopedCache;

/// An opaque slot holding at most one cache for some externally defined
/// lifetime.
///
/// The implementor decides the boundary: one value per thread, per task,
/// per container, per request. The cache core only ever calls `get` and
/// `set` and never assumes the slot is synchronized across a get-then-set
/// sequence; two callers racing on an empty slot may both `set`, and the
/// last write is what later callers observe.
pub trait LifetimeSlot: Send + Sync {
    /// Returns the cache currently held for the active lifetime, if any.
    fn get(&self) -> Option<Arc<ScopedCache>>;

    /// Stores `cache` for the active lifetime, replacing any previous value.
    fn set(&self, cache: Arc<ScopedCache>);
}
