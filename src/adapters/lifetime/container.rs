use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::ports::LifetimeSlot;
use crate::services::ScopedCache;

/// Slot whose lifetime is the slot object itself.
///
/// Every resolver holding the same `ContainerSlot` sees the same cache until
/// the slot is dropped.
#[derive(Debug, Default)]
pub struct ContainerSlot {
    value: RwLock<Option<Arc<ScopedCache>>>,
}

impl ContainerSlot {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LifetimeSlot for ContainerSlot {
    fn get(&self) -> Option<Arc<ScopedCache>> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, cache: Arc<ScopedCache>) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(cache);
    }
}
