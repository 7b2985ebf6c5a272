//! Type-indexed singleton registry.
//!
//! Hands out one shared, default-constructed instance per type. The global
//! registry hosts the default process-wide [`ScopedCache`](super::ScopedCache).
//!
//! Construction happens outside the lock, so two threads asking for the same
//! type at the same time may both build an instance. Only the first insert
//! is kept and every caller receives that one.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

type Instances = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

/// The process-wide registry.
pub fn global() -> &'static TypeRegistry {
    GLOBAL.get_or_init(TypeRegistry::new)
}

/// Shorthand for `global().get_default::<T>()`.
pub fn get_default<T>() -> Arc<T>
where
    T: Default + Send + Sync + 'static,
{
    global().get_default()
}

/// Registry of one shared instance per type. Entries are never removed.
#[derive(Default)]
pub struct TypeRegistry {
    instances: RwLock<Instances>,
}

impl TypeRegistry {
    /// Empty registry, separate from the global one.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registered instance of `T`, default-constructing and
    /// registering it on first use.
    pub fn get_default<T>(&self) -> Arc<T>
    where
        T: Default + Send + Sync + 'static,
    {
        if let Some(existing) = self.lookup::<T>() {
            return existing;
        }

        // T::default() may itself consult the registry, so build before locking.
        let created = Arc::new(T::default());
        let mut instances = self.instances.write().unwrap_or_else(PoisonError::into_inner);
        let registered = instances
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                debug!(type_name = std::any::type_name::<T>(), "registering default instance");
                Box::new(Arc::clone(&created))
            })
            .downcast_ref::<Arc<T>>()
            .cloned();
        drop(instances);

        registered.unwrap_or(created)
    }

    /// Whether an instance of `T` has been registered.
    pub fn contains<T: 'static>(&self) -> bool {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.instances.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no type has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .and_then(|instance| instance.downcast_ref::<Arc<T>>())
            .cloned()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("registered", &self.len())
            .finish()
    }
}
