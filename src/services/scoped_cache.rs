//! Per-owner memoization cache.
//!
//! A [`ScopedCache`] holds a single-level map from caller name to value and,
//! layered on top of it, keyed maps (caller name → key → value) and owner
//! partitions (caller name → owner → value) stored as ordinary entries. One
//! reader/writer lock guards the map and every nested map reachable from it.
//!
//! Lookups take the read lock; the caller's computation runs with no lock
//! held; only the final insert takes the write lock. Two callers missing on
//! the same name may therefore both compute, and the last insert wins.

use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, trace, warn};

use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::models::CallerName;

/// Owner token of the default process-wide cache.
pub const PROCESS_OWNER_TOKEN: &str = "process-wide";

type Entry = Box<dyn Any + Send + Sync>;
type Store = HashMap<CallerName, Entry>;

/// Snapshot of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Successful computations stored after a miss.
    pub computes: u64,
    /// Explicit `set`/`set_keyed` writes.
    pub overwrites: u64,
    /// Top-level entries (a keyed map counts once).
    pub entries: usize,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    computes: AtomicU64,
    overwrites: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Owner partitions sharing one caller name: owner token → value.
type Partitions = HashMap<String, Entry>;

/// Where a value lives inside the store.
#[derive(Clone, Copy)]
enum Place<'a> {
    /// Directly under the caller name.
    Direct,
    /// In the named owner's partition of the caller name's entry.
    Partition(&'a str),
}

/// Memoization cache owned by one logical owner.
///
/// The `*_in` operations address an owner partition of a caller name. Each
/// partition holds its own value, so owners sharing one cache may store
/// different types under the same name.
pub struct ScopedCache {
    owner_token: String,
    store: RwLock<Store>,
    counters: Counters,
}

impl ScopedCache {
    /// Create an empty cache for `owner_token`.
    pub fn new(owner_token: impl Into<String>) -> Self {
        Self {
            owner_token: owner_token.into(),
            store: RwLock::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Token of the owner this cache was created for.
    pub fn owner_token(&self) -> &str {
        &self.owner_token
    }

    /// Returns the cached value for `caller_name`, computing and storing it
    /// on a miss.
    pub fn get_or_compute<T, F>(&self, caller_name: &str, compute: F) -> CacheResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.try_get_or_compute(caller_name, || Ok::<_, CacheError>(compute()))
    }

    /// Fallible variant of [`get_or_compute`](Self::get_or_compute).
    ///
    /// An error from `compute` is returned as-is and nothing is stored, so
    /// the next call computes again.
    pub fn try_get_or_compute<T, E, F>(&self, caller_name: &str, compute: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.try_get_or_compute_at(Place::Direct, caller_name, compute)
    }

    /// Returns the value cached under `key` in the keyed map for
    /// `caller_name`, computing and storing it on a miss.
    pub fn get_or_compute_keyed<K, T, F>(&self, caller_name: &str, key: K, compute: F) -> CacheResult<T>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.try_get_or_compute_keyed(caller_name, key, || Ok::<_, CacheError>(compute()))
    }

    /// Fallible variant of [`get_or_compute_keyed`](Self::get_or_compute_keyed).
    pub fn try_get_or_compute_keyed<K, T, E, F>(
        &self,
        caller_name: &str,
        key: K,
        compute: F,
    ) -> Result<T, E>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.try_get_or_compute_keyed_at(Place::Direct, caller_name, key, compute)
    }

    /// Read-only lookup; never computes.
    pub fn get<T>(&self, caller_name: &str) -> CacheResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        Self::lookup(&self.read(), &CallerName::new(caller_name), Place::Direct, caller_name)
    }

    /// Read-only keyed lookup; never computes.
    pub fn get_keyed<K, T>(&self, caller_name: &str, key: &K) -> CacheResult<Option<T>>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        Self::lookup_keyed(&self.read(), &CallerName::new(caller_name), Place::Direct, caller_name, key)
    }

    /// Stores `value` under `caller_name`, replacing any previous value of
    /// the same type, and returns it.
    pub fn set<T>(&self, caller_name: &str, value: T) -> CacheResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.set_at(Place::Direct, caller_name, value)
    }

    /// Stores `value` under `key` in the keyed map for `caller_name` and
    /// returns it.
    pub fn set_keyed<K, T>(&self, caller_name: &str, key: K, value: T) -> CacheResult<T>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        self.set_keyed_at(Place::Direct, caller_name, key, value)
    }

    /// [`try_get_or_compute`](Self::try_get_or_compute) within `owner`'s
    /// partition of `caller_name`.
    pub fn try_get_or_compute_in<T, E, F>(&self, owner: &str, caller_name: &str, compute: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.try_get_or_compute_at(Place::Partition(owner), caller_name, compute)
    }

    /// [`try_get_or_compute_keyed`](Self::try_get_or_compute_keyed) within
    /// `owner`'s partition of `caller_name`.
    pub fn try_get_or_compute_keyed_in<K, T, E, F>(
        &self,
        owner: &str,
        caller_name: &str,
        key: K,
        compute: F,
    ) -> Result<T, E>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        self.try_get_or_compute_keyed_at(Place::Partition(owner), caller_name, key, compute)
    }

    /// Read-only lookup in `owner`'s partition.
    pub fn get_in<T>(&self, owner: &str, caller_name: &str) -> CacheResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        Self::lookup(
            &self.read(),
            &CallerName::new(caller_name),
            Place::Partition(owner),
            caller_name,
        )
    }

    /// Read-only keyed lookup in `owner`'s partition.
    pub fn get_keyed_in<K, T>(&self, owner: &str, caller_name: &str, key: &K) -> CacheResult<Option<T>>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        Self::lookup_keyed(
            &self.read(),
            &CallerName::new(caller_name),
            Place::Partition(owner),
            caller_name,
            key,
        )
    }

    /// Stores `value` in `owner`'s partition of `caller_name`.
    pub fn set_in<T>(&self, owner: &str, caller_name: &str, value: T) -> CacheResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.set_at(Place::Partition(owner), caller_name, value)
    }

    /// Stores `value` under `key` in `owner`'s partition of `caller_name`.
    pub fn set_keyed_in<K, T>(&self, owner: &str, caller_name: &str, key: K, value: T) -> CacheResult<T>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        self.set_keyed_at(Place::Partition(owner), caller_name, key, value)
    }

    /// Removes every entry, keyed maps and owner partitions included.
    pub fn clear(&self) {
        let mut store = self.write();
        let removed = store.len();
        store.clear();
        drop(store);
        info!(owner = %self.owner_token, removed, "cache cleared");
    }

    /// Whether anything is stored under `caller_name`.
    pub fn contains(&self, caller_name: &str) -> bool {
        self.read().contains_key(&CallerName::new(caller_name))
    }

    /// Number of caller names with a stored entry.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of the hit/miss counters and the current entry count.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            computes: self.counters.computes.load(Ordering::Relaxed),
            overwrites: self.counters.overwrites.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn try_get_or_compute_at<T, E, F>(&self, place: Place<'_>, caller_name: &str, compute: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        let name = CallerName::new(caller_name);
        let cached = Self::lookup::<T>(&self.read(), &name, place, caller_name)?;
        if let Some(hit) = cached {
            Counters::bump(&self.counters.hits);
            trace!(owner = %self.owner_token, caller = caller_name, "cache hit");
            return Ok(hit);
        }
        Counters::bump(&self.counters.misses);
        debug!(owner = %self.owner_token, caller = caller_name, "cache miss, computing");

        // No lock is held here; racing callers may compute concurrently.
        let value = compute()?;
        Counters::bump(&self.counters.computes);

        self.insert(name, place, caller_name, value.clone())?;
        Ok(value)
    }

    fn try_get_or_compute_keyed_at<K, T, E, F>(
        &self,
        place: Place<'_>,
        caller_name: &str,
        key: K,
        compute: F,
    ) -> Result<T, E>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        let name = CallerName::new(caller_name);
        let cached = Self::lookup_keyed::<K, T>(&self.read(), &name, place, caller_name, &key)?;
        if let Some(hit) = cached {
            Counters::bump(&self.counters.hits);
            trace!(owner = %self.owner_token, caller = caller_name, "keyed cache hit");
            return Ok(hit);
        }
        Counters::bump(&self.counters.misses);
        debug!(owner = %self.owner_token, caller = caller_name, "keyed cache miss, computing");

        let value = compute()?;
        Counters::bump(&self.counters.computes);

        self.insert_keyed(name, place, caller_name, key, value.clone())?;
        Ok(value)
    }

    fn set_at<T>(&self, place: Place<'_>, caller_name: &str, value: T) -> CacheResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.insert(CallerName::new(caller_name), place, caller_name, value.clone())?;
        Counters::bump(&self.counters.overwrites);
        debug!(owner = %self.owner_token, caller = caller_name, "cache value set");
        Ok(value)
    }

    fn set_keyed_at<K, T>(&self, place: Place<'_>, caller_name: &str, key: K, value: T) -> CacheResult<T>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        self.insert_keyed(CallerName::new(caller_name), place, caller_name, key, value.clone())?;
        Counters::bump(&self.counters.overwrites);
        debug!(owner = %self.owner_token, caller = caller_name, "keyed cache value set");
        Ok(value)
    }

    /// Finds the entry at `place`, if one exists.
    fn locate<'s>(
        store: &'s Store,
        name: &CallerName,
        place: Place<'_>,
        caller_name: &str,
    ) -> CacheResult<Option<&'s Entry>> {
        let Some(entry) = store.get(name) else {
            return Ok(None);
        };
        match place {
            Place::Direct => Ok(Some(entry)),
            Place::Partition(owner) => entry
                .downcast_ref::<Partitions>()
                .map(|partitions| partitions.get(owner))
                .ok_or_else(|| CacheError::type_mismatch::<Partitions>(caller_name)),
        }
    }

    fn lookup<T>(store: &Store, name: &CallerName, place: Place<'_>, caller_name: &str) -> CacheResult<Option<T>>
    where
        T: Clone + 'static,
    {
        Self::locate(store, name, place, caller_name)?.map_or(Ok(None), |entry| {
            entry
                .downcast_ref::<T>()
                .cloned()
                .map(Some)
                .ok_or_else(|| CacheError::type_mismatch::<T>(caller_name))
        })
    }

    fn lookup_keyed<K, T>(
        store: &Store,
        name: &CallerName,
        place: Place<'_>,
        caller_name: &str,
        key: &K,
    ) -> CacheResult<Option<T>>
    where
        K: Eq + Hash + 'static,
        T: Clone + 'static,
    {
        Self::locate(store, name, place, caller_name)?.map_or(Ok(None), |entry| {
            entry
                .downcast_ref::<HashMap<K, T>>()
                .map(|nested| nested.get(key).cloned())
                .ok_or_else(|| CacheError::type_mismatch::<HashMap<K, T>>(caller_name))
        })
    }

    fn insert<T>(&self, name: CallerName, place: Place<'_>, caller_name: &str, value: T) -> CacheResult<()>
    where
        T: Send + Sync + 'static,
    {
        let mut store = self.write();
        match place {
            Place::Direct => put(&mut *store, name, caller_name, value),
            Place::Partition(owner) => {
                let partitions = Self::partitions_mut(&mut store, name, caller_name)?;
                put(partitions, owner.to_string(), caller_name, value)
            }
        }
    }

    fn insert_keyed<K, T>(
        &self,
        name: CallerName,
        place: Place<'_>,
        caller_name: &str,
        key: K,
        value: T,
    ) -> CacheResult<()>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let mut store = self.write();
        match place {
            Place::Direct => put_keyed(&mut *store, name, caller_name, key, value),
            Place::Partition(owner) => {
                let partitions = Self::partitions_mut(&mut store, name, caller_name)?;
                put_keyed(partitions, owner.to_string(), caller_name, key, value)
            }
        }
    }

    /// The partition map under `name`, created on first use.
    fn partitions_mut<'s>(
        store: &'s mut Store,
        name: CallerName,
        caller_name: &str,
    ) -> CacheResult<&'s mut Partitions> {
        store
            .entry(name)
            .or_insert_with(|| Box::new(Partitions::new()))
            .downcast_mut::<Partitions>()
            .ok_or_else(|| CacheError::type_mismatch::<Partitions>(caller_name))
    }

    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(|poisoned| {
            warn!(owner = %self.owner_token, "recovering poisoned cache lock (read)");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(|poisoned| {
            warn!(owner = %self.owner_token, "recovering poisoned cache lock (write)");
            PoisonError::into_inner(poisoned)
        })
    }
}

/// Stores `value` at `at`, rejecting a value of another type already there.
fn put<Q, T>(map: &mut HashMap<Q, Entry>, at: Q, caller_name: &str, value: T) -> CacheResult<()>
where
    Q: Eq + Hash,
    T: Send + Sync + 'static,
{
    if map.get(&at).is_some_and(|existing| !existing.is::<T>()) {
        return Err(CacheError::type_mismatch::<T>(caller_name));
    }
    map.insert(at, Box::new(value));
    Ok(())
}

/// Stores `value` under `key` in the keyed map at `at`.
fn put_keyed<Q, K, T>(map: &mut HashMap<Q, Entry>, at: Q, caller_name: &str, key: K, value: T) -> CacheResult<()>
where
    Q: Eq + Hash,
    K: Eq + Hash + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    // The nested map is created once and only ever mutated afterwards.
    let nested = map
        .entry(at)
        .or_insert_with(|| Box::new(HashMap::<K, T>::new()))
        .downcast_mut::<HashMap<K, T>>()
        .ok_or_else(|| CacheError::type_mismatch::<HashMap<K, T>>(caller_name))?;
    nested.insert(key, value);
    Ok(())
}

impl Default for ScopedCache {
    /// The process-wide cache, as constructed by the type registry.
    fn default() -> Self {
        Self::new(PROCESS_OWNER_TOKEN)
    }
}

impl fmt::Debug for ScopedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedCache")
            .field("owner_token", &self.owner_token)
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}
