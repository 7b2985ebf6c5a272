//! Scope resolution across the three cache tiers.
//!
//! A [`ScopeResolver`] owns an instance-tier [`ScopedCache`] and is handed
//! the process-wide cache and a lifetime slot at construction. Every
//! operation names a [`Scope`]:
//!
//! - `Instance` acts on the resolver's own cache.
//! - `ProcessWide` acts on the owner token's partition of the caller name in
//!   the shared cache, so owners with the same token share values and
//!   different tokens never collide, whatever types they store.
//! - `ExternalLifetime` acts on the cache held in the lifetime slot,
//!   creating it on first use.
//!
//! Delegation always finishes with one cache before touching another; no
//! operation holds two cache locks at once.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::adapters::instrumentation::TracingInterceptor;
use crate::adapters::lifetime::{ContainerSlot, TaskSlot, ThreadSlot};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::models::{Config, LifetimeKind, Operation, Scope};
use crate::domain::ports::interceptor::run_intercepted;
use crate::domain::ports::{CallInfo, Interceptor, LifetimeSlot};
use crate::services::type_registry;
use crate::services::ScopedCache;

/// Routes cache operations to the instance, process-wide or lifetime tier.
pub struct ScopeResolver {
    instance: ScopedCache,
    process_wide: Arc<ScopedCache>,
    lifetime: Arc<dyn LifetimeSlot>,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl ScopeResolver {
    /// Resolver using the global process-wide cache, a private container
    /// slot and no interceptor.
    pub fn new(owner_token: impl Into<String>) -> Self {
        Self::builder(owner_token).build()
    }

    /// Starts a builder for a resolver owned by `owner_token`.
    pub fn builder(owner_token: impl Into<String>) -> ScopeResolverBuilder {
        ScopeResolverBuilder::new(owner_token)
    }

    /// Resolver wired according to `config`: the lifetime slot kind and
    /// whether operations are traced.
    pub fn from_config(owner_token: impl Into<String>, config: &Config) -> Self {
        let slot: Arc<dyn LifetimeSlot> = match config.lifetime {
            LifetimeKind::Container => Arc::new(ContainerSlot::new()),
            LifetimeKind::Thread => Arc::new(ThreadSlot::new()),
            LifetimeKind::Task => Arc::new(TaskSlot::new()),
        };

        let mut builder = Self::builder(owner_token).lifetime_slot(slot);
        if config.instrumentation.enabled {
            let threshold = config.instrumentation.slow_threshold_ms;
            let interceptor = if threshold == 0 {
                TracingInterceptor::new()
            } else {
                TracingInterceptor::new().with_slow_threshold(Duration::from_millis(threshold))
            };
            builder = builder.interceptor(Arc::new(interceptor));
        }
        builder.build()
    }

    /// Token identifying this resolver's owner.
    pub fn owner_token(&self) -> &str {
        self.instance.owner_token()
    }

    /// The resolver's own instance-tier cache.
    pub fn instance(&self) -> &ScopedCache {
        &self.instance
    }

    /// The shared process-wide cache this resolver delegates to.
    pub fn process_wide(&self) -> &Arc<ScopedCache> {
        &self.process_wide
    }

    /// The cache currently held in the lifetime slot, without creating one.
    pub fn lifetime_cache(&self) -> Option<Arc<ScopedCache>> {
        self.lifetime.get()
    }

    /// Returns the value cached for `caller_name` in `scope`, computing it on
    /// a miss.
    pub fn get_or_compute<T, F>(&self, scope: Scope, caller_name: &str, compute: F) -> CacheResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.try_get_or_compute(scope, caller_name, || Ok::<_, CacheError>(compute()))
    }

    /// Fallible variant of [`get_or_compute`](Self::get_or_compute); the
    /// compute error reaches the caller unchanged and is not cached.
    pub fn try_get_or_compute<T, E, F>(&self, scope: Scope, caller_name: &str, compute: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Result<T, E>,
    {
        let call = self.call(Operation::GetOrCompute, Some(scope)).with_caller(caller_name);
        self.intercept(&call, || match scope {
            Scope::Instance => self.instance.try_get_or_compute(caller_name, compute),
            Scope::ProcessWide => {
                self.process_wide
                    .try_get_or_compute_in(self.owner_token(), caller_name, compute)
            }
            Scope::ExternalLifetime => self
                .lifetime_cache_or_create()
                .try_get_or_compute(caller_name, compute),
        })
    }

    /// Keyed variant of [`get_or_compute`](Self::get_or_compute).
    pub fn get_or_compute_keyed<K, T, F>(
        &self,
        scope: Scope,
        caller_name: &str,
        key: K,
        compute: F,
    ) -> CacheResult<T>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.try_get_or_compute_keyed(scope, caller_name, key, || Ok::<_, CacheError>(compute()))
    }

    /// Keyed lookup in the chosen tier. In the process-wide tier the keyed
    /// map lives in the owner token's partition.
    pub fn try_get_or_compute_keyed<K, T, E, F>(
        &self,
        scope: Scope,
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
        let call = self.call(Operation::GetOrComputeKeyed, Some(scope)).with_caller(caller_name);
        self.intercept(&call, || match scope {
            Scope::Instance => self.instance.try_get_or_compute_keyed(caller_name, key, compute),
            Scope::ProcessWide => self.process_wide.try_get_or_compute_keyed_in(
                self.owner_token(),
                caller_name,
                key,
                compute,
            ),
            Scope::ExternalLifetime => self
                .lifetime_cache_or_create()
                .try_get_or_compute_keyed(caller_name, key, compute),
        })
    }

    /// Read-only lookup. The lifetime tier is not created by a read.
    pub fn get<T>(&self, scope: Scope, caller_name: &str) -> CacheResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let call = self.call(Operation::Get, Some(scope)).with_caller(caller_name);
        self.intercept(&call, || match scope {
            Scope::Instance => self.instance.get(caller_name),
            Scope::ProcessWide => self.process_wide.get_in(self.owner_token(), caller_name),
            Scope::ExternalLifetime => self
                .lifetime
                .get()
                .map_or(Ok(None), |cache| cache.get(caller_name)),
        })
    }

    /// Read-only keyed lookup; like [`get`](Self::get) it never creates the
    /// lifetime tier.
    pub fn get_keyed<K, T>(&self, scope: Scope, caller_name: &str, key: K) -> CacheResult<Option<T>>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        let call = self.call(Operation::GetKeyed, Some(scope)).with_caller(caller_name);
        self.intercept(&call, || match scope {
            Scope::Instance => self.instance.get_keyed(caller_name, &key),
            Scope::ProcessWide => self
                .process_wide
                .get_keyed_in(self.owner_token(), caller_name, &key),
            Scope::ExternalLifetime => self
                .lifetime
                .get()
                .map_or(Ok(None), |cache| cache.get_keyed(caller_name, &key)),
        })
    }

    /// Overwrites the value for `caller_name` in the chosen tier.
    pub fn set<T>(&self, scope: Scope, caller_name: &str, value: T) -> CacheResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let call = self.call(Operation::Set, Some(scope)).with_caller(caller_name);
        self.intercept(&call, || match scope {
            Scope::Instance => self.instance.set(caller_name, value),
            Scope::ProcessWide => self.process_wide.set_in(self.owner_token(), caller_name, value),
            Scope::ExternalLifetime => self.lifetime_cache_or_create().set(caller_name, value),
        })
    }

    /// Overwrites the value under `key` for `caller_name` in the chosen tier.
    pub fn set_keyed<K, T>(&self, scope: Scope, caller_name: &str, key: K, value: T) -> CacheResult<T>
    where
        K: Eq + Hash + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        let call = self.call(Operation::SetKeyed, Some(scope)).with_caller(caller_name);
        self.intercept(&call, || match scope {
            Scope::Instance => self.instance.set_keyed(caller_name, key, value),
            Scope::ProcessWide => {
                self.process_wide
                    .set_keyed_in(self.owner_token(), caller_name, key, value)
            }
            Scope::ExternalLifetime => self
                .lifetime_cache_or_create()
                .set_keyed(caller_name, key, value),
        })
    }

    /// Clears one tier. Clearing `ProcessWide` flushes the whole shared
    /// cache, not only this owner's values.
    pub fn clear(&self, scope: Scope) -> CacheResult<()> {
        let call = self.call(Operation::Clear, Some(scope));
        self.intercept(&call, || {
            self.clear_tier(scope);
            Ok(())
        })
    }

    /// Clears this resolver's instance cache.
    pub fn clear_instance(&self) -> CacheResult<()> {
        self.clear(Scope::Instance)
    }

    /// Clears the whole shared process-wide cache.
    pub fn clear_process_wide(&self) -> CacheResult<()> {
        self.clear(Scope::ProcessWide)
    }

    /// Clears the lifetime cache if the slot holds one; a no-op otherwise.
    pub fn clear_lifetime(&self) -> CacheResult<()> {
        self.clear(Scope::ExternalLifetime)
    }

    /// Clears the instance, lifetime and process-wide tiers, in that order.
    pub fn clear_all(&self) -> CacheResult<()> {
        let call = self.call(Operation::ClearAll, None);
        self.intercept(&call, || {
            for scope in Scope::CLEAR_ORDER {
                self.clear_tier(scope);
            }
            info!(owner = %self.owner_token(), "all cache tiers cleared");
            Ok(())
        })
    }

    fn clear_tier(&self, scope: Scope) {
        match scope {
            Scope::Instance => self.instance.clear(),
            Scope::ProcessWide => self.process_wide.clear(),
            Scope::ExternalLifetime => {
                if let Some(cache) = self.lifetime.get() {
                    cache.clear();
                }
            }
        }
    }

    /// Fetches the slot's cache, creating and storing one on first access.
    /// Concurrent first accesses may each create a cache; the slot keeps the
    /// last one written.
    #[instrument(level = "trace", skip(self), fields(owner = %self.owner_token()))]
    fn lifetime_cache_or_create(&self) -> Arc<ScopedCache> {
        if let Some(cache) = self.lifetime.get() {
            return cache;
        }
        debug!(owner = %self.owner_token(), "creating lifetime cache");
        let cache = Arc::new(ScopedCache::new(self.owner_token()));
        self.lifetime.set(Arc::clone(&cache));
        cache
    }

    fn call(&self, operation: Operation, scope: Option<Scope>) -> CallInfo<'_> {
        CallInfo::new(operation, scope, self.owner_token())
    }

    fn intercept<R, E>(&self, call: &CallInfo<'_>, body: impl FnOnce() -> Result<R, E>) -> Result<R, E>
    where
        E: From<CacheError>,
    {
        run_intercepted(self.interceptor.as_deref(), call, body)?
    }
}

impl fmt::Debug for ScopeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeResolver")
            .field("owner_token", &self.owner_token())
            .field("instance", &self.instance)
            .field("process_wide", &self.process_wide)
            .field("intercepted", &self.interceptor.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ScopeResolver`]; unset dependencies fall back to defaults.
pub struct ScopeResolverBuilder {
    owner_token: String,
    process_wide: Option<Arc<ScopedCache>>,
    lifetime: Option<Arc<dyn LifetimeSlot>>,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl ScopeResolverBuilder {
    fn new(owner_token: impl Into<String>) -> Self {
        Self {
            owner_token: owner_token.into(),
            process_wide: None,
            lifetime: None,
            interceptor: None,
        }
    }

    /// Use `cache` as the process-wide tier instead of the global one.
    pub fn process_wide(mut self, cache: Arc<ScopedCache>) -> Self {
        self.process_wide = Some(cache);
        self
    }

    /// Use `slot` for the external-lifetime tier. Share one slot between
    /// resolvers to share their lifetime cache.
    pub fn lifetime_slot(mut self, slot: Arc<dyn LifetimeSlot>) -> Self {
        self.lifetime = Some(slot);
        self
    }

    /// Route every operation through `interceptor`.
    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Builds the resolver, filling unset dependencies with the global
    /// process-wide cache and a private container slot.
    pub fn build(self) -> ScopeResolver {
        ScopeResolver {
            instance: ScopedCache::new(self.owner_token),
            process_wide: self
                .process_wide
                .unwrap_or_else(type_registry::get_default::<ScopedCache>),
            lifetime: self
                .lifetime
                .unwrap_or_else(|| Arc::new(ContainerSlot::new())),
            interceptor: self.interceptor,
        }
    }
}
