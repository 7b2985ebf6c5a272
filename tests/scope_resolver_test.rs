//! Integration tests for scope resolution across the three tiers.

mod common;

use common::{container_slot, resolver_sharing, resolver_with, ComputeCounter, CountingInterceptor};
use scoped_memo::domain::models::{InstrumentationConfig, LifetimeKind};
use scoped_memo::{CacheError, Config, Interceptor, Scope, ScopeResolver, ScopedCache, ThreadSlot};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

const ALL_SCOPES: [Scope; 3] = [Scope::Instance, Scope::ProcessWide, Scope::ExternalLifetime];

#[test]
fn test_set_and_clear_walkthrough() {
    let shared = Arc::new(ScopedCache::default());
    let resolver = resolver_with("walkthrough", &shared);

    assert_eq!(resolver.get_or_compute(Scope::Instance, "X", || 1).unwrap(), 1);
    resolver.set(Scope::Instance, "X", 2).unwrap();
    assert_eq!(resolver.get_or_compute(Scope::Instance, "X", || 3).unwrap(), 2);
    resolver.clear_instance().unwrap();
    assert_eq!(resolver.get_or_compute(Scope::Instance, "X", || 3).unwrap(), 3);
}

#[test]
fn test_sequential_calls_compute_once_in_every_scope() {
    let shared = Arc::new(ScopedCache::default());
    let resolver = resolver_with("sequential", &shared);

    for scope in ALL_SCOPES {
        let counter = ComputeCounter::new();
        for _ in 0..3 {
            let value = resolver
                .get_or_compute(scope, "Answer", || counter.run(42u64))
                .unwrap();
            assert_eq!(value, 42);
        }
        assert_eq!(counter.count(), 1, "scope {scope} computed more than once");
    }
}

#[test]
fn test_set_keyed_then_get_skips_compute_in_every_scope() {
    let shared = Arc::new(ScopedCache::default());
    let resolver = resolver_with("keyed", &shared);

    for scope in ALL_SCOPES {
        let counter = ComputeCounter::new();
        resolver.set_keyed(scope, "ByName", "alice", 30u8).unwrap();
        let age = resolver
            .get_or_compute_keyed(scope, "byname", "alice", || counter.run(0u8))
            .unwrap();
        assert_eq!(age, 30);
        assert_eq!(counter.count(), 0);
    }
}

#[test]
fn test_clear_instance_forces_recompute() {
    let shared = Arc::new(ScopedCache::default());
    let resolver = resolver_with("recompute", &shared);
    let counter = ComputeCounter::new();

    resolver.get_or_compute(Scope::Instance, "Data", || counter.run(1)).unwrap();
    resolver.clear_instance().unwrap();
    resolver.get_or_compute(Scope::Instance, "Data", || counter.run(1)).unwrap();

    assert_eq!(counter.count(), 2);
}

#[test]
fn test_process_wide_visible_to_same_owner_token_only() {
    let shared = Arc::new(ScopedCache::default());
    let writer = resolver_with("catalog", &shared);
    let same_owner = resolver_with("catalog", &shared);
    let other_owner = resolver_with("billing", &shared);

    writer.set(Scope::ProcessWide, "Products", vec!["pen"]).unwrap();

    assert_eq!(
        same_owner.get::<Vec<&str>>(Scope::ProcessWide, "Products").unwrap(),
        Some(vec!["pen"])
    );
    assert_eq!(
        other_owner.get::<Vec<&str>>(Scope::ProcessWide, "Products").unwrap(),
        None
    );
    // Instance tiers stay private even between equal owner tokens.
    assert_eq!(same_owner.get::<Vec<&str>>(Scope::Instance, "Products").unwrap(), None);
}

#[test]
fn test_owners_cache_different_types_under_same_name() {
    let shared = Arc::new(ScopedCache::default());
    let users = resolver_with("users", &shared);
    let orders = resolver_with("orders", &shared);

    let user = users
        .get_or_compute(Scope::ProcessWide, "GetById", || "alice".to_string())
        .unwrap();
    let order = orders.get_or_compute(Scope::ProcessWide, "GetById", || 42u64);

    assert_eq!(user, "alice");
    assert_eq!(order.unwrap(), 42);
    // Within one owner the name stays bound to its first type.
    let clash = users.get_or_compute(Scope::ProcessWide, "GetById", || 1u64);
    assert!(matches!(clash, Err(CacheError::TypeMismatch { .. })));
}

#[test]
fn test_default_process_wide_cache_is_the_registry_singleton() {
    let first = ScopeResolver::new("registry-owner-a");
    let second = ScopeResolver::new("registry-owner-b");
    assert!(Arc::ptr_eq(first.process_wide(), second.process_wide()));
}

#[test]
fn test_clear_all_clears_every_tier() {
    let shared = Arc::new(ScopedCache::default());
    let resolver = resolver_with("clear-all", &shared);

    for scope in ALL_SCOPES {
        resolver.set(scope, "Cached", 1u16).unwrap();
    }
    resolver.clear_all().unwrap();

    for scope in ALL_SCOPES {
        assert_eq!(resolver.get::<u16>(scope, "Cached").unwrap(), None);
    }
    assert!(resolver.instance().is_empty());
    assert!(shared.is_empty());
    assert!(resolver.lifetime_cache().is_some_and(|cache| cache.is_empty()));
}

#[test]
fn test_clear_process_wide_leaves_other_tiers() {
    let shared = Arc::new(ScopedCache::default());
    let resolver = resolver_with("partial-clear", &shared);

    for scope in ALL_SCOPES {
        resolver.set(scope, "Cached", 5i64).unwrap();
    }
    resolver.clear_process_wide().unwrap();

    assert_eq!(resolver.get::<i64>(Scope::ProcessWide, "Cached").unwrap(), None);
    assert_eq!(resolver.get::<i64>(Scope::Instance, "Cached").unwrap(), Some(5));
    assert_eq!(resolver.get::<i64>(Scope::ExternalLifetime, "Cached").unwrap(), Some(5));
}

#[test]
fn test_lifetime_tier_shared_through_slot() {
    let shared = Arc::new(ScopedCache::default());
    let slot = container_slot();
    let first = resolver_sharing("session", &shared, &slot);
    let second = resolver_sharing("session", &shared, &slot);

    first.set(Scope::ExternalLifetime, "Token", "abc".to_string()).unwrap();
    let token: Option<String> = second.get(Scope::ExternalLifetime, "Token").unwrap();
    assert_eq!(token.as_deref(), Some("abc"));

    second.clear_lifetime().unwrap();
    assert_eq!(first.get::<String>(Scope::ExternalLifetime, "Token").unwrap(), None);
}

#[test]
fn test_thread_slot_gives_each_thread_its_own_lifetime_cache() {
    let shared = Arc::new(ScopedCache::default());
    let resolver = ScopeResolver::builder("per-thread")
        .process_wide(shared)
        .lifetime_slot(Arc::new(ThreadSlot::new()))
        .build();

    resolver.set(Scope::ExternalLifetime, "Who", "main").unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            assert_eq!(resolver.get::<&str>(Scope::ExternalLifetime, "Who").unwrap(), None);
            resolver.set(Scope::ExternalLifetime, "Who", "worker").unwrap();
        });
    });

    assert_eq!(
        resolver.get::<&str>(Scope::ExternalLifetime, "Who").unwrap(),
        Some("main")
    );
}

#[test]
fn test_type_mismatch_surfaces_through_resolver() {
    let shared = Arc::new(ScopedCache::default());
    let resolver = resolver_with("typed", &shared);

    resolver.set(Scope::ProcessWide, "Limit", 10u32).unwrap();
    let err = resolver
        .get_or_compute(Scope::ProcessWide, "Limit", || "ten".to_string())
        .unwrap_err();
    assert!(matches!(err, CacheError::TypeMismatch { .. }));
}

#[test]
fn test_try_variant_returns_caller_error_unchanged() {
    #[derive(Debug, PartialEq)]
    enum LoadError {
        Missing,
        Cache(CacheError),
    }

    impl From<CacheError> for LoadError {
        fn from(err: CacheError) -> Self {
            Self::Cache(err)
        }
    }

    let shared = Arc::new(ScopedCache::default());
    let resolver = resolver_with("typed-errors", &shared);

    let result: Result<String, LoadError> =
        resolver.try_get_or_compute(Scope::Instance, "Config", || Err(LoadError::Missing));
    assert_eq!(result, Err(LoadError::Missing));

    resolver.set(Scope::Instance, "Config", 1u8).unwrap();
    let result: Result<String, LoadError> =
        resolver.try_get_or_compute(Scope::Instance, "Config", || Ok("x".to_string()));
    assert!(matches!(result, Err(LoadError::Cache(CacheError::TypeMismatch { .. }))));
}

#[test]
fn test_interceptor_sees_every_call() {
    let shared = Arc::new(ScopedCache::default());
    let interceptor = Arc::new(CountingInterceptor::default());
    let resolver = ScopeResolver::builder("observed")
        .process_wide(shared)
        .interceptor(Arc::clone(&interceptor) as Arc<dyn Interceptor>)
        .build();

    resolver.get_or_compute(Scope::Instance, "A", || 1).unwrap();
    resolver.get_or_compute_keyed(Scope::ProcessWide, "B", 1, || 2).unwrap();
    resolver.get::<i32>(Scope::ExternalLifetime, "C").unwrap();
    resolver.clear_lifetime().unwrap();
    resolver.clear_all().unwrap();

    assert_eq!(interceptor.calls.load(Ordering::SeqCst), 5);
}

#[test]
fn test_from_config_builds_thread_scoped_lifetime() {
    let config = Config {
        lifetime: LifetimeKind::Thread,
        instrumentation: InstrumentationConfig {
            enabled: false,
            slow_threshold_ms: 0,
        },
        ..Config::default()
    };
    let resolver = ScopeResolver::from_config("configured", &config);

    resolver.set(Scope::ExternalLifetime, "Local", 1u8).unwrap();
    let seen_elsewhere = thread::scope(|s| {
        s.spawn(|| resolver.get::<u8>(Scope::ExternalLifetime, "Local").unwrap())
            .join()
            .unwrap()
    });

    assert_eq!(seen_elsewhere, None);
    assert_eq!(resolver.get::<u8>(Scope::ExternalLifetime, "Local").unwrap(), Some(1));
}
