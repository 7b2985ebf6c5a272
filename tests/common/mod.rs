//! Common test utilities for integration tests
//!
//! Provides shared fixtures used across multiple integration test files.

use scoped_memo::{ContainerSlot, Interceptor, LifetimeSlot, ScopeResolver, ScopedCache};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Resolver whose process-wide tier is `shared` instead of the global cache.
///
/// Integration tests run in parallel, so each test isolates its own
/// process-wide cache.
#[allow(dead_code)]
pub fn resolver_with(owner: &str, shared: &Arc<ScopedCache>) -> ScopeResolver {
    ScopeResolver::builder(owner)
        .process_wide(Arc::clone(shared))
        .build()
}

/// Resolver sharing both the process-wide cache and the lifetime slot.
#[allow(dead_code)]
pub fn resolver_sharing(
    owner: &str,
    shared: &Arc<ScopedCache>,
    slot: &Arc<dyn LifetimeSlot>,
) -> ScopeResolver {
    ScopeResolver::builder(owner)
        .process_wide(Arc::clone(shared))
        .lifetime_slot(Arc::clone(slot))
        .build()
}

/// A fresh container slot as a trait object.
#[allow(dead_code)]
pub fn container_slot() -> Arc<dyn LifetimeSlot> {
    Arc::new(ContainerSlot::new())
}

/// Counts how many times a computation actually ran.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct ComputeCounter {
    count: AtomicUsize,
}

#[allow(dead_code)]
impl ComputeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one run and returns `value`.
    pub fn run<T>(&self, value: T) -> T {
        self.count.fetch_add(1, Ordering::SeqCst);
        value
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Interceptor that counts calls and always runs the body.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct CountingInterceptor {
    pub calls: AtomicUsize,
}

impl Interceptor for CountingInterceptor {
    fn intercept(&self, _call: &scoped_memo::CallInfo<'_>, body: &mut dyn FnMut()) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        body();
    }
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
