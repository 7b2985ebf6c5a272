//! Tracing-based instrumentation wrapper.
//!
//! Opens a `cache_operation` span for every public operation and reports
//! how long the body took. Operations slower than the configured threshold
//! are logged at warn level.

use std::time::{Duration, Instant};
use tracing::{debug_span, trace, warn};

use crate::domain::ports::{CallInfo, Interceptor};

/// Interceptor emitting one tracing span per cache operation.
#[derive(Debug, Clone, Default)]
pub struct TracingInterceptor {
    slow_threshold: Option<Duration>,
}

impl TracingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warn about operations taking at least `threshold`.
    #[must_use]
    pub const fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    pub const fn slow_threshold(&self) -> Option<Duration> {
        self.slow_threshold
    }
}

impl Interceptor for TracingInterceptor {
    fn intercept(&self, call: &CallInfo<'_>, body: &mut dyn FnMut()) {
        let span = debug_span!(
            "cache_operation",
            operation = call.operation.as_str(),
            scope = call.scope.map_or("all", |scope| scope.as_str()),
            owner = call.owner_token,
            caller = call.caller_name.unwrap_or_default(),
        );
        let _entered = span.enter();

        let started = Instant::now();
        body();
        let elapsed = started.elapsed();

        if self.slow_threshold.is_some_and(|threshold| elapsed >= threshold) {
            warn!(elapsed_ms = saturating_u64(elapsed.as_millis()), "slow cache operation");
        } else {
            trace!(elapsed_us = saturating_u64(elapsed.as_micros()), "cache operation finished");
        }
    }
}

fn saturating_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
