//! Interceptors wrapped around public cache operations.

pub mod tracing_interceptor;

pub use tracing_interceptor::TracingInterceptor;
