//! Scoped Memo - multi-scope memoization cache
//!
//! Memoizes the results of argument-less (or single-key) computations under a
//! caller name, in one of three tiers chosen per call:
//!
//! - **Instance**: private to one [`ScopeResolver`]
//! - **Process-wide**: one shared cache, partitioned by owner token
//! - **External lifetime**: a cache living in a pluggable [`LifetimeSlot`]
//!   (container, thread or task scoped)
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): errors, models and the ports collaborators implement
//! - **Service Layer** (`services`): the cache engine, scope resolver and type registry
//! - **Adapters** (`adapters`): lifetime slots and the tracing interceptor
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```
//! use scoped_memo::{Scope, ScopeResolver};
//!
//! let resolver = ScopeResolver::new("report-builder");
//! let first: u32 = resolver
//!     .get_or_compute(Scope::Instance, "Totals", || 42)
//!     .unwrap();
//! let second: u32 = resolver
//!     .get_or_compute(Scope::Instance, "totals", || 7)
//!     .unwrap();
//! assert_eq!(first, second);
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::instrumentation::TracingInterceptor;
pub use adapters::lifetime::{ContainerSlot, TaskSlot, ThreadSlot};
pub use domain::models::{CallerName, Config, LifetimeKind, Operation, Scope};
pub use domain::ports::{CallInfo, Interceptor, LifetimeSlot};
pub use domain::{CacheError, CacheResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CacheStats, ScopeResolver, ScopeResolverBuilder, ScopedCache, TypeRegistry};
