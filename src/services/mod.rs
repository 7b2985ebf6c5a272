//! Cache engine services.

pub mod scope_resolver;
pub mod scoped_cache;
pub mod type_registry;

pub use scope_resolver::{ScopeResolver, ScopeResolverBuilder};
pub use scoped_cache::{CacheStats, ScopedCache, PROCESS_OWNER_TOKEN};
pub use type_registry::TypeRegistry;
