pub mod caller_name;
pub mod config;
pub mod scope;

pub use caller_name::CallerName;
pub use config::{Config, InstrumentationConfig, LifetimeKind, LoggingConfig};
pub use scope::{Operation, Scope};
