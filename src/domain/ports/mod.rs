//! Port trait definitions (Hexagonal Architecture)
//!
//! Contracts for the collaborators the cache core calls into but does not
//! own:
//! - LifetimeSlot: externally scoped single-value store
//! - Interceptor: instrumentation wrapper around each public operation

pub mod interceptor;
pub mod lifetime_slot;

pub use interceptor::{CallInfo, Interceptor};
pub use lifetime_slot::LifetimeSlot;
