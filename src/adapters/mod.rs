//! Adapters implementing the domain ports.

pub mod instrumentation;
pub mod lifetime;
