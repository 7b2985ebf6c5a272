//! Cache scopes and the operations performed against them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifetime and sharing boundary of a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Visible only through the cache object that stored it.
    Instance,
    /// Shared by every owner with the same owner token, for the process lifetime.
    ProcessWide,
    /// Shared within an externally defined boundary (thread, task, container).
    ExternalLifetime,
}

impl Scope {
    /// All scopes, in the order `clear_all` visits them.
    pub const CLEAR_ORDER: [Self; 3] = [Self::Instance, Self::ExternalLifetime, Self::ProcessWide];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::ProcessWide => "process_wide",
            Self::ExternalLifetime => "external_lifetime",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public cache operation, as reported to interceptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    GetOrCompute,
    GetOrComputeKeyed,
    Get,
    GetKeyed,
    Set,
    SetKeyed,
    Clear,
    ClearAll,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetOrCompute => "get_or_compute",
            Self::GetOrComputeKeyed => "get_or_compute_keyed",
            Self::Get => "get",
            Self::GetKeyed => "get_keyed",
            Self::Set => "set",
            Self::SetKeyed => "set_keyed",
            Self::Clear => "clear",
            Self::ClearAll => "clear_all",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
