//! Case-insensitive caller names.

use std::fmt;

/// Key identifying one cached computation within a cache.
///
/// Names compare case-insensitively: `"LoadUser"` and `"loaduser"` address
/// the same entry. The folded form is what gets hashed and stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerName(String);

impl CallerName {
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CallerName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for CallerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
