//! Domain errors for the scoped cache.

use thiserror::Error;

use super::models::Operation;

/// Errors raised by the cache engine itself.
///
/// Failures of a caller-supplied computation are never wrapped in this type;
/// they are returned to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("Type mismatch for caller '{caller_name}': cached entry is not a {expected}")]
    TypeMismatch {
        caller_name: String,
        expected: &'static str,
    },

    #[error("Interceptor did not run the body of {0}")]
    BodySkipped(Operation),
}

impl CacheError {
    pub(crate) fn type_mismatch<T: ?Sized>(caller_name: &str) -> Self {
        Self::TypeMismatch {
            caller_name: caller_name.to_string(),
            expected: std::any::type_name::<T>(),
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
