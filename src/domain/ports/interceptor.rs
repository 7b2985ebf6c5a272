use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::models::{Operation, Scope};

/// Describes the operation an interceptor is wrapping.
#[derive(Debug, Clone, Copy)]
pub struct CallInfo<'a> {
    pub operation: Operation,
    /// `None` for operations spanning every scope (`clear_all`).
    pub scope: Option<Scope>,
    pub owner_token: &'a str,
    pub caller_name: Option<&'a str>,
}

impl<'a> CallInfo<'a> {
    pub const fn new(operation: Operation, scope: Option<Scope>, owner_token: &'a str) -> Self {
        Self {
            operation,
            scope,
            owner_token,
            caller_name: None,
        }
    }

    pub const fn with_caller(mut self, caller_name: &'a str) -> Self {
        self.caller_name = Some(caller_name);
        self
    }
}

/// Cross-cutting wrapper run around every public cache operation.
///
/// Implementations must invoke `body` exactly once and must not swallow a
/// panic raised by it. Results and errors travel outside the interceptor,
/// so it cannot alter what the caller receives.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, call: &CallInfo<'_>, body: &mut dyn FnMut());
}

/// Runs `body` through `interceptor`, or directly when there is none.
pub(crate) fn run_intercepted<R>(
    interceptor: Option<&dyn Interceptor>,
    call: &CallInfo<'_>,
    body: impl FnOnce() -> R,
) -> CacheResult<R> {
    let Some(interceptor) = interceptor else {
        return Ok(body());
    };

    let mut body = Some(body);
    let mut output = None;
    interceptor.intercept(call, &mut || {
        if let Some(body) = body.take() {
            output = Some(body());
        }
    });

    output.ok_or(CacheError::BodySkipped(call.operation))
}
