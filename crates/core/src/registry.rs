//! Runtime-extensible retry rules
//!
//! A [`RetryRegistry`] holds two independent pieces of state read by the
//! classifier on every decision:
//! - the set of error kinds retried unconditionally, seeded with the built-in
//!   transient kinds and only ever grown
//! - a single custom handler consulted for errors nothing else covers
//!
//! The process-wide instance behind [`RetryRegistry::global`] is what the
//! free functions in this module mutate.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::backend_error::{BackendError, ErrorKind};

/// Error kinds every registry treats as transient.
pub const BUILTIN_RETRYABLE_KINDS: [ErrorKind; 5] = [
    ErrorKind::Timeout,
    ErrorKind::Connection,
    ErrorKind::IncompleteRead,
    ErrorKind::ResponseParse,
    ErrorKind::Payload,
];

/// User-supplied retry predicate.
///
/// Returning `true` makes an otherwise terminal error retryable. It cannot
/// veto a retry the built-in rules or the retryable set already granted.
#[cfg_attr(test, mockall::automock)]
pub trait CustomErrorHandler: Send + Sync {
    fn should_retry(&self, error: &BackendError) -> bool;
}

impl<F> CustomErrorHandler for F
where
    F: Fn(&BackendError) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &BackendError) -> bool {
        self(error)
    }
}

fn never_retry(_: &BackendError) -> bool {
    false
}

fn default_handler() -> Arc<dyn CustomErrorHandler> {
    Arc::new(never_retry)
}

fn builtin_kinds() -> HashSet<ErrorKind> {
    BUILTIN_RETRYABLE_KINDS.into_iter().collect()
}

static GLOBAL: LazyLock<Arc<RetryRegistry>> = LazyLock::new(|| Arc::new(RetryRegistry::new()));

/// Mutable retry rules shared by executors.
pub struct RetryRegistry {
    handler: RwLock<Arc<dyn CustomErrorHandler>>,
    retryable: RwLock<HashSet<ErrorKind>>,
}

impl RetryRegistry {
    /// A registry holding only the built-in rules.
    pub fn new() -> Self {
        Self {
            handler: RwLock::new(default_handler()),
            retryable: RwLock::new(builtin_kinds()),
        }
    }

    /// The process-wide registry.
    pub fn global() -> Arc<RetryRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Replace the custom handler. The previous one is dropped, not chained.
    pub fn set_custom_error_handler<H>(&self, handler: H)
    where
        H: CustomErrorHandler + 'static,
    {
        self.set_custom_error_handler_arc(Arc::new(handler));
    }

    pub fn set_custom_error_handler_arc(&self, handler: Arc<dyn CustomErrorHandler>) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = handler;
        tracing::debug!("Custom error handler replaced");
    }

    /// Currently active custom handler.
    ///
    /// The handler is cloned out so no lock is held while it runs.
    pub fn custom_error_handler(&self) -> Arc<dyn CustomErrorHandler> {
        let handler = self.handler.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*handler)
    }

    /// Mark `kind` as retryable. Adding a kind twice is a no-op.
    pub fn add_retryable_error(&self, kind: ErrorKind) {
        let inserted = self
            .retryable
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind.clone());
        if inserted {
            tracing::debug!(kind = %kind, "Registered retryable error kind");
        }
    }

    pub fn is_retryable_kind(&self, kind: &ErrorKind) -> bool {
        self.retryable
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(kind)
    }

    /// Snapshot of the retryable set.
    pub fn retryable_kinds(&self) -> HashSet<ErrorKind> {
        self.retryable
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Restore the always-false handler. The retryable set is left alone.
    pub fn reset_custom_error_handler(&self) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = default_handler();
        tracing::debug!("Custom error handler reset");
    }

    /// Shrink the retryable set back to the built-in kinds. The handler is
    /// left alone.
    pub fn reset_retryable_errors(&self) {
        *self.retryable.write().unwrap_or_else(PoisonError::into_inner) = builtin_kinds();
        tracing::debug!("Retryable error kinds reset");
    }

    pub fn reset(&self) {
        self.reset_custom_error_handler();
        self.reset_retryable_errors();
    }
}

impl Default for RetryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RetryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryRegistry")
            .field("retryable", &self.retryable_kinds())
            .finish_non_exhaustive()
    }
}

/// Replace the custom handler of the process-wide registry.
pub fn set_custom_error_handler<H>(handler: H)
where
    H: CustomErrorHandler + 'static,
{
    GLOBAL.set_custom_error_handler(handler);
}

/// Add a retryable error kind to the process-wide registry.
pub fn add_retryable_error(kind: ErrorKind) {
    GLOBAL.add_retryable_error(kind);
}

/// Restore the process-wide registry to its built-in state.
pub fn reset_error_handling() {
    GLOBAL.reset();
}
