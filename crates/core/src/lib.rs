//! s3fs-core: Retry and error-classification engine for s3fs
//!
//! Every call s3fs makes to the object store runs through this crate, which
//! decides whether a failure is transient (retry with backoff) or terminal
//! (propagate). It provides:
//! - Backend error values and their kind tags
//! - The transient-failure classifier and its runtime-extensible registry
//! - Exponential backoff and the retry executor
//! - Translation of final backend errors into filesystem-style errors
//! - Configuration management
//!
//! This crate is independent of any specific S3 SDK; adapters convert their
//! SDK failures into [`BackendError`] values.

pub mod backend_error;
pub mod backoff;
pub mod classify;
pub mod config;
pub mod error;
pub mod registry;
pub mod retry;
pub mod translate;

pub use backend_error::{BackendError, ErrorKind};
pub use backoff::Backoff;
pub use classify::{Classification, classify, should_retry};
pub use config::{Config, ConfigManager, RetryConfig, S3Options};
pub use error::{Error, Result};
pub use registry::{
    CustomErrorHandler, RetryRegistry, add_retryable_error, reset_error_handling,
    set_custom_error_handler,
};
pub use retry::{RetryBuilder, Retrier, retry_with_backoff};
pub use translate::translate_error;
pub use tokio_util::sync::CancellationToken;
