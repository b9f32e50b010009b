//! Retry mechanism with exponential backoff
//!
//! Runs backend operations until they succeed, fail with an error the
//! classifier deems terminal, or run out of attempts. Attempts within one
//! invocation are strictly sequential.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backend_error::BackendError;
use crate::backoff::Backoff;
use crate::classify::{Classification, classify};
use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::registry::RetryRegistry;
use crate::translate::translate_error;

/// Retry a fallible async operation with exponential backoff
///
/// # Arguments
/// * `config` - Retry configuration
/// * `operation` - Async closure producing the attempt's result
/// * `is_retryable` - Closure that determines if an error should trigger retry
///
/// The classifier is not consulted for the final attempt's error, and no
/// delay follows it. The error returned is always the last attempt's.
///
/// # Example
/// ```ignore
/// let registry = RetryRegistry::global();
/// let result = retry_with_backoff(
///     &config,
///     || async { Err::<(), _>(BackendError::new(ErrorKind::Timeout)) },
///     |e| should_retry(&registry, e),
/// ).await;
/// ```
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    config: &RetryConfig,
    operation: F,
    is_retryable: R,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    run_attempts(config, operation, |e| {
        if is_retryable(e) {
            None
        } else {
            Some("non-retryable")
        }
    })
    .await
}

/// Attempt loop shared by [`retry_with_backoff`] and [`Retrier`].
///
/// `stop_reason` returns `None` to retry, or the reason reported when the
/// error is propagated instead.
async fn run_attempts<T, E, F, Fut, S>(
    config: &RetryConfig,
    mut operation: F,
    stop_reason: S,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    S: Fn(&E) -> Option<&'static str>,
    E: Display,
{
    let backoff = Backoff::from(config);
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= max_attempts {
                    tracing::debug!(attempt, max_attempts, reason = "exhausted", error = %e, "Giving up");
                    return Err(e);
                }
                if let Some(reason) = stop_reason(&e) {
                    tracing::debug!(attempt, reason, error = %e, "Giving up");
                    return Err(e);
                }

                let delay = backoff.delay_for(attempt - 1);
                tracing::debug!(
                    attempt,
                    max_attempts,
                    backoff_ms = delay.as_millis(),
                    error = %e,
                    "Retrying after transient error"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Executes backend operations under the retry policy of a registry.
///
/// Configs are not validated here. Ones [`RetryConfig::validate`] would
/// reject are clamped instead: a zero attempt limit runs once and an
/// invalid growth factor gives a constant delay.
#[derive(Debug, Clone)]
pub struct Retrier {
    config: RetryConfig,
    registry: Arc<RetryRegistry>,
}

impl Retrier {
    /// Retrier using the process-wide registry
    pub fn new(config: RetryConfig) -> Self {
        Self::with_registry(config, RetryRegistry::global())
    }

    pub fn with_registry(config: RetryConfig, registry: Arc<RetryRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<RetryRegistry> {
        &self.registry
    }

    /// Classify `error` against this retrier's registry.
    pub fn classify(&self, error: &BackendError) -> Classification {
        classify(&self.registry, error)
    }

    /// Run `operation` with the configured attempt limit.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, BackendError>>,
    {
        self.execute_with_attempts(operation, self.config.max_attempts)
            .await
    }

    /// Run `operation` making at most `max_attempts` attempts (at least one).
    pub async fn execute_with_attempts<T, F, Fut>(&self, operation: F, max_attempts: u32) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, BackendError>>,
    {
        let config = RetryConfig {
            max_attempts,
            ..self.config.clone()
        };

        run_attempts(&config, operation, |e| {
            if e.is_cancelled() {
                return Some("cancelled");
            }
            let classification = self.classify(e);
            tracing::debug!(reason = %classification, error = %e, "Classified backend error");
            if classification.is_retryable() {
                None
            } else {
                Some("non-retryable")
            }
        })
        .await
        .map_err(translate_error)
    }

    /// Like [`Retrier::execute_with_attempts`], but gives up with
    /// [`Error::Cancelled`] as soon as `token` fires, even mid-backoff.
    pub async fn execute_cancellable<T, F, Fut>(
        &self,
        operation: F,
        max_attempts: u32,
        token: &CancellationToken,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, BackendError>>,
    {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(reason = "cancelled", "Giving up");
                Err(Error::Cancelled)
            }
            result = self.execute_with_attempts(operation, max_attempts) => result,
        }
    }
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Retry configuration builder for easy customization
#[derive(Debug, Clone)]
pub struct RetryBuilder {
    config: RetryConfig,
}

impl RetryBuilder {
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn base_delay_ms(mut self, ms: u64) -> Self {
        self.config.base_delay_ms = ms;
        self
    }

    pub fn backoff_growth(mut self, growth: f64) -> Self {
        self.config.backoff_growth = growth;
        self
    }

    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.config.max_delay_ms = ms;
        self
    }

    pub fn build(self) -> Result<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for RetryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
