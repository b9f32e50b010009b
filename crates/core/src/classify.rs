//! Transient-failure classification
//!
//! Decision order, first match wins:
//! 1. built-in backend signatures (throttling, clock skew, checksum races)
//! 2. the registry's retryable kinds
//! 3. the registry's custom handler
//!
//! A later step can only add retries, never suppress an earlier match.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::backend_error::BackendError;
use crate::registry::RetryRegistry;

/// Backend codes that always indicate a transient condition.
pub const TRANSIENT_CODES: &[&str] = &[
    "SlowDown",
    "Throttling",
    "ThrottlingException",
    "RequestThrottled",
    "RequestThrottledException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
    "RequestTimeTooSkewed",
    "XAmzContentSHA256Mismatch",
];

/// Message fragments that mark a transient condition when no code matched.
pub const TRANSIENT_MESSAGE_PATTERNS: &[&str] = &[
    "SlowDown",
    "reduce your request rate",
    "XAmzContentSHA256Mismatch",
];

/// Why an error was (or was not) considered retryable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Matched a built-in backend signature
    BuiltinSignature,
    /// Its kind is in the retryable set
    Registered,
    /// The custom handler accepted it
    Custom,
    Terminal,
}

impl Classification {
    pub fn is_retryable(self) -> bool {
        !matches!(self, Classification::Terminal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::BuiltinSignature => "builtin-signature",
            Classification::Registered => "registered",
            Classification::Custom => "custom",
            Classification::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `error` carries one of the built-in transient signatures.
///
/// Errors without a code or message never match.
pub fn matches_transient_signature(error: &BackendError) -> bool {
    if let Some(code) = error.code()
        && TRANSIENT_CODES.iter().any(|known| *known == code)
    {
        return true;
    }
    error.message().is_some_and(|message| {
        TRANSIENT_MESSAGE_PATTERNS
            .iter()
            .any(|pattern| message.contains(pattern))
    })
}

/// Classify `error` against the built-in rules and `registry`.
///
/// Cancellation is terminal whatever code it carries or kinds are registered.
pub fn classify(registry: &RetryRegistry, error: &BackendError) -> Classification {
    if error.is_cancelled() {
        return Classification::Terminal;
    }
    if matches_transient_signature(error) {
        return Classification::BuiltinSignature;
    }
    if registry.is_retryable_kind(error.kind()) {
        return Classification::Registered;
    }

    let handler = registry.custom_error_handler();
    match catch_unwind(AssertUnwindSafe(|| handler.should_retry(error))) {
        Ok(true) => Classification::Custom,
        Ok(false) => Classification::Terminal,
        Err(_) => {
            tracing::warn!(error = %error, "Custom error handler panicked; treating error as non-retryable");
            Classification::Terminal
        }
    }
}

/// Whether `error` should be retried under `registry`.
pub fn should_retry(registry: &RetryRegistry, error: &BackendError) -> bool {
    classify(registry, error).is_retryable()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend_error::ErrorKind;
    use crate::registry::MockCustomErrorHandler;

    #[test]
    fn test_builtin_codes() {
        let registry = RetryRegistry::new();
        for code in TRANSIENT_CODES {
            let err = BackendError::service(*code, "");
            assert_eq!(
                classify(&registry, &err),
                Classification::BuiltinSignature,
                "{code}"
            );
        }
    }

    #[test]
    fn test_builtin_message_patterns() {
        let registry = RetryRegistry::new();
        let err = BackendError::new(ErrorKind::Service)
            .with_message("Please reduce your request rate.");
        assert!(should_retry(&registry, &err));

        // Only the structured code or message count, not the kind name
        let err = BackendError::new(ErrorKind::custom("SlowDown"));
        assert!(!should_retry(&registry, &err));
    }

    #[test]
    fn test_unstructured_error_is_no_match() {
        let err = BackendError::new(ErrorKind::Service);
        assert!(!matches_transient_signature(&err));
        assert_eq!(
            classify(&RetryRegistry::new(), &err),
            Classification::Terminal
        );
    }

    #[test]
    fn test_terminal_service_codes() {
        let registry = RetryRegistry::new();
        for code in ["NoSuchKey", "AccessDenied", "CustomThrottlingError"] {
            assert!(!should_retry(&registry, &BackendError::service(code, "nope")));
        }
    }

    #[test]
    fn test_registered_kinds() {
        let registry = RetryRegistry::new();
        assert_eq!(
            classify(&registry, &BackendError::new(ErrorKind::IncompleteRead)),
            Classification::Registered
        );

        let flaky = BackendError::new(ErrorKind::custom("Flaky"));
        assert!(!should_retry(&registry, &flaky));
        registry.add_retryable_error(ErrorKind::custom("Flaky"));
        assert_eq!(classify(&registry, &flaky), Classification::Registered);
    }

    #[test]
    fn test_custom_handler_not_consulted_when_builtin_matches() {
        let registry = RetryRegistry::new();
        let mut handler = MockCustomErrorHandler::new();
        handler.expect_should_retry().times(0);
        registry.set_custom_error_handler(handler);

        assert!(should_retry(&registry, &BackendError::service("SlowDown", "")));
        assert!(should_retry(&registry, &BackendError::new(ErrorKind::Timeout)));
    }

    #[test]
    fn test_custom_handler_cannot_veto() {
        let registry = RetryRegistry::new();
        registry.add_retryable_error(ErrorKind::custom("Flaky"));
        registry.set_custom_error_handler(|_: &BackendError| false);

        assert!(should_retry(&registry, &BackendError::new(ErrorKind::custom("Flaky"))));
        assert!(should_retry(&registry, &BackendError::service("RequestTimeTooSkewed", "")));
    }

    #[test]
    fn test_custom_handler_adds_retries() {
        let registry = RetryRegistry::new();
        let mut handler = MockCustomErrorHandler::new();
        handler
            .expect_should_retry()
            .times(2)
            .returning(|e| e.code() == Some("CustomThrottlingError"));
        registry.set_custom_error_handler(handler);

        let custom = BackendError::service("CustomThrottlingError", "custom throttling");
        assert_eq!(classify(&registry, &custom), Classification::Custom);
        let other = BackendError::service("NoSuchKey", "missing");
        assert_eq!(classify(&registry, &other), Classification::Terminal);
    }

    #[test]
    fn test_cancelled_is_always_terminal() {
        let registry = RetryRegistry::new();
        registry.add_retryable_error(ErrorKind::Cancelled);
        registry.set_custom_error_handler(|_: &BackendError| true);

        let err = BackendError::new(ErrorKind::Cancelled)
            .with_code("SlowDown")
            .with_message("Please reduce your request rate");
        assert_eq!(classify(&registry, &err), Classification::Terminal);
        assert!(!should_retry(&registry, &err));
    }

    #[test]
    fn test_panicking_handler_is_terminal() {
        let registry = RetryRegistry::new();
        registry.set_custom_error_handler(|_: &BackendError| -> bool { panic!("handler bug") });

        let err = BackendError::new(ErrorKind::custom("Other"));
        assert_eq!(classify(&registry, &err), Classification::Terminal);
        // Built-ins never reach the handler
        assert!(should_retry(&registry, &BackendError::new(ErrorKind::Timeout)));
    }
}
