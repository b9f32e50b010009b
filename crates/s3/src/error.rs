//! Conversion of aws-sdk-s3 failures into backend errors
//!
//! This is the only place that knows which SDK failure is which; the retry
//! engine sees nothing but [`BackendError`] kinds, codes and statuses.

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use s3fs_core::{BackendError, ErrorKind};

/// Convert an SDK error, keeping it as the source of the result.
pub fn from_sdk_error<E>(err: SdkError<E, HttpResponse>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let converted = match &err {
        SdkError::TimeoutError(_) => {
            BackendError::new(ErrorKind::Timeout).with_message("Request timeout")
        }
        SdkError::DispatchFailure(failure) => {
            let kind = if failure.is_timeout() {
                ErrorKind::Timeout
            } else {
                ErrorKind::Connection
            };
            BackendError::new(kind).with_message(format!("Network dispatch error: {failure:?}"))
        }
        SdkError::ResponseError(response) => BackendError::new(ErrorKind::ResponseParse)
            .with_message(format!("Response error: {response:?}")),
        SdkError::ServiceError(service) => {
            let source = service.err();
            let mut converted = BackendError::new(ErrorKind::Service)
                .with_status(service.raw().status().as_u16());
            if let Some(code) = source.code() {
                converted = converted.with_code(code);
            }
            if let Some(message) = source.message() {
                converted = converted.with_message(message);
            }
            converted
        }
        SdkError::ConstructionFailure(_) => BackendError::new(ErrorKind::custom("ConstructionFailure"))
            .with_message(format!("Request construction failed: {err}")),
        _ => BackendError::new(ErrorKind::custom("SdkError")).with_message(err.to_string()),
    };
    converted.with_source(err)
}

/// A body stream that broke off mid-transfer.
pub(crate) fn body_error(err: aws_smithy_types::byte_stream::error::Error) -> BackendError {
    BackendError::new(ErrorKind::IncompleteRead)
        .with_message(format!("Failed to read response body: {err}"))
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use aws_sdk_s3::error::ErrorMetadata;
    use aws_sdk_s3::operation::get_object::GetObjectError;
    use aws_smithy_runtime_api::client::result::ConnectorError;
    use aws_smithy_runtime_api::http::StatusCode;
    use aws_smithy_types::body::SdkBody;
    use s3fs_core::{Error, Retrier, RetryConfig, RetryRegistry};

    type GetError = SdkError<GetObjectError, HttpResponse>;

    fn service_error(status: u16, code: &str, message: &str) -> GetError {
        let meta = ErrorMetadata::builder().code(code).message(message).build();
        let raw = HttpResponse::new(StatusCode::try_from(status).unwrap(), SdkBody::empty());
        SdkError::service_error(GetObjectError::generic(meta), raw)
    }

    fn retrier(max_attempts: u32) -> Retrier {
        let config = RetryConfig {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 10,
            ..RetryConfig::default()
        };
        Retrier::with_registry(config, Arc::new(RetryRegistry::new()))
    }

    #[test]
    fn test_service_error_fields() {
        let err = from_sdk_error(service_error(503, "SlowDown", "Please reduce your request rate"));
        assert_eq!(err.kind(), &ErrorKind::Service);
        assert_eq!(err.code(), Some("SlowDown"));
        assert_eq!(err.message(), Some("Please reduce your request rate"));
        assert_eq!(err.status(), Some(503));
        assert!(err.downcast_ref::<GetError>().is_some());
    }

    #[test]
    fn test_timeouts() {
        let err = from_sdk_error(GetError::timeout_error("operation timed out"));
        assert_eq!(err.kind(), &ErrorKind::Timeout);

        let err = from_sdk_error(GetError::dispatch_failure(ConnectorError::timeout(
            "connect timed out".into(),
        )));
        assert_eq!(err.kind(), &ErrorKind::Timeout);
    }

    #[test]
    fn test_connection_failure() {
        let err = from_sdk_error(GetError::dispatch_failure(ConnectorError::io(
            "connection reset by peer".into(),
        )));
        assert_eq!(err.kind(), &ErrorKind::Connection);
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_construction_failure_is_terminal() {
        let err = from_sdk_error(GetError::construction_failure("missing bucket"));
        assert_eq!(err.kind(), &ErrorKind::custom("ConstructionFailure"));
        assert!(!s3fs_core::should_retry(&RetryRegistry::new(), &err));
    }

    #[tokio::test]
    async fn test_slow_down_retried_then_succeeds() {
        let mut calls = 0;
        let result = retrier(5)
            .execute(|| {
                calls += 1;
                let fail = calls < 3;
                async move {
                    if fail {
                        Err(from_sdk_error(service_error(
                            503,
                            "SlowDown",
                            "Please reduce your request rate",
                        )))
                    } else {
                        Ok("body")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "body");
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast_as_not_found() {
        let mut calls = 0;
        let result: s3fs_core::Result<()> = retrier(5)
            .execute(|| {
                calls += 1;
                async {
                    Err(from_sdk_error(service_error(
                        404,
                        "NoSuchKey",
                        "The specified key does not exist.",
                    )))
                }
            })
            .await;

        assert_eq!(calls, 1);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_clock_skew_retried_then_remapped() {
        let mut calls = 0;
        let result: s3fs_core::Result<()> = retrier(3)
            .execute(|| {
                calls += 1;
                async {
                    Err(from_sdk_error(service_error(
                        403,
                        "RequestTimeTooSkewed",
                        "The difference between the request time and the current time is too large.",
                    )))
                }
            })
            .await;

        assert_eq!(calls, 3);
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }
}
